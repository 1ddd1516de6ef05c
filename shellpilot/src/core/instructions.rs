//! Fixed instruction messages sent to the model.

/// System priming message that opens every conversation.
pub const SYSTEM_PRIMER: &str = "You respond only with shell commands in the following JSON format {\"command\": \"Insert your command here\"}.";

/// Reminder appended whenever a reply could not be used.
pub const FORMAT_REMINDER: &str = "Please respond with a JSON object in the following format {\"command\": \"Insert your command here\"}. The response must be JSON parsable with a single key \"command\" and a value of the command to execute. Only one command at a time. Do not comment on the JSON. Use the workspace to save files.";

pub const TIMEOUT_NOTICE: &str =
    "The previous command timed out. Please respond with a different command.";

pub const COMPLETION_CHECK: &str =
    "Please respond \"Task completed\" if the output meets the requirements.";

pub const NO_OUTPUT: &str = "No output.";

pub const STDOUT_PREFIX: &str = "Standard Output: ";

pub const STDERR_PREFIX: &str = "Standard Error: ";

/// Phrase in a reply that ends the loop successfully.
pub const COMPLETION_PHRASE: &str = "task completed";

pub const JUDGE_QUESTION: &str = "Respond either \"Yes\" or \"No\". Would you say the task was completed to the full potential?";

/// Affirmative token looked for in the judge's reply.
pub const JUDGE_AFFIRMATIVE: &str = "yes";

pub const SUMMARY_REQUEST: &str = "Please summarize and document the results in markdown. Additionally, include why you believe the task was completed.";
