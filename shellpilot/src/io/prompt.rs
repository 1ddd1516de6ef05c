//! Task prompt rendering.

use std::path::Path;

use anyhow::Result;
use minijinja::{Environment, context};

const TASK_TEMPLATE: &str = include_str!("prompts/task.md");

/// Built-in task used when no task is supplied on the command line.
pub const DEFAULT_TASK: &str = "Create a fun website with html, css, and javascript that creatively says hi to Caffrey.
Add content to each file. The website should be responsive and have a button that says \"Say hi to Caffrey\" and when clicked, it should say hi to Caffrey.
Finally, open a web browser and navigate to the page.
Make sure to run the browser in the background.";

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("task", TASK_TEMPLATE)
            .expect("task template should be valid");
        Self { env }
    }

    /// Render the user prompt that opens the conversation.
    ///
    /// `shell` is the shell program commands are handed to; `workspace_dir` should be absolute.
    pub fn render_task(&self, task: &str, shell: &str, workspace_dir: &Path) -> Result<String> {
        let template = self.env.get_template("task")?;
        let rendered = template.render(context! {
            task => task.trim(),
            shell => shell,
            workspace_dir => workspace_dir.display().to_string(),
        })?;
        Ok(rendered.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_task_with_workspace_and_shell() {
        let engine = PromptEngine::new();
        let prompt = engine
            .render_task("  Print the date.\n", "sh", Path::new("/tmp/workspace/20260101-120000"))
            .expect("render");
        assert!(prompt.starts_with("Print the date."));
        assert!(prompt.contains("`sh` shell"));
        assert!(prompt.contains("'/tmp/workspace/20260101-120000'"));
    }

    #[test]
    fn default_task_renders() {
        let prompt = PromptEngine::new()
            .render_task(DEFAULT_TASK, "powershell", Path::new("C:/ws"))
            .expect("render");
        assert!(prompt.contains("Say hi to Caffrey"));
        assert!(prompt.ends_with("using absolute paths."));
    }
}
