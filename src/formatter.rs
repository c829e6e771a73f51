use anyhow::{bail, Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};

/// External formatter run over rewritten files before they are written.
/// The argv comes from config; `{file}` is substituted with the file path,
/// the new content goes in on stdin and the formatted content comes back
/// on stdout.
#[derive(Debug, Clone)]
pub struct Formatter {
    argv: Vec<String>,
}

impl Formatter {
    pub fn from_argv(argv: Option<&[String]>) -> Option<Self> {
        match argv {
            Some(argv) if !argv.is_empty() => Some(Self {
                argv: argv.to_vec(),
            }),
            _ => None,
        }
    }

    fn command_for(&self, file: &str) -> Vec<String> {
        self.argv.iter().map(|arg| arg.replace("{file}", file)).collect()
    }

    pub fn run(&self, file: &str, content: &str) -> Result<String> {
        let argv = self.command_for(file);
        let (program, args) = argv
            .split_first()
            .context("Formatter command is empty")?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start formatter '{}'", program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(content.as_bytes())
                .context("Failed to write to formatter stdin")?;
        }

        let output = child
            .wait_with_output()
            .context("Failed to wait for formatter")?;
        if !output.status.success() {
            bail!(
                "Formatter exited with {}: {}",
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let formatted =
            String::from_utf8(output.stdout).context("Formatter produced non UTF-8 output")?;
        if formatted.trim().is_empty() && !content.trim().is_empty() {
            bail!("Formatter produced no output");
        }
        Ok(formatted)
    }

    /// Formatted content, or the input unchanged (with a warning) when the
    /// formatter fails.
    pub fn format_or_keep(&self, file: &str, content: String) -> String {
        match self.run(file, &content) {
            Ok(formatted) => formatted,
            Err(e) => {
                crate::logging::warn(&format!("{}: formatter skipped: {:#}", file, e));
                content
            }
        }
    }
}
