//! Argument vector construction for the converter executable.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;

use tokio::process::Command;

/// Optional flags forwarded to the converter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Title for a newly created presentation (`--title`)
    pub title: Option<String>,
    /// Existing presentation to append slides to (`--append`)
    pub presentation_id: Option<String>,
    /// Erase existing slides before appending (`--erase`)
    pub erase: bool,
}

impl ConversionOptions {
    /// Empty strings are treated the same as absent values.
    pub fn new(title: Option<String>, presentation_id: Option<String>, erase: bool) -> Self {
        Self {
            title: title.filter(|t| !t.is_empty()),
            presentation_id: presentation_id.filter(|id| !id.is_empty()),
            erase,
        }
    }
}

/// `erase` is only honoured for the exact string `"true"`.
pub fn erase_requested(value: Option<&str>) -> bool {
    value == Some("true")
}

/// A fully built converter invocation: `<program> <markdown> [--title T] [--append ID] [--erase]`.
///
/// Arguments are passed straight to the process, never through a shell.
#[derive(Debug, Clone)]
pub struct ConverterCommand {
    program: String,
    args: Vec<OsString>,
}

impl ConverterCommand {
    pub fn new(program: &str, markdown: &Path, options: &ConversionOptions) -> Self {
        let mut args = vec![markdown.as_os_str().to_owned()];

        if let Some(title) = &options.title {
            args.push("--title".into());
            args.push(title.into());
        }

        if let Some(presentation_id) = &options.presentation_id {
            args.push("--append".into());
            args.push(presentation_id.into());
        }

        if options.erase {
            args.push("--erase".into());
        }

        Self {
            program: program.to_string(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

fn is_flag(arg: &OsStr) -> bool {
    matches!(arg.to_str(), Some("--title" | "--append" | "--erase"))
}

/// Human-readable rendering for logs and error messages.
impl fmt::Display for ConverterCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            if is_flag(arg) {
                write!(f, " {}", arg.to_string_lossy())?;
            } else {
                write!(f, " \"{}\"", arg.to_string_lossy())?;
            }
        }
        Ok(())
    }
}
