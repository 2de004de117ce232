//! Execution of the external markdown-to-slides converter.
//!
//! The actual markdown to Google Slides translation is done by an external program (by default
//! `md2gslides`). This module owns everything around that call:
//!
//! - [`command`]: building the argument vector from request fields
//! - [`Converter`]: spawning the child with a scoped environment, bounded by a timeout
//! - [`output`]: locating the created presentation in the child's stdout
//!
//! The child never runs through a shell, and credentials reach it only through its own
//! environment, so concurrent conversions do not share any process-wide state.

pub mod command;
pub mod output;

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error as ThisError;
use tracing::{debug, info, instrument, warn};

use crate::config::ConverterConfig;
use crate::credentials::CREDENTIALS_ENV_VAR;

pub use command::{ConversionOptions, ConverterCommand, erase_requested};
pub use output::{PresentationRef, extract_presentation, presentation_url};

/// Ways a single converter run can fail. None of them are retried.
#[derive(ThisError, Debug)]
pub enum ConversionError {
    /// The executable could not be started (missing, not executable, bad working directory)
    #[error("Failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting on the child failed after it was started
    #[error("Failed to collect output of {command}: {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The child exceeded the configured timeout and was killed
    #[error("Command timed out after {timeout:?}: {command}")]
    Timeout { command: String, timeout: Duration },

    /// The child exited unsuccessfully
    #[error("Command failed: {command}")]
    Failed {
        command: String,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
}

impl ConversionError {
    /// Full error description, including the exit status and the converter's stderr. Falls back
    /// to stdout when the converter reported its failure there.
    pub fn details(&self) -> String {
        match self {
            ConversionError::Failed { status, stdout, stderr, .. } => {
                let diagnostics = match stderr.trim() {
                    "" => stdout.trim(),
                    stderr => stderr,
                };
                if diagnostics.is_empty() {
                    format!("Error: {self} ({status})")
                } else {
                    format!("Error: {self} ({status})\n{diagnostics}")
                }
            }
            _ => format!("Error: {self}"),
        }
    }
}

/// Result of a successful converter run.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// Trimmed stdout of the converter
    pub output: String,
    /// Presentation found in the output, if any
    pub presentation: Option<PresentationRef>,
}

/// Runs the configured converter executable.
#[derive(Debug, Clone)]
pub struct Converter {
    program: String,
    working_dir: PathBuf,
    timeout: Duration,
}

impl Converter {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            program: config.program.clone(),
            working_dir: config.working_dir.clone(),
            timeout: config.timeout,
        }
    }

    /// Convert the markdown file at `markdown`.
    ///
    /// `credentials` is exported to the child as `GOOGLE_APPLICATION_CREDENTIALS`; when `None`
    /// the child inherits whatever the server environment provides.
    #[instrument(skip_all, fields(program = %self.program, markdown = %markdown.display()))]
    pub async fn convert(
        &self,
        markdown: &Path,
        options: &ConversionOptions,
        credentials: Option<&Path>,
    ) -> Result<ConversionOutput, ConversionError> {
        let command = ConverterCommand::new(&self.program, markdown, options);
        let rendered = command.to_string();

        let mut child_command = command.to_command();
        child_command
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the wait future on timeout kills the child
            .kill_on_drop(true);

        if let Some(path) = credentials {
            child_command.env(CREDENTIALS_ENV_VAR, path);
        }

        debug!(command = %rendered, timeout = ?self.timeout, "Spawning converter");

        let child = child_command.spawn().map_err(|source| ConversionError::Spawn {
            command: rendered.clone(),
            source,
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|source| ConversionError::Io {
                command: rendered.clone(),
                source,
            })?,
            Err(_) => {
                warn!(timeout = ?self.timeout, "Converter timed out, killing process");
                return Err(ConversionError::Timeout {
                    command: rendered,
                    timeout: self.timeout,
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            warn!(status = %output.status, "Converter exited unsuccessfully");
            return Err(ConversionError::Failed {
                command: rendered,
                status: output.status,
                stdout,
                stderr,
            });
        }

        let presentation = extract_presentation(&stdout);
        info!(
            presentation_id = presentation.as_ref().map(|p| p.id.as_str()),
            "Conversion finished"
        );

        Ok(ConversionOutput {
            output: stdout.trim().to_string(),
            presentation,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::test_utils::write_fake_converter;
    use tempfile::TempDir;

    fn converter(program: &Path, dir: &Path, timeout: Duration) -> Converter {
        Converter::new(&ConverterConfig {
            program: program.to_string_lossy().into_owned(),
            working_dir: dir.to_path_buf(),
            timeout,
        })
    }

    #[tokio::test]
    async fn test_successful_conversion_extracts_presentation() {
        let dir = TempDir::new().unwrap();
        let program = write_fake_converter(
            dir.path(),
            r#"echo "args: $*"
echo "Created https://docs.google.com/presentation/d/ABC123"
"#,
        );
        let converter = converter(&program, dir.path(), Duration::from_secs(10));

        let options = ConversionOptions::new(Some("Deck".to_string()), Some("OLD".to_string()), true);
        let result = converter.convert(Path::new("/tmp/in.md"), &options, None).await.unwrap();

        assert!(result.output.starts_with("args: /tmp/in.md --title Deck --append OLD --erase"));
        assert!(!result.output.ends_with('\n'));
        let presentation = result.presentation.unwrap();
        assert_eq!(presentation.id, "ABC123");
        assert_eq!(presentation.url, "https://docs.google.com/presentation/d/ABC123");
    }

    #[tokio::test]
    async fn test_output_without_url() {
        let dir = TempDir::new().unwrap();
        let program = write_fake_converter(dir.path(), "echo done\n");
        let converter = converter(&program, dir.path(), Duration::from_secs(10));

        let result = converter
            .convert(Path::new("in.md"), &ConversionOptions::default(), None)
            .await
            .unwrap();

        assert_eq!(result.output, "done");
        assert!(result.presentation.is_none());
    }

    #[tokio::test]
    async fn test_runs_in_working_dir() {
        let dir = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let program = write_fake_converter(dir.path(), "pwd\n");
        let converter = converter(&program, work.path(), Duration::from_secs(10));

        let result = converter
            .convert(Path::new("in.md"), &ConversionOptions::default(), None)
            .await
            .unwrap();

        let expected = work.path().canonicalize().unwrap();
        assert_eq!(Path::new(&result.output).canonicalize().unwrap(), expected);
    }

    #[tokio::test]
    async fn test_credentials_scoped_to_child() {
        let dir = TempDir::new().unwrap();
        let program = write_fake_converter(dir.path(), "echo \"creds=$GOOGLE_APPLICATION_CREDENTIALS\"\n");
        let converter = converter(&program, dir.path(), Duration::from_secs(10));

        let result = converter
            .convert(
                Path::new("in.md"),
                &ConversionOptions::default(),
                Some(Path::new("/secrets/key.json")),
            )
            .await
            .unwrap();

        assert_eq!(result.output, "creds=/secrets/key.json");
    }

    #[tokio::test]
    async fn test_non_zero_exit_reports_stderr() {
        let dir = TempDir::new().unwrap();
        let program = write_fake_converter(dir.path(), "echo 'invalid_grant' >&2\nexit 3\n");
        let converter = converter(&program, dir.path(), Duration::from_secs(10));

        let err = converter
            .convert(Path::new("in.md"), &ConversionOptions::default(), None)
            .await
            .unwrap_err();

        match &err {
            ConversionError::Failed { status, stderr, .. } => {
                assert_eq!(status.code(), Some(3));
                assert!(stderr.contains("invalid_grant"));
            }
            other => panic!("Expected Failed, got {other:?}"),
        }
        assert!(err.to_string().starts_with("Command failed: "));
        assert!(err.details().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn test_failure_details_fall_back_to_stdout() {
        let dir = TempDir::new().unwrap();
        let program = write_fake_converter(dir.path(), "echo 'Quota exceeded for slides API'\nexit 1\n");
        let converter = converter(&program, dir.path(), Duration::from_secs(10));

        let err = converter
            .convert(Path::new("in.md"), &ConversionOptions::default(), None)
            .await
            .unwrap_err();

        assert!(err.details().contains("Quota exceeded for slides API"));
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("finished");
        let program = write_fake_converter(dir.path(), &format!("sleep 2\ntouch \"{}\"\n", marker.display()));
        let converter = converter(&program, dir.path(), Duration::from_millis(200));

        let start = std::time::Instant::now();
        let err = converter
            .convert(Path::new("in.md"), &ConversionOptions::default(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(2));

        // The killed process never gets to its second command
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_missing_program() {
        let dir = TempDir::new().unwrap();
        let converter = converter(&dir.path().join("no-such-converter"), dir.path(), Duration::from_secs(10));

        let err = converter
            .convert(Path::new("in.md"), &ConversionOptions::default(), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionError::Spawn { .. }));
    }
}
