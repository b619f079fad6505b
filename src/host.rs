//! The external "extract interface" collaborator.
//!
//! The pipeline never knows how an interface gets generated. It hands the
//! class file to an [`ExtractHost`] and then watches the filesystem for the
//! expected `I<Name>` file.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Everything a host needs to locate the declaration to refactor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferHandle<'a> {
    /// The class file
    pub path: &'a Path,
    pub class_name: &'a str,
    pub interface_name: &'a str,
    /// Where the host is expected to write the interface
    pub interface_path: &'a Path,
    /// Zero-based line of the class declaration
    pub declaration_line: usize,
}

#[derive(Error, Debug)]
pub enum CommandFailure {
    #[error("failed to start host program '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("host program '{program}' exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("no host command configured")]
    NotConfigured,
}

pub trait ExtractHost {
    /// Ask the host to run its extract-interface refactoring on `buffer`.
    ///
    /// `Ok(())` only means the request was delivered; whether an interface
    /// was produced is decided by the caller.
    fn invoke_refactor_command(&self, buffer: &BufferHandle<'_>) -> Result<(), CommandFailure>;
}

/// Runs an external program per class.
///
/// Arguments may contain `{file}`, `{class}`, `{interface}`,
/// `{interface_file}` and `{line}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandHost {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandHost {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
        }
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with placeholders substituted for `buffer`.
    pub fn render_args(&self, buffer: &BufferHandle<'_>) -> Vec<String> {
        let file = buffer.path.display().to_string();
        let interface_file = buffer.interface_path.display().to_string();
        let line = (buffer.declaration_line + 1).to_string();

        self.args
            .iter()
            .map(|arg| {
                arg.replace("{file}", &file)
                    .replace("{interface_file}", &interface_file)
                    .replace("{interface}", buffer.interface_name)
                    .replace("{class}", buffer.class_name)
                    .replace("{line}", &line)
            })
            .collect()
    }
}

impl ExtractHost for CommandHost {
    fn invoke_refactor_command(&self, buffer: &BufferHandle<'_>) -> Result<(), CommandFailure> {
        let mut command = Command::new(&self.program);
        command.args(self.render_args(buffer));
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        tracing::debug!(program = %self.program, class = buffer.class_name, "invoking host command");

        let output = command.output().map_err(|source| CommandFailure::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(CommandFailure::Exit {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Host used when extraction is not wanted (dry runs, rewrite-only runs).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHost;

impl ExtractHost for NoHost {
    fn invoke_refactor_command(&self, _buffer: &BufferHandle<'_>) -> Result<(), CommandFailure> {
        Err(CommandFailure::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle<'a>(path: &'a Path, interface_path: &'a Path) -> BufferHandle<'a> {
        BufferHandle {
            path,
            class_name: "Widget",
            interface_name: "IWidget",
            interface_path,
            declaration_line: 4,
        }
    }

    #[test]
    fn test_render_args() {
        let host = CommandHost::new(
            "refactor",
            vec![
                "extract".to_string(),
                "--file={file}".to_string(),
                "{class}:{interface}".to_string(),
                "--out".to_string(),
                "{interface_file}".to_string(),
                "--line={line}".to_string(),
            ],
        );
        let path = PathBuf::from("src/Widget.cs");
        let iface = PathBuf::from("src/IWidget.cs");

        let args = host.render_args(&handle(&path, &iface));
        assert_eq!(
            args,
            vec![
                "extract".to_string(),
                format!("--file={}", path.display()),
                "Widget:IWidget".to_string(),
                "--out".to_string(),
                iface.display().to_string(),
                "--line=5".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_program_is_spawn_failure() {
        let host = CommandHost::new("definitely-not-a-real-program-4f2a", Vec::new());
        let path = PathBuf::from("Widget.cs");
        let iface = PathBuf::from("IWidget.cs");

        let result = host.invoke_refactor_command(&handle(&path, &iface));
        assert!(matches!(result, Err(CommandFailure::Spawn { .. })));
    }

    #[test]
    fn test_no_host() {
        let path = PathBuf::from("Widget.cs");
        let iface = PathBuf::from("IWidget.cs");
        let result = NoHost.invoke_refactor_command(&handle(&path, &iface));
        assert!(matches!(result, Err(CommandFailure::NotConfigured)));
    }

    #[test]
    #[cfg(unix)]
    fn test_command_host_writes_interface() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("Widget.cs");
        let iface = temp_dir.path().join("IWidget.cs");

        let host = CommandHost::new(
            "sh",
            vec![
                "-c".to_string(),
                "printf 'public interface {interface}\\n' > '{interface_file}'".to_string(),
            ],
        );
        host.invoke_refactor_command(&handle(&path, &iface)).unwrap();

        assert_eq!(
            std::fs::read_to_string(&iface).unwrap(),
            "public interface IWidget\n"
        );
    }

    #[test]
    #[cfg(unix)]
    fn test_nonzero_exit_is_failure() {
        let host = CommandHost::new("sh", vec!["-c".to_string(), "echo boom >&2; exit 3".to_string()]);
        let path = PathBuf::from("Widget.cs");
        let iface = PathBuf::from("IWidget.cs");

        match host.invoke_refactor_command(&handle(&path, &iface)) {
            Err(CommandFailure::Exit { stderr, .. }) => assert_eq!(stderr, "boom"),
            other => panic!("expected exit failure, got {other:?}"),
        }
    }
}
