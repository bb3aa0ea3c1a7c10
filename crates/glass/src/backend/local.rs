//! Local shell backend

use crate::backend::Backend;
use crate::error::{GlassError, Result};
use std::process::{Command, Stdio};

/// Runs command text with `sh -c` on this machine
#[derive(Debug, Clone)]
pub struct LocalBackend {
    shell: String,
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalBackend {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }

    /// Use another POSIX shell
    pub fn with_shell(mut self, shell: &str) -> Self {
        self.shell = shell.to_string();
        self
    }
}

impl Backend for LocalBackend {
    fn run_raw(&self, command: &str) -> Result<String> {
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| GlassError::Execution(format!("failed to spawn {}: {}", self.shell, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GlassError::Execution(format!(
                "{} exited with {}: {}",
                self.shell,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn describe(&self) -> String {
        format!("local ({})", self.shell)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout() {
        let backend = LocalBackend::new();
        assert_eq!(backend.run_raw("echo hello").unwrap(), "hello\n");
        assert!(!backend.fork_needed());
    }

    #[test]
    fn test_non_zero_exit_is_execution_failure() {
        let err = LocalBackend::new().run_raw("exit 3").unwrap_err();
        assert!(matches!(err, GlassError::Execution(_)));
    }

    #[test]
    fn test_missing_shell_is_execution_failure() {
        let backend = LocalBackend::new().with_shell("/nonexistent/shell");
        assert!(matches!(backend.run_raw("true"), Err(GlassError::Execution(_))));
    }
}
