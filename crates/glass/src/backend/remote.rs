//! Remote device backend
//!
//! Runs command text on a router or server over SSH. Password logins go
//! through `sshpass -e` so the secret never shows up in the process list.

use crate::backend::Backend;
use crate::error::{GlassError, Result};
use serde::{Deserialize, Serialize};
use std::process::{Command, Stdio};

/// Connection details of a remote device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteHost {
    /// Hostname or IP address
    pub host: String,

    /// SSH username
    pub user: String,

    /// SSH port (default: 22)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Login password (optional, key or agent auth otherwise)
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Path to SSH key (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

fn default_port() -> u16 {
    22
}

impl RemoteHost {
    pub fn new(host: &str, user: &str) -> Self {
        Self {
            host: host.to_string(),
            user: user.to_string(),
            port: 22,
            password: None,
            key: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_password(mut self, password: &str) -> Self {
        self.password = Some(password.to_string());
        self
    }

    pub fn with_key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    /// SSH connection string (user@host)
    pub fn connection_string(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Display address (user@host:port)
    pub fn display_address(&self) -> String {
        format!("{}@{}:{}", self.user, self.host, self.port)
    }
}

/// Runs command text on a [`RemoteHost`]
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    host: RemoteHost,
}

impl RemoteBackend {
    pub fn new(host: RemoteHost) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &RemoteHost {
        &self.host
    }

    /// Full ssh invocation for one remote command
    fn build_command(&self, remote_command: &str) -> Command {
        let mut cmd = match &self.host.password {
            Some(password) => {
                let mut cmd = Command::new("sshpass");
                cmd.arg("-e").arg("ssh").env("SSHPASS", password);
                cmd
            }
            None => {
                let mut cmd = Command::new("ssh");
                cmd.args(["-o", "BatchMode=yes"]);
                cmd
            }
        };

        if let Some(ref key) = self.host.key {
            let expanded_key = shellexpand::tilde(key);
            cmd.arg("-i").arg(expanded_key.as_ref());
        }

        if self.host.port != 22 {
            cmd.arg("-p").arg(self.host.port.to_string());
        }

        cmd.arg(self.host.connection_string());
        cmd.arg(remote_command);
        cmd.stdin(Stdio::null());

        cmd
    }
}

impl Backend for RemoteBackend {
    fn run_raw(&self, command: &str) -> Result<String> {
        let output = self.build_command(command).output().map_err(|e| {
            GlassError::Execution(format!("failed to reach {}: {}", self.host.display_address(), e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GlassError::Execution(format!(
                "{} returned {}: {}",
                self.host.display_address(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn fork_needed(&self) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("remote ({})", self.host.display_address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_host_creation() {
        let host = RemoteHost::new("192.0.2.1", "looking")
            .with_port(2222)
            .with_key("/etc/glass/id_ed25519");

        assert_eq!(host.connection_string(), "looking@192.0.2.1");
        assert_eq!(host.display_address(), "looking@192.0.2.1:2222");
        assert_eq!(host.key.as_deref(), Some("/etc/glass/id_ed25519"));
    }

    #[test]
    fn test_key_auth_command() {
        let backend = RemoteBackend::new(
            RemoteHost::new("rtr1.example.net", "lg")
                .with_port(2222)
                .with_key("/keys/lg"),
        );
        let cmd = backend.build_command("show ip bgp 192.0.2.0/24");

        assert_eq!(cmd.get_program(), "ssh");
        assert_eq!(
            args(&cmd),
            vec![
                "-o",
                "BatchMode=yes",
                "-i",
                "/keys/lg",
                "-p",
                "2222",
                "lg@rtr1.example.net",
                "show ip bgp 192.0.2.0/24",
            ]
        );
    }

    #[test]
    fn test_key_path_expands_home() {
        let backend = RemoteBackend::new(RemoteHost::new("rtr1", "lg").with_key("~/.ssh/lg"));
        let key = args(&backend.build_command("show version"))[3].clone();

        assert!(!key.starts_with('~'));
        assert!(key.ends_with("/.ssh/lg"));
    }

    #[test]
    fn test_password_goes_through_environment() {
        let backend = RemoteBackend::new(
            RemoteHost::new("rtr1.example.net", "lg").with_password("s3cret"),
        );
        let cmd = backend.build_command("show version");

        assert_eq!(cmd.get_program(), "sshpass");
        assert!(!args(&cmd).iter().any(|a| a.contains("s3cret")));
        assert!(cmd
            .get_envs()
            .any(|(k, v)| k == "SSHPASS" && v.map(|v| v == "s3cret").unwrap_or(false)));
    }

    #[test]
    fn test_password_is_never_serialized() {
        let host = RemoteHost::new("rtr1", "lg").with_password("s3cret");
        let json = serde_json::to_string(&host).unwrap();
        assert!(!json.contains("s3cret"));
        assert!(RemoteBackend::new(host).fork_needed());
    }
}
