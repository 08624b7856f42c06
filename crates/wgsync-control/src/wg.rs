//! `wg` command line backend

use crate::{ControlError, TunnelControl};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, trace};

/// Drives the tunnel through the `wg` binary.
///
/// Commands run to completion; there is no timeout, so a hung `wg` blocks the
/// caller.
#[derive(Debug, Clone)]
pub struct WgCommand {
    program: PathBuf,
}

impl WgCommand {
    /// Use `wg` from `PATH`
    pub fn new() -> Self {
        Self::with_program("wg")
    }

    /// Use a specific `wg` binary
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn show_args(interface: &str) -> Vec<String> {
        vec![
            "show".to_string(),
            interface.to_string(),
            "dump".to_string(),
        ]
    }

    fn set_args(
        interface: &str,
        public_key: &str,
        endpoint: Option<&str>,
        keepalive: Option<u32>,
    ) -> Vec<String> {
        let mut args = vec![
            "set".to_string(),
            interface.to_string(),
            "peer".to_string(),
            public_key.to_string(),
        ];

        if let Some(endpoint) = endpoint {
            args.push("endpoint".to_string());
            args.push(endpoint.to_string());
        }

        match keepalive {
            Some(0) => {
                args.push("persistent-keepalive".to_string());
                args.push("off".to_string());
            }
            Some(seconds) => {
                args.push("persistent-keepalive".to_string());
                args.push(seconds.to_string());
            }
            None => {}
        }

        args
    }

    async fn run(&self, args: Vec<String>) -> Result<String, ControlError> {
        let command = format!("{} {}", self.program.display(), args.join(" "));
        trace!(command = %command, "Running tunnel command");

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .await
            .map_err(|e| ControlError::Spawn {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ControlError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        String::from_utf8(output.stdout)
            .map_err(|e| ControlError::InvalidOutput(format!("{}: {}", command, e)))
    }
}

impl Default for WgCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TunnelControl for WgCommand {
    async fn read_status(&self, interface: &str) -> Result<String, ControlError> {
        self.run(Self::show_args(interface)).await
    }

    async fn apply_peer(
        &self,
        interface: &str,
        public_key: &str,
        endpoint: Option<&str>,
        keepalive: Option<u32>,
    ) -> Result<(), ControlError> {
        let output = self
            .run(Self::set_args(interface, public_key, endpoint, keepalive))
            .await?;
        if !output.trim().is_empty() {
            debug!(public_key = %public_key, output = %output.trim(), "wg set output");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_args() {
        assert_eq!(WgCommand::show_args("wg0"), vec!["show", "wg0", "dump"]);
    }

    #[test]
    fn test_set_args_endpoint_only() {
        let args = WgCommand::set_args("wg0", "KEY", Some("198.51.100.7:51820"), None);
        assert_eq!(
            args,
            vec!["set", "wg0", "peer", "KEY", "endpoint", "198.51.100.7:51820"]
        );
    }

    #[test]
    fn test_set_args_zero_keepalive_is_off() {
        let args = WgCommand::set_args("wg0", "KEY", None, Some(0));
        assert_eq!(
            args,
            vec!["set", "wg0", "peer", "KEY", "persistent-keepalive", "off"]
        );
    }

    #[test]
    fn test_set_args_both_fields() {
        let args = WgCommand::set_args("wg0", "KEY", Some("[2001:db8::1]:51820"), Some(25));
        assert_eq!(
            args,
            vec![
                "set",
                "wg0",
                "peer",
                "KEY",
                "endpoint",
                "[2001:db8::1]:51820",
                "persistent-keepalive",
                "25"
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_reports_spawn_error() {
        let wg = WgCommand::with_program("/nonexistent/wgsync-test-wg");
        let err = wg.read_status("wg0").await.unwrap_err();
        assert!(matches!(err, ControlError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_surfaces_stderr() {
        // `false` exits 1 with no output
        let wg = WgCommand::with_program("false");
        let err = wg.apply_peer("wg0", "KEY", None, Some(0)).await.unwrap_err();
        match err {
            ControlError::CommandFailed { command, .. } => {
                assert!(command.starts_with("false set wg0 peer KEY"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
