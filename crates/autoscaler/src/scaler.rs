use crate::errors::AutoscaleError;
use async_trait::async_trait;
use std::{path::PathBuf, sync::Arc};
use tokio::process::Command;
use tracing::info;

pub type DynScaler = Arc<dyn Scaler + Send + Sync>;

#[async_trait]
pub trait Scaler {
    /// Brings `service` to exactly `replicas` running instances.
    async fn scale(&self, service: &str, replicas: u32) -> Result<(), AutoscaleError>;
}

/// Scales a docker compose service in place.
#[derive(Debug, Clone, Default)]
pub struct ComposeScaler {
    compose_file: Option<PathBuf>,
}

impl ComposeScaler {
    pub fn new(compose_file: Option<PathBuf>) -> Self {
        Self { compose_file }
    }

    pub fn args(&self, service: &str, replicas: u32) -> Vec<String> {
        let mut args = vec!["compose".to_string()];
        if let Some(file) = &self.compose_file {
            args.push("-f".into());
            args.push(file.display().to_string());
        }
        args.extend([
            "up".into(),
            "-d".into(),
            "--no-recreate".into(),
            "--scale".into(),
            format!("{service}={replicas}"),
            service.to_string(),
        ]);
        args
    }
}

#[async_trait]
impl Scaler for ComposeScaler {
    async fn scale(&self, service: &str, replicas: u32) -> Result<(), AutoscaleError> {
        let args = self.args(service, replicas);
        info!(service, replicas, command = %format!("docker {}", args.join(" ")), "scaling");

        let output = Command::new("docker")
            .args(&args)
            .output()
            .await
            .map_err(|e| AutoscaleError::scale(service, format!("failed to run docker: {e}")))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(AutoscaleError::scale(
                service,
                format!("docker exited with {}: {}", output.status, stderr.trim()),
            ))
        }
    }
}

/// Logs what it would do and always succeeds.
#[derive(Debug, Clone, Default)]
pub struct DryRunScaler;

#[async_trait]
impl Scaler for DryRunScaler {
    async fn scale(&self, service: &str, replicas: u32) -> Result<(), AutoscaleError> {
        info!(service, replicas, "dry run: would scale");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_command_scales_only_the_named_service() {
        let scaler = ComposeScaler::new(Some(PathBuf::from("deploy/docker-compose.yml")));

        assert_eq!(
            scaler.args("order", 3),
            vec![
                "compose",
                "-f",
                "deploy/docker-compose.yml",
                "up",
                "-d",
                "--no-recreate",
                "--scale",
                "order=3",
                "order",
            ]
        );
    }

    #[test]
    fn compose_file_is_optional() {
        let args = ComposeScaler::default().args("user", 1);
        assert_eq!(args[..3], ["compose", "up", "-d"]);
    }
}
