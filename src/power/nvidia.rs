//! nvidia-settings invocation.
//!
//! Builds and spawns nvidia-settings commands for switching the
//! GPUPowerMizerMode attribute.

use super::{PowerMode, PowerSwitch, SwitchError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// `GPUPowerMizerMode` attribute values: 0 = adaptive, 1 = prefer maximum
/// performance.
fn attribute_value(mode: PowerMode) -> u8 {
    match mode {
        PowerMode::Low => 0,
        PowerMode::High => 1,
    }
}

/// Mode switch implemented by shelling out to nvidia-settings.
#[derive(Debug)]
pub struct NvidiaSettings {
    /// Path to the nvidia-settings binary.
    binary: PathBuf,

    /// Target GPU as shown by `nvidia-settings -q gpus`.
    gpu_id: u32,

    /// Dry run mode.
    dry_run: bool,
}

impl NvidiaSettings {
    /// Create a new invoker for the given GPU.
    pub fn new(configured_path: Option<&Path>, gpu_id: u32, dry_run: bool) -> Self {
        let binary = find_nvidia_settings(configured_path);
        info!("Using nvidia-settings: {}", binary.display());

        Self {
            binary,
            gpu_id,
            dry_run,
        }
    }

    /// Build command line arguments for nvidia-settings.
    fn build_args(&self, mode: PowerMode) -> Vec<String> {
        vec![
            "-a".to_string(),
            format!(
                "[gpu:{}]/GPUPowerMizerMode={}",
                self.gpu_id,
                attribute_value(mode)
            ),
        ]
    }
}

#[async_trait]
impl PowerSwitch for NvidiaSettings {
    async fn activate(&mut self, mode: PowerMode) -> Result<(), SwitchError> {
        let args = self.build_args(mode);

        if self.dry_run {
            info!(
                "[DRY RUN] Would execute: {} {}",
                self.binary.display(),
                args.join(" ")
            );
            return Ok(());
        }

        debug!("Executing: {} {}", self.binary.display(), args.join(" "));

        let command = self.binary.display().to_string();
        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SwitchError::Launch {
                command: command.clone(),
                source,
            })?
            .wait_with_output()
            .await
            .map_err(|source| SwitchError::Launch {
                command: command.clone(),
                source,
            })?;

        debug!("nvidia-settings returned {:?}", output.status.code());

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                warn!("nvidia-settings stderr: {}", stderr.trim());
            }
            Err(SwitchError::CommandFailed {
                command,
                status: output.status,
            })
        }
    }
}

/// Find the nvidia-settings binary.
fn find_nvidia_settings(configured_path: Option<&Path>) -> PathBuf {
    // Use configured path if provided
    if let Some(path) = configured_path {
        return path.to_path_buf();
    }

    // Search PATH; a miss is not fatal since per-invocation failures are
    // logged and tolerated anyway
    match which::which("nvidia-settings") {
        Ok(path) => path,
        Err(_) => {
            warn!("nvidia-settings not found on PATH; mode switches will likely fail");
            PathBuf::from("nvidia-settings")
        }
    }
}
