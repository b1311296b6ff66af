use crate::hardware::CommandSink;
use anyhow::{Context, Result};
use async_trait::async_trait;
use bmate_core::Command;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

/// Motor controller reached through a serial device node, e.g. `/dev/ttyUSB0`.
pub struct DeviceFileSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl DeviceFileSink {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .write(true)
            .open(&path)
            .await
            .with_context(|| format!("Failed to open robot device {}", path.display()))?;

        info!("Robot device opened: {}", path.display());
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CommandSink for DeviceFileSink {
    async fn write(&self, command: Command) -> Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(&[command.as_byte()])
            .await
            .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        file.flush().await?;
        Ok(())
    }
}
