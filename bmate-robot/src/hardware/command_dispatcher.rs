use crate::error::SessionError;
use crate::notify::{Notice, Notifier};
use async_trait::async_trait;
use bmate_core::Command;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Write side of the motor controller link.
#[async_trait]
pub trait CommandSink: Send + Sync {
    async fn write(&self, command: Command) -> anyhow::Result<()>;
}

/// Forwards commands to the attached sink from a single writer task.
///
/// Commands are written in arrival order, at most once, without retry. When
/// commands arrive faster than the sink accepts them only the latest pending
/// one is written.
pub struct CommandDispatcher {
    writer: Option<watch::Sender<Option<Command>>>,
    notifier: Arc<dyn Notifier>,
}

impl CommandDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self {
            writer: None,
            notifier,
        }
    }

    /// Must be called from within a tokio runtime.
    pub fn attach(&mut self, sink: Arc<dyn CommandSink>) {
        let (tx, rx) = watch::channel(None);
        tokio::spawn(write_loop(sink, rx, self.notifier.clone()));

        // dropping the previous sender stops its writer
        self.writer = Some(tx);
        info!("Robot device attached");
    }

    pub fn detach(&mut self) {
        if self.writer.take().is_some() {
            info!("Robot device detached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.writer.is_some()
    }

    pub fn send(&self, command: Command) {
        let Some(writer) = &self.writer else {
            self.notifier.notify(Notice::Error(SessionError::NoDevice));
            return;
        };
        writer.send_replace(Some(command));
    }
}

async fn write_loop(
    sink: Arc<dyn CommandSink>,
    mut rx: watch::Receiver<Option<Command>>,
    notifier: Arc<dyn Notifier>,
) {
    while rx.changed().await.is_ok() {
        let Some(command) = *rx.borrow_and_update() else {
            continue;
        };

        debug!("Writing command {} to robot device", command);
        if let Err(e) = sink.write(command).await {
            notifier.notify(Notice::Error(SessionError::Hardware(format!("{e:#}"))));
        }
    }
}
