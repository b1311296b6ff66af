use async_trait::async_trait;
use bmate_core::Command;
use bmate_robot::CommandSink;
use std::sync::{Arc, Mutex};

/// Motor controller stand-in recording every byte written.
#[derive(Clone, Default)]
pub struct MockSink {
    written: Arc<Mutex<Vec<u8>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> Vec<u8> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandSink for MockSink {
    async fn write(&self, command: Command) -> anyhow::Result<()> {
        self.written.lock().unwrap().push(command.as_byte());
        Ok(())
    }
}
