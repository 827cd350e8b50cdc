use crate::domain::model::ControlByte;
use crate::domain::ports::DeviceChannel;
use crate::utils::error::{RelayError, Result};

/// Stand-in channel for running without a board attached. Logs and keeps what would be written.
#[derive(Debug)]
pub struct DemoChannel {
    port_name: String,
    open: bool,
    sent: Vec<u8>,
}

impl DemoChannel {
    pub fn new(port_name: &str) -> Self {
        tracing::info!("🎭 Demo mode: no bytes will reach {}", port_name);
        Self {
            port_name: port_name.to_string(),
            open: true,
            sent: Vec::new(),
        }
    }

    pub fn sent(&self) -> &[u8] {
        &self.sent
    }
}

impl DeviceChannel for DemoChannel {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn send(&mut self, byte: ControlByte) -> Result<()> {
        if !self.open {
            return Err(RelayError::ChannelUnavailable {
                message: format!("demo channel for {} is closed", self.port_name),
            });
        }
        tracing::info!("🎭 Demo: would send '{}' to {}", byte, self.port_name);
        self.sent.push(byte.as_byte());
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
    }
}
