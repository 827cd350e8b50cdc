// Adapters layer: concrete implementations of the domain ports (serial link, AI gateway).

pub mod chat_completion;
pub mod demo;
pub mod passthrough;
pub mod serial;

pub use chat_completion::ChatCompletionGateway;
pub use demo::DemoChannel;
pub use passthrough::PassthroughGateway;
pub use serial::SerialChannel;

use crate::config::toml_config::RelayConfig;
use crate::domain::ports::{CompletionGateway, DeviceChannel};
use crate::utils::error::Result;

/// 依設定選擇 AI gateway：離線模式直接比對輸入文字
pub fn build_gateway(config: &RelayConfig) -> Result<Box<dyn CompletionGateway>> {
    if config.uses_gateway() {
        let gateway = ChatCompletionGateway::new(&config.gateway)?;
        tracing::info!("🤖 Using model {}", gateway.model());
        Ok(Box::new(gateway))
    } else {
        tracing::info!("Offline mode: instructions are matched without the AI service");
        Ok(Box::new(PassthroughGateway))
    }
}

/// Opens the configured serial port, or a demo channel when demo mode is on.
pub fn open_channel(config: &RelayConfig) -> Result<Box<dyn DeviceChannel>> {
    if config.session.demo_mode {
        Ok(Box::new(DemoChannel::new(&config.serial.port)))
    } else {
        Ok(Box::new(SerialChannel::open(&config.serial)?))
    }
}
