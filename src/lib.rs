pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::RelayConfig;

pub use adapters::{ChatCompletionGateway, DemoChannel, PassthroughGateway, SerialChannel};
pub use crate::core::interpreter::{interpret, interpret_text};
pub use crate::core::session::{Outcome, Session, SessionSummary};
pub use domain::model::{ControlByte, Exchange, Instruction};
pub use domain::ports::{CompletionGateway, DeviceChannel};
pub use utils::error::{RelayError, Result};
