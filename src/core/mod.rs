pub mod interpreter;
pub mod session;

pub use crate::domain::model::{ControlByte, Exchange, Instruction};
pub use crate::domain::ports::{CompletionGateway, DeviceChannel};
pub use crate::utils::error::Result;
