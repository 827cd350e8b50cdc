use crate::core::{ControlByte, Instruction};
use crate::utils::error::{RelayError, Result};

/// Upper bound on blink pairs in one dispatch.
pub const MAX_BLINK_COUNT: i64 = 1000;

/// 將 Instruction 轉為要送出的 byte 序列（純函數）
pub fn interpret(instruction: &Instruction) -> Result<Vec<ControlByte>> {
    match *instruction {
        Instruction::TurnOn => Ok(vec![ControlByte::On]),
        Instruction::TurnOff => Ok(vec![ControlByte::Off]),
        Instruction::Blink(count) if count <= 0 => Err(RelayError::InvalidArgument {
            message: format!("blink count must be at least 1, got {}", count),
        }),
        Instruction::Blink(count) if count > MAX_BLINK_COUNT => Err(RelayError::InvalidArgument {
            message: format!("blink count must be at most {}, got {}", MAX_BLINK_COUNT, count),
        }),
        Instruction::Blink(count) => {
            let pairs = count as usize;
            let mut bytes = Vec::with_capacity(pairs * 2);
            for _ in 0..pairs {
                bytes.push(ControlByte::On);
                bytes.push(ControlByte::Off);
            }
            Ok(bytes)
        }
    }
}

/// Normalizes `text` and maps it to bytes in one step.
pub fn interpret_text(text: &str) -> Result<(Instruction, Vec<ControlByte>)> {
    let instruction: Instruction = text.parse()?;
    let bytes = interpret(&instruction)?;
    Ok((instruction, bytes))
}
