use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Unrecognized instruction: {text:?}")]
    UnrecognizedInstruction { text: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Device channel unavailable: {message}")]
    ChannelUnavailable { message: String },

    #[error("Write to {port} timed out after {timeout_ms}ms")]
    WriteTimeout { port: String, timeout_ms: u64 },

    #[error("AI gateway failure: {message}")]
    GatewayFailure { message: String },

    #[error("Serial port error: {0}")]
    SerialError(#[from] serialport::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: {value:?} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Instruction,
    Device,
    Gateway,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl RelayError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            RelayError::UnrecognizedInstruction { .. } | RelayError::InvalidArgument { .. } => {
                ErrorCategory::Instruction
            }
            RelayError::ChannelUnavailable { .. }
            | RelayError::WriteTimeout { .. }
            | RelayError::SerialError(_) => ErrorCategory::Device,
            RelayError::GatewayFailure { .. } => ErrorCategory::Gateway,
            RelayError::ConfigError { .. }
            | RelayError::InvalidConfigValueError { .. }
            | RelayError::MissingConfigError { .. }
            | RelayError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            RelayError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Instruction => ErrorSeverity::Low,
            ErrorCategory::Gateway => ErrorSeverity::Medium,
            ErrorCategory::Device | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 供使用者參考的修復建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            RelayError::UnrecognizedInstruction { .. } => {
                "Try phrasing it as 'turn on', 'turn off' or 'blink 3 times', or type /help"
            }
            RelayError::InvalidArgument { .. } => "Blink count must be a positive number",
            RelayError::ChannelUnavailable { .. } => {
                "Check the board is plugged in and the port is not held by the Arduino IDE"
            }
            RelayError::WriteTimeout { .. } => {
                "The board stopped accepting data; reconnect it or raise --write-timeout-ms"
            }
            RelayError::SerialError(_) => {
                "Run with --list-ports to find the right port, or use --demo without hardware"
            }
            RelayError::GatewayFailure { .. } => {
                "Check GROQ_API_KEY and network access, or use /on, /off and /blink directly"
            }
            RelayError::IoError(_) => "Check file permissions and that the terminal is readable",
            RelayError::ConfigError { .. }
            | RelayError::InvalidConfigValueError { .. }
            | RelayError::ConfigValidationError { .. } => {
                "Fix the value in the TOML file or on the command line"
            }
            RelayError::MissingConfigError { .. } => {
                "Set it in .env, the environment, or pass it on the command line"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            RelayError::UnrecognizedInstruction { text } if text.trim().is_empty() => {
                "Nothing to do: the instruction was empty".to_string()
            }
            RelayError::UnrecognizedInstruction { text } => {
                format!("I don't know how to do that with the LED: {}", text.trim())
            }
            RelayError::ChannelUnavailable { .. } => "The board is not connected".to_string(),
            RelayError::GatewayFailure { .. } => "The AI service did not answer".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
