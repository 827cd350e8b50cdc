use crate::utils::error::{RelayError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "qwen/qwen3-32b";
pub const DEFAULT_BAUD_RATE: u32 = 9600;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You control a single LED attached to a microcontroller. \
Reply with exactly one of: turn_on, turn_off, blink(N) where N is a positive whole number. \
If the request has nothing to do with the LED, reply with: none. Do not add any other text.";

#[cfg(windows)]
pub const DEFAULT_PORT: &str = "COM4";
#[cfg(not(windows))]
pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub serial: SerialSettings,
    pub gateway: GatewaySettings,
    pub session: SessionSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    pub write_timeout_ms: u64,
    pub settle_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub blink_interval_ms: u64,
    pub demo_mode: bool,
    /// 不呼叫 AI，直接以輸入文字比對關鍵字表
    pub offline: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub json: bool,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            write_timeout_ms: 1000,
            settle_ms: 2000,
        }
    }
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 150,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            request_timeout_seconds: 30,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            blink_interval_ms: 500,
            demo_mode: false,
            offline: false,
        }
    }
}

impl RelayConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| RelayError::ConfigError {
            message: format!("Cannot read {}: {}", path.as_ref().display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        let mut config: Self =
            toml::from_str(&processed_content).map_err(|e| RelayError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        // 未設定的環境變數會保留 ${VAR} 原文，視為沒有金鑰
        if let Some(key) = &config.gateway.api_key {
            if key.trim().is_empty() || key.starts_with("${") {
                config.gateway.api_key = None;
            }
        }

        Ok(config)
    }

    /// 替換環境變數 (例如 ${GROQ_API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| RelayError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn uses_gateway(&self) -> bool {
        !self.session.offline
    }
}

impl Validate for RelayConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("serial.port", &self.serial.port)?;
        validation::validate_baud_rate("serial.baud_rate", self.serial.baud_rate)?;
        validation::validate_positive_number(
            "serial.write_timeout_ms",
            self.serial.write_timeout_ms,
            1,
        )?;
        validation::validate_range("serial.settle_ms", self.serial.settle_ms, 0, 10_000)?;

        validation::validate_range(
            "session.blink_interval_ms",
            self.session.blink_interval_ms,
            0,
            10_000,
        )?;

        if self.uses_gateway() {
            validation::validate_url("gateway.endpoint", &self.gateway.endpoint)?;
            validation::validate_non_empty_string("gateway.model", &self.gateway.model)?;
            validation::validate_non_empty_string(
                "gateway.system_prompt",
                &self.gateway.system_prompt,
            )?;
            validation::validate_range("gateway.temperature", self.gateway.temperature, 0.0, 2.0)?;
            validation::validate_range("gateway.max_tokens", self.gateway.max_tokens, 1, 8192)?;
            validation::validate_positive_number(
                "gateway.request_timeout_seconds",
                self.gateway.request_timeout_seconds,
                1,
            )?;
            let key = validation::validate_required_field("gateway.api_key", &self.gateway.api_key)?;
            validation::validate_non_empty_string("gateway.api_key", key)?;
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}
