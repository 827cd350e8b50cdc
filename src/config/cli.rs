use crate::config::toml_config::RelayConfig;
use crate::utils::error::Result;
use clap::builder::FalseyValueParser;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Parser)]
#[command(name = "led-relay")]
#[command(about = "Toggle an Arduino LED with natural-language commands")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Serial port of the board (e.g. COM4, /dev/ttyACM0)
    #[arg(long, env = "ARDUINO_PORT")]
    pub port: Option<String>,

    #[arg(long, env = "BAUD_RATE")]
    pub baud_rate: Option<u32>,

    /// API key for the AI service
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Chat completions endpoint
    #[arg(long)]
    pub endpoint: Option<String>,

    #[arg(long)]
    pub model: Option<String>,

    /// Delay between bytes of a blink sequence
    #[arg(long)]
    pub blink_interval_ms: Option<u64>,

    #[arg(long)]
    pub write_timeout_ms: Option<u64>,

    /// Wait after opening the port while the board resets
    #[arg(long)]
    pub settle_ms: Option<u64>,

    /// Run without hardware: log the bytes instead of writing them
    #[arg(long, env = "DEMO_MODE", value_parser = FalseyValueParser::new())]
    pub demo: bool,

    /// Skip the AI service and match the typed text directly
    #[arg(long)]
    pub offline: bool,

    /// Process a single instruction and exit
    #[arg(long, value_name = "TEXT")]
    pub once: Option<String>,

    /// List available serial ports and exit
    #[arg(long)]
    pub list_ports: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    #[arg(short, long, env = "DEBUG_MODE", value_parser = FalseyValueParser::new())]
    pub verbose: bool,
}

impl CliConfig {
    /// 讀取 TOML（若有）並套用命令列覆蓋設定
    pub fn resolve(&self) -> Result<RelayConfig> {
        let mut config = match &self.config {
            Some(path) => RelayConfig::from_file(path)?,
            None => RelayConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut RelayConfig) {
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud_rate) = self.baud_rate {
            config.serial.baud_rate = baud_rate;
        }
        if let Some(write_timeout_ms) = self.write_timeout_ms {
            config.serial.write_timeout_ms = write_timeout_ms;
        }
        if let Some(settle_ms) = self.settle_ms {
            config.serial.settle_ms = settle_ms;
        }
        if let Some(api_key) = self.api_key.as_ref().filter(|key| !key.trim().is_empty()) {
            config.gateway.api_key = Some(api_key.clone());
        }
        if let Some(endpoint) = &self.endpoint {
            config.gateway.endpoint = endpoint.clone();
        }
        if let Some(model) = &self.model {
            config.gateway.model = model.clone();
        }
        if let Some(blink_interval_ms) = self.blink_interval_ms {
            config.session.blink_interval_ms = blink_interval_ms;
        }
        if self.demo {
            config.session.demo_mode = true;
        }
        if self.offline {
            config.session.offline = true;
        }
        if self.log_json {
            config.logging.json = true;
        }
    }
}
