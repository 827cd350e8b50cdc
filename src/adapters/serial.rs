use crate::config::toml_config::SerialSettings;
use crate::domain::model::ControlByte;
use crate::domain::ports::DeviceChannel;
use crate::utils::error::{RelayError, Result};
use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::io::{ErrorKind, Write};
use std::time::Duration;

/// 以 serialport 實作的實體連線
pub struct SerialChannel {
    port_name: String,
    write_timeout: Duration,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialChannel {
    /// Opens the port and waits for the board to finish its reset.
    pub fn open(settings: &SerialSettings) -> Result<Self> {
        tracing::info!(
            "Opening {} at {} baud",
            settings.port,
            settings.baud_rate
        );

        let write_timeout = Duration::from_millis(settings.write_timeout_ms);
        let port = serialport::new(&settings.port, settings.baud_rate)
            .timeout(write_timeout)
            .open()?;

        // Arduino 在開啟串列埠時會重置，需等待開機完成
        if settings.settle_ms > 0 {
            tracing::debug!("Waiting {}ms for the board to settle", settings.settle_ms);
            std::thread::sleep(Duration::from_millis(settings.settle_ms));
        }

        tracing::info!("✅ Connected to {}", settings.port);
        Ok(Self {
            port_name: settings.port.clone(),
            write_timeout,
            port: Some(port),
        })
    }

    /// Wraps a port that is already open, e.g. one side of a pseudo-terminal pair.
    pub fn from_port(port: Box<dyn SerialPort>, write_timeout: Duration) -> Self {
        let port_name = port.name().unwrap_or_else(|| "unnamed".to_string());
        Self {
            port_name,
            write_timeout,
            port: Some(port),
        }
    }

    /// A channel that was never opened. Every send fails with `ChannelUnavailable`.
    pub fn disconnected(port_name: &str) -> Self {
        Self {
            port_name: port_name.to_string(),
            write_timeout: Duration::ZERO,
            port: None,
        }
    }

    fn map_write_error(&self, error: std::io::Error) -> RelayError {
        match error.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => RelayError::WriteTimeout {
                port: self.port_name.clone(),
                timeout_ms: self.write_timeout.as_millis() as u64,
            },
            ErrorKind::BrokenPipe | ErrorKind::NotConnected => RelayError::ChannelUnavailable {
                message: format!("{} was disconnected: {}", self.port_name, error),
            },
            _ => RelayError::IoError(error),
        }
    }
}

impl DeviceChannel for SerialChannel {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn send(&mut self, byte: ControlByte) -> Result<()> {
        let Some(port) = self.port.as_mut() else {
            return Err(RelayError::ChannelUnavailable {
                message: format!("{} is not open", self.port_name),
            });
        };

        let written = port.write_all(&[byte.as_byte()]).and_then(|_| port.flush());
        written.map_err(|e| self.map_write_error(e))
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::debug!("Closed {}", self.port_name);
        }
    }
}

impl Drop for SerialChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// 列出系統上可用的串列埠
pub fn available_ports() -> Result<Vec<SerialPortInfo>> {
    Ok(serialport::available_ports()?)
}

pub fn describe_port(info: &SerialPortInfo) -> String {
    match &info.port_type {
        SerialPortType::UsbPort(usb) => {
            let product = usb.product.as_deref().unwrap_or("USB device");
            format!(
                "{} ({}, {:04x}:{:04x})",
                info.port_name, product, usb.vid, usb.pid
            )
        }
        SerialPortType::BluetoothPort => format!("{} (Bluetooth)", info.port_name),
        SerialPortType::PciPort => format!("{} (PCI)", info.port_name),
        SerialPortType::Unknown => info.port_name.clone(),
    }
}
