use crate::domain::model::ControlByte;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Natural-language completion service: free-form text in, reply text out.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// 對微控制器的單一連線
pub trait DeviceChannel: Send {
    fn port_name(&self) -> &str;
    fn is_open(&self) -> bool;
    /// Writes one byte. Fire-and-forget: nothing is read back.
    fn send(&mut self, byte: ControlByte) -> Result<()>;
    /// Releases the connection. Calling it twice is a no-op.
    fn close(&mut self);
}

#[async_trait]
impl<G: CompletionGateway + ?Sized> CompletionGateway for Box<G> {
    async fn complete(&self, prompt: &str) -> Result<String> {
        (**self).complete(prompt).await
    }
}

impl<D: DeviceChannel + ?Sized> DeviceChannel for Box<D> {
    fn port_name(&self) -> &str {
        (**self).port_name()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn send(&mut self, byte: ControlByte) -> Result<()> {
        (**self).send(byte)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
