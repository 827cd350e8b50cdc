use crate::domain::ports::CompletionGateway;
use crate::utils::error::Result;
use async_trait::async_trait;

/// Offline gateway: returns the user's text unchanged so the keyword table sees it directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughGateway;

#[async_trait]
impl CompletionGateway for PassthroughGateway {
    async fn complete(&self, prompt: &str) -> Result<String> {
        Ok(prompt.to_string())
    }
}
