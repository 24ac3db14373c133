pub mod client;
pub mod gemini;
pub mod orchestrator;
pub mod store;

pub use client::{EchoClient, GenerationClient, GenerationError, GenerationRequest, GENERIC_FAILURE_MESSAGE};
pub use gemini::GeminiClient;
pub use orchestrator::{BatchReport, Orchestrator};
pub use store::{ResultStore, RunId, StoreEvent, StoreObserver, StoreSnapshot};

use crate::ai_provider::AiProvider;
use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;

/// プロバイダ指定からクライアントを作る
pub fn build_client(provider: AiProvider, config: &Config) -> Result<Arc<dyn GenerationClient>> {
    let client: Arc<dyn GenerationClient> = match provider {
        AiProvider::Gemini => Arc::new(GeminiClient::from_config(config)?),
        AiProvider::Echo => Arc::new(EchoClient),
    };
    Ok(client)
}
