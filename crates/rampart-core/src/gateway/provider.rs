//! TextProvider trait definition.
//!
//! This is the core abstraction that all generation backends implement.
//! Uses native async fn in traits (RPITIT, Rust 2024 edition); the
//! `BoxTextProvider` wrapper provides dynamic dispatch on top.

use rampart_types::gateway::{GatewayError, GenerationRequest};

/// Fixed prompt sent by the health probe. A well-behaved backend echoes a
/// short non-empty answer; the probe only checks shape, not content quality.
pub const PROBE_PROMPT: &str = "Reply with the single word: ready";

/// Trait for text-generation backends (OpenAI, Anthropic, Gemini, ...).
///
/// Implementations live in rampart-infra or in the application layer; the
/// gateway only sees this surface.
pub trait TextProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openai", "anthropic").
    fn name(&self) -> &str;

    /// Generate the draft text for a request.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = Result<String, GatewayError>> + Send;

    /// Issue the small fixed probe request.
    ///
    /// The default implementation sends [`PROBE_PROMPT`] through
    /// `generate`. Backends with a cheaper liveness endpoint may override.
    fn probe(&self) -> impl std::future::Future<Output = Result<String, GatewayError>> + Send {
        let request = GenerationRequest {
            prompt: PROBE_PROMPT.to_string(),
            context_docs: Vec::new(),
            language: "en".to_string(),
            provider_hint: rampart_types::gateway::ProviderHint::Named(self.name().to_string()),
            model_hint: None,
        };
        async move { self.generate(&request).await }
    }
}
