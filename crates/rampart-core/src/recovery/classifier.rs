//! Failure classification.
//!
//! Maps a raw error message plus caller context into the closed
//! `FailureKind` set by substring matching in priority order. Classification
//! is soft: an unrecognized message falls back to the caller-supplied
//! service tag, then to `Unknown` -- it never fails.

use std::collections::BTreeMap;

use rampart_types::failure::FailureKind;

/// Database-engine tokens, checked first.
const DB_TOKENS: &[&str] = &["mongodb", "mongo", "postgres", "mysql", "sqlite", "database"];

/// Known AI-provider names.
const AI_TOKENS: &[&str] = &["openai", "anthropic", "claude", "gemini", "mistral", "gpt-"];

/// Mail transport tokens.
const EMAIL_TOKENS: &[&str] = &["smtp", "sendgrid", "mailgun", "email"];

/// Vector-store tokens.
const VECTOR_TOKENS: &[&str] = &["qdrant", "pinecone", "weaviate", "vector store", "embedding"];

/// Classify an error message with its context.
pub fn classify(message: &str, context: &BTreeMap<String, String>) -> FailureKind {
    let lowered = message.to_lowercase();

    let contains_any = |tokens: &[&str]| tokens.iter().any(|t| lowered.contains(t));

    if contains_any(DB_TOKENS) {
        return FailureKind::DbConnection;
    }
    if contains_any(AI_TOKENS) {
        return FailureKind::AiProvider;
    }
    if contains_any(EMAIL_TOKENS) {
        return FailureKind::EmailService;
    }
    if contains_any(VECTOR_TOKENS) {
        return FailureKind::VectorStore;
    }

    match context.get("service") {
        Some(service) if !service.trim().is_empty() => {
            FailureKind::Service(service.trim().to_string())
        }
        _ => FailureKind::Unknown,
    }
}
