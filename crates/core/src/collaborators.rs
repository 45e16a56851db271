//! Seams to the services around the cache.
//!
//! Fetching and cleaning HTML, calling the code generation model, and running
//! generated code all live outside this crate. The controller only needs the
//! narrow interfaces below.

use async_trait::async_trait;

use crate::GenerationError;

/// A cleaned HTML document and the URL it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub html: String,
    pub url: String,
}

impl Document {
    pub fn new(html: impl Into<String>, url: impl Into<String>) -> Self {
        Self { html: html.into(), url: url.into() }
    }
}

/// Produces extraction code for a document.
///
/// Implementations may be slow (seconds) and may fail. Retries and backoff are
/// the implementation's concern.
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    async fn generate(&self, document: &Document, target_fields: &[String]) -> Result<String, GenerationError>;
}

/// Outcome of running cached code against a new document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The code produced usable records.
    Valid,
    /// The code ran but extracted nothing.
    Empty,
    /// The code failed or produced structurally invalid records.
    Invalid(String),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }
}

/// Runs generated code and judges its output.
#[async_trait]
pub trait ExtractionVerifier: Send + Sync {
    async fn verify(&self, generated_code: &str, document: &Document) -> Verdict;
}
