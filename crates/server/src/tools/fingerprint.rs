//! fingerprint tool implementation.
//!
//! Computes the structural fingerprint of an HTML document and the cache key
//! it would be stored under. Nothing is read from or written to the cache.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uscrape_core::fingerprint::{fingerprint_with_skeleton, normalize_fields};

use super::json_result;

/// Input parameters for the fingerprint tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FingerprintParams {
    /// The cleaned HTML document.
    pub html: String,

    /// Field names the extraction code would target.
    #[serde(default)]
    pub target_fields: Vec<String>,
}

/// Output structure for the fingerprint tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FingerprintOutput {
    /// Hash of the tag and attribute-name skeleton.
    pub fingerprint: String,
    /// Key the cache uses for this document and field set, absent for empty documents.
    pub cache_key: Option<String>,
    /// Normalized target fields.
    pub target_fields: Vec<String>,
    /// Number of elements in the skeleton.
    pub element_count: usize,
    /// Whether the document was empty (never cached).
    pub empty: bool,
}

/// Implementation of the fingerprint tool.
pub async fn fingerprint_impl(params: FingerprintParams) -> Result<CallToolResult, McpError> {
    let (structural, nodes) = fingerprint_with_skeleton(&params.html)?;
    let empty = structural.is_empty();

    let output = FingerprintOutput {
        fingerprint: structural.to_string(),
        cache_key: (!empty).then(|| structural.scoped(&params.target_fields).to_string()),
        target_fields: normalize_fields(&params.target_fields),
        element_count: nodes.len(),
        empty,
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::decode;

    const LISTING: &str = r#"<html><body><ul class="jobs"><li data-id="1"><a href="/j/1">Rust</a></li></ul></body></html>"#;

    #[tokio::test]
    async fn test_fingerprint_reports_key() {
        let params = FingerprintParams { html: LISTING.into(), target_fields: vec!["title".into(), " title ".into()] };

        let result = fingerprint_impl(params).await.unwrap();
        let output: FingerprintOutput = decode(&result);

        assert_eq!(output.fingerprint.len(), 32);
        assert!(!output.empty);
        assert_eq!(output.target_fields, vec!["title".to_string()]);
        assert_eq!(output.element_count, 6);
        assert_ne!(output.cache_key.as_deref(), Some(output.fingerprint.as_str()));
    }

    #[tokio::test]
    async fn test_fingerprint_empty_document() {
        let params = FingerprintParams { html: "  ".into(), target_fields: Vec::new() };

        let output: FingerprintOutput = decode(&fingerprint_impl(params).await.unwrap());
        assert!(output.empty);
        assert!(output.cache_key.is_none());
        assert_eq!(output.fingerprint, "0".repeat(32));
    }

    #[tokio::test]
    async fn test_fingerprint_rejects_plain_text() {
        let params = FingerprintParams { html: "no markup here".into(), target_fields: Vec::new() };

        let err = fingerprint_impl(params).await.unwrap_err();
        assert_eq!(err.code.0, -32000);
        assert!(err.message.contains("no markup"));
    }
}
