//! Structural fingerprints for HTML documents.
//!
//! A fingerprint captures the tag skeleton of a page: element names, the set of
//! attribute names on each element, and nesting depth. Text, comments, and
//! attribute values are discarded, so two pages rendered from the same
//! template share a fingerprint even when their content differs.
//!
//! The skeleton is hashed as a length-prefixed token stream, so distinct
//! skeletons cannot produce the same byte sequence before hashing.

use std::fmt;
use std::str::FromStr;

use scraper::{Html, Node};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::Error;

/// 128-bit structural signature of a document.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; Fingerprint::LEN]);

impl Fingerprint {
    /// Width of a fingerprint in bytes.
    pub const LEN: usize = 16;

    /// Reserved fingerprint for empty documents. Never stored.
    pub const EMPTY: Fingerprint = Fingerprint([0; Fingerprint::LEN]);

    pub const fn from_bytes(bytes: [u8; Fingerprint::LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; Fingerprint::LEN] {
        &self.0
    }

    /// True for the empty-document sentinel.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Derive the cache key for this structure and a set of target fields.
    ///
    /// Field order, surrounding whitespace, and duplicates do not matter.
    /// The empty sentinel stays the sentinel.
    pub fn scoped(&self, fields: &[String]) -> Fingerprint {
        if self.is_empty() {
            return *self;
        }

        let mut hasher = Sha256::new();
        hasher.update(b"scope");
        hasher.update(self.0);
        let fields = normalize_fields(fields);
        hasher.update((fields.len() as u64).to_le_bytes());
        for field in &fields {
            write_token(&mut hasher, field);
        }
        Self::from_hasher(hasher)
    }

    fn from_hasher(hasher: Sha256) -> Self {
        let digest = hasher.finalize();
        let mut bytes = [0u8; Fingerprint::LEN];
        bytes.copy_from_slice(&digest[..Fingerprint::LEN]);
        Self(bytes)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

impl FromStr for Fingerprint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let decoded = hex::decode(s.trim()).map_err(|e| Error::InvalidFingerprint(format!("{s}: {e}")))?;
        let bytes: [u8; Fingerprint::LEN] = decoded
            .try_into()
            .map_err(|_| Error::InvalidFingerprint(format!("{s}: expected {} hex characters", Fingerprint::LEN * 2)))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One element of a document skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkeletonNode {
    /// Number of element ancestors.
    pub depth: u32,
    /// Lowercased tag name.
    pub tag: String,
    /// Sorted, deduplicated attribute names.
    pub attributes: Vec<String>,
}

/// Compute the structural fingerprint of an HTML document.
///
/// Empty or whitespace-only input yields [`Fingerprint::EMPTY`].
///
/// # Errors
///
/// Returns [`Error::Parse`] when the input contains no markup or contains NUL
/// bytes.
pub fn fingerprint(html: &str) -> Result<Fingerprint, Error> {
    fingerprint_with_skeleton(html).map(|(fp, _)| fp)
}

/// Like [`fingerprint`], also returning the skeleton it was computed from.
///
/// The skeleton is empty for the empty-document sentinel.
pub fn fingerprint_with_skeleton(html: &str) -> Result<(Fingerprint, Vec<SkeletonNode>), Error> {
    if html.trim().is_empty() {
        return Ok((Fingerprint::EMPTY, Vec::new()));
    }

    let nodes = skeleton(html)?;
    Ok((hash_skeleton(&nodes), nodes))
}

fn hash_skeleton(nodes: &[SkeletonNode]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(b"skeleton");
    hasher.update((nodes.len() as u64).to_le_bytes());
    for node in nodes {
        hasher.update(node.depth.to_le_bytes());
        write_token(&mut hasher, &node.tag);
        hasher.update((node.attributes.len() as u64).to_le_bytes());
        for attr in &node.attributes {
            write_token(&mut hasher, attr);
        }
    }
    Fingerprint::from_hasher(hasher)
}

/// Parse a document into its pre-order element skeleton.
///
/// # Errors
///
/// Returns [`Error::Parse`] when the input cannot be analyzed structurally.
pub fn skeleton(html: &str) -> Result<Vec<SkeletonNode>, Error> {
    if html.contains('\0') {
        return Err(Error::Parse("document contains NUL bytes".into()));
    }
    if !html.contains('<') {
        return Err(Error::Parse("document contains no markup".into()));
    }

    let doc = Html::parse_document(html);
    let mut nodes = Vec::new();
    let mut stack = vec![(doc.tree.root(), 0u32)];

    while let Some((node, depth)) = stack.pop() {
        let child_depth = match node.value() {
            Node::Element(element) => {
                let mut attributes: Vec<String> = element.attrs().map(|(name, _)| name.to_string()).collect();
                attributes.sort_unstable();
                attributes.dedup();
                nodes.push(SkeletonNode { depth, tag: element.name().to_string(), attributes });
                depth + 1
            }
            Node::Document | Node::Fragment => depth,
            _ => continue,
        };

        let children: Vec<_> = node.children().collect();
        for child in children.into_iter().rev() {
            stack.push((child, child_depth));
        }
    }

    Ok(nodes)
}

/// Trim, drop blanks, sort, and deduplicate target field names.
pub fn normalize_fields(fields: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = fields
        .iter()
        .map(|f| f.trim())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect();
    normalized.sort_unstable();
    normalized.dedup();
    normalized
}

fn write_token(hasher: &mut Sha256, token: &str) {
    hasher.update((token.len() as u64).to_le_bytes());
    hasher.update(token.as_bytes());
}
