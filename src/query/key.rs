//! Cache identity for queries.

use std::fmt;

use serde::Serialize;

/// An ordered tuple of segments identifying a cached read.
///
/// Keys with equal segments map to the same cache slot. Structured
/// parameters are canonicalized into a single JSON segment, so two filters
/// with equal values produce equal keys regardless of where they were
/// built.
///
/// Invalidation operates on prefixes: invalidating `["appointments"]`
/// covers `["appointments", "<filter>"]` and every other key that starts
/// with that segment.
///
/// # Example
///
/// ```rust,ignore
/// let key = QueryKey::new("clinicians")
///     .push(clinician_id)
///     .push("availability");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    segments: Vec<String>,
}

impl QueryKey {
    /// A key with a single root segment.
    #[must_use]
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            segments: vec![root.into()],
        }
    }

    /// Appends one segment.
    #[must_use]
    pub fn push(mut self, segment: impl fmt::Display) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    /// Appends a structured-parameters segment in canonical JSON form.
    ///
    /// Struct fields serialize in declaration order, so equal parameter
    /// values always canonicalize to the same segment.
    #[must_use]
    pub fn with_params<P: Serialize>(self, params: &P) -> Self {
        let segment = serde_json::to_string(params).unwrap_or_else(|_| "null".to_string());
        self.push(segment)
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Whether this key's segments lead `other`'s.
    ///
    /// Every key is a prefix of itself.
    #[must_use]
    pub fn is_prefix_of(&self, other: &QueryKey) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a == b)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}
