//! Content-equality keys for watched values.
//!
//! Change detection compares full structural serializations, never object
//! identity, so a re-offered value that is freshly allocated but
//! content-identical can never schedule a save.

use anyhow::{Context, Result};
use serde::Serialize;

/// Serializes a watched value into its content-equality key.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).context("watched value is not serializable")
}
