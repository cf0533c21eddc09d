// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live location share between two users.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Stored location share record, keyed by (sharer, recipient).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/generated/")
)]
pub struct LocationShare {
    pub sharer_id: String,
    pub recipient_id: String,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    /// Last position write (ISO 8601)
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub active: bool,
}

impl LocationShare {
    /// Document ID for a (sharer, recipient) pair.
    pub fn doc_id(sharer_id: &str, recipient_id: &str) -> String {
        // ':' never survives encoding, so it cannot appear inside either part.
        format!(
            "{}:{}",
            urlencoding::encode(sharer_id),
            urlencoding::encode(recipient_id)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_id_escapes_separator() {
        let a = LocationShare::doc_id("a_b", "c");
        let b = LocationShare::doc_id("a", "b_c");
        assert_ne!(a, b);
        assert_ne!(
            LocationShare::doc_id("a:b", "c"),
            LocationShare::doc_id("a", "b:c")
        );
    }
}
