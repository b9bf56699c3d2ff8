//! Data model and JSON bodies exchanged over the public HTTP API.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Fortune
// ---------------------------------------------------------------------------

/// A single fortune record.
///
/// `id` is the table's primary key and is assigned by the caller on insert.
/// Serialises as exactly `{"id": <int>, "name": <string>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fortune {
    /// Primary key.
    pub id: i64,
    /// The fortune text.
    pub name: String,
}

impl Fortune {
    /// Construct a [`Fortune`] from an id and text.
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Message body
// ---------------------------------------------------------------------------

/// `{"message": "..."}` body used for the greeting and for every error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable text safe to expose to callers.
    pub message: String,
}

impl MessageResponse {
    /// Construct a [`MessageResponse`].
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
