//! The wire contract shared by the snowdrift server and client.
//!
//! Both sides depend on this crate so the three response encodings are a
//! compile-time agreement rather than a convention:
//!
//! - plain text: the ID as decimal digits;
//! - JSON: [`IdBody`], a single-field object;
//! - protobuf: [`IdBatch`], the only encoding that can carry more than one
//!   ID per response.

use serde::{Deserialize, Serialize};

/// Media type of the plain-text encoding.
pub const TEXT_PLAIN: &str = "text/plain";
/// Media type of the JSON encoding.
pub const APPLICATION_JSON: &str = "application/json";
/// Media type of the protobuf batch encoding.
pub const APPLICATION_PROTOBUF: &str = "application/x-protobuf";

/// Cache directives attached to every generation response. A generated ID
/// must never be served from a cache, client-side or intermediary.
pub const NO_CACHE: &str = "must-revalidate, no-cache, no-store";

/// The JSON body for a single generated ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdBody {
    pub id: u64,
}

/// The protobuf response message: one or more generated IDs.
///
/// Equivalent schema:
///
/// ```proto
/// message IdBatch {
///     repeated uint64 ids = 1;
/// }
/// ```
#[derive(Clone, PartialEq, prost::Message)]
pub struct IdBatch {
    #[prost(uint64, repeated, tag = "1")]
    pub ids: Vec<u64>,
}

/// The JSON error body returned for failed generation requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The HTTP status code, repeated in the body.
    pub code: u16,
    pub message: String,
}
