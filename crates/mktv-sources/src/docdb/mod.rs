//! REST client for the hosted document database
//!
//! Documents live at `projects/{project}/databases/(default)/documents/{collection}/{id}`
//! and store typed field values (`stringValue`, `doubleValue`, `mapValue`, ...).
//! `value` converts between those and plain JSON.

pub mod value;
pub mod client;

pub use client::{DocumentDbClient, StoredDocument};
pub use value::{decode_fields, encode_fields};
