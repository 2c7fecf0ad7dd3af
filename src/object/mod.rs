//! Content-addressed board objects.
//!
//! - [`ContentHash`], [`PublicKey`], [`SecretKey`]: 32-byte identities
//! - [`Content`]: immutable board content (board, thread, post, votes)
//! - [`ContentKind`], [`VoteValue`], [`VoteTag`]: discriminators and vote primitives

mod content;
mod hash;
mod types;

pub use content::{current_timestamp_millis, Body, BodyKind, Content, Header, Vote};
pub use hash::{hash_data, ContentHash, PublicKey, SecretKey, KEY_LEN};
pub use types::{ContentKind, VoteTag, VoteValue};
