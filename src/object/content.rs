//! Immutable, hash-addressed board content.
//!
//! Every content item is a `Content { header, body }`. The body carries the
//! fields shared by all variants (creator, board reference, creation time)
//! and a closed `BodyKind` enum with the variant-specific fields. The header
//! carries the content hash of the body, which is the item's identity.

use crate::error::{Result, StateError};
use crate::object::hash::{ContentHash, PublicKey};
use crate::object::types::{ContentKind, VoteTag, VoteValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Returns the current Unix timestamp in milliseconds.
pub fn current_timestamp_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// A vote's value and tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    /// −1, 0 or +1.
    pub value: VoteValue,
    /// Labels attached to the vote.
    pub tags: BTreeSet<VoteTag>,
}

impl Vote {
    /// Creates a vote with the given tags.
    pub fn new(value: VoteValue, tags: impl IntoIterator<Item = VoteTag>) -> Self {
        Self {
            value,
            tags: tags.into_iter().collect(),
        }
    }

    /// Creates a vote without tags.
    pub fn untagged(value: VoteValue) -> Self {
        Self {
            value,
            tags: BTreeSet::new(),
        }
    }

    /// Returns true if the vote carries `tag`.
    pub fn has_tag(&self, tag: VoteTag) -> bool {
        self.tags.contains(&tag)
    }
}

/// Variant-specific fields of a content body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Board metadata.
    Board {
        /// Board name.
        name: String,
        /// Board description.
        body: String,
    },
    /// Thread opener.
    Thread {
        /// Thread title.
        name: String,
        /// Thread body.
        body: String,
    },
    /// Reply within a thread, optionally to another post.
    Post {
        /// Thread this post belongs to.
        of_thread: ContentHash,
        /// Post this post replies to, if any.
        of_post: Option<ContentHash>,
        /// Post title.
        name: String,
        /// Post body.
        body: String,
    },
    /// Vote on a thread.
    ThreadVote {
        /// Target thread.
        of_thread: ContentHash,
        /// The vote.
        vote: Vote,
    },
    /// Vote on a post.
    PostVote {
        /// Thread of the target post.
        of_thread: ContentHash,
        /// Target post.
        of_post: ContentHash,
        /// The vote.
        vote: Vote,
    },
    /// Vote on a user.
    UserVote {
        /// Target user.
        of_user: PublicKey,
        /// The vote.
        vote: Vote,
    },
}

/// The hashed part of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    /// Public key of the author.
    pub creator: PublicKey,
    /// Public key of the board this content belongs to.
    pub of_board: PublicKey,
    /// Creation timestamp in milliseconds since Unix epoch.
    pub created: u64,
    /// Variant-specific fields.
    pub kind: BodyKind,
}

impl Body {
    /// Returns the variant of this body.
    pub fn content_kind(&self) -> ContentKind {
        match self.kind {
            BodyKind::Board { .. } => ContentKind::Board,
            BodyKind::Thread { .. } => ContentKind::Thread,
            BodyKind::Post { .. } => ContentKind::Post,
            BodyKind::ThreadVote { .. } => ContentKind::ThreadVote,
            BodyKind::PostVote { .. } => ContentKind::PostVote,
            BodyKind::UserVote { .. } => ContentKind::UserVote,
        }
    }

    /// Returns the thread this body references, if its variant has one.
    pub fn of_thread(&self) -> Option<&ContentHash> {
        match &self.kind {
            BodyKind::Post { of_thread, .. }
            | BodyKind::ThreadVote { of_thread, .. }
            | BodyKind::PostVote { of_thread, .. } => Some(of_thread),
            _ => None,
        }
    }

    /// Returns the vote fields, if this body is a vote.
    pub fn vote(&self) -> Option<&Vote> {
        match &self.kind {
            BodyKind::ThreadVote { vote, .. }
            | BodyKind::PostVote { vote, .. }
            | BodyKind::UserVote { vote, .. } => Some(vote),
            _ => None,
        }
    }
}

/// Header of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Content hash of the body - the identity of the item.
    pub hash: ContentHash,
}

/// A complete content item.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    /// Header with the content hash.
    pub header: Header,
    /// The hashed body.
    pub body: Body,
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Content")
            .field("kind", &self.body.content_kind())
            .field("creator", &self.body.creator)
            .field("hash", &self.header.hash)
            .finish()
    }
}

impl Content {
    /// Wraps a body, computing its content hash.
    pub fn new(body: Body) -> Result<Self> {
        let hash = ContentHash::compute(&body)?;
        Ok(Self {
            header: Header { hash },
            body,
        })
    }

    fn build(creator: PublicKey, of_board: PublicKey, kind: BodyKind) -> Result<Self> {
        Self::new(Body {
            creator,
            of_board,
            created: current_timestamp_millis(),
            kind,
        })
    }

    /// Creates a board content item for the board `board`.
    pub fn board(board: PublicKey, creator: PublicKey, name: &str, body: &str) -> Result<Self> {
        Self::build(
            creator,
            board,
            BodyKind::Board {
                name: name.to_string(),
                body: body.to_string(),
            },
        )
    }

    /// Creates a thread in `board`.
    pub fn thread(board: PublicKey, creator: PublicKey, name: &str, body: &str) -> Result<Self> {
        Self::build(
            creator,
            board,
            BodyKind::Thread {
                name: name.to_string(),
                body: body.to_string(),
            },
        )
    }

    /// Creates a post in `of_thread`, optionally replying to `of_post`.
    pub fn post(
        board: PublicKey,
        creator: PublicKey,
        of_thread: ContentHash,
        of_post: Option<ContentHash>,
        name: &str,
        body: &str,
    ) -> Result<Self> {
        Self::build(
            creator,
            board,
            BodyKind::Post {
                of_thread,
                of_post,
                name: name.to_string(),
                body: body.to_string(),
            },
        )
    }

    /// Creates a vote on a thread.
    pub fn thread_vote(
        board: PublicKey,
        creator: PublicKey,
        of_thread: ContentHash,
        vote: Vote,
    ) -> Result<Self> {
        Self::build(creator, board, BodyKind::ThreadVote { of_thread, vote })
    }

    /// Creates a vote on a post.
    pub fn post_vote(
        board: PublicKey,
        creator: PublicKey,
        of_thread: ContentHash,
        of_post: ContentHash,
        vote: Vote,
    ) -> Result<Self> {
        Self::build(
            creator,
            board,
            BodyKind::PostVote {
                of_thread,
                of_post,
                vote,
            },
        )
    }

    /// Creates a vote on a user.
    pub fn user_vote(
        board: PublicKey,
        creator: PublicKey,
        of_user: PublicKey,
        vote: Vote,
    ) -> Result<Self> {
        Self::build(creator, board, BodyKind::UserVote { of_user, vote })
    }

    /// Returns the content hash.
    pub fn hash(&self) -> &ContentHash {
        &self.header.hash
    }

    /// Returns the variant of this item.
    pub fn kind(&self) -> ContentKind {
        self.body.content_kind()
    }

    /// Returns the creator's public key.
    pub fn creator(&self) -> &PublicKey {
        &self.body.creator
    }

    /// Fails with `InvalidRead` unless this item is of `kind`.
    pub fn expect_kind(&self, kind: ContentKind) -> Result<()> {
        if self.kind() != kind {
            return Err(StateError::invalid_read(format!(
                "expected {} but content {} is a {}",
                kind,
                self.header.hash,
                self.kind()
            )));
        }
        Ok(())
    }

    /// Fails with `InvalidRead` unless this item declares board `expected`.
    pub fn check_board_ref(&self, expected: &PublicKey) -> Result<()> {
        if self.body.of_board != *expected {
            return Err(StateError::invalid_read(format!(
                "misplaced {} {}, unmatched board public key",
                self.kind(),
                self.header.hash
            )));
        }
        Ok(())
    }

    /// Fails with `InvalidRead` unless this item declares thread `expected`.
    pub fn check_thread_ref(&self, expected: &ContentHash) -> Result<()> {
        match self.body.of_thread() {
            Some(of_thread) if of_thread == expected => Ok(()),
            Some(_) => Err(StateError::invalid_read(format!(
                "misplaced {} {}, unmatched thread reference",
                self.kind(),
                self.header.hash
            ))),
            None => Err(StateError::invalid_read(format!(
                "corrupt {} {}, no thread reference",
                self.kind(),
                self.header.hash
            ))),
        }
    }

    /// Recomputes the body hash and compares it with the header.
    pub fn verify_hash(&self) -> Result<()> {
        let computed = ContentHash::compute(&self.body)?;
        if computed != self.header.hash {
            return Err(StateError::invalid_read(format!(
                "{} {} has mismatched content hash",
                self.kind(),
                self.header.hash
            )));
        }
        Ok(())
    }
}
