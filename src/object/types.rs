//! Discriminators and vote primitives for board content.
//!
//! - `ContentKind`: which variant a content item is
//! - `VoteValue`: the −1 / 0 / +1 value of a vote
//! - `VoteTag`: labels attached to a vote (trust, spam, block)

use crate::error::{Result, StateError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type discriminator for content items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Board metadata - one per snapshot.
    Board,
    /// Thread - starts a discussion within the board.
    Thread,
    /// Post - a reply within a thread.
    Post,
    /// Vote on a thread.
    ThreadVote,
    /// Vote on a post.
    PostVote,
    /// Vote on a user (trust, spam, block).
    UserVote,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Board => write!(f, "board"),
            ContentKind::Thread => write!(f, "thread"),
            ContentKind::Post => write!(f, "post"),
            ContentKind::ThreadVote => write!(f, "thread vote"),
            ContentKind::PostVote => write!(f, "post vote"),
            ContentKind::UserVote => write!(f, "user vote"),
        }
    }
}

impl ContentKind {
    /// Returns true for the three vote variants.
    pub fn is_vote(&self) -> bool {
        matches!(
            self,
            ContentKind::ThreadVote | ContentKind::PostVote | ContentKind::UserVote
        )
    }
}

/// Value of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum VoteValue {
    /// −1
    Down,
    /// 0 - acknowledges the target without endorsing or rejecting it.
    Neutral,
    /// +1
    Up,
}

impl VoteValue {
    /// Returns the normalized mode string used by the follow index.
    pub fn mode(&self) -> &'static str {
        match self {
            VoteValue::Down => "-1",
            VoteValue::Neutral => "0",
            VoteValue::Up => "+1",
        }
    }
}

impl From<VoteValue> for i8 {
    fn from(value: VoteValue) -> Self {
        match value {
            VoteValue::Down => -1,
            VoteValue::Neutral => 0,
            VoteValue::Up => 1,
        }
    }
}

impl TryFrom<i8> for VoteValue {
    type Error = StateError;

    fn try_from(value: i8) -> Result<Self> {
        match value {
            -1 => Ok(VoteValue::Down),
            0 => Ok(VoteValue::Neutral),
            1 => Ok(VoteValue::Up),
            other => Err(StateError::invalid_read(format!(
                "Vote value {} is not one of -1, 0, +1",
                other
            ))),
        }
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mode())
    }
}

/// Label attached to a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteTag {
    /// Creator trusts the target user.
    Trust,
    /// Creator marks the target as spam.
    Spam,
    /// Creator blocks the target user.
    Block,
}

impl fmt::Display for VoteTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteTag::Trust => write!(f, "trust"),
            VoteTag::Spam => write!(f, "spam"),
            VoteTag::Block => write!(f, "block"),
        }
    }
}
