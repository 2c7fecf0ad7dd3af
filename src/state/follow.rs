//! Follow/reputation index fed by newly observed user votes.
//!
//! For every creator the index keeps the users it voted up (`yes`) and down
//! (`no`), each with the normalized vote mode and the vote's tags. A newer
//! vote for the same (creator, target) pair moves the target between the two
//! maps and overwrites its tag.

use crate::object::{BodyKind, Content, PublicKey, VoteValue};
use crate::state::votes::UserVoteHandler;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Mode and tags of the latest directional vote on a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowTag {
    /// `"+1"` or `"-1"`.
    pub mode: String,
    /// Vote tags, sorted and comma separated.
    pub tag: String,
}

/// Users one creator voted up or down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FollowPage {
    /// Users voted up.
    pub yes: BTreeMap<PublicKey, FollowTag>,
    /// Users voted down.
    pub no: BTreeMap<PublicKey, FollowTag>,
}

/// Follow pages keyed by creator.
#[derive(Debug, Clone, Default)]
pub struct FollowIndex {
    pages: HashMap<PublicKey, FollowPage>,
}

impl FollowIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the follow page of `creator`.
    pub fn get(&self, creator: &PublicKey) -> Option<&FollowPage> {
        self.pages.get(creator)
    }

    /// Returns the number of creators with a follow page.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Returns true if no creator has voted.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    fn apply(&mut self, vote: &Content) {
        let (target, value, tag) = match &vote.body.kind {
            BodyKind::UserVote { of_user, vote } => {
                let tag = vote
                    .tags
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                (*of_user, vote.value, tag)
            }
            _ => return,
        };
        let page = self.pages.entry(*vote.creator()).or_default();
        let follow = FollowTag {
            mode: value.mode().to_string(),
            tag,
        };
        match value {
            VoteValue::Up => {
                page.no.remove(&target);
                page.yes.insert(target, follow);
            }
            VoteValue::Down => {
                page.yes.remove(&target);
                page.no.insert(target, follow);
            }
            VoteValue::Neutral => {}
        }
    }
}

impl UserVoteHandler for FollowIndex {
    fn on_upvote(&mut self, vote: &Content) {
        self.apply(vote);
    }

    fn on_downvote(&mut self, vote: &Content) {
        self.apply(vote);
    }
}
