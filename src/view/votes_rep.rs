//! Per-content vote aggregates.

use crate::object::{BodyKind, Content, ContentHash, ContentKind, PublicKey, VoteValue};
use serde::Serialize;
use std::collections::HashMap;

/// Count of one vote direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VoteCount {
    /// Number of voters.
    pub count: u64,
    /// True when the perspective user is one of them.
    pub voted: bool,
}

/// Vote totals of one thread or post, seen from one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoteView {
    /// The voted content.
    #[serde(rename = "ref")]
    pub of: ContentHash,
    /// Up votes.
    pub up_votes: VoteCount,
    /// Down votes.
    pub down_votes: VoteCount,
}

impl VoteView {
    /// A view of content without votes.
    pub fn empty(of: ContentHash) -> Self {
        Self {
            of,
            up_votes: VoteCount::default(),
            down_votes: VoteCount::default(),
        }
    }
}

/// The current vote of every voter on one thread or post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotesRep {
    kind: ContentKind,
    of: ContentHash,
    votes: HashMap<PublicKey, VoteValue>,
}

impl VotesRep {
    /// Creates an empty aggregate of `kind` votes on `of`.
    pub fn new(kind: ContentKind, of: ContentHash) -> Self {
        Self {
            kind,
            of,
            votes: HashMap::new(),
        }
    }

    /// Records `vote`, replacing the voter's previous vote.
    ///
    /// Votes of another kind are ignored.
    pub fn add(&mut self, vote: &Content) {
        let value = match &vote.body.kind {
            BodyKind::ThreadVote { vote, .. } if self.kind == ContentKind::ThreadVote => vote.value,
            BodyKind::PostVote { vote, .. } if self.kind == ContentKind::PostVote => vote.value,
            _ => return,
        };
        self.votes.insert(*vote.creator(), value);
    }

    /// Returns the number of voters.
    pub fn len(&self) -> usize {
        self.votes.len()
    }

    /// Returns true if nobody voted.
    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    /// Computes the totals as seen by `perspective`.
    pub fn view(&self, perspective: Option<&PublicKey>) -> VoteView {
        let mut view = VoteView::empty(self.of);
        for value in self.votes.values() {
            match value {
                VoteValue::Up => view.up_votes.count += 1,
                VoteValue::Down => view.down_votes.count += 1,
                VoteValue::Neutral => {}
            }
        }
        match perspective.and_then(|pk| self.votes.get(pk)) {
            Some(VoteValue::Up) => view.up_votes.voted = true,
            Some(VoteValue::Down) => view.down_votes.voted = true,
            _ => {}
        }
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Vote;

    fn key(b: u8) -> PublicKey {
        PublicKey::from_bytes([b; 32])
    }

    fn vote(voter: u8, thread: ContentHash, value: VoteValue) -> Content {
        Content::thread_vote(key(1), key(voter), thread, Vote::untagged(value)).unwrap()
    }

    #[test]
    fn test_view_counts_and_perspective() {
        let thread = ContentHash::from_bytes([7; 32]);
        let mut rep = VotesRep::new(ContentKind::ThreadVote, thread);
        rep.add(&vote(2, thread, VoteValue::Up));
        rep.add(&vote(3, thread, VoteValue::Up));
        rep.add(&vote(4, thread, VoteValue::Down));
        rep.add(&vote(5, thread, VoteValue::Neutral));

        let view = rep.view(Some(&key(4)));
        assert_eq!(view.up_votes, VoteCount { count: 2, voted: false });
        assert_eq!(view.down_votes, VoteCount { count: 1, voted: true });

        let anonymous = rep.view(None);
        assert!(!anonymous.up_votes.voted && !anonymous.down_votes.voted);
        assert_eq!(rep.len(), 4);
    }

    #[test]
    fn test_latest_vote_wins() {
        let thread = ContentHash::from_bytes([7; 32]);
        let mut rep = VotesRep::new(ContentKind::ThreadVote, thread);
        rep.add(&vote(2, thread, VoteValue::Up));
        rep.add(&vote(2, thread, VoteValue::Down));

        let view = rep.view(Some(&key(2)));
        assert_eq!(view.up_votes.count, 0);
        assert_eq!(view.down_votes, VoteCount { count: 1, voted: true });
    }

    #[test]
    fn test_other_kind_ignored() {
        let thread = ContentHash::from_bytes([7; 32]);
        let mut rep = VotesRep::new(ContentKind::PostVote, thread);
        rep.add(&vote(2, thread, VoteValue::Up));
        assert!(rep.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let view = VoteView::empty(ContentHash::from_bytes([1; 32]));
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["ref"], "01".repeat(32));
        assert_eq!(json["up_votes"]["count"], 0);
        assert_eq!(json["down_votes"]["voted"], false);
    }
}
