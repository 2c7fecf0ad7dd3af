//! Vote summaries carried from one snapshot instance to the next.
//!
//! Each vote-pages slot is summarized per target: the page's position in the
//! slot, the hash of the page record and the latest vote of every voter. A
//! store remembers the slot hash it was built from, so an unchanged slot is
//! carried forward without decoding its pages, and an unchanged page is
//! carried forward without walking its votes.
//!
//! A vote is "newly observed" when its content hash did not appear in the
//! predecessor's summary for the same target. Only those are recorded in the
//! change set and handed to the user-vote callbacks.

use crate::error::{Result, StateError};
use crate::object::{BodyKind, Content, ContentHash, ContentKind, PublicKey, VoteValue};
use crate::snapshot::{hash_value, ContentVotesPages, SnapshotStore, UserVotesPages};
use crate::state::changes::ChangeSet;
use crate::state::origin::OriginIndex;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// What a content-votes store summarizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget {
    /// Votes on threads.
    Thread,
    /// Votes on posts.
    Post,
}

impl VoteTarget {
    /// Content kind of the votes this target accepts.
    pub fn vote_kind(self) -> ContentKind {
        match self {
            VoteTarget::Thread => ContentKind::ThreadVote,
            VoteTarget::Post => ContentKind::PostVote,
        }
    }
}

/// Aggregate of one vote page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteSummary<K> {
    /// Position of the page in its slot.
    pub index: usize,
    /// Target of the votes.
    pub of: K,
    /// Hash of the serialized page record.
    pub page_hash: ContentHash,
    /// Latest vote of every voter.
    pub votes: HashMap<PublicKey, Content>,
    observed: HashSet<ContentHash>,
}

impl<K> VoteSummary<K> {
    /// Creates a summary of a page without votes.
    pub fn empty(index: usize, of: K, page_hash: ContentHash) -> Self {
        Self {
            index,
            of,
            page_hash,
            votes: HashMap::new(),
            observed: HashSet::new(),
        }
    }

    /// Returns true if the vote with `hash` was part of the summarized page.
    pub fn has_observed(&self, hash: &ContentHash) -> bool {
        self.observed.contains(hash)
    }

    /// Returns the latest vote of `voter`.
    pub fn vote_of(&self, voter: &PublicKey) -> Option<&Content> {
        self.votes.get(voter)
    }

    /// Returns the number of distinct voters.
    pub fn voter_count(&self) -> usize {
        self.votes.len()
    }
}

/// Walks the votes of one page into a summary.
///
/// `check` validates every vote; `on_new` is called for every vote that
/// `previous` has not observed.
fn summarize<K, C, N>(
    index: usize,
    of: K,
    page_hash: ContentHash,
    votes: &[Content],
    previous: Option<&VoteSummary<K>>,
    check: C,
    mut on_new: N,
) -> Result<VoteSummary<K>>
where
    C: Fn(&Content) -> Result<()>,
    N: FnMut(&Content),
{
    let mut summary = VoteSummary::empty(index, of, page_hash);
    for vote in votes {
        check(vote)?;
        let hash = *vote.hash();
        if !previous.map_or(false, |p| p.has_observed(&hash)) {
            on_new(vote);
        }
        summary.observed.insert(hash);
        summary.votes.insert(*vote.creator(), vote.clone());
    }
    Ok(summary)
}

/// Keyed collection of vote summaries built from one vote-pages slot.
#[derive(Debug, Clone)]
struct SummaryMap<K: Eq + Hash> {
    slot_hash: Option<ContentHash>,
    summaries: HashMap<K, VoteSummary<K>>,
}

impl<K: Eq + Hash> Default for SummaryMap<K> {
    fn default() -> Self {
        Self {
            slot_hash: None,
            summaries: HashMap::new(),
        }
    }
}

/// Vote summaries of threads or posts, keyed by content hash.
#[derive(Debug, Clone)]
pub struct ContentVotesStore {
    target: VoteTarget,
    inner: SummaryMap<ContentHash>,
}

impl ContentVotesStore {
    /// Creates an empty store.
    pub fn new(target: VoteTarget) -> Self {
        Self {
            target,
            inner: SummaryMap::default(),
        }
    }

    /// Returns a copy of `previous` if it was built from `slot_hash`.
    pub fn carry_forward(previous: Option<&Self>, slot_hash: &ContentHash) -> Option<Self> {
        previous
            .filter(|p| p.inner.slot_hash.as_ref() == Some(slot_hash))
            .cloned()
    }

    /// Builds the store from the pages stored at `slot_hash`.
    ///
    /// Every vote must hash to its header, be of the target's vote kind,
    /// declare `board`, and point at the page's content. A post vote must
    /// also name the thread `origins` places the post in, when the post is
    /// indexed. Newly observed votes are recorded in `changes`.
    #[allow(clippy::too_many_arguments)]
    pub fn build(
        previous: Option<&Self>,
        target: VoteTarget,
        store: &dyn SnapshotStore,
        slot_hash: ContentHash,
        pages: &ContentVotesPages,
        board: &PublicKey,
        origins: &OriginIndex,
        changes: &mut ChangeSet,
    ) -> Result<Self> {
        let mut summaries = HashMap::with_capacity(pages.pages.len());

        for (index, page) in pages.pages.iter().enumerate() {
            let page_hash = hash_value(store, page)?;
            let prev = previous.and_then(|p| p.inner.summaries.get(&page.of_content));

            if let Some(prev) = prev.filter(|p| p.page_hash == page_hash) {
                let mut reused = prev.clone();
                reused.index = index;
                summaries.insert(page.of_content, reused);
                continue;
            }

            let check = |vote: &Content| -> Result<()> {
                vote.verify_hash()?;
                vote.expect_kind(target.vote_kind())?;
                vote.check_board_ref(board)?;
                let voted = match (&vote.body.kind, target) {
                    (BodyKind::ThreadVote { of_thread, .. }, VoteTarget::Thread) => of_thread,
                    (BodyKind::PostVote { of_thread, of_post, .. }, VoteTarget::Post) => {
                        match origins.thread_of(of_post) {
                            Some(origin) if origin != *of_thread => {
                                return Err(StateError::invalid_read(format!(
                                    "post vote {} names thread {}, post {} is in thread {}",
                                    vote.hash(),
                                    of_thread,
                                    of_post,
                                    origin
                                )));
                            }
                            _ => of_post,
                        }
                    }
                    _ => unreachable_kind(vote)?,
                };
                if *voted != page.of_content {
                    return Err(StateError::invalid_read(format!(
                        "misplaced {} {}, page is for {}",
                        vote.kind(),
                        vote.hash(),
                        page.of_content
                    )));
                }
                Ok(())
            };

            let summary = summarize(
                index,
                page.of_content,
                page_hash,
                &page.votes,
                prev,
                check,
                |vote| changes.record_new(vote),
            )?;
            summaries.insert(page.of_content, summary);
        }

        Ok(Self {
            target,
            inner: SummaryMap {
                slot_hash: Some(slot_hash),
                summaries,
            },
        })
    }

    /// Returns what this store summarizes.
    pub fn target(&self) -> VoteTarget {
        self.target
    }

    /// Returns the summary of `hash`.
    pub fn get(&self, hash: &ContentHash) -> Option<&VoteSummary<ContentHash>> {
        self.inner.summaries.get(hash)
    }

    /// Sets the summary of `hash`.
    pub fn set(&mut self, hash: ContentHash, summary: VoteSummary<ContentHash>) {
        self.inner.summaries.insert(hash, summary);
    }

    /// Returns true if a summary exists for `hash`.
    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.inner.summaries.contains_key(hash)
    }

    /// Returns the slot hash this store reflects.
    pub fn slot_hash(&self) -> Option<&ContentHash> {
        self.inner.slot_hash.as_ref()
    }

    /// Points the store at a rewritten slot.
    pub fn set_slot_hash(&mut self, slot_hash: ContentHash) {
        self.inner.slot_hash = Some(slot_hash);
    }

    /// Returns the number of summarized pages.
    pub fn len(&self) -> usize {
        self.inner.summaries.len()
    }

    /// Returns true if no page is summarized.
    pub fn is_empty(&self) -> bool {
        self.inner.summaries.is_empty()
    }
}

fn unreachable_kind<T>(vote: &Content) -> Result<T> {
    Err(StateError::invalid_read(format!(
        "unexpected {} {} in vote page",
        vote.kind(),
        vote.hash()
    )))
}

/// Receives newly observed user votes during extraction.
pub trait UserVoteHandler {
    /// Called for a newly observed +1 user vote.
    fn on_upvote(&mut self, vote: &Content);

    /// Called for a newly observed −1 user vote.
    fn on_downvote(&mut self, vote: &Content);
}

impl<U, D> UserVoteHandler for (U, D)
where
    U: FnMut(&Content),
    D: FnMut(&Content),
{
    fn on_upvote(&mut self, vote: &Content) {
        (self.0)(vote)
    }

    fn on_downvote(&mut self, vote: &Content) {
        (self.1)(vote)
    }
}

/// Vote summaries of users, keyed by the voted user's public key.
#[derive(Debug, Clone, Default)]
pub struct UserVotesStore {
    inner: SummaryMap<PublicKey>,
}

impl UserVotesStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of `previous` if it was built from `slot_hash`.
    pub fn carry_forward(previous: Option<&Self>, slot_hash: &ContentHash) -> Option<Self> {
        previous
            .filter(|p| p.inner.slot_hash.as_ref() == Some(slot_hash))
            .cloned()
    }

    /// Builds the store from the pages stored at `slot_hash`.
    ///
    /// Newly observed votes are recorded in `changes`; up and down votes
    /// among them are also passed to `handler`. Neutral votes are not.
    pub fn build<H: UserVoteHandler>(
        previous: Option<&Self>,
        store: &dyn SnapshotStore,
        slot_hash: ContentHash,
        pages: &UserVotesPages,
        board: &PublicKey,
        changes: &mut ChangeSet,
        handler: &mut H,
    ) -> Result<Self> {
        let mut summaries = HashMap::with_capacity(pages.pages.len());

        for (index, page) in pages.pages.iter().enumerate() {
            let page_hash = hash_value(store, page)?;
            let prev = previous.and_then(|p| p.inner.summaries.get(&page.of_user));

            if let Some(prev) = prev.filter(|p| p.page_hash == page_hash) {
                let mut reused = prev.clone();
                reused.index = index;
                summaries.insert(page.of_user, reused);
                continue;
            }

            let check = |vote: &Content| -> Result<()> {
                vote.verify_hash()?;
                vote.expect_kind(ContentKind::UserVote)?;
                vote.check_board_ref(board)?;
                match &vote.body.kind {
                    BodyKind::UserVote { of_user, .. } if *of_user == page.of_user => Ok(()),
                    BodyKind::UserVote { .. } => Err(StateError::invalid_read(format!(
                        "misplaced user vote {}, page is for user {}",
                        vote.hash(),
                        page.of_user
                    ))),
                    _ => unreachable_kind(vote),
                }
            };

            let summary = summarize(
                index,
                page.of_user,
                page_hash,
                &page.votes,
                prev,
                check,
                |vote| {
                    changes.record_new(vote);
                    match vote.body.vote().map(|v| v.value) {
                        Some(VoteValue::Up) => handler.on_upvote(vote),
                        Some(VoteValue::Down) => handler.on_downvote(vote),
                        _ => {}
                    }
                },
            )?;
            summaries.insert(page.of_user, summary);
        }

        Ok(Self {
            inner: SummaryMap {
                slot_hash: Some(slot_hash),
                summaries,
            },
        })
    }

    /// Returns the summary of votes on `user`.
    pub fn get(&self, user: &PublicKey) -> Option<&VoteSummary<PublicKey>> {
        self.inner.summaries.get(user)
    }

    /// Sets the summary of votes on `user`.
    pub fn set(&mut self, user: PublicKey, summary: VoteSummary<PublicKey>) {
        self.inner.summaries.insert(user, summary);
    }

    /// Returns the slot hash this store reflects.
    pub fn slot_hash(&self) -> Option<&ContentHash> {
        self.inner.slot_hash.as_ref()
    }

    /// Returns the number of summarized pages.
    pub fn len(&self) -> usize {
        self.inner.summaries.len()
    }

    /// Returns true if no page is summarized.
    pub fn is_empty(&self) -> bool {
        self.inner.summaries.is_empty()
    }
}
