//! Snapshot instances: derived stores of one board snapshot.
//!
//! [`extract`] turns a snapshot (and optionally the stores of the previous
//! instance of the same board) into fresh [`Stores`] plus the [`ChangeSet`]
//! between the two. [`SnapshotInstance`] wraps the result behind a lock and
//! adds the two operations that mutate a snapshot after extraction: appending
//! an empty vote page for a thread or a post.

use crate::error::{Result, StateError};
use crate::object::{Content, ContentHash, ContentKind, PublicKey};
use crate::snapshot::{
    hash_value, read_content_index, read_deleted, read_post_vote_pages, read_thread_vote_pages,
    read_user_vote_pages, root_slot_hash, write_root_slot, ContentVotesPage, RootSlot, SlotValue,
    Snapshot, SnapshotStore,
};
use crate::state::changes::ChangeSet;
use crate::state::follow::{FollowIndex, FollowPage};
use crate::state::origin::{Origin, OriginIndex};
use crate::state::votes::{ContentVotesStore, UserVotesStore, VoteSummary, VoteTarget};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Hashes listed in a snapshot's `Deleted` slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletedSet {
    threads: HashSet<ContentHash>,
    posts: HashSet<ContentHash>,
}

impl DeletedSet {
    /// Returns true if thread `hash` is deleted.
    pub fn has_thread(&self, hash: &ContentHash) -> bool {
        self.threads.contains(hash)
    }

    /// Returns true if post `hash` is deleted.
    pub fn has_post(&self, hash: &ContentHash) -> bool {
        self.posts.contains(hash)
    }
}

/// Everything derived from one snapshot.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Thread/post origin index.
    pub origins: OriginIndex,
    /// Deleted hashes.
    pub deleted: DeletedSet,
    /// Vote summaries of threads.
    pub thread_votes: ContentVotesStore,
    /// Vote summaries of posts.
    pub post_votes: ContentVotesStore,
    /// Vote summaries of users.
    pub user_votes: UserVotesStore,
    /// Follow pages fed by user votes.
    pub follows: FollowIndex,
}

impl Stores {
    /// Returns the content-votes store for `target`.
    pub fn content_votes(&self, target: VoteTarget) -> &ContentVotesStore {
        match target {
            VoteTarget::Thread => &self.thread_votes,
            VoteTarget::Post => &self.post_votes,
        }
    }

    fn content_votes_mut(&mut self, target: VoteTarget) -> &mut ContentVotesStore {
        match target {
            VoteTarget::Thread => &mut self.thread_votes,
            VoteTarget::Post => &mut self.post_votes,
        }
    }
}

fn content_votes(
    store: &dyn SnapshotStore,
    snapshot: &Snapshot,
    target: VoteTarget,
    previous: Option<&ContentVotesStore>,
    origins: &OriginIndex,
    changes: &mut ChangeSet,
) -> Result<ContentVotesStore> {
    let slot = match target {
        VoteTarget::Thread => RootSlot::ThreadVotePages,
        VoteTarget::Post => RootSlot::PostVotePages,
    };
    let slot_hash = root_slot_hash(snapshot, slot)?;
    if let Some(carried) = ContentVotesStore::carry_forward(previous, &slot_hash) {
        return Ok(carried);
    }
    let pages = match target {
        VoteTarget::Thread => read_thread_vote_pages(store, snapshot)?,
        VoteTarget::Post => read_post_vote_pages(store, snapshot)?,
    };
    ContentVotesStore::build(
        previous,
        target,
        store,
        slot_hash,
        &pages,
        &snapshot.public_key,
        origins,
        changes,
    )
}

/// Records the stored votes of content that is new in this change set.
///
/// Vote pages may precede their content: votes the predecessor observed
/// while their target was not yet indexed are recorded again once it is.
/// Votes already recorded in `changes` are skipped.
fn replay_votes_of_new_content(
    thread_votes: &ContentVotesStore,
    post_votes: &ContentVotesStore,
    changes: &mut ChangeSet,
) {
    if !changes.is_recording() {
        return;
    }
    let recorded: HashSet<ContentHash> = changes
        .new_content()
        .iter()
        .map(|content| *content.hash())
        .collect();

    let mut replayed = Vec::new();
    for content in changes.new_content() {
        let summary = match content.kind() {
            ContentKind::Thread => thread_votes.get(content.hash()),
            ContentKind::Post => post_votes.get(content.hash()),
            _ => None,
        };
        if let Some(summary) = summary {
            let mut votes: Vec<&Content> = summary
                .votes
                .values()
                .filter(|vote| !recorded.contains(vote.hash()))
                .collect();
            votes.sort_by_key(|vote| *vote.creator());
            replayed.extend(votes.into_iter().cloned());
        }
    }
    if !replayed.is_empty() {
        debug!(
            "Replaying {} earlier votes on newly indexed content",
            replayed.len()
        );
    }
    for vote in &replayed {
        changes.record_new(vote);
    }
}

/// Builds the stores of `snapshot`, diffed against `previous`.
///
/// Changes are only recorded when `previous` is given. Any structural
/// problem aborts extraction with `InvalidRead`.
pub fn extract(
    store: &dyn SnapshotStore,
    snapshot: &Snapshot,
    previous: Option<&Stores>,
) -> Result<(Stores, ChangeSet)> {
    snapshot.validate_schema()?;
    let board = snapshot.public_key;
    let mut changes = ChangeSet::new(board, previous.is_some());

    let content = read_content_index(store, snapshot)?;
    content.board.verify_hash()?;
    content.board.expect_kind(ContentKind::Board)?;
    content.board.check_board_ref(&board)?;
    let origins = OriginIndex::build(
        previous.map(|p| &p.origins),
        root_slot_hash(snapshot, RootSlot::ContentIndex)?,
        &content,
        &board,
        &mut changes,
    )?;

    let listed = read_deleted(store, snapshot)?;
    let mut deleted = DeletedSet::default();
    for hash in listed.threads {
        if !previous.map_or(false, |p| p.deleted.has_thread(&hash)) {
            changes.record_delete_thread(hash);
        }
        deleted.threads.insert(hash);
    }
    for hash in listed.posts {
        if !previous.map_or(false, |p| p.deleted.has_post(&hash)) {
            let of_thread = origins
                .thread_of(&hash)
                .or_else(|| previous.and_then(|p| p.origins.thread_of(&hash)));
            changes.record_delete_post(of_thread, hash);
        }
        deleted.posts.insert(hash);
    }

    let thread_votes = content_votes(
        store,
        snapshot,
        VoteTarget::Thread,
        previous.map(|p| &p.thread_votes),
        &origins,
        &mut changes,
    )?;
    let post_votes = content_votes(
        store,
        snapshot,
        VoteTarget::Post,
        previous.map(|p| &p.post_votes),
        &origins,
        &mut changes,
    )?;

    replay_votes_of_new_content(&thread_votes, &post_votes, &mut changes);

    let mut follows = previous.map(|p| p.follows.clone()).unwrap_or_default();
    let user_slot = root_slot_hash(snapshot, RootSlot::UserVotePages)?;
    let prev_users = previous.map(|p| &p.user_votes);
    let user_votes = match UserVotesStore::carry_forward(prev_users, &user_slot) {
        Some(carried) => carried,
        None => UserVotesStore::build(
            prev_users,
            store,
            user_slot,
            &read_user_vote_pages(store, snapshot)?,
            &board,
            &mut changes,
            &mut follows,
        )?,
    };

    debug!(
        "Extracted snapshot {} of board {}: {} indexed, {} new, {} deleted threads, {} deleted posts",
        snapshot.seq,
        board,
        origins.len(),
        changes.new_content().len(),
        changes.deleted_threads().len(),
        changes.deleted_posts().len()
    );

    Ok((
        Stores {
            origins,
            deleted,
            thread_votes,
            post_votes,
            user_votes,
            follows,
        },
        changes,
    ))
}

/// Mutable part of a snapshot instance.
#[derive(Debug)]
pub struct InstanceState {
    /// The snapshot root, updated by vote page appends.
    pub snapshot: Snapshot,
    /// Derived stores.
    pub stores: Stores,
}

/// One extracted snapshot of a board.
pub struct SnapshotInstance {
    store: Arc<dyn SnapshotStore>,
    public_key: PublicKey,
    seq: u64,
    changes: ChangeSet,
    state: Mutex<InstanceState>,
}

impl std::fmt::Debug for SnapshotInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotInstance")
            .field("public_key", &self.public_key)
            .field("seq", &self.seq)
            .finish()
    }
}

impl SnapshotInstance {
    /// Extracts `snapshot`, carrying state forward from `previous`.
    ///
    /// `previous` is only locked for the duration of this call.
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        snapshot: Snapshot,
        previous: Option<&SnapshotInstance>,
    ) -> Result<Self> {
        let (stores, changes) = match previous {
            Some(prev) => {
                prev.with(|state| extract(store.as_ref(), &snapshot, Some(&state.stores)))?
            }
            None => extract(store.as_ref(), &snapshot, None)?,
        };
        Ok(Self {
            store,
            public_key: snapshot.public_key,
            seq: snapshot.seq,
            changes,
            state: Mutex::new(InstanceState { snapshot, stores }),
        })
    }

    /// Runs `action` with exclusive access to the snapshot and its stores.
    pub fn with<R, F>(&self, action: F) -> Result<R>
    where
        F: FnOnce(&mut InstanceState) -> Result<R>,
    {
        let mut state = self
            .state
            .lock()
            .map_err(|_| StateError::internal("snapshot instance lock poisoned"))?;
        action(&mut state)
    }

    /// Returns the board public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Returns the sequence number of the extracted snapshot.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Returns the changes relative to the previous instance.
    pub fn changes(&self) -> &ChangeSet {
        &self.changes
    }

    /// Returns the current snapshot root.
    pub fn snapshot(&self) -> Result<Snapshot> {
        self.with(|state| Ok(state.snapshot.clone()))
    }

    /// Returns the vote summary of thread `hash`.
    pub fn thread_votes(&self, hash: &ContentHash) -> Result<Option<VoteSummary<ContentHash>>> {
        self.with(|state| Ok(state.stores.thread_votes.get(hash).cloned()))
    }

    /// Returns the vote summary of post `hash`.
    pub fn post_votes(&self, hash: &ContentHash) -> Result<Option<VoteSummary<ContentHash>>> {
        self.with(|state| Ok(state.stores.post_votes.get(hash).cloned()))
    }

    /// Returns the vote summary of `user`.
    pub fn user_votes(&self, user: &PublicKey) -> Result<Option<VoteSummary<PublicKey>>> {
        self.with(|state| Ok(state.stores.user_votes.get(user).cloned()))
    }

    /// Returns the origin of thread or post `hash`.
    pub fn origin(&self, hash: &ContentHash) -> Result<Option<Origin>> {
        self.with(|state| Ok(state.stores.origins.get(hash)))
    }

    /// Returns the follow page of `creator`.
    pub fn follow_page(&self, creator: &PublicKey) -> Result<Option<FollowPage>> {
        self.with(|state| Ok(state.stores.follows.get(creator).cloned()))
    }

    /// Appends an empty vote page for thread `hash`. No-op if one exists.
    pub fn append_thread_vote_page(&self, hash: ContentHash) -> Result<()> {
        self.append_vote_page(VoteTarget::Thread, hash)
    }

    /// Appends an empty vote page for post `hash`. No-op if one exists.
    pub fn append_post_vote_page(&self, hash: ContentHash) -> Result<()> {
        self.append_vote_page(VoteTarget::Post, hash)
    }

    fn append_vote_page(&self, target: VoteTarget, hash: ContentHash) -> Result<()> {
        let store = self.store.as_ref();
        self.with(|state| {
            if state.stores.content_votes(target).contains(&hash) {
                return Ok(());
            }

            let mut pages = match target {
                VoteTarget::Thread => read_thread_vote_pages(store, &state.snapshot)?,
                VoteTarget::Post => read_post_vote_pages(store, &state.snapshot)?,
            };
            let page = ContentVotesPage::empty(hash);
            let page_hash = hash_value(store, &page)?;
            pages.pages.push(page);
            let index = pages.pages.len() - 1;

            let value = match target {
                VoteTarget::Thread => SlotValue::ThreadVotePages(pages),
                VoteTarget::Post => SlotValue::PostVotePages(pages),
            };
            let slot_hash = write_root_slot(store, &mut state.snapshot, &value)?;

            let votes = state.stores.content_votes_mut(target);
            votes.set_slot_hash(slot_hash);
            votes.set(hash, VoteSummary::empty(index, hash, page_hash));
            debug!(
                "Appended vote page {} for {} {} on board {}",
                index,
                target.vote_kind(),
                hash,
                self.public_key
            );
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::object::{Content, Vote, VoteTag, VoteValue};
    use crate::snapshot::{
        build_snapshot, ContentVotesPages, MemorySnapshotStore, RootValues, ThreadPage,
        UserVotesPage,
    };

    fn key(b: u8) -> PublicKey {
        PublicKey::from_bytes([b; 32])
    }

    fn board_values(board: PublicKey) -> RootValues {
        RootValues::new(Content::board(board, board, "Board", "").unwrap())
    }

    #[test]
    fn test_fresh_instance_has_empty_change_set() {
        let store = Arc::new(MemorySnapshotStore::new());
        let mut values = board_values(key(1));
        let thread = Content::thread(key(1), key(2), "T", "").unwrap();
        values.content.threads.push(ThreadPage {
            thread: thread.clone(),
            posts: Vec::new(),
        });
        let snapshot = store.commit(key(1), values).unwrap();

        let instance = SnapshotInstance::new(store, snapshot, None).unwrap();
        assert!(instance.changes().is_empty());
        assert!(!instance.changes().is_recording());
        assert_eq!(instance.origin(thread.hash()).unwrap(), Some(Origin::Thread));
        assert_eq!(instance.seq(), 1);
    }

    #[test]
    fn test_successor_records_diff() {
        let store = Arc::new(MemorySnapshotStore::new());
        let mut values = board_values(key(1));
        let thread = Content::thread(key(1), key(2), "T", "").unwrap();
        let post = Content::post(key(1), key(3), *thread.hash(), None, "P", "").unwrap();
        values.content.threads.push(ThreadPage {
            thread: thread.clone(),
            posts: vec![post.clone()],
        });
        let first = SnapshotInstance::new(store.clone(), store.commit(key(1), values.clone()).unwrap(), None)
            .unwrap();

        let second_thread = Content::thread(key(1), key(2), "T2", "").unwrap();
        values.content.threads[0].posts.clear();
        values.content.threads.push(ThreadPage {
            thread: second_thread.clone(),
            posts: Vec::new(),
        });
        values.deleted.posts.push(*post.hash());
        let second =
            SnapshotInstance::new(store.clone(), store.commit(key(1), values.clone()).unwrap(), Some(&first))
                .unwrap();

        let changes = second.changes();
        assert_eq!(changes.new_content(), &[second_thread]);
        assert_eq!(changes.deleted_posts().len(), 1);
        // The post is gone from the new tree; its thread comes from the predecessor.
        assert_eq!(changes.deleted_posts()[0].of_thread, Some(*thread.hash()));

        // Already listed deletions are not recorded again.
        let third =
            SnapshotInstance::new(store.clone(), store.commit(key(1), values).unwrap(), Some(&second))
                .unwrap();
        assert!(third.changes().is_empty());
    }

    #[test]
    fn test_foreign_board_item_is_invalid_read() {
        let store = Arc::new(MemorySnapshotStore::new());
        let values = RootValues::new(Content::board(key(9), key(9), "Other", "").unwrap());
        let snapshot = build_snapshot(store.as_ref(), key(1), 1, values).unwrap();
        let err = SnapshotInstance::new(store, snapshot, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRead);
    }

    #[test]
    fn test_board_slot_must_hold_board() {
        let store = Arc::new(MemorySnapshotStore::new());
        let values = RootValues::new(Content::thread(key(1), key(1), "T", "").unwrap());
        let snapshot = build_snapshot(store.as_ref(), key(1), 1, values).unwrap();
        let err = SnapshotInstance::new(store, snapshot, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRead);
    }

    #[test]
    fn test_thread_and_post_votes_are_independent() {
        let store = Arc::new(MemorySnapshotStore::new());
        let mut values = board_values(key(1));
        let thread = Content::thread(key(1), key(2), "T", "").unwrap();
        let post = Content::post(key(1), key(3), *thread.hash(), None, "P", "").unwrap();
        values.content.threads.push(ThreadPage {
            thread: thread.clone(),
            posts: vec![post.clone()],
        });
        values.thread_votes = ContentVotesPages {
            pages: vec![ContentVotesPage {
                of_content: *thread.hash(),
                votes: vec![Content::thread_vote(
                    key(1),
                    key(4),
                    *thread.hash(),
                    Vote::untagged(VoteValue::Up),
                )
                .unwrap()],
            }],
        };
        values.post_votes = ContentVotesPages {
            pages: vec![ContentVotesPage::empty(*post.hash())],
        };
        let snapshot = store.commit(key(1), values).unwrap();
        let instance = SnapshotInstance::new(store, snapshot, None).unwrap();

        assert_eq!(instance.thread_votes(thread.hash()).unwrap().unwrap().voter_count(), 1);
        assert!(instance.thread_votes(post.hash()).unwrap().is_none());
        assert_eq!(instance.post_votes(post.hash()).unwrap().unwrap().voter_count(), 0);
        assert!(instance.post_votes(thread.hash()).unwrap().is_none());
    }

    #[test]
    fn test_append_vote_page_is_idempotent() {
        let store = Arc::new(MemorySnapshotStore::new());
        let snapshot = store.commit(key(1), board_values(key(1))).unwrap();
        let instance = SnapshotInstance::new(store.clone(), snapshot, None).unwrap();
        let thread = ContentHash::from_bytes([7; 32]);

        instance.append_thread_vote_page(thread).unwrap();
        let after_first = instance.snapshot().unwrap();
        instance.append_thread_vote_page(thread).unwrap();
        let after_second = instance.snapshot().unwrap();

        assert_eq!(after_first, after_second);
        let pages = read_thread_vote_pages(store.as_ref(), &after_second).unwrap();
        assert_eq!(pages.pages, vec![ContentVotesPage::empty(thread)]);

        let summary = instance.thread_votes(&thread).unwrap().unwrap();
        assert_eq!(summary.index, 0);
        assert_eq!(
            summary.page_hash,
            hash_value(store.as_ref(), &ContentVotesPage::empty(thread)).unwrap()
        );
        assert!(instance.post_votes(&thread).unwrap().is_none());

        instance.append_post_vote_page(thread).unwrap();
        assert_eq!(instance.post_votes(&thread).unwrap().unwrap().index, 0);
    }

    #[test]
    fn test_appended_page_carries_into_successor() {
        let store = Arc::new(MemorySnapshotStore::new());
        let snapshot = store.commit(key(1), board_values(key(1))).unwrap();
        let first = SnapshotInstance::new(store.clone(), snapshot, None).unwrap();
        let thread = ContentHash::from_bytes([7; 32]);
        first.append_thread_vote_page(thread).unwrap();

        let mut root = first.snapshot().unwrap();
        root.seq = 2;
        store.publish(root.clone()).unwrap();
        let second = SnapshotInstance::new(store, root, Some(&first)).unwrap();
        assert!(second.changes().is_empty());
        assert!(second.thread_votes(&thread).unwrap().is_some());
    }

    #[test]
    fn test_user_votes_feed_follow_index() {
        let store = Arc::new(MemorySnapshotStore::new());
        let first = SnapshotInstance::new(
            store.clone(),
            store.commit(key(1), board_values(key(1))).unwrap(),
            None,
        )
        .unwrap();

        let mut values = board_values(key(1));
        let vote = Content::user_vote(
            key(1),
            key(2),
            key(3),
            Vote::new(VoteValue::Up, [VoteTag::Trust]),
        )
        .unwrap();
        values.user_votes.pages.push(UserVotesPage {
            of_user: key(3),
            votes: vec![vote.clone()],
        });
        let second =
            SnapshotInstance::new(store.clone(), store.commit(key(1), values).unwrap(), Some(&first))
                .unwrap();

        assert_eq!(second.changes().new_content(), &[vote]);
        let page = second.follow_page(&key(2)).unwrap().unwrap();
        assert_eq!(page.yes.get(&key(3)).unwrap().tag, "trust");
        assert_eq!(second.user_votes(&key(3)).unwrap().unwrap().voter_count(), 1);
    }
}
