//! Snapshot schema and the snapshot store capability.
//!
//! A snapshot is the root of one board version: a public key, a sequence
//! number and exactly five references, one per [`RootSlot`]. Each reference is
//! the content hash of a stored object holding the bincode encoding of a
//! [`SlotValue`].
//!
//! ## Root Layout
//!
//! ```text
//! Snapshot (public_key, seq)
//!     ├── [0] ContentIndex     -> BoardPage { board, threads: [ThreadPage { thread, posts }] }
//!     ├── [1] Deleted          -> Deleted { threads, posts }
//!     ├── [2] ThreadVotePages  -> ContentVotesPages { pages: [ContentVotesPage] }
//!     ├── [3] PostVotePages    -> ContentVotesPages { pages: [ContentVotesPage] }
//!     └── [4] UserVotePages    -> UserVotesPages { pages: [UserVotesPage] }
//! ```
//!
//! Storage, signing and propagation of snapshots belong to the store; this
//! crate only needs the primitive object access of [`SnapshotStore`]. The
//! slot-level operations are free functions built on top of it.

mod memory;

pub use memory::MemorySnapshotStore;

use crate::error::{Result, StateError};
use crate::object::{Content, ContentHash, PublicKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of reference slots in a snapshot root.
pub const ROOT_SLOT_COUNT: usize = 5;

/// The fixed reference slots of a snapshot root, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RootSlot {
    /// Board item and thread/post tree.
    ContentIndex = 0,
    /// Hashes of deleted threads and posts.
    Deleted = 1,
    /// Vote pages of threads.
    ThreadVotePages = 2,
    /// Vote pages of posts.
    PostVotePages = 3,
    /// Vote pages of users.
    UserVotePages = 4,
}

impl RootSlot {
    /// All slots in root order.
    pub const ALL: [RootSlot; ROOT_SLOT_COUNT] = [
        RootSlot::ContentIndex,
        RootSlot::Deleted,
        RootSlot::ThreadVotePages,
        RootSlot::PostVotePages,
        RootSlot::UserVotePages,
    ];

    /// Returns the position of this slot in the root.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RootSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootSlot::ContentIndex => write!(f, "ContentIndex"),
            RootSlot::Deleted => write!(f, "Deleted"),
            RootSlot::ThreadVotePages => write!(f, "ThreadVotePages"),
            RootSlot::PostVotePages => write!(f, "PostVotePages"),
            RootSlot::UserVotePages => write!(f, "UserVotePages"),
        }
    }
}

/// A thread and its posts, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadPage {
    /// The thread item.
    pub thread: Content,
    /// Posts of the thread.
    pub posts: Vec<Content>,
}

/// The board item and the thread tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPage {
    /// The board item.
    pub board: Content,
    /// Thread pages, in order.
    pub threads: Vec<ThreadPage>,
}

/// Hashes of deleted content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deleted {
    /// Deleted threads.
    pub threads: Vec<ContentHash>,
    /// Deleted posts.
    pub posts: Vec<ContentHash>,
}

/// Votes cast on one thread or post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentVotesPage {
    /// The voted content.
    pub of_content: ContentHash,
    /// Vote items, oldest first.
    pub votes: Vec<Content>,
}

impl ContentVotesPage {
    /// Creates an empty page for `of_content`.
    pub fn empty(of_content: ContentHash) -> Self {
        Self {
            of_content,
            votes: Vec::new(),
        }
    }
}

/// List of content vote pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentVotesPages {
    /// Pages, in append order.
    pub pages: Vec<ContentVotesPage>,
}

/// Votes cast on one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVotesPage {
    /// The voted user.
    pub of_user: PublicKey,
    /// Vote items, oldest first.
    pub votes: Vec<Content>,
}

/// List of user vote pages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVotesPages {
    /// Pages, in append order.
    pub pages: Vec<UserVotesPage>,
}

/// Typed value stored behind a root reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotValue {
    /// Value of [`RootSlot::ContentIndex`].
    ContentIndex(BoardPage),
    /// Value of [`RootSlot::Deleted`].
    Deleted(Deleted),
    /// Value of [`RootSlot::ThreadVotePages`].
    ThreadVotePages(ContentVotesPages),
    /// Value of [`RootSlot::PostVotePages`].
    PostVotePages(ContentVotesPages),
    /// Value of [`RootSlot::UserVotePages`].
    UserVotePages(UserVotesPages),
}

impl SlotValue {
    /// Returns the slot this value belongs in.
    pub fn slot(&self) -> RootSlot {
        match self {
            SlotValue::ContentIndex(_) => RootSlot::ContentIndex,
            SlotValue::Deleted(_) => RootSlot::Deleted,
            SlotValue::ThreadVotePages(_) => RootSlot::ThreadVotePages,
            SlotValue::PostVotePages(_) => RootSlot::PostVotePages,
            SlotValue::UserVotePages(_) => RootSlot::UserVotePages,
        }
    }

    /// Serializes this value to bytes using bincode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| {
            StateError::serialization(format!("Failed to serialize slot value: {}", e))
        })
    }

    /// Deserializes a value from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| {
            StateError::invalid_read(format!("Failed to deserialize slot value: {}", e))
        })
    }
}

/// The five typed root values of a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootValues {
    /// Board item and thread tree.
    pub content: BoardPage,
    /// Deleted hashes.
    pub deleted: Deleted,
    /// Thread vote pages.
    pub thread_votes: ContentVotesPages,
    /// Post vote pages.
    pub post_votes: ContentVotesPages,
    /// User vote pages.
    pub user_votes: UserVotesPages,
}

impl RootValues {
    /// Creates root values holding only the board item.
    pub fn new(board: Content) -> Self {
        Self {
            content: BoardPage {
                board,
                threads: Vec::new(),
            },
            deleted: Deleted::default(),
            thread_votes: ContentVotesPages::default(),
            post_votes: ContentVotesPages::default(),
            user_votes: UserVotesPages::default(),
        }
    }

    fn into_slot_values(self) -> [SlotValue; ROOT_SLOT_COUNT] {
        [
            SlotValue::ContentIndex(self.content),
            SlotValue::Deleted(self.deleted),
            SlotValue::ThreadVotePages(self.thread_votes),
            SlotValue::PostVotePages(self.post_votes),
            SlotValue::UserVotePages(self.user_votes),
        ]
    }
}

/// Root of one board version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Public key of the board.
    pub public_key: PublicKey,
    /// Sequence number; grows with every published root of the board.
    pub seq: u64,
    refs: Vec<ContentHash>,
}

impl Snapshot {
    /// Creates a snapshot root from its references.
    ///
    /// The reference count is not checked here; it is validated whenever the
    /// root is read.
    pub fn new(public_key: PublicKey, seq: u64, refs: Vec<ContentHash>) -> Self {
        Self {
            public_key,
            seq,
            refs,
        }
    }

    /// Returns the root references.
    pub fn refs(&self) -> &[ContentHash] {
        &self.refs
    }

    /// Fails with `InvalidRead` unless the root has exactly [`ROOT_SLOT_COUNT`] refs.
    pub fn validate_schema(&self) -> Result<()> {
        if self.refs.len() != ROOT_SLOT_COUNT {
            return Err(StateError::invalid_read(format!(
                "root has invalid ref count of {} when expecting {}",
                self.refs.len(),
                ROOT_SLOT_COUNT
            )));
        }
        Ok(())
    }
}

/// Capability the core needs from the external snapshot store.
pub trait SnapshotStore: Send + Sync {
    /// Fetches the latest complete snapshot of a board.
    fn latest_snapshot(&self, board: &PublicKey) -> Result<Snapshot>;

    /// Returns the sequence number of the latest complete snapshot of a board.
    fn latest_seq(&self, board: &PublicKey) -> Result<u64> {
        Ok(self.latest_snapshot(board)?.seq)
    }

    /// Reads a stored object by its hash.
    fn get_object(&self, hash: &ContentHash) -> Result<Option<Vec<u8>>>;

    /// Stores an object and returns its hash.
    fn put_object(&self, bytes: Vec<u8>) -> Result<ContentHash>;

    /// Computes the content hash of serialized bytes.
    fn hash_of(&self, bytes: &[u8]) -> ContentHash {
        ContentHash::of_bytes(bytes)
    }
}

/// Computes the content hash of a serializable value the way the store does.
pub fn hash_value<T: Serialize>(store: &dyn SnapshotStore, value: &T) -> Result<ContentHash> {
    let bytes = bincode::serialize(value)
        .map_err(|e| StateError::serialization(format!("Failed to serialize for hash: {}", e)))?;
    Ok(store.hash_of(&bytes))
}

/// Returns the reference hash stored at `slot`.
pub fn root_slot_hash(snapshot: &Snapshot, slot: RootSlot) -> Result<ContentHash> {
    snapshot.validate_schema()?;
    Ok(snapshot.refs[slot.index()])
}

/// Reads and decodes the value at `slot`.
///
/// Fails with `InvalidRead` if the object is missing, undecodable, or holds a
/// value of another slot.
pub fn read_root_slot(
    store: &dyn SnapshotStore,
    snapshot: &Snapshot,
    slot: RootSlot,
) -> Result<SlotValue> {
    let hash = root_slot_hash(snapshot, slot)?;
    let bytes = store.get_object(&hash)?.ok_or_else(|| {
        StateError::invalid_read(format!(
            "root child '{}' ({}) is missing from the store",
            slot, hash
        ))
    })?;
    let value = SlotValue::from_bytes(&bytes)?;
    if value.slot() != slot {
        return Err(StateError::invalid_read(format!(
            "root child '{}' is invalid: holds '{}'",
            slot,
            value.slot()
        )));
    }
    Ok(value)
}

/// Reads all five root values, validating the schema.
pub fn read_root_slots(store: &dyn SnapshotStore, snapshot: &Snapshot) -> Result<RootValues> {
    snapshot.validate_schema()?;
    Ok(RootValues {
        content: read_content_index(store, snapshot)?,
        deleted: read_deleted(store, snapshot)?,
        thread_votes: read_thread_vote_pages(store, snapshot)?,
        post_votes: read_post_vote_pages(store, snapshot)?,
        user_votes: read_user_vote_pages(store, snapshot)?,
    })
}

fn unexpected(slot: RootSlot, value: &SlotValue) -> StateError {
    StateError::invalid_read(format!(
        "root child '{}' is invalid: holds '{}'",
        slot,
        value.slot()
    ))
}

/// Reads the [`RootSlot::ContentIndex`] value.
pub fn read_content_index(store: &dyn SnapshotStore, snapshot: &Snapshot) -> Result<BoardPage> {
    match read_root_slot(store, snapshot, RootSlot::ContentIndex)? {
        SlotValue::ContentIndex(page) => Ok(page),
        other => Err(unexpected(RootSlot::ContentIndex, &other)),
    }
}

/// Reads the [`RootSlot::Deleted`] value.
pub fn read_deleted(store: &dyn SnapshotStore, snapshot: &Snapshot) -> Result<Deleted> {
    match read_root_slot(store, snapshot, RootSlot::Deleted)? {
        SlotValue::Deleted(deleted) => Ok(deleted),
        other => Err(unexpected(RootSlot::Deleted, &other)),
    }
}

/// Reads the [`RootSlot::ThreadVotePages`] value.
pub fn read_thread_vote_pages(
    store: &dyn SnapshotStore,
    snapshot: &Snapshot,
) -> Result<ContentVotesPages> {
    match read_root_slot(store, snapshot, RootSlot::ThreadVotePages)? {
        SlotValue::ThreadVotePages(pages) => Ok(pages),
        other => Err(unexpected(RootSlot::ThreadVotePages, &other)),
    }
}

/// Reads the [`RootSlot::PostVotePages`] value.
pub fn read_post_vote_pages(
    store: &dyn SnapshotStore,
    snapshot: &Snapshot,
) -> Result<ContentVotesPages> {
    match read_root_slot(store, snapshot, RootSlot::PostVotePages)? {
        SlotValue::PostVotePages(pages) => Ok(pages),
        other => Err(unexpected(RootSlot::PostVotePages, &other)),
    }
}

/// Reads the [`RootSlot::UserVotePages`] value.
pub fn read_user_vote_pages(
    store: &dyn SnapshotStore,
    snapshot: &Snapshot,
) -> Result<UserVotesPages> {
    match read_root_slot(store, snapshot, RootSlot::UserVotePages)? {
        SlotValue::UserVotePages(pages) => Ok(pages),
        other => Err(unexpected(RootSlot::UserVotePages, &other)),
    }
}

/// Stores `value` and points its slot in `snapshot` at it.
///
/// The root reference is only replaced after the store accepted the object.
/// Returns the new reference hash.
pub fn write_root_slot(
    store: &dyn SnapshotStore,
    snapshot: &mut Snapshot,
    value: &SlotValue,
) -> Result<ContentHash> {
    snapshot.validate_schema()?;
    let hash = store.put_object(value.to_bytes()?)?;
    snapshot.refs[value.slot().index()] = hash;
    Ok(hash)
}

/// Stores the five root values and assembles a snapshot root from them.
///
/// The root is not published; see the store implementation for that.
pub fn build_snapshot(
    store: &dyn SnapshotStore,
    public_key: PublicKey,
    seq: u64,
    values: RootValues,
) -> Result<Snapshot> {
    let mut refs = Vec::with_capacity(ROOT_SLOT_COUNT);
    for value in values.into_slot_values() {
        refs.push(store.put_object(value.to_bytes()?)?);
    }
    Ok(Snapshot::new(public_key, seq, refs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn key(b: u8) -> PublicKey {
        PublicKey::from_bytes([b; 32])
    }

    fn sample(store: &MemorySnapshotStore) -> Snapshot {
        let board = Content::board(key(1), key(1), "Board", "").unwrap();
        build_snapshot(store, key(1), 1, RootValues::new(board)).unwrap()
    }

    #[test]
    fn test_build_and_read_roundtrip() {
        let store = MemorySnapshotStore::new();
        let board = Content::board(key(1), key(1), "Board", "").unwrap();
        let snapshot = build_snapshot(&store, key(1), 1, RootValues::new(board.clone())).unwrap();

        assert_eq!(snapshot.refs().len(), ROOT_SLOT_COUNT);
        let values = read_root_slots(&store, &snapshot).unwrap();
        assert_eq!(values.content.board, board);
        assert!(values.deleted.threads.is_empty());
    }

    #[test]
    fn test_wrong_ref_count_is_invalid_read() {
        let store = MemorySnapshotStore::new();
        let snapshot = sample(&store);

        let short = Snapshot::new(key(1), 1, snapshot.refs()[..4].to_vec());
        let err = read_root_slots(&store, &short).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRead);

        let mut refs = snapshot.refs().to_vec();
        refs.push(refs[0]);
        let long = Snapshot::new(key(1), 1, refs);
        assert_eq!(
            root_slot_hash(&long, RootSlot::Deleted).unwrap_err().kind(),
            ErrorKind::InvalidRead
        );
    }

    #[test]
    fn test_slot_with_wrong_variant_is_invalid_read() {
        let store = MemorySnapshotStore::new();
        let snapshot = sample(&store);

        // Point the Deleted slot at the thread vote pages object.
        let mut refs = snapshot.refs().to_vec();
        refs[RootSlot::Deleted.index()] = refs[RootSlot::ThreadVotePages.index()];
        let corrupt = Snapshot::new(key(1), 1, refs);

        let err = read_deleted(&store, &corrupt).unwrap_err();
        assert!(matches!(err, StateError::InvalidRead(_)));
    }

    #[test]
    fn test_missing_object_is_invalid_read() {
        let store = MemorySnapshotStore::new();
        let mut refs = sample(&store).refs().to_vec();
        refs[0] = ContentHash::from_bytes([0xAB; 32]);
        let snapshot = Snapshot::new(key(1), 1, refs);
        assert_eq!(
            read_content_index(&store, &snapshot).unwrap_err().kind(),
            ErrorKind::InvalidRead
        );
    }

    #[test]
    fn test_write_root_slot_replaces_reference() {
        let store = MemorySnapshotStore::new();
        let mut snapshot = sample(&store);
        let before = root_slot_hash(&snapshot, RootSlot::ThreadVotePages).unwrap();

        let pages = ContentVotesPages {
            pages: vec![ContentVotesPage::empty(ContentHash::from_bytes([3; 32]))],
        };
        let after =
            write_root_slot(&store, &mut snapshot, &SlotValue::ThreadVotePages(pages.clone()))
                .unwrap();

        assert_ne!(before, after);
        assert_eq!(
            root_slot_hash(&snapshot, RootSlot::ThreadVotePages).unwrap(),
            after
        );
        assert_eq!(read_thread_vote_pages(&store, &snapshot).unwrap(), pages);
        // Other slots untouched.
        assert!(read_post_vote_pages(&store, &snapshot).unwrap().pages.is_empty());
    }

    #[test]
    fn test_hash_value_matches_store_hash() {
        let store = MemorySnapshotStore::new();
        let page = ContentVotesPage::empty(ContentHash::from_bytes([1; 32]));
        let bytes = bincode::serialize(&page).unwrap();
        assert_eq!(hash_value(&store, &page).unwrap(), store.hash_of(&bytes));
    }
}
