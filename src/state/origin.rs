//! Content-origin index.
//!
//! Maps the hash of every thread and post in the content tree to where it
//! sits in the tree, so a post's thread can be recovered from the post hash
//! alone (deleted-post records carry nothing else).

use crate::error::Result;
use crate::object::{ContentHash, ContentKind, PublicKey};
use crate::snapshot::BoardPage;
use crate::state::changes::ChangeSet;
use std::collections::HashMap;

/// Position of a content item in the thread/post tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// A thread of the board.
    Thread,
    /// A post of `of_thread`.
    Post {
        /// The post's thread.
        of_thread: ContentHash,
    },
}

/// Hash → origin lookup built from a `ContentIndex` slot.
#[derive(Debug, Clone, Default)]
pub struct OriginIndex {
    slot_hash: Option<ContentHash>,
    origins: HashMap<ContentHash, Origin>,
}

impl OriginIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the index for the content tree stored at `slot_hash`.
    ///
    /// If `previous` was built from the same slot hash it is reused as is.
    /// Otherwise the tree is walked and validated (content hashes, kinds and
    /// references); every thread or post that `previous` did not know is
    /// recorded as new in `changes`, threads before their posts.
    pub fn build(
        previous: Option<&OriginIndex>,
        slot_hash: ContentHash,
        page: &BoardPage,
        board: &PublicKey,
        changes: &mut ChangeSet,
    ) -> Result<Self> {
        if let Some(prev) = previous {
            if prev.slot_hash == Some(slot_hash) {
                return Ok(prev.clone());
            }
        }

        let is_known = |hash: &ContentHash| previous.map_or(false, |p| p.origins.contains_key(hash));
        let mut origins = HashMap::new();

        for thread_page in &page.threads {
            let thread = &thread_page.thread;
            thread.verify_hash()?;
            thread.expect_kind(ContentKind::Thread)?;
            thread.check_board_ref(board)?;
            let thread_hash = *thread.hash();
            if !is_known(&thread_hash) {
                changes.record_new(thread);
            }
            origins.insert(thread_hash, Origin::Thread);

            for post in &thread_page.posts {
                post.verify_hash()?;
                post.expect_kind(ContentKind::Post)?;
                post.check_board_ref(board)?;
                post.check_thread_ref(&thread_hash)?;
                if !is_known(post.hash()) {
                    changes.record_new(post);
                }
                origins.insert(
                    *post.hash(),
                    Origin::Post {
                        of_thread: thread_hash,
                    },
                );
            }
        }

        Ok(Self {
            slot_hash: Some(slot_hash),
            origins,
        })
    }

    /// Returns the origin of `hash`.
    pub fn get(&self, hash: &ContentHash) -> Option<Origin> {
        self.origins.get(hash).copied()
    }

    /// Sets the origin of `hash`.
    pub fn set(&mut self, hash: ContentHash, origin: Origin) {
        self.origins.insert(hash, origin);
    }

    /// Returns the thread of post `hash`, if it is a known post.
    pub fn thread_of(&self, hash: &ContentHash) -> Option<ContentHash> {
        match self.origins.get(hash) {
            Some(Origin::Post { of_thread }) => Some(*of_thread),
            _ => None,
        }
    }

    /// Returns the slot hash this index was built from.
    pub fn slot_hash(&self) -> Option<&ContentHash> {
        self.slot_hash.as_ref()
    }

    /// Returns the number of indexed items.
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    /// Returns true if nothing is indexed.
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}
