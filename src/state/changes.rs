//! Structural diff between two snapshots of the same board.

use crate::object::{Content, ContentHash, PublicKey};
use serde::{Deserialize, Serialize};

/// A deleted post together with the thread it belonged to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedPost {
    /// Thread of the post, if the origin index knew it.
    pub of_thread: Option<ContentHash>,
    /// Hash of the deleted post.
    pub hash: ContentHash,
}

/// Content added and deleted since the previous snapshot of a board.
///
/// A change set built for a board without a predecessor does not record
/// anything: every `record_*` call is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    board: PublicKey,
    recording: bool,
    new: Vec<Content>,
    deleted_threads: Vec<ContentHash>,
    deleted_posts: Vec<DeletedPost>,
}

impl ChangeSet {
    /// Creates an empty change set for `board`.
    pub fn new(board: PublicKey, recording: bool) -> Self {
        Self {
            board,
            recording,
            new: Vec::new(),
            deleted_threads: Vec::new(),
            deleted_posts: Vec::new(),
        }
    }

    /// Returns the board this change set belongs to.
    pub fn board(&self) -> &PublicKey {
        &self.board
    }

    /// Returns true if changes are being recorded.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Records a newly observed content item.
    pub fn record_new(&mut self, content: &Content) {
        if self.recording {
            self.new.push(content.clone());
        }
    }

    /// Records a deleted thread.
    pub fn record_delete_thread(&mut self, hash: ContentHash) {
        if self.recording {
            self.deleted_threads.push(hash);
        }
    }

    /// Records a deleted post and the thread it belonged to.
    pub fn record_delete_post(&mut self, of_thread: Option<ContentHash>, hash: ContentHash) {
        if self.recording {
            self.deleted_posts.push(DeletedPost { of_thread, hash });
        }
    }

    /// New content, in observation order.
    pub fn new_content(&self) -> &[Content] {
        &self.new
    }

    /// Deleted thread hashes.
    pub fn deleted_threads(&self) -> &[ContentHash] {
        &self.deleted_threads
    }

    /// Deleted posts.
    pub fn deleted_posts(&self) -> &[DeletedPost] {
        &self.deleted_posts
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.deleted_threads.is_empty() && self.deleted_posts.is_empty()
    }
}
