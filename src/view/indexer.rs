//! Viewer state: pagination indexes and the compiled objects they point to.

use crate::object::{ContentHash, PublicKey};
use crate::paginated::{MappedPaginated, Paginated, SimplePaginated};
use crate::view::profile::Profile;
use crate::view::rep::ContentRep;
use crate::view::votes_rep::VotesRep;
use std::collections::HashMap;

/// Ordered hashes and keys of a board.
#[derive(Debug, Clone, Default)]
pub struct Indexer {
    /// Hash of the current board item.
    pub board: Option<ContentHash>,
    /// Threads in board order.
    pub threads: SimplePaginated<ContentHash>,
    /// Posts of every thread, and replies of every replied-to post.
    pub posts_of: HashMap<ContentHash, MappedPaginated<ContentHash>>,
    /// Participants.
    pub users: MappedPaginated<PublicKey>,
}

impl Indexer {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes both parties of a user vote as participants.
    pub fn ensure_users_of_user_vote(&mut self, creator: &PublicKey, of_user: &PublicKey) {
        self.users.append(*creator);
        self.users.append(*of_user);
    }
}

/// Objects addressed by the [`Indexer`].
#[derive(Debug, Clone, Default)]
pub struct Container {
    /// Board, thread and post representations.
    pub content: HashMap<ContentHash, ContentRep>,
    /// Vote aggregates of threads and posts.
    pub votes: HashMap<ContentHash, VotesRep>,
    /// Reputation of every known user.
    pub profiles: HashMap<PublicKey, Profile>,
}

impl Container {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the profile of `user`, creating it if absent.
    pub fn profile_mut(&mut self, user: &PublicKey) -> &mut Profile {
        self.profiles.entry(*user).or_default()
    }
}
