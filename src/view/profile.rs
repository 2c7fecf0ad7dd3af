//! Per-user reputation sets.

use crate::object::PublicKey;
use serde::Serialize;
use std::collections::BTreeSet;

/// Directional relationships of one user.
///
/// For every (creator, target) pair only the creator's latest user vote is
/// reflected: applying a vote first clears whatever the previous one set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    /// Users this user trusts.
    pub trusted: BTreeSet<PublicKey>,
    /// Users that trust this user.
    pub trusted_by: BTreeSet<PublicKey>,
    /// Users this user blocked.
    pub blocked: BTreeSet<PublicKey>,
    /// Users that blocked this user.
    pub blocked_by: BTreeSet<PublicKey>,
    /// Users this user marked as spam.
    pub marked_as_spam: BTreeSet<PublicKey>,
    /// Users that marked this user as spam.
    pub marked_as_spam_by: BTreeSet<PublicKey>,
}

impl Profile {
    /// Creates a profile with empty sets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes every effect this user's votes had on `target`.
    pub fn clear_votes_for(&mut self, target: &PublicKey) {
        self.trusted.remove(target);
        self.blocked.remove(target);
        self.marked_as_spam.remove(target);
    }

    /// Removes every effect `creator`'s votes had on this user.
    pub fn clear_votes_by(&mut self, creator: &PublicKey) {
        self.trusted_by.remove(creator);
        self.blocked_by.remove(creator);
        self.marked_as_spam_by.remove(creator);
    }

    /// Returns true if all six sets are empty.
    pub fn is_empty(&self) -> bool {
        self.trusted.is_empty()
            && self.trusted_by.is_empty()
            && self.blocked.is_empty()
            && self.blocked_by.is_empty()
            && self.marked_as_spam.is_empty()
            && self.marked_as_spam_by.is_empty()
    }

    /// Returns the output form of this profile.
    pub fn view(&self) -> ProfileView {
        ProfileView {
            trusted: self.trusted.iter().copied().collect(),
            trusted_by: self.trusted_by.iter().copied().collect(),
            blocked: self.blocked.iter().copied().collect(),
            blocked_by: self.blocked_by.iter().copied().collect(),
            marked_as_spam: self.marked_as_spam.iter().copied().collect(),
            marked_as_spam_by: self.marked_as_spam_by.iter().copied().collect(),
        }
    }
}

/// Output form of a [`Profile`], with every set in key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileView {
    pub trusted: Vec<PublicKey>,
    pub trusted_by: Vec<PublicKey>,
    pub blocked: Vec<PublicKey>,
    pub blocked_by: Vec<PublicKey>,
    pub marked_as_spam: Vec<PublicKey>,
    pub marked_as_spam_by: Vec<PublicKey>,
}
