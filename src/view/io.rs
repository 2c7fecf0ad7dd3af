//! Request and response shapes of the viewer queries.
//!
//! All shapes are JSON-serializable; hashes and keys are hex strings and
//! field names are snake_case.

use crate::object::{ContentHash, PublicKey};
use crate::paginated::PaginatedInput;
use crate::view::profile::ProfileView;
use crate::view::rep::ContentRep;
use crate::view::votes_rep::VoteView;
use serde::{Deserialize, Serialize};

/// Request for a page of threads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPageIn {
    /// User whose own votes are flagged in the vote views.
    #[serde(default)]
    pub perspective: Option<PublicKey>,
    /// Requested page.
    #[serde(default)]
    pub paginated_input: PaginatedInput,
}

/// The board and a page of its threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardPageOut {
    pub board: ContentRep,
    pub threads: Vec<ContentRep>,
}

/// Request for a page of posts of one thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadPageIn {
    /// User whose own votes are flagged in the vote views.
    #[serde(default)]
    pub perspective: Option<PublicKey>,
    /// The thread.
    pub thread_hash: ContentHash,
    /// Requested page.
    #[serde(default)]
    pub paginated_input: PaginatedInput,
}

/// The board, a thread and a page of its posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadPageOut {
    pub board: ContentRep,
    pub thread: ContentRep,
    pub posts: Vec<ContentRep>,
}

/// Request for the votes of one thread or post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentVotesIn {
    /// User whose own vote is flagged.
    #[serde(default)]
    pub perspective: Option<PublicKey>,
    /// The voted content.
    pub content_hash: ContentHash,
}

/// Votes of one thread or post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentVotesOut {
    pub votes: VoteView,
}

/// Request for a user's reputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfileIn {
    pub user_public_key: PublicKey,
}

/// A user's reputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfileOut {
    pub user_public_key: PublicKey,
    pub profile: ProfileView,
}

/// Every indexed participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantsOut {
    pub participants: Vec<PublicKey>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_page_in_defaults() {
        let input: BoardPageIn = serde_json::from_str("{}").unwrap();
        assert_eq!(input, BoardPageIn::default());
        assert!(input.perspective.is_none());
    }

    #[test]
    fn test_thread_page_in_from_json() {
        let hash = ContentHash::from_bytes([0xAB; 32]);
        let user = PublicKey::from_bytes([0x01; 32]);
        let json = format!(
            r#"{{"perspective": "{}", "thread_hash": "{}", "paginated_input": {{"start_index": 3}}}}"#,
            user.to_hex(),
            hash.to_hex()
        );
        let input: ThreadPageIn = serde_json::from_str(&json).unwrap();
        assert_eq!(input.thread_hash, hash);
        assert_eq!(input.perspective, Some(user));
        assert_eq!(input.paginated_input, PaginatedInput::new(3, 20));
    }

    #[test]
    fn test_participants_out_is_hex() {
        let out = ParticipantsOut {
            participants: vec![PublicKey::from_bytes([2; 32])],
        };
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["participants"][0], "02".repeat(32));
    }
}
