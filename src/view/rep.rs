//! Compiled representation of boards, threads and posts.

use crate::object::{BodyKind, Content, ContentHash, ContentKind, PublicKey};
use crate::view::votes_rep::VoteView;
use serde::Serialize;

/// Output form of a board, thread or post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentRep {
    /// Content hash.
    pub hash: ContentHash,
    /// Content variant.
    pub kind: ContentKind,
    /// Author.
    pub creator: PublicKey,
    /// Creation time in milliseconds since Unix epoch.
    pub created: u64,
    /// Board the content declares.
    pub of_board: PublicKey,
    /// Board public key, set on the board item only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_key: Option<PublicKey>,
    /// Thread of a post.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub of_thread: Option<ContentHash>,
    /// Parent post of a reply.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub of_post: Option<ContentHash>,
    /// Title.
    pub name: String,
    /// Text.
    pub body: String,
    /// Vote view, filled in per query.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub votes: Option<VoteView>,
}

impl ContentRep {
    /// Compiles a board, thread or post. Returns `None` for votes.
    pub fn from_content(content: &Content) -> Option<Self> {
        let (of_thread, of_post, name, body) = match &content.body.kind {
            BodyKind::Board { name, body } | BodyKind::Thread { name, body } => {
                (None, None, name, body)
            }
            BodyKind::Post {
                of_thread,
                of_post,
                name,
                body,
            } => (Some(*of_thread), *of_post, name, body),
            _ => return None,
        };
        Some(Self {
            hash: *content.hash(),
            kind: content.kind(),
            creator: content.body.creator,
            created: content.body.created,
            of_board: content.body.of_board,
            public_key: None,
            of_thread,
            of_post,
            name: name.clone(),
            body: body.clone(),
            votes: None,
        })
    }
}
