//! Per-board snapshot state.
//!
//! ## Architecture
//!
//! ```text
//! SnapshotStore ──> Compiler ──> BoardInstance ──> SnapshotInstance ──> ChangeSet ──> Viewer
//!                                                    ├── OriginIndex
//!                                                    ├── ContentVotesStore (threads, posts)
//!                                                    ├── UserVotesStore ──> FollowIndex
//!                                                    └── DeletedSet
//! ```
//!
//! A new snapshot instance is always built from its predecessor, so unchanged
//! slots and pages are carried forward and only the difference ends up in the
//! change set handed to the viewer.

pub mod changes;
pub mod compiler;
pub mod follow;
pub mod instance;
pub mod origin;
pub mod votes;

pub use changes::{ChangeSet, DeletedPost};
pub use compiler::{BoardInstance, BoardRole, Compiler};
pub use follow::{FollowIndex, FollowPage, FollowTag};
pub use instance::{extract, DeletedSet, InstanceState, SnapshotInstance, Stores};
pub use origin::{Origin, OriginIndex};
pub use votes::{ContentVotesStore, UserVoteHandler, UserVotesStore, VoteSummary, VoteTarget};
