//! # board-state - state materialization for content-addressed boards
//!
//! Boards are published as a sequence of immutable snapshots in a
//! content-addressed store. This library turns those snapshots into
//! queryable state: it diffs every snapshot against its predecessor,
//! aggregates votes and user reputation, and serves paginated views.
//!
//! ## Components
//!
//! - **Snapshot schema**: five fixed root slots per snapshot (content tree,
//!   deletions, thread/post/user vote pages) behind the [`SnapshotStore`] trait
//! - **Snapshot instances**: derived stores of one snapshot, carried forward
//!   from the previous instance, plus the change set between the two
//! - **Compiler**: one instance per board; master boards are refreshed by a
//!   background thread
//! - **Viewer**: indexes and compiled representations answering board, thread,
//!   vote, profile and participant queries
//!
//! ## Example
//!
//! ```rust,no_run
//! use board_state::object::{Content, PublicKey};
//! use board_state::snapshot::{MemorySnapshotStore, RootValues};
//! use board_state::view::{BoardPageIn, Viewer};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemorySnapshotStore::new();
//! let board = PublicKey::from_bytes([1u8; 32]);
//! let snapshot = store.commit(board, RootValues::new(Content::board(board, board, "General", "")?))?;
//!
//! let viewer = Viewer::new(&store, &snapshot)?;
//! let page = viewer.get_board_page(&BoardPageIn::default())?;
//! println!("{} has {} threads", page.board.name, page.threads.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod object;
pub mod paginated;
pub mod snapshot;
pub mod state;
pub mod view;

pub use config::CompilerConfig;
pub use error::{ErrorKind, Result, StateError};
pub use object::{Content, ContentHash, PublicKey, SecretKey};
pub use snapshot::{MemorySnapshotStore, Snapshot, SnapshotStore};
pub use state::{BoardInstance, BoardRole, ChangeSet, Compiler, SnapshotInstance};
pub use view::Viewer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
