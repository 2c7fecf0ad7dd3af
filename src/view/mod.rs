//! Compiled board views and their query surface.

pub mod indexer;
pub mod io;
pub mod profile;
pub mod rep;
pub mod viewer;
pub mod votes_rep;

pub use indexer::{Container, Indexer};
pub use io::{
    BoardPageIn, BoardPageOut, ContentVotesIn, ContentVotesOut, ParticipantsOut, ThreadPageIn,
    ThreadPageOut, UserProfileIn, UserProfileOut,
};
pub use profile::{Profile, ProfileView};
pub use rep::ContentRep;
pub use viewer::Viewer;
pub use votes_rep::{VoteCount, VoteView, VotesRep};
