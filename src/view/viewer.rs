//! Compiled, queryable view of one board.
//!
//! A [`Viewer`] is bootstrapped from a full snapshot and then kept current by
//! applying the change set of every newer snapshot instance. One lock guards
//! the indexer and container together, so readers never observe a partially
//! applied update.

use crate::error::{Result, StateError};
use crate::object::{BodyKind, Content, ContentHash, ContentKind, PublicKey, VoteTag, VoteValue};
use crate::paginated::{MappedPaginated, Paginated, PaginatedInput};
use crate::snapshot::{read_content_index, read_root_slots, Snapshot, SnapshotStore};
use crate::state::ChangeSet;
use crate::view::indexer::{Container, Indexer};
use crate::view::io::{
    BoardPageIn, BoardPageOut, ContentVotesIn, ContentVotesOut, ParticipantsOut, ThreadPageIn,
    ThreadPageOut, UserProfileIn, UserProfileOut,
};
use crate::view::rep::ContentRep;
use crate::view::votes_rep::{VoteView, VotesRep};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Indexer and container of one board.
#[derive(Debug, Clone)]
struct ViewerState {
    public_key: PublicKey,
    indexer: Indexer,
    container: Container,
}

impl ViewerState {
    fn new(public_key: PublicKey) -> Self {
        Self {
            public_key,
            indexer: Indexer::new(),
            container: Container::new(),
        }
    }

    fn bootstrap(store: &dyn SnapshotStore, snapshot: &Snapshot) -> Result<Self> {
        let values = read_root_slots(store, snapshot)?;
        let mut state = Self::new(snapshot.public_key);
        values.content.board.verify_hash()?;
        state.set_board(&values.content.board)?;

        for page in &values.content.threads {
            let thread = &page.thread;
            thread.verify_hash()?;
            state.ensure_user(thread.creator());
            state.add_thread(thread)?;
            for post in &page.posts {
                post.verify_hash()?;
                state.ensure_user(post.creator());
                state.add_post(thread.hash(), post)?;
            }
        }

        let content_votes = values
            .thread_votes
            .pages
            .iter()
            .chain(values.post_votes.pages.iter())
            .flat_map(|page| page.votes.iter());
        let user_votes = values.user_votes.pages.iter().flat_map(|page| page.votes.iter());
        for vote in content_votes.chain(user_votes) {
            vote.verify_hash()?;
            state.ensure_user(vote.creator());
            state.process_vote(vote);
        }

        info!(
            "Bootstrapped viewer of board {} at seq {}: {} threads, {} participants",
            state.public_key,
            snapshot.seq,
            state.indexer.threads.len(),
            state.indexer.users.len()
        );
        Ok(state)
    }

    fn set_board(&mut self, board: &Content) -> Result<()> {
        board.expect_kind(ContentKind::Board)?;
        board.check_board_ref(&self.public_key)?;
        let mut rep = ContentRep::from_content(board)
            .ok_or_else(|| StateError::internal("board item has no representation"))?;
        rep.public_key = Some(self.public_key);

        if let Some(old) = self.indexer.board.take() {
            self.container.content.remove(&old);
        }
        self.indexer.board = Some(*board.hash());
        self.container.content.insert(*board.hash(), rep);
        Ok(())
    }

    fn add_thread(&mut self, thread: &Content) -> Result<()> {
        thread.expect_kind(ContentKind::Thread)?;
        thread.check_board_ref(&self.public_key)?;
        let rep = ContentRep::from_content(thread).ok_or_else(|| {
            StateError::invalid_read(format!("{} {} is not a thread", thread.kind(), thread.hash()))
        })?;
        let hash = *thread.hash();
        if !self.is_thread(&hash) {
            self.indexer.threads.append(hash);
        }
        self.indexer.posts_of.entry(hash).or_default();
        self.container.content.insert(hash, rep);
        Ok(())
    }

    fn add_post(&mut self, thread: &ContentHash, post: &Content) -> Result<()> {
        post.expect_kind(ContentKind::Post)?;
        post.check_board_ref(&self.public_key)?;
        post.check_thread_ref(thread)?;
        let rep = ContentRep::from_content(post).ok_or_else(|| {
            StateError::invalid_read(format!("{} {} is not a post", post.kind(), post.hash()))
        })?;
        let hash = *post.hash();

        self.indexer
            .posts_of
            .get_mut(thread)
            .ok_or_else(|| StateError::internal(format!("thread of hash {} not found", thread)))?
            .append(hash);

        if let Some(parent) = rep.of_post {
            self.indexer
                .posts_of
                .entry(parent)
                .or_insert_with(MappedPaginated::new)
                .append(hash);
        }
        self.container.content.insert(hash, rep);
        Ok(())
    }

    fn is_thread(&self, hash: &ContentHash) -> bool {
        self.container
            .content
            .get(hash)
            .map_or(false, |rep| rep.kind == ContentKind::Thread)
    }

    fn ensure_user(&mut self, user: &PublicKey) {
        self.indexer.users.append(*user);
        self.container.profile_mut(user);
    }

    fn process_vote(&mut self, vote: &Content) {
        let (target, kind) = match &vote.body.kind {
            BodyKind::ThreadVote { of_thread, .. } => (*of_thread, ContentKind::ThreadVote),
            BodyKind::PostVote { of_post, .. } => (*of_post, ContentKind::PostVote),
            BodyKind::UserVote { .. } => return self.process_user_vote(vote),
            _ => return,
        };
        if !self.container.content.contains_key(&target) {
            debug!("Ignoring {} {} on unindexed {}", kind, vote.hash(), target);
            return;
        }
        self.container
            .votes
            .entry(target)
            .or_insert_with(|| VotesRep::new(kind, target))
            .add(vote);
    }

    fn process_user_vote(&mut self, content: &Content) {
        let (of_user, vote) = match &content.body.kind {
            BodyKind::UserVote { of_user, vote } => (*of_user, vote),
            _ => return,
        };
        let creator = *content.creator();

        self.container.profile_mut(&creator).clear_votes_for(&of_user);
        self.container.profile_mut(&of_user).clear_votes_by(&creator);

        match vote.value {
            VoteValue::Up => {
                if vote.has_tag(VoteTag::Trust) {
                    self.indexer.ensure_users_of_user_vote(&creator, &of_user);
                    self.container.profile_mut(&creator).trusted.insert(of_user);
                    self.container.profile_mut(&of_user).trusted_by.insert(creator);
                }
            }
            VoteValue::Down => {
                if vote.has_tag(VoteTag::Spam) {
                    self.indexer.ensure_users_of_user_vote(&creator, &of_user);
                    self.container.profile_mut(&creator).marked_as_spam.insert(of_user);
                    self.container
                        .profile_mut(&of_user)
                        .marked_as_spam_by
                        .insert(creator);
                } else if vote.has_tag(VoteTag::Block) {
                    self.indexer.ensure_users_of_user_vote(&creator, &of_user);
                    self.container.profile_mut(&creator).blocked.insert(of_user);
                    self.container.profile_mut(&of_user).blocked_by.insert(creator);
                }
            }
            VoteValue::Neutral => {
                self.indexer.ensure_users_of_user_vote(&creator, &of_user);
            }
        }
    }

    /// Checks a change set against the current state without mutating it.
    fn validate_changes(&self, changes: &ChangeSet) -> Result<()> {
        if *changes.board() != self.public_key {
            return Err(StateError::internal(format!(
                "change set of board {} applied to viewer of board {}",
                changes.board(),
                self.public_key
            )));
        }
        let mut created = HashSet::new();
        for content in changes.new_content() {
            content.verify_hash()?;
            content.check_board_ref(&self.public_key)?;
            match &content.body.kind {
                BodyKind::Thread { .. } => {
                    created.insert(*content.hash());
                }
                BodyKind::Post { of_thread, .. } => {
                    if !self.is_thread(of_thread) && !created.contains(of_thread) {
                        return Err(StateError::internal(format!(
                            "thread of hash {} not found for post {}",
                            of_thread,
                            content.hash()
                        )));
                    }
                }
                BodyKind::Board { .. } => {
                    return Err(StateError::invalid_read(format!(
                        "unexpected board item {} in change set",
                        content.hash()
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn apply_changes(&mut self, changes: &ChangeSet) -> Result<()> {
        for content in changes.new_content() {
            self.ensure_user(content.creator());
            match &content.body.kind {
                BodyKind::Thread { .. } => self.add_thread(content)?,
                BodyKind::Post { of_thread, .. } => self.add_post(of_thread, content)?,
                _ => self.process_vote(content),
            }
        }
        for thread in changes.deleted_threads() {
            self.remove_thread(thread);
        }
        for deleted in changes.deleted_posts() {
            self.remove_post(deleted.of_thread.as_ref(), &deleted.hash);
        }
        Ok(())
    }

    fn drop_content(&mut self, hash: &ContentHash) {
        self.container.content.remove(hash);
        self.container.votes.remove(hash);
    }

    fn remove_thread(&mut self, thread: &ContentHash) {
        self.indexer.threads.remove(thread);
        if let Some(posts) = self.indexer.posts_of.remove(thread) {
            for post in posts.keys() {
                self.indexer.posts_of.remove(post);
                self.drop_content(post);
            }
        }
        self.drop_content(thread);
    }

    fn remove_post(&mut self, thread: Option<&ContentHash>, post: &ContentHash) {
        let rep = self.container.content.get(post);
        let thread = thread.copied().or_else(|| rep.and_then(|r| r.of_thread));
        let parent = rep.and_then(|r| r.of_post);

        for list in [thread, parent].iter().flatten() {
            if let Some(posts) = self.indexer.posts_of.get_mut(list) {
                posts.remove(post);
            }
        }
        self.indexer.posts_of.remove(post);
        self.drop_content(post);
    }

    fn board_rep(&self) -> Result<ContentRep> {
        self.indexer
            .board
            .and_then(|hash| self.container.content.get(&hash))
            .cloned()
            .ok_or_else(|| {
                StateError::internal(format!("board {} is indexed without content", self.public_key))
            })
    }

    fn vote_view(&self, hash: &ContentHash, perspective: Option<&PublicKey>) -> VoteView {
        self.container
            .votes
            .get(hash)
            .map(|votes| votes.view(perspective))
            .unwrap_or_else(|| VoteView::empty(*hash))
    }

    fn annotated(&self, hash: &ContentHash, perspective: Option<&PublicKey>) -> Result<ContentRep> {
        let mut rep = self
            .container
            .content
            .get(hash)
            .cloned()
            .ok_or_else(|| StateError::internal(format!("{} is indexed without content", hash)))?;
        rep.votes = Some(self.vote_view(hash, perspective));
        Ok(rep)
    }

    fn annotated_page(
        &self,
        hashes: &[ContentHash],
        perspective: Option<&PublicKey>,
    ) -> Result<Vec<ContentRep>> {
        hashes
            .iter()
            .map(|hash| self.annotated(hash, perspective))
            .collect()
    }
}

/// Thread-safe compiled view of one board.
#[derive(Debug, Default)]
pub struct Viewer {
    state: Mutex<Option<ViewerState>>,
}

impl Viewer {
    /// Creates a viewer without state. Every query fails until [`Viewer::reset`].
    pub fn uninitialized() -> Self {
        Self::default()
    }

    /// Bootstraps a viewer from a full snapshot.
    pub fn new(store: &dyn SnapshotStore, snapshot: &Snapshot) -> Result<Self> {
        let state = ViewerState::bootstrap(store, snapshot)?;
        Ok(Self {
            state: Mutex::new(Some(state)),
        })
    }

    /// Rebuilds the state from a full snapshot, replacing the current one.
    ///
    /// On failure the current state is kept.
    pub fn reset(&self, store: &dyn SnapshotStore, snapshot: &Snapshot) -> Result<()> {
        let state = ViewerState::bootstrap(store, snapshot)?;
        *self.lock()? = Some(state);
        Ok(())
    }

    /// Returns true if the viewer holds state.
    pub fn is_initialized(&self) -> bool {
        self.lock().map(|s| s.is_some()).unwrap_or(false)
    }

    /// Applies the change set of a newer snapshot of the same board.
    ///
    /// The board item is re-read from `snapshot`; the change set is validated
    /// in full before anything is applied, so a rejected update leaves the
    /// viewer as it was.
    pub fn update(
        &self,
        store: &dyn SnapshotStore,
        snapshot: &Snapshot,
        changes: &ChangeSet,
    ) -> Result<()> {
        let mut guard = self.lock()?;
        let state = guard.as_mut().ok_or(StateError::ViewerNotInitialized)?;

        let content = read_content_index(store, snapshot)?;
        content.board.expect_kind(ContentKind::Board)?;
        content.board.check_board_ref(&state.public_key)?;
        state.validate_changes(changes)?;

        state.set_board(&content.board)?;
        state.apply_changes(changes)?;
        debug!(
            "Updated viewer of board {} to seq {}: {} new, {} deleted threads, {} deleted posts",
            state.public_key,
            snapshot.seq,
            changes.new_content().len(),
            changes.deleted_threads().len(),
            changes.deleted_posts().len()
        );
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<ViewerState>>> {
        self.state
            .lock()
            .map_err(|_| StateError::internal("viewer lock poisoned"))
    }

    fn read<R, F>(&self, query: F) -> Result<R>
    where
        F: FnOnce(&ViewerState) -> Result<R>,
    {
        let guard = self.lock()?;
        let state = guard.as_ref().ok_or(StateError::ViewerNotInitialized)?;
        query(state)
    }

    /// Returns true if `user` is an indexed participant.
    pub fn has_user(&self, user: &PublicKey) -> bool {
        self.read(|s| Ok(s.indexer.users.has(user))).unwrap_or(false)
    }

    /// Returns true if `thread` is in the board's thread list.
    pub fn has_thread(&self, thread: &ContentHash) -> bool {
        self.read(|s| Ok(s.is_thread(thread)))
            .unwrap_or(false)
    }

    /// Returns true if a board, thread or post with `hash` is compiled.
    pub fn has_content(&self, hash: &ContentHash) -> bool {
        self.read(|s| Ok(s.container.content.contains_key(hash)))
            .unwrap_or(false)
    }

    /// Returns the board.
    pub fn get_board(&self) -> Result<ContentRep> {
        self.read(|s| s.board_rep())
    }

    /// Returns the board and a page of its threads.
    pub fn get_board_page(&self, input: &BoardPageIn) -> Result<BoardPageOut> {
        self.read(|s| {
            let page = s.indexer.threads.get(&input.paginated_input)?;
            Ok(BoardPageOut {
                board: s.board_rep()?,
                threads: s.annotated_page(&page.data, input.perspective.as_ref())?,
            })
        })
    }

    /// Returns the board, a thread and a page of its posts.
    pub fn get_thread_page(&self, input: &ThreadPageIn) -> Result<ThreadPageOut> {
        self.read(|s| {
            let perspective = input.perspective.as_ref();
            let posts = s.indexer.posts_of.get(&input.thread_hash);
            let posts = match posts {
                Some(posts) if s.is_thread(&input.thread_hash) => posts,
                _ => {
                    return Err(StateError::not_found(format!(
                        "thread of hash '{}' is not found in board '{}'",
                        input.thread_hash, s.public_key
                    )))
                }
            };
            let page = posts.get(&input.paginated_input)?;
            Ok(ThreadPageOut {
                board: s.board_rep()?,
                thread: s.annotated(&input.thread_hash, perspective)?,
                posts: s.annotated_page(&page.data, perspective)?,
            })
        })
    }

    /// Returns the votes of a thread or post.
    ///
    /// Indexed content without votes yields an empty view.
    pub fn get_votes(&self, input: &ContentVotesIn) -> Result<ContentVotesOut> {
        self.read(|s| {
            let hash = &input.content_hash;
            if !s.container.content.contains_key(hash) && !s.container.votes.contains_key(hash) {
                return Err(StateError::not_found(format!(
                    "content of hash '{}' is not found",
                    hash
                )));
            }
            Ok(ContentVotesOut {
                votes: s.vote_view(hash, input.perspective.as_ref()),
            })
        })
    }

    /// Returns a participant's reputation.
    pub fn get_user_profile(&self, input: &UserProfileIn) -> Result<UserProfileOut> {
        self.read(|s| {
            let user = &input.user_public_key;
            if !s.indexer.users.has(user) {
                return Err(StateError::not_found(format!(
                    "user of public key {} is not found",
                    user
                )));
            }
            let profile = s.container.profiles.get(user).ok_or_else(|| {
                StateError::internal(format!(
                    "user of public key {} is indexed but has no profile",
                    user
                ))
            })?;
            Ok(UserProfileOut {
                user_public_key: *user,
                profile: profile.view(),
            })
        })
    }

    /// Returns every participant once, in the order they were first indexed.
    ///
    /// A viewer advanced by [`Viewer::update`] lists the participants of
    /// earlier snapshots first, so its order can differ from a bootstrap of
    /// the same snapshot. The set of participants is the same.
    pub fn get_participants(&self) -> Result<ParticipantsOut> {
        self.read(|s| {
            let all = s.indexer.users.get(&PaginatedInput::all())?;
            Ok(ParticipantsOut {
                participants: all.data,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::object::Vote;
    use crate::snapshot::{
        ContentVotesPage, MemorySnapshotStore, RootValues, ThreadPage, UserVotesPage,
    };

    fn key(b: u8) -> PublicKey {
        PublicKey::from_bytes([b; 32])
    }

    struct Fixture {
        store: MemorySnapshotStore,
        values: RootValues,
        thread: Content,
        post: Content,
    }

    fn fixture() -> Fixture {
        let board = key(1);
        let mut values = RootValues::new(Content::board(board, board, "Board", "about").unwrap());
        let thread = Content::thread(board, key(2), "T1", "").unwrap();
        let post = Content::post(board, key(3), *thread.hash(), None, "P1", "").unwrap();
        values.content.threads.push(ThreadPage {
            thread: thread.clone(),
            posts: vec![post.clone()],
        });
        Fixture {
            store: MemorySnapshotStore::new(),
            values,
            thread,
            post,
        }
    }

    fn viewer_of(f: &Fixture) -> Viewer {
        let snapshot = f.store.commit(key(1), f.values.clone()).unwrap();
        Viewer::new(&f.store, &snapshot).unwrap()
    }

    #[test]
    fn test_uninitialized_viewer() {
        let viewer = Viewer::uninitialized();
        assert!(!viewer.is_initialized());
        assert!(matches!(
            viewer.get_board(),
            Err(StateError::ViewerNotInitialized)
        ));
        assert!(matches!(
            viewer.get_participants(),
            Err(StateError::ViewerNotInitialized)
        ));
        assert!(!viewer.has_user(&key(1)));
        assert!(!viewer.has_content(&ContentHash::default()));
    }

    #[test]
    fn test_bootstrap_indexes_tree() {
        let f = fixture();
        let viewer = viewer_of(&f);

        let board = viewer.get_board().unwrap();
        assert_eq!(board.public_key, Some(key(1)));
        assert_eq!(board.kind, ContentKind::Board);

        let page = viewer.get_board_page(&BoardPageIn::default()).unwrap();
        assert_eq!(page.threads.len(), 1);
        assert_eq!(page.threads[0].hash, *f.thread.hash());

        let thread_page = viewer
            .get_thread_page(&ThreadPageIn {
                perspective: None,
                thread_hash: *f.thread.hash(),
                paginated_input: PaginatedInput::default(),
            })
            .unwrap();
        assert_eq!(thread_page.posts.len(), 1);
        assert_eq!(thread_page.posts[0].hash, *f.post.hash());

        assert!(viewer.has_thread(f.thread.hash()));
        assert!(!viewer.has_thread(f.post.hash()));
        assert!(viewer.has_user(&key(2)) && viewer.has_user(&key(3)));
    }

    #[test]
    fn test_thread_page_of_post_is_not_found() {
        let f = fixture();
        let viewer = viewer_of(&f);
        let err = viewer
            .get_thread_page(&ThreadPageIn {
                perspective: None,
                thread_hash: *f.post.hash(),
                paginated_input: PaginatedInput::default(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    fn bootstrap_error(f: &Fixture) -> StateError {
        let snapshot = f.store.commit(key(1), f.values.clone()).unwrap();
        Viewer::new(&f.store, &snapshot).unwrap_err()
    }

    #[test]
    fn test_board_in_thread_slot_is_invalid_read() {
        let mut f = fixture();
        f.values.content.threads.push(ThreadPage {
            thread: Content::board(key(1), key(2), "Imposter", "").unwrap(),
            posts: Vec::new(),
        });
        assert_eq!(bootstrap_error(&f).kind(), ErrorKind::InvalidRead);
    }

    #[test]
    fn test_thread_in_post_slot_is_invalid_read() {
        let mut f = fixture();
        let thread = f.thread.clone();
        f.values.content.threads[0].posts.push(thread);
        assert_eq!(bootstrap_error(&f).kind(), ErrorKind::InvalidRead);
    }

    #[test]
    fn test_tampered_content_is_invalid_read() {
        let mut f = fixture();
        f.values.content.threads[0].posts[0].body.creator = key(9);
        assert_eq!(bootstrap_error(&f).kind(), ErrorKind::InvalidRead);
    }

    #[test]
    fn test_thread_listed_twice_is_indexed_once() {
        let mut f = fixture();
        let page = f.values.content.threads[0].clone();
        f.values.content.threads.push(ThreadPage {
            thread: page.thread,
            posts: Vec::new(),
        });
        let viewer = viewer_of(&f);

        let page = viewer.get_board_page(&BoardPageIn::default()).unwrap();
        assert_eq!(page.threads.len(), 1);
    }

    #[test]
    fn test_reply_is_linked_to_parent_post() {
        let mut f = fixture();
        let reply = Content::post(
            key(1),
            key(4),
            *f.thread.hash(),
            Some(*f.post.hash()),
            "Re",
            "",
        )
        .unwrap();
        f.values.content.threads[0].posts.push(reply.clone());
        let viewer = viewer_of(&f);

        let guard = viewer.lock().unwrap();
        let state = guard.as_ref().unwrap();
        assert_eq!(
            state.indexer.posts_of[f.thread.hash()].keys(),
            &[*f.post.hash(), *reply.hash()]
        );
        assert_eq!(state.indexer.posts_of[f.post.hash()].keys(), &[*reply.hash()]);
    }

    #[test]
    fn test_votes_on_unindexed_content_are_ignored() {
        let mut f = fixture();
        let ghost = ContentHash::from_bytes([0xEE; 32]);
        f.values.thread_votes.pages.push(ContentVotesPage {
            of_content: ghost,
            votes: vec![Content::thread_vote(key(1), key(5), ghost, Vote::untagged(VoteValue::Up))
                .unwrap()],
        });
        let viewer = viewer_of(&f);

        let err = viewer
            .get_votes(&ContentVotesIn {
                perspective: None,
                content_hash: ghost,
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        // The voter is still a participant.
        assert!(viewer.has_user(&key(5)));
    }

    #[test]
    fn test_spam_takes_precedence_over_block() {
        let mut f = fixture();
        f.values.user_votes.pages.push(UserVotesPage {
            of_user: key(3),
            votes: vec![Content::user_vote(
                key(1),
                key(2),
                key(3),
                Vote::new(VoteValue::Down, [VoteTag::Spam, VoteTag::Block]),
            )
            .unwrap()],
        });
        let viewer = viewer_of(&f);

        let profile = viewer
            .get_user_profile(&UserProfileIn {
                user_public_key: key(2),
            })
            .unwrap()
            .profile;
        assert_eq!(profile.marked_as_spam, vec![key(3)]);
        assert!(profile.blocked.is_empty());
    }

    #[test]
    fn test_neutral_vote_indexes_target_only() {
        let mut f = fixture();
        f.values.user_votes.pages.push(UserVotesPage {
            of_user: key(9),
            votes: vec![Content::user_vote(
                key(1),
                key(2),
                key(9),
                Vote::untagged(VoteValue::Neutral),
            )
            .unwrap()],
        });
        let viewer = viewer_of(&f);

        let profile = viewer
            .get_user_profile(&UserProfileIn {
                user_public_key: key(9),
            })
            .unwrap();
        assert_eq!(profile.user_public_key, key(9));
        assert!(profile.profile.trusted_by.is_empty());
    }

    #[test]
    fn test_unknown_user_is_not_found() {
        let viewer = viewer_of(&fixture());
        let err = viewer
            .get_user_profile(&UserProfileIn {
                user_public_key: key(42),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_reset_replaces_state() {
        let mut f = fixture();
        let viewer = Viewer::uninitialized();
        let snapshot = f.store.commit(key(1), f.values.clone()).unwrap();
        viewer.reset(&f.store, &snapshot).unwrap();
        assert!(viewer.has_thread(f.thread.hash()));

        f.values.content.threads.clear();
        let snapshot = f.store.commit(key(1), f.values.clone()).unwrap();
        viewer.reset(&f.store, &snapshot).unwrap();
        assert!(!viewer.has_thread(f.thread.hash()));
    }

    #[test]
    fn test_update_rejects_post_of_unknown_thread() {
        let f = fixture();
        let viewer = viewer_of(&f);
        let snapshot = f.store.latest_snapshot(&key(1)).unwrap();

        let mut changes = ChangeSet::new(key(1), true);
        let orphan = Content::post(
            key(1),
            key(3),
            ContentHash::from_bytes([0x55; 32]),
            None,
            "Lost",
            "",
        )
        .unwrap();
        let thread = Content::thread(key(1), key(2), "T2", "").unwrap();
        changes.record_new(&thread);
        changes.record_new(&orphan);

        let err = viewer.update(&f.store, &snapshot, &changes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        // Nothing of the rejected change set was applied.
        assert!(!viewer.has_thread(thread.hash()));
    }

    #[test]
    fn test_update_rejects_foreign_change_set() {
        let f = fixture();
        let viewer = viewer_of(&f);
        let snapshot = f.store.latest_snapshot(&key(1)).unwrap();
        let changes = ChangeSet::new(key(7), true);
        assert!(viewer.update(&f.store, &snapshot, &changes).is_err());
    }

    #[test]
    fn test_update_rejects_tampered_content() {
        let f = fixture();
        let viewer = viewer_of(&f);
        let snapshot = f.store.latest_snapshot(&key(1)).unwrap();

        let mut thread = Content::thread(key(1), key(2), "T2", "").unwrap();
        thread.body.created += 1;
        let mut changes = ChangeSet::new(key(1), true);
        changes.record_new(&thread);

        let err = viewer.update(&f.store, &snapshot, &changes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRead);
        assert!(!viewer.has_content(thread.hash()));
    }
}
