//! Board state compiler.
//!
//! The compiler owns one [`BoardInstance`] per board public key. Boards this
//! node holds the secret key of (master boards) are refreshed by a background
//! thread whenever the store has a newer snapshot; subscriber boards are
//! updated externally through [`Compiler::update_board`].
//!
//! One lock guards the whole board mapping. It is held for init, lookup and
//! each refresh sweep, so a sweep is serialized against every other compiler
//! operation.

use crate::config::CompilerConfig;
use crate::error::{Result, StateError};
use crate::object::{PublicKey, SecretKey};
use crate::snapshot::{Snapshot, SnapshotStore};
use crate::state::instance::SnapshotInstance;
use crate::view::Viewer;
use std::collections::HashMap;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// How this node participates in a board.
#[derive(Debug, Clone)]
pub enum BoardRole {
    /// The node can write to the board.
    Master {
        /// Secret key of the board.
        secret_key: SecretKey,
    },
    /// The node follows snapshots published elsewhere.
    Subscriber,
}

impl BoardRole {
    /// Returns true for [`BoardRole::Master`].
    pub fn is_master(&self) -> bool {
        matches!(self, BoardRole::Master { .. })
    }
}

/// Current snapshot instance and viewer of one board.
pub struct BoardInstance {
    public_key: PublicKey,
    role: BoardRole,
    instance: Mutex<Arc<SnapshotInstance>>,
    viewer: Viewer,
}

impl std::fmt::Debug for BoardInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardInstance")
            .field("public_key", &self.public_key)
            .field("role", &self.role)
            .finish()
    }
}

impl BoardInstance {
    /// Extracts `snapshot` and bootstraps the board's viewer from it.
    pub fn new(store: Arc<dyn SnapshotStore>, role: BoardRole, snapshot: Snapshot) -> Result<Self> {
        let viewer = Viewer::new(store.as_ref(), &snapshot)?;
        let public_key = snapshot.public_key;
        let instance = SnapshotInstance::new(store, snapshot, None)?;
        Ok(Self {
            public_key,
            role,
            instance: Mutex::new(Arc::new(instance)),
            viewer,
        })
    }

    /// Returns the board public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Returns the role of this node for the board.
    pub fn role(&self) -> &BoardRole {
        &self.role
    }

    /// Returns the board's viewer.
    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    fn lock(&self) -> Result<MutexGuard<'_, Arc<SnapshotInstance>>> {
        self.instance
            .lock()
            .map_err(|_| StateError::internal("board instance lock poisoned"))
    }

    /// Returns the current snapshot instance.
    pub fn instance(&self) -> Result<Arc<SnapshotInstance>> {
        Ok(self.lock()?.clone())
    }

    /// Returns true if the store holds a newer snapshot than the current one.
    pub fn update_needed(&self, store: &dyn SnapshotStore) -> Result<bool> {
        let current = self.lock()?.seq();
        Ok(store.latest_seq(&self.public_key)? > current)
    }

    /// Replaces the current instance with one built from `snapshot`.
    ///
    /// The new instance is extracted from its predecessor and its change set
    /// applied to the viewer before the swap. If either step fails, the
    /// previous instance and viewer state remain current. Snapshots that do
    /// not advance the sequence number are ignored.
    pub fn update(&self, store: &Arc<dyn SnapshotStore>, snapshot: Snapshot) -> Result<()> {
        let mut current = self.lock()?;
        if snapshot.public_key != self.public_key {
            return Err(StateError::internal(format!(
                "snapshot of board {} offered to board {}",
                snapshot.public_key, self.public_key
            )));
        }
        if snapshot.seq <= current.seq() {
            debug!(
                "Ignoring snapshot {} of board {}, current is {}",
                snapshot.seq,
                self.public_key,
                current.seq()
            );
            return Ok(());
        }

        let next = SnapshotInstance::new(store.clone(), snapshot, Some(&**current))?;
        self.viewer
            .update(store.as_ref(), &next.snapshot()?, next.changes())?;
        info!(
            "Board {} advanced from seq {} to {}",
            self.public_key,
            current.seq(),
            next.seq()
        );
        *current = Arc::new(next);
        Ok(())
    }
}

type BoardMap = Arc<Mutex<HashMap<PublicKey, Arc<BoardInstance>>>>;

fn lock_boards(boards: &BoardMap) -> Result<MutexGuard<'_, HashMap<PublicKey, Arc<BoardInstance>>>> {
    boards
        .lock()
        .map_err(|_| StateError::internal("board mapping lock poisoned"))
}

/// Owns the board instances of one node.
pub struct Compiler {
    config: CompilerConfig,
    store: Arc<dyn SnapshotStore>,
    boards: BoardMap,
    shutdown: Option<mpsc::Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("config", &self.config)
            .field("running", &self.worker.is_some())
            .finish()
    }
}

impl Compiler {
    /// Creates a compiler and starts its refresh thread.
    pub fn new(config: CompilerConfig, store: Arc<dyn SnapshotStore>) -> Result<Self> {
        config.validate()?;
        let boards: BoardMap = Arc::new(Mutex::new(HashMap::new()));
        let (shutdown, signal) = mpsc::channel();

        let worker = {
            let store = store.clone();
            let boards = boards.clone();
            let interval = config.update_interval();
            thread::Builder::new()
                .name("board-state-compiler".to_string())
                .spawn(move || update_loop(store, boards, interval, signal))
                .map_err(|e| StateError::internal(format!("failed to spawn refresh thread: {}", e)))?
        };

        info!(
            "Board state compiler started (update interval {:?})",
            config.update_interval()
        );
        Ok(Self {
            config,
            store,
            boards,
            shutdown: Some(shutdown),
            worker: Some(worker),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Loads the latest snapshot of `public_key` and registers the board.
    ///
    /// With one secret key the board is a master board, without any a
    /// subscriber board. More than one key is rejected. An existing instance
    /// for the same key is replaced.
    pub fn init_board(
        &self,
        public_key: PublicKey,
        secret_keys: &[SecretKey],
    ) -> Result<Arc<BoardInstance>> {
        let role = match secret_keys {
            [] => BoardRole::Subscriber,
            [secret_key] => BoardRole::Master {
                secret_key: secret_key.clone(),
            },
            _ => {
                return Err(StateError::internal(format!(
                    "invalid secret key count provided of {}",
                    secret_keys.len()
                )))
            }
        };

        let mut boards = lock_boards(&self.boards)?;
        let snapshot = self.store.latest_snapshot(&public_key)?;
        let seq = snapshot.seq;
        let board = Arc::new(BoardInstance::new(self.store.clone(), role, snapshot)?);
        if boards.insert(public_key, board.clone()).is_some() {
            info!("Replaced board {} at seq {}", public_key, seq);
        } else {
            info!(
                "Initialized board {} at seq {} as {}",
                public_key,
                seq,
                if board.role.is_master() { "master" } else { "subscriber" }
            );
        }
        Ok(board)
    }

    /// Returns the instance of `public_key`.
    pub fn get_board(&self, public_key: &PublicKey) -> Result<Arc<BoardInstance>> {
        lock_boards(&self.boards)?
            .get(public_key)
            .cloned()
            .ok_or_else(|| {
                StateError::not_found(format!(
                    "board of public key '{}' is not found in compiler",
                    public_key
                ))
            })
    }

    /// Returns the public keys of every registered board.
    pub fn board_keys(&self) -> Result<Vec<PublicKey>> {
        Ok(lock_boards(&self.boards)?.keys().copied().collect())
    }

    /// Applies a snapshot received for a board, typically a subscriber board.
    pub fn update_board(&self, public_key: &PublicKey, snapshot: Snapshot) -> Result<()> {
        self.get_board(public_key)?.update(&self.store, snapshot)
    }

    /// Stops the refresh thread and waits for it to exit.
    ///
    /// No refresh runs after this returns. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            // The thread may already have exited; the join below covers both cases.
            let _ = shutdown.send(());
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Board state compiler thread panicked");
            }
            info!("Board state compiler stopped");
        }
    }
}

impl Drop for Compiler {
    fn drop(&mut self) {
        self.close();
    }
}

fn update_loop(
    store: Arc<dyn SnapshotStore>,
    boards: BoardMap,
    interval: Duration,
    signal: mpsc::Receiver<()>,
) {
    loop {
        match signal.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => sweep(&store, &boards),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}

/// Refreshes every master board that has a newer snapshot in the store.
fn sweep(store: &Arc<dyn SnapshotStore>, boards: &BoardMap) {
    let boards = match lock_boards(boards) {
        Ok(boards) => boards,
        Err(e) => {
            error!("Refresh sweep aborted: {}", e);
            return;
        }
    };
    debug!("Refresh sweep over {} boards", boards.len());

    for board in boards.values().filter(|b| b.role.is_master()) {
        let refreshed = board.update_needed(store.as_ref()).and_then(|needed| {
            if !needed {
                return Ok(false);
            }
            let snapshot = store.latest_snapshot(board.public_key())?;
            board.update(store, snapshot)?;
            Ok(true)
        });
        match refreshed {
            Ok(true) => debug!("Refreshed board {}", board.public_key()),
            Ok(false) => {}
            Err(e) => warn!("Error on update of board {}: {}", board.public_key(), e),
        }
    }
}
