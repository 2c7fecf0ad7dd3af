//! Benchmarks for snapshot extraction and viewer queries.
//!
//! Set `RUST_LOG=board_state=debug` to see extraction logs while benchmarking.

use board_state::object::{Content, PublicKey, Vote, VoteTag, VoteValue};
use board_state::paginated::PaginatedInput;
use board_state::snapshot::{
    ContentVotesPage, MemorySnapshotStore, RootValues, Snapshot, SnapshotStore, ThreadPage,
    UserVotesPage,
};
use board_state::state::SnapshotInstance;
use board_state::view::{BoardPageIn, ThreadPageIn, Viewer};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn key(n: u32) -> PublicKey {
    let mut bytes = [0u8; 32];
    bytes[..4].copy_from_slice(&n.to_be_bytes());
    bytes[31] = 0xb0;
    PublicKey::from_bytes(bytes)
}

/// Builds a board with `threads` threads of `posts` posts each, one vote per
/// thread from every user and a ring of trust votes between users.
fn populated_board(threads: u32, posts: u32, users: u32) -> RootValues {
    let board = key(0);
    let mut values = RootValues::new(Content::board(board, board, "Bench", "").unwrap());

    for t in 0..threads {
        let thread = Content::thread(board, key(1 + t % users), &format!("Thread {}", t), "").unwrap();
        let thread_posts = (0..posts)
            .map(|p| {
                Content::post(board, key(1 + p % users), *thread.hash(), None, "Re", "").unwrap()
            })
            .collect();
        let votes = (0..users)
            .map(|u| {
                let value = if u % 3 == 0 { VoteValue::Down } else { VoteValue::Up };
                Content::thread_vote(board, key(1 + u), *thread.hash(), Vote::untagged(value))
                    .unwrap()
            })
            .collect();
        values.thread_votes.pages.push(ContentVotesPage {
            of_content: *thread.hash(),
            votes,
        });
        values.content.threads.push(ThreadPage {
            thread,
            posts: thread_posts,
        });
    }

    for u in 0..users {
        let of_user = key(1 + (u + 1) % users);
        let vote = Content::user_vote(
            board,
            key(1 + u),
            of_user,
            Vote::new(VoteValue::Up, [VoteTag::Trust]),
        )
        .unwrap();
        values.user_votes.pages.push(UserVotesPage {
            of_user,
            votes: vec![vote],
        });
    }
    values
}

fn committed(threads: u32) -> (Arc<MemorySnapshotStore>, Snapshot) {
    let store = Arc::new(MemorySnapshotStore::new());
    let snapshot = store.commit(key(0), populated_board(threads, 10, 50)).unwrap();
    (store, snapshot)
}

fn bench_bootstrap(c: &mut Criterion) {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }

    let mut group = c.benchmark_group("bootstrap");
    for threads in [10u32, 100, 500] {
        let (store, snapshot) = committed(threads);
        group.bench_with_input(BenchmarkId::new("viewer", threads), &snapshot, |b, s| {
            b.iter(|| Viewer::new(store.as_ref(), black_box(s)).unwrap())
        });
        let dyn_store: Arc<dyn SnapshotStore> = store.clone();
        group.bench_with_input(BenchmarkId::new("instance", threads), &snapshot, |b, s| {
            b.iter(|| SnapshotInstance::new(dyn_store.clone(), black_box(s.clone()), None).unwrap())
        });
    }
    group.finish();
}

fn bench_incremental(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental");
    let board = key(0);
    let store = Arc::new(MemorySnapshotStore::new());
    let mut values = populated_board(200, 10, 50);
    let first = store.commit(board, values.clone()).unwrap();

    let extra = Content::thread(board, key(1), "Late", "").unwrap();
    values.content.threads.push(ThreadPage {
        thread: extra,
        posts: Vec::new(),
    });
    let second = store.commit(board, values).unwrap();

    let dyn_store: Arc<dyn SnapshotStore> = store.clone();
    let base = SnapshotInstance::new(dyn_store.clone(), first, None).unwrap();
    group.bench_function("extract_one_new_thread", |b| {
        b.iter(|| SnapshotInstance::new(dyn_store.clone(), second.clone(), Some(&base)).unwrap())
    });
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("queries");
    let (store, snapshot) = committed(500);
    let viewer = Viewer::new(store.as_ref(), &snapshot).unwrap();
    let first_thread = viewer
        .get_board_page(&BoardPageIn::default())
        .unwrap()
        .threads[0]
        .hash;

    group.bench_function("board_page", |b| {
        let input = BoardPageIn {
            perspective: Some(key(1)),
            paginated_input: PaginatedInput::new(100, 20),
        };
        b.iter(|| viewer.get_board_page(black_box(&input)).unwrap())
    });
    group.bench_function("thread_page", |b| {
        let input = ThreadPageIn {
            perspective: Some(key(1)),
            thread_hash: first_thread,
            paginated_input: PaginatedInput::default(),
        };
        b.iter(|| viewer.get_thread_page(black_box(&input)).unwrap())
    });
    group.bench_function("participants", |b| {
        b.iter(|| viewer.get_participants().unwrap())
    });
    group.finish();
}

criterion_group!(benches, bench_bootstrap, bench_incremental, bench_queries);
criterion_main!(benches);
