use std::collections::HashSet;
use std::sync::mpsc;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

use crate::common::{DEADLINE, assert_names_removed, names_for, unique_namespace};
use threecol::ring::{Consumer, Producer, Publish};
use threecol::shm::{CreatedResources, ResourceKind, SharedState, ShmSegment};
use threecol::sync::SyncTriplet;
use threecol::{
    BUFFER_CAPACITY, CandidateSolution, Coordinator, CoordinatorConfig, DrainEnd, Edge, Graph,
    MAX_SOLUTION_EDGES, RandomColoring, ResourceNames, Worker, WorkerConfig, WorkerStatistics,
};

fn create_coordinator(names: &ResourceNames) -> Coordinator {
    Coordinator::create(CoordinatorConfig::default().with_names(names.clone())).unwrap()
}

/// Run a generator on its own thread and report its statistics on `tx`.
fn spawn_worker(
    names: &ResourceNames,
    edges: &[&str],
    seed: u64,
    tx: mpsc::Sender<WorkerStatistics>,
) -> thread::JoinHandle<()> {
    let config = WorkerConfig::default()
        .with_names(names.clone())
        .with_seed(seed);
    let graph = Graph::parse(edges).unwrap();
    thread::spawn(move || {
        let mut source = RandomColoring::from_seed_option(graph, config.seed);
        let stats = Worker::run(config, &mut source).unwrap();
        tx.send(stats).unwrap();
    })
}

/// Poll the shared record until `done` holds.
fn wait_for(names: &ResourceNames, what: &str, done: impl Fn(&SharedState, &SyncTriplet) -> bool) {
    let sync = SyncTriplet::open(names).unwrap();
    let segment = ShmSegment::open(&names.shm, SharedState::SIZE).unwrap();
    let state = SharedState::from_segment(&segment);
    let start = Instant::now();
    while !done(state, &sync) {
        assert!(start.elapsed() < DEADLINE, "timed out waiting for {}", what);
        thread::sleep(Duration::from_millis(5));
    }
    sync.close().unwrap();
    segment.unmap().unwrap();
}

fn registered(state: &SharedState, sync: &SyncTriplet) -> u32 {
    let guard = sync.lock().unwrap();
    let count = state.registered_workers(&guard);
    guard.unlock().unwrap();
    count
}

fn collect(rx: &mpsc::Receiver<WorkerStatistics>, count: usize) -> Vec<WorkerStatistics> {
    (0..count)
        .map(|_| {
            rx.recv_timeout(DEADLINE)
                .expect("worker did not terminate after shutdown")
        })
        .collect()
}

#[test]
fn test_concurrent_registration_is_counted() {
    const WORKERS: usize = 8;
    let names = names_for(&unique_namespace());
    let mut coordinator = create_coordinator(&names);

    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let names = names.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut worker = Worker::attach(WorkerConfig::default().with_names(names)).unwrap();
                barrier.wait();
                worker.register().unwrap();
                worker.detach().unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(coordinator.shutdown().unwrap(), WORKERS as u32);
    coordinator.cleanup().unwrap();
    assert_names_removed(&names);
}

#[test]
fn test_shutdown_wakes_workers_blocked_on_full_buffer() {
    const WORKERS: usize = 3;
    let names = names_for(&unique_namespace());
    let coordinator = create_coordinator(&names);

    // A self-loop is never properly colored, so every proposal has one edge
    // and the buffer fills up.
    let (tx, rx) = mpsc::channel();
    let handles: Vec<_> = (0..WORKERS)
        .map(|i| spawn_worker(&names, &["0-0", "0-1"], i as u64, tx.clone()))
        .collect();

    wait_for(&names, "workers to register and fill the buffer", |state, sync| {
        registered(state, sync) == WORKERS as u32 && sync.free_slots().value().unwrap() == 0
    });

    coordinator.stop_handle().unwrap().request_stop().unwrap();
    let mut out = Vec::new();
    let outcome = coordinator.run(&mut out).unwrap();
    assert_eq!(outcome.end, DrainEnd::Stopped);
    assert!(outcome.best.is_none());

    let stats = collect(&rx, WORKERS);
    for handle in handles {
        handle.join().unwrap();
    }
    // nothing was read, so nothing beyond the capacity was ever written
    let published: u64 = stats.iter().map(|s| s.published).sum();
    assert_eq!(published, BUFFER_CAPACITY as u64);
    assert_names_removed(&names);
}

#[test]
fn test_oversized_candidates_never_reach_the_buffer() {
    let names = names_for(&unique_namespace());
    let coordinator = create_coordinator(&names);

    // 15 self-loops conflict under every coloring.
    let loops: Vec<String> = (0..15).map(|i| format!("{}-{}", i, i)).collect();
    let loops: Vec<&str> = loops.iter().map(String::as_str).collect();
    let (tx, rx) = mpsc::channel();
    let handle = spawn_worker(&names, &loops, 1, tx);

    wait_for(&names, "the worker to register", |state, sync| {
        registered(state, sync) == 1
    });
    thread::sleep(Duration::from_millis(50));

    let stop = coordinator.stop_handle().unwrap();
    stop.request_stop().unwrap();
    let mut out = Vec::new();
    let outcome = coordinator.run(&mut out).unwrap();
    assert_eq!(outcome.statistics.candidates_read, 0);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "[supervisor] Best found solution: no solution received\n"
    );

    let stats = collect(&rx, 1).remove(0);
    handle.join().unwrap();
    assert_eq!(stats.published, 0);
    assert_eq!(stats.discarded_oversized, stats.proposals);
}

#[test]
fn test_many_workers_drain_until_colorable() {
    const WORKERS: usize = 4;
    let names = names_for(&unique_namespace());
    let coordinator = create_coordinator(&names);

    // A 5-cycle with a chord; 3-colorable but most random colorings are not.
    let edges = ["0-1", "1-2", "2-3", "3-4", "4-0", "0-2"];
    let (tx, rx) = mpsc::channel();

    // Workers may only attach while the names exist, so register them all
    // before draining starts.
    let handles: Vec<_> = (0..WORKERS)
        .map(|i| spawn_worker(&names, &edges, 100 + i as u64, tx.clone()))
        .collect();
    wait_for(&names, "workers to register", |state, sync| {
        registered(state, sync) == WORKERS as u32
    });

    let mut out = Vec::new();
    let outcome = coordinator.run(&mut out).unwrap();
    assert_eq!(outcome.end, DrainEnd::Colorable);
    assert!(outcome.is_colorable());

    let stats = collect(&rx, WORKERS);
    for handle in handles {
        handle.join().unwrap();
    }

    let text = String::from_utf8(out).unwrap();
    assert!(text.ends_with("[supervisor] The graph is 3-colorable!\n"));

    // improvements are printed with strictly decreasing edge counts
    let counts: Vec<usize> = text
        .lines()
        .filter_map(|l| l.strip_prefix("[supervisor] Solution with "))
        .map(|l| l.split(' ').next().unwrap().parse().unwrap())
        .collect();
    assert!(counts.windows(2).all(|w| w[0] > w[1]));
    assert!(counts.iter().all(|&c| c > 0));

    let published: u64 = stats.iter().map(|s| s.published).sum();
    assert!(published >= outcome.statistics.candidates_read);
}

/// Candidate `seq` of `producer`: every edge carries the tag, and the length
/// varies so a slot mixing two writes is visible.
fn tagged(producer: u32, seq: u32) -> CandidateSolution {
    let len = 1 + seq as usize % MAX_SOLUTION_EDGES;
    CandidateSolution::from_edges(&vec![Edge::new(producer, seq); len]).unwrap()
}

#[test]
fn test_concurrent_producers_lose_and_repeat_nothing() {
    const PRODUCERS: u32 = 6;
    const PER_PRODUCER: u32 = 2000;
    let names = names_for(&unique_namespace());

    let mut created = CreatedResources::new();
    let sync = SyncTriplet::create(&names, &mut created).unwrap();
    let segment = ShmSegment::create(&names.shm, SharedState::SIZE).unwrap();
    created.push(ResourceKind::Segment, &names.shm);

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let names = names.clone();
            thread::spawn(move || {
                let sync = SyncTriplet::open(&names).unwrap();
                let segment = ShmSegment::open(&names.shm, SharedState::SIZE).unwrap();
                let writer = Producer::new(SharedState::from_segment(&segment), &sync);
                for seq in 0..PER_PRODUCER {
                    let published = writer.publish(&tagged(producer, seq)).unwrap();
                    assert!(matches!(published, Publish::Written { .. }));
                }
                sync.close().unwrap();
                segment.unmap().unwrap();
            })
        })
        .collect();

    let mut reader = Consumer::new(SharedState::from_segment(&segment), &sync);
    let mut seen = HashSet::new();
    let mut last_seq: Vec<Option<u32>> = vec![None; PRODUCERS as usize];
    for _ in 0..PRODUCERS * PER_PRODUCER {
        let candidate = reader.read().unwrap();
        let tag = candidate.edges()[0];
        assert_eq!(candidate, tagged(tag.source, tag.destination), "torn slot");
        assert!(seen.insert(tag), "{} read twice", tag);

        // one producer's writes arrive in the order it made them
        let last = &mut last_seq[tag.source as usize];
        assert!(last.is_none_or(|prev| prev < tag.destination));
        *last = Some(tag.destination);
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(seen.len(), (PRODUCERS * PER_PRODUCER) as usize);
    assert_eq!(sync.used_slots().value().unwrap(), 0);
    assert_eq!(sync.free_slots().value().unwrap(), BUFFER_CAPACITY as u32);

    sync.close().unwrap();
    segment.unmap().unwrap();
    created.unlink_all().unwrap();
    assert_names_removed(&names);
}
