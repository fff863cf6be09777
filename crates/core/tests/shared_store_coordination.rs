//! Cross-process coordination tests.
//!
//! Two independent `CoordinationDb` handles on the same file stand in
//! for two worker processes sharing the store.

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;

use crescendo_core::{
    CoordinationDb, PendingArtistQueue, PendingGenreMap, RateLimiter, SearchSlotRegistry,
};

fn two_handles() -> (TempDir, Arc<CoordinationDb>, Arc<CoordinationDb>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("coordination.db");
    let a = Arc::new(CoordinationDb::open(&path).unwrap());
    let b = Arc::new(CoordinationDb::open(&path).unwrap());
    (dir, a, b)
}

#[test]
fn test_rate_window_is_shared_across_handles() {
    let (_dir, a, b) = two_handles();
    let limiter_a = RateLimiter::new(a, 60, 3);
    let limiter_b = RateLimiter::new(b, 60, 3);

    assert!(limiter_a.try_admit("abba", 0, 50));
    assert!(limiter_b.try_admit("abba", 50, 50));
    assert!(limiter_a.try_admit("abba", 100, 50));

    // The budget is global: the fourth request is rejected no matter
    // which worker asks.
    assert!(!limiter_b.try_admit("abba", 150, 50));
    assert!(!limiter_a.try_admit("abba", 150, 50));

    assert_eq!(limiter_b.status().current_requests, 3);
    assert_eq!(limiter_a.list_window().len(), 3);
}

#[test]
fn test_slots_are_shared_across_handles() {
    let (_dir, a, b) = two_handles();
    let slots_a = SearchSlotRegistry::new(a, 2, 300.0);
    let slots_b = SearchSlotRegistry::new(b, 2, 300.0);

    assert!(slots_a.acquire("abba"));
    assert!(slots_b.acquire("zappa"));
    assert!(!slots_a.acquire("queen"));

    // A release by the lease holder frees capacity for everyone.
    slots_b.release("zappa");
    assert!(slots_a.acquire("queen"));

    let active = slots_b.list_active();
    assert_eq!(active.len(), 2);
    assert!(active.contains(&"abba".to_string()));
    assert!(active.contains(&"queen".to_string()));
}

#[test]
fn test_artist_queue_keeps_global_arrival_order() {
    let (_dir, a, b) = two_handles();
    let queue_a = PendingArtistQueue::new(a, 6);
    let queue_b = PendingArtistQueue::new(b, 6);

    assert!(queue_a
        .enqueue(&["a1".into(), "a2".into(), "a3".into()])
        .is_empty());
    assert!(queue_b.enqueue(&["b1".into(), "b2".into()]).is_empty());

    // Crossing the threshold drains in arrival order across both
    // producers, and only one of them gets the batch.
    let batch = queue_a.enqueue(&["a4".into()]);
    assert_eq!(batch, vec!["a1", "a2", "a3", "b1", "b2", "a4"]);
    assert_eq!(queue_b.count(), 0);
}

#[test]
fn test_genre_map_merges_across_handles() {
    let (_dir, a, b) = two_handles();
    let map_a = PendingGenreMap::new(a, 4);
    let map_b = PendingGenreMap::new(b, 4);

    let mut first = std::collections::HashMap::new();
    first.insert("x".to_string(), vec!["rock".to_string()]);
    assert!(map_a.enqueue(&first).is_empty());

    // The other worker overwrites the same artist before any drain.
    let mut second = std::collections::HashMap::new();
    second.insert("x".to_string(), vec!["jazz".to_string()]);
    assert!(map_b.enqueue(&second).is_empty());
    assert_eq!(map_a.count(), 1);

    let mut fill = std::collections::HashMap::new();
    for i in 0..3 {
        fill.insert(format!("y{}", i), vec!["pop".to_string()]);
    }
    let batch = map_b.enqueue(&fill);
    assert_eq!(batch.len(), 4);
    assert_eq!(batch.get("x"), Some(&vec!["jazz".to_string()]));
}

#[test]
fn test_concurrent_admission_never_exceeds_budget() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("coordination.db");

    // Eight workers hammer the same window; the prune-count-insert
    // transaction must admit exactly max_requests of the 400 attempts.
    let handles: Vec<_> = (0..8u32)
        .map(|worker| {
            let path = path.clone();
            thread::spawn(move || {
                let db = Arc::new(CoordinationDb::open(&path).unwrap());
                let limiter = RateLimiter::new(db, 60, 10);
                (0..50u32)
                    .filter(|attempt| limiter.try_admit("abba", worker * 50 + attempt, 50))
                    .count()
            })
        })
        .collect();

    let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(admitted, 10);

    let db = Arc::new(CoordinationDb::open(&path).unwrap());
    let limiter = RateLimiter::new(db, 60, 10);
    assert_eq!(limiter.status().current_requests, 10);
}

#[test]
fn test_concurrent_acquires_never_exceed_capacity() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("coordination.db");

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let path = path.clone();
            thread::spawn(move || {
                let db = Arc::new(CoordinationDb::open(&path).unwrap());
                let slots = SearchSlotRegistry::new(db, 4, 300.0);
                (0..20)
                    .filter(|i| slots.acquire(&format!("seed-{}-{}", worker, i)))
                    .count()
            })
        })
        .collect();

    let acquired: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(acquired, 4);

    let db = Arc::new(CoordinationDb::open(&path).unwrap());
    let slots = SearchSlotRegistry::new(db, 4, 300.0);
    assert_eq!(slots.list_active().len(), 4);
}

#[test]
fn test_concurrent_enqueues_drain_disjoint_full_batches() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("coordination.db");

    // 200 single-ID enqueues from eight producers. Every drain a
    // producer wins must be a full batch, and no ID may be handed out
    // twice.
    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let path = path.clone();
            thread::spawn(move || {
                let db = Arc::new(CoordinationDb::open(&path).unwrap());
                let queue = PendingArtistQueue::new(db, 10);
                let mut batches = Vec::new();
                for i in 0..25 {
                    let batch = queue.enqueue(&[format!("id-{}-{}", worker, i)]);
                    if !batch.is_empty() {
                        batches.push(batch);
                    }
                }
                batches
            })
        })
        .collect();

    let batches: Vec<Vec<String>> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    assert!(batches.iter().all(|b| b.len() == 10));

    let mut drained = std::collections::HashSet::new();
    for id in batches.iter().flatten() {
        assert!(drained.insert(id.clone()), "id {} drained twice", id);
    }

    let db = Arc::new(CoordinationDb::open(&path).unwrap());
    let queue = PendingArtistQueue::new(db, 10);
    assert_eq!(drained.len() + queue.count(), 200);
}

#[test]
fn test_crashed_worker_lease_recovered_on_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("coordination.db");

    {
        let db = Arc::new(CoordinationDb::open(&path).unwrap());
        let slots = SearchSlotRegistry::new(Arc::clone(&db), 1, 300.0);
        assert!(slots.acquire("abandoned"));
    }

    // Worker dies without releasing; backdate the lease as if the
    // timeout elapsed.
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute("UPDATE slot_leases SET acquired_at = acquired_at - 600", [])
            .unwrap();
    }

    // A fresh process sweeps the stale lease during construction.
    let db = Arc::new(CoordinationDb::open(&path).unwrap());
    let slots = SearchSlotRegistry::new(db, 1, 300.0);
    assert_eq!(slots.count(), 0);
    assert!(slots.acquire("fresh"));
}
