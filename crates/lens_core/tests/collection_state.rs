use lens_core::{
    ArtifactCollection, ArtifactDraft, CollectionKey, CollectionOptions, CollectionPhase,
    CollectionSnapshot, LensBackend, LocalBackend,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const WAIT_LIMIT: Duration = Duration::from_secs(5);

fn wait_for(
    collection: &ArtifactCollection<LocalBackend>,
    done: impl Fn(&CollectionSnapshot) -> bool,
) -> CollectionSnapshot {
    let started_at = Instant::now();
    loop {
        let snapshot = collection.snapshot();
        if done(&snapshot) {
            return snapshot;
        }
        assert!(started_at.elapsed() < WAIT_LIMIT, "timed out: {snapshot:?}");
        thread::sleep(Duration::from_millis(5));
    }
}

fn bills_key() -> CollectionKey {
    CollectionKey::new("household", "Bill")
}

#[test]
fn list_returns_immediately_and_loads_in_the_background() {
    let backend = Arc::new(LocalBackend::in_memory().unwrap());
    backend
        .create(&bills_key(), &ArtifactDraft::new("Internet"))
        .unwrap();
    let bills = ArtifactCollection::new(Arc::clone(&backend), bills_key());

    let first = bills.list();
    assert!(first.items.is_empty());
    assert_ne!(first.phase, CollectionPhase::Ready);

    let loaded = wait_for(&bills, |snapshot| snapshot.is_ready() && !snapshot.refreshing);
    assert_eq!(loaded.items.len(), 1);
    assert_eq!(bills.list().items, loaded.items);
}

#[test]
fn manual_collections_stay_unloaded_until_refreshed() {
    let backend = Arc::new(LocalBackend::in_memory().unwrap());
    let bills = ArtifactCollection::with_options(
        backend,
        bills_key(),
        CollectionOptions::manual(),
        Vec::new(),
    );

    assert_eq!(bills.list().phase, CollectionPhase::Unloaded);
    assert_eq!(bills.list().revision, 0);
    assert_eq!(bills.refresh().unwrap().phase, CollectionPhase::Ready);
}

#[test]
fn refresher_picks_up_rows_written_elsewhere() {
    let backend = Arc::new(LocalBackend::in_memory().unwrap());
    let bills = ArtifactCollection::with_options(
        Arc::clone(&backend),
        bills_key(),
        CollectionOptions::manual(),
        Vec::new(),
    );
    bills.refresh().unwrap();

    let handle = bills.spawn_refresher(Duration::from_millis(20)).unwrap();
    backend
        .create(&bills_key(), &ArtifactDraft::new("Gas"))
        .unwrap();

    let snapshot = wait_for(&bills, |snapshot| snapshot.items.len() == 1);
    assert_eq!(snapshot.items[0].title, "Gas");
    handle.stop();

    let revision = bills.snapshot().revision;
    thread::sleep(Duration::from_millis(80));
    assert_eq!(bills.snapshot().revision, revision);
}

#[test]
fn clones_share_one_cache() {
    let backend = Arc::new(LocalBackend::in_memory().unwrap());
    let bills = ArtifactCollection::with_options(
        backend,
        bills_key(),
        CollectionOptions::manual(),
        Vec::new(),
    );
    let other = bills.clone();

    let created = bills.create(ArtifactDraft::new("Rent")).unwrap();
    assert_eq!(other.get(&created.id), Some(created));
    assert!(Arc::ptr_eq(bills.backend(), other.backend()));
}

#[test]
fn concurrent_creates_are_all_cached() {
    let backend = Arc::new(LocalBackend::in_memory().unwrap());
    let bills = ArtifactCollection::with_options(
        Arc::clone(&backend),
        bills_key(),
        CollectionOptions::manual(),
        Vec::new(),
    );

    let workers: Vec<_> = (0..4)
        .map(|index| {
            let bills = bills.clone();
            thread::spawn(move || bills.create(ArtifactDraft::new(format!("Bill {index}"))))
        })
        .collect();
    for worker in workers {
        worker.join().unwrap().unwrap();
    }

    let snapshot = bills.snapshot();
    assert_eq!(snapshot.items.len(), 4);
    assert_eq!(snapshot.pending, 0);
    assert_eq!(backend.list(&bills_key()).unwrap().len(), 4);
}
