use lens_core::derive::status_histogram;
use lens_core::{
    ArtifactCollection, ArtifactDraft, ArtifactId, ArtifactPatch, BackendError, CollectionKey,
    CollectionOptions, CollectionPhase, LensBackend, LocalBackend, MetaPatch, StoreError,
};
use std::sync::Arc;

fn chores() -> (Arc<LocalBackend>, ArtifactCollection<LocalBackend>) {
    let backend = Arc::new(LocalBackend::in_memory().unwrap());
    let collection = ArtifactCollection::with_options(
        Arc::clone(&backend),
        CollectionKey::new("household", "Chore"),
        CollectionOptions::manual(),
        Vec::new(),
    );
    (backend, collection)
}

#[test]
fn created_rows_show_up_in_the_cache_and_on_refetch() {
    let (backend, chores) = chores();
    chores.refresh().unwrap();

    let created = chores
        .create(
            ArtifactDraft::new("Dishes")
                .with_field("room", "kitchen")
                .with_field("points", 2)
                .with_status("pending"),
        )
        .unwrap();

    let cached = chores.snapshot();
    assert_eq!(cached.phase, CollectionPhase::Ready);
    assert_eq!(cached.items, vec![created.clone()]);
    assert_eq!(cached.pending, 0);

    let remote = backend.list(chores.key()).unwrap();
    assert_eq!(remote, vec![created.clone()]);
    assert_eq!(chores.refresh().unwrap().items, vec![created]);
}

#[test]
fn status_update_keeps_every_other_field() {
    let (_, chores) = chores();
    let created = chores
        .create(
            ArtifactDraft::new("Laundry")
                .with_field("assignee", "Sam")
                .with_tag("weekly")
                .with_status("pending"),
        )
        .unwrap();

    let updated = chores
        .update(&created.id, ArtifactPatch::status("done"))
        .unwrap();

    assert_eq!(updated.status(), Some("done"));
    assert_eq!(updated.title, "Laundry");
    assert_eq!(updated.data_str("assignee"), Some("Sam"));
    assert!(updated.has_tag("weekly"));
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at.is_some());
    assert_eq!(chores.get(&created.id), Some(updated));
}

#[test]
fn padded_statuses_are_stored_in_wire_form() {
    let (_, chores) = chores();
    let created = chores
        .create(ArtifactDraft::new("Sweep").with_status(" pending "))
        .unwrap();
    let updated = chores
        .update(&created.id, ArtifactPatch::status("done "))
        .unwrap();
    assert_eq!(updated.status(), Some("done"));

    let snapshot = chores.refresh().unwrap();
    let histogram = status_histogram(&snapshot.items, &["pending", "done"]);
    assert_eq!(histogram.get("done"), 1);
    assert_eq!(histogram.unrecognized(), 0);

    let mut raw = ArtifactPatch::default();
    raw.meta = Some(MetaPatch {
        status: Some(" done ".to_string()),
        tags: None,
    });
    assert!(matches!(
        chores.update(&created.id, raw),
        Err(StoreError::Validation(_))
    ));
}

#[test]
fn data_patch_merges_field_by_field() {
    let (_, chores) = chores();
    let created = chores
        .create(
            ArtifactDraft::new("Mow lawn")
                .with_field("room", "garden")
                .with_field("points", 3),
        )
        .unwrap();

    let updated = chores
        .update(&created.id, ArtifactPatch::default().with_field("points", 5))
        .unwrap();

    assert_eq!(updated.data_f64("points"), Some(5.0));
    assert_eq!(updated.data_str("room"), Some("garden"));
}

#[test]
fn removing_twice_is_not_an_error() {
    let (backend, chores) = chores();
    let created = chores.create(ArtifactDraft::new("Dust shelves")).unwrap();

    chores.remove(&created.id).unwrap();
    chores.remove(&created.id).unwrap();

    assert!(chores.snapshot().items.is_empty());
    assert!(backend.list(chores.key()).unwrap().is_empty());
}

#[test]
fn updating_a_missing_row_reports_not_found() {
    let (_, chores) = chores();
    let missing = ArtifactId::new("nope");

    let err = chores
        .update(&missing, ArtifactPatch::title("Renamed"))
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(ref id) if id == &missing));
}

#[test]
fn rejected_drafts_never_reach_the_backend() {
    let (backend, chores) = chores();

    assert!(matches!(
        chores.create(ArtifactDraft::new("  ")),
        Err(StoreError::Validation(_))
    ));
    assert!(matches!(
        chores.create(ArtifactDraft::new("Sweep").with_status("vanished")),
        Err(StoreError::Validation(_))
    ));
    assert!(backend.list(chores.key()).unwrap().is_empty());
}

#[test]
fn collections_are_isolated_per_type() {
    let backend = Arc::new(LocalBackend::in_memory().unwrap());
    let chores = ArtifactCollection::with_options(
        Arc::clone(&backend),
        CollectionKey::new("household", "Chore"),
        CollectionOptions::manual(),
        Vec::new(),
    );
    let bills = ArtifactCollection::with_options(
        Arc::clone(&backend),
        CollectionKey::new("household", "Bill"),
        CollectionOptions::manual(),
        Vec::new(),
    );

    let chore = chores.create(ArtifactDraft::new("Vacuum")).unwrap();
    bills.create(ArtifactDraft::new("Water")).unwrap();

    assert_eq!(chores.refresh().unwrap().items.len(), 1);
    assert_eq!(bills.refresh().unwrap().items.len(), 1);
    assert!(matches!(
        backend.remove(bills.key(), &chore.id),
        Err(BackendError::NotFound(_))
    ));
}
