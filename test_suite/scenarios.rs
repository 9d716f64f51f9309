//! Scenarios shared by every storage backend
use domain::{
    DomainErrorKind,
    models::{Attachment, AttachmentId, Conference, ConferenceId, primitives::Version},
    repositories::{AttachmentRepository, ConferenceRepository, Storage, commit},
};
use use_case::{AttachmentUseCase, ConferenceUseCase};

use crate::helpers::{conference_with_id, new_conference};

pub const STORED_ID: &str = "11111111-1111-1111-1111-111111111111";
pub const UNKNOWN_ID: &str = "00000000-0000-0000-0000-000000000000";

/// Check that a stored conference can be fetched by its identifier.
pub async fn stored_conference_round_trips<S: Storage>(storage: S) {
    let repository = ConferenceRepository::new(storage);
    let conference = conference_with_id(STORED_ID);

    let mut tx = repository.begin().await.unwrap();
    let stored = repository.store(&mut tx, conference.clone()).await.unwrap();
    commit(repository.storage(), tx).await.unwrap();

    let mut tx = repository.begin().await.unwrap();
    let fetched = repository
        .by_id(&mut tx, STORED_ID.parse().unwrap())
        .await
        .unwrap();
    commit(repository.storage(), tx).await.unwrap();

    assert_eq!(stored.id(), conference.id());
    assert_eq!(stored.version(), Version::FIRST);
    assert_eq!(fetched, Some(stored));
}

/// Check that fetching an unknown identifier reports absence.
pub async fn unknown_id_is_absent<S: Storage>(storage: S) {
    let use_case = ConferenceUseCase::new(storage);

    let fetched = use_case.by_id(UNKNOWN_ID.parse().unwrap()).await.unwrap();

    assert_eq!(fetched, None);
}

/// Check that a removed conference is no longer fetched, and that a second removal is not found.
pub async fn removed_conference_is_absent<S: Storage>(storage: S) {
    let use_case = ConferenceUseCase::new(storage);
    let conference = use_case.create(new_conference("Devoxx")).await.unwrap();

    use_case.delete(conference.id()).await.unwrap();
    let fetched = use_case.by_id(conference.id()).await.unwrap();
    let err = use_case.delete(conference.id()).await.unwrap_err();

    assert_eq!(fetched, None);
    assert!(err.is(DomainErrorKind::NotFound), "{}", err);
}

/// Check that the aggregate kind is part of the lookup key.
pub async fn kind_is_part_of_the_lookup_key<S: Storage + Clone>(storage: S) {
    let conferences = ConferenceUseCase::new(storage.clone());
    let attachments = AttachmentRepository::new(storage);
    let conference = conferences.create(conference_with_id(STORED_ID)).await.unwrap();

    let mut tx = attachments.begin().await.unwrap();
    let fetched = attachments
        .by_id(&mut tx, AttachmentId::from(conference.id().value()))
        .await
        .unwrap();
    commit(attachments.storage(), tx).await.unwrap();

    assert_eq!(fetched, None);
    assert!(conferences.by_id(conference.id()).await.unwrap().is_some());
}

/// Check that updates bump the version and that a stale copy conflicts.
pub async fn stale_update_conflicts<S: Storage>(storage: S) {
    let use_case = ConferenceUseCase::new(storage);
    let created = use_case.create(new_conference("QCon")).await.unwrap();
    let mut rescheduled = created.clone();
    rescheduled
        .reschedule(created.start(), created.end() + time::Duration::days(1))
        .unwrap();

    let updated = use_case.update(rescheduled).await.unwrap();
    let err = use_case.update(created.clone()).await.unwrap_err();
    let fetched = use_case.by_id(created.id()).await.unwrap().unwrap();

    assert_eq!(updated.version(), Version(2));
    assert!(err.is(DomainErrorKind::Conflict), "{}", err);
    assert_eq!(fetched, updated);
}

/// Check that storing the same identifier twice violates a constraint.
pub async fn duplicate_id_violates_constraint<S: Storage>(storage: S) {
    let use_case = ConferenceUseCase::new(storage);
    use_case.create(conference_with_id(STORED_ID)).await.unwrap();

    let err = use_case
        .create(conference_with_id(STORED_ID))
        .await
        .unwrap_err();

    assert!(err.is(DomainErrorKind::Constraint), "{}", err);
}

/// Check that a transaction dropped without commit leaves the storage unchanged.
pub async fn dropped_transaction_is_rolled_back<S: Storage>(storage: S) {
    let repository = ConferenceRepository::new(storage);
    let conference = new_conference("Jfokus");
    {
        let mut tx = repository.begin().await.unwrap();
        repository.store(&mut tx, conference.clone()).await.unwrap();
        let seen = repository.by_id(&mut tx, conference.id()).await.unwrap();
        assert!(seen.is_some(), "the transaction must read its own writes");
    }

    let mut tx = repository.begin().await.unwrap();
    let fetched = repository.by_id(&mut tx, conference.id()).await.unwrap();
    commit(repository.storage(), tx).await.unwrap();

    assert_eq!(fetched, None);
}

/// Check that attachments keep their self-assigned identifier through the storage.
pub async fn attachment_keeps_its_identifier<S: Storage>(storage: S) {
    let use_case = AttachmentUseCase::new(storage);
    let attachment = Attachment::new();
    let id = attachment.id();

    let stored = use_case.create(attachment).await.unwrap();
    let updated = use_case.update(stored.clone()).await.unwrap();
    let fetched = use_case.by_id(id).await.unwrap();

    assert_eq!(stored.id(), id);
    assert_eq!(updated.id(), id);
    assert_eq!(fetched.map(|a| a.id()), Some(id));
}

/// Check that concurrent callers sharing one storage each get their own transaction.
pub async fn concurrent_creates_are_isolated<S>(storage: S)
where
    S: Storage + Clone + 'static,
{
    let mut handles = Vec::new();
    for n in 0..8 {
        let use_case = ConferenceUseCase::new(storage.clone());
        handles.push(tokio::spawn(async move {
            use_case
                .create(new_conference(&format!("Conference {}", n)))
                .await
                .unwrap()
        }));
    }
    let mut ids: Vec<ConferenceId> = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().id());
    }

    let use_case = ConferenceUseCase::new(storage);
    for id in &ids {
        let fetched: Option<Conference> = use_case.by_id(*id).await.unwrap();
        assert!(fetched.is_some(), "{} must be stored", id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}
