//! Services wired from in-memory backends, exercised end to end.

use std::sync::{Arc, Mutex};

use vitrine_core::models::{
    FederatedProvider, LocalFile, MetadataPatch, PostForm, ProfileForm, UploadPhase, UploadProgress,
};
use vitrine_core::{AppError, Config, ErrorKind};
use vitrine_services::{
    Backends, MemoryDocumentStore, MemoryIdentityProvider, MemoryStorage, Services,
};

struct Harness {
    storage: MemoryStorage,
    documents: MemoryDocumentStore,
    identity: MemoryIdentityProvider,
    services: Services,
}

fn harness() -> Harness {
    let storage = MemoryStorage::new().with_chunk_size(512 * 1024);
    let documents = MemoryDocumentStore::new();
    let identity = MemoryIdentityProvider::new().with_fast_hashing();
    let backends = Backends {
        storage: Arc::new(storage.clone()),
        documents: Arc::new(documents.clone()),
        identity: Arc::new(identity.clone()),
    };
    let services = Services::from_backends(backends, &Config::default());
    Harness {
        storage,
        documents,
        identity,
        services,
    }
}

fn jpeg(name: &str, size: usize) -> LocalFile {
    LocalFile::new(name, "image/jpeg", vec![0xFFu8; size])
}

#[tokio::test]
async fn test_two_megabyte_jpeg_end_to_end() {
    let h = harness();
    let user = h
        .services
        .auth
        .sign_up_with_email("ana@example.com", "secret1")
        .await
        .unwrap();

    let seen = Mutex::new(Vec::new());
    let sink = |p: UploadProgress| seen.lock().unwrap().push(p);
    let record = h
        .services
        .uploads
        .upload(
            &jpeg("holiday.jpg", 2 * 1024 * 1024),
            &user.uid,
            &h.services.upload_policy,
            &sink,
        )
        .await
        .unwrap();

    assert!(!record.stored_name.is_empty());
    assert!(!record.location_uri.is_empty());
    assert!(record.storage_key.starts_with("photos/"));
    assert_eq!(record.metadata, Default::default());

    let seen = seen.into_inner().unwrap();
    assert!(seen
        .windows(2)
        .all(|w| w[0].bytes_transferred <= w[1].bytes_transferred));
    let last = seen.last().unwrap();
    assert_eq!(last.phase, UploadPhase::Success);
    assert_eq!(last.bytes_transferred, 2 * 1024 * 1024);
    assert_eq!(last.percentage, 100.0);
}

#[tokio::test]
async fn test_batch_edit_and_delete() {
    let h = harness();
    let policy = h.services.upload_policy.clone();
    h.storage.fail_uploads_matching("_b.jpg").await;

    let outcomes = h
        .services
        .uploads
        .upload_many(
            &[jpeg("a.jpg", 10), jpeg("b.jpg", 10), jpeg("c.jpg", 10)],
            "owner-1",
            &policy,
            &|_| {},
        )
        .await
        .unwrap();
    let flags: Vec<_> = outcomes.iter().map(|o| o.is_success()).collect();
    assert_eq!(flags, vec![true, false, true]);
    assert_eq!(
        outcomes[1].error().map(AppError::kind),
        Some(ErrorKind::Transport)
    );

    let listed = h.services.uploads.list_by_owner("owner-1").await;
    let names: Vec<_> = listed.iter().map(|r| r.original_name.as_str()).collect();
    assert_eq!(names, vec!["c.jpg", "a.jpg"]);

    let a = outcomes[0].record().unwrap().clone();
    h.services
        .uploads
        .update_metadata(&a.id, &MetadataPatch::alt_text("y"))
        .await
        .unwrap();
    h.services
        .uploads
        .update_metadata(&a.id, &MetadataPatch::caption("x"))
        .await
        .unwrap();
    let edited = h.services.uploads.get(&a.id).await.unwrap().unwrap();
    assert_eq!(edited.metadata.alt_text.as_deref(), Some("y"));
    assert_eq!(edited.metadata.caption.as_deref(), Some("x"));

    h.storage.set_fail_deletes(true);
    let err = h
        .services
        .uploads
        .remove(&a.id, &a.storage_key)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DeleteFailed(_)));
    assert_eq!(h.services.uploads.list_by_owner("owner-1").await.len(), 2);

    h.storage.set_fail_deletes(false);
    h.services
        .uploads
        .remove(&a.id, &a.storage_key)
        .await
        .unwrap();
    assert_eq!(h.services.uploads.list_by_owner("owner-1").await.len(), 1);
    assert_eq!(h.storage.blob_count().await, 1);
}

#[tokio::test]
async fn test_profile_and_posts_for_signed_in_user() {
    let h = harness();
    h.identity
        .register_federated_identity(
            FederatedProvider::Google,
            "gina@example.com",
            Some("Gina".to_string()),
        )
        .await;
    let user = h
        .services
        .auth
        .sign_in_with_provider(FederatedProvider::Google)
        .await
        .unwrap();

    let profile = h
        .services
        .profiles
        .create_or_update(
            &user.uid,
            user.email.as_deref().unwrap_or_default(),
            user.display_name.as_deref().unwrap_or("User"),
            Some(&ProfileForm::new("1 Main St", "1990-06-15")),
        )
        .await
        .unwrap();
    assert_eq!(profile.display_name, "Gina");
    assert!(profile.age.is_some());

    let post = h
        .services
        .posts
        .create_post(&user.uid, user.email.as_deref(), &PostForm::new("Hi", "First"))
        .await
        .unwrap();
    assert_eq!(h.services.posts.list_by_author(&user.uid).await, vec![post]);
    assert_eq!(h.documents.count("users").await, 1);
}

#[tokio::test]
async fn test_upload_and_remove_on_local_disk() {
    let dir = tempfile::tempdir().unwrap();
    let storage = vitrine_storage::LocalStorage::new(
        dir.path().to_path_buf(),
        "http://localhost:8080/files".to_string(),
    )
    .await
    .unwrap()
    .with_chunk_size(8);
    let documents = MemoryDocumentStore::new();
    let uploads = vitrine_services::PhotoUploadService::new(
        Arc::new(storage),
        Arc::new(documents.clone()),
    );

    let record = uploads
        .upload(
            &jpeg("My Holiday (1).JPG", 20),
            "uid42",
            &Default::default(),
            &|_| {},
        )
        .await
        .unwrap();

    assert!(record.stored_name.starts_with("uid42_"));
    assert!(record.stored_name.ends_with("_My_Holiday__1_.JPG"));
    assert_eq!(
        record.location_uri,
        format!("http://localhost:8080/files/{}", record.storage_key)
    );
    let on_disk = dir.path().join(&record.storage_key);
    assert_eq!(std::fs::read(&on_disk).unwrap().len(), 20);

    uploads.remove(&record.id, &record.storage_key).await.unwrap();
    assert!(!on_disk.exists());
    assert_eq!(documents.count("photoUploads").await, 0);
}
