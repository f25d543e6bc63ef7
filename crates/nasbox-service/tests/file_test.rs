//! Integration tests for file operations against a real directory tree.

mod helpers;

use std::collections::BTreeSet;

use nasbox_core::error::ErrorKind;
use nasbox_database::store::MetadataStore;
use nasbox_entity::metadata::ItemKind;

use helpers::{MAX_UPLOAD, TestApp, read_all};

const SEGMENTS: &[&str] = &["..", ".", "a", "b", "", "..\\..", "%2e%2e", "etc", "~"];

fn random_path() -> String {
    let len = 1 + rand::random::<u32>() as usize % 6;
    let mut parts = Vec::with_capacity(len);
    for _ in 0..len {
        parts.push(SEGMENTS[rand::random::<u32>() as usize % SEGMENTS.len()]);
    }
    let joined = parts.join("/");
    if rand::random::<bool>() {
        format!("/{joined}")
    } else {
        joined
    }
}

#[tokio::test]
async fn test_resolved_paths_never_leave_owner_root() {
    let app = TestApp::new().await;
    let ctx = app.user();
    let root = app.resolver.owner_root(ctx.user_id);

    for _ in 0..500 {
        let raw = random_path();
        match app.resolver.resolve(ctx.user_id, &raw) {
            Ok(resolved) => assert!(
                resolved.absolute.starts_with(&root),
                "{raw} resolved to {}",
                resolved.absolute.display()
            ),
            Err(err) => assert!(err.is(ErrorKind::InvalidPath), "{raw}: {err}"),
        }
    }
}

#[tokio::test]
async fn test_traversal_is_rejected_by_every_operation() {
    let app = TestApp::new().await;
    let ctx = app.user();
    app.put(&ctx, "", "a.txt", b"a").await;

    let err = app.files.list(&ctx, "../").await.unwrap_err();
    assert!(err.is(ErrorKind::InvalidPath));
    let err = app.files.download(&ctx, "../../etc/passwd").await.unwrap_err();
    assert!(err.is(ErrorKind::InvalidPath));
    let err = app
        .files
        .move_item(&ctx, "a.txt", "..", ItemKind::File)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::InvalidPath));
    let err = app
        .files
        .rename(&ctx, "a.txt", "../escape.txt", ItemKind::File)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::InvalidPath) || err.is(ErrorKind::Validation));
    assert!(!app.dir.path().join("escape.txt").exists());
}

#[tokio::test]
async fn test_listing_covers_every_physical_entry() {
    let app = TestApp::new().await;
    let ctx = app.user();
    app.put(&ctx, "", "tracked.txt", b"hello").await;
    app.files.create_folder(&ctx, "", "docs").await.unwrap();

    // Entries created behind the service's back still show up.
    let root = app.resolver.owner_root(ctx.user_id);
    std::fs::write(root.join("untracked.bin"), vec![0u8; 42]).unwrap();
    std::fs::create_dir(root.join("loose")).unwrap();

    let entries = app.files.list(&ctx, "").await.unwrap();
    let names: BTreeSet<_> = entries.iter().map(|e| e.name.as_str()).collect();
    let on_disk: BTreeSet<String> = std::fs::read_dir(&root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        on_disk.iter().map(String::as_str).collect::<BTreeSet<_>>()
    );

    let untracked = entries.iter().find(|e| e.name == "untracked.bin").unwrap();
    assert!(!untracked.has_metadata);
    assert_eq!(untracked.kind, ItemKind::File);
    assert_eq!(untracked.size, 42);

    let tracked = entries.iter().find(|e| e.name == "tracked.txt").unwrap();
    assert!(tracked.has_metadata);
    assert_eq!(tracked.size, 5);
}

#[tokio::test]
async fn test_upload_download_round_trip() {
    let app = TestApp::new().await;
    let ctx = app.user();

    let big: Vec<u8> = (0..3 * 1024 * 1024).map(|i| (i % 251) as u8).collect();
    assert!((big.len() as u64) < MAX_UPLOAD);

    for (name, data) in [
        ("empty.bin", Vec::new()),
        ("one.bin", vec![7u8]),
        ("big.bin", big),
    ] {
        let record = app
            .files
            .upload(&ctx, "data", name, None, data.clone().into())
            .await
            .unwrap();
        assert_eq!(record.size_bytes, data.len() as i64);

        let content = app.files.download(&ctx, &record.path).await.unwrap();
        assert_eq!(content.size, data.len() as u64);
        assert_eq!(read_all(content).await, data);
    }
}

#[tokio::test]
async fn test_oversized_upload_leaves_nothing_behind() {
    let app = TestApp::new().await;
    let ctx = app.user();

    let data = vec![1u8; MAX_UPLOAD as usize + 1];
    let err = app
        .files
        .upload(&ctx, "", "huge.bin", None, data.into())
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::PayloadTooLarge));
    assert!(app.metadata.find_file(ctx.user_id, "huge.bin").await.unwrap().is_none());
    assert!(!app.resolver.owner_root(ctx.user_id).join("huge.bin").exists());
}

#[tokio::test]
async fn test_deleted_items_are_gone_everywhere() {
    let app = TestApp::new().await;
    let ctx = app.user();
    app.put(&ctx, "photos/2024", "a.jpg", b"jpeg").await;
    app.put(&ctx, "", "note.txt", b"note").await;

    app.files.delete(&ctx, "note.txt", ItemKind::File).await.unwrap();
    let err = app.files.download(&ctx, "note.txt").await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
    assert!(app.metadata.find_by_path(ctx.user_id, "note.txt").await.unwrap().is_none());

    app.files.delete(&ctx, "photos", ItemKind::Folder).await.unwrap();
    let names: Vec<_> = app
        .files
        .list(&ctx, "")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert!(names.is_empty(), "{names:?}");
    assert!(app.metadata.list_subtree(ctx.user_id, "photos").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_owners_cannot_see_each_other() {
    let app = TestApp::new().await;
    let alice = app.user();
    let bob = app.user();
    app.put(&alice, "", "secret.txt", b"alice").await;
    app.put(&bob, "", "secret.txt", b"bob").await;

    let content = app.files.download(&bob, "secret.txt").await.unwrap();
    assert_eq!(read_all(content).await, b"bob");

    app.files.delete(&bob, "secret.txt", ItemKind::File).await.unwrap();
    let content = app.files.download(&alice, "secret.txt").await.unwrap();
    assert_eq!(read_all(content).await, b"alice");

    assert!(app.files.list(&bob, "").await.unwrap().is_empty());
    let alice_id = alice.user_id.to_string();
    let err = app
        .files
        .download(&bob, &format!("../{alice_id}/secret.txt"))
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::InvalidPath));
}

#[tokio::test]
async fn test_file_rename_moves_content_and_record() {
    let app = TestApp::new().await;
    let ctx = app.user();
    app.put(&ctx, "docs", "a.txt", b"first draft").await;
    let before = app
        .metadata
        .find_file(ctx.user_id, "docs/a.txt")
        .await
        .unwrap()
        .unwrap();

    let renamed = app
        .files
        .rename(&ctx, "docs/a.txt", "b.txt", ItemKind::File)
        .await
        .unwrap();
    assert_eq!(renamed.path(), "docs/b.txt");

    let names: BTreeSet<_> = app
        .files
        .list(&ctx, "docs")
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, BTreeSet::from(["b.txt".to_string()]));

    let content = app.files.download(&ctx, "docs/b.txt").await.unwrap();
    assert_eq!(read_all(content).await, b"first draft");
    let err = app.files.download(&ctx, "docs/a.txt").await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));

    let after = app
        .metadata
        .find_file(ctx.user_id, "docs/b.txt")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.id, before.id);
    assert_eq!(after.filename, "b.txt");
    assert!(app.metadata.find_by_path(ctx.user_id, "docs/a.txt").await.unwrap().is_none());
}

#[tokio::test]
async fn test_folder_rename_keeps_metadata_consistent() {
    let app = TestApp::new().await;
    let ctx = app.user();
    app.put(&ctx, "projects/alpha", "plan.md", b"# plan").await;
    app.put(&ctx, "projects/alpha/assets", "logo.png", b"png").await;
    let before = app
        .metadata
        .find_file(ctx.user_id, "projects/alpha/plan.md")
        .await
        .unwrap()
        .unwrap();

    app.files
        .rename(&ctx, "projects/alpha", "beta", ItemKind::Folder)
        .await
        .unwrap();

    let records = app.metadata.list_subtree(ctx.user_id, "").await.unwrap();
    assert!(records.iter().all(|r| !r.path().contains("alpha")));
    for record in &records {
        let absolute = app.resolver.resolve(ctx.user_id, record.path()).unwrap().absolute;
        assert!(absolute.exists(), "dangling record {}", record.path());
    }

    let after = app
        .metadata
        .find_file(ctx.user_id, "projects/beta/plan.md")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.id, before.id);
    assert!(
        app.metadata
            .find_file(ctx.user_id, "projects/beta/assets/logo.png")
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_reconcile_after_external_changes() {
    let app = TestApp::new().await;
    let ctx = app.user();
    app.put(&ctx, "", "kept.txt", b"kept").await;
    app.put(&ctx, "", "removed.txt", b"gone").await;

    let root = app.resolver.owner_root(ctx.user_id);
    std::fs::remove_file(root.join("removed.txt")).unwrap();
    std::fs::write(root.join("added.txt"), b"new").unwrap();

    let report = app.storage.reconcile(&ctx, ctx.user_id).await.unwrap();
    assert_eq!(report.created, 1);
    assert_eq!(report.removed, 1);

    let entries = app.files.list(&ctx, "").await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.has_metadata));
}
