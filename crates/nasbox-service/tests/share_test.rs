//! Integration tests for the share lifecycle.

mod helpers;

use chrono::{Duration, Utc};

use nasbox_core::error::ErrorKind;
use nasbox_entity::metadata::ItemKind;
use nasbox_entity::share::ShareState;
use nasbox_service::share::{CreateShareRequest, SharedContent};

use helpers::{TestApp, read_all};

fn file_share(path: &str) -> CreateShareRequest {
    CreateShareRequest {
        path: path.to_string(),
        kind: ItemKind::File,
        is_public: true,
        password: None,
        expires_at: None,
    }
}

#[tokio::test]
async fn test_share_lifecycle() {
    let app = TestApp::new().await;
    let ctx = app.user();
    app.put(&ctx, "", "report.pdf", b"%PDF").await;

    let share = app.shares.create(&ctx, file_share("report.pdf")).await.unwrap();
    assert_eq!(share.access_count, 0);

    for expected in 1..=2 {
        let resolved = app.shares.resolve(&share.token, None).await.unwrap();
        assert_eq!(resolved.share.access_count, expected);
        match resolved.content {
            SharedContent::File { content, .. } => {
                assert_eq!(read_all(content).await, b"%PDF");
            }
            SharedContent::Folder { .. } => panic!("expected a file"),
        }
    }

    let listed = app.shares.list(&ctx).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].share.access_count, 2);
    assert_eq!(listed[0].state, ShareState::Active);

    app.shares.revoke(&ctx, &share.token).await.unwrap();
    let err = app.shares.resolve(&share.token, None).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_failed_resolutions_do_not_count() {
    let app = TestApp::new().await;
    let ctx = app.user();
    app.put(&ctx, "", "locked.txt", b"secret").await;

    let mut req = file_share("locked.txt");
    req.password = Some("hunter22".to_string());
    let share = app.shares.create(&ctx, req).await.unwrap();

    let err = app.shares.resolve(&share.token, None).await.unwrap_err();
    assert!(err.is(ErrorKind::PasswordRequired));
    let err = app.shares.resolve(&share.token, Some("nope")).await.unwrap_err();
    assert!(err.is(ErrorKind::PasswordInvalid));

    let resolved = app
        .shares
        .resolve(&share.token, Some("hunter22"))
        .await
        .unwrap();
    assert_eq!(resolved.share.access_count, 1);
}

#[tokio::test]
async fn test_expired_share_is_rejected() {
    let app = TestApp::new().await;
    let ctx = app.user();
    app.put(&ctx, "", "old.txt", b"old").await;

    let mut req = file_share("old.txt");
    req.expires_at = Some(Utc::now() - Duration::minutes(1));
    let share = app.shares.create(&ctx, req).await.unwrap();

    let err = app.shares.resolve(&share.token, None).await.unwrap_err();
    assert!(err.is(ErrorKind::Expired));
    assert_eq!(app.shares.list(&ctx).await.unwrap()[0].state, ShareState::Expired);
}

#[tokio::test]
async fn test_share_follows_renamed_target() {
    let app = TestApp::new().await;
    let ctx = app.user();
    app.put(&ctx, "albums/summer", "beach.jpg", b"jpeg").await;

    let share = app
        .shares
        .create(
            &ctx,
            CreateShareRequest {
                kind: ItemKind::Folder,
                ..file_share("albums/summer")
            },
        )
        .await
        .unwrap();

    app.files
        .rename(&ctx, "albums/summer", "holiday", ItemKind::Folder)
        .await
        .unwrap();

    let resolved = app.shares.resolve(&share.token, None).await.unwrap();
    match resolved.content {
        SharedContent::Folder { record, entries } => {
            assert_eq!(record.path, "albums/holiday");
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].name, "beach.jpg");
        }
        SharedContent::File { .. } => panic!("expected a folder"),
    }
}

#[tokio::test]
async fn test_other_users_cannot_revoke() {
    let app = TestApp::new().await;
    let owner = app.user();
    let other = app.user();
    app.put(&owner, "", "mine.txt", b"mine").await;
    let share = app.shares.create(&owner, file_share("mine.txt")).await.unwrap();

    let err = app.shares.revoke(&other, &share.token).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
    assert!(app.shares.resolve(&share.token, None).await.is_ok());

    let err = app.shares.create(&other, file_share("mine.txt")).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}
