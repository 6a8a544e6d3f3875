//! Controller and services wired to the HTTP repository

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tokio::sync::mpsc::UnboundedReceiver;

use library_client::{
    config::AppConfig,
    error::ErrorKind,
    services::{
        mutations::MutationOutcome,
        notifications::{ChannelNotifier, Notification, NotificationLevel},
    },
    ui::{render, LibraryController, Modal},
    AppState,
};

use crate::fake_server::{self, FakeLibrary};

struct Harness {
    state: AppState,
    notifications: UnboundedReceiver<Notification>,
}

impl Harness {
    fn drain(&mut self) -> Vec<Notification> {
        let mut seen = Vec::new();
        while let Ok(notification) = self.notifications.try_recv() {
            seen.push(notification);
        }
        seen
    }
}

async fn connect(base_url: String) -> Harness {
    let mut config = AppConfig::default();
    config.api.base_url = base_url;
    config.api.timeout_secs = 5;

    let (notifier, notifications) = ChannelNotifier::new();
    let state = AppState::connect(config, Arc::new(notifier)).unwrap();
    Harness {
        state,
        notifications,
    }
}

fn classics(library: &FakeLibrary) {
    library.seed("Dune", "Frank Herbert");
    library.seed("1984", "George Orwell");
    library.seed("Animal Farm", "George Orwell");
}

#[tokio::test]
async fn test_search_by_author() {
    let library = FakeLibrary::default();
    classics(&library);
    let harness = connect(fake_server::start(library.clone()).await).await;
    let mut controller = harness.state.controller();

    controller.load().await.unwrap();
    controller.set_query("orwell");

    let snapshot = controller.snapshot();
    let ids: Vec<Option<i64>> = snapshot.visible.iter().map(|b| b.id).collect();
    assert_eq!(ids, vec![Some(2), Some(3)]);
    assert_eq!(snapshot.total, 2);
    assert_eq!(snapshot.library_size, 3);
    assert!(render::render_list(&snapshot).contains("Total Books: 2"));
}

#[tokio::test]
async fn test_fresh_cache_skips_refetch() {
    let library = FakeLibrary::default();
    classics(&library);
    let harness = connect(fake_server::start(library.clone()).await).await;
    let controller = harness.state.controller();

    controller.load().await.unwrap();
    controller.load().await.unwrap();
    assert_eq!(library.list_requests(), 1);

    controller.refresh().await.unwrap();
    assert_eq!(library.list_requests(), 2);
}

#[tokio::test]
async fn test_confirmed_delete_refetches() {
    let library = FakeLibrary::default();
    classics(&library);
    let mut harness = connect(fake_server::start(library.clone()).await).await;
    let controller = harness.state.controller();
    controller.load().await.unwrap();

    assert!(controller.request_delete(2));
    match controller.modal() {
        Modal::ConfirmDelete(confirmation) => {
            assert_eq!(
                confirmation.prompt(),
                "Are you sure you want to delete \"1984\"? (ID: 2)"
            );
        }
        other => panic!("expected a confirmation, got {:?}", other),
    }

    let outcome = controller.confirm_delete().await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(controller.modal(), Modal::Closed);

    controller.settled().await;
    assert_eq!(library.ids(), vec![1, 3]);
    assert_eq!(controller.snapshot().total, 2);
    assert_eq!(library.list_requests(), 2);

    let notifications = harness.drain();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Success);
    assert_eq!(notifications[0].message, "Book deleted successfully");
    assert_eq!(notifications[0].duration, Duration::from_millis(3000));
}

#[tokio::test]
async fn test_add_then_edit() {
    let library = FakeLibrary::default();
    let mut harness = connect(fake_server::start(library.clone()).await).await;
    let controller = harness.state.controller();

    controller.load().await.unwrap();
    assert!(render::render_list(&controller.snapshot()).contains("No books found"));

    controller.open_add_form();
    controller.set_title("The Hobbit");
    controller.set_author("J.R.R. Tolkien");
    assert!(controller.submit_form().await.unwrap().is_success());
    controller.settled().await;
    assert_eq!(controller.snapshot().total, 1);

    assert!(controller.open_edit_form(1));
    controller.set_title("The Hobbit, or There and Back Again");
    assert!(controller.submit_form().await.unwrap().is_success());
    controller.settled().await;
    assert_eq!(
        controller.snapshot().visible[0].title,
        "The Hobbit, or There and Back Again"
    );

    let messages: Vec<String> = harness.drain().into_iter().map(|n| n.message).collect();
    assert_eq!(
        messages,
        vec!["Book added successfully", "Book updated successfully"]
    );
}

#[tokio::test]
async fn test_server_failure_keeps_dialog_open() {
    let library = FakeLibrary::default();
    classics(&library);
    let mut harness = connect(fake_server::start(library.clone()).await).await;
    let controller = harness.state.controller();
    controller.load().await.unwrap();

    controller.open_add_form();
    controller.set_title("Brave New World");
    controller.set_author("Aldous Huxley");
    library.fail_next(StatusCode::INTERNAL_SERVER_ERROR);

    let outcome = controller.submit_form().await.unwrap();
    match outcome {
        MutationOutcome::Failed(err) => assert_eq!(err.kind(), ErrorKind::Server),
        other => panic!("expected a failure, got {:?}", other),
    }
    assert!(matches!(controller.modal(), Modal::Form(ref form) if form.title == "Brave New World"));
    assert_eq!(library.ids(), vec![1, 2, 3]);

    let notifications = harness.drain();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Error);
    assert_eq!(notifications[0].message, "Failed to add book: injected failure");
    assert_eq!(notifications[0].duration, Duration::from_millis(5000));
}

#[tokio::test]
async fn test_unreachable_api() {
    let mut harness = connect(fake_server::unreachable().await).await;
    let controller: LibraryController = harness.state.controller();

    let err = controller.load().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);

    let snapshot = controller.snapshot();
    assert!(!snapshot.loading);
    assert!(snapshot.error.is_some());
    assert_eq!(snapshot.library_size, 0);

    controller.open_add_form();
    controller.set_title("Dune");
    controller.set_author("Frank Herbert");
    let outcome = controller.submit_form().await.unwrap();
    assert!(matches!(outcome, MutationOutcome::Failed(_)));
    assert!(matches!(controller.modal(), Modal::Form(_)));

    let notifications = harness.drain();
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].message.starts_with("Failed to add book: "));
}
