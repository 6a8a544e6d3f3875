//! HTTP repository against the fake API

use axum::http::StatusCode;
use chrono::{Datelike, Timelike};

use library_client::{
    config::ApiConfig,
    error::{AppError, ErrorKind},
    models::Book,
    repository::{BookRepository, HttpBookRepository},
};

use crate::fake_server::{self, FakeLibrary};

async fn repository(library: &FakeLibrary) -> HttpBookRepository {
    let base_url = fake_server::start(library.clone()).await;
    HttpBookRepository::new(&ApiConfig {
        base_url,
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_empty_library_lists_nothing() {
    let library = FakeLibrary::default();
    let repo = repository(&library).await;

    let books = repo.list_all().await.unwrap();
    assert!(books.is_empty());
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_list_keeps_server_order_and_timestamps() {
    let library = FakeLibrary::default();
    library.seed("Dune", "Frank Herbert");
    library.seed("1984", "George Orwell");
    let repo = repository(&library).await;

    let books = repo.list_all().await.unwrap();
    let titles: Vec<&str> = books.iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Dune", "1984"]);

    let created = books[1].created_on.unwrap();
    assert_eq!((created.month(), created.day()), (3, 2));
    assert_eq!(created.hour(), 10);
}

#[tokio::test]
async fn test_get_exists_and_count() {
    let library = FakeLibrary::default();
    let id = library.seed("Dune", "Frank Herbert");
    let repo = repository(&library).await;

    let book = repo.get(id).await.unwrap();
    assert_eq!(book.id, Some(id));
    assert_eq!(book.author, "Frank Herbert");

    assert!(repo.exists(id).await.unwrap());
    assert!(!repo.exists(99).await.unwrap());
    assert_eq!(repo.count().await.unwrap(), 1);

    let err = repo.get(99).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.reason(), "book not found with id: 99");
}

#[tokio::test]
async fn test_create_assigns_id() {
    let library = FakeLibrary::default();
    library.seed("Dune", "Frank Herbert");
    let repo = repository(&library).await;

    let created = repo.create(&Book::new("1984", "George Orwell")).await.unwrap();
    assert_eq!(created.id, Some(2));
    assert!(created.created_on.is_some());
    assert_eq!(library.ids(), vec![1, 2]);
}

#[tokio::test]
async fn test_server_side_validation_is_rejected() {
    let library = FakeLibrary::default();
    let repo = repository(&library).await;

    let err = repo.create(&Book::new("1984", "  ")).await.unwrap_err();
    assert!(matches!(err, AppError::Rejected(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.reason(), "author cannot be empty");
}

#[tokio::test]
async fn test_update_sends_id_as_query() {
    let library = FakeLibrary::default();
    let id = library.seed("Dune", "Herbert");
    let repo = repository(&library).await;

    let mut book = repo.get(id).await.unwrap();
    book.author = "Frank Herbert".to_string();
    let updated = repo.update(id, &book).await.unwrap();
    assert_eq!(updated.author, "Frank Herbert");
    assert_eq!(repo.get(id).await.unwrap().author, "Frank Herbert");

    let err = repo.update(42, &Book::new("Ghost", "Nobody")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_delete_with_no_content() {
    let library = FakeLibrary::default();
    library.seed("Dune", "Frank Herbert");
    let id = library.seed("1984", "George Orwell");
    let repo = repository(&library).await;

    repo.delete(id).await.unwrap();
    assert_eq!(library.ids(), vec![1]);

    let err = repo.delete(id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_server_errors_are_classified() {
    let library = FakeLibrary::default();
    library.seed("Dune", "Frank Herbert");
    let repo = repository(&library).await;

    library.fail_next(StatusCode::INTERNAL_SERVER_ERROR);
    let err = repo.list_all().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(err.reason(), "injected failure");

    library.fail_next(StatusCode::SERVICE_UNAVAILABLE);
    let err = repo.delete(1).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Server);
    assert_eq!(library.ids(), vec![1]);
}

#[tokio::test]
async fn test_unreachable_api_is_network_error() {
    let repo = HttpBookRepository::new(&ApiConfig {
        base_url: fake_server::unreachable().await,
        timeout_secs: 2,
    })
    .unwrap();

    let err = repo.list_all().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Network);
}
