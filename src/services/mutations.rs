//! Create/update/delete coordination.
//!
//! One mutation runs at a time. A mutation moves `Idle -> Pending` and back to
//! `Idle` once the repository call resolves. On success the collection cache
//! is invalidated, a success notification is emitted and the modal is closed,
//! in that order. On failure an error notification is emitted and the modal
//! stays open so the user can retry.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

use super::{
    cache::{CollectionCache, Refetch},
    notifications::Notifications,
};
use crate::{
    error::{AppError, FieldErrors},
    models::{Book, BookDraft},
    repository::BookRepository,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn success_message(&self) -> &'static str {
        match self {
            MutationKind::Create => "Book added successfully",
            MutationKind::Update => "Book updated successfully",
            MutationKind::Delete => "Book deleted successfully",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            MutationKind::Create => "Failed to add book",
            MutationKind::Update => "Failed to update book",
            MutationKind::Delete => "Failed to delete book",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationStatus {
    Idle,
    Pending(MutationKind),
}

/// A single create, update or delete, alive for one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRequest {
    kind: MutationKind,
    record: Book,
}

impl MutationRequest {
    pub fn create(record: Book) -> Self {
        Self {
            kind: MutationKind::Create,
            record,
        }
    }

    pub fn update(record: Book) -> Self {
        Self {
            kind: MutationKind::Update,
            record,
        }
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn record(&self) -> &Book {
        &self.record
    }
}

/// Confirmation step a delete has to pass through before it is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    book: Book,
    id: i64,
}

impl DeleteConfirmation {
    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn prompt(&self) -> String {
        format!(
            "Are you sure you want to delete \"{}\"? (ID: {})",
            self.book.title, self.id
        )
    }

    /// Abandon the delete; nothing is sent
    pub fn cancel(self) {
        tracing::debug!("Delete of id={} cancelled", self.id);
    }
}

pub enum MutationOutcome {
    Succeeded {
        kind: MutationKind,
        /// Persisted record for create and update
        record: Option<Book>,
        /// Collection refetch triggered by the mutation
        refetch: Refetch,
    },
    Failed(AppError),
    /// Rejected locally, nothing was sent
    Invalid(FieldErrors),
    /// Another mutation is still pending
    Busy,
}

impl MutationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, MutationOutcome::Succeeded { .. })
    }
}

impl fmt::Debug for MutationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationOutcome::Succeeded { kind, record, .. } => f
                .debug_struct("Succeeded")
                .field("kind", kind)
                .field("record", record)
                .finish_non_exhaustive(),
            MutationOutcome::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
            MutationOutcome::Invalid(fields) => f.debug_tuple("Invalid").field(fields).finish(),
            MutationOutcome::Busy => f.write_str("Busy"),
        }
    }
}

/// Whatever dialog the mutation was started from
pub trait ModalHandle: Send + Sync {
    fn close(&self);
}

/// For mutations not tied to a dialog
pub struct NoModal;

impl ModalHandle for NoModal {
    fn close(&self) {}
}

#[derive(Clone)]
pub struct MutationCoordinator {
    repository: Arc<dyn BookRepository>,
    cache: CollectionCache,
    notifications: Notifications,
    status: Arc<watch::Sender<MutationStatus>>,
}

/// Puts the coordinator back to `Idle` when the mutation ends or is abandoned
struct PendingGuard<'a> {
    status: &'a watch::Sender<MutationStatus>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.status.send_replace(MutationStatus::Idle);
    }
}

impl MutationCoordinator {
    pub fn new(
        repository: Arc<dyn BookRepository>,
        cache: CollectionCache,
        notifications: Notifications,
    ) -> Self {
        let (status, _) = watch::channel(MutationStatus::Idle);
        Self {
            repository,
            cache,
            notifications,
            status: Arc::new(status),
        }
    }

    /// Coordinator refreshing `cache` on success. The pending status is
    /// shared with `self`, so both still run one mutation at a time.
    pub fn with_cache(&self, cache: CollectionCache) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            cache,
            notifications: self.notifications.clone(),
            status: Arc::clone(&self.status),
        }
    }

    pub fn status(&self) -> MutationStatus {
        *self.status.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<MutationStatus> {
        self.status.subscribe()
    }

    /// Run a create or update
    pub async fn submit(&self, request: MutationRequest, modal: &dyn ModalHandle) -> MutationOutcome {
        self.run(request, modal).await
    }

    /// First step of a delete. A book without id cannot be deleted and
    /// produces an error notification instead of a confirmation.
    pub fn request_delete(&self, book: &Book) -> Option<DeleteConfirmation> {
        match book.id {
            Some(id) => Some(DeleteConfirmation {
                book: book.clone(),
                id,
            }),
            None => {
                tracing::warn!("Delete requested for a book without id: {:?}", book.title);
                self.notifications.error("Cannot delete book: No ID found");
                None
            }
        }
    }

    /// Second step of a delete
    pub async fn confirm_delete(
        &self,
        confirmation: DeleteConfirmation,
        modal: &dyn ModalHandle,
    ) -> MutationOutcome {
        let request = MutationRequest {
            kind: MutationKind::Delete,
            record: confirmation.book,
        };
        self.run(request, modal).await
    }

    async fn run(&self, request: MutationRequest, modal: &dyn ModalHandle) -> MutationOutcome {
        let MutationRequest { kind, record } = request;

        let record = match Self::validate(kind, record) {
            Ok(record) => record,
            Err(fields) => {
                tracing::debug!("{:?} rejected locally: {}", kind, fields);
                return MutationOutcome::Invalid(fields);
            }
        };

        let Some(_pending) = self.begin(kind) else {
            tracing::debug!("{:?} ignored, another mutation is pending", kind);
            return MutationOutcome::Busy;
        };

        let result = match (kind, record.id) {
            (MutationKind::Create, _) => self.repository.create(&record).await.map(Some),
            (MutationKind::Update, Some(id)) => self.repository.update(id, &record).await.map(Some),
            (MutationKind::Delete, Some(id)) => self.repository.delete(id).await.map(|_| None),
            // validate() guarantees an id for update and delete
            (_, None) => Err(AppError::field("id", "Book has no ID")),
        };

        match result {
            Ok(saved) => {
                let refetch = self.cache.invalidate();
                self.notifications.success(kind.success_message());
                modal.close();
                let id = record.id.or(saved.as_ref().and_then(|b| b.id));
                tracing::info!("{:?} of book {:?} succeeded", kind, id);
                MutationOutcome::Succeeded {
                    kind,
                    record: saved,
                    refetch,
                }
            }
            Err(e) => {
                tracing::error!("{:?} of book {:?} failed: {}", kind, record.id, e);
                self.notifications
                    .error(format!("{}: {}", kind.failure_message(), e.reason()));
                MutationOutcome::Failed(e)
            }
        }
    }

    /// Move `Idle -> Pending`, or `None` if a mutation is already pending
    fn begin(&self, kind: MutationKind) -> Option<PendingGuard<'_>> {
        let mut started = false;
        self.status.send_if_modified(|status| {
            if *status == MutationStatus::Idle {
                *status = MutationStatus::Pending(kind);
                started = true;
            }
            started
        });
        started.then(|| PendingGuard {
            status: &self.status,
        })
    }

    /// Trim title and author and check the id rules for `kind`
    fn validate(kind: MutationKind, record: Book) -> Result<Book, FieldErrors> {
        let mut errors = FieldErrors::new();

        match (kind, record.id) {
            (MutationKind::Create, Some(_)) => {
                errors.insert("id", "A new book must not carry an id")
            }
            (MutationKind::Update | MutationKind::Delete, None) => {
                errors.insert("id", "Book has no ID")
            }
            _ => {}
        }

        if kind == MutationKind::Delete {
            return if errors.is_empty() { Ok(record) } else { Err(errors) };
        }

        let draft = BookDraft::from(&record);
        if let Err(fields) = draft.check() {
            for (field, message) in fields.iter() {
                errors.insert(field, message);
            }
        }

        if errors.is_empty() {
            Ok(Book {
                id: record.id,
                title: draft.title,
                author: draft.author,
                created_on: record.created_on,
            })
        } else {
            Err(errors)
        }
    }
}
