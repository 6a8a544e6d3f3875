//! Front-end facing controller: list state, dialogs and user commands.
//!
//! The controller owns what the user is looking at (search query, page,
//! open dialog) and forwards commands to the services. Rendering reads a
//! [`ViewSnapshot`], which is derived from the cache on every call.

pub mod render;

use std::sync::{Mutex, MutexGuard};

use tokio::sync::watch;

use crate::{
    config::ViewConfig,
    error::{AppResult, FieldErrors},
    models::Book,
    services::{
        cache::CacheState,
        mutations::{DeleteConfirmation, ModalHandle, MutationOutcome, MutationRequest, MutationStatus},
        Services,
    },
    view::ViewState,
};

/// Add/edit dialog contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookForm {
    /// Book being edited; `None` when adding
    pub editing: Option<Book>,
    pub title: String,
    pub author: String,
    pub errors: FieldErrors,
}

impl BookForm {
    pub fn add() -> Self {
        Self::default()
    }

    pub fn edit(book: &Book) -> Self {
        Self {
            editing: Some(book.clone()),
            title: book.title.clone(),
            author: book.author.clone(),
            errors: FieldErrors::new(),
        }
    }

    pub fn heading(&self) -> &'static str {
        if self.editing.is_some() {
            "Edit Book"
        } else {
            "Add New Book"
        }
    }

    fn request(&self) -> MutationRequest {
        match &self.editing {
            Some(book) if book.is_persisted() => MutationRequest::update(Book {
                id: book.id,
                title: self.title.clone(),
                author: self.author.clone(),
                created_on: book.created_on,
            }),
            _ => MutationRequest::create(Book::new(self.title.clone(), self.author.clone())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Modal {
    #[default]
    Closed,
    Form(BookForm),
    ConfirmDelete(DeleteConfirmation),
}

#[derive(Default)]
struct OpenModal {
    modal: Modal,
    /// Changes every time a dialog is opened or dismissed
    token: u64,
}

/// Currently open dialog
#[derive(Default)]
pub struct ModalSlot {
    current: Mutex<OpenModal>,
}

impl ModalSlot {
    fn lock(&self) -> MutexGuard<'_, OpenModal> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self) -> Modal {
        self.lock().modal.clone()
    }

    /// Open `modal` in place of the current one and return its token
    fn set(&self, modal: Modal) -> u64 {
        let mut open = self.lock();
        open.token += 1;
        open.modal = modal;
        open.token
    }

    fn take(&self) -> Modal {
        let mut open = self.lock();
        open.token += 1;
        std::mem::take(&mut open.modal)
    }

    fn current(&self) -> (u64, Modal) {
        let open = self.lock();
        (open.token, open.modal.clone())
    }

    /// Edit the open form, if the slot still holds the dialog `token` names
    fn with_form_at(&self, token: Option<u64>, f: impl FnOnce(&mut BookForm)) -> bool {
        let mut open = self.lock();
        if token.is_some_and(|token| token != open.token) {
            return false;
        }
        match &mut open.modal {
            Modal::Form(form) => {
                f(form);
                true
            }
            _ => false,
        }
    }

    fn with_form(&self, f: impl FnOnce(&mut BookForm)) -> bool {
        self.with_form_at(None, f)
    }

    /// Handle that closes only the dialog opened under `token`
    fn handle(&self, token: u64) -> ModalTicket<'_> {
        ModalTicket { slot: self, token }
    }
}

/// One opened dialog, as seen by the mutation it started
struct ModalTicket<'a> {
    slot: &'a ModalSlot,
    token: u64,
}

impl ModalHandle for ModalTicket<'_> {
    fn close(&self) {
        let mut open = self.slot.lock();
        if open.token == self.token {
            open.token += 1;
            open.modal = Modal::Closed;
        } else {
            tracing::debug!("Dialog already replaced, leaving it open");
        }
    }
}

/// Everything needed to draw the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub visible: Vec<Book>,
    /// Books matching the query
    pub total: usize,
    /// Books in the whole collection
    pub library_size: usize,
    pub query: String,
    pub page: usize,
    pub page_size: usize,
    pub page_count: usize,
    pub loading: bool,
    pub error: Option<String>,
    pub mutation: MutationStatus,
}

pub struct LibraryController {
    services: Services,
    view_config: ViewConfig,
    view: ViewState,
    modal: ModalSlot,
}

impl LibraryController {
    pub fn new(services: Services, view_config: ViewConfig) -> Self {
        let view = ViewState::new(view_config.page_size);
        Self {
            services,
            view_config,
            view,
            modal: ModalSlot::default(),
        }
    }

    /// Load the collection unless the cached one is still fresh
    pub async fn load(&self) -> AppResult<()> {
        self.services.cache.ensure_fresh().await
    }

    /// Refetch regardless of freshness
    pub async fn refresh(&self) -> AppResult<()> {
        self.services.cache.invalidate().await
    }

    /// Wait until no refetch is in flight
    pub async fn settled(&self) {
        self.services.cache.settled().await
    }

    pub fn subscribe(&self) -> watch::Receiver<CacheState> {
        self.services.cache.subscribe()
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view
    }

    pub fn page_size_options(&self) -> &[usize] {
        &self.view_config.page_size_options
    }

    pub fn set_query(&mut self, query: &str) {
        self.view.set_query(query);
    }

    pub fn set_page(&mut self, page: usize) {
        self.view.set_page(page);
    }

    /// Only sizes offered by the configuration are accepted
    pub fn set_page_size(&mut self, page_size: usize) -> bool {
        if !self.view_config.allows(page_size) {
            return false;
        }
        self.view.set_page_size(page_size);
        true
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let state = self.services.cache.state();
        let slice = self.view.derive(&state.books);
        ViewSnapshot {
            page_count: self.view.page_count(slice.total),
            visible: slice.visible,
            total: slice.total,
            library_size: state.books.len(),
            query: self.view.query.clone(),
            page: self.view.page,
            page_size: self.view.page_size,
            loading: state.is_loading(),
            error: state.error.as_ref().map(|e| e.reason()),
            mutation: self.services.mutations.status(),
        }
    }

    pub fn modal(&self) -> Modal {
        self.modal.get()
    }

    pub fn open_add_form(&self) {
        self.modal.set(Modal::Form(BookForm::add()));
    }

    /// Open the edit dialog for a cached book; false when the id is unknown
    pub fn open_edit_form(&self, id: i64) -> bool {
        match self.find(id) {
            Some(book) => {
                self.modal.set(Modal::Form(BookForm::edit(&book)));
                true
            }
            None => {
                self.services
                    .notifications
                    .error(format!("Book {} is not in the list", id));
                false
            }
        }
    }

    pub fn set_title(&self, title: &str) -> bool {
        self.modal.with_form(|form| form.title = title.to_string())
    }

    pub fn set_author(&self, author: &str) -> bool {
        self.modal.with_form(|form| form.author = author.to_string())
    }

    /// Submit the open form; `None` when no form is open
    pub async fn submit_form(&self) -> Option<MutationOutcome> {
        let (token, form) = match self.modal.current() {
            (token, Modal::Form(form)) => (token, form),
            _ => return None,
        };
        self.modal
            .with_form_at(Some(token), |form| form.errors = FieldErrors::new());

        let outcome = self
            .services
            .mutations
            .submit(form.request(), &self.modal.handle(token))
            .await;

        if let MutationOutcome::Invalid(fields) = &outcome {
            self.modal
                .with_form_at(Some(token), |form| form.errors = fields.clone());
        }
        Some(outcome)
    }

    /// Ask for confirmation before deleting a cached book
    pub fn request_delete(&self, id: i64) -> bool {
        let Some(book) = self.find(id) else {
            self.services
                .notifications
                .error(format!("Book {} is not in the list", id));
            return false;
        };
        match self.services.mutations.request_delete(&book) {
            Some(confirmation) => {
                self.modal.set(Modal::ConfirmDelete(confirmation));
                true
            }
            None => false,
        }
    }

    /// Confirm the pending delete; `None` when no confirmation is open
    pub async fn confirm_delete(&self) -> Option<MutationOutcome> {
        let (token, confirmation) = match self.modal.current() {
            (token, Modal::ConfirmDelete(confirmation)) => (token, confirmation),
            _ => return None,
        };
        Some(
            self.services
                .mutations
                .confirm_delete(confirmation, &self.modal.handle(token))
                .await,
        )
    }

    /// Close whatever dialog is open, discarding its contents
    pub fn cancel(&self) {
        if let Modal::ConfirmDelete(confirmation) = self.modal.take() {
            confirmation.cancel();
        }
    }

    fn find(&self, id: i64) -> Option<Book> {
        self.services
            .cache
            .get()
            .iter()
            .find(|b| b.id == Some(id))
            .cloned()
    }
}

impl Drop for LibraryController {
    fn drop(&mut self) {
        self.services.cache.close();
    }
}
