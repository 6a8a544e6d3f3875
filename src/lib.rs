//! Library catalog client
//!
//! Keeps a local view of the book collection served by the library REST
//! API: fetches and caches it, derives the searched and paginated list the
//! user sees, and runs create/update/delete requests one at a time with
//! user-facing notifications.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod ui;
pub mod view;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

use repository::{BookRepository, HttpBookRepository};
use services::{notifications::Notifier, Services};
use ui::LibraryController;

/// Application state shared by the front-end
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Services,
}

impl AppState {
    /// Wire services around the HTTP repository configured in `config.api`
    pub fn connect(config: AppConfig, notifier: Arc<dyn Notifier>) -> AppResult<Self> {
        let repository: Arc<dyn BookRepository> = Arc::new(HttpBookRepository::new(&config.api)?);
        Ok(Self::with_repository(config, repository, notifier))
    }

    pub fn with_repository(
        config: AppConfig,
        repository: Arc<dyn BookRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let services = Services::new(repository, &config, notifier);
        Self {
            config: Arc::new(config),
            services,
        }
    }

    /// Controller for a newly mounted book list view, with its own cache
    pub fn controller(&self) -> LibraryController {
        LibraryController::new(self.services.for_view(), self.config.view.clone())
    }
}
