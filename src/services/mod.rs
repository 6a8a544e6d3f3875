//! Client-side services: collection cache, mutations and notifications

pub mod cache;
pub mod mutations;
pub mod notifications;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use crate::{config::AppConfig, repository::BookRepository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub repository: Arc<dyn BookRepository>,
    pub cache: cache::CollectionCache,
    pub mutations: mutations::MutationCoordinator,
    pub notifications: notifications::Notifications,
}

impl Services {
    /// Wire the services around one repository and one notification sink
    pub fn new(
        repository: Arc<dyn BookRepository>,
        config: &AppConfig,
        notifier: Arc<dyn notifications::Notifier>,
    ) -> Self {
        let notifications =
            notifications::Notifications::new(notifier, config.notifications.clone());
        let cache = cache::CollectionCache::new(repository.clone(), config.cache.stale_time());
        let mutations = mutations::MutationCoordinator::new(
            repository.clone(),
            cache.clone(),
            notifications.clone(),
        );

        Self {
            repository,
            cache,
            mutations,
            notifications,
        }
    }

    /// Services for one mounted view: a new, empty cache that the view can
    /// close on teardown, and a coordinator that refreshes it. Repository,
    /// notifications and the pending-mutation status stay shared.
    pub fn for_view(&self) -> Self {
        let cache = cache::CollectionCache::new(self.repository.clone(), self.cache.stale_time());
        Self {
            repository: self.repository.clone(),
            mutations: self.mutations.with_cache(cache.clone()),
            cache,
            notifications: self.notifications.clone(),
        }
    }
}
