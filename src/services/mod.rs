//! Business logic services

pub mod catalog;
pub mod lending;
pub mod search;
pub mod users;

use crate::repository::SharedStore;

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub search: search::SearchService,
    pub lending: lending::LendingService,
    pub users: users::UserDirectory,
}

impl Services {
    /// Create all services over one record store
    pub fn new(store: SharedStore, users: users::UserDirectory) -> Self {
        let search = search::SearchService::new(store.clone());
        Self {
            catalog: catalog::CatalogService::new(store.clone(), search.clone()),
            lending: lending::LendingService::new(store, users.clone()),
            search,
            users,
        }
    }
}
