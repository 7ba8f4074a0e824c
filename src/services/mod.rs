//! Business logic services

pub mod auth;
pub mod catalog;
pub mod inventory;
pub mod loans;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub catalog: catalog::CatalogService,
    pub inventory: inventory::InventoryService,
    pub loans: loans::LoansService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        Self {
            auth: auth::AuthService::new(repository.clone(), config.auth.clone()),
            catalog: catalog::CatalogService::new(
                repository.clone(),
                config.pagination.clone(),
                config.dashboard.clone(),
            ),
            inventory: inventory::InventoryService::new(repository.clone()),
            loans: loans::LoansService::new(
                repository,
                loans::RenewalPolicy::from_config(&config.loans),
            ),
        }
    }
}
