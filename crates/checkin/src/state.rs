//! Application state with typed table clients.
//!
//! Every service receives an explicitly constructed `AppState`; nothing is
//! looked up from a global registry. The storage backend is selected at
//! compile time via feature flags.

use std::sync::Arc;

use checkin_core::event::{Event, EventCheckIn, EventOrganization, EventRegistration};
use checkin_core::storage::{StorageBackend, TableClient, TableError};

use crate::config::Config;

/// Shared application state: one table client per record type.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub events: TableClient<Event>,
    pub check_ins: TableClient<EventCheckIn>,
    pub registrations: TableClient<EventRegistration>,
    pub organizations: TableClient<EventOrganization>,
}

impl AppState {
    /// Binds every record type to its table on `backend`.
    pub fn build(backend: Arc<dyn StorageBackend>, config: &Config) -> Result<Self, TableError> {
        let tables = config.table_names();
        let options = config.table_options();

        Ok(Self {
            config: config.clone(),
            events: TableClient::new(backend.clone(), tables.event)?.with_options(options),
            check_ins: TableClient::new(backend.clone(), tables.check_in)?.with_options(options),
            registrations: TableClient::new(backend.clone(), tables.registration)?
                .with_options(options),
            organizations: TableClient::new(backend, tables.organization)?.with_options(options),
        })
    }
}

// ============================================================================
// Factory functions for each storage backend
// ============================================================================

#[cfg(feature = "dynamodb")]
mod dynamodb {
    use super::*;
    use crate::storage::DynamoDbBackend;

    impl AppState {
        /// Creates AppState backed by DynamoDB.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            let backend =
                DynamoDbBackend::connect(&config.region, config.endpoint_url.as_deref()).await;
            tracing::debug!(
                region = %config.region,
                endpoint = ?config.endpoint_url,
                env = %config.env,
                "Using DynamoDB storage"
            );
            Ok(Self::build(Arc::new(backend), config)?)
        }
    }
}

#[cfg(feature = "inmemory")]
mod inmemory {
    use super::*;
    use crate::storage::MemoryStore;

    impl AppState {
        /// Creates AppState with in-memory storage. Data lives for one process.
        pub async fn new(config: &Config) -> Result<Self, anyhow::Error> {
            tracing::debug!(env = %config.env, "Using in-memory storage");
            Ok(Self::build(Arc::new(MemoryStore::new()), config)?)
        }
    }
}

// ============================================================================
// Test support
// ============================================================================


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_follow_env() {
        let (state, _) = test_support::in_memory();
        assert_eq!(state.events.table_name(), "dev-event");
        assert_eq!(state.check_ins.table_name(), "dev-event-checkin");
        assert_eq!(state.registrations.table_name(), "dev-event-registration");
        assert_eq!(state.organizations.table_name(), "dev-event-organization");
    }

    #[test]
    fn test_table_options_come_from_config() {
        let (state, _) = test_support::in_memory();
        assert_eq!(state.registrations.options().parallelism, 4);
        assert_eq!(state.registrations.options().max_bulk_rounds, 5);
    }
}
