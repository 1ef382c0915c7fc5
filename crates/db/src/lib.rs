pub mod closing_store;
pub mod connection;
pub mod migrations;
pub mod repositories;
pub mod secret_store;

pub use closing_store::SqlClosingStore;
pub use connection::{connect, connect_with_settings, DbPool};
pub use secret_store::SqlSecretStore;
