//! Document submission workflow: a three step intake wizard, mock accounts, and an admin
//! review list persisted through a key-value blob store.

pub mod auth;
pub mod config;
pub mod error;
pub mod ids;
pub mod intake;
pub mod store;
pub mod telemetry;
pub mod validation;
