//! # Workers Module
//!
//! Tâches de fond lancées par le binaire principal :
//! - `expiry_worker.rs`: expiration des clés API et des abonnements échus
//!
//! Chaque worker tourne dans sa propre tâche tokio, en boucle, et journalise
//! ses erreurs sans s'arrêter.

pub mod expiry_worker;

pub use expiry_worker::{start_expiry_worker, ExpiryConfig, ExpiryWorker};
