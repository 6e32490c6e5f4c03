//! CipherLuma mock backend: client-side domain stores mirrored to a
//! key-value substrate, and a simulator standing in for the REST API.

pub mod admin_store;
pub mod api_simulator;
pub mod clock;
pub mod collection;
pub mod config;
pub mod error;
pub mod export;
pub mod kv;
pub mod news_store;
pub mod notifications;
pub mod rng;
pub mod services;
pub mod session;
pub mod support_store;
pub mod transaction_store;
pub mod types;
