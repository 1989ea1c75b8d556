//! Gateway client for the external messaging bridge.
//!
//! The bridge is the process that physically maintains each messaging channel
//! (QR pairing, message transport). This crate only issues lifecycle requests
//! and profile lookups against its REST API; every call returns acknowledgment
//! only — the authoritative session state arrives later as a pushed event.

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{GatewayClient, HttpGatewayClient};
pub use config::GatewayConfig;
pub use error::{Error, Result};
pub use types::ProfileInfo;
