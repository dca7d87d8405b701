//! SRUN captive-portal auto-login client
//!
//! Reimplements the portal's legacy payload encoding (word-mixing cipher,
//! private base64 alphabet, token-keyed checksum) byte-for-byte, plus the
//! login state machine around it and the daemon plumbing: configuration,
//! WiFi control, reachability polling and an append-only audit log.

pub mod b64;
pub mod checksum;
pub mod cipher;
pub mod config;
pub mod error;
pub mod http;
pub mod logsink;
pub mod models;
pub mod parser;
pub mod portal;
pub mod utils;
