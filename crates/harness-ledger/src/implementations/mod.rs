//! Ledger client implementations.
//!
//! - `json_rpc`: JSON-RPC over HTTP

pub mod json_rpc;
