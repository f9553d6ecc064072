// src/lib.rs

//! Long-term memory and context service for AI agents.
//!
//! `ltmc` coordinates a required relational store with optional vector,
//! graph, and cache adapters behind a single stdio (and optionally HTTP)
//! JSON-RPC surface. See [`ltmc::engine`] for the lifecycle root that wires
//! everything together and [`ltmc::rpc`] for the wire protocol.

pub mod ltmc;

pub use ltmc::config::Config;
pub use ltmc::engine::LtmcEngine;
pub use ltmc::error::LtmcError;
