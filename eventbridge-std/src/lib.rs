//! # eventbridge-std
//!
//! Standard hosting engine for eventbridge.
//!
//! This crate provides:
//! - **Engine**: [`TaskEngine`], a tokio-backed [`Engine`](eventbridge_core::Engine)
//!   with a pool of serial workers
//! - **Modules**: [`ModuleRegistry`] for `(module, name)` listeners
//! - **Configuration**: [`EngineConfig`]
//! - **Testing**: recorders, gates and a deterministic engine in [`testing`]

#![deny(clippy::wildcard_imports)]
#![warn(missing_docs)]

// Re-export core
pub use eventbridge_core;

// Modules
pub mod config;
pub mod engine;
pub mod error;
pub mod modules;
pub mod testing;
pub mod worker;

pub use config::EngineConfig;
pub use engine::{EngineStats, TaskEngine, TaskEngineBuilder};
pub use error::EngineError;
pub use modules::ModuleRegistry;
pub use worker::TaskWorker;
