//! Common utilities and shared types for cutaway.
//!
//! This crate provides foundational components used across all cutaway crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **Storage**: File storage backends for uploaded pictures
//!
//! # Example
//!
//! ```no_run
//! use cutaway_common::{AppResult, Config};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     println!("Listening on {}:{}", config.server.host, config.server.port);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use storage::{LocalStorage, StorageBackend, UploadedFile, generate_storage_key};
