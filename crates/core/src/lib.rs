//! Core business logic for cutaway.

pub mod services;

pub use services::*;
