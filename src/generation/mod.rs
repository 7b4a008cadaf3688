//! Music generation module.
//!
//! Owns the provider registry and persists provider output as audio assets
//! in the music directory.

pub mod service;

// Re-export commonly used items
pub use service::GenerationService;
