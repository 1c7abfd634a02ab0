//! # Genji Common Library
//!
//! Shared code for the Genji services including:
//! - Database schema and connection setup
//! - Event types (GenjiEvent enum) and the EventBus
//! - Difficulty scale, rank buckets and role ladders
//! - Configuration loading
//! - SSE helpers

pub mod config;
pub mod db;
pub mod difficulty;
pub mod error;
pub mod events;
pub mod models;
pub mod sse;

pub use difficulty::{Bucket, DifficultyGrade, RankTable};
pub use error::{Error, Result};
