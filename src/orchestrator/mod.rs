//! Mint orchestrator, one file per lifecycle concern.
//!
//! This module provides:
//! - `core`: MintOrchestrator struct, snapshot fetch, builder hand-off, inspection
//! - `request`: order request and cancellation (no index interaction)
//! - `mint`: batch minting against the authenticated index
//! - `tests`: Unit tests for the lifecycle operations

pub mod core;
pub mod mint;
pub mod request;

pub use core::{IndexEntry, IndexReport, MintOrchestrator};
pub use mint::MintPlan;
