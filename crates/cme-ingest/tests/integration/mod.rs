//! Integration tests for cme-ingest.
//!
//! These drive the orchestrator against scripted pages:
//! - Freshness decisions per trade date
//! - Row validation and persistence outcomes
//! - Fatal page failures ending a run

pub mod common;
