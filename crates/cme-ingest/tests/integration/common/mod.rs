//! Shared fixtures.

pub mod site;
