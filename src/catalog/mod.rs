//! Vocabulary catalog
//!
//! This module provides:
//! - Vocabulary entries with per-language text and a difficulty level
//! - The session catalog the schedulers draw from
//! - CSV import of catalog tables

pub mod import;
pub mod models;

pub use import::{read_catalog, read_catalog_csv, CatalogRow};
pub use models::*;
