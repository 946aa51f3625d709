//! Contact Cleaner Library
//!
//! This library provides the core of the contact cleaning service: name
//! parsing and standardization, field validation, quality scoring, record
//! enrichment, duplicate detection and merging, plus the HTTP handlers that
//! expose them.
//!
//! # Modules
//!
//! - `api`: API-layer namespace.
//! - `core`: Domain-layer namespace.
//! - `cache_validator`: Checksum-validated run store.
//! - `config`: Configuration management and deduplication settings.
//! - `detector`: Pairwise duplicate detection.
//! - `enrichment`: Company and name enrichment from existing fields.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `lookups`: Name standardization lookup tables.
//! - `merger`: Duplicate merging and conflict resolution.
//! - `models`: Core data models.
//! - `name_parser`: Personal name parsing.
//! - `pipeline`: Batch cleaning workflow.
//! - `scoring`: Record quality scoring.
//! - `similarity`: String normalization and edit-distance similarity.
//! - `validators`: Email, phone, address and name validators.

pub mod api;
pub mod core;

// Re-export primary modules for shared use in tests and other binaries
pub mod cache_validator;
pub mod config;
pub mod detector;
pub mod enrichment;
pub mod errors;
pub mod handlers;
pub mod lookups;
pub mod merger;
pub mod models;
pub mod name_parser;
pub mod pipeline;
pub mod scoring;
pub mod similarity;
pub mod validators;
