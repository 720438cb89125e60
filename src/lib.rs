//! acf-porter: move custom-field data in and out of a content store as JSON.
//!
//! This crate provides the core functionality for the `acfp` CLI tool.
//!
//! # Architecture
//!
//! - [`transfer`] - Export, preview and import of field sets (the core)
//! - [`model`] - Data types (`ContentItemRef`, `FieldSet`)
//! - [`storage`] - SQLite host store for items and fields
//! - [`config`] - Path resolution and settings
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod storage;
pub mod transfer;

pub use error::{Error, Result};
