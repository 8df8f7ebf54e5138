//! Shared types, error model, and configuration for epicreport.
//!
//! This crate is the foundation depended on by all other epicreport crates.
//! It provides:
//! - [`ReportError`]: the unified error type
//! - Domain types ([`Epic`], [`ChildItem`], [`EpicState`], [`EpicQuery`])
//! - The report document model ([`ReportModel`], [`Section`], [`Content`])
//! - Configuration ([`AppConfig`], [`AzureDevOpsConfig`], config loading)

pub mod config;
pub mod error;
pub mod report;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, AzureDevOpsConfig, DefaultsConfig, ReportConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, read_pat,
};
pub use error::{ReportError, Result};
pub use report::{Content, ReportModel, Section, SectionKind, Table, TableKind, TableRow};
pub use types::{ChildItem, Epic, EpicQuery, EpicState, UNASSIGNED, normalize_assignee};
