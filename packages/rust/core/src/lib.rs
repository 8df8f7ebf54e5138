//! Report domain logic for epicreport.
//!
//! The pure stages (classify, enrich, build) plus the `generate` pipeline that
//! wires them between a work-item source and the renderers.

pub mod classify;
pub mod enrich;
pub mod pipeline;
pub mod report;

pub use classify::{Bucket, BucketCounts, Classification, classify};
pub use enrich::{EnrichedEpic, EnrichedReport, PointCategory, SalientPoint, enrich};
pub use pipeline::{
    GenerateConfig, GenerateResult, ProgressReporter, SilentProgress, Summary, assemble,
    generate_report, summarize,
};
pub use report::{ReportMeta, build_report};
