//! Enrollment funding engine for Group Scholar term reporting.
//!
//! Enrollment records are classified into completed, active and not-funded
//! buckets under either credit-based or per-student funding, each bucket is
//! rolled up by course and status, and the buckets are combined into funded
//! totals and a percent-funded figure. The engine is a pure function of its
//! input: the same records always produce the same summary.

pub mod aggregate;
pub mod classify;
pub mod db;
pub mod error;
pub mod export;
pub mod logging;
pub mod models;
pub mod report;
pub mod settings;
pub mod source;

pub use aggregate::aggregate;
pub use classify::{classify, Classification, ClassificationDiagnostics, ClassificationRules, Classifier};
pub use error::FundingError;
pub use export::{export_rows, write_csv, ExportRow};
pub use models::{
    Bucket, CombinedReport, CourseRollup, CreditsAttempted, EnrollmentRecord, FundingModel,
    FundingTotals, RevenueSummary, StatusCount,
};
pub use report::{assemble, build_term_report, summarize, summarize_with, FundingSummary, TermReport};
pub use settings::Settings;
