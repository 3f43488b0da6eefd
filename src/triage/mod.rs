//! Bulk complaint triage.
//!
//! An upload flows through [`ingest`] (parse, validate, clean), then
//! [`orchestrator`] (one batched inference call, partition by priority),
//! then [`package`] (three JSON documents zipped into a request-scoped
//! scratch directory). [`priority`] holds the business rule that decides
//! which bucket a complaint lands in.

pub mod ingest;
pub mod orchestrator;
pub mod package;
pub mod priority;

pub use ingest::{ingest, CleanedComplaint, ComplaintRecord, UploadFormat};
pub use orchestrator::{analyze, process_upload, BulkError, EnrichedComplaint, Summary, TriageReport};
pub use package::{package, Bundle, ScratchDir};
pub use priority::{classify_priority, Priority};
