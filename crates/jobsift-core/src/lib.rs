//! Resumable classification pipeline for job-posting CSVs.
//!
//! Leaves first:
//!
//! - [`prompt`] -- primary and condensed fallback prompts per record
//! - [`reply`] -- tolerant JSON extraction from model replies
//! - [`classifier`] -- candidate/attempt retry loop over a [`Provider`](jobsift_llm::Provider)
//! - [`normalize`] -- reply (or record) to the fixed seven-column row
//! - [`queue`] -- work queue and atomic checkpoint of the input file
//! - [`output`] -- append-only output CSV
//! - [`failures`] -- JSONL ledger of rows that fell back
//! - [`driver`] -- the single-threaded control loop tying them together

pub mod classifier;
pub mod driver;
pub mod error;
pub mod failures;
pub mod normalize;
pub mod output;
pub mod prompt;
pub mod queue;
pub mod reply;

pub use classifier::{Classification, Classifier, ClassifierOptions};
pub use driver::{Driver, DriverOptions, RowOutcome, RowState, RunReport};
pub use error::{ClassifyError, StoreError};
pub use failures::{FailureEntry, FailureLedger};
pub use normalize::normalize;
pub use output::OutputLog;
pub use prompt::{ClassificationRequest, PromptBuilder};
pub use queue::{CheckpointStore, WorkQueue};
pub use reply::{ParsedReply, parse_reply};
