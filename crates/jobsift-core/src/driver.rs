//! Pipeline driver.
//!
//! One record at a time: build prompts, classify, normalize, append the
//! output row, then dequeue. The output row is durable before the queue
//! changes, so a crash can duplicate a row but never lose one.
//!
//! Cancellation is observed before each record, while a classification is
//! in flight (nothing has been written for that record yet) and during the
//! pacing delay. It is never observed between writing a row and dequeuing
//! it.

use std::time::Duration;

use jobsift_types::config::{PipelineSettings, QueueMode};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classifier::Classifier;
use crate::error::StoreError;
use crate::failures::{FailureEntry, FailureLedger};
use crate::normalize::normalize;
use crate::output::OutputLog;
use crate::prompt::PromptBuilder;
use crate::queue::CheckpointStore;
use crate::reply::ParsedReply;

/// Lifecycle of one record within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Pending,
    Requesting,
    Normalizing { classified: bool },
    Written,
    Dequeued,
}

/// How a row was turned into output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// The classifier replied; `candidate` is the prompt that worked.
    Classified { candidate: usize },
    /// Every candidate failed; the row was built from the record alone.
    Fallback { error: String },
}

/// Summary of one [`Driver::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub processed: usize,
    pub classified: usize,
    pub fell_back: usize,
    /// Rows still in the queue when the run ended.
    pub remaining: usize,
    pub cancelled: bool,
    pub outcomes: Vec<RowOutcome>,
}

/// Run-level knobs.
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Pause after every record, the last one included.
    pub delay: Duration,
    pub limit: Option<usize>,
    pub queue_mode: QueueMode,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(7),
            limit: None,
            queue_mode: QueueMode::Destructive,
        }
    }
}

impl DriverOptions {
    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self {
            delay: Duration::try_from_secs_f64(settings.delay_secs).unwrap_or_default(),
            limit: settings.limit,
            queue_mode: settings.queue_mode,
        }
    }
}

/// Owns every file handle of a run.
pub struct Driver {
    prompts: PromptBuilder,
    classifier: Classifier,
    store: CheckpointStore,
    output: OutputLog,
    ledger: Option<FailureLedger>,
    options: DriverOptions,
}

impl Driver {
    pub fn new(
        prompts: PromptBuilder,
        classifier: Classifier,
        store: CheckpointStore,
        output: OutputLog,
        options: DriverOptions,
    ) -> Self {
        Self {
            prompts,
            classifier,
            store,
            output,
            ledger: None,
            options,
        }
    }

    /// Record fallen-back rows in `ledger`.
    pub fn with_ledger(mut self, ledger: FailureLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Process the queue until it is empty, the row limit is hit, or
    /// `cancel` fires.
    ///
    /// # Errors
    ///
    /// Any I/O failure on the queue, output or ledger file. Classification
    /// failures never surface here.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<RunReport, StoreError> {
        let mut queue = self.store.load()?;
        let mut cursor = 0usize;
        let mut report = RunReport::default();

        info!(
            input = %self.store.path().display(),
            output = %self.output.path().display(),
            rows = queue.len(),
            mode = ?self.options.queue_mode,
            "starting run"
        );

        loop {
            if cursor >= queue.len() || self.limit_reached(report.processed) {
                break;
            }
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let row = report.processed + 1;
            let Some(record) = queue.get(cursor) else {
                break;
            };
            debug!(row, state = ?RowState::Pending, "next record");

            let request = self.prompts.request(record);
            debug!(row, state = ?RowState::Requesting, candidates = request.candidate_count());
            info!(
                row,
                name = record.first_non_empty(&["Vacancy name", "vacancy_name", "name"]).unwrap_or_default(),
                "requesting classification"
            );

            let result = tokio::select! {
                result = self.classifier.classify(&request) => result,
                () = cancel.cancelled() => {
                    info!(row, "cancelled during classification, row left in queue");
                    report.cancelled = true;
                    break;
                }
            };

            let (output, outcome) = match result {
                Ok(classification) => {
                    debug!(row, state = ?RowState::Normalizing { classified: true });
                    info!(
                        row,
                        candidate = classification.candidate,
                        attempts = classification.attempts,
                        reply = %serde_json::Value::Object(classification.reply.clone()),
                        "classified"
                    );
                    (
                        normalize(&classification.reply, record),
                        RowOutcome::Classified {
                            candidate: classification.candidate,
                        },
                    )
                }
                Err(err) => {
                    debug!(row, state = ?RowState::Normalizing { classified: false });
                    warn!(
                        row,
                        error = %err,
                        last_reply = err.last_reply().unwrap_or_default(),
                        "classification failed, writing record-only row"
                    );
                    if let Some(ledger) = &self.ledger {
                        let entry = FailureEntry::new(
                            row,
                            err.to_string(),
                            err.last_reply().map(str::to_owned),
                            record.clone(),
                        );
                        ledger.append(&entry).await?;
                    }
                    (
                        normalize(&ParsedReply::new(), record),
                        RowOutcome::Fallback {
                            error: err.to_string(),
                        },
                    )
                }
            };

            self.output.append(&output)?;
            debug!(row, state = ?RowState::Written);

            match self.options.queue_mode {
                QueueMode::Destructive => {
                    queue.remove_at(cursor);
                    self.store.persist(&queue)?;
                }
                QueueMode::Cursor => cursor += 1,
            }
            debug!(row, state = ?RowState::Dequeued, remaining = queue.len() - cursor);

            report.processed += 1;
            match &outcome {
                RowOutcome::Classified { .. } => report.classified += 1,
                RowOutcome::Fallback { .. } => report.fell_back += 1,
            }
            report.outcomes.push(outcome);

            // Paced after every row, the last one included.
            if !self.options.delay.is_zero() {
                debug!(delay_ms = self.options.delay.as_millis() as u64, "pacing");
                tokio::select! {
                    () = tokio::time::sleep(self.options.delay) => {}
                    () = cancel.cancelled() => {
                        report.cancelled = true;
                        break;
                    }
                }
            }
        }

        report.remaining = queue.len() - cursor;
        info!(
            processed = report.processed,
            classified = report.classified,
            fell_back = report.fell_back,
            remaining = report.remaining,
            cancelled = report.cancelled,
            "run finished"
        );
        Ok(report)
    }

    fn limit_reached(&self, processed: usize) -> bool {
        self.options.limit.is_some_and(|limit| processed >= limit)
    }
}
