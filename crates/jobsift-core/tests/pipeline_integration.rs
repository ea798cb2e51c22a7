//! End-to-end pipeline tests with a scripted in-memory provider.
//!
//! Each test writes an input CSV into a temp dir, runs the [`Driver`] and
//! inspects the output, queue and ledger files.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jobsift_core::{
    CheckpointStore, Classifier, ClassifierOptions, Driver, DriverOptions, FailureLedger,
    OutputLog, PromptBuilder, RowOutcome,
};
use jobsift_llm::retry::BackoffPolicy;
use jobsift_llm::types::Choice;
use jobsift_llm::{ChatMessage, ChatRequest, ChatResponse, Provider, ProviderError};
use jobsift_types::config::{QueueMode, default_system_prompt, default_user_template};
use tokio_util::sync::CancellationToken;

type Reply = Box<dyn Fn(&str) -> jobsift_llm::Result<String> + Send + Sync>;

/// Answers each call by handing the user prompt to a closure.
struct Scripted {
    reply: Reply,
    calls: AtomicUsize,
}

impl Scripted {
    fn new(reply: impl Fn(&str) -> jobsift_llm::Result<String> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            reply: Box::new(reply),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for Scripted {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ChatRequest) -> jobsift_llm::Result<ChatResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let content = (self.reply)(prompt)?;
        Ok(ChatResponse {
            choices: vec![Choice {
                index: 0,
                message: ChatMessage::new("assistant", content),
                finish_reason: Some("stop".into()),
            }],
            ..Default::default()
        })
    }
}

const INPUT: &str = "\
Vacancy name,Company name,Vacancy description,Core technologies,salary,required_experience,location
Graphics Engineer,Acme,Write Vulkan renderers,\"C++, Vulkan\",200k,3-6 years,Berlin
Firmware Dev,Chipco,Bare-metal drivers,\"C, RTOS\",,1-3 years,Munich
Backend Dev,Webly,\"High-load services, lots of them\",Go,150k,,Remote
";

struct Fixture {
    _dir: tempfile::TempDir,
    input: PathBuf,
    output: PathBuf,
    ledger: PathBuf,
}

fn fixture(input: &str) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("vacancies.csv");
    std::fs::write(&input_path, input).unwrap();
    Fixture {
        input: input_path,
        output: dir.path().join("categorized.csv"),
        ledger: dir.path().join("failures.jsonl"),
        _dir: dir,
    }
}

fn options(mode: QueueMode) -> DriverOptions {
    DriverOptions {
        delay: Duration::ZERO,
        limit: None,
        queue_mode: mode,
    }
}

fn driver(fx: &Fixture, provider: Arc<Scripted>, opts: DriverOptions) -> Driver {
    let classifier = Classifier::new(
        provider,
        ClassifierOptions {
            model: "test-model".into(),
            temperature: Some(0.2),
            max_tokens: Some(256),
            max_attempts: 2,
            backoff: BackoffPolicy {
                rate_limit_fallback: Duration::from_millis(10),
                transient_step: Duration::from_millis(10),
            },
        },
    );
    Driver::new(
        PromptBuilder::new(default_system_prompt(), default_user_template()),
        classifier,
        CheckpointStore::new(&fx.input),
        OutputLog::open(&fx.output).unwrap(),
        opts,
    )
    .with_ledger(FailureLedger::new(&fx.ledger))
}

fn output_rows(path: &Path) -> Vec<Vec<String>> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader
        .records()
        .map(|r| r.unwrap().iter().map(str::to_owned).collect())
        .collect()
}

/// Classifies every row by echoing its company back in upper case.
fn echo_company(prompt: &str) -> jobsift_llm::Result<String> {
    let company = ["Acme", "Chipco", "Webly"]
        .into_iter()
        .find(|c| prompt.contains(c))
        .unwrap_or("unknown");
    Ok(serde_json::json!({
        "Company Name": company.to_uppercase(),
        "summarized_description": "summary",
        "technology_stack": ["Rust"],
        "field_type": "Backend & High-Load Services",
        "salary": null,
        "location": "Anywhere",
        "years_required": 2
    })
    .to_string())
}

#[tokio::test(start_paused = true)]
async fn every_row_produces_one_output_row() {
    let fx = fixture(INPUT);
    // Only Acme gets a usable reply; the other rows fall back.
    let provider = Scripted::new(|prompt| {
        if prompt.contains("Acme") {
            echo_company(prompt)
        } else {
            Ok("I cannot help with that.".into())
        }
    });

    let report = driver(&fx, provider, options(QueueMode::Destructive))
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.classified, 1);
    assert_eq!(report.fell_back, 2);
    assert_eq!(report.remaining, 0);

    let rows = output_rows(&fx.output);
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.len() == 7));

    assert_eq!(rows[0][0], "ACME");
    assert_eq!(rows[0][2], "Rust");
    // `null` salary in the reply falls through to the record.
    assert_eq!(rows[0][4], "200k");
    assert_eq!(rows[0][6], "2");

    // Record-only rows.
    assert_eq!(rows[1][0], "Chipco");
    assert_eq!(rows[1][2], "C, RTOS");
    assert_eq!(rows[1][3], "");
    assert_eq!(rows[1][5], "Munich");
    assert_eq!(rows[2][1], "High-load services, lots of them");
}

#[tokio::test(start_paused = true)]
async fn rerun_after_clean_run_processes_nothing() {
    let fx = fixture(INPUT);
    let provider = Scripted::new(echo_company);

    driver(&fx, provider.clone(), options(QueueMode::Destructive))
        .run(&CancellationToken::new())
        .await
        .unwrap();
    let calls_after_first = provider.calls();

    let report = driver(&fx, provider.clone(), options(QueueMode::Destructive))
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.processed, 0);
    assert_eq!(provider.calls(), calls_after_first);
    assert_eq!(output_rows(&fx.output).len(), 3);
    assert_eq!(
        std::fs::read_to_string(&fx.input).unwrap().lines().count(),
        1,
        "only the header remains"
    );
}

#[tokio::test(start_paused = true)]
async fn fallback_prompt_rescues_unparseable_primary() {
    let fx = fixture(INPUT);
    let provider = Scripted::new(|prompt| {
        if prompt.starts_with("Vacancy data (condensed JSON)") {
            Ok(r#"Here you go: {"field_type": "Embedded & Firmware"}"#.into())
        } else {
            Ok("```\nnot json\n```".into())
        }
    });

    let report = driver(&fx, provider, options(QueueMode::Destructive))
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.classified, 3);
    assert!(
        report
            .outcomes
            .iter()
            .all(|o| *o == RowOutcome::Classified { candidate: 1 })
    );
    let rows = output_rows(&fx.output);
    assert!(rows.iter().all(|r| r[3] == "Embedded & Firmware"));
}

#[tokio::test(start_paused = true)]
async fn cursor_mode_leaves_source_untouched() {
    let fx = fixture(INPUT);
    let before = std::fs::read(&fx.input).unwrap();

    let report = driver(&fx, Scripted::new(echo_company), options(QueueMode::Cursor))
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.processed, 3);
    assert_eq!(report.remaining, 0);
    assert_eq!(std::fs::read(&fx.input).unwrap(), before);
    assert!(!CheckpointStore::new(&fx.input).tmp_path().exists());
}

#[tokio::test(start_paused = true)]
async fn header_written_once_across_runs() {
    let fx = fixture(INPUT);
    let mut opts = options(QueueMode::Destructive);
    opts.limit = Some(1);

    for _ in 0..3 {
        driver(&fx, Scripted::new(echo_company), opts.clone())
            .run(&CancellationToken::new())
            .await
            .unwrap();
    }

    let content = std::fs::read_to_string(&fx.output).unwrap();
    assert_eq!(content.matches("company_name").count(), 1);
    assert_eq!(output_rows(&fx.output).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn limit_stops_early_and_keeps_rest_queued() {
    let fx = fixture(INPUT);
    let mut opts = options(QueueMode::Destructive);
    opts.limit = Some(2);

    let report = driver(&fx, Scripted::new(echo_company), opts)
        .run(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.processed, 2);
    assert_eq!(report.remaining, 1);
    let queue = CheckpointStore::new(&fx.input).load().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.get(0).unwrap().get("Company name"), Some("Webly"));
}

#[tokio::test(start_paused = true)]
async fn failures_land_in_ledger() {
    let fx = fixture(INPUT);
    let provider = Scripted::new(|_| Err(ProviderError::AuthFailed("bad key".into())));

    let report = driver(&fx, provider.clone(), options(QueueMode::Destructive))
        .run(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.fell_back, 3);
    // A rejected key fails each row on its first call, fallback prompt unsent.
    assert_eq!(provider.calls(), 3);

    let entries = FailureLedger::new(&fx.ledger).load().await.unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].position, 1);
    assert!(entries[0].error.contains("bad key"));
    assert_eq!(entries[2].record.get("Company name"), Some("Webly"));
    // Fallback rows are dequeued too.
    assert!(CheckpointStore::new(&fx.input).load().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn delay_follows_every_row() {
    let fx = fixture(INPUT);
    let mut opts = options(QueueMode::Destructive);
    opts.delay = Duration::from_secs(7);

    let started = tokio::time::Instant::now();
    driver(&fx, Scripted::new(echo_company), opts)
        .run(&CancellationToken::new())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    // One pause per row, the last included.
    assert!(elapsed >= Duration::from_secs(21), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(22), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn limit_run_paces_after_its_last_row() {
    let fx = fixture(INPUT);
    let mut opts = options(QueueMode::Destructive);
    opts.delay = Duration::from_secs(7);
    opts.limit = Some(1);

    let started = tokio::time::Instant::now();
    let report = driver(&fx, Scripted::new(echo_company), opts)
        .run(&CancellationToken::new())
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert_eq!(report.processed, 1);
    assert_eq!(report.remaining, 2);
    assert!(elapsed >= Duration::from_secs(7), "{elapsed:?}");
    assert!(elapsed < Duration::from_secs(8), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn cancelled_token_processes_nothing() {
    let fx = fixture(INPUT);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let provider = Scripted::new(echo_company);
    let report = driver(&fx, provider.clone(), options(QueueMode::Destructive))
        .run(&cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.processed, 0);
    assert_eq!(report.remaining, 3);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_during_delay_keeps_written_rows_dequeued() {
    let fx = fixture(INPUT);
    let mut opts = options(QueueMode::Destructive);
    opts.delay = Duration::from_secs(60);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.cancel();
    });

    let report = driver(&fx, Scripted::new(echo_company), opts)
        .run(&cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.processed, 1);
    assert_eq!(report.remaining, 2);
    assert_eq!(output_rows(&fx.output).len(), 1);
    assert_eq!(CheckpointStore::new(&fx.input).load().unwrap().len(), 2);
}

#[tokio::test]
async fn headerless_input_is_an_error() {
    let fx = fixture("");
    let err = driver(&fx, Scripted::new(echo_company), options(QueueMode::Destructive))
        .run(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, jobsift_core::StoreError::MissingHeader { .. }));
}
