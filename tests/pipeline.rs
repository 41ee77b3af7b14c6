//! End-to-end runs of the orchestrator.
//!
//! Most tests use in-process fakes for the generative service and the
//! mailer; the last ones drive the live clients against wiremock servers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use horoscope_mailer::config::{REQUIRED_VARS, RunConfig};
use horoscope_mailer::error::{ConfigError, DeliveryError, Error, GenerationError};
use horoscope_mailer::job::{Backends, LiveBackends, Orchestrator, RunOutcome, Stage};
use horoscope_mailer::llm::TextGenerator;
use horoscope_mailer::mail::{Mailer, OutgoingEmail, SendReceipt};

const REPORT: &str = "<h2>Sunday, October 18</h2>\n<p>Let the Libra sun soften old edges.</p>\n";

// ── Fakes ───────────────────────────────────────────────────────────

/// Generative service stub with a fixed reply and a call counter.
struct StubLlm {
    reply: Result<String, u16>,
    calls: AtomicUsize,
}

impl StubLlm {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(text.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing_with(status: u16) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(status),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for StubLlm {
    fn provider_name(&self) -> &str {
        "stub"
    }

    fn model_name(&self) -> &str {
        "stub-model"
    }

    async fn generate_text(&self, _prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(status) => Err(GenerationError::Status {
                provider: "stub".into(),
                status: *status,
                body: "unavailable".into(),
            }),
        }
    }
}

/// Mailer that records every message it is asked to send.
struct RecordingMailer {
    reject_with: Option<u16>,
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    fn accepting() -> Arc<Self> {
        Arc::new(Self {
            reject_with: None,
            sent: Mutex::new(Vec::new()),
        })
    }

    fn rejecting(status: u16) -> Arc<Self> {
        Arc::new(Self {
            reject_with: Some(status),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<SendReceipt, DeliveryError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push(email.clone());
        match self.reject_with {
            Some(status) => Err(DeliveryError::Rejected {
                mailer: "recording".into(),
                status,
                body: "rejected".into(),
            }),
            None => Ok(SendReceipt {
                message_id: Some(format!("msg-{}", sent.len())),
            }),
        }
    }
}

struct FakeBackends {
    llm: Arc<StubLlm>,
    mailer: Arc<RecordingMailer>,
}

impl Backends for FakeBackends {
    fn text_generator(&self, _config: &RunConfig) -> Result<Arc<dyn TextGenerator>, ConfigError> {
        Ok(self.llm.clone())
    }

    fn mailer(&self, _config: &RunConfig) -> Result<Arc<dyn Mailer>, ConfigError> {
        Ok(self.mailer.clone())
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn now() -> DateTime<Utc> {
    // 2026-10-18 in UTC+9
    Utc.with_ymd_and_hms(2026, 10, 17, 21, 0, 0).unwrap()
}

fn full_env() -> HashMap<String, String> {
    HashMap::from([
        ("GEMINI_API_KEY".to_string(), "gemini-key".to_string()),
        ("SENDGRID_API_KEY".to_string(), "sendgrid-key".to_string()),
        ("TO_EMAIL".to_string(), "reader@example.com".to_string()),
    ])
}

async fn run_with(
    env: &HashMap<String, String>,
    llm: Arc<StubLlm>,
    mailer: Arc<RecordingMailer>,
) -> RunOutcome {
    let orchestrator = Orchestrator::new(FakeBackends { llm, mailer });
    orchestrator
        .run(|| RunConfig::resolve(|k| env.get(k).cloned(), now()))
        .await
}

// ── Configuring ─────────────────────────────────────────────────────

#[tokio::test]
async fn missing_variable_fails_before_any_call() {
    for key in REQUIRED_VARS {
        let mut env = full_env();
        env.remove(key);
        let llm = StubLlm::replying(REPORT);
        let mailer = RecordingMailer::accepting();

        let outcome = run_with(&env, llm.clone(), mailer.clone()).await;

        match &outcome {
            RunOutcome::Failed {
                stage: Stage::Configuring,
                cause: Error::Config(ConfigError::MissingEnvVar(name)),
            } => assert_eq!(name, key),
            other => panic!("expected config failure for {key}, got {other:?}"),
        }
        assert_eq!(llm.calls(), 0, "generator invoked without {key}");
        assert!(mailer.sent().is_empty(), "mail sent without {key}");
        assert_ne!(outcome.exit_code(), std::process::ExitCode::SUCCESS);
    }
}

// ── Generating ──────────────────────────────────────────────────────

#[tokio::test]
async fn generation_failure_skips_dispatch() {
    let llm = StubLlm::failing_with(503);
    let mailer = RecordingMailer::accepting();

    let outcome = run_with(&full_env(), llm.clone(), mailer.clone()).await;

    assert_eq!(outcome.failed_stage(), Some(Stage::Generating));
    assert!(matches!(
        outcome,
        RunOutcome::Failed {
            cause: Error::Generation(GenerationError::Status { status: 503, .. }),
            ..
        }
    ));
    assert_eq!(llm.calls(), 1);
    assert!(mailer.sent().is_empty());
}

#[tokio::test]
async fn blank_generation_skips_dispatch() {
    let llm = StubLlm::replying("\n  \n");
    let mailer = RecordingMailer::accepting();

    let outcome = run_with(&full_env(), llm, mailer.clone()).await;

    assert_eq!(outcome.failed_stage(), Some(Stage::Generating));
    assert!(mailer.sent().is_empty());
}

// ── Dispatching ─────────────────────────────────────────────────────

#[tokio::test]
async fn successful_run_delivers_generated_text() {
    let llm = StubLlm::replying(REPORT);
    let mailer = RecordingMailer::accepting();

    let outcome = run_with(&full_env(), llm, mailer.clone()).await;

    assert!(outcome.is_success(), "{outcome}");
    assert_eq!(outcome.exit_code(), std::process::ExitCode::SUCCESS);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to.to_string(), "reader@example.com");
    assert!(sent[0].subject.contains("2026/10/18"), "{}", sent[0].subject);
    assert_eq!(sent[0].body, REPORT);
}

#[tokio::test]
async fn delivery_failure_is_dispatch_stage_failure() {
    let llm = StubLlm::replying(REPORT);
    let mailer = RecordingMailer::rejecting(401);

    let outcome = run_with(&full_env(), llm, mailer.clone()).await;

    assert_eq!(outcome.failed_stage(), Some(Stage::Dispatching));
    assert_eq!(outcome.exit_code(), std::process::ExitCode::from(4));
    assert_eq!(mailer.sent().len(), 1);
}

#[tokio::test]
async fn repeated_runs_send_independently() {
    let llm = StubLlm::replying(REPORT);
    let mailer = RecordingMailer::accepting();
    let env = full_env();

    let first = run_with(&env, llm.clone(), mailer.clone()).await;
    let second = run_with(&env, llm.clone(), mailer.clone()).await;

    assert!(first.is_success());
    assert!(second.is_success());
    assert_eq!(llm.calls(), 2);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], sent[1]);
    match (first, second) {
        (
            RunOutcome::Success { message_id: a, .. },
            RunOutcome::Success { message_id: b, .. },
        ) => assert_ne!(a, b),
        _ => unreachable!(),
    }
}

// ── Live clients against mock providers ─────────────────────────────

async fn mock_providers(gemini_status: u16, sendgrid_status: u16) -> (MockServer, MockServer) {
    let gemini = MockServer::start().await;
    let gemini_response = if gemini_status == 200 {
        ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": REPORT }] },
                "finishReason": "STOP"
            }]
        }))
    } else {
        ResponseTemplate::new(gemini_status).set_body_string("upstream error")
    };
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
        .and(header("x-goog-api-key", "gemini-key"))
        .respond_with(gemini_response)
        .mount(&gemini)
        .await;

    let sendgrid = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(header("authorization", "Bearer sendgrid-key"))
        .respond_with(ResponseTemplate::new(sendgrid_status))
        .mount(&sendgrid)
        .await;

    (gemini, sendgrid)
}

fn live_env(gemini: &MockServer, sendgrid: &MockServer) -> HashMap<String, String> {
    let mut env = full_env();
    env.insert("GEMINI_BASE_URL".into(), gemini.uri());
    env.insert("SENDGRID_BASE_URL".into(), sendgrid.uri());
    env.insert("FROM_EMAIL".into(), "astro@example.org".into());
    env.insert("HTTP_TIMEOUT_SECS".into(), "5".into());
    env
}

#[tokio::test]
async fn live_clients_complete_a_run() {
    let (gemini, sendgrid) = mock_providers(200, 202).await;
    let env = live_env(&gemini, &sendgrid);

    let outcome = Orchestrator::new(LiveBackends)
        .run(|| RunConfig::resolve(|k| env.get(k).cloned(), now()))
        .await;
    assert!(outcome.is_success(), "{outcome}");

    let requests = sendgrid.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = requests[0].body_json().unwrap();
    assert_eq!(body["personalizations"][0]["to"][0]["email"], "reader@example.com");
    assert_eq!(body["from"]["email"], "astro@example.org");
    assert_eq!(body["subject"], "Today's Horoscope (2026/10/18)");
    assert_eq!(body["content"][0]["value"], REPORT);
}

#[tokio::test]
async fn live_generation_error_sends_nothing() {
    let (gemini, sendgrid) = mock_providers(500, 202).await;
    let env = live_env(&gemini, &sendgrid);

    let outcome = Orchestrator::new(LiveBackends)
        .run(|| RunConfig::resolve(|k| env.get(k).cloned(), now()))
        .await;

    assert_eq!(outcome.failed_stage(), Some(Stage::Generating));
    assert!(sendgrid.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn live_delivery_rejection_fails_the_run() {
    let (gemini, sendgrid) = mock_providers(200, 400).await;
    let env = live_env(&gemini, &sendgrid);

    let outcome = Orchestrator::new(LiveBackends)
        .run(|| RunConfig::resolve(|k| env.get(k).cloned(), now()))
        .await;

    assert!(matches!(
        outcome,
        RunOutcome::Failed {
            stage: Stage::Dispatching,
            cause: Error::Delivery(DeliveryError::Rejected { status: 400, .. }),
        }
    ));
}

#[tokio::test]
async fn pasted_keys_with_trailing_newlines_still_authenticate() {
    let (gemini, sendgrid) = mock_providers(200, 202).await;
    let mut env = live_env(&gemini, &sendgrid);
    env.insert("GEMINI_API_KEY".into(), "gemini-key\n".into());
    env.insert("SENDGRID_API_KEY".into(), "sendgrid-key\r\n".into());

    let outcome = Orchestrator::new(LiveBackends)
        .run(|| RunConfig::resolve(|k| env.get(k).cloned(), now()))
        .await;

    assert!(outcome.is_success(), "{outcome}");
    assert_eq!(gemini.received_requests().await.unwrap().len(), 1);
    assert_eq!(sendgrid.received_requests().await.unwrap().len(), 1);
}
