use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use grammar_chat::{
    CorrectionError, CorrectionPipeline, CorrectionState, Corrector, MessageStore, PipelineEvent,
};
use reqwest::StatusCode;
use tokio::time::{advance, sleep, timeout, Instant};

const QUIET: Duration = Duration::from_millis(1500);

#[derive(Clone)]
enum Reply {
    Text(&'static str),
    Status(StatusCode),
    Malformed,
    Panic,
}

/// Answers from a script and records every text it was asked to correct.
#[derive(Default)]
struct ScriptedCorrector {
    calls: Mutex<Vec<String>>,
    script: Mutex<HashMap<String, (Duration, Reply)>>,
}

impl ScriptedCorrector {
    fn reply(self: &Arc<Self>, text: &str, after: Duration, reply: Reply) -> Arc<Self> {
        self.script.lock().unwrap().insert(text.to_string(), (after, reply));
        Arc::clone(self)
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Corrector for ScriptedCorrector {
    async fn correct(&self, text: &str) -> Result<String, CorrectionError> {
        self.calls.lock().unwrap().push(text.to_string());
        let entry = self.script.lock().unwrap().get(text).cloned();
        let (delay, reply) = entry.unwrap_or((Duration::ZERO, Reply::Text("No errors found")));
        sleep(delay).await;
        match reply {
            Reply::Text(t) => Ok(t.to_string()),
            Reply::Status(s) => Err(CorrectionError::Status(s)),
            Reply::Malformed => Err(CorrectionError::Malformed("no candidates".to_string())),
            Reply::Panic => panic!("corrector blew up on {text:?}"),
        }
    }
}

fn pipeline_with(corrector: Arc<ScriptedCorrector>) -> CorrectionPipeline {
    CorrectionPipeline::new(corrector, QUIET)
}

#[tokio::test(start_paused = true)]
async fn submit_appends_one_pending_message_immediately() {
    let corrector = Arc::new(ScriptedCorrector::default());
    let mut pipeline = pipeline_with(corrector.clone());
    let mut store = MessageStore::new();

    let id = pipeline.submit(&mut store, "I has a cat.").expect("message created");

    assert_eq!(store.len(), 1);
    let message = store.latest().unwrap();
    assert_eq!(message.id(), id);
    assert_eq!(message.original_text(), "I has a cat.");
    assert!(message.is_pending());
    assert!(pipeline.is_busy());
    assert!(corrector.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn blank_input_is_ignored() {
    let corrector = Arc::new(ScriptedCorrector::default());
    let mut pipeline = pipeline_with(corrector.clone());
    let mut store = MessageStore::new();

    for text in ["", "   ", "\n\t "] {
        assert_eq!(pipeline.submit(&mut store, text), None);
    }

    assert!(store.is_empty());
    assert!(!pipeline.is_busy());
    assert_eq!(pipeline.generation(), 0);

    let nothing = timeout(Duration::from_secs(30), pipeline.step(&mut store)).await;
    assert!(nothing.is_err());
    assert!(corrector.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn request_waits_for_quiet_period() {
    let corrector = Arc::new(ScriptedCorrector::default());
    let mut pipeline = pipeline_with(corrector.clone());
    let mut store = MessageStore::new();

    let start = Instant::now();
    let id = pipeline.submit(&mut store, "Hello").unwrap();

    let early = timeout(Duration::from_millis(1400), pipeline.step(&mut store)).await;
    assert!(early.is_err());
    assert!(corrector.calls().is_empty());

    let event = pipeline.step(&mut store).await;
    assert_eq!(event, PipelineEvent::Dispatched { message_id: id, generation: 1 });
    assert!(start.elapsed() >= QUIET);
}

#[tokio::test(start_paused = true)]
async fn successful_reply_corrects_the_message() {
    let corrector = Arc::new(ScriptedCorrector::default())
        .reply("I has a cat.", Duration::from_millis(200), Reply::Text("I have a cat."));
    let mut pipeline = pipeline_with(corrector.clone());
    let mut store = MessageStore::new();

    let id = pipeline.submit(&mut store, "I has a cat.").unwrap();
    assert_eq!(store.get(id).unwrap().corrected_text(), None);

    assert!(matches!(pipeline.step(&mut store).await, PipelineEvent::Dispatched { .. }));
    assert!(pipeline.is_busy());
    let event = pipeline.step(&mut store).await;
    assert_eq!(event, PipelineEvent::Corrected { message_id: id, generation: 1 });

    let message = store.get(id).unwrap();
    assert_eq!(message.original_text(), "I has a cat.");
    assert_eq!(message.corrected_text(), Some("I have a cat."));
    assert!(!message.is_pending());
    assert!(!pipeline.is_busy());
    assert_eq!(pipeline.last_error(), None);
    assert_eq!(corrector.calls(), vec!["I has a cat.".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn burst_collapses_into_one_request_with_last_text() {
    let corrector = Arc::new(ScriptedCorrector::default())
        .reply("Hello world", Duration::ZERO, Reply::Text("Hello, world."));
    let mut pipeline = pipeline_with(corrector.clone());
    let mut store = MessageStore::new();

    let first = pipeline.submit(&mut store, "Hello").unwrap();
    advance(Duration::from_millis(500)).await;
    let second = pipeline.submit(&mut store, "Hello world").unwrap();

    // Both sends are in the transcript, newest first.
    assert_eq!(store.len(), 2);
    assert_eq!(store.messages()[0].id(), second);

    let dispatched = pipeline.step(&mut store).await;
    assert_eq!(dispatched, PipelineEvent::Dispatched { message_id: second, generation: 2 });
    let done = pipeline.step(&mut store).await;
    assert_eq!(done, PipelineEvent::Corrected { message_id: second, generation: 2 });

    assert_eq!(corrector.calls(), vec!["Hello world".to_string()]);
    assert_eq!(store.get(second).unwrap().corrected_text(), Some("Hello, world."));

    let replaced = store.get(first).unwrap();
    assert!(replaced.is_pending());
    assert_eq!(replaced.state(), &CorrectionState::Superseded);

    let idle = timeout(Duration::from_secs(30), pipeline.step(&mut store)).await;
    assert!(idle.is_err());
    assert_eq!(corrector.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn sends_in_separate_windows_each_get_a_request() {
    let corrector = Arc::new(ScriptedCorrector::default())
        .reply("one", Duration::ZERO, Reply::Text("One."))
        .reply("two", Duration::ZERO, Reply::Text("Two."));
    let mut pipeline = pipeline_with(corrector.clone());
    let mut store = MessageStore::new();

    let a = pipeline.submit(&mut store, "one").unwrap();
    pipeline.step(&mut store).await;
    pipeline.step(&mut store).await;

    let b = pipeline.submit(&mut store, "two").unwrap();
    pipeline.step(&mut store).await;
    pipeline.step(&mut store).await;

    assert_eq!(corrector.calls(), vec!["one".to_string(), "two".to_string()]);
    assert_eq!(store.get(a).unwrap().corrected_text(), Some("One."));
    assert_eq!(store.get(b).unwrap().corrected_text(), Some("Two."));
}

#[tokio::test(start_paused = true)]
async fn error_status_leaves_message_pending_and_sets_error() {
    let corrector = Arc::new(ScriptedCorrector::default())
        .reply("broken", Duration::ZERO, Reply::Status(StatusCode::INTERNAL_SERVER_ERROR));
    let mut pipeline = pipeline_with(corrector.clone());
    let mut store = MessageStore::new();

    let id = pipeline.submit(&mut store, "broken").unwrap();
    pipeline.step(&mut store).await;
    let event = pipeline.step(&mut store).await;
    assert_eq!(event, PipelineEvent::Failed { message_id: id, generation: 1 });

    let message = store.get(id).unwrap();
    assert!(message.is_pending());
    assert!(matches!(message.state(), CorrectionState::Failed(_)));
    assert_eq!(pipeline.last_error(), Some("Failed to correct text"));
    assert!(!pipeline.is_busy());

    // Still usable, and a new send clears the error line.
    let next = pipeline.submit(&mut store, "fine").unwrap();
    assert_eq!(pipeline.last_error(), None);
    pipeline.step(&mut store).await;
    pipeline.step(&mut store).await;
    assert_eq!(store.get(next).unwrap().corrected_text(), Some("No errors found"));
}

#[tokio::test(start_paused = true)]
async fn malformed_reply_is_a_failure() {
    let corrector = Arc::new(ScriptedCorrector::default())
        .reply("odd", Duration::ZERO, Reply::Malformed);
    let mut pipeline = pipeline_with(corrector);
    let mut store = MessageStore::new();

    let id = pipeline.submit(&mut store, "odd").unwrap();
    pipeline.step(&mut store).await;
    pipeline.step(&mut store).await;

    assert!(store.get(id).unwrap().is_pending());
    assert_eq!(pipeline.last_error(), Some("Failed to correct text"));
}

#[tokio::test(start_paused = true)]
async fn racing_replies_land_on_their_own_messages() {
    let corrector = Arc::new(ScriptedCorrector::default())
        .reply("slow", Duration::from_secs(10), Reply::Text("Slow."))
        .reply("fast", Duration::from_millis(10), Reply::Text("Fast."));
    let mut pipeline = pipeline_with(corrector.clone());
    let mut store = MessageStore::new();

    let slow = pipeline.submit(&mut store, "slow").unwrap();
    assert!(matches!(pipeline.step(&mut store).await, PipelineEvent::Dispatched { .. }));

    let fast = pipeline.submit(&mut store, "fast").unwrap();
    assert!(matches!(pipeline.step(&mut store).await, PipelineEvent::Dispatched { .. }));

    assert_eq!(
        pipeline.step(&mut store).await,
        PipelineEvent::Corrected { message_id: fast, generation: 2 }
    );
    assert!(pipeline.is_busy());
    assert_eq!(
        pipeline.step(&mut store).await,
        PipelineEvent::Corrected { message_id: slow, generation: 1 }
    );

    assert_eq!(store.get(slow).unwrap().corrected_text(), Some("Slow."));
    assert_eq!(store.get(fast).unwrap().corrected_text(), Some("Fast."));
    assert!(!pipeline.is_busy());
}

#[tokio::test(start_paused = true)]
async fn stale_failure_does_not_raise_error() {
    let corrector = Arc::new(ScriptedCorrector::default())
        .reply("old", Duration::from_secs(10), Reply::Status(StatusCode::BAD_GATEWAY))
        .reply("new", Duration::from_millis(10), Reply::Text("New."));
    let mut pipeline = pipeline_with(corrector);
    let mut store = MessageStore::new();

    let old = pipeline.submit(&mut store, "old").unwrap();
    pipeline.step(&mut store).await;
    pipeline.submit(&mut store, "new").unwrap();
    pipeline.step(&mut store).await;

    pipeline.step(&mut store).await; // new corrected
    let event = pipeline.step(&mut store).await;
    assert_eq!(event, PipelineEvent::Failed { message_id: old, generation: 1 });

    assert!(matches!(store.get(old).unwrap().state(), CorrectionState::Failed(_)));
    assert_eq!(pipeline.last_error(), None);
}

#[tokio::test(start_paused = true)]
async fn panicking_corrector_fails_the_message_and_frees_the_pipeline() {
    let corrector = Arc::new(ScriptedCorrector::default())
        .reply("boom", Duration::from_millis(10), Reply::Panic)
        .reply("after", Duration::ZERO, Reply::Text("After."));
    let mut pipeline = pipeline_with(corrector);
    let mut store = MessageStore::new();

    let id = pipeline.submit(&mut store, "boom").unwrap();
    assert!(matches!(pipeline.step(&mut store).await, PipelineEvent::Dispatched { .. }));
    assert!(pipeline.is_busy());

    let event = timeout(Duration::from_secs(5), pipeline.step(&mut store))
        .await
        .expect("a panicked request still completes");
    assert_eq!(event, PipelineEvent::Failed { message_id: id, generation: 1 });
    assert!(matches!(store.get(id).unwrap().state(), CorrectionState::Failed(_)));
    assert_eq!(pipeline.last_error(), Some("Failed to correct text"));
    assert!(!pipeline.is_busy());

    // The pipeline keeps working afterwards
    let next = pipeline.submit(&mut store, "after").unwrap();
    pipeline.step(&mut store).await;
    pipeline.step(&mut store).await;
    assert_eq!(store.get(next).unwrap().corrected_text(), Some("After."));
    assert!(!pipeline.is_busy());
}
