//! Debounced correction requests
//!
//! `submit` records the message right away and parks a request in the
//! debouncer. `step` is polled from the event loop: it dispatches the parked
//! request once the input has gone quiet, and applies finished requests to
//! the store. All store writes happen inside the caller's loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::debounce::Debouncer;
use crate::error::CorrectionError;
use crate::message::{Message, MessageId, MessageStore};

/// Quiet period used when nothing else is configured.
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(1500);

/// Something that can turn text into corrected text.
#[async_trait]
pub trait Corrector: Send + Sync {
    async fn correct(&self, text: &str) -> Result<String, CorrectionError>;
}

#[derive(Debug, Clone)]
struct QueuedRequest {
    message_id: MessageId,
    text: String,
    generation: u64,
}

#[derive(Debug)]
struct Completion {
    message_id: MessageId,
    generation: u64,
    result: Result<String, CorrectionError>,
}

/// What a call to [`CorrectionPipeline::step`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// The debounce window closed and a request went out.
    Dispatched { message_id: MessageId, generation: u64 },
    /// A request came back with text and the message now holds it.
    Corrected { message_id: MessageId, generation: u64 },
    /// A request failed; the message keeps no correction.
    Failed { message_id: MessageId, generation: u64 },
}

pub struct CorrectionPipeline {
    corrector: Arc<dyn Corrector>,
    debouncer: Debouncer<QueuedRequest>,
    generation: u64,
    in_flight: usize,
    last_error: Option<String>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl CorrectionPipeline {
    pub fn new(corrector: Arc<dyn Corrector>, quiet_period: Duration) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            corrector,
            debouncer: Debouncer::new(quiet_period),
            generation: 0,
            in_flight: 0,
            last_error: None,
            completions_tx,
            completions_rx,
        }
    }

    /// Record `text` as a new pending message and (re)start the debounce
    /// window for it. Blank input is ignored and returns `None`.
    pub fn submit(&mut self, store: &mut MessageStore, text: &str) -> Option<MessageId> {
        if text.trim().is_empty() {
            return None;
        }

        let message = Message::from_user(text);
        let message_id = message.id();
        store.append(message);

        self.generation += 1;
        self.last_error = None;

        let displaced = self.debouncer.push(QueuedRequest {
            message_id,
            text: text.to_string(),
            generation: self.generation,
        });
        if let Some(old) = displaced {
            debug!(message_id = %old.message_id, "request replaced before dispatch");
            store.mark_superseded(old.message_id);
        }

        Some(message_id)
    }

    /// Wait for the next thing that changes pipeline state and apply it.
    ///
    /// Cancel safe, so it can sit in a `tokio::select!` next to input events.
    pub async fn step(&mut self, store: &mut MessageStore) -> PipelineEvent {
        tokio::select! {
            Some(completion) = self.completions_rx.recv() => self.apply(store, completion),
            queued = self.debouncer.ready() => self.dispatch(queued),
        }
    }

    fn dispatch(&mut self, queued: QueuedRequest) -> PipelineEvent {
        let QueuedRequest { message_id, text, generation } = queued;
        debug!(%message_id, generation, "dispatching correction request");

        self.in_flight += 1;
        let corrector = Arc::clone(&self.corrector);
        let tx = self.completions_tx.clone();
        let request = tokio::spawn(async move { corrector.correct(&text).await });
        // Watch the request task so a panic still reports back and frees its in_flight slot
        tokio::spawn(async move {
            let result = match request.await {
                Ok(result) => result,
                Err(e) => Err(CorrectionError::Aborted(e.to_string())),
            };
            let _ = tx.send(Completion { message_id, generation, result });
        });

        PipelineEvent::Dispatched { message_id, generation }
    }

    fn apply(&mut self, store: &mut MessageStore, completion: Completion) -> PipelineEvent {
        let Completion { message_id, generation, result } = completion;
        self.in_flight = self.in_flight.saturating_sub(1);

        match result {
            Ok(text) => {
                store.set_correction(message_id, &text);
                PipelineEvent::Corrected { message_id, generation }
            }
            Err(err) => {
                warn!(%message_id, generation, error = %err, "correction failed");
                store.mark_failed(message_id, &err.to_string());
                // A newer send already cleared the error line; don't bring it back.
                if generation == self.generation {
                    self.last_error = Some(err.user_message().to_string());
                }
                PipelineEvent::Failed { message_id, generation }
            }
        }
    }

    /// A request is waiting out the debounce window or is on the wire.
    pub fn is_busy(&self) -> bool {
        self.debouncer.is_armed() || self.in_flight > 0
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn quiet_period(&self) -> Duration {
        self.debouncer.quiet_period()
    }
}
