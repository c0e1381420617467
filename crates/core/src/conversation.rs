use crate::backend::{ChatBackend, ChatConfig, ChatMessage};
use crate::error::{InterviewError, Result, ValidationError};
use crate::parameters::SessionParameters;
use crate::prompts::{COMPLETION_SENTINEL, OPENING_MESSAGE, PromptSet};
use crate::transcript::{Speaker, Transcript, TranscriptEntry};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// What one completed exchange did to the interview.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The assistant replied and the interview goes on.
    Continue(TranscriptEntry),
    /// The assistant ended the interview. Carries the full transcript,
    /// including the final (sentinel-free) assistant entry.
    Complete(Vec<TranscriptEntry>),
}

impl TurnOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, TurnOutcome::Complete(_))
    }
}

/// Strips every occurrence of the completion sentinel.
/// Returns the cleaned text and whether the sentinel was present.
pub fn strip_sentinel(reply: &str) -> (String, bool) {
    if reply.contains(COMPLETION_SENTINEL) {
        (reply.replace(COMPLETION_SENTINEL, ""), true)
    } else {
        (reply.to_string(), false)
    }
}

#[derive(Default)]
struct DriverState {
    config: Option<ChatConfig>,
    transcript: Transcript,
    // What the remote has seen, including the automatic opening message.
    history: Vec<ChatMessage>,
    completed: bool,
    epoch: u64,
    // Epoch of the request holding the slot. `reset` clears it, so a request
    // from before the reset can neither block nor release the new session.
    in_flight: Option<u64>,
}

fn lock_state(state: &Mutex<DriverState>) -> MutexGuard<'_, DriverState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the slot for the single outstanding request. Released on drop, so an
/// early return or a failed remote call can never leave the driver stuck.
struct InFlight<'a> {
    state: &'a Mutex<DriverState>,
    epoch: u64,
}

impl<'a> InFlight<'a> {
    fn acquire(state: &'a Mutex<DriverState>) -> Result<Self, ValidationError> {
        let mut guard = lock_state(state);
        if guard.in_flight.is_some() {
            return Err(ValidationError::RequestInFlight);
        }
        let epoch = guard.epoch;
        guard.in_flight = Some(epoch);
        Ok(InFlight { state, epoch })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut guard = lock_state(self.state);
        if guard.in_flight == Some(self.epoch) {
            guard.in_flight = None;
        }
    }
}

/// Mediates the live interview with a remote conversational model.
///
/// At most one request is outstanding at a time; a second call while one is
/// pending is rejected with [`ValidationError::RequestInFlight`]. Methods take
/// `&self` so the driver can be shared with whatever front-end renders it.
pub struct ConversationDriver {
    backend: Arc<dyn ChatBackend>,
    state: Mutex<DriverState>,
    completion_delay: Duration,
}

impl ConversationDriver {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            backend,
            state: Mutex::new(DriverState::default()),
            completion_delay: Duration::ZERO,
        }
    }

    /// Pause between seeing the sentinel and reporting completion, giving a
    /// front-end time to show the closing message.
    pub fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay = delay;
        self
    }

    fn state(&self) -> MutexGuard<'_, DriverState> {
        lock_state(&self.state)
    }

    /// Opens the remote session and records the interviewer's opening question
    /// as the first transcript entry. May be called again if it failed.
    pub async fn initialize(
        &self,
        params: &SessionParameters,
        prompts: &PromptSet,
    ) -> Result<TurnOutcome> {
        let slot = InFlight::acquire(&self.state)?;

        let (config, history, epoch) = {
            let mut state = self.state();
            if state.epoch != slot.epoch {
                return Err(ValidationError::SessionReset.into());
            }
            if !state.transcript.is_empty() {
                return Err(ValidationError::ConversationAlreadyOpen.into());
            }
            let config = ChatConfig {
                system_instruction: prompts.interviewer_instruction(params),
                ..ChatConfig::default()
            };
            state.config = Some(config.clone());
            state.history = vec![ChatMessage::user(OPENING_MESSAGE)];
            (config, state.history.clone(), slot.epoch)
        };

        tracing::info!(
            "Opening interview for {} at {}",
            params.role.trim(),
            params.company_name.trim()
        );
        tracing::debug!("System instruction: {}", config.system_instruction);

        let reply = match self.backend.send_chat(&config, &history).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Failed to open the interview: {:?}", e);
                return Err(InterviewError::remote(e));
            }
        };

        self.record_reply(epoch, None, reply).await
    }

    /// Sends one candidate answer and records the interviewer's reply.
    ///
    /// The candidate's entry is appended before the remote call. If the call
    /// fails the entry stays, no reply is appended, and the error is returned
    /// so the candidate can resend.
    pub async fn send_turn(&self, text: &str) -> Result<TurnOutcome> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyMessage.into());
        }
        let slot = InFlight::acquire(&self.state)?;

        let (config, history, epoch) = {
            let mut state = self.state();
            if state.epoch != slot.epoch {
                return Err(ValidationError::SessionReset.into());
            }
            if state.completed {
                return Err(ValidationError::InterviewComplete.into());
            }
            let Some(config) = state.config.clone() else {
                return Err(ValidationError::ConversationNotOpen.into());
            };
            if state.transcript.is_empty() {
                return Err(ValidationError::ConversationNotOpen.into());
            }
            state
                .transcript
                .push(TranscriptEntry::new(Speaker::User, text))
                .map_err(|_| ValidationError::ConversationNotOpen)?;

            let mut history = state.history.clone();
            history.push(ChatMessage::user(text));
            (config, history, slot.epoch)
        };

        let reply = match self.backend.send_chat(&config, &history).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Interview turn failed: {:?}", e);
                return Err(InterviewError::remote(e));
            }
        };

        self.record_reply(epoch, Some(text), reply).await
    }

    async fn record_reply(
        &self,
        epoch: u64,
        user_text: Option<&str>,
        reply: String,
    ) -> Result<TurnOutcome> {
        let (cleaned, finished) = strip_sentinel(&reply);

        let outcome = {
            let mut state = self.state();
            if state.epoch != epoch {
                tracing::debug!("Discarding reply that arrived after a reset");
                return Err(ValidationError::SessionReset.into());
            }
            if let Some(text) = user_text {
                state.history.push(ChatMessage::user(text));
            }
            state.history.push(ChatMessage::model(cleaned.clone()));

            let entry = TranscriptEntry::new(Speaker::Assistant, cleaned);
            state
                .transcript
                .push(entry.clone())
                .map_err(|_| ValidationError::ConversationNotOpen)?;

            if finished {
                state.completed = true;
                TurnOutcome::Complete(state.transcript.entries().to_vec())
            } else {
                TurnOutcome::Continue(entry)
            }
        };

        if outcome.is_complete() {
            tracing::info!("Interviewer signalled the end of the interview");
            if !self.completion_delay.is_zero() {
                tokio::time::sleep(self.completion_delay).await;
            }
        }
        Ok(outcome)
    }

    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.state().transcript.entries().to_vec()
    }

    pub fn is_busy(&self) -> bool {
        self.state().in_flight.is_some()
    }

    pub fn is_open(&self) -> bool {
        !self.state().transcript.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.state().completed
    }

    /// Forgets the remote session and the transcript. A reply still in flight
    /// is discarded when it lands and no longer holds the request slot.
    pub fn reset(&self) {
        let mut state = self.state();
        let epoch = state.epoch.wrapping_add(1);
        *state = DriverState {
            epoch,
            ..DriverState::default()
        };
    }
}
