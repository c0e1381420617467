use crate::backend::{ChatBackend, StructuredBackend};
use crate::conversation::{ConversationDriver, TurnOutcome};
use crate::error::{InterviewError, Result, ValidationError};
use crate::feedback::{FeedbackGenerator, FeedbackResult};
use crate::parameters::{ParameterField, SessionParameters};
use crate::prompts::PromptSet;
use crate::transcript::TranscriptEntry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Pause after the closing message before results are requested.
pub const DEFAULT_COMPLETION_DELAY: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Setup,
    Live,
    Results,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Setup => "setup",
            Stage::Live => "live",
            Stage::Results => "results",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FeedbackStatus {
    #[default]
    NotRequested,
    Pending,
    Ready { feedback: FeedbackResult },
    Failed { reason: String },
}

/// Which stages a navigation control may currently switch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub setup: bool,
    pub live: bool,
    pub results: bool,
}

impl Navigation {
    pub fn allows(&self, target: Stage) -> bool {
        match target {
            Stage::Setup => self.setup,
            Stage::Live => self.live,
            Stage::Results => self.results,
        }
    }
}

/// Read-only view of a wizard for presentation layers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSnapshot {
    pub stage: Stage,
    pub view: Stage,
    pub parameters: SessionParameters,
    pub parameters_complete: bool,
    pub transcript: Vec<TranscriptEntry>,
    pub busy: bool,
    pub interview_complete: bool,
    pub feedback: FeedbackStatus,
    pub navigation: Navigation,
}

#[derive(Debug, Default)]
struct WizardState {
    stage: Stage,
    // The stage the front-end is showing. Only moves to stages `can_enter` allows.
    view: Stage,
    params: SessionParameters,
    feedback: FeedbackStatus,
    final_transcript: Option<Vec<TranscriptEntry>>,
    generation: u64,
}

/// Drives one interview-practice session: setup, then the live interview,
/// then AI feedback.
///
/// ```text
/// setup --start_session(complete)--> live --finish_session--> results --reset--> setup
/// ```
///
/// The wizard exclusively owns the parameters, the transcript (through its
/// [`ConversationDriver`]) and the feedback. Its methods take `&self`; the
/// internal lock is never held across a remote call, so a snapshot taken
/// while feedback is being generated shows it as pending.
pub struct SessionWizard {
    state: Mutex<WizardState>,
    driver: ConversationDriver,
    generator: FeedbackGenerator,
    prompts: Arc<PromptSet>,
}

impl SessionWizard {
    pub fn new(chat: Arc<dyn ChatBackend>, structured: Arc<dyn StructuredBackend>) -> Self {
        Self::with_options(chat, structured, PromptSet::default(), DEFAULT_COMPLETION_DELAY)
    }

    pub fn with_options(
        chat: Arc<dyn ChatBackend>,
        structured: Arc<dyn StructuredBackend>,
        prompts: PromptSet,
        completion_delay: Duration,
    ) -> Self {
        let prompts = Arc::new(prompts);
        Self {
            state: Mutex::new(WizardState::default()),
            driver: ConversationDriver::new(chat).with_completion_delay(completion_delay),
            generator: FeedbackGenerator::new(structured, Arc::clone(&prompts)),
            prompts,
        }
    }

    fn state(&self) -> MutexGuard<'_, WizardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn stage(&self) -> Stage {
        self.state().stage
    }

    pub fn parameters(&self) -> SessionParameters {
        self.state().params.clone()
    }

    /// Edits one setup field. Rejected once the interview has started.
    pub fn update_parameter(&self, field: ParameterField, value: &str) -> Result<()> {
        self.update_parameters(&[(field, value)])
    }

    /// Applies several field edits together. If any value is rejected none of
    /// them are applied.
    pub fn update_parameters(&self, updates: &[(ParameterField, &str)]) -> Result<()> {
        let mut state = self.state();
        if state.stage != Stage::Setup {
            return Err(ValidationError::WrongStage {
                expected: Stage::Setup,
                actual: state.stage,
            }
            .into());
        }
        let mut params = state.params.clone();
        for (field, value) in updates {
            params.set(*field, value)?;
        }
        state.params = params;
        Ok(())
    }

    pub fn is_parameters_complete(&self) -> bool {
        self.state().params.is_complete()
    }

    /// Freezes the parameters, enters the live stage and asks the interviewer
    /// for its opening question.
    ///
    /// With incomplete parameters nothing changes. If the opening request
    /// fails remotely the wizard stays live with an empty transcript and the
    /// failure is only logged; [`SessionWizard::retry_opening`] tries again.
    /// Any other rejection returns the wizard to setup.
    pub async fn start_session(&self) -> Result<()> {
        let (params, generation) = {
            let mut state = self.state();
            if state.stage != Stage::Setup {
                return Err(ValidationError::WrongStage {
                    expected: Stage::Setup,
                    actual: state.stage,
                }
                .into());
            }
            if !state.params.is_complete() {
                tracing::debug!(
                    "Not starting: missing {:?}",
                    state.params.missing_fields()
                );
                return Err(ValidationError::IncompleteParameters.into());
            }
            state.stage = Stage::Live;
            state.view = Stage::Live;
            (state.params.clone(), state.generation)
        };
        tracing::info!("Session moved to the live stage");

        match self.driver.initialize(&params, &self.prompts).await {
            Ok(outcome) => self.handle_outcome(outcome).await.map(|_| ()),
            Err(e) if e.is_remote() => {
                tracing::warn!("Interview opening failed, waiting for a retry: {}", e);
                Ok(())
            }
            Err(e) => {
                let mut state = self.state();
                if state.generation == generation {
                    state.stage = Stage::Setup;
                    state.view = Stage::Setup;
                }
                Err(e)
            }
        }
    }

    /// Asks for the opening question again after a failed start.
    pub async fn retry_opening(&self) -> Result<()> {
        let params = self.require_stage(Stage::Live)?;
        if self.driver.is_open() {
            return Err(ValidationError::ConversationAlreadyOpen.into());
        }
        let outcome = self.driver.initialize(&params, &self.prompts).await?;
        self.handle_outcome(outcome).await.map(|_| ())
    }

    /// Sends one candidate answer. When the interviewer closes the interview
    /// the session moves on to results before this returns.
    pub async fn send_turn(&self, text: &str) -> Result<TurnOutcome> {
        let outcome = self.exchange_turn(text).await?;
        self.handle_outcome(outcome).await
    }

    /// Like [`SessionWizard::send_turn`], but a completed interview stays in
    /// the live stage until the caller passes the transcript to
    /// [`SessionWizard::finish_session`].
    pub async fn exchange_turn(&self, text: &str) -> Result<TurnOutcome> {
        self.require_stage(Stage::Live)?;
        self.driver.send_turn(text).await
    }

    async fn handle_outcome(&self, outcome: TurnOutcome) -> Result<TurnOutcome> {
        if let TurnOutcome::Complete(transcript) = &outcome {
            if let Err(e) = self.finish_session(transcript.clone()).await {
                // The feedback status records the failure; the turn itself succeeded.
                tracing::warn!("Feedback unavailable after the interview: {}", e);
            }
        }
        Ok(outcome)
    }

    /// Moves from live to results and generates feedback for `final_transcript`.
    ///
    /// The status is `Pending` while the request runs. On failure it becomes
    /// `Failed`, the error is returned, and [`SessionWizard::retry_feedback`]
    /// may be used.
    pub async fn finish_session(&self, final_transcript: Vec<TranscriptEntry>) -> Result<()> {
        let (params, generation) = {
            let mut state = self.state();
            if state.stage != Stage::Live {
                return Err(ValidationError::WrongStage {
                    expected: Stage::Live,
                    actual: state.stage,
                }
                .into());
            }
            state.stage = Stage::Results;
            state.view = Stage::Results;
            state.feedback = FeedbackStatus::Pending;
            state.final_transcript = Some(final_transcript.clone());
            (state.params.clone(), state.generation)
        };
        tracing::info!("Session moved to the results stage");

        self.run_generator(&final_transcript, &params, generation)
            .await
    }

    /// Re-runs feedback generation after a failure.
    pub async fn retry_feedback(&self) -> Result<()> {
        let (transcript, params, generation) = {
            let mut state = self.state();
            if state.stage != Stage::Results {
                return Err(ValidationError::WrongStage {
                    expected: Stage::Results,
                    actual: state.stage,
                }
                .into());
            }
            let FeedbackStatus::Failed { .. } = state.feedback else {
                return Err(ValidationError::FeedbackNotRetryable.into());
            };
            let Some(transcript) = state.final_transcript.clone() else {
                return Err(ValidationError::FeedbackNotRetryable.into());
            };
            state.feedback = FeedbackStatus::Pending;
            (transcript, state.params.clone(), state.generation)
        };
        tracing::info!("Retrying feedback generation");

        self.run_generator(&transcript, &params, generation).await
    }

    async fn run_generator(
        &self,
        transcript: &[TranscriptEntry],
        params: &SessionParameters,
        generation: u64,
    ) -> Result<()> {
        let result = self.generator.generate(transcript, params).await;

        let mut state = self.state();
        if state.generation != generation {
            tracing::debug!("Discarding feedback for a session that was reset");
            return Err(ValidationError::SessionReset.into());
        }
        match result {
            Ok(feedback) => {
                tracing::info!("Feedback ready, score {}", feedback.score);
                state.feedback = FeedbackStatus::Ready { feedback };
                Ok(())
            }
            Err(e) => {
                state.feedback = FeedbackStatus::Failed {
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }

    pub fn feedback_status(&self) -> FeedbackStatus {
        self.state().feedback.clone()
    }

    pub fn feedback(&self) -> Option<FeedbackResult> {
        match &self.state().feedback {
            FeedbackStatus::Ready { feedback } => Some(feedback.clone()),
            _ => None,
        }
    }

    pub fn transcript(&self) -> Vec<TranscriptEntry> {
        self.driver.transcript()
    }

    pub fn is_busy(&self) -> bool {
        self.driver.is_busy()
    }

    /// Whether a navigation control for `target` should be enabled.
    pub fn can_enter(&self, target: Stage) -> bool {
        let state = self.state();
        Self::navigation_for(&state).allows(target)
    }

    /// Switches the displayed stage. Never advances the session itself.
    pub fn navigate(&self, target: Stage) -> Result<()> {
        let mut state = self.state();
        if !Self::navigation_for(&state).allows(target) {
            return Err(ValidationError::WrongStage {
                expected: target,
                actual: state.stage,
            }
            .into());
        }
        state.view = target;
        Ok(())
    }

    fn navigation_for(state: &WizardState) -> Navigation {
        Navigation {
            setup: state.stage == Stage::Setup,
            live: state.stage != Stage::Setup,
            results: matches!(
                state.feedback,
                FeedbackStatus::Pending | FeedbackStatus::Ready { .. }
            ),
        }
    }

    pub fn snapshot(&self) -> WizardSnapshot {
        let state = self.state();
        WizardSnapshot {
            stage: state.stage,
            view: state.view,
            parameters: state.params.clone(),
            parameters_complete: state.params.is_complete(),
            transcript: self.driver.transcript(),
            busy: self.driver.is_busy(),
            interview_complete: self.driver.is_complete(),
            feedback: state.feedback.clone(),
            navigation: Self::navigation_for(&state),
        }
    }

    /// Returns the wizard to a state indistinguishable from a new one.
    /// Requests still in flight are discarded when they land.
    pub fn reset(&self) {
        let mut state = self.state();
        self.driver.reset();
        let generation = state.generation.wrapping_add(1);
        *state = WizardState {
            generation,
            ..WizardState::default()
        };
        tracing::info!("Session reset");
    }

    fn require_stage(&self, expected: Stage) -> Result<SessionParameters> {
        let state = self.state();
        if state.stage != expected {
            return Err(InterviewError::Validation(ValidationError::WrongStage {
                expected,
                actual: state.stage,
            }));
        }
        Ok(state.params.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockChatBackend, MockStructuredBackend};
    use crate::prompts::COMPLETION_SENTINEL;
    use crate::transcript::Speaker;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    const FEEDBACK: &str = r#"{"score": 82, "strengths": ["Structured answers"], "improvements": ["Mention trade-offs"], "overallSummary": "Good session."}"#;

    fn wizard(chat: MockChatBackend, structured: MockStructuredBackend) -> SessionWizard {
        SessionWizard::with_options(
            Arc::new(chat),
            Arc::new(structured),
            PromptSet::default(),
            Duration::ZERO,
        )
    }

    fn fill(wizard: &SessionWizard) {
        wizard
            .update_parameter(ParameterField::Role, "Backend Engineer")
            .unwrap();
        wizard
            .update_parameter(ParameterField::CompanyName, "Acme")
            .unwrap();
        wizard
            .update_parameter(ParameterField::Category, "technical")
            .unwrap();
        wizard
            .update_parameter(ParameterField::TargetDate, "2025-01-01")
            .unwrap();
    }

    /// Interviewer that asks one question, then closes on the next answer.
    fn two_step_chat() -> MockChatBackend {
        let mut chat = MockChatBackend::new();
        chat.expect_send_chat()
            .withf(|_, history| history.len() == 1)
            .returning(|_, _| Ok("Tell me about a system you built.".to_string()));
        chat.expect_send_chat()
            .withf(|_, history| history.len() == 3)
            .returning(|_, _| {
                Ok(format!("Great, that concludes our chat. {COMPLETION_SENTINEL}"))
            });
        chat
    }

    fn good_feedback() -> MockStructuredBackend {
        let mut structured = MockStructuredBackend::new();
        structured
            .expect_generate_structured()
            .returning(|_, _| Ok(FEEDBACK.to_string()));
        structured
    }

    #[tokio::test]
    async fn test_start_requires_complete_parameters() {
        let wizard = wizard(MockChatBackend::new(), MockStructuredBackend::new());

        let fields = [
            (ParameterField::Role, "Backend Engineer"),
            (ParameterField::CompanyName, "Acme"),
            (ParameterField::Category, "technical"),
            (ParameterField::TargetDate, "2025-01-01"),
        ];
        for (field, value) in fields {
            let err = wizard.start_session().await.unwrap_err();
            assert_eq!(err, ValidationError::IncompleteParameters.into());
            assert_eq!(wizard.stage(), Stage::Setup);
            assert!(!wizard.is_parameters_complete());
            wizard.update_parameter(field, value).unwrap();
        }
        assert!(wizard.is_parameters_complete());
    }

    #[tokio::test]
    async fn test_start_opens_with_one_assistant_entry() {
        let wizard = wizard(two_step_chat(), MockStructuredBackend::new());
        fill(&wizard);
        assert!(wizard.is_parameters_complete());

        wizard.start_session().await.unwrap();

        assert_eq!(wizard.stage(), Stage::Live);
        let transcript = wizard.transcript();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].speaker, Speaker::Assistant);
    }

    #[tokio::test]
    async fn test_parameters_frozen_after_start() {
        let wizard = wizard(two_step_chat(), MockStructuredBackend::new());
        fill(&wizard);
        wizard.start_session().await.unwrap();

        let err = wizard
            .update_parameter(ParameterField::Role, "Chef")
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongStage {
                expected: Stage::Setup,
                actual: Stage::Live
            }
            .into()
        );
        assert_eq!(wizard.parameters().role, "Backend Engineer");
    }

    #[tokio::test]
    async fn test_failed_opening_stays_live_and_can_retry() {
        let mut chat = MockChatBackend::new();
        let mut calls = 0;
        chat.expect_send_chat().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Err(anyhow::anyhow!("network down"))
            } else {
                Ok("Welcome!".to_string())
            }
        });
        let wizard = wizard(chat, MockStructuredBackend::new());
        fill(&wizard);

        wizard.start_session().await.unwrap();
        assert_eq!(wizard.stage(), Stage::Live);
        assert!(wizard.transcript().is_empty());

        wizard.retry_opening().await.unwrap();
        assert_eq!(wizard.transcript().len(), 1);
        assert_eq!(
            wizard.retry_opening().await.unwrap_err(),
            ValidationError::ConversationAlreadyOpen.into()
        );
    }

    #[tokio::test]
    async fn test_full_session_reaches_results() {
        let wizard = wizard(two_step_chat(), good_feedback());
        fill(&wizard);
        wizard.start_session().await.unwrap();

        let outcome = wizard.send_turn("A rate limiter in Rust.").await.unwrap();
        let TurnOutcome::Complete(transcript) = outcome else {
            panic!("Expected the interview to complete");
        };
        assert_eq!(transcript[2].text, "Great, that concludes our chat. ");

        assert_eq!(wizard.stage(), Stage::Results);
        let feedback = wizard.feedback().expect("feedback should be ready");
        assert_eq!(feedback.score, 82.0);
        assert_eq!(feedback.summary, "Good session.");
        assert!(wizard.can_enter(Stage::Results));
        assert!(wizard.can_enter(Stage::Live));
        assert!(!wizard.can_enter(Stage::Setup));
    }

    #[tokio::test]
    async fn test_exchange_turn_leaves_finishing_to_caller() {
        let wizard = wizard(two_step_chat(), good_feedback());
        fill(&wizard);
        wizard.start_session().await.unwrap();

        let TurnOutcome::Complete(transcript) = wizard.exchange_turn("Done.").await.unwrap() else {
            panic!("Expected the interview to complete");
        };
        assert_eq!(wizard.stage(), Stage::Live);
        assert_eq!(wizard.feedback_status(), FeedbackStatus::NotRequested);

        wizard.finish_session(transcript).await.unwrap();
        assert_eq!(wizard.stage(), Stage::Results);
        assert!(wizard.feedback().is_some());
    }

    #[tokio::test]
    async fn test_finish_session_only_once() {
        let wizard = wizard(two_step_chat(), good_feedback());
        fill(&wizard);
        wizard.start_session().await.unwrap();
        wizard.send_turn("A rate limiter.").await.unwrap();

        let err = wizard.finish_session(wizard.transcript()).await.unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongStage {
                expected: Stage::Live,
                actual: Stage::Results
            }
            .into()
        );
    }

    #[tokio::test]
    async fn test_feedback_failure_can_be_retried() {
        let mut structured = MockStructuredBackend::new();
        let mut calls = 0;
        structured
            .expect_generate_structured()
            .times(2)
            .returning(move |_, _| {
                calls += 1;
                if calls == 1 {
                    Ok("{\"score\": \"n/a\"}".to_string())
                } else {
                    Ok(FEEDBACK.to_string())
                }
            });
        let wizard = wizard(two_step_chat(), structured);
        fill(&wizard);
        wizard.start_session().await.unwrap();

        // The turn itself succeeds even though feedback does not.
        assert!(wizard.send_turn("Done.").await.unwrap().is_complete());
        assert_eq!(wizard.stage(), Stage::Results);
        assert!(matches!(
            wizard.feedback_status(),
            FeedbackStatus::Failed { .. }
        ));
        assert!(!wizard.can_enter(Stage::Results));

        wizard.retry_feedback().await.unwrap();
        assert!(wizard.feedback().is_some());
        assert_eq!(
            wizard.retry_feedback().await.unwrap_err(),
            ValidationError::FeedbackNotRetryable.into()
        );
    }

    #[tokio::test]
    async fn test_navigation_guards() {
        let wizard = wizard(two_step_chat(), good_feedback());
        assert!(wizard.can_enter(Stage::Setup));
        assert!(!wizard.can_enter(Stage::Live));
        assert!(!wizard.can_enter(Stage::Results));
        assert!(wizard.navigate(Stage::Live).is_err());
        assert!(wizard.navigate(Stage::Results).is_err());

        fill(&wizard);
        wizard.start_session().await.unwrap();
        assert!(!wizard.can_enter(Stage::Setup));
        assert!(wizard.navigate(Stage::Results).is_err());
        assert_eq!(wizard.snapshot().view, Stage::Live);

        wizard.send_turn("answer").await.unwrap();
        wizard.navigate(Stage::Live).unwrap();
        let snapshot = wizard.snapshot();
        assert_eq!(snapshot.view, Stage::Live);
        assert_eq!(snapshot.stage, Stage::Results);
    }

    #[tokio::test]
    async fn test_reset_returns_to_initial_state() {
        let wizard = wizard(two_step_chat(), good_feedback());
        fill(&wizard);
        wizard.start_session().await.unwrap();
        wizard.send_turn("answer").await.unwrap();

        wizard.reset();

        let snapshot = wizard.snapshot();
        assert_eq!(snapshot.stage, Stage::Setup);
        assert_eq!(snapshot.view, Stage::Setup);
        assert!(snapshot.transcript.is_empty());
        assert_eq!(snapshot.feedback, FeedbackStatus::NotRequested);
        assert_eq!(snapshot.parameters, SessionParameters::default());
        assert!(!snapshot.interview_complete);
        assert!(!snapshot.busy);
        assert!(wizard.feedback().is_none());
    }

    #[tokio::test]
    async fn test_update_parameters_is_all_or_nothing() {
        let wizard = wizard(MockChatBackend::new(), MockStructuredBackend::new());
        wizard
            .update_parameter(ParameterField::Role, "Backend Engineer")
            .unwrap();

        let err = wizard
            .update_parameters(&[
                (ParameterField::Role, "Chef"),
                (ParameterField::CompanyName, "Acme"),
                (ParameterField::Category, "astrology"),
            ])
            .unwrap_err();
        assert!(matches!(
            err,
            InterviewError::Validation(ValidationError::InvalidField { .. })
        ));
        let params = wizard.parameters();
        assert_eq!(params.role, "Backend Engineer");
        assert_eq!(params.company_name, "");
        assert_eq!(params.category, None);

        wizard
            .update_parameters(&[
                (ParameterField::Role, "Chef"),
                (ParameterField::CompanyName, "Acme"),
            ])
            .unwrap();
        assert_eq!(wizard.parameters().role, "Chef");
        assert_eq!(wizard.parameters().company_name, "Acme");
    }

    /// Chat backend whose first non-opening call blocks until released.
    struct GatedChat {
        gate: tokio::sync::Mutex<Option<oneshot::Receiver<()>>>,
        calls: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl ChatBackend for GatedChat {
        async fn send_chat(
            &self,
            _config: &crate::backend::ChatConfig,
            history: &[crate::backend::ChatMessage],
        ) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if history.len() > 1 {
                if let Some(gate) = self.gate.lock().await.take() {
                    let _ = gate.await;
                }
                return Ok(format!("Thanks, that is all. {COMPLETION_SENTINEL}"));
            }
            Ok("Welcome, first question.".to_string())
        }
    }

    /// Feedback backend that blocks until released.
    struct GatedFeedback {
        gate: tokio::sync::Mutex<Option<oneshot::Receiver<()>>>,
    }

    #[async_trait::async_trait]
    impl StructuredBackend for GatedFeedback {
        async fn generate_structured(
            &self,
            _prompt: &str,
            _schema: &serde_json::Value,
        ) -> anyhow::Result<String> {
            if let Some(gate) = self.gate.lock().await.take() {
                let _ = gate.await;
            }
            Ok(FEEDBACK.to_string())
        }
    }

    #[tokio::test]
    async fn test_reset_during_turn_allows_immediate_restart() {
        let (release, gate) = oneshot::channel();
        let chat = Arc::new(GatedChat {
            gate: tokio::sync::Mutex::new(Some(gate)),
            calls: AtomicUsize::new(0),
        });
        let wizard = Arc::new(SessionWizard::with_options(
            chat.clone(),
            Arc::new(MockStructuredBackend::new()),
            PromptSet::default(),
            Duration::ZERO,
        ));
        fill(&wizard);
        wizard.start_session().await.unwrap();

        let pending = {
            let wizard = Arc::clone(&wizard);
            tokio::spawn(async move { wizard.send_turn("My answer").await })
        };
        while !wizard.is_busy() {
            tokio::task::yield_now().await;
        }

        wizard.reset();
        let snapshot = wizard.snapshot();
        assert_eq!(snapshot.stage, Stage::Setup);
        assert!(!snapshot.busy);
        assert!(snapshot.transcript.is_empty());

        fill(&wizard);
        wizard.start_session().await.unwrap();
        assert_eq!(wizard.stage(), Stage::Live);
        assert_eq!(wizard.transcript().len(), 1);
        assert_eq!(chat.calls.load(Ordering::SeqCst), 3);

        release.send(()).unwrap();
        let err = pending.await.unwrap().unwrap_err();
        assert_eq!(err, ValidationError::SessionReset.into());
        assert_eq!(wizard.stage(), Stage::Live);
        assert_eq!(wizard.transcript().len(), 1);
        assert_eq!(wizard.feedback_status(), FeedbackStatus::NotRequested);
    }

    #[tokio::test]
    async fn test_reset_during_feedback_discards_result() {
        let (release, gate) = oneshot::channel();
        let structured = GatedFeedback {
            gate: tokio::sync::Mutex::new(Some(gate)),
        };
        let wizard = Arc::new(SessionWizard::with_options(
            Arc::new(two_step_chat()),
            Arc::new(structured),
            PromptSet::default(),
            Duration::ZERO,
        ));
        fill(&wizard);
        wizard.start_session().await.unwrap();

        let pending = {
            let wizard = Arc::clone(&wizard);
            tokio::spawn(async move { wizard.send_turn("My answer").await })
        };
        while wizard.feedback_status() != FeedbackStatus::Pending {
            tokio::task::yield_now().await;
        }

        wizard.reset();
        release.send(()).unwrap();
        // The turn itself completed; only its feedback is dropped.
        assert!(pending.await.unwrap().unwrap().is_complete());

        let snapshot = wizard.snapshot();
        assert_eq!(snapshot.stage, Stage::Setup);
        assert_eq!(snapshot.feedback, FeedbackStatus::NotRequested);
        assert!(snapshot.transcript.is_empty());
        assert!(!snapshot.busy);
        assert!(wizard.feedback().is_none());
    }

    #[tokio::test]
    async fn test_send_turn_outside_live_is_rejected() {
        let wizard = wizard(MockChatBackend::new(), MockStructuredBackend::new());
        let err = wizard.send_turn("hello").await.unwrap_err();
        assert_eq!(
            err,
            ValidationError::WrongStage {
                expected: Stage::Live,
                actual: Stage::Setup
            }
            .into()
        );
    }

    #[test]
    fn test_snapshot_serializes_for_front_end() {
        let wizard = wizard(MockChatBackend::new(), MockStructuredBackend::new());
        let json = serde_json::to_value(wizard.snapshot()).unwrap();
        assert_eq!(json["stage"], "setup");
        assert_eq!(json["feedback"]["status"], "notRequested");
        assert_eq!(json["parametersComplete"], false);
        assert_eq!(json["navigation"]["setup"], true);
    }
}
