//! Core logic for guided mock-interview sessions.
//!
//! A [`wizard::SessionWizard`] walks a candidate from setup, through a live
//! interview with a remote conversational model, to an AI-generated
//! evaluation. Remote services sit behind the traits in [`backend`] so the
//! same logic runs against Gemini, OpenAI, or test doubles.

pub mod backend;
pub mod conversation;
pub mod error;
pub mod feedback;
pub mod parameters;
pub mod prompts;
pub mod transcript;
pub mod wizard;

pub use backend::{ChatBackend, ChatConfig, ChatMessage, ChatRole, StructuredBackend};
pub use conversation::{ConversationDriver, TurnOutcome};
pub use error::{InterviewError, ValidationError};
pub use feedback::{FeedbackGenerator, FeedbackResult};
pub use parameters::{InterviewCategory, ParameterField, SessionParameters};
pub use prompts::PromptSet;
pub use transcript::{Speaker, Transcript, TranscriptEntry};
pub use wizard::{FeedbackStatus, SessionWizard, Stage, WizardSnapshot};
