use crate::wizard::Stage;

/// A precondition that was not met. These are normally prevented by the
/// presentation layer disabling the corresponding control.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("session parameters are incomplete")]
    IncompleteParameters,
    #[error("operation requires the {expected} stage but the wizard is in {actual}")]
    WrongStage { expected: Stage, actual: Stage },
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("a request is already in flight")]
    RequestInFlight,
    #[error("the interviewer has not opened the conversation yet")]
    ConversationNotOpen,
    #[error("the conversation has already been opened")]
    ConversationAlreadyOpen,
    #[error("the interview is already complete")]
    InterviewComplete,
    #[error("the session was reset while the request was in flight")]
    SessionReset,
    #[error("invalid value for {field}: {value}")]
    InvalidField { field: String, value: String },
    #[error("feedback can only be retried after a failed attempt")]
    FeedbackNotRetryable,
}

/// Errors surfaced by the interview core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterviewError {
    /// Network or transport failure talking to a remote AI service.
    #[error("remote service unavailable: {0}")]
    RemoteUnavailable(String),
    /// The remote answered, but not in the shape we asked for.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl InterviewError {
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            InterviewError::RemoteUnavailable(_) | InterviewError::MalformedResponse(_)
        )
    }

    /// Wraps a provider failure, keeping the whole context chain in the message.
    pub fn remote(err: anyhow::Error) -> Self {
        InterviewError::RemoteUnavailable(format!("{err:#}"))
    }
}

pub type Result<T, E = InterviewError> = std::result::Result<T, E>;
