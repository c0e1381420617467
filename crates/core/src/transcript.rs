use crate::backend::ChatMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

impl Speaker {
    pub fn label(self) -> &'static str {
        match self {
            Speaker::User => "USER",
            Speaker::Assistant => "ASSISTANT",
        }
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl TranscriptEntry {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            created_at: Utc::now(),
        }
    }
}

/// Returned when an append would break the transcript's ordering rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("the first transcript entry must come from the assistant")]
pub struct FirstEntryNotAssistant;

/// Append-only record of one session's turns.
///
/// The first entry is always the assistant's opening question, and
/// `created_at` never decreases from one entry to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, mut entry: TranscriptEntry) -> Result<(), FirstEntryNotAssistant> {
        if self.entries.is_empty() && entry.speaker != Speaker::Assistant {
            return Err(FirstEntryNotAssistant);
        }
        // Wall clocks can step backwards; ordering is by append.
        if let Some(last) = self.entries.last() {
            if entry.created_at < last.created_at {
                entry.created_at = last.created_at;
            }
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// One `SPEAKER: text` line per entry.
    pub fn render(&self) -> String {
        render_entries(&self.entries)
    }

    /// The transcript as the message history a chat backend expects.
    pub fn to_history(&self) -> Vec<ChatMessage> {
        self.entries
            .iter()
            .map(|entry| match entry.speaker {
                Speaker::User => ChatMessage::user(entry.text.clone()),
                Speaker::Assistant => ChatMessage::model(entry.text.clone()),
            })
            .collect()
    }
}

pub fn render_entries(entries: &[TranscriptEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{}: {}", entry.speaker, entry.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChatRole;
    use chrono::Duration;

    fn opened() -> Transcript {
        let mut transcript = Transcript::new();
        transcript
            .push(TranscriptEntry::new(
                Speaker::Assistant,
                "Tell me about yourself.",
            ))
            .unwrap();
        transcript
    }

    #[test]
    fn test_first_entry_must_be_assistant() {
        let mut transcript = Transcript::new();
        let result = transcript.push(TranscriptEntry::new(Speaker::User, "Hi"));
        assert_eq!(result, Err(FirstEntryNotAssistant));
        assert!(transcript.is_empty());
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let mut transcript = opened();
        let first_at = transcript.entries()[0].created_at;

        let mut stale = TranscriptEntry::new(Speaker::User, "I built a caching layer");
        stale.created_at = first_at - Duration::seconds(30);
        transcript.push(stale).unwrap();

        assert_eq!(transcript.len(), 2);
        assert!(transcript.entries()[1].created_at >= first_at);
    }

    #[test]
    fn test_render_labels_each_line() {
        let mut transcript = opened();
        transcript
            .push(TranscriptEntry::new(Speaker::User, "I lead a small team."))
            .unwrap();

        assert_eq!(
            transcript.render(),
            "ASSISTANT: Tell me about yourself.\nUSER: I lead a small team."
        );
    }

    #[test]
    fn test_history_maps_speakers_to_roles() {
        let mut transcript = opened();
        transcript
            .push(TranscriptEntry::new(Speaker::User, "Sure."))
            .unwrap();

        let history = transcript.to_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::Model);
        assert_eq!(history[1].role, ChatRole::User);
        assert_eq!(history[1].text, "Sure.");
    }

    #[test]
    fn test_clear_allows_a_new_opening() {
        let mut transcript = opened();
        transcript.clear();
        assert!(transcript.is_empty());
        assert!(transcript.push(TranscriptEntry::new(Speaker::User, "x")).is_err());
    }
}
