use crate::parameters::SessionParameters;
use std::collections::HashMap;

/// Marker the interviewer model emits once the interview portion is over.
pub const COMPLETION_SENTINEL: &str = "[INTERVIEW_COMPLETE]";

/// Sent on the candidate's behalf to make the interviewer introduce itself.
pub const OPENING_MESSAGE: &str = "Hello. Please start the interview.";

const DEFAULT_INTERVIEWER: &str = "\
You are an expert interviewer for the position of {role} at {company}.
The interview type is {category}. The candidate's interview is scheduled for {target_date}.

GUIDELINES:
1. Be professional, slightly challenging, but encouraging.
2. Ask exactly ONE question at a time.
3. Start by introducing yourself and asking the first question.
4. React to the candidate's answers naturally. If they are vague, ask for clarification.
5. After about 5-7 questions, conclude the interview and say \"[INTERVIEW_COMPLETE]\".
6. Do not provide feedback during the interview; save it for the final stage.
";

const DEFAULT_FEEDBACK: &str = "\
Based on the following {category} interview transcript for {role} at {company}, \
provide a detailed professional evaluation in JSON format.

Respond with a JSON object with exactly these fields:
- \"score\": a number from 0 to 100
- \"strengths\": an array of short strings
- \"improvements\": an array of short strings
- \"overallSummary\": a paragraph summarising the performance

Transcript:
{transcript}
";

/// The two templates the core renders. Loaded files override the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    pub interviewer: String,
    pub feedback: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            interviewer: DEFAULT_INTERVIEWER.to_string(),
            feedback: DEFAULT_FEEDBACK.to_string(),
        }
    }
}

impl PromptSet {
    /// Builds a set from prompt files keyed by file stem (`interviewer`, `feedback`).
    pub fn from_map(mut prompts: HashMap<String, String>) -> Self {
        let mut set = Self::default();
        if let Some(interviewer) = prompts.remove("interviewer") {
            set.interviewer = interviewer;
        }
        if let Some(feedback) = prompts.remove("feedback") {
            set.feedback = feedback;
        }
        if !prompts.is_empty() {
            tracing::debug!("Ignoring unknown prompt files: {:?}", prompts.keys());
        }
        set
    }

    pub fn interviewer_instruction(&self, params: &SessionParameters) -> String {
        render(&self.interviewer, &parameter_vars(params))
    }

    pub fn feedback_prompt(&self, params: &SessionParameters, transcript: &str) -> String {
        let mut vars = parameter_vars(params);
        vars.push(("transcript", transcript.to_string()));
        render(&self.feedback, &vars)
    }
}

fn parameter_vars(params: &SessionParameters) -> Vec<(&'static str, String)> {
    vec![
        ("role", params.role.trim().to_string()),
        ("company", params.company_name.trim().to_string()),
        (
            "category",
            params
                .category
                .map(|c| c.to_string())
                .unwrap_or_default(),
        ),
        (
            "target_date",
            params
                .target_date
                .map(|d| d.to_string())
                .unwrap_or_default(),
        ),
    ]
}

/// Replaces `{name}` placeholders in one pass over the template, so text
/// inside substituted values is never expanded. Unknown placeholders are left
/// as-is.
pub fn render(template: &str, vars: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let known = after.find('}').and_then(|close| {
            let name = &after[..close];
            vars.iter()
                .find(|(var, _)| *var == name)
                .map(|(_, value)| (value, close))
        });
        match known {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
