use crate::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InterviewCategory {
    Behavioral,
    Technical,
    SystemDesign,
    Hr,
}

impl InterviewCategory {
    pub const ALL: [InterviewCategory; 4] = [
        InterviewCategory::Behavioral,
        InterviewCategory::Technical,
        InterviewCategory::SystemDesign,
        InterviewCategory::Hr,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InterviewCategory::Behavioral => "behavioral",
            InterviewCategory::Technical => "technical",
            InterviewCategory::SystemDesign => "system-design",
            InterviewCategory::Hr => "hr",
        }
    }
}

impl fmt::Display for InterviewCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterviewCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        InterviewCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == wanted)
            .ok_or_else(|| ValidationError::InvalidField {
                field: ParameterField::Category.to_string(),
                value: s.to_string(),
            })
    }
}

/// The individually editable fields of [`SessionParameters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterField {
    Role,
    CompanyName,
    Category,
    TargetDate,
}

impl fmt::Display for ParameterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterField::Role => "role",
            ParameterField::CompanyName => "companyName",
            ParameterField::Category => "category",
            ParameterField::TargetDate => "targetDate",
        };
        f.write_str(name)
    }
}

impl FromStr for ParameterField {
    type Err = ValidationError;

    // Accepts the form field names used by the web front-end as well.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "role" => Ok(ParameterField::Role),
            "companyName" | "company_name" | "company" => Ok(ParameterField::CompanyName),
            "category" | "interviewType" | "interview_type" => Ok(ParameterField::Category),
            "targetDate" | "target_date" | "interviewDate" | "interview_date" => {
                Ok(ParameterField::TargetDate)
            }
            other => Err(ValidationError::InvalidField {
                field: "field".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

/// What the candidate is preparing for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionParameters {
    pub role: String,
    pub company_name: String,
    pub category: Option<InterviewCategory>,
    pub target_date: Option<NaiveDate>,
}

impl SessionParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one field from its textual form. An empty value clears the field.
    /// A value that does not parse leaves the field untouched.
    pub fn set(&mut self, field: ParameterField, value: &str) -> Result<(), ValidationError> {
        let trimmed = value.trim();
        match field {
            ParameterField::Role => self.role = value.to_string(),
            ParameterField::CompanyName => self.company_name = value.to_string(),
            ParameterField::Category => {
                self.category = if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.parse()?)
                };
            }
            ParameterField::TargetDate => {
                self.target_date = if trimmed.is_empty() {
                    None
                } else {
                    Some(NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| {
                        ValidationError::InvalidField {
                            field: field.to_string(),
                            value: value.to_string(),
                        }
                    })?)
                };
            }
        }
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn missing_fields(&self) -> Vec<ParameterField> {
        let mut missing = Vec::new();
        if self.role.trim().is_empty() {
            missing.push(ParameterField::Role);
        }
        if self.company_name.trim().is_empty() {
            missing.push(ParameterField::CompanyName);
        }
        if self.category.is_none() {
            missing.push(ParameterField::Category);
        }
        if self.target_date.is_none() {
            missing.push(ParameterField::TargetDate);
        }
        missing
    }
}
