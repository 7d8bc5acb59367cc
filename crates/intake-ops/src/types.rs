//! Operation results

use serde::{Deserialize, Serialize};

use intake_core::SelectedTeam;

/// Outcome of the sufficiency check.
///
/// `questions` is empty iff `sufficient`; `total_questions == questions.len()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SufficiencyReport {
    pub sufficient: bool,
    pub questions: Vec<String>,
    pub total_questions: usize,
}

impl SufficiencyReport {
    pub fn sufficient() -> Self {
        Self {
            sufficient: true,
            questions: Vec::new(),
            total_questions: 0,
        }
    }

    /// Insufficient verdict capped at `max_questions`. Blank questions are dropped;
    /// an empty list collapses to a sufficient report.
    pub fn with_questions(questions: Vec<String>, max_questions: usize) -> Self {
        let questions: Vec<String> = questions
            .into_iter()
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .take(max_questions)
            .collect();

        if questions.is_empty() {
            return Self::sufficient();
        }
        Self {
            sufficient: false,
            total_questions: questions.len(),
            questions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedAnswer {
    pub question: String,
    pub suggested_answer: String,
    /// Set when `suggested_answer` is the fallback prompt rather than a real proposal
    #[serde(default)]
    pub fallback: bool,
}

impl SuggestedAnswer {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            suggested_answer: answer.into(),
            fallback: false,
        }
    }

    pub fn fallback(question: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            suggested_answer: prompt.into(),
            fallback: true,
        }
    }

    /// The proposal, unless it is only the fallback prompt.
    pub fn proposal(&self) -> Option<&str> {
        (!self.fallback).then_some(self.suggested_answer.as_str())
    }
}

/// Result of an edit. `new_team` is set only when the instruction moved the ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOutcome {
    pub edited_task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_team: Option<SelectedTeam>,
    /// `false` when the reply could not be parsed and the original was returned
    pub applied: bool,
}

impl EditOutcome {
    pub fn unchanged(current_task: impl Into<String>) -> Self {
        Self {
            edited_task: current_task.into(),
            new_team: None,
            applied: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_caps_and_normalizes() {
        let questions: Vec<String> = (1..=10).map(|i| format!("Вопрос {}?", i)).collect();
        let report = SufficiencyReport::with_questions(questions, 7);
        assert!(!report.sufficient);
        assert_eq!(report.questions.len(), 7);
        assert_eq!(report.total_questions, 7);

        let report = SufficiencyReport::with_questions(vec!["  ".into()], 7);
        assert!(report.sufficient);
        assert_eq!(report.total_questions, 0);
    }

    #[test]
    fn test_proposal_skips_fallback() {
        assert_eq!(SuggestedAnswer::new("Где?", "Москва").proposal(), Some("Москва"));
        assert_eq!(
            SuggestedAnswer::fallback("Где?", "Предложите ваш вариант").proposal(),
            None
        );
    }
}
