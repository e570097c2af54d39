//! Knowledge system type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One pre-authored question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// Text that gets embedded and matched against user messages
    pub question: String,

    /// Text returned verbatim when this entry is the best match
    pub answer: String,
}

impl KnowledgeEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Payload stored beside each question vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerPayload {
    pub answer: String,
}

/// Reply to one inbound message, serialized as `{ "response": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub response: String,

    /// How the response was produced
    #[serde(skip)]
    pub outcome: AnswerOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnswerOutcome {
    /// A knowledge entry matched with this cosine score
    Matched { score: f32 },
    /// Index was searched but nothing qualified
    NoMatch,
    /// Index unavailable or a dependency failed; a fallback was sent
    Unavailable,
}

/// Result of a query against the published index.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Matched { answer: String, score: f32 },
    Fallback,
}

/// Description of a published index.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexStats {
    pub entries: usize,
    pub dimensions: usize,
    pub provider: String,
    pub model: String,
    /// Increments on every successful publish
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    pub build_millis: u64,
}

/// Lifecycle state of the retrieval service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// No index published and no build running
    Absent,
    /// First build in progress
    Building,
    /// Index published
    Ready,
    /// Index published, replacement build in progress
    Refreshing,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Phase::Absent => "absent",
            Phase::Building => "building",
            Phase::Ready => "ready",
            Phase::Refreshing => "refreshing",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_serializes_response_only() {
        let answer = Answer {
            response: "Block C".to_string(),
            outcome: AnswerOutcome::Matched { score: 0.92 },
        };
        assert_eq!(
            serde_json::to_value(&answer).unwrap(),
            serde_json::json!({"response": "Block C"})
        );
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Refreshing.to_string(), "refreshing");
        assert_eq!(serde_json::to_value(Phase::Ready).unwrap(), "ready");
    }
}
