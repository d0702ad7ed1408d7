use serde::{Deserialize, Serialize};

/// A bounded-length fragment of the knowledge base, the unit of retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub metadata: serde_json::Value,
}

/// Search hit: a chunk with its similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Result of the collection metadata check, dispatched by exhaustive match
/// instead of nested error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    Absent,
    Empty,
    Populated(u64),
}

/// Request-scoped state flowing through the question-answering pipeline.
/// Fields are populated in dependency order: the standalone question before
/// retrieval, the retrieved context before the answer.
#[derive(Debug, Clone)]
pub struct QuestionContext {
    pub original_question: String,
    pub standalone_question: Option<String>,
    pub retrieved_context: Option<String>,
    pub answer: Option<String>,
}

impl QuestionContext {
    pub fn new(question: &str) -> Self {
        Self {
            original_question: question.to_string(),
            standalone_question: None,
            retrieved_context: None,
            answer: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_status_dispatch() {
        let status = CollectionStatus::Populated(42);
        let described = match status {
            CollectionStatus::Absent => "absent".to_string(),
            CollectionStatus::Empty => "empty".to_string(),
            CollectionStatus::Populated(n) => format!("{} points", n),
        };
        assert_eq!(described, "42 points");
    }

    #[test]
    fn test_question_context_starts_unpopulated() {
        let ctx = QuestionContext::new("What is Polysight?");
        assert_eq!(ctx.original_question, "What is Polysight?");
        assert!(ctx.standalone_question.is_none());
        assert!(ctx.retrieved_context.is_none());
        assert!(ctx.answer.is_none());
    }
}
