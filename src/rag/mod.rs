pub mod embeddings;
pub mod retriever;
pub mod vector_store;

use anyhow::{Context, Result};

use crate::llm::ChatModel;
use crate::models::{DocumentChunk, QuestionContext};

use self::retriever::Retriever;

/// Fixed reply the answer prompt asks for when the context cannot answer the
/// question.
pub const NO_INFORMATION_ANSWER: &str =
    "I'm sorry, I don't have any information about this topic. Please contact help@polysight.com";

const STANDALONE_QUESTION_TEMPLATE: &str = "\
Transform the given question into a standalone, complete question that can be understood without additional context.
Retain the original language of the question.

Question: {question}
Standalone question:";

const ANSWER_TEMPLATE: &str = "\
You are a helpful assistant who answers questions about Polysight based on the provided context.
Instructions:

- Respond only using the information contained in the context.
- If the answer cannot be found in the context, say: \"I'm sorry, I don't have any information about this topic. Please contact help@polysight.com\"
- Use a friendly, natural tone.
- Provide specific, helpful answers.
- Use English.

Context:
{context}

Question:
{question}

Answer:";

/// Two-stage question-answering pipeline: rewrite the question into a
/// standalone form, retrieve context for it, then generate the answer. Each
/// stage takes the request context and returns it augmented, composed by
/// plain sequential calls.
pub struct RagChain {
    llm: ChatModel,
    retriever: Retriever,
}

impl RagChain {
    pub fn new(llm: ChatModel, retriever: Retriever) -> Self {
        Self { llm, retriever }
    }

    pub async fn answer(&self, question: &str) -> Result<QuestionContext> {
        let ctx = QuestionContext::new(question);
        let ctx = self.rewrite_question(ctx).await?;
        let ctx = self.retrieve_context(ctx).await?;
        self.generate_answer(ctx).await
    }

    async fn rewrite_question(&self, mut ctx: QuestionContext) -> Result<QuestionContext> {
        let prompt = standalone_question_prompt(&ctx.original_question);
        let standalone = self.llm.invoke(&prompt).await?;
        tracing::debug!("Standalone question: {}", standalone);
        ctx.standalone_question = Some(standalone);
        Ok(ctx)
    }

    async fn retrieve_context(&self, mut ctx: QuestionContext) -> Result<QuestionContext> {
        let standalone = ctx
            .standalone_question
            .as_deref()
            .context("standalone question missing before retrieval")?;
        let chunks = self.retriever.retrieve(standalone).await?;
        // An empty context still reaches the model; the answer template tells
        // it to fall back to the fixed no-information reply.
        ctx.retrieved_context = Some(combine_chunks(&chunks));
        Ok(ctx)
    }

    async fn generate_answer(&self, mut ctx: QuestionContext) -> Result<QuestionContext> {
        let context = ctx
            .retrieved_context
            .as_deref()
            .context("retrieved context missing before answer generation")?;
        let prompt = answer_prompt(context, &ctx.original_question);
        let answer = self.llm.invoke(&prompt).await?;
        ctx.answer = Some(answer);
        Ok(ctx)
    }
}

/// Joins chunk texts in retrieval order, separated by blank lines.
pub fn combine_chunks(chunks: &[DocumentChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn standalone_question_prompt(question: &str) -> String {
    STANDALONE_QUESTION_TEMPLATE.replace("{question}", question)
}

fn answer_prompt(context: &str, question: &str) -> String {
    ANSWER_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(text: &str) -> DocumentChunk {
        DocumentChunk {
            text: text.to_string(),
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_combine_chunks_blank_line_separated() {
        let chunks = vec![chunk("first"), chunk("second"), chunk("third")];
        assert_eq!(combine_chunks(&chunks), "first\n\nsecond\n\nthird");
    }

    #[test]
    fn test_combine_chunks_empty() {
        assert_eq!(combine_chunks(&[]), "");
    }

    #[test]
    fn test_standalone_prompt_embeds_question() {
        let prompt = standalone_question_prompt("what about RAM?");
        assert!(prompt.contains("Question: what about RAM?"));
        assert!(prompt.ends_with("Standalone question:"));
    }

    #[test]
    fn test_answer_prompt_embeds_context_and_question() {
        let prompt = answer_prompt("Polysight requires 8GB RAM", "minimum requirements?");
        assert!(prompt.contains("Context:\nPolysight requires 8GB RAM"));
        assert!(prompt.contains("Question:\nminimum requirements?"));
        assert!(prompt.contains(NO_INFORMATION_ANSWER));
    }
}
