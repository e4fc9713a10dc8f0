//! Answer generation and prompt assembly.

use std::fmt::Write;

use async_trait::async_trait;

use crate::error::Result;

/// A language model that turns a grounded prompt into an answer.
///
/// Failures (quota, timeout, authentication) are returned as
/// [`RagError::GeneratorError`](crate::RagError::GeneratorError), never as an
/// empty answer.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate an answer for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// The registered name of this generator.
    fn name(&self) -> &str;

    /// Release held network or model resources.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Build the prompt sent to the generator.
///
/// The layout is `Question: {query}`, a blank line, `Relevant documents:`,
/// then each context under a `=== Document N ===` separator, in the order
/// given (reranked order, most relevant first).
///
/// # Example
///
/// ```rust
/// let prompt = convrag::build_prompt("Who?", &["Alice".to_string()]);
/// assert_eq!(prompt, "Question: Who?\n\nRelevant documents:\n\n=== Document 1 ===\nAlice");
/// ```
pub fn build_prompt(query: &str, contexts: &[String]) -> String {
    let mut prompt = format!("Question: {query}\n\nRelevant documents:\n");
    for (i, context) in contexts.iter().enumerate() {
        let _ = write!(prompt, "\n=== Document {} ===\n{context}", i + 1);
    }
    prompt
}

/// Build the prompt asking the generator for reader questions about a
/// fragment.
///
/// Used at ingestion by [`Architecture::BrainRag`](crate::Architecture::BrainRag).
pub fn question_prompt(fragment: &str) -> String {
    format!(
        "Based on the following text, generate a list of questions that a reader might ask \
         to better understand, analyze, or remember the content. Include factual questions \
         (who, what, when, where, why, how), comprehension questions, and interpretive \
         questions. Do not answer the questions, only list them.\n\n\
         Text:\n{fragment}\n\n\
         Expected output format:\n- Question 1\n- Question 2\n- Question 3"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_without_contexts_keeps_header() {
        assert_eq!(build_prompt("q", &[]), "Question: q\n\nRelevant documents:\n");
    }

    #[test]
    fn prompt_numbers_documents_in_order() {
        let prompt = build_prompt("q", &["first".to_string(), "second".to_string()]);
        let first = prompt.find("=== Document 1 ===\nfirst").unwrap();
        let second = prompt.find("=== Document 2 ===\nsecond").unwrap();
        assert!(first < second);
    }

    #[test]
    fn question_prompt_embeds_fragment() {
        let prompt = question_prompt("The cat sat.");
        assert!(prompt.contains("Text:\nThe cat sat.\n"));
        assert!(prompt.starts_with("Based on the following text"));
    }
}
