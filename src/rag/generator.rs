//! Grounded answer generation.
//!
//! Assembles the generation prompt from retrieved chunks and recent
//! conversation history, calls the generation provider once, and projects
//! the chunks that actually made it into the prompt as source citations.
//! When retrieval came back empty the canned out-of-scope answer is
//! returned without any provider call.

use std::sync::Arc;

use crate::provider::GenerationProvider;
use crate::types::{ChatTurn, Result, ScoredChunk, SourceCitation, TurnRole};

/// Answer returned when nothing in the corpus is relevant to the question.
pub const OUT_OF_SCOPE_ANSWER: &str = "The answer to this question was not found in the textbook. \
It appears to be outside the scope of the indexed material, so I can't \
provide a grounded response. Try rephrasing, or ask about a topic the \
textbook covers.";

const SYSTEM_INSTRUCTION: &str = "You are a teaching assistant for a textbook. Answer the \
question using only the excerpts below. If the excerpts do not contain the answer, say so \
plainly instead of guessing. Cite no external knowledge.";

/// Maximum characters of a chunk shown in a citation excerpt.
const EXCERPT_CHARS: usize = 200;

pub struct GeneratedAnswer {
    pub response: String,
    pub sources: Vec<SourceCitation>,
}

pub struct AnswerGenerator {
    provider: Arc<dyn GenerationProvider>,
    context_char_budget: usize,
    max_history_turns: usize,
}

impl AnswerGenerator {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        context_char_budget: usize,
        max_history_turns: usize,
    ) -> Self {
        Self {
            provider,
            context_char_budget,
            max_history_turns,
        }
    }

    /// Generate a grounded answer for `query` over the retrieved chunks.
    ///
    /// `sources` in the result lists exactly the chunks included in the
    /// prompt; chunks that did not fit the context budget are dropped whole
    /// and never cited.
    pub async fn generate(
        &self,
        query: &str,
        history: &[ChatTurn],
        retrieved: &[ScoredChunk],
    ) -> Result<GeneratedAnswer> {
        if retrieved.is_empty() {
            return Ok(GeneratedAnswer {
                response: OUT_OF_SCOPE_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let included = self.fit_to_budget(retrieved);
        let prompt = self.build_prompt(query, history, &included);

        let response = self.provider.generate(&prompt).await?;

        let sources = included.iter().map(|sc| citation(sc)).collect();
        Ok(GeneratedAnswer { response, sources })
    }

    /// Keep chunks in relevance order while their texts fit the budget.
    fn fit_to_budget<'a>(&self, retrieved: &'a [ScoredChunk]) -> Vec<&'a ScoredChunk> {
        let mut included = Vec::new();
        let mut used = 0usize;

        for scored in retrieved {
            let cost = scored.chunk.text.len();
            if used + cost > self.context_char_budget && !included.is_empty() {
                break;
            }
            included.push(scored);
            used += cost;
        }
        included
    }

    fn build_prompt(&self, query: &str, history: &[ChatTurn], included: &[&ScoredChunk]) -> String {
        let mut prompt = String::new();
        prompt.push_str(SYSTEM_INSTRUCTION);
        prompt.push_str("\n\n");

        for (i, scored) in included.iter().enumerate() {
            prompt.push_str(&format!(
                "[Excerpt {} - {}]\n{}\n\n",
                i + 1,
                scored.chunk.source_label,
                scored.chunk.text
            ));
        }

        let start = history.len().saturating_sub(self.max_history_turns);
        for turn in &history[start..] {
            let role = match turn.role {
                TurnRole::User => "User",
                TurnRole::Assistant => "Assistant",
            };
            prompt.push_str(&format!("{}: {}\n", role, turn.content));
        }

        prompt.push_str(&format!("User: {}\nAssistant:", query));
        prompt
    }
}

fn citation(scored: &ScoredChunk) -> SourceCitation {
    SourceCitation {
        source: scored.chunk.source_label.clone(),
        text: truncate_chars(&scored.chunk.text, EXCERPT_CHARS),
        score: scored.score,
    }
}

/// First `max` characters of `text`, with an ellipsis when truncated.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max).collect();
    format!("{}...", truncated.trim_end())
}
