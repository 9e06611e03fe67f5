use crate::llm::LanguageModel;
use crate::pipeline::PipelineError;
use log::debug;
use std::sync::Arc;

const FENCE: &str = "```";

/// Language tags dropped after a fence even when text follows on the same line.
const KNOWN_TAGS: [&str; 4] = ["sql", "json", "postgresql", "pgsql"];

/// Remove every code-fence marker from `text` and trim the remainder.
///
/// A marker is a triple backtick plus the language tag right after it. Known
/// tags (` ```sql `, ` ```json `, any case) are always dropped. Other tags are
/// dropped only when they run to the end of the line, so in ` ```SELECT 1``` `
/// the query is kept.
pub fn strip_fences(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text.trim();

    while let Some(pos) = rest.find(FENCE) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos + FENCE.len()..];

        let tag_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '+'))
            .unwrap_or(rest.len());
        let (tag, after_tag) = rest.split_at(tag_len);
        let known = KNOWN_TAGS.iter().any(|known| tag.eq_ignore_ascii_case(known));
        if known
            || after_tag.is_empty()
            || after_tag.starts_with('\n')
            || after_tag.starts_with("\r\n")
        {
            rest = after_tag;
        }
    }
    out.push_str(rest);

    out.trim().to_string()
}

/// Turns a grounding prompt into a single executable query.
pub struct QueryTranslator {
    model: Arc<dyn LanguageModel>,
    max_tokens: u32,
}

impl QueryTranslator {
    pub fn new(model: Arc<dyn LanguageModel>, max_tokens: u32) -> Self {
        Self { model, max_tokens }
    }

    pub async fn translate(&self, prompt: &str) -> Result<String, PipelineError> {
        let text = self
            .model
            .complete(prompt, self.max_tokens)
            .await?
            .ok_or_else(|| {
                PipelineError::MalformedModelOutput(
                    "Model response contained no text".to_string(),
                )
            })?;

        let query = strip_fences(&text);
        if query.is_empty() {
            return Err(PipelineError::MalformedModelOutput(
                "Model response contained no query".to_string(),
            ));
        }

        debug!("Generated query: {}", query);
        Ok(query)
    }
}
