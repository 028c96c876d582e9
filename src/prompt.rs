//! Prompt assembly for answer generation.

use crate::embeddings::Chunk;

/// Separator placed between chunk contents in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n---\n";
/// Stand-in for the image description when no image was sent.
pub const NO_IMAGE: &str = "No image provided.";

/// Joins retrieved chunk contents into one context block.
pub fn render_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// Builds the single prompt sent to the answer model.
pub fn build_prompt(question: &str, context: &str, image_description: Option<&str>) -> String {
    let description = image_description
        .filter(|text| !text.trim().is_empty())
        .unwrap_or(NO_IMAGE);
    let mut prompt = String::with_capacity(context.len() + question.len() + 256);
    prompt.push_str("You are an expert assistant.Answer the question using the following context and image description.\n");
    prompt.push_str("Be concise and accurate. Use the image information if it helps to answer the question.\n\n");
    prompt.push_str("Context:\n");
    prompt.push_str(context);
    prompt.push_str("\n\nImage Description:\n");
    prompt.push_str(description);
    prompt.push_str("\n\nQuestion: ");
    prompt.push_str(question);
    prompt.push('\n');
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn context_joins_with_separator() {
        let chunks = vec![
            Chunk::new("a", 0, "alpha", None),
            Chunk::new("b", 1, "beta", None),
        ];
        assert_eq!(render_context(&chunks), "alpha\n---\nbeta");
        assert_eq!(render_context(&[]), "");
    }

    #[test]
    fn prompt_layout() {
        let prompt = build_prompt("What is RAG?", "ctx", Some("a chart"));
        assert_eq!(
            prompt,
            "You are an expert assistant.Answer the question using the following context and image description.\n\
             Be concise and accurate. Use the image information if it helps to answer the question.\n\n\
             Context:\nctx\n\n\
             Image Description:\na chart\n\n\
             Question: What is RAG?\n"
        );
    }

    #[test]
    fn missing_description_uses_marker() {
        assert!(build_prompt("q", "", None).contains("Image Description:\nNo image provided.\n"));
        assert!(build_prompt("q", "", Some("")).contains(NO_IMAGE));
    }
}
