//! Prompt construction for the generic reasoner.
//!
//! Every builder takes already-bounded content; callers apply the text budget.

use serde_json::{Map, Value};

use crate::normalizer::{truncate_chars, ContentKind, ExtractedContent};

/// System prompt shared by all requests
pub fn system_prompt() -> &'static str {
    "You are an analysis assistant behind a multi-domain gateway. \
     Answer in the language of the user's request. Be concise and concrete: \
     lead with the key findings, then supporting detail. \
     If the input is insufficient for a conclusion, say what is missing."
}

/// Free-text chat turn
pub fn chat_prompt(text: &str, domain: Option<&str>, hint: Option<&str>) -> String {
    let mut prompt = String::new();
    if let Some(domain) = domain {
        prompt.push_str(&format!("Domain context: {}\n\n", domain));
    }
    push_hint(&mut prompt, hint);
    prompt.push_str(text.trim());
    prompt
}

/// Summary of a structured payload no analyzer claimed
pub fn summarize_json_prompt(
    payload: &Map<String, Value>,
    domain: Option<&str>,
    hint: Option<&str>,
    budget: usize,
) -> String {
    let serialized = serde_json::to_string_pretty(payload).unwrap_or_default();
    let (body, truncated) = truncate_chars(&serialized, budget);

    let mut prompt = String::from("Summarize the following structured data and point out anything notable");
    match domain {
        Some(domain) => prompt.push_str(&format!(" for the '{}' domain.\n\n", domain)),
        None => prompt.push_str(".\n\n"),
    }
    push_hint(&mut prompt, hint);
    prompt.push_str("```json\n");
    prompt.push_str(&body);
    if truncated {
        prompt.push_str("\n... (truncated)");
    }
    prompt.push_str("\n```");
    prompt
}

/// Analysis of an extracted document or table
pub fn document_prompt(filename: &str, content: &ExtractedContent, hint: Option<&str>) -> String {
    let mut prompt = match content.kind {
        ContentKind::Text => format!("Analyze the text extracted from the document '{}'.\n\n", filename),
        ContentKind::Table => format!(
            "Analyze the table extracted from '{}' ({} rows shown as JSON objects keyed by column header).\n\n",
            filename,
            content.rows.len()
        ),
    };
    push_hint(&mut prompt, hint);
    prompt.push_str("---\n");
    prompt.push_str(&content.text);
    if content.truncated {
        prompt.push_str("\n... (truncated)");
    }
    prompt.push_str("\n---");
    prompt
}

/// Instruction accompanying an uploaded image
pub fn vision_prompt(filename: &str, hint: Option<&str>) -> String {
    match hint.map(str::trim).filter(|h| !h.is_empty()) {
        Some(hint) => format!("Image '{}'. {}", filename, hint),
        None => format!(
            "Describe the image '{}' and extract any text, figures or readings it contains.",
            filename
        ),
    }
}

fn push_hint(prompt: &mut String, hint: Option<&str>) {
    if let Some(hint) = hint.map(str::trim).filter(|h| !h.is_empty()) {
        prompt.push_str(&format!("Instructions from the user: {}\n\n", hint));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_prompt_includes_hint_and_domain() {
        let prompt = chat_prompt("  hello  ", Some("medical"), Some("answer briefly"));
        assert!(prompt.contains("Domain context: medical"));
        assert!(prompt.contains("answer briefly"));
        assert!(prompt.ends_with("hello"));
    }

    #[test]
    fn test_blank_hint_ignored() {
        assert_eq!(chat_prompt("hi", None, Some("   ")), "hi");
    }

    #[test]
    fn test_summarize_json_bounded() {
        let mut payload = Map::new();
        payload.insert("blob".into(), json!("x".repeat(500)));

        let prompt = summarize_json_prompt(&payload, None, None, 50);
        assert!(prompt.contains("(truncated)"));
        assert!(prompt.len() < 300);
    }

    #[test]
    fn test_document_prompt_for_table() {
        let mut row = Map::new();
        row.insert("a".into(), json!("1"));
        let content = ExtractedContent::table(vec![row], false, 100);

        let prompt = document_prompt("t.csv", &content, None);
        assert!(prompt.contains("1 rows"));
        assert!(prompt.contains(r#"[{"a":"1"}]"#));
    }

    #[test]
    fn test_vision_prompt_uses_hint() {
        assert_eq!(vision_prompt("x.png", Some("read the gauge")), "Image 'x.png'. read the gauge");
        assert!(vision_prompt("x.png", None).contains("Describe"));
    }
}
