//! Answer extraction from noisy model output
//!
//! Reasoning models wrap their chain of thought in `<think>` tags and often
//! narrate around the JSON they were asked to emit.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static REASONING_TRACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("reasoning pattern is valid"));

/// Remove every `<think>...</think>` span
pub fn strip_reasoning(text: &str) -> Cow<'_, str> {
    REASONING_TRACE.replace_all(text, "")
}

/// Find the first substring that parses as a complete JSON object
pub fn first_json_object(text: &str) -> Option<&str> {
    for (start, _) in text.match_indices('{') {
        let candidate = &text[start..];
        let mut stream = serde_json::Deserializer::from_str(candidate).into_iter::<Value>();
        if let Some(Ok(Value::Object(_))) = stream.next() {
            return Some(&candidate[..stream.byte_offset()]);
        }
    }
    None
}

/// Strip the reasoning trace, then prefer the first JSON object over prose
pub fn extract_answer(raw: &str) -> String {
    let stripped = strip_reasoning(raw);
    match first_json_object(&stripped) {
        Some(object) => object.to_string(),
        None => stripped.trim().to_string(),
    }
}
