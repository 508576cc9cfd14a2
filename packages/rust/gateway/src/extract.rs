//! Plain-text extraction from the responses envelope.
//!
//! The service returns an `output` array of items, each carrying a `content`
//! array of typed blocks. Only `output_text` blocks are rendered.

use serde_json::Value;

use copilot_shared::{BlockKind, GatewayResponse};

/// Text of every `output_text` block in the response, joined by newlines and trimmed.
///
/// Returns an empty string when the service produced no text; callers decide
/// whether that is acceptable.
pub fn extract_text(response: &GatewayResponse) -> String {
    extract_output_text(&response.payload)
}

/// Same as [`extract_text`], on a raw payload.
pub fn extract_output_text(payload: &Value) -> String {
    let items = payload
        .get("output")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let fragments: Vec<&str> = items
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|block| {
            block.get("type").and_then(Value::as_str) == Some(BlockKind::OutputText.as_str())
        })
        .map(|block| block.get("text").and_then(Value::as_str).unwrap_or_default())
        .collect();

    fragments.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn joins_blocks_across_items() {
        let payload = json!({
            "output": [
                {"type": "message", "content": [{"type": "output_text", "text": "Hello"}]},
                {"type": "message", "content": [{"type": "output_text", "text": "World"}]}
            ]
        });
        assert_eq!(extract_output_text(&payload), "Hello\nWorld");
    }

    #[test]
    fn non_text_blocks_yield_empty_string() {
        let payload = json!({
            "output": [
                {"content": [{"type": "reasoning", "text": "thinking..."}]},
                {"content": [{"type": "tool_call", "name": "lookup"}]}
            ]
        });
        assert_eq!(extract_output_text(&payload), "");
    }

    #[test]
    fn skips_foreign_blocks_in_order() {
        let payload = json!({
            "output": [{
                "content": [
                    {"type": "output_text", "text": "  first"},
                    {"type": "refusal", "text": "nope"},
                    {"type": "output_text", "text": "second  "}
                ]
            }]
        });
        assert_eq!(extract_output_text(&payload), "first\nsecond");
    }

    #[test]
    fn tolerates_missing_fields() {
        assert_eq!(extract_output_text(&Value::Null), "");
        assert_eq!(extract_output_text(&json!({"output": "oops"})), "");
        assert_eq!(extract_output_text(&json!({"output": [{"id": 1}]})), "");
        assert_eq!(
            extract_output_text(&json!({"output": [{"content": [{"type": "output_text"}]}]})),
            ""
        );
    }

    #[test]
    fn extracts_from_gateway_response() {
        let response = GatewayResponse {
            payload: json!({"output": [{"content": [{"type": "output_text", "text": "Hi!"}]}]}),
            client_meta: copilot_shared::ClientMeta {
                latency_ms: 1,
                model: "m".into(),
            },
        };
        assert_eq!(extract_text(&response), "Hi!");
    }
}
