use serde::Deserialize;

/// Structured directive extracted from a model reply.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AgentResponse {
    pub tool: String,
    pub action: String,
    pub explanation: String,
    #[serde(default)]
    pub needs_auth: bool,
    #[serde(default)]
    pub install_via_brew: Option<String>,
}

/// Extract the first top-level `{...}` span from `text` and decode it.
///
/// The model is not schema-constrained and may wrap the object in prose or
/// markdown fences. First-`{`-to-last-`}` is a heuristic: it can misfire on
/// replies with multiple JSON fragments or braces inside string content.
/// `None` is not an error; callers treat the reply as plain text.
pub fn parse_agent_response(text: &str) -> Option<AgentResponse> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}
