use serde::{Deserialize, Serialize};
use shop_store::Locale;

/// Request payload for /chat and /chat/stream.
#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    /// Browser/app session the conversation is keyed by.
    pub session_id: String,
    /// The customer's message, verbatim.
    pub message: String,
    #[serde(default = "default_locale")]
    pub locale: Locale,
    /// Present when the customer is signed in.
    #[serde(default)]
    pub customer_id: Option<String>,
}

fn default_locale() -> Locale {
    Locale::En
}

/// Response payload for /chat.
#[derive(Debug, Serialize)]
pub struct ChatResponseBody {
    pub conversation_id: String,
    pub reply: String,
    /// Tokens the model reported for this turn, when it reported any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<u32>,
}
