//! Toast notifications delivered through the `HX-Trigger` header.
//!
//! The base layout listens for a `notify` event carrying `level` and
//! `message`, and for `cart-updated`, which refreshes the cart badge.

use axum::http::{HeaderName, HeaderValue};
use axum::response::AppendHeaders;
use serde::Serialize;

const HX_TRIGGER: HeaderName = HeaderName::from_static("hx-trigger");

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A message shown to the shopper after an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Build the `HX-Trigger` header for an action's outcome.
#[must_use]
pub fn hx_trigger(
    notice: Option<&Notice>,
    cart_updated: bool,
) -> AppendHeaders<[(HeaderName, HeaderValue); 1]> {
    let mut events = serde_json::Map::new();
    if cart_updated {
        events.insert("cart-updated".to_string(), serde_json::Value::Bool(true));
    }
    if let Some(notice) = notice {
        events.insert(
            "notify".to_string(),
            serde_json::json!({ "level": notice.level, "message": notice.message }),
        );
    }

    let json = ascii_json(&serde_json::Value::Object(events).to_string());
    let value = HeaderValue::from_str(&json).unwrap_or_else(|_| HeaderValue::from_static("{}"));
    AppendHeaders([(HX_TRIGGER, value)])
}

/// Escape non-ASCII characters so the JSON fits in a header value.
fn ascii_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{unit:04x}"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_json(headers: &AppendHeaders<[(HeaderName, HeaderValue); 1]>) -> serde_json::Value {
        let [(_, value)] = &headers.0;
        let text = value.to_str().unwrap_or_else(|e| panic!("{e}"));
        serde_json::from_str(text).unwrap_or_else(|e| panic!("{e}"))
    }

    #[test]
    fn test_trigger_with_notice_and_update() {
        let notice = Notice::success("Product added to cart!");
        let json = header_json(&hx_trigger(Some(&notice), true));

        assert_eq!(json["cart-updated"], true);
        assert_eq!(json["notify"]["level"], "success");
        assert_eq!(json["notify"]["message"], "Product added to cart!");
    }

    #[test]
    fn test_trigger_without_update() {
        let notice = Notice::error("Failed to add to cart");
        let json = header_json(&hx_trigger(Some(&notice), false));

        assert!(json.get("cart-updated").is_none());
        assert_eq!(json["notify"]["level"], "error");
    }

    #[test]
    fn test_non_ascii_message_survives() {
        let notice = Notice::error("Café closed");
        let json = header_json(&hx_trigger(Some(&notice), false));
        assert_eq!(json["notify"]["message"], "Café closed");
    }
}
