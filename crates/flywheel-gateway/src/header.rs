//! Header value conversion between axum/reqwest and the kernel types.
//!
//! Kernel requests and responses carry header values as `String`. Values
//! that are not visible ASCII are decoded one char per octet (ISO-8859-1),
//! so converting back yields the exact bytes that arrived.

use axum::http::HeaderValue;

/// Text form of a header value. Never fails.
pub fn value_to_text(value: &HeaderValue) -> String {
    match value.to_str() {
        Ok(text) => text.to_string(),
        Err(_) => value.as_bytes().iter().map(|&b| char::from(b)).collect(),
    }
}

/// Header value for `text`. `None` only when the octets are not a legal
/// header value (control characters).
pub fn text_to_value(text: &str) -> Option<HeaderValue> {
    let octets: Option<Vec<u8>> = text.chars().map(|c| u8::try_from(c).ok()).collect();
    let bytes = octets.unwrap_or_else(|| text.as_bytes().to_vec());
    HeaderValue::from_bytes(&bytes).ok()
}
