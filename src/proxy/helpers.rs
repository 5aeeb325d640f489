//! Proxy utility functions.
//!
//! - Header extraction from Pingora requests
//! - Query string parsing (form-urlencoded)

use std::collections::HashMap;

use pingora_http::RequestHeader;

/// Extract headers from a Pingora RequestHeader in arrival order.
///
/// Headers with non-UTF8 values are skipped.
pub fn extract_headers(req: &RequestHeader) -> Vec<(String, String)> {
    req.headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.to_string(), v.to_string()))
        })
        .collect()
}

/// Parse a query string with form-urlencoded rules.
///
/// `+` decodes to a space and percent escapes are decoded. When a key
/// appears more than once the first occurrence wins. A pair without `=`
/// yields an empty value.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for pair in query.split('&').filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        params
            .entry(decode_component(key))
            .or_insert_with(|| decode_component(value));
    }
    params
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned(),
    }
}
