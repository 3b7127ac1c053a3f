pub mod flows;
pub mod health;
pub mod history;

pub use health::health_check;

use axum::http::HeaderMap;

/// Request origin address, preferring the proxy header.
pub fn caller_address(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_caller_address_from_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(caller_address(&headers), "203.0.113.7");
    }

    #[test]
    fn test_caller_address_fallback() {
        assert_eq!(caller_address(&HeaderMap::new()), "unknown");
    }
}
