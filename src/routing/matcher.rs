//! Host matching logic.
//!
//! # Responsibilities
//! - Extract the host a request is addressed to
//! - Find the first binding whose host name matches it
//!
//! # Design Decisions
//! - Host matching is exact and case-sensitive, including any `:port`
//! - First match in list order wins; duplicates are never merged
//! - No regex or wildcard matching

use axum::http::{header, Request};

use crate::config::Binding;

/// The host a request is addressed to.
///
/// Uses the `Host` header, falling back to the authority of an
/// absolute-form request target.
pub fn request_host<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()))
}

/// Index of the first binding whose host name equals `host`.
pub fn first_match(bindings: &[Binding], host: &str) -> Option<usize> {
    bindings.iter().position(|b| b.host_name == host)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn bindings() -> Vec<Binding> {
        vec![
            Binding::new("a.example.com", "first", "us-east-1"),
            Binding::new("b.example.com", "other", "us-east-1"),
            Binding::new("a.example.com", "second", "us-east-1"),
        ]
    }

    #[test]
    fn test_host_header() {
        let req = Request::builder()
            .header("Host", "a.example.com")
            .body(Body::default())
            .unwrap();
        assert_eq!(request_host(&req), Some("a.example.com"));
    }

    #[test]
    fn test_absolute_form_authority() {
        let req = Request::builder()
            .uri("http://b.example.com/index.html")
            .body(Body::default())
            .unwrap();
        assert_eq!(request_host(&req), Some("b.example.com"));

        let bare = Request::builder().uri("/").body(Body::default()).unwrap();
        assert_eq!(request_host(&bare), None);
    }

    #[test]
    fn test_first_match_wins() {
        let bindings = bindings();
        for _ in 0..10 {
            let index = first_match(&bindings, "a.example.com").unwrap();
            assert_eq!(bindings[index].bucket_name, "first");
        }
    }

    #[test]
    fn test_match_is_exact() {
        let bindings = bindings();
        assert_eq!(first_match(&bindings, "A.EXAMPLE.COM"), None);
        assert_eq!(first_match(&bindings, "a.example.com:8080"), None);
        assert_eq!(first_match(&bindings, "example.com"), None);
        assert_eq!(first_match(&bindings, "b.example.com"), Some(1));
    }
}
