use crate::ResponseBody;

/// Joins a service base URL and a request endpoint with exactly one `/`.
///
/// Leading slashes on `endpoint` and trailing slashes on `base_url` are
/// dropped, so `join_url(base, "/users") == join_url(base, "users")`.
pub fn join_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

/// Normalizes a response payload: empty stays empty, JSON is parsed and
/// anything else falls back to text.
pub(crate) fn decode_body(bytes: &[u8]) -> ResponseBody {
    if bytes.is_empty() {
        return ResponseBody::Empty;
    }
    match serde_json::from_slice(bytes) {
        Ok(value) => ResponseBody::Json(value),
        Err(_) => ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{decode_body, join_url};
    use crate::ResponseBody;

    #[test]
    fn join_ignores_single_leading_separator() {
        let base = "http://localhost:5000/api";
        assert_eq!(join_url(base, "/users"), join_url(base, "users"));
        assert_eq!(join_url(base, "users"), "http://localhost:5000/api/users");
    }

    #[test]
    fn join_never_doubles_separators() {
        assert_eq!(
            join_url("http://localhost:5000/api/", "//users/1"),
            "http://localhost:5000/api/users/1"
        );
    }

    #[test]
    fn join_keeps_endpoint_query_and_path() {
        assert_eq!(
            join_url("http://svc", "v1/items?id=3"),
            "http://svc/v1/items?id=3"
        );
    }

    #[test]
    fn empty_payload_is_empty() {
        assert_eq!(decode_body(b""), ResponseBody::Empty);
    }

    #[test]
    fn json_payload_is_parsed() {
        assert_eq!(
            decode_body(br#"{"ok":true}"#),
            ResponseBody::Json(json!({"ok": true}))
        );
    }

    #[test]
    fn non_json_payload_falls_back_to_text() {
        assert_eq!(
            decode_body(b"pong"),
            ResponseBody::Text("pong".to_owned())
        );
    }
}
