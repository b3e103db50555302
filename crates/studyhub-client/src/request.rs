//! Request description
//!
//! `ApiRequest` carries everything needed to issue (or re-issue) one call:
//! method, path, JSON body, and extra headers. The client treats all four
//! as opaque — it only ever adds the authorization header on top.

use reqwest::Method;
use reqwest::header::HeaderMap;

/// One API request, replayable as-is after a session renewal.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the configured base URL, e.g. `/users/me`
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn verb_constructors_set_method_and_path() {
        assert_eq!(ApiRequest::get("/users/me").method, Method::GET);
        assert_eq!(ApiRequest::delete("/pomodoros/3").method, Method::DELETE);

        let post = ApiRequest::post("/pomodoros", serde_json::json!({"minutes": 25}));
        assert_eq!(post.method, Method::POST);
        assert_eq!(post.path, "/pomodoros");
        assert_eq!(post.body.unwrap()["minutes"], 25);

        let patch = ApiRequest::patch("/topics/9/mark", serde_json::json!({"done": true}));
        assert_eq!(patch.method, Method::PATCH);
        assert!(patch.body.is_some());
    }

    #[test]
    fn get_and_delete_carry_no_body() {
        assert!(ApiRequest::get("/subjects").body.is_none());
        assert!(ApiRequest::delete("/subjects/1").body.is_none());
    }

    #[test]
    fn with_headers_replaces_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("abc"));
        let request = ApiRequest::get("/users/me").with_headers(headers);
        assert_eq!(request.headers.get("x-request-id").unwrap(), "abc");
    }
}
