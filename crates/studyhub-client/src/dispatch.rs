//! Request dispatcher
//!
//! Performs exactly one network call: reads the credential store at call
//! time, attaches the access token if one exists, sends, and classifies.
//! Stateless between calls — all renewal coordination lives in `client.rs`.
//!
//! Reading the store at call time (not earlier) is what makes replays
//! correct: a request replayed after a renewal automatically picks up the
//! token the renewal just wrote.

use std::sync::Arc;

use studyhub_auth::CredentialStore;

use crate::classify::classify_response;
use crate::outcome::Outcome;
use crate::request::ApiRequest;

#[derive(Clone)]
pub(crate) struct Dispatcher {
    http: reqwest::Client,
    base_url: Arc<str>,
    store: Arc<dyn CredentialStore>,
}

impl Dispatcher {
    pub(crate) fn new(
        http: reqwest::Client,
        base_url: Arc<str>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            http,
            base_url,
            store,
        }
    }

    /// Issue one request and classify the result.
    ///
    /// Requests without a stored access token go out anonymous — the
    /// authorization header is omitted, never fabricated.
    pub(crate) async fn send(&self, request: &ApiRequest) -> Outcome {
        let credentials = self.store.get().await;

        let url = format!("{}{}", self.base_url, request.path);
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .headers(request.headers.clone());

        if let Some(token) = &credentials.access_token {
            builder = builder.bearer_auth(token.expose());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return Outcome::Transport(format!("request failed: {e}")),
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return Outcome::Transport(format!("reading response body: {e}")),
        };

        classify_response(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyhub_auth::{Credentials, MemoryCredentialStore};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn dispatcher_for(uri: &str, store: MemoryCredentialStore) -> Dispatcher {
        Dispatcher::new(reqwest::Client::new(), Arc::from(uri), Arc::new(store))
    }

    #[tokio::test]
    async fn attaches_bearer_token_from_store() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me"))
            .and(header("authorization", "Bearer at_1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "name": "eda" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let store = MemoryCredentialStore::new(Credentials::new("at_1", "rt_1"));
        let dispatcher = dispatcher_for(&server.uri(), store);

        let outcome = dispatcher.send(&ApiRequest::get("/users/me")).await;
        match outcome {
            Outcome::Success(value) => assert_eq!(value["name"], "eda"),
            other => panic!("expected Success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn omits_authorization_header_when_anonymous() {
        struct NoAuthHeader;
        impl wiremock::Match for NoAuthHeader {
            fn matches(&self, request: &wiremock::Request) -> bool {
                !request.headers.contains_key("authorization")
            }
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(NoAuthHeader)
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "access_token": "at_1" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher_for(&server.uri(), MemoryCredentialStore::default());

        let outcome = dispatcher
            .send(&ApiRequest::post(
                "/auth/login",
                serde_json::json!({"email": "a@b.c", "password": "pw"}),
            ))
            .await;
        assert!(matches!(outcome, Outcome::Success(_)), "got: {outcome:?}");
    }

    #[tokio::test]
    async fn connection_refused_is_transport() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let store = MemoryCredentialStore::new(Credentials::new("at_1", "rt_1"));
        let dispatcher = dispatcher_for(&format!("http://{addr}"), store);

        let outcome = dispatcher.send(&ApiRequest::get("/users/me")).await;
        assert!(matches!(outcome, Outcome::Transport(_)), "got: {outcome:?}");
    }

    #[tokio::test]
    async fn serializes_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/pomodoros"))
            .and(wiremock::matchers::body_json(
                serde_json::json!({"minutes": 25}),
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "data": { "id": 1 } })),
            )
            .mount(&server)
            .await;

        let store = MemoryCredentialStore::new(Credentials::new("at_1", "rt_1"));
        let dispatcher = dispatcher_for(&server.uri(), store);

        let outcome = dispatcher
            .send(&ApiRequest::post(
                "/pomodoros",
                serde_json::json!({"minutes": 25}),
            ))
            .await;
        assert!(matches!(outcome, Outcome::Success(_)), "got: {outcome:?}");
    }
}
