#![allow(dead_code)]

use std::path::PathBuf;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use vocab_review_backend::auth::SessionKey;
use vocab_review_backend::config::Config;
use vocab_review_backend::services::source;

pub struct TestApp {
    pub router: Router,
    pub data_dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let data_dir = tempfile::tempdir().expect("create temp data dir");
        let router = vocab_review_backend::create_app(Config::with_data_dir(data_dir.path()));
        Self { router, data_dir }
    }

    /// Writes `count` entries `w{i}<TAB>d{i}` into `name`.
    pub fn write_source(&self, name: &str, count: usize) {
        let text: String = (0..count).map(|i| format!("w{i}\td{i}\n")).collect();
        std::fs::write(self.data_dir.path().join(name), text).expect("write source");
    }

    /// Where `token`'s progress on `source` is kept.
    pub fn progress_path(&self, token: &str, source: &str) -> PathBuf {
        let owner = SessionKey::new(token).expect("valid token");
        source::progress_path(self.data_dir.path(), &owner, source)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router call");

        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
