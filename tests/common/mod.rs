use std::{
    io,
    sync::{Arc, Mutex},
};

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use lettre::message::Mailbox;
use resetmail::{
    email::{Client, Outbox, Transport},
    http::app,
    telemetry::LineFormat,
};
use serde_json::Value;
use tower::ServiceExt;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt};

pub const RESET_URL: &str = "https://pudo.com.tr/reset-password";

pub type TestResponse = (Value, StatusCode);

pub struct Server {
    router: Router,
    pub outbox: Outbox,
}

impl Server {
    pub fn new() -> Self {
        Self::with_outbox(Outbox::new())
    }

    pub fn with_outbox(outbox: Outbox) -> Self {
        Self::with_router(app(Arc::new(client(&outbox))), outbox)
    }

    pub fn with_router(router: Router, outbox: Outbox) -> Self {
        Self { router, outbox }
    }

    pub async fn send(&self, req: Request<Body>) -> (Vec<u8>, StatusCode) {
        let res = self.router.clone().oneshot(req).await.unwrap();

        let status_code = res.status();
        let body = hyper::body::to_bytes(res.into_body()).await.unwrap();

        (body.to_vec(), status_code)
    }

    pub async fn post(&self, url: &str, content_type: &str, body: impl Into<Body>) -> TestResponse {
        let req = Request::builder()
            .method(Method::POST)
            .uri(url)
            .header(CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap();

        let (body, status) = self.send(req).await;
        let response = serde_json::from_slice(&body).unwrap_or_default();
        (response, status)
    }

    pub async fn post_empty(&self, url: &str) -> TestResponse {
        let req = Request::builder()
            .method(Method::POST)
            .uri(url)
            .body(Body::empty())
            .unwrap();

        let (body, status) = self.send(req).await;
        let response = serde_json::from_slice(&body).unwrap_or_default();
        (response, status)
    }

    pub async fn post_json(&self, url: &str, body: Value) -> TestResponse {
        self.post(url, "application/json", body.to_string()).await
    }
}

pub fn client(outbox: &Outbox) -> Client {
    Client::new(
        Mailbox::new(
            Some("Pudo Business Partners Support".into()),
            "support@pudo.com.tr".parse().unwrap(),
        ),
        Transport::Memory(outbox.clone()),
        RESET_URL,
    )
    .unwrap()
}

#[derive(Clone, Default)]
pub struct Logs(Arc<Mutex<Vec<u8>>>);

impl Logs {
    /// Starts capturing this thread's log lines until the guard is dropped.
    pub fn capture() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .event_format(LineFormat)
                .with_ansi(false)
                .with_writer(logs.clone()),
        );

        (logs, tracing::subscriber::set_default(subscriber))
    }

    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for Logs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Logs {
    type Writer = Logs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
