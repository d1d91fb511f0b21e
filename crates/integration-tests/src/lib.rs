//! Shared fixtures for the orderflow integration tests.
//!
//! Everything runs in-process: the in-memory order and proof stores, a
//! notifier that records what it was asked to send, and a code generator
//! that replays a script. HTTP tests drive the real router with
//! `tower::ServiceExt::oneshot`.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p orderflow-integration-tests
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use orderflow_api::config::{ApiConfig, ConfigError, LifecycleConfig};
use orderflow_api::db::{MemoryOrderStore, RepositoryError};
use orderflow_api::services::{
    CodeGenerator, EmailMessage, MemoryProofStore, Notifier, NotifyError, OrderLifecycle,
    OrderStore, RandomCodeGenerator, UpdateOutcome,
};
use orderflow_api::state::AppState;
use orderflow_core::{Order, OrderCode, OrderId, OrderStatus};
use serde_json::{Value, json};
use tower::ServiceExt;

/// Operator token the test app accepts.
pub const OPERATOR_TOKEN: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6";

/// Records every message instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<EmailMessage>>,
    /// When set, every send fails with this provider status.
    fail_with: Option<u16>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose provider always rejects with `status`.
    #[must_use]
    pub fn failing(status: u16) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail_with: Some(status),
        }
    }

    /// Messages passed to `send`, including failed ones.
    #[must_use]
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<Value, NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        match self.fail_with {
            Some(status) => Err(NotifyError::Provider {
                status,
                body: json!({ "message": "rejected" }),
            }),
            None => Ok(json!({ "id": "<test@mail>", "message": "Queued. Thank you." })),
        }
    }
}

/// Hands out codes from a script. The last code repeats once the script
/// runs out.
#[derive(Debug)]
pub struct ScriptedCodes {
    script: Mutex<VecDeque<OrderCode>>,
    last: Mutex<Option<OrderCode>>,
}

impl ScriptedCodes {
    /// # Panics
    ///
    /// Panics if a code is malformed or the script is empty.
    #[must_use]
    pub fn new(codes: &[&str]) -> Self {
        assert!(!codes.is_empty(), "script needs at least one code");
        let script = codes
            .iter()
            .map(|c| OrderCode::parse(c).unwrap_or_else(|e| panic!("bad code {c}: {e}")))
            .collect();
        Self {
            script: Mutex::new(script),
            last: Mutex::new(None),
        }
    }
}

impl CodeGenerator for ScriptedCodes {
    fn generate(&self) -> OrderCode {
        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(code) = next {
            *last = Some(code);
        }
        last.clone().unwrap_or_else(|| OrderCode::from_index(0))
    }
}

/// An order store where another writer always gets in first: just before
/// each update, the stored order is moved to `status`.
pub struct ConcurrentWriter {
    inner: Arc<MemoryOrderStore>,
    status: OrderStatus,
}

impl ConcurrentWriter {
    #[must_use]
    pub const fn new(inner: Arc<MemoryOrderStore>, status: OrderStatus) -> Self {
        Self { inner, status }
    }
}

#[async_trait]
impl OrderStore for ConcurrentWriter {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        self.inner.insert(order).await
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.inner.get(id).await
    }

    async fn find_by_code(&self, code: &OrderCode) -> Result<Option<Order>, RepositoryError> {
        self.inner.find_by_code(code).await
    }

    async fn update(
        &self,
        expected: OrderStatus,
        order: &Order,
    ) -> Result<UpdateOutcome, RepositoryError> {
        if let Some(mut current) = self.inner.get(order.id).await? {
            let seen = current.status;
            current.status = self.status;
            self.inner.update(seen, &current).await?;
        }
        self.inner.update(expected, order).await
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        self.inner.ping().await
    }
}

/// Configuration from a fixed variable set, with the operator token set.
///
/// # Errors
///
/// Returns the configuration error for invalid overrides.
pub fn config_with(overrides: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
    let mut vars: HashMap<String, String> =
        HashMap::from([("OPERATOR_TOKEN".to_owned(), OPERATOR_TOKEN.to_owned())]);
    for (key, value) in overrides {
        vars.insert((*key).to_owned(), (*value).to_owned());
    }
    ApiConfig::from_lookup(|key| vars.get(key).cloned())
}

/// A fully wired in-memory application.
pub struct TestApp {
    pub router: Router,
    pub lifecycle: OrderLifecycle,
    pub store: Arc<MemoryOrderStore>,
    pub proofs: Arc<MemoryProofStore>,
    pub notifier: Arc<RecordingNotifier>,
}

/// Builder for [`TestApp`].
pub struct TestAppBuilder {
    config: ApiConfig,
    notifier: Arc<RecordingNotifier>,
    codes: Option<Arc<dyn CodeGenerator>>,
    mailer: bool,
    concurrent_status: Option<OrderStatus>,
}

impl TestApp {
    /// # Panics
    ///
    /// Panics if the default test configuration is rejected.
    #[must_use]
    pub fn builder() -> TestAppBuilder {
        TestAppBuilder {
            config: config_with(&[]).unwrap_or_else(|e| panic!("test config: {e}")),
            notifier: Arc::new(RecordingNotifier::new()),
            codes: None,
            mailer: true,
            concurrent_status: None,
        }
    }

    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Send a request and return the status and JSON body (`Null` when the
    /// body is empty or not JSON).
    ///
    /// # Panics
    ///
    /// Panics if the router fails, which it never should.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<&str>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = builder
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_owned())))
            .unwrap_or_else(|e| panic!("request: {e}"));

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|e| panic!("router: {e}"));
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_else(|e| panic!("body: {e}"));
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// POST a JSON value.
    pub async fn post(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(&body.to_string()), None)
            .await
    }

    /// POST a JSON value with the operator token.
    pub async fn post_as_operator(&self, uri: &str, body: &Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(&body.to_string()), Some(OPERATOR_TOKEN))
            .await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAppBuilder {
    /// Replace the configuration.
    #[must_use]
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    /// Adjust lifecycle settings.
    #[must_use]
    pub fn lifecycle(mut self, edit: impl FnOnce(&mut LifecycleConfig)) -> Self {
        edit(&mut self.config.lifecycle);
        self
    }

    #[must_use]
    pub fn notifier(mut self, notifier: RecordingNotifier) -> Self {
        self.notifier = Arc::new(notifier);
        self
    }

    #[must_use]
    pub fn codes(mut self, codes: &[&str]) -> Self {
        self.codes = Some(Arc::new(ScriptedCodes::new(codes)));
        self
    }

    /// Have a competing writer move every order to `status` just before
    /// each lifecycle update. See [`ConcurrentWriter`].
    #[must_use]
    pub const fn concurrent_writer(mut self, status: OrderStatus) -> Self {
        self.concurrent_status = Some(status);
        self
    }

    /// Leave the email relay endpoint unconfigured.
    #[must_use]
    pub const fn without_mailer(mut self) -> Self {
        self.mailer = false;
        self
    }

    #[must_use]
    pub fn build(self) -> TestApp {
        let store = Arc::new(MemoryOrderStore::new());
        let proofs = Arc::new(MemoryProofStore::new());
        let codes: Arc<dyn CodeGenerator> = match self.codes {
            Some(codes) => codes,
            None => Arc::new(RandomCodeGenerator),
        };

        let order_store: Arc<dyn OrderStore> = match self.concurrent_status {
            Some(status) => Arc::new(ConcurrentWriter::new(store.clone(), status)),
            None => store.clone(),
        };

        let lifecycle = OrderLifecycle::new(
            order_store,
            self.notifier.clone(),
            proofs.clone(),
            codes,
            self.config.lifecycle.clone(),
        );
        let mailer: Option<Arc<dyn Notifier>> = if self.mailer {
            Some(self.notifier.clone())
        } else {
            None
        };
        let state = AppState::new(self.config, lifecycle.clone(), mailer);

        TestApp {
            router: orderflow_api::app(state),
            lifecycle,
            store,
            proofs,
            notifier: self.notifier,
        }
    }
}

/// A valid checkout body: Widget 9.99 x2, Gadget 5.00 x1.
#[must_use]
pub fn checkout_body() -> Value {
    json!({
        "email": "buyer@example.com",
        "name": "Ada Buyer",
        "payment_method": "cashapp",
        "ship_line1": "1 Main St",
        "ship_city": "Springfield",
        "ship_state": "IL",
        "ship_zip": "62701",
        "items": [
            { "name": "Widget", "price": 9.99, "qty": 2 },
            { "name": "Gadget", "price": 5.00, "qty": 1 }
        ]
    })
}
