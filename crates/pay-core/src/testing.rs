//! In-memory `PaymentGateway` for tests.
//!
//! Stores objects by instance URL and records every call it receives, so
//! tests can assert both on results and on the exact requests a dispatch
//! produced.

use crate::error::{GatewayError, GatewayResult};
use crate::gateway::{Action, PaymentGateway};
use crate::object::{Collection, GatewayObject, GatewayValue, ObjectKind, Payload};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// `create`, `retrieve`, `save`, `delete`, `list` or an action name
    pub method: &'static str,
    pub url: String,
    pub params: Payload,
}

#[derive(Debug, Default)]
struct State {
    objects: BTreeMap<String, GatewayObject>,
    calls: Vec<RecordedCall>,
    fail_next: Option<GatewayError>,
    list_override: Option<GatewayObject>,
    sequence: u64,
}

/// Gateway backed by a map of instance URL → object
#[derive(Debug, Default)]
pub struct MockGateway {
    state: Mutex<State>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store an object as a member of `collection`
    pub fn insert(&self, collection: &Collection, object: GatewayObject) {
        let id = object.id().unwrap_or_default().to_string();
        let url = collection.instance_url(&id);
        self.state().objects.insert(url.clone(), object.with_url(url));
    }

    /// Make the next call fail with `error` (after being recorded)
    pub fn fail_next(&self, error: GatewayError) {
        self.state().fail_next = Some(error);
    }

    /// Answer every `list` call with `page`
    pub fn answer_list_with(&self, page: GatewayObject) {
        self.state().list_override = Some(page);
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state().calls.clone()
    }

    /// Object currently stored at `url`
    pub fn stored(&self, url: &str) -> Option<GatewayObject> {
        self.state().objects.get(url).cloned()
    }

    fn record(&self, method: &'static str, url: &str, params: Payload) -> GatewayResult<()> {
        let mut state = self.state();
        state.calls.push(RecordedCall {
            method,
            url: url.to_string(),
            params,
        });
        match state.fail_next.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn no_such(kind: &ObjectKind, id: &str) -> GatewayError {
    GatewayError::InvalidRequest {
        message: format!("No such {}: {}", kind, id),
        param: Some("id".to_string()),
        http_status: Some(404),
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create(&self, collection: &Collection, params: &Payload) -> GatewayResult<GatewayObject> {
        self.record("create", &collection.url, params.clone())?;

        let mut state = self.state();
        state.sequence += 1;
        let id = format!("{}_{}", collection.kind.as_str(), state.sequence);
        let mut body = params.clone();
        body.insert("id".into(), Value::String(id.clone()));
        body.insert("object".into(), Value::String(collection.kind.as_str().into()));

        let url = collection.instance_url(&id);
        let created = GatewayObject::from_json(Value::Object(body))?.with_url(url.clone());
        state.objects.insert(url, created.clone());
        Ok(created)
    }

    async fn retrieve(&self, collection: &Collection, id: &str) -> GatewayResult<GatewayObject> {
        let url = collection.instance_url(id);
        self.record("retrieve", &url, Payload::new())?;
        self.state()
            .objects
            .get(&url)
            .cloned()
            .ok_or_else(|| no_such(&collection.kind, id))
    }

    async fn save(&self, object: &GatewayObject) -> GatewayResult<GatewayObject> {
        let url = object.instance_url()?;
        self.record("save", &url, object.unsaved_params())?;

        let mut saved = object.clone();
        saved.mark_saved();
        self.state().objects.insert(url, saved.clone());
        Ok(saved)
    }

    async fn delete(&self, object: &GatewayObject, params: &Payload) -> GatewayResult<GatewayObject> {
        let url = object.instance_url()?;
        self.record("delete", &url, params.clone())?;
        self.state().objects.remove(&url);

        Ok(GatewayObject::with_id(object.kind().clone(), object.id().unwrap_or_default())
            .with("deleted", true))
    }

    async fn perform(
        &self,
        object: &GatewayObject,
        action: Action,
        params: &Payload,
    ) -> GatewayResult<GatewayObject> {
        let url = object.instance_url()?;
        self.record(action.as_str(), &url, params.clone())?;

        let result = match action {
            Action::Capture => object.clone().with("captured", true),
            Action::Refund => object.clone().with("refunded", true),
            Action::Cancel => object.clone().with("status", "canceled"),
            Action::DeleteDiscount => GatewayObject::new(ObjectKind::Discount).with("deleted", true),
        };
        Ok(result)
    }

    async fn list(&self, collection: &Collection, params: &Payload) -> GatewayResult<GatewayObject> {
        self.record("list", &collection.url, params.clone())?;

        let state = self.state();
        if let Some(page) = &state.list_override {
            return Ok(page.clone());
        }

        let prefix = format!("{}/", collection.url);
        let data: Vec<GatewayValue> = state
            .objects
            .iter()
            .filter(|(url, _)| {
                url.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .map(|(_, obj)| GatewayValue::Object(obj.clone()))
            .collect();

        Ok(GatewayObject::new(ObjectKind::List)
            .with("data", GatewayValue::Array(data))
            .with("has_more", false)
            .with("url", collection.url.as_str()))
    }

    fn gateway_name(&self) -> &'static str {
        "mock"
    }
}
