//! # Operation Dispatcher
//!
//! Single entry point for every operation. The dispatcher:
//!
//! 1. resolves the operation name against the `OperationRegistry`,
//! 2. validates routing identifiers, strips routing keys from the payload and
//!    injects the default currency into currency-bearing creates,
//! 3. runs the handler's remote calls in sequence on the `PaymentGateway`,
//! 4. flattens every returned object and lifts known paginated
//!    sub-collections (a charge's refunds, a customer's cards and
//!    subscriptions, ...) into plain arrays,
//! 5. classifies any gateway failure into a failure envelope.
//!
//! Raised `PaymentError`s are reserved for caller mistakes detected before
//! the first remote call. Gateway failures never escape `execute`; they come
//! back as `ResultEnvelope::Failure`. Nothing is retried.

use crate::classify::ErrorClassifier;
use crate::config::GatewayConfig;
use crate::envelope::ResultEnvelope;
use crate::error::{GatewayError, GatewayResult, PaymentError, PaymentResult};
use crate::flatten::ObjectFlattener;
use crate::gateway::BoxedPaymentGateway;
use crate::object::{Collection, GatewayObject, GatewayValue, ObjectKind, Payload};
use crate::operation::{
    expansion_paths, Handler, Mutation, NestedSpec, NestedTarget, Operation, OperationRegistry,
    CUSTOMER_ID, FIELDS, ROUTING_KEYS,
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// Resolves operations into gateway calls and packages the outcome
pub struct OperationDispatcher {
    gateway: BoxedPaymentGateway,
    config: GatewayConfig,
    registry: OperationRegistry,
    flattener: ObjectFlattener,
    classifier: ErrorClassifier,
}

impl OperationDispatcher {
    /// Create a dispatcher with the standard registry.
    ///
    /// Fails when the configuration carries no usable API key.
    pub fn new(config: GatewayConfig, gateway: BoxedPaymentGateway) -> PaymentResult<Self> {
        config.validate()?;
        Ok(Self {
            gateway,
            config,
            registry: OperationRegistry::standard(),
            flattener: ObjectFlattener::new(),
            classifier: ErrorClassifier::new(),
        })
    }

    /// Builder: replace the operation registry
    pub fn with_registry(mut self, registry: OperationRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn flattener(&self) -> &ObjectFlattener {
        &self.flattener
    }

    /// Execute an operation by name with a loosely-typed payload.
    ///
    /// The payload must be a JSON object (possibly empty). An empty name, a
    /// `null` payload or a non-object payload raise `PaymentError::Configuration`.
    pub async fn execute(
        &self,
        operation_name: &str,
        payload: Value,
    ) -> PaymentResult<ResultEnvelope> {
        if operation_name.trim().is_empty() {
            return Err(PaymentError::Configuration(
                "Operation name is empty".to_string(),
            ));
        }
        let payload = match payload {
            Value::Object(map) => map,
            Value::Null => {
                return Err(PaymentError::Configuration(format!(
                    "Payload for {} is absent",
                    operation_name
                )))
            }
            _ => {
                return Err(PaymentError::Configuration(format!(
                    "Payload for {} must be a mapping",
                    operation_name
                )))
            }
        };
        let operation: Operation = operation_name.parse()?;
        self.execute_operation(operation, payload).await
    }

    /// Execute a resolved operation
    #[instrument(skip(self, payload), fields(operation = %operation, gateway = self.gateway.gateway_name()))]
    pub async fn execute_operation(
        &self,
        operation: Operation,
        payload: Payload,
    ) -> PaymentResult<ResultEnvelope> {
        let handler = self
            .registry
            .get(operation)
            .ok_or_else(|| PaymentError::UnknownOperation(operation.as_str().to_string()))?;

        if self.config.api_key().trim().is_empty() {
            return Err(PaymentError::Configuration(
                "Stripe API secret key is not set".to_string(),
            ));
        }
        validate_required(operation, handler, &payload)?;

        debug!(family = handler.family(), "dispatching");

        let envelope = match self.run(handler, &payload).await {
            Ok(response) => ResultEnvelope::success(response),
            Err(error) => ResultEnvelope::failure(self.classifier.classify(&error)),
        };

        self.log_outcome(operation, &envelope);
        Ok(envelope)
    }

    async fn run(&self, handler: &Handler, payload: &Payload) -> GatewayResult<Value> {
        match handler {
            Handler::Create(spec) => {
                let mut params = strip_routing_keys(payload);
                if spec.inject_currency && !params.contains_key("currency") {
                    params.insert(
                        "currency".to_string(),
                        Value::String(self.config.default_currency.clone()),
                    );
                }
                let collection = Collection::top_level(spec.kind.clone());
                let created = self.gateway.create(&collection, &params).await?;
                Ok(self.normalize(&created))
            }
            Handler::RetrieveThenMutate(spec) => {
                let collection = Collection::top_level(spec.kind.clone());
                let id = routing_id(payload, spec.id_key)?;
                let object = self.gateway.retrieve(&collection, id).await?;
                let result = self.mutate(object, spec.mutation, payload).await?;
                Ok(self.normalize(&result))
            }
            Handler::List(spec) => {
                let collection = Collection::top_level(spec.kind.clone());
                let page = self
                    .gateway
                    .list(&collection, &strip_routing_keys(payload))
                    .await?;
                self.normalize_list(&page)
            }
            Handler::Nested(spec) => self.run_nested(spec, payload).await,
        }
    }

    async fn run_nested(&self, spec: &NestedSpec, payload: &Payload) -> GatewayResult<Value> {
        let customer_id = routing_id(payload, CUSTOMER_ID)?;
        let customer = self
            .gateway
            .retrieve(&Collection::top_level(ObjectKind::Customer), customer_id)
            .await?;
        let collection = customer.nested_collection(spec.field, spec.kind.clone())?;
        debug!(collection = %collection.url, "resolved nested collection");

        match &spec.target {
            NestedTarget::Create { body_key } => {
                let params = match (*body_key).and_then(|key| payload.get(key)) {
                    Some(Value::Object(body)) => body.clone(),
                    _ => strip_routing_keys(payload),
                };
                let created = self.gateway.create(&collection, &params).await?;
                Ok(self.normalize(&created))
            }
            NestedTarget::Member { id_key, mutation } => {
                let id = routing_id(payload, id_key)?;
                let member = self.gateway.retrieve(&collection, id).await?;
                let result = self.mutate(member, *mutation, payload).await?;
                Ok(self.normalize(&result))
            }
            NestedTarget::List => {
                let page = self
                    .gateway
                    .list(&collection, &strip_routing_keys(payload))
                    .await?;
                self.normalize_list(&page)
            }
        }
    }

    async fn mutate(
        &self,
        mut object: GatewayObject,
        mutation: Mutation,
        payload: &Payload,
    ) -> GatewayResult<GatewayObject> {
        match mutation {
            Mutation::Fetch => Ok(object),
            Mutation::Update => {
                let fields = match payload.get(FIELDS) {
                    Some(Value::Object(fields)) => fields,
                    _ => return Err(GatewayError::unexpected("update without a fields mapping")),
                };
                for (key, value) in fields {
                    object.set(key.clone(), GatewayValue::from(value.clone()));
                }
                self.gateway.save(&object).await
            }
            Mutation::Delete => {
                self.gateway
                    .delete(&object, &strip_routing_keys(payload))
                    .await
            }
            Mutation::Perform(action) => {
                self.gateway
                    .perform(&object, action, &strip_routing_keys(payload))
                    .await
            }
        }
    }

    /// First pass: flatten the whole object. Second pass: replace each known
    /// sub-collection with the array of its individually flattened elements.
    fn normalize(&self, object: &GatewayObject) -> Value {
        let mut flat = self.flattener.flatten(object);

        for path in expansion_paths(object.kind()) {
            let segments: Vec<&str> = path.split('.').collect();
            let Some(source) = lookup(object, &segments) else {
                continue;
            };
            let elements = match source {
                GatewayValue::Object(list) => match list.list_data() {
                    Some(data) => data,
                    None => continue,
                },
                GatewayValue::Array(items) => items.as_slice(),
                _ => continue,
            };
            let expanded: Vec<Value> = elements
                .iter()
                .map(|element| self.flattener.flatten_value(element))
                .collect();
            if let Some(slot) = slot_mut(&mut flat, &segments) {
                *slot = Value::Array(expanded);
            }
        }

        Value::Object(flat)
    }

    /// A list page becomes an array of normalized elements
    fn normalize_list(&self, page: &GatewayObject) -> GatewayResult<Value> {
        let data = page.list_data().ok_or_else(|| {
            GatewayError::unexpected(format!("expected a list, got a {} object", page.kind()))
        })?;

        Ok(Value::Array(
            data.iter()
                .map(|item| match item {
                    GatewayValue::Object(obj) => self.normalize(obj),
                    other => self.flattener.flatten_value(other),
                })
                .collect(),
        ))
    }

    fn log_outcome(&self, operation: Operation, envelope: &ResultEnvelope) {
        let policy = self.config.log_policy;
        match envelope {
            ResultEnvelope::Success { response, .. } => {
                if policy.logs_success() {
                    let id = response.get("id").and_then(Value::as_str);
                    info!(
                        operation = %operation,
                        mode = %self.config.mode,
                        id = ?id,
                        "operation succeeded"
                    );
                }
            }
            ResultEnvelope::Failure { response, .. } => {
                if policy.logs_error() {
                    warn!(
                        operation = %operation,
                        mode = %self.config.mode,
                        kind = %response.kind,
                        http_status = ?response.http_status,
                        param = ?response.param,
                        error_message = ?response.message,
                        "operation failed"
                    );
                }
            }
        }
    }
}

/// Payload without routing keys
fn strip_routing_keys(payload: &Payload) -> Payload {
    payload
        .iter()
        .filter(|(key, _)| !ROUTING_KEYS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn validate_required(
    operation: Operation,
    handler: &Handler,
    payload: &Payload,
) -> PaymentResult<()> {
    for key in handler.required_keys() {
        let present = match payload.get(key) {
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(Value::Object(map)) if key == FIELDS => !map.is_empty(),
            _ => false,
        };
        if !present {
            return Err(PaymentError::MissingParameter {
                operation: operation.as_str().to_string(),
                param: key.to_string(),
            });
        }
    }
    Ok(())
}

fn routing_id<'a>(payload: &'a Payload, key: &str) -> GatewayResult<&'a str> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| GatewayError::unexpected(format!("routing key {} missing", key)))
}

fn lookup<'a>(object: &'a GatewayObject, segments: &[&str]) -> Option<&'a GatewayValue> {
    let (first, rest) = segments.split_first()?;
    let mut current = object.get(first)?;
    for segment in rest {
        current = match current {
            GatewayValue::Object(obj) => obj.get(segment)?,
            GatewayValue::Map(map) => map.get(*segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn slot_mut<'a>(flat: &'a mut Payload, segments: &[&str]) -> Option<&'a mut Value> {
    let (first, rest) = segments.split_first()?;
    let mut current = flat.get_mut(*first)?;
    for segment in rest {
        current = current.as_object_mut()?.get_mut(*segment)?;
    }
    Some(current)
}
