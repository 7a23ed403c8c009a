//! # Operation Registry
//!
//! Every public operation is registered against a typed handler describing
//! which remote calls it needs. Handlers come in four families:
//!
//! | family | remote calls |
//! |--------|--------------|
//! | `Create` | create on a top-level collection |
//! | `RetrieveThenMutate` | retrieve by id, then save / delete / action (or nothing) |
//! | `List` | list one page of a top-level collection |
//! | `Nested` | retrieve the owning customer, then work on one of its sub-collections |

use crate::error::PaymentError;
use crate::gateway::Action;
use crate::object::ObjectKind;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

// Routing keys: select or locate a resource, never forwarded as attributes.
pub const CHARGE_ID: &str = "charge_id";
pub const CUSTOMER_ID: &str = "customer_id";
pub const CARD_ID: &str = "card_id";
pub const SUBSCRIPTION_ID: &str = "subscription_id";
pub const PLAN_ID: &str = "plan_id";
pub const COUPON_ID: &str = "coupon_id";
pub const EVENT_ID: &str = "event_id";
/// Sub-map of attribute updates for update operations
pub const FIELDS: &str = "fields";

pub const ROUTING_KEYS: &[&str] = &[
    CHARGE_ID,
    CUSTOMER_ID,
    CARD_ID,
    SUBSCRIPTION_ID,
    PLAN_ID,
    COUPON_ID,
    EVENT_ID,
    FIELDS,
];

/// Customer sub-collection holding payment cards
pub const CARDS_FIELD: &str = "sources";
/// Customer sub-collection holding subscriptions
pub const SUBSCRIPTIONS_FIELD: &str = "subscriptions";

/// Paginated sub-collections whose elements get a second flattening pass,
/// keyed by the kind of the object that embeds them. Paths are dotted.
pub fn expansion_paths(kind: &ObjectKind) -> &'static [&'static str] {
    match kind {
        ObjectKind::Charge => &["refunds"],
        ObjectKind::Customer => &["sources", "cards", "subscriptions"],
        ObjectKind::Event => &[
            "data.object.refunds",
            "data.object.sources",
            "data.object.cards",
        ],
        _ => &[],
    }
}

macro_rules! operations {
    ($($variant:ident => $name:literal,)+) => {
        /// Supported operations, by their public name
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Operation {
            $($variant,)+
        }

        impl Operation {
            pub const ALL: &'static [Operation] = &[$(Operation::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Operation::$variant => $name,)+
                }
            }
        }

        impl FromStr for Operation {
            type Err = PaymentError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Operation::$variant),)+
                    other => Err(PaymentError::UnknownOperation(other.to_string())),
                }
            }
        }
    };
}

operations! {
    Charge => "charge",
    RetrieveCharge => "retrieveCharge",
    UpdateCharge => "updateCharge",
    RefundCharge => "refundCharge",
    CaptureCharge => "captureCharge",
    ListCharges => "listCharges",
    CreateCustomer => "createCustomer",
    RetrieveCustomer => "retrieveCustomer",
    UpdateCustomer => "updateCustomer",
    DeleteCustomer => "deleteCustomer",
    ListCustomers => "listCustomers",
    CreateCard => "createCard",
    RetrieveCard => "retrieveCard",
    UpdateCard => "updateCard",
    DeleteCard => "deleteCard",
    ListCards => "listCards",
    CreateSubscription => "createSubscription",
    RetrieveSubscription => "retrieveSubscription",
    UpdateSubscription => "updateSubscription",
    CancelSubscription => "cancelSubscription",
    ListSubscriptions => "listSubscriptions",
    CreatePlan => "createPlan",
    RetrievePlan => "retrievePlan",
    UpdatePlan => "updatePlan",
    DeletePlan => "deletePlan",
    ListPlans => "listPlans",
    CreateCoupon => "createCoupon",
    RetrieveCoupon => "retrieveCoupon",
    DeleteCoupon => "deleteCoupon",
    ListCoupons => "listCoupons",
    DeleteCustomerDiscount => "deleteCustomerDiscount",
    RetrieveEvent => "retrieveEvent",
    ListEvents => "listEvents",
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to a resource once it has been retrieved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Return it as retrieved
    Fetch,
    /// Apply the `fields` sub-map, then save once
    Update,
    /// Delete it
    Delete,
    /// Run an instance action with the remaining payload as parameters
    Perform(Action),
}

/// Create on a top-level collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSpec {
    pub kind: ObjectKind,
    /// Inject the configured currency when the payload has none
    pub inject_currency: bool,
}

/// Retrieve a top-level resource by id, then mutate it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutateSpec {
    pub kind: ObjectKind,
    pub id_key: &'static str,
    pub mutation: Mutation,
}

/// List a top-level collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSpec {
    pub kind: ObjectKind,
}

/// What to do on a customer's sub-collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NestedTarget {
    /// Create a member. With a `body_key`, the parameters are that sub-map
    /// of the payload; otherwise the payload minus routing keys.
    Create { body_key: Option<&'static str> },
    /// Retrieve a member by id, then mutate it
    Member {
        id_key: &'static str,
        mutation: Mutation,
    },
    /// List the sub-collection
    List,
}

/// Work on a sub-collection of the customer named by `customer_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedSpec {
    pub kind: ObjectKind,
    /// Field of the customer that holds the sub-collection
    pub field: &'static str,
    pub target: NestedTarget,
}

/// Typed handler for one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handler {
    Create(CreateSpec),
    RetrieveThenMutate(MutateSpec),
    List(ListSpec),
    Nested(NestedSpec),
}

impl Handler {
    fn create(kind: ObjectKind, inject_currency: bool) -> Self {
        Handler::Create(CreateSpec {
            kind,
            inject_currency,
        })
    }

    fn mutate(kind: ObjectKind, id_key: &'static str, mutation: Mutation) -> Self {
        Handler::RetrieveThenMutate(MutateSpec {
            kind,
            id_key,
            mutation,
        })
    }

    fn list(kind: ObjectKind) -> Self {
        Handler::List(ListSpec { kind })
    }

    fn nested(kind: ObjectKind, field: &'static str, target: NestedTarget) -> Self {
        Handler::Nested(NestedSpec {
            kind,
            field,
            target,
        })
    }

    /// Payload keys that must be present and non-empty
    pub fn required_keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        match self {
            Handler::Create(_) | Handler::List(_) => {}
            Handler::RetrieveThenMutate(spec) => {
                keys.push(spec.id_key);
                if spec.mutation == Mutation::Update {
                    keys.push(FIELDS);
                }
            }
            Handler::Nested(spec) => {
                keys.push(CUSTOMER_ID);
                if let NestedTarget::Member { id_key, mutation } = &spec.target {
                    keys.push(*id_key);
                    if *mutation == Mutation::Update {
                        keys.push(FIELDS);
                    }
                }
            }
        }
        keys
    }

    /// Family name (for logging)
    pub fn family(&self) -> &'static str {
        match self {
            Handler::Create(_) => "create",
            Handler::RetrieveThenMutate(_) => "retrieve_then_mutate",
            Handler::List(_) => "list",
            Handler::Nested(_) => "nested",
        }
    }
}

/// Operation → handler table
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    handlers: HashMap<Operation, Handler>,
}

impl OperationRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with every supported operation
    pub fn standard() -> Self {
        use ObjectKind::*;
        use Operation as Op;

        let card_member = |mutation| NestedTarget::Member {
            id_key: CARD_ID,
            mutation,
        };
        let subscription_member = |mutation| NestedTarget::Member {
            id_key: SUBSCRIPTION_ID,
            mutation,
        };

        Self::new()
            // Charges
            .with_handler(Op::Charge, Handler::create(Charge, true))
            .with_handler(Op::RetrieveCharge, Handler::mutate(Charge, CHARGE_ID, Mutation::Fetch))
            .with_handler(Op::UpdateCharge, Handler::mutate(Charge, CHARGE_ID, Mutation::Update))
            .with_handler(
                Op::RefundCharge,
                Handler::mutate(Charge, CHARGE_ID, Mutation::Perform(Action::Refund)),
            )
            .with_handler(
                Op::CaptureCharge,
                Handler::mutate(Charge, CHARGE_ID, Mutation::Perform(Action::Capture)),
            )
            .with_handler(Op::ListCharges, Handler::list(Charge))
            // Customers
            .with_handler(Op::CreateCustomer, Handler::create(Customer, false))
            .with_handler(
                Op::RetrieveCustomer,
                Handler::mutate(Customer, CUSTOMER_ID, Mutation::Fetch),
            )
            .with_handler(
                Op::UpdateCustomer,
                Handler::mutate(Customer, CUSTOMER_ID, Mutation::Update),
            )
            .with_handler(
                Op::DeleteCustomer,
                Handler::mutate(Customer, CUSTOMER_ID, Mutation::Delete),
            )
            .with_handler(Op::ListCustomers, Handler::list(Customer))
            .with_handler(
                Op::DeleteCustomerDiscount,
                Handler::mutate(
                    Customer,
                    CUSTOMER_ID,
                    Mutation::Perform(Action::DeleteDiscount),
                ),
            )
            // Cards
            .with_handler(
                Op::CreateCard,
                Handler::nested(Card, CARDS_FIELD, NestedTarget::Create { body_key: None }),
            )
            .with_handler(
                Op::RetrieveCard,
                Handler::nested(Card, CARDS_FIELD, card_member(Mutation::Fetch)),
            )
            .with_handler(
                Op::UpdateCard,
                Handler::nested(Card, CARDS_FIELD, card_member(Mutation::Update)),
            )
            .with_handler(
                Op::DeleteCard,
                Handler::nested(Card, CARDS_FIELD, card_member(Mutation::Delete)),
            )
            .with_handler(
                Op::ListCards,
                Handler::nested(Card, CARDS_FIELD, NestedTarget::List),
            )
            // Subscriptions
            .with_handler(
                Op::CreateSubscription,
                Handler::nested(
                    Subscription,
                    SUBSCRIPTIONS_FIELD,
                    NestedTarget::Create {
                        body_key: Some("subscription"),
                    },
                ),
            )
            .with_handler(
                Op::RetrieveSubscription,
                Handler::nested(
                    Subscription,
                    SUBSCRIPTIONS_FIELD,
                    subscription_member(Mutation::Fetch),
                ),
            )
            .with_handler(
                Op::UpdateSubscription,
                Handler::nested(
                    Subscription,
                    SUBSCRIPTIONS_FIELD,
                    subscription_member(Mutation::Update),
                ),
            )
            .with_handler(
                Op::CancelSubscription,
                Handler::nested(
                    Subscription,
                    SUBSCRIPTIONS_FIELD,
                    subscription_member(Mutation::Perform(Action::Cancel)),
                ),
            )
            .with_handler(
                Op::ListSubscriptions,
                Handler::nested(Subscription, SUBSCRIPTIONS_FIELD, NestedTarget::List),
            )
            // Plans
            .with_handler(Op::CreatePlan, Handler::create(Plan, true))
            .with_handler(Op::RetrievePlan, Handler::mutate(Plan, PLAN_ID, Mutation::Fetch))
            .with_handler(Op::UpdatePlan, Handler::mutate(Plan, PLAN_ID, Mutation::Update))
            .with_handler(Op::DeletePlan, Handler::mutate(Plan, PLAN_ID, Mutation::Delete))
            .with_handler(Op::ListPlans, Handler::list(Plan))
            // Coupons
            .with_handler(Op::CreateCoupon, Handler::create(Coupon, true))
            .with_handler(
                Op::RetrieveCoupon,
                Handler::mutate(Coupon, COUPON_ID, Mutation::Fetch),
            )
            .with_handler(
                Op::DeleteCoupon,
                Handler::mutate(Coupon, COUPON_ID, Mutation::Delete),
            )
            .with_handler(Op::ListCoupons, Handler::list(Coupon))
            // Events
            .with_handler(Op::RetrieveEvent, Handler::mutate(Event, EVENT_ID, Mutation::Fetch))
            .with_handler(Op::ListEvents, Handler::list(Event))
    }

    /// Register a handler, replacing any previous one
    pub fn register(&mut self, operation: Operation, handler: Handler) {
        self.handlers.insert(operation, handler);
    }

    /// Register with builder pattern
    pub fn with_handler(mut self, operation: Operation, handler: Handler) -> Self {
        self.register(operation, handler);
        self
    }

    pub fn get(&self, operation: Operation) -> Option<&Handler> {
        self.handlers.get(&operation)
    }

    /// Registered operations, in declaration order
    pub fn operations(&self) -> Vec<Operation> {
        Operation::ALL
            .iter()
            .copied()
            .filter(|op| self.handlers.contains_key(op))
            .collect()
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
