//! Context resolver: turns a model function call into backend data.
//!
//! Dispatch is a closed match over [`FunctionName`].  Whatever comes back
//! is wrapped in a [`ResolvedContext`], which serializes to the
//! `{events|tickets|checkout|message}` object recorded as the function
//! result in the conversation.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tb_domain::error::{Error, Result};
use tb_domain::tool::FunctionCall;
use tb_domain::FunctionName;
use tb_sessions::{PendingSelection, SelectionStore};
use tb_ticketing::{Event, PurchaseRequest, TicketTier, TicketingBackend};

pub const SELECTION_STORED: &str = "Ticket purchase details stored";
pub const PURCHASE_WINDOW_EXPIRED: &str =
    "Ticket purchase window has expired. Please restart the process";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedContext {
    Events(Vec<Event>),
    Tickets(Vec<TicketTier>),
    Checkout(String),
    Message(String),
}

impl ResolvedContext {
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

pub struct ContextResolver {
    backend: Arc<dyn TicketingBackend>,
    selections: Arc<SelectionStore>,
}

impl ContextResolver {
    pub fn new(backend: Arc<dyn TicketingBackend>, selections: Arc<SelectionStore>) -> Self {
        Self {
            backend,
            selections,
        }
    }

    /// Resolve `call` on behalf of `user_id` (the buyer's phone id).
    pub async fn resolve(&self, call: &FunctionCall, user_id: &str) -> Result<ResolvedContext> {
        let name: FunctionName = call.name.parse()?;
        tracing::debug!(function = %name, "resolving function call");

        match name {
            FunctionName::FindEvents => {
                let query = find_events_query(&call.args);
                Ok(ResolvedContext::Events(
                    self.backend.find_events(&query).await?,
                ))
            }
            // Coordinates only arrive with a location message; see `nearby`.
            FunctionName::FindNearbyEvents => Err(Error::InvalidFunctionName(name.to_string())),
            FunctionName::FindTrendingEvents => Ok(ResolvedContext::Events(
                self.backend.trending_events().await?,
            )),
            FunctionName::SelectEvent => {
                let event_id = int_arg(call, "eventId")?;
                Ok(ResolvedContext::Tickets(
                    self.backend.ticket_tiers(event_id).await?,
                ))
            }
            FunctionName::SelectTicketTier => {
                let selection = PendingSelection {
                    event_id: int_arg(call, "eventId")?,
                    tier_name: str_arg(call, "tierName")?,
                    quantity: int_arg(call, "quantity")?,
                };
                self.selections.put(user_id, selection).await?;
                Ok(ResolvedContext::Message(SELECTION_STORED.into()))
            }
            FunctionName::InitiateTicketPurchase => {
                let email = str_arg(call, "email")?;
                let Some(selection) = self.selections.get(user_id) else {
                    return Ok(ResolvedContext::Message(PURCHASE_WINDOW_EXPIRED.into()));
                };
                let request = PurchaseRequest {
                    tier: selection.tier_name,
                    quantity: selection.quantity,
                    email,
                    whatsapp_phone_id: user_id.to_owned(),
                };
                let link = self.backend.purchase(selection.event_id, &request).await?;
                Ok(ResolvedContext::Checkout(link))
            }
        }
    }

    /// Events near a shared location.  Coordinates are truncated to whole
    /// degrees before they reach the backend.
    pub async fn nearby(&self, latitude: f64, longitude: f64) -> Result<Vec<Event>> {
        self.backend
            .nearby_events(latitude.trunc() as i64, longitude.trunc() as i64)
            .await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Argument helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Map `find_events` arguments onto query parameters.
///
/// `numberOfQueries` becomes `page`, arrays expand into repeated
/// parameters and nulls are dropped.
pub fn find_events_query(args: &Map<String, Value>) -> Vec<(String, String)> {
    let mut query = Vec::new();
    for (key, value) in args {
        let param = if key == "numberOfQueries" {
            "page"
        } else {
            key.as_str()
        };
        match value {
            Value::Array(items) => {
                for item in items {
                    if let Some(s) = scalar(item) {
                        query.push((param.to_owned(), s));
                    }
                }
            }
            other => {
                if let Some(s) = scalar(other) {
                    query.push((param.to_owned(), s));
                }
            }
        }
    }
    query
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 => (f as i64).to_string(),
            _ => n.to_string(),
        }),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Models send JSON numbers for ids and quantities, sometimes as `2.0`,
/// sometimes as strings.
fn int_arg(call: &FunctionCall, key: &str) -> Result<i64> {
    let parsed = match call.arg(key) {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().map(|f| f.trunc() as i64),
        _ => None,
    };
    parsed.ok_or_else(|| missing_arg(call, key))
}

fn str_arg(call: &FunctionCall, key: &str) -> Result<String> {
    match call.arg(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(missing_arg(call, key)),
    }
}

fn missing_arg(call: &FunctionCall, key: &str) -> Error {
    Error::Other(format!("{}: missing or invalid argument '{key}'", call.name))
}
