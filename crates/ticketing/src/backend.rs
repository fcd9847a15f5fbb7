use async_trait::async_trait;
use tb_domain::error::Result;

use crate::types::{Event, PurchaseRequest, TicketTier};

/// Operations the assistant needs from the ticketing backend.
///
/// Implementations do not retry: a non-success status or an undecodable
/// body is returned as [`tb_domain::Error::BackendRequestFailed`].
#[async_trait]
pub trait TicketingBackend: Send + Sync {
    /// `GET /events` with filter query parameters.
    async fn find_events(&self, query: &[(String, String)]) -> Result<Vec<Event>>;

    /// `GET /events/nearby` for whole-degree coordinates.
    async fn nearby_events(&self, latitude: i64, longitude: i64) -> Result<Vec<Event>>;

    /// `GET /events/trending`.
    async fn trending_events(&self) -> Result<Vec<Event>>;

    /// `GET /events/{id}/tickets`.
    async fn ticket_tiers(&self, event_id: i64) -> Result<Vec<TicketTier>>;

    /// `POST /events/{id}/tickets/purchase`; returns the checkout link.
    async fn purchase(&self, event_id: i64, request: &PurchaseRequest) -> Result<String>;
}
