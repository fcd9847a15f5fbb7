//! The closed set of functions the model may call.
//!
//! Names are matched exhaustively: anything outside the six variants is an
//! [`Error::InvalidFunctionName`] rather than a silent default.

use std::fmt;
use std::str::FromStr;

use serde_json::json;

use crate::conversation::ConversationState;
use crate::error::Error;
use crate::tool::ToolDefinition;

/// Event categories accepted by `find_events`.
pub const EVENT_CATEGORIES: &[&str] = &[
    "TECH",
    "HEALTH",
    "MUSIC",
    "COMEDY",
    "NIGHTLIFE",
    "ART",
    "FASHION",
    "SPORTS",
    "BUSINESS",
    "CONFERENCE",
    "OTHER",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionName {
    FindEvents,
    FindNearbyEvents,
    FindTrendingEvents,
    SelectEvent,
    SelectTicketTier,
    InitiateTicketPurchase,
}

impl FunctionName {
    pub const ALL: [FunctionName; 6] = [
        Self::FindEvents,
        Self::FindNearbyEvents,
        Self::FindTrendingEvents,
        Self::SelectEvent,
        Self::SelectTicketTier,
        Self::InitiateTicketPurchase,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FindEvents => "find_events",
            Self::FindNearbyEvents => "find_nearby_events",
            Self::FindTrendingEvents => "find_trending_events",
            Self::SelectEvent => "select_event",
            Self::SelectTicketTier => "select_ticket_tier",
            Self::InitiateTicketPurchase => "initiate_ticket_purchase",
        }
    }

    /// The `find_*` family, whose results are always an events list.
    pub fn is_search(self) -> bool {
        matches!(
            self,
            Self::FindEvents | Self::FindNearbyEvents | Self::FindTrendingEvents
        )
    }

    /// State the conversation enters once this function has been called.
    pub fn next_state(self) -> ConversationState {
        match self {
            Self::FindEvents | Self::FindNearbyEvents | Self::FindTrendingEvents => {
                ConversationState::EventQuery
            }
            Self::SelectEvent => ConversationState::EventSelected,
            Self::SelectTicketTier => ConversationState::TicketTierSelected,
            Self::InitiateTicketPurchase => ConversationState::AwaitingPayment,
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::FindEvents => {
                "Retrieves a list of upcoming events based on the filters (i.e. title, location, \
                 categories or date) provided by the user. Only call this function when the user \
                 has provided any of the filters. User can provide multiple filters to help the \
                 function return more accurate search results."
            }
            Self::FindNearbyEvents => "Retrieves a list of upcoming events happening close to the user",
            Self::FindTrendingEvents => "Retrieves a list of the most popular and trending events",
            Self::SelectEvent => {
                "Returns a list of ticket tiers available for the specific event selected by the \
                 user. This function is called after the user has selected a specific event from \
                 a list of options presented to them."
            }
            Self::SelectTicketTier => {
                "Stores the name of the selected ticket tier and the purchase quantity"
            }
            Self::InitiateTicketPurchase => {
                "Generates a secure checkout link to initiate purchase of the selected tickets"
            }
        }
    }

    fn parameters(self) -> serde_json::Value {
        match self {
            Self::FindEvents => json!({
                "type": "object",
                "properties": {
                    "eventTitle": {
                        "type": "string",
                        "description": "The full or partial name of the event the user is looking for \
                            (e.g. \"Burna Boy Homecoming Concert\", \"Devfest 2025\"). If it is a partial \
                            name, the function retrieves a list of events that match the search string"
                    },
                    "location": {
                        "type": "string",
                        "description": "The town, city, or state where the event is taking place."
                    },
                    "venue": {
                        "type": "string",
                        "description": "The venue where the event is taking place."
                    },
                    "startDate": {
                        "type": "string",
                        "description": "The start date of the event in ISO format: YYYY-MM-DD. \
                            If the user says \"next week\", return the ISO date string of the upcoming Monday. \
                            If the user says \"next month\", return the ISO date string of the first day of next month. \
                            If the user says \"weekend\", return the ISO date string of the upcoming Friday. \
                            Follow this process for other relative phrases (e.g. \"tomorrow\", \"a week from now\"). \
                            If the user does not provide a year, default to the year of the current date. \
                            If the date is earlier than the current date, request a valid date value."
                    },
                    "endDate": {
                        "type": "string",
                        "description": "The end date of the event in ISO format: YYYY-MM-DD. \
                            Only required if the user provides a date range (e.g. \"next month\", \"over the weekend\"). \
                            If the user says \"next week\", return the ISO date string of the upcoming Saturday. \
                            If the user says \"next month\", return the ISO date string of the last day of next month. \
                            If the user says \"weekend\", return the ISO date string of the upcoming Sunday."
                    },
                    "categories": {
                        "type": "array",
                        "description": "The category of the event to search for. Must be one of the \
                            enumerated values. User can select multiple categories",
                        "items": { "type": "string", "enum": EVENT_CATEGORIES }
                    },
                    "numberOfQueries": {
                        "type": "number",
                        "description": "Acts as a cursor to paginate the results of this function call \
                            when it is called consecutively with the same parameters to retrieve more events. \
                            Default is 1 for the first call. Value increments by 1 for each consecutive call. \
                            Resets to default value when another function is called"
                    }
                },
                "required": ["numberOfQueries"]
            }),
            Self::FindNearbyEvents | Self::FindTrendingEvents => json!({
                "type": "object",
                "properties": {}
            }),
            Self::SelectEvent => json!({
                "type": "object",
                "properties": {
                    "eventId": {
                        "type": "number",
                        "description": "The ID of the event selected by the user"
                    }
                },
                "required": ["eventId"]
            }),
            Self::SelectTicketTier => json!({
                "type": "object",
                "properties": {
                    "eventId": {
                        "type": "number",
                        "description": "The ID of the event the ticket tier belongs to. Must match \
                            the ID of the specific event earlier selected by the user."
                    },
                    "tierName": {
                        "type": "string",
                        "description": "The name of the ticket tier the user intends to purchase. \
                            This must match the names of the ticket tiers available in the selected event."
                    },
                    "quantity": {
                        "type": "number",
                        "description": "The number of tickets the user intends to purchase in the selected tier"
                    }
                },
                "required": ["eventId", "tierName", "quantity"]
            }),
            Self::InitiateTicketPurchase => json!({
                "type": "object",
                "properties": {
                    "email": {
                        "type": "string",
                        "description": "Valid email address of the user, required to generate checkout link"
                    }
                },
                "required": ["email"]
            }),
        }
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.as_str().to_owned(),
            description: self.description().to_owned(),
            parameters: self.parameters(),
        }
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FunctionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| Error::InvalidFunctionName(s.to_owned()))
    }
}

/// The fixed function schema sent with every LLM request.
pub fn definitions() -> Vec<ToolDefinition> {
    FunctionName::ALL.into_iter().map(FunctionName::definition).collect()
}
