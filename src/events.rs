// 11.0: every committed state change produces an event. used for audit trails and for
// notifying external systems. the EventPayload enum lists all event types.

use crate::connector::Weight;
use crate::fee::FeePolicy;
use crate::types::{AccountName, ConversionMode, Direction, ExtendedAsset, ExtendedSymbol, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    // Admin events
    Initialized(InitializedEvent),
    Connected(ConnectedEvent),
    ChargeUpdated(ChargeUpdatedEvent),
    ChargeRemoved(ChargeRemovedEvent),
    OwnerChanged(OwnerChangedEvent),

    // Conversion events
    Converted(ConvertedEvent),
    ConversionRejected(ConversionRejectedEvent),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializedEvent {
    pub owner: AccountName,
    pub connected: ExtendedSymbol,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedEvent {
    pub smart: ExtendedSymbol,
    pub balance: ExtendedAsset,
    pub weight: Weight,
}

// target None = the global default policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeUpdatedEvent {
    pub target: Option<ExtendedSymbol>,
    pub policy: FeePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRemovedEvent {
    pub smart: ExtendedSymbol,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerChangedEvent {
    pub previous: AccountName,
    pub owner: AccountName,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertedEvent {
    pub sender: AccountName,
    pub smart: ExtendedSymbol,
    pub direction: Direction,
    pub mode: ConversionMode,
    pub paid: ExtendedAsset,
    pub received: ExtendedAsset,
    pub fee: ExtendedAsset,
    pub ratio: Decimal,
    pub override_applied: bool,
    pub balance_after: ExtendedAsset,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRejectedEvent {
    pub sender: AccountName,
    pub from: ExtendedAsset,
    pub to: ExtendedAsset,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes() {
        let event = Event::new(
            EventId(7),
            Timestamp::from_millis(1_000),
            EventPayload::ChargeRemoved(ChargeRemovedEvent {
                smart: ExtendedSymbol::new("TKN", 4, "tkn.token"),
            }),
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("ChargeRemoved"));
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, EventId(7));
    }
}
