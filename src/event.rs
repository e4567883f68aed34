//! Audit events, one per mutation. Events are written once and never updated.
use crate::entity::{Entity, Kind, Snapshot};
use crate::error::{Error, Result};
use crate::state::SINGLE_STATE;
use crate::types::{EntityId, TimeStamp};

const EVENT_KEY_PARTS: usize = 1;

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Event {
    #[n(0)]
    pub id: EntityId,
    #[n(1)]
    pub value: EventValue,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
#[cbor(map)]
pub struct EventValue {
    #[n(0)]
    pub entity_type: String, // index name of the mutated kind
    #[n(1)]
    pub entity_id: String,
    #[n(2)]
    pub other: Option<Snapshot>, // value of the entity at mutation time
    #[n(3)]
    pub creator: String,
    #[n(4)]
    pub timestamp: TimeStamp,
}

impl Event {
    pub fn new(id: EntityId, value: EventValue) -> Self {
        Self { id, value }
    }
}

impl EventValue {
    pub fn entity_kind(&self) -> Option<Kind> {
        Kind::from_index_name(&self.entity_type)
    }
}

impl Entity for Event {
    const KIND: Kind = Kind::Event;
    type Value = EventValue;

    fn from_key_parts(parts: &[&str]) -> Result<Self> {
        if parts.len() != EVENT_KEY_PARTS {
            return Err(Error::validation(format!(
                "composite key parts array must contain {EVENT_KEY_PARTS} items"
            )));
        }
        let value = EventValue {
            entity_type: String::new(),
            entity_id: String::new(),
            other: None,
            creator: String::new(),
            timestamp: TimeStamp::default(),
        };
        Ok(Self::new(EntityId::parse(parts[0])?, value))
    }
    fn key_parts(&self) -> Vec<String> {
        vec![self.id.to_string()]
    }
    fn value(&self) -> &EventValue {
        &self.value
    }
    fn set_value(&mut self, value: EventValue) {
        self.value = value;
    }
    fn state_of(_: &EventValue) -> u8 {
        SINGLE_STATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::Invoice;

    #[test]
    fn value_keeps_the_snapshot() {
        let invoice = Invoice::new(EntityId::new());
        let event = Event::new(
            EntityId::new(),
            EventValue {
                entity_type: Kind::Invoice.index_name().to_string(),
                entity_id: invoice.id.to_string(),
                other: Some(Snapshot::from(&invoice)),
                creator: "SupplierMSP".into(),
                timestamp: TimeStamp::from_unix(1_700_000_000).unwrap(),
            },
        );

        let bytes = event.encode_value().unwrap();
        let decoded = Event::decode_value(&bytes).unwrap();

        assert_eq!(decoded, event.value);
        assert_eq!(decoded.entity_kind(), Some(Kind::Invoice));
        assert_eq!(event.state(), SINGLE_STATE);
    }

    #[test]
    fn key_is_the_event_id() {
        let id = EntityId::new();
        let event = Event::from_key_parts(&[id.to_string().as_str()]).unwrap();

        assert_eq!(event.id, id);
        assert!(Event::from_key_parts(&["a", "b"]).is_err());
    }
}
