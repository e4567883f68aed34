//! Smoke screen unit tests for the trade finance components
//!
//! These tests span the public surface of each module in isolation from
//! the integration scenarios. They mostly cover the happy path.
//!
use trade_finance::{
    Entity, EntityId, FromArguments, Identity, Kind, Operation, Record, Role, Snapshot,
    TimeStamp,
    auth::authorize,
    bid::Bid,
    config::Config,
    contract::{Contract, ContractState},
    invoice::{Invoice, InvoiceState},
    key, state,
};

// TYPES MODULE TESTS
#[cfg(test)]
mod types_tests {
    use super::*;

    /// Generated ids are version 7 and parse back from their display form
    #[test]
    fn ids_round_trip_through_display() {
        let id = EntityId::new();
        let parsed: EntityId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    /// Multiple calls generate unique identifiers
    #[test]
    fn generates_unique_ids() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
    }

    /// TimeStamp::new() is close to the current time
    #[test]
    fn timestamp_new_creates_current_time() {
        let ts = TimeStamp::new();
        let now = chrono::Utc::now();

        let diff = (now - ts.to_datetime_utc()).num_seconds().abs();
        assert!(diff < 2);
    }

    /// Timestamps are stored as whole Unix seconds
    #[test]
    fn timestamp_from_unix() {
        let ts = TimeStamp::from_unix(1_700_000_000).unwrap();
        assert_eq!(ts.unix(), 1_700_000_000);
        let epoch: TimeStamp = TimeStamp::default();
        assert_eq!(epoch.unix(), 0);
    }
}

// KEY MODULE TESTS
#[cfg(test)]
mod key_tests {
    use super::*;

    /// Entity keys carry the kind's index name and the id
    #[test]
    fn entity_key_layout() {
        let id = EntityId::new();
        let invoice = Invoice::new(id.clone());

        let parts = invoice.encode_key().unwrap().parse().unwrap();
        assert_eq!(parts.index, "Invoice");
        assert_eq!(parts.parts, vec![id.to_string()]);
    }

    /// A kind-wide prefix covers every key of that kind only
    #[test]
    fn kind_prefix_is_exclusive() {
        let prefix = key::prefix::<&str>("Bid", &[]).unwrap();
        let bid = Bid::new(EntityId::new());
        let invoice = Invoice::new(EntityId::new());

        assert!(bid.encode_key().unwrap().starts_with(&prefix));
        assert!(!invoice.encode_key().unwrap().starts_with(&prefix));
    }
}

// STATE MODULE TESTS
#[cfg(test)]
mod state_tests {
    use super::*;

    /// The invoice workflow from issue to sale is a chain of legal moves
    #[test]
    fn invoice_happy_path_is_legal() {
        let path = [
            InvoiceState::Issued,
            InvoiceState::Signed,
            InvoiceState::ForSale,
            InvoiceState::Removed,
            InvoiceState::ForSale,
            InvoiceState::Sold,
        ];
        for pair in path.windows(2) {
            assert!(
                state::can_transition(Kind::Invoice, pair[0] as u8, pair[1] as u8),
                "{:?} -> {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    /// Terminal states only reach themselves
    #[test]
    fn terminal_states_are_closed() {
        let machine = state::machine(Kind::Invoice);
        assert_eq!(machine.reachable(InvoiceState::Sold as u8), &[4]);
        assert_eq!(machine.reachable(InvoiceState::Rejected as u8), &[6]);
    }
}

// ENTITY MODULE TESTS
#[cfg(test)]
mod entity_tests {
    use super::*;

    /// Arguments fill a contract with its declared state
    #[test]
    fn contract_from_arguments() {
        let id = EntityId::new().to_string();
        let contract = Contract::from_arguments(&[
            id.as_str(),
            "Acme",
            "Globex",
            "1000.0",
            "5",
            "Berlin",
            "1700000000",
            "1700500000",
            "1",
        ])
        .unwrap();

        assert_eq!(contract.value.state, ContractState::Signed);
        assert_eq!(contract.value.destination, "Berlin");
        assert_eq!(contract.value.due_date.unix(), 1_700_000_000);
    }

    /// Stored records decode back to the right kind
    #[test]
    fn record_decodes_any_kind() {
        let mut invoice = Invoice::new(EntityId::new());
        invoice.value.state = InvoiceState::Issued;

        let key = invoice.encode_key().unwrap();
        let bytes = invoice.encode_value().unwrap();
        let record = Record::decode(&key, &bytes).unwrap();

        assert_eq!(record.kind(), Kind::Invoice);
        assert_eq!(record, Record::Invoice(invoice));
    }

    /// Snapshots keep the kind of the entity they were taken from
    #[test]
    fn snapshot_kind() {
        let config = Config::new("tfcc");
        assert_eq!(Snapshot::from(&config).kind(), Kind::Config);

        let bid = Bid::new(EntityId::new());
        assert_eq!(Snapshot::from(&bid).kind(), Kind::Bid);
    }
}

// AUTH MODULE TESTS
#[cfg(test)]
mod auth_tests {
    use super::*;

    /// Listing is open to any member
    #[test]
    fn listing_is_open() {
        let anyone = Identity::new("AnyMSP", "anything");
        assert!(authorize(Operation::ListBids, &anyone).is_ok());
        assert!(authorize(Operation::GetEventPayload, &anyone).is_ok());
    }

    /// Transport agencies only complete contracts and accept invoices
    #[test]
    fn transport_agency_access() {
        let agency = Identity::with_role("TransportMSP", Role::TransportAgency);
        assert!(authorize(Operation::CompleteContract, &agency).is_ok());
        assert!(authorize(Operation::AcceptInvoice, &agency).is_ok());
        assert!(authorize(Operation::RegisterContract, &agency).is_err());
        assert!(authorize(Operation::PlaceBid, &agency).is_err());
    }
}
