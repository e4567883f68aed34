//! Legal states and legal transitions per entity kind.
//!
//! The tables are plain static data: adding a kind means adding one
//! [`StateMachine`] value and one arm in [`machine`].
use crate::bid::BidState;
use crate::contract::ContractState;
use crate::entity::Kind;
use crate::invoice::InvoiceState;

/// State code used by kinds without a workflow (Config, Event).
pub const SINGLE_STATE: u8 = 0;

#[derive(Debug)]
pub struct StateMachine {
    legal: &'static [u8],
    // current state -> states reachable in one mutation
    transitions: &'static [(u8, &'static [u8])],
}

impl StateMachine {
    pub fn is_legal(&self, state: u8) -> bool {
        self.legal.contains(&state)
    }
    pub fn can_transition(&self, from: u8, to: u8) -> bool {
        self.reachable(from).contains(&to)
    }
    pub fn reachable(&self, from: u8) -> &'static [u8] {
        self.transitions
            .iter()
            .find(|(state, _)| *state == from)
            .map(|(_, targets)| *targets)
            .unwrap_or(&[])
    }
    pub fn legal_states(&self) -> &'static [u8] {
        self.legal
    }
}

// TODO: confirm with the contract owners whether a Signed contract may fall back to Unknown
static CONTRACT: StateMachine = StateMachine {
    legal: &[
        ContractState::Unknown as u8,
        ContractState::Signed as u8,
        ContractState::Completed as u8,
    ],
    transitions: &[
        (ContractState::Unknown as u8, &[ContractState::Unknown as u8]),
        (ContractState::Signed as u8, &[ContractState::Completed as u8]),
        (
            ContractState::Completed as u8,
            &[ContractState::Completed as u8],
        ),
    ],
};

static INVOICE: StateMachine = StateMachine {
    legal: &[
        InvoiceState::Unknown as u8,
        InvoiceState::Issued as u8,
        InvoiceState::Signed as u8,
        InvoiceState::ForSale as u8,
        InvoiceState::Sold as u8,
        InvoiceState::Removed as u8,
        InvoiceState::Rejected as u8,
    ],
    transitions: &[
        (InvoiceState::Unknown as u8, &[InvoiceState::Unknown as u8]),
        (
            InvoiceState::Issued as u8,
            &[
                InvoiceState::Issued as u8,
                InvoiceState::Signed as u8,
                InvoiceState::Rejected as u8,
            ],
        ),
        (
            InvoiceState::Signed as u8,
            &[InvoiceState::Signed as u8, InvoiceState::ForSale as u8],
        ),
        (
            InvoiceState::ForSale as u8,
            &[
                InvoiceState::ForSale as u8,
                InvoiceState::Sold as u8,
                InvoiceState::Removed as u8,
            ],
        ),
        (InvoiceState::Sold as u8, &[InvoiceState::Sold as u8]),
        (
            InvoiceState::Removed as u8,
            &[InvoiceState::Removed as u8, InvoiceState::ForSale as u8],
        ),
        (InvoiceState::Rejected as u8, &[InvoiceState::Rejected as u8]),
    ],
};

static BID: StateMachine = StateMachine {
    legal: &[
        BidState::Unknown as u8,
        BidState::Issued as u8,
        BidState::Accepted as u8,
        BidState::Canceled as u8,
    ],
    transitions: &[
        (BidState::Unknown as u8, &[BidState::Unknown as u8]),
        (
            BidState::Issued as u8,
            &[
                BidState::Issued as u8,
                BidState::Accepted as u8,
                BidState::Canceled as u8,
            ],
        ),
        (BidState::Accepted as u8, &[BidState::Accepted as u8]),
        (BidState::Canceled as u8, &[BidState::Canceled as u8]),
    ],
};

static CONFIG: StateMachine = StateMachine {
    legal: &[SINGLE_STATE],
    transitions: &[(SINGLE_STATE, &[SINGLE_STATE])],
};

// events are append-only: nothing is reachable, so any rewrite is rejected
static EVENT: StateMachine = StateMachine {
    legal: &[SINGLE_STATE],
    transitions: &[],
};

pub fn machine(kind: Kind) -> &'static StateMachine {
    match kind {
        Kind::Config => &CONFIG,
        Kind::Contract => &CONTRACT,
        Kind::Invoice => &INVOICE,
        Kind::Bid => &BID,
        Kind::Event => &EVENT,
    }
}

pub fn is_legal_state(kind: Kind, state: u8) -> bool {
    machine(kind).is_legal(state)
}

pub fn can_transition(kind: Kind, from: u8, to: u8) -> bool {
    machine(kind).can_transition(from, to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_reachable_state_is_legal() {
        for kind in Kind::ALL {
            let machine = machine(kind);
            for &from in machine.legal_states() {
                for &to in machine.reachable(from) {
                    assert!(machine.is_legal(to), "{kind}: {from} -> {to}");
                }
            }
        }
    }

    #[test]
    fn contract_table_has_no_way_back() {
        assert_eq!(machine(Kind::Contract).legal_states().len(), 3);
        assert!(can_transition(Kind::Contract, 1, 2));
        assert!(!can_transition(Kind::Contract, 1, 0));
        assert!(!can_transition(Kind::Contract, 1, 1));
        assert!(!can_transition(Kind::Contract, 2, 1));
        assert!(!is_legal_state(Kind::Contract, 5));
    }

    #[test]
    fn invoice_cannot_skip_to_sold() {
        let issued = InvoiceState::Issued as u8;
        assert!(!can_transition(Kind::Invoice, issued, InvoiceState::Sold as u8));
        assert!(can_transition(Kind::Invoice, issued, InvoiceState::Signed as u8));
        assert!(can_transition(Kind::Invoice, issued, issued));
    }

    #[test]
    fn events_are_append_only() {
        assert!(is_legal_state(Kind::Event, SINGLE_STATE));
        assert!(!can_transition(Kind::Event, SINGLE_STATE, SINGLE_STATE));
    }

    #[test]
    fn unknown_source_state_reaches_nothing() {
        assert!(machine(Kind::Bid).reachable(42).is_empty());
        assert!(!can_transition(Kind::Bid, 42, 1));
    }
}
