//! Factor bids on invoices placed for sale
use crate::entity::{Entity, Kind};
use crate::error::{Error, Result};
use crate::types::{EntityId, TimeStamp};
use crate::utils;

const BID_KEY_PARTS: usize = 1;
const BID_ARGUMENTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
#[cbor(index_only)]
#[repr(u8)]
pub enum BidState {
    #[n(0)]
    Unknown,
    #[n(1)]
    Issued,
    #[n(2)]
    Accepted,
    #[n(3)]
    Canceled,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Bid {
    #[n(0)]
    pub id: EntityId,
    #[n(1)]
    pub value: BidValue,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
#[cbor(map)]
pub struct BidValue {
    #[n(0)]
    pub rate: f32,
    #[n(1)]
    pub factor_id: String, // MSP id of the bidding factor
    /// Unset only on a bid built from its key and not yet loaded.
    #[n(2)]
    pub invoice_id: Option<EntityId>,
    #[n(3)]
    pub state: BidState,
    #[n(4)]
    pub timestamp: TimeStamp,
}

impl From<BidState> for u8 {
    fn from(state: BidState) -> Self {
        state as u8
    }
}

impl TryFrom<u8> for BidState {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(BidState::Unknown),
            1 => Ok(BidState::Issued),
            2 => Ok(BidState::Accepted),
            3 => Ok(BidState::Canceled),
            _ => Err(Error::validation(format!("bid state is invalid: {code}"))),
        }
    }
}

/// Rate and target invoice as supplied by the bidding factor.
#[derive(Debug, Clone, PartialEq)]
pub struct BidTerms {
    pub rate: f32,
    pub invoice_id: EntityId,
}

impl Bid {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            value: BidValue {
                rate: 0.0,
                factor_id: String::new(),
                invoice_id: None,
                state: BidState::Unknown,
                timestamp: TimeStamp::default(),
            },
        }
    }

    /// A new bid under a ledger-issued `id`.
    pub fn with_terms(id: EntityId, terms: BidTerms) -> Self {
        let mut bid = Self::new(id);
        bid.value.rate = terms.rate;
        bid.value.invoice_id = Some(terms.invoice_id);
        bid
    }

    /// The invoice this bid targets.
    pub fn invoice_id(&self) -> Result<&EntityId> {
        self.value
            .invoice_id
            .as_ref()
            .ok_or_else(|| Error::validation(format!("bid {} targets no invoice", self.id)))
    }
}

impl Entity for Bid {
    const KIND: Kind = Kind::Bid;
    type Value = BidValue;

    fn from_key_parts(parts: &[&str]) -> Result<Self> {
        if parts.len() != BID_KEY_PARTS {
            return Err(Error::validation(format!(
                "composite key parts array must contain {BID_KEY_PARTS} items"
            )));
        }
        Ok(Self::new(EntityId::parse(parts[0])?))
    }
    fn key_parts(&self) -> Vec<String> {
        vec![self.id.to_string()]
    }
    fn value(&self) -> &BidValue {
        &self.value
    }
    fn set_value(&mut self, value: BidValue) {
        self.value = value;
    }
    fn state_of(value: &BidValue) -> u8 {
        value.state.into()
    }
}

//0		1		2			3
//ID	Rate	FactorID	InvoiceID
//
// The ID is issued by the ledger on placement and the factor is always the
// caller, so positions 0 and 2 are ignored.
impl BidTerms {
    pub fn from_arguments(args: &[&str]) -> Result<Self> {
        utils::require_arity(args, BID_ARGUMENTS)?;

        Ok(Self {
            rate: utils::non_negative_amount(args[1], "rate")?,
            invoice_id: utils::entity_id(args[3])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terms_fill_rate_and_invoice() {
        let invoice_id = EntityId::new();
        let raw = invoice_id.to_string();
        let terms = BidTerms::from_arguments(&["0", "0.85", "0", raw.as_str()]).unwrap();

        let id = EntityId::new();
        let bid = Bid::with_terms(id.clone(), terms);
        assert_eq!(bid.id, id);
        assert_eq!(bid.value.rate, 0.85);
        assert_eq!(bid.invoice_id().unwrap(), &invoice_id);
        assert_eq!(bid.value.state, BidState::Unknown);
    }

    #[test]
    fn rejects_bad_arguments() {
        let invoice_id = EntityId::new().to_string();

        assert!(BidTerms::from_arguments(&["0", "0.85", "0"]).is_err());
        assert!(BidTerms::from_arguments(&["0", "high", "0", invoice_id.as_str()]).is_err());
        assert!(BidTerms::from_arguments(&["0", "-0.1", "0", invoice_id.as_str()]).is_err());
        assert!(BidTerms::from_arguments(&["0", "0.85", "0", "invoice"]).is_err());
    }

    #[test]
    fn unloaded_bid_targets_no_invoice() {
        let id = EntityId::new();
        let bid = Bid::from_key_parts(&[id.to_string().as_str()]).unwrap();

        assert_eq!(bid.value.invoice_id, None);
        assert!(bid.invoice_id().is_err());
    }

    #[test]
    fn stored_bid_keeps_its_invoice() {
        let invoice_id = EntityId::new();
        let terms = BidTerms {
            rate: 0.9,
            invoice_id: invoice_id.clone(),
        };
        let bid = Bid::with_terms(EntityId::new(), terms);

        let key = bid.encode_key().unwrap();
        let bytes = bid.encode_value().unwrap();
        let loaded = Bid::from_stored(&key.parse().unwrap(), &bytes).unwrap();

        assert_eq!(loaded.invoice_id().unwrap(), &invoice_id);
        assert_eq!(loaded, bid);
    }
}
