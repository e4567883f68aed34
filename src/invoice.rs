//! Invoices issued by a supplier and traded on the dashboard
use crate::entity::{Entity, FromArguments, Kind};
use crate::error::{Error, Result};
use crate::types::{EntityId, TimeStamp};
use crate::utils;

const INVOICE_KEY_PARTS: usize = 1;
const INVOICE_ARGUMENTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
#[cbor(index_only)]
#[repr(u8)]
pub enum InvoiceState {
    #[n(0)]
    Unknown,
    #[n(1)]
    Issued,
    #[n(2)]
    Signed, // accepted by the debtor
    #[n(3)]
    ForSale,
    #[n(4)]
    Sold,
    #[n(5)]
    Removed, // taken off the dashboard, can be placed again
    #[n(6)]
    Rejected,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Invoice {
    #[n(0)]
    pub id: EntityId,
    #[n(1)]
    pub value: InvoiceValue,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
#[cbor(map)]
pub struct InvoiceValue {
    #[n(0)]
    pub debtor: String,
    #[n(1)]
    pub beneficiary: String,
    #[n(2)]
    pub total_due: f32,
    #[n(3)]
    pub due_date: TimeStamp,
    #[n(4)]
    pub owner: String, // MSP id of the current holder
    #[n(5)]
    pub state: InvoiceState,
    #[n(6)]
    pub timestamp: TimeStamp,
}

impl Default for InvoiceValue {
    fn default() -> Self {
        Self {
            debtor: String::new(),
            beneficiary: String::new(),
            total_due: 0.0,
            due_date: TimeStamp::default(),
            owner: String::new(),
            state: InvoiceState::Unknown,
            timestamp: TimeStamp::default(),
        }
    }
}

impl From<InvoiceState> for u8 {
    fn from(state: InvoiceState) -> Self {
        state as u8
    }
}

impl TryFrom<u8> for InvoiceState {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        Ok(match code {
            0 => InvoiceState::Unknown,
            1 => InvoiceState::Issued,
            2 => InvoiceState::Signed,
            3 => InvoiceState::ForSale,
            4 => InvoiceState::Sold,
            5 => InvoiceState::Removed,
            6 => InvoiceState::Rejected,
            _ => {
                return Err(Error::validation(format!(
                    "invoice state is invalid: {code}"
                )));
            }
        })
    }
}

impl Invoice {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            value: InvoiceValue::default(),
        }
    }
}

impl Entity for Invoice {
    const KIND: Kind = Kind::Invoice;
    type Value = InvoiceValue;

    fn from_key_parts(parts: &[&str]) -> Result<Self> {
        if parts.len() != INVOICE_KEY_PARTS {
            return Err(Error::validation(format!(
                "composite key parts array must contain {INVOICE_KEY_PARTS} items"
            )));
        }
        Ok(Self::new(EntityId::parse(parts[0])?))
    }
    fn key_parts(&self) -> Vec<String> {
        vec![self.id.to_string()]
    }
    fn value(&self) -> &InvoiceValue {
        &self.value
    }
    fn set_value(&mut self, value: InvoiceValue) {
        self.value = value;
    }
    fn state_of(value: &InvoiceValue) -> u8 {
        value.state.into()
    }
}

//0		1		2			3			4
//ID	Debtor	Beneficiary	TotalDue	DueDate
impl FromArguments for Invoice {
    fn from_arguments(args: &[&str]) -> Result<Self> {
        utils::require_arity(args, INVOICE_ARGUMENTS)?;

        let mut invoice = Self::new(utils::entity_id(args[0])?);
        invoice.value.debtor = utils::non_empty(args[1], "debtor")?;
        invoice.value.beneficiary = utils::non_empty(args[2], "beneficiary")?;
        invoice.value.total_due = utils::non_negative_amount(args[3], "totalDue")?;
        invoice.value.due_date = utils::unix_date(args[4], "dueDate")?;

        Ok(invoice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_from_arguments_without_server_fields() {
        let id = EntityId::new().to_string();
        let invoice =
            Invoice::from_arguments(&[id.as_str(), "BuyerMSP", "SupplierMSP", "250.5", "1700000000"])
                .unwrap();

        assert_eq!(invoice.value.debtor, "BuyerMSP");
        assert_eq!(invoice.value.total_due, 250.5);
        assert_eq!(invoice.value.state, InvoiceState::Unknown);
        assert!(invoice.value.owner.is_empty());
    }

    #[test]
    fn rejects_bad_arguments() {
        let id = EntityId::new().to_string();

        assert!(Invoice::from_arguments(&[id.as_str(), "BuyerMSP"]).is_err());
        assert!(Invoice::from_arguments(&[id.as_str(), "", "S", "1", "1"]).is_err());
        assert!(Invoice::from_arguments(&[id.as_str(), "B", "S", "-3", "1"]).is_err());
        assert!(Invoice::from_arguments(&[id.as_str(), "B", "S", "1", "soon"]).is_err());
        assert!(Invoice::from_arguments(&["42", "B", "S", "1", "1"]).is_err());
    }

    #[test]
    fn state_codes_round_trip() {
        for code in 0..=6u8 {
            let state = InvoiceState::try_from(code).unwrap();
            assert_eq!(u8::from(state), code);
        }
        assert!(InvoiceState::try_from(7).is_err());
    }

    #[test]
    fn key_requires_a_version_seven_id() {
        let id = EntityId::new();
        let invoice = Invoice::from_key_parts(&[id.to_string().as_str()]).unwrap();
        assert_eq!(invoice.id, id);

        assert!(Invoice::from_key_parts(&[]).is_err());
        assert!(Invoice::from_key_parts(&["9b2c4f3e-8d1a-4c6b-9f0e-2a7d5e1c3b4a"]).is_err());
    }
}
