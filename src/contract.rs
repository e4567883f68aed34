//! Supply contracts between a consignor and a consignee
use crate::entity::{Entity, FromArguments, Kind};
use crate::error::{Error, Result};
use crate::state;
use crate::types::{EntityId, TimeStamp};
use crate::utils;

const CONTRACT_KEY_PARTS: usize = 1;
const CONTRACT_ARGUMENTS: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, minicbor::Encode, minicbor::Decode)]
#[cbor(index_only)]
#[repr(u8)]
pub enum ContractState {
    #[n(0)]
    Unknown,
    #[n(1)]
    Signed,
    #[n(2)]
    Completed,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Contract {
    #[n(0)]
    pub id: EntityId,
    #[n(1)]
    pub value: ContractValue,
}

#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
#[cbor(map)]
pub struct ContractValue {
    #[n(0)]
    pub consignor_name: String,
    #[n(1)]
    pub consignee_name: String,
    #[n(2)]
    pub total_due: f32,
    #[n(3)]
    pub quantity: u32,
    #[n(4)]
    pub destination: String,
    #[n(5)]
    pub due_date: TimeStamp,
    #[n(6)]
    pub payment_date: TimeStamp,
    #[n(7)]
    pub state: ContractState,
    #[n(8)]
    pub timestamp: TimeStamp,
}

impl Default for ContractValue {
    fn default() -> Self {
        Self {
            consignor_name: String::new(),
            consignee_name: String::new(),
            total_due: 0.0,
            quantity: 0,
            destination: String::new(),
            due_date: TimeStamp::default(),
            payment_date: TimeStamp::default(),
            state: ContractState::Unknown,
            timestamp: TimeStamp::default(),
        }
    }
}

impl From<ContractState> for u8 {
    fn from(state: ContractState) -> Self {
        state as u8
    }
}

impl TryFrom<u8> for ContractState {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(ContractState::Unknown),
            1 => Ok(ContractState::Signed),
            2 => Ok(ContractState::Completed),
            _ => Err(Error::validation(format!(
                "contract state is invalid: {code}"
            ))),
        }
    }
}

impl Contract {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            value: ContractValue::default(),
        }
    }
}

impl Entity for Contract {
    const KIND: Kind = Kind::Contract;
    type Value = ContractValue;

    fn from_key_parts(parts: &[&str]) -> Result<Self> {
        if parts.len() != CONTRACT_KEY_PARTS {
            return Err(Error::validation(format!(
                "composite key parts array must contain {CONTRACT_KEY_PARTS} items"
            )));
        }
        Ok(Self::new(EntityId::parse(parts[0])?))
    }
    fn key_parts(&self) -> Vec<String> {
        vec![self.id.to_string()]
    }
    fn value(&self) -> &ContractValue {
        &self.value
    }
    fn set_value(&mut self, value: ContractValue) {
        self.value = value;
    }
    fn state_of(value: &ContractValue) -> u8 {
        value.state.into()
    }
}

//0		1				2				3			4			5			6		7			8
//ID	ConsignorName	ConsigneeName	TotalDue	Quantity	Destination	DueDate	PaymentDate	State
impl FromArguments for Contract {
    fn from_arguments(args: &[&str]) -> Result<Self> {
        utils::require_arity(args, CONTRACT_ARGUMENTS)?;

        let mut contract = Self::new(utils::entity_id(args[0])?);
        let value = &mut contract.value;

        value.consignor_name = utils::non_empty(args[1], "consignorName")?;
        value.consignee_name = utils::non_empty(args[2], "consigneeName")?;
        value.total_due = utils::non_negative_amount(args[3], "totalDue")?;
        value.quantity = utils::count(args[4], "quantity")?;
        value.destination = args[5].to_string();
        value.due_date = utils::unix_date(args[6], "dueDate")?;
        value.payment_date = utils::unix_date(args[7], "paymentDate")?;

        let code = utils::state_code(args[8], "contract state")?;
        let legal = state::machine(Kind::Contract).legal_states();
        if !state::is_legal_state(Kind::Contract, code) {
            return Err(Error::validation(format!(
                "contract state is invalid: {code} (must be from 0 to {})",
                legal.len() - 1
            )));
        }
        value.state = ContractState::try_from(code)?;

        Ok(contract)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract_args(id: &str, state: &'static str) -> Vec<String> {
        [
            id, "Acme", "Globex", "1000.0", "5", "Berlin", "1700000000", "1700500000", state,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn fills_from_arguments() {
        let id = EntityId::new().to_string();
        let args = contract_args(&id, "1");
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let contract = Contract::from_arguments(&args).unwrap();

        assert_eq!(contract.id.to_string(), id);
        assert_eq!(contract.value.total_due, 1000.0);
        assert_eq!(contract.value.quantity, 5);
        assert_eq!(contract.value.state, ContractState::Signed);
        assert_eq!(contract.state(), 1);
        assert_eq!(contract.value.due_date.unix(), 1_700_000_000);
    }

    #[test]
    fn rejects_illegal_state() {
        let id = EntityId::new().to_string();
        let args = contract_args(&id, "5");
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let err = Contract::from_arguments(&args).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn rejects_short_argument_list() {
        let id = EntityId::new().to_string();
        let args = contract_args(&id, "1");
        let args: Vec<&str> = args.iter().map(String::as_str).take(8).collect();

        assert!(Contract::from_arguments(&args).is_err());
    }

    #[test]
    fn rejects_negative_values() {
        let id = EntityId::new().to_string();
        let mut args = contract_args(&id, "1");
        args[3] = "-1".into();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        assert!(Contract::from_arguments(&args).is_err());

        let mut other = contract_args(&id, "1");
        other[4] = "-5".into();
        let other: Vec<&str> = other.iter().map(String::as_str).collect();
        assert!(Contract::from_arguments(&other).is_err());
    }
}
