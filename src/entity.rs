//! The capability set shared by every record kind stored on the ledger.
//!
//! Each kind supplies its key schema, its value type, and the decoders used
//! by business operations. The set of kinds is closed: [`Entity`] is sealed
//! and [`Kind`] / [`Snapshot`] enumerate every implementation.
use std::fmt;

use crate::bid::{Bid, BidValue};
use crate::config::{Config, ConfigValue};
use crate::contract::{Contract, ContractValue};
use crate::error::{Error, Result};
use crate::event::Event;
use crate::invoice::{Invoice, InvoiceValue};
use crate::key::{self, CompositeKey, KeyParts};

/// Discriminator of an entity kind; its name is the composite key index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Config,
    Contract,
    Invoice,
    Bid,
    Event,
}

impl Kind {
    pub const ALL: [Kind; 5] = [
        Kind::Config,
        Kind::Contract,
        Kind::Invoice,
        Kind::Bid,
        Kind::Event,
    ];

    pub const fn index_name(self) -> &'static str {
        match self {
            Kind::Config => "Config",
            Kind::Contract => "Contract",
            Kind::Invoice => "Invoice",
            Kind::Bid => "Bid",
            Kind::Event => "Event",
        }
    }

    pub fn from_index_name(name: &str) -> Option<Kind> {
        Kind::ALL.into_iter().find(|kind| kind.index_name() == name)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.index_name())
    }
}

mod sealed {
    pub trait Sealed {}

    impl Sealed for crate::config::Config {}
    impl Sealed for crate::contract::Contract {}
    impl Sealed for crate::invoice::Invoice {}
    impl Sealed for crate::bid::Bid {}
    impl Sealed for crate::event::Event {}
}

/// A `(key, value)` record of one [`Kind`].
pub trait Entity: sealed::Sealed + Sized {
    const KIND: Kind;

    type Value: minicbor::Encode<()> + for<'b> minicbor::Decode<'b, ()>;

    /// Validates `parts` and builds an entity carrying only its key.
    fn from_key_parts(parts: &[&str]) -> Result<Self>;

    /// The ordered key parts, as laid out in the composite key.
    fn key_parts(&self) -> Vec<String>;

    fn value(&self) -> &Self::Value;

    fn set_value(&mut self, value: Self::Value);

    /// Workflow state code of `value`.
    fn state_of(value: &Self::Value) -> u8;

    fn state(&self) -> u8 {
        Self::state_of(self.value())
    }

    fn encode_key(&self) -> Result<CompositeKey> {
        key::build(Self::KIND.index_name(), &self.key_parts())
    }

    fn encode_value(&self) -> Result<Vec<u8>> {
        minicbor::to_vec(self.value()).map_err(|e| Error::Encode {
            kind: Self::KIND,
            reason: e.to_string(),
        })
    }

    fn decode_value(bytes: &[u8]) -> Result<Self::Value> {
        minicbor::decode(bytes).map_err(|e| Error::Decode {
            kind: Self::KIND,
            reason: e.to_string(),
        })
    }

    /// Rebuilds an entity from a stored `(key, value)` pair.
    fn from_stored(key: &KeyParts, bytes: &[u8]) -> Result<Self> {
        if key.index != Self::KIND.index_name() {
            return Err(Error::KeyFormat {
                key: key.index.clone(),
                reason: format!("expected index {}", Self::KIND),
            });
        }
        let parts: Vec<&str> = key.parts.iter().map(String::as_str).collect();

        let mut entity = Self::from_key_parts(&parts)?;
        entity.set_value(Self::decode_value(bytes)?);
        Ok(entity)
    }
}

/// Kinds that business operations decode from positional string arguments.
pub trait FromArguments: Entity {
    /// Validates `args` into a partially filled entity. Server assigned
    /// fields (owner, state, timestamp) are left for the caller.
    fn from_arguments(args: &[&str]) -> Result<Self>;
}

/// The value of any entity kind, as captured inside an event.
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub enum Snapshot {
    #[n(0)]
    Config(#[n(0)] ConfigValue),
    #[n(1)]
    Contract(#[n(0)] ContractValue),
    #[n(2)]
    Invoice(#[n(0)] InvoiceValue),
    #[n(3)]
    Bid(#[n(0)] BidValue),
}

impl Snapshot {
    pub fn kind(&self) -> Kind {
        match self {
            Snapshot::Config(_) => Kind::Config,
            Snapshot::Contract(_) => Kind::Contract,
            Snapshot::Invoice(_) => Kind::Invoice,
            Snapshot::Bid(_) => Kind::Bid,
        }
    }
}

impl From<&Config> for Snapshot {
    fn from(entity: &Config) -> Self {
        Snapshot::Config(entity.value.clone())
    }
}

impl From<&Contract> for Snapshot {
    fn from(entity: &Contract) -> Self {
        Snapshot::Contract(entity.value.clone())
    }
}

impl From<&Invoice> for Snapshot {
    fn from(entity: &Invoice) -> Self {
        Snapshot::Invoice(entity.value.clone())
    }
}

impl From<&Bid> for Snapshot {
    fn from(entity: &Bid) -> Self {
        Snapshot::Bid(entity.value.clone())
    }
}

/// Any stored record, decoded by dispatching on the index name of its key.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Config(Config),
    Contract(Contract),
    Invoice(Invoice),
    Bid(Bid),
    Event(Event),
}

impl Record {
    pub fn decode(key: &CompositeKey, bytes: &[u8]) -> Result<Record> {
        let parts = key.parse()?;
        let kind = Kind::from_index_name(&parts.index).ok_or_else(|| Error::KeyFormat {
            key: key.to_string(),
            reason: format!("unknown index {}", parts.index),
        })?;

        Ok(match kind {
            Kind::Config => Record::Config(Config::from_stored(&parts, bytes)?),
            Kind::Contract => Record::Contract(Contract::from_stored(&parts, bytes)?),
            Kind::Invoice => Record::Invoice(Invoice::from_stored(&parts, bytes)?),
            Kind::Bid => Record::Bid(Bid::from_stored(&parts, bytes)?),
            Kind::Event => Record::Event(Event::from_stored(&parts, bytes)?),
        })
    }

    pub fn kind(&self) -> Kind {
        match self {
            Record::Config(_) => Kind::Config,
            Record::Contract(_) => Kind::Contract,
            Record::Invoice(_) => Kind::Invoice,
            Record::Bid(_) => Kind::Bid,
            Record::Event(_) => Kind::Event,
        }
    }
}
