//! Application configuration, stored on the ledger as its own entity
use crate::entity::{Entity, FromArguments, Kind};
use crate::error::{Error, Result};
use crate::state::SINGLE_STATE;
use crate::utils;

const CONFIG_ARGUMENTS: usize = 1;

// the configuration is a singleton: its key has no parts
#[derive(Debug, Clone, PartialEq, minicbor::Encode, minicbor::Decode)]
pub struct Config {
    #[n(0)]
    pub value: ConfigValue,
}

#[derive(Debug, Clone, Default, PartialEq, minicbor::Encode, minicbor::Decode)]
#[cbor(map)]
pub struct ConfigValue {
    #[n(0)]
    pub application_name: String, // used in event notification names
}

impl Config {
    pub fn new(application_name: &str) -> Self {
        Self {
            value: ConfigValue {
                application_name: application_name.to_string(),
            },
        }
    }
    /// Key-only handle used to load the singleton.
    pub fn key() -> Self {
        Self {
            value: ConfigValue::default(),
        }
    }
}

impl Entity for Config {
    const KIND: Kind = Kind::Config;
    type Value = ConfigValue;

    fn from_key_parts(parts: &[&str]) -> Result<Self> {
        if !parts.is_empty() {
            return Err(Error::validation(format!(
                "config key takes no parts, got {}",
                parts.len()
            )));
        }
        Ok(Self::key())
    }
    fn key_parts(&self) -> Vec<String> {
        Vec::new()
    }
    fn value(&self) -> &ConfigValue {
        &self.value
    }
    fn set_value(&mut self, value: ConfigValue) {
        self.value = value;
    }
    fn state_of(_: &ConfigValue) -> u8 {
        SINGLE_STATE
    }
}

//0
//ApplicationName
impl FromArguments for Config {
    fn from_arguments(args: &[&str]) -> Result<Self> {
        utils::require_arity(args, CONFIG_ARGUMENTS)?;

        let application_name = utils::non_empty(args[0], "applicationName")?;
        Ok(Self::new(&application_name))
    }
}
