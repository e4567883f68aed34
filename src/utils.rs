//! Argument parsing helpers shared by the `FromArguments` implementations

use crate::error::{Error, Result};
use crate::types::{EntityId, TimeStamp};

/// Fails unless `args` carries at least `expected` positional items.
pub fn require_arity(args: &[&str], expected: usize) -> Result<()> {
    if args.len() < expected {
        return Err(Error::validation(format!(
            "arguments array must contain at least {expected} items"
        )));
    }
    Ok(())
}

pub fn non_empty(raw: &str, field: &str) -> Result<String> {
    if raw.is_empty() {
        return Err(Error::validation(format!("{field} must be not empty")));
    }
    Ok(raw.to_string())
}

pub fn non_negative_amount(raw: &str, field: &str) -> Result<f32> {
    let amount: f32 = raw
        .parse()
        .map_err(|e| Error::validation(format!("unable to parse the {field}: {e}")))?;

    if !amount.is_finite() || amount < 0.0 {
        return Err(Error::validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(amount)
}

pub fn count(raw: &str, field: &str) -> Result<u32> {
    raw.parse()
        .map_err(|_| Error::validation(format!("{field} is invalid: {raw} (must be int)")))
}

/// Parses Unix seconds, rejecting negative instants.
pub fn unix_date(raw: &str, field: &str) -> Result<TimeStamp> {
    let secs: i64 = raw
        .parse()
        .map_err(|e| Error::validation(format!("unable to parse the {field}: {e}")))?;

    if secs < 0 {
        return Err(Error::validation(format!("{field} must be larger than zero")));
    }
    TimeStamp::from_unix(secs)
        .ok_or_else(|| Error::validation(format!("{field} is out of range: {secs}")))
}

pub fn state_code(raw: &str, field: &str) -> Result<u8> {
    raw.parse()
        .map_err(|_| Error::validation(format!("{field} is invalid: {raw} (must be int)")))
}

pub fn entity_id(raw: &str) -> Result<EntityId> {
    EntityId::parse(raw)
}
