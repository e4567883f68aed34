//! Service layer: one entry point per invocation.
//!
//! [`TradeFinanceService::invoke`] authorizes the caller, opens an invocation
//! on the world state, runs the operation and commits. Whatever happens, the
//! client gets exactly one [`Response`].
use std::sync::Arc;

use anyhow::Context;

use crate::auth::{self, Identity, Operation};
use crate::error::{Error, ErrorKind};
use crate::ledger::{ChaincodeEvent, LedgerConfig, WorldState};
use crate::operations;

pub const STATUS_OK: u16 = 200;
const STATUS_INTERNAL: u16 = 500;

/// Terminal outcome of one invocation.
#[derive(Debug)]
pub struct Response {
    pub status: u16,
    /// Set on failure when the cause is one of the core's [`Error`]s.
    pub kind: Option<ErrorKind>,
    pub message: String,
    pub payload: Vec<u8>,
    /// Notifications published by the committed invocation.
    pub events: Vec<ChaincodeEvent>,
}

impl Response {
    fn success(payload: Vec<u8>, events: Vec<ChaincodeEvent>) -> Self {
        Self {
            status: STATUS_OK,
            kind: None,
            message: String::new(),
            payload,
            events,
        }
    }

    fn failure(err: &anyhow::Error) -> Self {
        let kind = err
            .chain()
            .find_map(|cause| cause.downcast_ref::<Error>())
            .map(Error::kind);

        Self {
            status: kind.map_or(STATUS_INTERNAL, ErrorKind::status),
            kind,
            message: format!("{err:#}"),
            payload: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

pub struct TradeFinanceService {
    world: WorldState,
}

impl TradeFinanceService {
    pub fn new(instance: Arc<sled::Db>) -> anyhow::Result<Self> {
        let world = WorldState::from_db(&instance).context("cannot open the world state")?;
        Ok(Self { world })
    }

    pub fn open(config: &LedgerConfig) -> anyhow::Result<Self> {
        let world = WorldState::open(config).context("cannot open the world state")?;
        Ok(Self { world })
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    /// Invokes an operation by its client-facing function name.
    pub fn invoke_by_name(&self, function: &str, args: &[&str], caller: &Identity) -> Response {
        match Operation::from_name(function) {
            Some(operation) => self.invoke(operation, args, caller),
            None => {
                let err = anyhow::Error::new(Error::validation(format!(
                    "invalid invoke function name: {function}"
                )));
                tracing::error!(function, "unknown function");
                Response::failure(&err)
            }
        }
    }

    pub fn invoke(&self, operation: Operation, args: &[&str], caller: &Identity) -> Response {
        tracing::debug!(%operation, caller = %caller.msp_id, "invoking");

        match self.run(operation, args, caller) {
            Ok((payload, events)) => Response::success(payload, events),
            Err(err) => {
                tracing::error!(%operation, error = ?err, "invocation failed");
                Response::failure(&err)
            }
        }
    }

    fn run(
        &self,
        operation: Operation,
        args: &[&str],
        caller: &Identity,
    ) -> anyhow::Result<(Vec<u8>, Vec<ChaincodeEvent>)> {
        auth::authorize(operation, caller)?;

        let mut invocation = self.world.begin(operation.name(), caller.clone());
        let payload = match operations::dispatch(operation, &mut invocation, args) {
            Ok(payload) => payload,
            Err(err) => {
                // nothing from a failed invocation reaches the world state
                invocation.discard();
                return Err(err.context(format!("{operation} failed")));
            }
        };

        let receipt = invocation
            .commit()
            .with_context(|| format!("cannot commit {operation}"))?;
        Ok((payload, receipt.events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    #[test]
    fn unknown_function_is_a_validation_failure() {
        let service = TradeFinanceService::open(&LedgerConfig::default()).unwrap();
        let caller = Identity::with_role("SupplierMSP", Role::Supplier);

        let response = service.invoke_by_name("mintMoney", &[], &caller);
        assert_eq!(response.status, 400);
        assert_eq!(response.kind, Some(ErrorKind::Validation));
    }

    #[test]
    fn role_check_runs_before_the_operation() {
        let service = TradeFinanceService::open(&LedgerConfig::default()).unwrap();
        let buyer = Identity::with_role("BuyerMSP", Role::Buyer);

        let response = service.invoke(Operation::RegisterInvoice, &[], &buyer);
        assert_eq!(response.status, 403);
        assert_eq!(response.kind, Some(ErrorKind::Authorization));
        assert!(service.world().is_empty());
    }

    #[test]
    fn init_then_list_empty() {
        let service = TradeFinanceService::open(&LedgerConfig::default()).unwrap();
        let anyone = Identity::new("AuditMSP", "auditor");

        assert!(service.invoke(Operation::Init, &["tfcc"], &anyone).is_ok());
        let response = service.invoke(Operation::ListInvoices, &[], &anyone);
        assert!(response.is_ok());
        let invoices: Vec<crate::invoice::Invoice> = minicbor::decode(&response.payload).unwrap();
        assert!(invoices.is_empty());
    }
}
