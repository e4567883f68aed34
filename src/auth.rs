//! Caller identity and the per-operation role table.
//!
//! Every business operation is checked by [`authorize`] against
//! [`ACCESS`]; operations never inline their own role lists.
use std::fmt;

use crate::error::{Error, Result};

/// Organizational unit taken from the caller's certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Supplier,
    Buyer,
    Factor,
    TransportAgency,
}

/// The invoking member, as extracted by the identity layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub msp_id: String,
    pub org_unit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Init,
    RegisterInvoice,
    AcceptInvoice,
    RejectInvoice,
    PlaceInvoice,
    RemoveInvoice,
    PlaceBid,
    EditBid,
    CancelBid,
    WithdrawBid,
    AcceptBid,
    RegisterContract,
    CompleteContract,
    ListBids,
    ListBidsForInvoice,
    ListInvoices,
    GetEventPayload,
}

#[derive(Debug, Clone, Copy)]
pub enum Access {
    Anyone,
    Roles(&'static [Role]),
}

pub static ACCESS: &[(Operation, Access)] = &[
    (Operation::Init, Access::Anyone),
    (Operation::RegisterInvoice, Access::Roles(&[Role::Supplier])),
    (
        Operation::AcceptInvoice,
        Access::Roles(&[Role::Buyer, Role::TransportAgency]),
    ),
    (Operation::RejectInvoice, Access::Roles(&[Role::Buyer])),
    (
        Operation::PlaceInvoice,
        Access::Roles(&[Role::Supplier, Role::Factor]),
    ),
    (
        Operation::RemoveInvoice,
        Access::Roles(&[Role::Supplier, Role::Factor]),
    ),
    (Operation::PlaceBid, Access::Roles(&[Role::Factor])),
    (Operation::EditBid, Access::Roles(&[Role::Factor])),
    (Operation::CancelBid, Access::Roles(&[Role::Factor])),
    (Operation::WithdrawBid, Access::Roles(&[Role::Factor])),
    (Operation::AcceptBid, Access::Roles(&[Role::Supplier])),
    (Operation::RegisterContract, Access::Roles(&[Role::Supplier])),
    (
        Operation::CompleteContract,
        Access::Roles(&[Role::TransportAgency]),
    ),
    (Operation::ListBids, Access::Anyone),
    (Operation::ListBidsForInvoice, Access::Anyone),
    (Operation::ListInvoices, Access::Anyone),
    (Operation::GetEventPayload, Access::Anyone),
];

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Supplier => "supplier",
            Role::Buyer => "buyer",
            Role::Factor => "factor",
            Role::TransportAgency => "transport_agency",
        }
    }
    pub fn from_org_unit(org_unit: &str) -> Option<Role> {
        [
            Role::Supplier,
            Role::Buyer,
            Role::Factor,
            Role::TransportAgency,
        ]
        .into_iter()
        .find(|role| role.as_str() == org_unit)
    }
}

impl Identity {
    pub fn new(msp_id: &str, org_unit: &str) -> Self {
        Self {
            msp_id: msp_id.to_string(),
            org_unit: org_unit.to_string(),
        }
    }
    pub fn with_role(msp_id: &str, role: Role) -> Self {
        Self::new(msp_id, role.as_str())
    }
    pub fn role(&self) -> Option<Role> {
        Role::from_org_unit(&self.org_unit)
    }
}

impl Operation {
    pub const ALL: [Operation; 17] = [
        Operation::Init,
        Operation::RegisterInvoice,
        Operation::AcceptInvoice,
        Operation::RejectInvoice,
        Operation::PlaceInvoice,
        Operation::RemoveInvoice,
        Operation::PlaceBid,
        Operation::EditBid,
        Operation::CancelBid,
        Operation::WithdrawBid,
        Operation::AcceptBid,
        Operation::RegisterContract,
        Operation::CompleteContract,
        Operation::ListBids,
        Operation::ListBidsForInvoice,
        Operation::ListInvoices,
        Operation::GetEventPayload,
    ];

    pub fn from_name(name: &str) -> Option<Operation> {
        Operation::ALL.into_iter().find(|op| op.name() == name)
    }

    /// Function name used by clients and in event notification names.
    pub fn name(self) -> &'static str {
        match self {
            Operation::Init => "init",
            Operation::RegisterInvoice => "registerInvoice",
            Operation::AcceptInvoice => "acceptInvoice",
            Operation::RejectInvoice => "rejectInvoice",
            Operation::PlaceInvoice => "placeInvoice",
            Operation::RemoveInvoice => "removeInvoice",
            Operation::PlaceBid => "placeBid",
            Operation::EditBid => "editBid",
            Operation::CancelBid => "cancelBid",
            Operation::WithdrawBid => "withdrawBid",
            Operation::AcceptBid => "acceptBid",
            Operation::RegisterContract => "registerContract",
            Operation::CompleteContract => "completeContract",
            Operation::ListBids => "listBids",
            Operation::ListBidsForInvoice => "listBidsForInvoice",
            Operation::ListInvoices => "listInvoices",
            Operation::GetEventPayload => "getEventPayload",
        }
    }

    pub fn access(self) -> Access {
        ACCESS
            .iter()
            .find(|(op, _)| *op == self)
            .map(|(_, access)| *access)
            .unwrap_or(Access::Roles(&[]))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Checks the caller's organizational unit against the role table.
pub fn authorize(operation: Operation, caller: &Identity) -> Result<()> {
    tracing::debug!(%operation, org_unit = %caller.org_unit, "authorizing");

    match operation.access() {
        Access::Anyone => Ok(()),
        Access::Roles(roles) => match caller.role() {
            Some(role) if roles.contains(&role) => Ok(()),
            _ => Err(Error::Authorization(format!(
                "organizational unit \"{}\" is not allowed to {operation}",
                caller.org_unit
            ))),
        },
    }
}

/// Ownership checks made by operations after loading an entity.
pub fn require_member(caller: &Identity, expected: &str, relation: &str) -> Result<()> {
    if caller.msp_id != expected {
        return Err(Error::Authorization(format!(
            "only the {relation} can perform this operation"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suppliers_register_invoices() {
        let supplier = Identity::with_role("SupplierMSP", Role::Supplier);
        let factor = Identity::with_role("FactorMSP", Role::Factor);

        assert!(authorize(Operation::RegisterInvoice, &supplier).is_ok());
        assert!(matches!(
            authorize(Operation::RegisterInvoice, &factor),
            Err(Error::Authorization(_))
        ));
    }

    #[test]
    fn unknown_units_only_reach_open_operations() {
        let stranger = Identity::new("OtherMSP", "auditor");

        assert!(authorize(Operation::ListInvoices, &stranger).is_ok());
        assert!(authorize(Operation::PlaceBid, &stranger).is_err());
    }

    #[test]
    fn every_operation_has_an_entry() {
        for op in Operation::ALL {
            assert!(ACCESS.iter().any(|(entry, _)| *entry == op), "{op}");
            assert_eq!(Operation::from_name(op.name()), Some(op));
        }
        assert_eq!(Operation::from_name("deleteEverything"), None);
    }

    #[test]
    fn ownership_is_by_msp_id() {
        let caller = Identity::with_role("SupplierMSP", Role::Supplier);

        assert!(require_member(&caller, "SupplierMSP", "invoice owner").is_ok());
        assert!(require_member(&caller, "FactorMSP", "invoice owner").is_err());
    }
}
