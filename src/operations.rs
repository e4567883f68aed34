//! Business operations: decode arguments, check ownership and workflow
//! preconditions, write through the entity store, emit one event per
//! mutation. Role checks happen before any of these run, see [`crate::auth`].
//!
//! Every operation is generic over the [`Ledger`] so it can run inside any
//! invocation; the caller is whoever the ledger reports as creator.
use anyhow::Context;

use crate::auth::{self, Operation};
use crate::bid::{Bid, BidState, BidTerms};
use crate::config::Config;
use crate::contract::{Contract, ContractState};
use crate::emitter;
use crate::entity::{Entity, FromArguments, Kind, Snapshot};
use crate::error::{Error, Result};
use crate::event::Event;
use crate::invoice::{Invoice, InvoiceState};
use crate::ledger::Ledger;
use crate::store::EntityStore;
use crate::utils;

/// Routes `operation` to its implementation. Returns the response payload.
pub fn dispatch<L: Ledger + ?Sized>(
    operation: Operation,
    ledger: &mut L,
    args: &[&str],
) -> anyhow::Result<Vec<u8>> {
    match operation {
        Operation::Init => init(ledger, args),
        Operation::RegisterInvoice => register_invoice(ledger, args),
        Operation::AcceptInvoice => accept_invoice(ledger, args),
        Operation::RejectInvoice => reject_invoice(ledger, args),
        Operation::PlaceInvoice => place_invoice(ledger, args),
        Operation::RemoveInvoice => remove_invoice(ledger, args),
        Operation::PlaceBid => place_bid(ledger, args),
        Operation::EditBid => edit_bid(ledger, args),
        Operation::CancelBid => cancel_bid(ledger, args),
        Operation::WithdrawBid => withdraw_bid(ledger, args),
        Operation::AcceptBid => accept_bid(ledger, args),
        Operation::RegisterContract => register_contract(ledger, args),
        Operation::CompleteContract => complete_contract(ledger, args),
        Operation::ListBids => list_bids(ledger, args),
        Operation::ListBidsForInvoice => list_bids_for_invoice(ledger, args),
        Operation::ListInvoices => list_invoices(ledger, args),
        Operation::GetEventPayload => get_event_payload(ledger, args),
    }
}

/// Stores the application configuration. It is written once; later calls
/// fail with `AlreadyExists` so notification names never change.
pub fn init<L: Ledger + ?Sized>(ledger: &mut L, args: &[&str]) -> anyhow::Result<Vec<u8>> {
    let config = Config::from_arguments(args).context("cannot fill a config from arguments")?;
    let mut store = EntityStore::new(ledger);

    ensure_absent(&mut store, &config)?;
    store.upsert(&config)?;
    Ok(Vec::new())
}

//0		1		2			3			4
//ID	Debtor	Beneficiary	TotalDue	DueDate
pub fn register_invoice<L: Ledger + ?Sized>(
    ledger: &mut L,
    args: &[&str],
) -> anyhow::Result<Vec<u8>> {
    let caller = ledger.creator().clone();
    let timestamp = ledger.timestamp();
    let mut store = EntityStore::new(ledger);

    let mut invoice =
        Invoice::from_arguments(args).context("cannot fill an invoice from arguments")?;
    ensure_absent(&mut store, &invoice)?;

    // server assigned values
    invoice.value.owner = caller.msp_id.clone();
    invoice.value.state = InvoiceState::Issued;
    invoice.value.timestamp = timestamp;

    store.upsert(&invoice)?;
    emit_for(&mut store, &invoice, invoice.id.to_string(), &caller)?;
    Ok(Vec::new())
}

/// The debtor signs an issued invoice.
pub fn accept_invoice<L: Ledger + ?Sized>(
    ledger: &mut L,
    args: &[&str],
) -> anyhow::Result<Vec<u8>> {
    let caller = ledger.creator().clone();
    let mut store = EntityStore::new(ledger);

    let mut invoice = store.load(invoice_from_args(args)?)?;
    auth::require_member(&caller, &invoice.value.debtor, "invoice debtor")?;
    require_state(&invoice, &[InvoiceState::Issued as u8], InvoiceState::Signed as u8)?;

    invoice.value.state = InvoiceState::Signed;
    store.upsert(&invoice)?;
    emit_for(&mut store, &invoice, invoice.id.to_string(), &caller)?;
    Ok(Vec::new())
}

/// The debtor refuses an issued invoice.
pub fn reject_invoice<L: Ledger + ?Sized>(
    ledger: &mut L,
    args: &[&str],
) -> anyhow::Result<Vec<u8>> {
    let caller = ledger.creator().clone();
    let mut store = EntityStore::new(ledger);

    let mut invoice = store.load(invoice_from_args(args)?)?;
    auth::require_member(&caller, &invoice.value.debtor, "invoice debtor")?;
    require_state(
        &invoice,
        &[InvoiceState::Issued as u8],
        InvoiceState::Rejected as u8,
    )?;

    invoice.value.state = InvoiceState::Rejected;
    store.upsert(&invoice)?;
    emit_for(&mut store, &invoice, invoice.id.to_string(), &caller)?;
    Ok(Vec::new())
}

/// The owner puts a signed (or previously removed) invoice up for sale.
pub fn place_invoice<L: Ledger + ?Sized>(
    ledger: &mut L,
    args: &[&str],
) -> anyhow::Result<Vec<u8>> {
    let caller = ledger.creator().clone();
    let now = ledger.timestamp();
    let mut store = EntityStore::new(ledger);

    let mut invoice = store.load(invoice_from_args(args)?)?;
    auth::require_member(&caller, &invoice.value.owner, "invoice owner")?;
    require_state(
        &invoice,
        &[InvoiceState::Signed as u8, InvoiceState::Removed as u8],
        InvoiceState::ForSale as u8,
    )?;
    if invoice.value.due_date < now {
        return Err(Error::validation(format!("invoice {} is overdue", invoice.id)).into());
    }

    invoice.value.state = InvoiceState::ForSale;
    store.upsert(&invoice)?;
    emit_for(&mut store, &invoice, invoice.id.to_string(), &caller)?;
    Ok(Vec::new())
}

/// The owner takes an invoice off the dashboard.
pub fn remove_invoice<L: Ledger + ?Sized>(
    ledger: &mut L,
    args: &[&str],
) -> anyhow::Result<Vec<u8>> {
    let caller = ledger.creator().clone();
    let mut store = EntityStore::new(ledger);

    let mut invoice = store.load(invoice_from_args(args)?)?;
    auth::require_member(&caller, &invoice.value.owner, "invoice owner")?;

    invoice.value.state = InvoiceState::Removed;
    store.upsert(&invoice)?;
    emit_for(&mut store, &invoice, invoice.id.to_string(), &caller)?;
    Ok(Vec::new())
}

//0		1		2			3
//ID	Rate	FactorID	InvoiceID
pub fn place_bid<L: Ledger + ?Sized>(ledger: &mut L, args: &[&str]) -> anyhow::Result<Vec<u8>> {
    let caller = ledger.creator().clone();
    let timestamp = ledger.timestamp();
    let id = ledger.fresh_id();
    let mut store = EntityStore::new(ledger);

    let terms = BidTerms::from_arguments(args).context("cannot fill a bid from arguments")?;
    let mut bid = Bid::with_terms(id, terms);
    ensure_absent(&mut store, &bid)?;

    let invoice = store.load(Invoice::new(bid.invoice_id()?.clone()))?;
    if invoice.value.state != InvoiceState::ForSale {
        return Err(Error::validation(format!("invoice {} is not for sale", invoice.id)).into());
    }
    if invoice.value.owner == caller.msp_id {
        return Err(Error::Authorization("the owner cannot bid on its own invoice".into()).into());
    }

    bid.value.factor_id = caller.msp_id.clone();
    bid.value.state = BidState::Issued;
    bid.value.timestamp = timestamp;

    store.upsert(&bid)?;
    emit_for(&mut store, &bid, bid.id.to_string(), &caller)?;
    Ok(bid.id.to_string().into_bytes())
}

/// The bidding factor changes the rate or the target invoice of an open bid.
pub fn edit_bid<L: Ledger + ?Sized>(ledger: &mut L, args: &[&str]) -> anyhow::Result<Vec<u8>> {
    let caller = ledger.creator().clone();
    let mut store = EntityStore::new(ledger);

    let edited = BidTerms::from_arguments(args).context("cannot fill a bid from arguments")?;
    let mut bid = store.load(bid_from_args(args)?)?;
    auth::require_member(&caller, &bid.value.factor_id, "bidding factor")?;
    require_state(&bid, &[BidState::Issued as u8], BidState::Issued as u8)?;

    if !store.exists(&Invoice::new(edited.invoice_id.clone()))? {
        return Err(Error::NotFound {
            kind: Kind::Invoice,
            key: edited.invoice_id.to_string(),
        }
        .into());
    }

    bid.value.rate = edited.rate;
    bid.value.invoice_id = Some(edited.invoice_id);
    store.upsert(&bid)?;
    emit_for(&mut store, &bid, bid.id.to_string(), &caller)?;
    Ok(Vec::new())
}

pub fn cancel_bid<L: Ledger + ?Sized>(ledger: &mut L, args: &[&str]) -> anyhow::Result<Vec<u8>> {
    let caller = ledger.creator().clone();
    let mut store = EntityStore::new(ledger);

    let mut bid = store.load(bid_from_args(args)?)?;
    auth::require_member(&caller, &bid.value.factor_id, "bidding factor")?;
    require_state(&bid, &[BidState::Issued as u8], BidState::Canceled as u8)?;

    bid.value.state = BidState::Canceled;
    store.upsert(&bid)?;
    emit_for(&mut store, &bid, bid.id.to_string(), &caller)?;
    Ok(Vec::new())
}

/// Deletes an open bid outright. Unlike [`cancel_bid`] nothing stays on the
/// ledger but the event.
pub fn withdraw_bid<L: Ledger + ?Sized>(
    ledger: &mut L,
    args: &[&str],
) -> anyhow::Result<Vec<u8>> {
    let caller = ledger.creator().clone();
    let mut store = EntityStore::new(ledger);

    let bid = store.load(bid_from_args(args)?)?;
    auth::require_member(&caller, &bid.value.factor_id, "bidding factor")?;
    if bid.value.state != BidState::Issued {
        return Err(Error::validation(format!("bid {} is no longer open", bid.id)).into());
    }

    store.remove(&bid)?;
    emit_for(&mut store, &bid, bid.id.to_string(), &caller)?;
    Ok(Vec::new())
}

/// The invoice owner accepts a bid: the invoice is sold to the bidding factor.
pub fn accept_bid<L: Ledger + ?Sized>(ledger: &mut L, args: &[&str]) -> anyhow::Result<Vec<u8>> {
    let caller = ledger.creator().clone();
    let mut store = EntityStore::new(ledger);

    let mut bid = store.load(bid_from_args(args)?)?;
    require_state(&bid, &[BidState::Issued as u8], BidState::Accepted as u8)?;

    let mut invoice = store.load(Invoice::new(bid.invoice_id()?.clone()))?;
    auth::require_member(&caller, &invoice.value.owner, "invoice owner")?;
    require_state(
        &invoice,
        &[InvoiceState::ForSale as u8],
        InvoiceState::Sold as u8,
    )?;

    invoice.value.state = InvoiceState::Sold;
    invoice.value.owner = bid.value.factor_id.clone();
    invoice.value.beneficiary = bid.value.factor_id.clone();
    store.upsert(&invoice)?;
    emit_for(&mut store, &invoice, invoice.id.to_string(), &caller)?;

    bid.value.state = BidState::Accepted;
    store.upsert(&bid)?;
    emit_for(&mut store, &bid, bid.id.to_string(), &caller)?;
    Ok(Vec::new())
}

//0		1				2				3			4			5			6		7			8
//ID	ConsignorName	ConsigneeName	TotalDue	Quantity	Destination	DueDate	PaymentDate	State
pub fn register_contract<L: Ledger + ?Sized>(
    ledger: &mut L,
    args: &[&str],
) -> anyhow::Result<Vec<u8>> {
    let caller = ledger.creator().clone();
    let timestamp = ledger.timestamp();
    let mut store = EntityStore::new(ledger);

    let mut contract =
        Contract::from_arguments(args).context("cannot fill a contract from arguments")?;
    ensure_absent(&mut store, &contract)?;

    contract.value.timestamp = timestamp;
    store.upsert(&contract)?;
    emit_for(&mut store, &contract, contract.id.to_string(), &caller)?;
    Ok(Vec::new())
}

/// The transport agency confirms delivery of a signed contract.
pub fn complete_contract<L: Ledger + ?Sized>(
    ledger: &mut L,
    args: &[&str],
) -> anyhow::Result<Vec<u8>> {
    let caller = ledger.creator().clone();
    let mut store = EntityStore::new(ledger);

    utils::require_arity(args, 1)?;
    let mut contract = store.load(Contract::from_key_parts(&args[..1])?)?;
    require_state(
        &contract,
        &[ContractState::Signed as u8],
        ContractState::Completed as u8,
    )?;

    contract.value.state = ContractState::Completed;
    store.upsert(&contract)?;
    emit_for(&mut store, &contract, contract.id.to_string(), &caller)?;
    Ok(Vec::new())
}

pub fn list_invoices<L: Ledger + ?Sized>(
    ledger: &mut L,
    _args: &[&str],
) -> anyhow::Result<Vec<u8>> {
    let invoices = EntityStore::new(ledger)
        .query(&[], |_: &Invoice| true)?
        .collect::<Result<Vec<_>>>()
        .context("cannot list invoices")?;

    Ok(encode_payload(Kind::Invoice, &invoices)?)
}

pub fn list_bids<L: Ledger + ?Sized>(ledger: &mut L, _args: &[&str]) -> anyhow::Result<Vec<u8>> {
    let bids = EntityStore::new(ledger)
        .query(&[], |_: &Bid| true)?
        .collect::<Result<Vec<_>>>()
        .context("cannot list bids")?;

    Ok(encode_payload(Kind::Bid, &bids)?)
}

//0
//InvoiceID
pub fn list_bids_for_invoice<L: Ledger + ?Sized>(
    ledger: &mut L,
    args: &[&str],
) -> anyhow::Result<Vec<u8>> {
    let mut store = EntityStore::new(ledger);

    let invoice = invoice_from_args(args)?;
    if !store.exists(&invoice)? {
        return Err(Error::NotFound {
            kind: Kind::Invoice,
            key: invoice.encode_key()?.to_string(),
        }
        .into());
    }

    let invoice_id = invoice.id;
    let bids = store
        .query(&[], move |bid: &Bid| bid.value.invoice_id.as_ref() == Some(&invoice_id))?
        .collect::<Result<Vec<_>>>()
        .context("cannot list bids for the invoice")?;

    Ok(encode_payload(Kind::Bid, &bids)?)
}

//0
//EventID
pub fn get_event_payload<L: Ledger + ?Sized>(
    ledger: &mut L,
    args: &[&str],
) -> anyhow::Result<Vec<u8>> {
    utils::require_arity(args, 1)?;
    let event = EntityStore::new(ledger).load(Event::from_key_parts(&args[..1])?)?;

    Ok(encode_payload(Kind::Event, &event)?)
}

fn invoice_from_args(args: &[&str]) -> Result<Invoice> {
    utils::require_arity(args, 1)?;
    Invoice::from_key_parts(&args[..1])
}

fn bid_from_args(args: &[&str]) -> Result<Bid> {
    utils::require_arity(args, 1)?;
    Bid::from_key_parts(&args[..1])
}

fn ensure_absent<L, E>(store: &mut EntityStore<'_, L>, entity: &E) -> Result<()>
where
    L: Ledger + ?Sized,
    E: Entity,
{
    if store.exists(entity)? {
        return Err(Error::AlreadyExists {
            kind: E::KIND,
            key: entity.encode_key()?.to_string(),
        });
    }
    Ok(())
}

// Workflow preconditions stricter than the transition table, which also
// admits self-transitions.
fn require_state<E: Entity>(entity: &E, allowed: &[u8], to: u8) -> Result<()> {
    let from = entity.state();
    if !allowed.contains(&from) {
        return Err(Error::IllegalTransition {
            kind: E::KIND,
            from,
            to,
        });
    }
    Ok(())
}

fn emit_for<L, E>(
    store: &mut EntityStore<'_, L>,
    entity: &E,
    entity_id: String,
    caller: &auth::Identity,
) -> Result<Event>
where
    L: Ledger + ?Sized,
    E: Entity,
    for<'e> Snapshot: From<&'e E>,
{
    emitter::emit(store, E::KIND, &entity_id, Snapshot::from(entity), caller)
}

fn encode_payload<T: minicbor::Encode<()>>(kind: Kind, value: &T) -> Result<Vec<u8>> {
    minicbor::to_vec(value).map_err(|e| Error::Encode {
        kind,
        reason: e.to_string(),
    })
}
