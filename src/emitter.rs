//! Append-only audit trail. Every mutation emits one [`Event`]: it is stored
//! through the entity store and published as a named notification on the
//! invocation's outcome.
use crate::auth::Identity;
use crate::config::Config;
use crate::entity::{Kind, Snapshot};
use crate::error::{Error, Result};
use crate::event::{Event, EventValue};
use crate::ledger::Ledger;
use crate::store::EntityStore;

pub const EVENT_NAMESPACE: &str = "Event";

/// `Event.<application>.<operation>.<event id>`
pub fn notification_name(application: &str, operation: &str, event: &Event) -> String {
    format!("{EVENT_NAMESPACE}.{application}.{operation}.{}", event.id)
}

/// Records `snapshot` of the entity `entity_id` of kind `kind`. Any failure
/// must abort the invocation: the caller propagates it and nothing commits.
pub fn emit<L: Ledger + ?Sized>(
    store: &mut EntityStore<'_, L>,
    kind: Kind,
    entity_id: &str,
    snapshot: Snapshot,
    actor: &Identity,
) -> Result<Event> {
    let id = store.ledger_mut().fresh_id();
    let config = store.load(Config::key())?;

    let event = Event::new(
        id,
        EventValue {
            entity_type: kind.index_name().to_string(),
            entity_id: entity_id.to_string(),
            other: Some(snapshot),
            creator: actor.msp_id.clone(),
            timestamp: store.ledger().timestamp(),
        },
    );
    store.upsert(&event)?;

    let name = notification_name(
        &config.value.application_name,
        store.ledger().operation(),
        &event,
    );
    let payload = minicbor::to_vec(&event).map_err(|e| Error::Encode {
        kind: Kind::Event,
        reason: e.to_string(),
    })?;
    store.ledger_mut().set_event(name.clone(), payload)?;

    tracing::info!(event = %name, entity = %kind, entity_id, "event emitted");
    Ok(event)
}
