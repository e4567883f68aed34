//! The entity store: the single path between entities and the ledger.
//!
//! Every read goes through the invocation so it lands in the read-set, and
//! every write is validated against the kind's state machine before it is
//! added to the write-set.
use crate::entity::Entity;
use crate::error::{Error, Result};
use crate::key;
use crate::ledger::Ledger;
use crate::state;

pub struct EntityStore<'a, L: Ledger + ?Sized> {
    ledger: &'a mut L,
}

impl<'a, L: Ledger + ?Sized> EntityStore<'a, L> {
    pub fn new(ledger: &'a mut L) -> Self {
        Self { ledger }
    }

    /// Whether a non-empty value is stored under the entity's key.
    pub fn exists<E: Entity>(&mut self, entity: &E) -> Result<bool> {
        let key = entity.encode_key()?;
        Ok(self
            .ledger
            .get_state(&key)?
            .is_some_and(|bytes| !bytes.is_empty()))
    }

    /// Fills `entity` with its stored value.
    pub fn load<E: Entity>(&mut self, mut entity: E) -> Result<E> {
        let key = entity.encode_key()?;
        let bytes = self
            .ledger
            .get_state(&key)?
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| Error::NotFound {
                kind: E::KIND,
                key: key.to_string(),
            })?;

        entity.set_value(E::decode_value(&bytes)?);
        Ok(entity)
    }

    /// Inserts or updates `entity`. An update must be a legal transition from
    /// the stored state; an insert must carry a legal state.
    pub fn upsert<E: Entity>(&mut self, entity: &E) -> Result<()> {
        let key = entity.encode_key()?;
        let value = entity.encode_value()?;
        let to = entity.state();

        match self.ledger.get_state(&key)? {
            Some(prior) if !prior.is_empty() => {
                let from = E::state_of(&E::decode_value(&prior)?);
                if !state::can_transition(E::KIND, from, to) {
                    return Err(Error::IllegalTransition {
                        kind: E::KIND,
                        from,
                        to,
                    });
                }
            }
            _ => {
                if !state::is_legal_state(E::KIND, to) {
                    return Err(Error::validation(format!(
                        "{} state is invalid: {to}",
                        E::KIND
                    )));
                }
            }
        }

        tracing::debug!(kind = %E::KIND, key = %key, state = to, "put");
        self.ledger.put_state(key, value)
    }

    /// Deletes the entity's key. Only for records that are dropped outright
    /// rather than moved to a terminal state.
    pub fn remove<E: Entity>(&mut self, entity: &E) -> Result<()> {
        let key = entity.encode_key()?;
        if !self
            .ledger
            .get_state(&key)?
            .is_some_and(|bytes| !bytes.is_empty())
        {
            return Err(Error::NotFound {
                kind: E::KIND,
                key: key.to_string(),
            });
        }

        tracing::debug!(kind = %E::KIND, key = %key, "delete");
        self.ledger.del_state(key)
    }

    /// Lazily scans every entity of kind `E` whose leading key parts equal
    /// `partial`, yielding those accepted by `predicate`.
    pub fn query<'s, E, P>(
        &'s mut self,
        partial: &[&str],
        predicate: P,
    ) -> Result<impl Iterator<Item = Result<E>> + 's>
    where
        E: Entity + 's,
        P: Fn(&E) -> bool + 's,
    {
        let prefix = key::prefix(E::KIND.index_name(), partial)?;
        let scan = self.ledger.scan_prefix(&prefix)?;

        Ok(scan.filter_map(move |item| {
            let decoded = item.and_then(|(key, bytes)| E::from_stored(&key.parse()?, &bytes));
            match decoded {
                Ok(entity) if predicate(&entity) => Some(Ok(entity)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            }
        }))
    }

    pub(crate) fn ledger(&self) -> &L {
        &*self.ledger
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut L {
        &mut *self.ledger
    }
}
