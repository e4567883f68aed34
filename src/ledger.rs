//! The ledger the core runs against.
//!
//! [`Ledger`] is the surface the entity store and the event emitter consume.
//! [`WorldState`] realizes it over a sled tree: each [`Invocation`] reads
//! committed state, buffers its writes, and commits them atomically after
//! checking that nothing it read has changed in the meantime.
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::path::PathBuf;

use sled::transaction::{ConflictableTransactionError, TransactionError};

use crate::auth::Identity;
use crate::error::{Error, Result};
use crate::key::CompositeKey;
use crate::types::{EntityId, TimeStamp};

const WORLD_STATE_TREE: &str = "world_state";

pub type ScanItem = Result<(CompositeKey, Vec<u8>)>;

/// Primitives provided to a single invocation.
pub trait Ledger {
    /// Point read. Records the key in the read-set.
    fn get_state(&mut self, key: &CompositeKey) -> Result<Option<Vec<u8>>>;

    /// Adds a put to the pending write-set.
    fn put_state(&mut self, key: CompositeKey, value: Vec<u8>) -> Result<()>;

    /// Adds a delete to the pending write-set.
    fn del_state(&mut self, key: CompositeKey) -> Result<()>;

    /// Lazy scan, in key order, of every key starting with `prefix`.
    fn scan_prefix<'a>(
        &'a mut self,
        prefix: &CompositeKey,
    ) -> Result<Box<dyn Iterator<Item = ScanItem> + 'a>>;

    fn fresh_id(&mut self) -> EntityId;

    fn creator(&self) -> &Identity;

    /// Name of the business operation being invoked.
    fn operation(&self) -> &str;

    fn timestamp(&self) -> TimeStamp;

    /// Attaches a named notification to the invocation's outcome.
    fn set_event(&mut self, name: String, payload: Vec<u8>) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub path: Option<PathBuf>,
    pub temporary: bool,
    pub cache_capacity: u64,
    pub flush_every_ms: Option<u64>,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: None,
            temporary: true,
            cache_capacity: 64 * 1024 * 1024,
            flush_every_ms: Some(500),
        }
    }
}

impl LedgerConfig {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            temporary: false,
            ..Self::default()
        }
    }

    fn to_sled(&self) -> sled::Config {
        let mut config = sled::Config::new()
            .temporary(self.temporary)
            .cache_capacity(self.cache_capacity)
            .flush_every_ms(self.flush_every_ms);
        if let Some(path) = &self.path {
            config = config.path(path);
        }
        config
    }
}

/// A notification published by a committed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChaincodeEvent {
    pub name: String,
    pub payload: Vec<u8>,
}

/// Outcome of a successful commit.
#[derive(Debug, Default)]
pub struct Receipt {
    pub writes: usize,
    pub events: Vec<ChaincodeEvent>,
}

#[derive(Debug, Clone)]
enum PendingWrite {
    Put(Vec<u8>),
    Delete,
}

/// Committed key-value state shared by all invocations.
#[derive(Debug, Clone)]
pub struct WorldState {
    db: sled::Db,
    tree: sled::Tree,
}

impl WorldState {
    pub fn open(config: &LedgerConfig) -> Result<Self> {
        let db = config.to_sled().open()?;
        Self::from_db(&db)
    }

    pub fn from_db(db: &sled::Db) -> Result<Self> {
        Ok(Self {
            db: db.clone(),
            tree: db.open_tree(WORLD_STATE_TREE)?,
        })
    }

    pub fn begin(&self, operation: &str, creator: Identity) -> Invocation<'_> {
        tracing::debug!(operation, creator = %creator.msp_id, "invocation started");

        Invocation {
            world: self,
            operation: operation.to_string(),
            creator,
            timestamp: TimeStamp::new(),
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    /// Committed value of `key`, outside of any invocation.
    pub fn get(&self, key: &CompositeKey) -> Result<Option<Vec<u8>>> {
        Ok(self.tree.get(key.as_bytes())?.map(|v| v.to_vec()))
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

/// One execution against the world state: isolated read-set and write-set,
/// committed all at once or not at all.
#[derive(Debug)]
pub struct Invocation<'w> {
    world: &'w WorldState,
    operation: String,
    creator: Identity,
    timestamp: TimeStamp,
    // key -> committed value observed, None when absent
    reads: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
    writes: BTreeMap<Vec<u8>, PendingWrite>,
    events: Vec<ChaincodeEvent>,
}

impl<'w> Invocation<'w> {
    /// Applies the write-set atomically. Fails with [`Error::Conflict`] if any
    /// key in the read-set was changed by another invocation since it was read.
    pub fn commit(self) -> Result<Receipt> {
        let result = self.world.tree.transaction(|tx| {
            for (key, observed) in &self.reads {
                let current = tx.get(key.as_slice())?;
                if current.as_deref() != observed.as_deref() {
                    return Err(ConflictableTransactionError::Abort(Error::Conflict {
                        key: CompositeKey::from_bytes(key.clone()).to_string(),
                    }));
                }
            }
            for (key, write) in &self.writes {
                match write {
                    PendingWrite::Put(value) => {
                        tx.insert(key.as_slice(), value.as_slice())?;
                    }
                    PendingWrite::Delete => {
                        tx.remove(key.as_slice())?;
                    }
                }
            }
            Ok(())
        });

        match result {
            Ok(()) => {}
            Err(TransactionError::Abort(e)) => {
                tracing::warn!(operation = %self.operation, error = %e, "commit rejected");
                return Err(e);
            }
            Err(TransactionError::Storage(e)) => return Err(e.into()),
        }

        tracing::debug!(
            operation = %self.operation,
            writes = self.writes.len(),
            events = self.events.len(),
            "invocation committed"
        );
        Ok(Receipt {
            writes: self.writes.len(),
            events: self.events,
        })
    }

    /// Drops the write-set and pending notifications.
    pub fn discard(self) {
        tracing::debug!(
            operation = %self.operation,
            writes = self.writes.len(),
            "invocation discarded"
        );
    }

    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }
}

impl Ledger for Invocation<'_> {
    fn get_state(&mut self, key: &CompositeKey) -> Result<Option<Vec<u8>>> {
        if let Some(write) = self.writes.get(key.as_bytes()) {
            return Ok(match write {
                PendingWrite::Put(value) => Some(value.clone()),
                PendingWrite::Delete => None,
            });
        }

        let value = self.world.tree.get(key.as_bytes())?.map(|v| v.to_vec());
        self.reads
            .entry(key.as_bytes().to_vec())
            .or_insert_with(|| value.clone());
        Ok(value)
    }

    fn put_state(&mut self, key: CompositeKey, value: Vec<u8>) -> Result<()> {
        self.writes
            .insert(key.into_bytes(), PendingWrite::Put(value));
        Ok(())
    }

    fn del_state(&mut self, key: CompositeKey) -> Result<()> {
        self.writes.insert(key.into_bytes(), PendingWrite::Delete);
        Ok(())
    }

    fn scan_prefix<'a>(
        &'a mut self,
        prefix: &CompositeKey,
    ) -> Result<Box<dyn Iterator<Item = ScanItem> + 'a>> {
        let prefix = prefix.as_bytes().to_vec();
        let committed = self.world.tree.scan_prefix(&prefix).peekable();
        let pending = self
            .writes
            .range(prefix.clone()..)
            .take_while(move |(key, _)| key.starts_with(&prefix))
            .peekable();

        Ok(Box::new(MergedScan {
            committed,
            pending,
            reads: &mut self.reads,
        }))
    }

    fn fresh_id(&mut self) -> EntityId {
        EntityId::new()
    }

    fn creator(&self) -> &Identity {
        &self.creator
    }

    fn operation(&self) -> &str {
        &self.operation
    }

    fn timestamp(&self) -> TimeStamp {
        self.timestamp.clone()
    }

    fn set_event(&mut self, name: String, payload: Vec<u8>) -> Result<()> {
        self.events.push(ChaincodeEvent { name, payload });
        Ok(())
    }
}

/// Key-ordered merge of committed state with the invocation's pending writes.
/// Pending writes shadow committed values; pending deletes hide them.
struct MergedScan<'a, P>
where
    P: Iterator<Item = (&'a Vec<u8>, &'a PendingWrite)>,
{
    committed: Peekable<sled::Iter>,
    pending: Peekable<P>,
    reads: &'a mut BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a, P> Iterator for MergedScan<'a, P>
where
    P: Iterator<Item = (&'a Vec<u8>, &'a PendingWrite)>,
{
    type Item = ScanItem;

    fn next(&mut self) -> Option<ScanItem> {
        loop {
            let committed_key = match self.committed.peek() {
                Some(Ok((key, _))) => Some(key.to_vec()),
                Some(Err(_)) => {
                    return match self.committed.next() {
                        Some(Err(e)) => Some(Err(e.into())),
                        _ => None,
                    };
                }
                None => None,
            };
            let pending_key = self.pending.peek().map(|(key, _)| (*key).clone());

            match (committed_key, pending_key) {
                (None, None) => return None,
                (Some(c), Some(p)) if p <= c => {
                    if p == c {
                        // shadowed by a pending write
                        self.committed.next();
                    }
                    if let Some(item) = self.next_pending() {
                        return Some(item);
                    }
                }
                (None, Some(_)) => {
                    if let Some(item) = self.next_pending() {
                        return Some(item);
                    }
                }
                (Some(_), _) => {
                    let Some(Ok((key, value))) = self.committed.next() else {
                        return None;
                    };
                    let value = value.to_vec();
                    self.reads
                        .entry(key.to_vec())
                        .or_insert_with(|| Some(value.clone()));
                    return Some(Ok((CompositeKey::from_bytes(key.to_vec()), value)));
                }
            }
        }
    }
}

impl<'a, P> MergedScan<'a, P>
where
    P: Iterator<Item = (&'a Vec<u8>, &'a PendingWrite)>,
{
    // None when the next pending write is a delete
    fn next_pending(&mut self) -> Option<ScanItem> {
        let (key, write) = self.pending.next()?;
        match write {
            PendingWrite::Put(value) => {
                Some(Ok((CompositeKey::from_bytes(key.clone()), value.clone())))
            }
            PendingWrite::Delete => None,
        }
    }
}
