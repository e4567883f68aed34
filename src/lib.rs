pub mod auth;
pub mod bid;
pub mod config;
pub mod contract;
pub mod emitter;
pub mod entity;
pub mod error;
pub mod event;
pub mod invoice;
pub mod key;
pub mod ledger;
pub mod operations;
pub mod service;
pub mod state;
pub mod store;
pub mod types;
pub mod utils;

pub use auth::{Identity, Operation, Role};
pub use entity::{Entity, FromArguments, Kind, Record, Snapshot};
pub use error::{Error, ErrorKind, Result};
pub use ledger::{Ledger, LedgerConfig, WorldState};
pub use service::{Response, TradeFinanceService};
pub use store::EntityStore;
pub use types::{EntityId, TimeStamp};
