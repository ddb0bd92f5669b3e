// bancor-core: bonding-curve exchange between one connected token and many smart tokens.
// conservation first: connector balances only ever move by applied integer deltas.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: AccountName, ExtendedSymbol, ExtendedAsset, PerMille
//   2.x  curve.rs: constant reserve ratio math, market and exact-output
//   3.x  fee.rs: fee policies, minimum fee, charging modes
//   4.x  reserve.rs: administered rate source and override selection
//   5.x  connector.rs: per smart token reserve pool
//   6.x  store.rs: keyed tables and singletons for persisted rows
//   7.x  config.rs: persisted configuration + runtime settings
//   8.x  engine/: exchange: admin ops, convert, quote, settlement
//   9.x  ledger.rs: token ledger collaborator (mocked)
//   9.1  auth.rs: authorization collaborator
//   11.x events.rs: state transition events for audit

// exchange modules
pub mod connector;
pub mod curve;
pub mod engine;
pub mod events;
pub mod fee;
pub mod reserve;
pub mod types;

// state and settings
pub mod config;
pub mod store;

// collaborator modules
pub mod auth;
pub mod ledger;

// re exports for convenience
pub use auth::*;
pub use config::*;
pub use connector::*;
pub use curve::*;
pub use engine::*;
pub use events::*;
pub use fee::*;
pub use ledger::*;
pub use reserve::*;
pub use store::*;
pub use types::*;
