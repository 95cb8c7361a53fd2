//! Concurrent in-memory ledger moving money between accounts under a
//! pluggable transfer strategy.
//!
//! Three strategies share one contract ([`engine::TransferStrategy`]):
//! lock-free optimistic retry, per-account locks taken in a canonical
//! order, and a single global lock. Pick one with [`engine::StrategyKind`]
//! when building a [`engine::Ledger`].

pub mod app;
pub mod domain;
pub mod engine;
pub mod io;
pub mod prelude;
pub mod storage;
pub mod streaming;
