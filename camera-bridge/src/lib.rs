//! Bridge from a peer-to-peer camera session to a raw byte stream.
//!
//! One invocation = one connection attempt. The supervisor picks a
//! connection strategy from the persisted rotation state, re-executes this
//! binary as an isolated worker process under a watchdog timeout, and once
//! the worker proves the strategy (a one-byte ready marker on its stdout)
//! relays the elementary video stream to stdout until the worker exits.
//! Every failure path leaves the strategy state `pending` so the next
//! invocation, driven by an external process manager, escalates to the
//! next strategy.

pub mod config;
pub mod control;
pub mod errors;
pub mod relay;
pub mod state;
#[cfg(test)]
mod state_test;
pub mod strategy;
pub mod supervisor;
pub mod worker;
#[cfg(test)]
mod worker_test;
