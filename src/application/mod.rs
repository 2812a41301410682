//! Application layer orchestrating the domain against the storage and
//! payment ports.
//!
//! `EscrowEngine` is the entry point. Workflows that touch a balance and a
//! status together take per-entity locks from `EntityLocks` and commit a
//! single `ChangeSet`, so both writes land or neither does.

pub mod applications;
pub mod connects;
pub mod engine;
pub mod gateway;
pub mod ledger;
pub mod locks;
pub mod reconciler;
pub mod requests;
pub mod users;
