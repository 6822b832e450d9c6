//! Differential CPU state validator: register descriptor tables, diff
//! core, and cascade/report engine.
//!
//! This crate is pure — no process spawning, no ptrace, no pipes. It
//! consumes [`validator_wire::event::InstructionState`] pairs and
//! produces [`types::DiffError`]/[`types::Cascade`] data that the
//! `validator` binary crate drives and renders.

pub mod cascade;
pub mod engine;
pub mod isa;
pub mod memmap;
pub mod report;
pub mod types;

pub use engine::ValidatorEngine;
pub use types::{Cascade, DiffError, DiffMap, LogEntry, RegisterClass, Severity};
