//! Wire format for the validator's pipes: one data pipe per side
//! (debugger, instrumented) carrying register-state events, one control
//! pipe per side carrying continue/stop commands back.
//!
//! This crate only knows about bytes on the wire. It has no notion of a
//! diff, a cascade, or a severity — see `validator-core` for that.

pub mod codec;
pub mod event;
pub mod state;

pub use codec::{WireError, WireResult};
pub use event::{
    Command, EventTag, ExecTransferEvent, ExitEvent, InstructionEvent, InstructionState, Isa,
    MemAccess, MismatchMemAccessEvent, DISASSEMBLY_BUF_LEN, MNEMONIC_BUF_LEN,
};
