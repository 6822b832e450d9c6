//! Pipe event/command tags and their payloads.

use crate::state::{aarch64, arm32, x86, x86_64};

/// Target instruction set, carried alongside events so the codec knows
/// which `GprState`/`FprState` layout to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isa {
    Arm32,
    Aarch64,
    X86,
    X86_64,
}

/// Tag of a message sent on the data pipe (debugger-to-master or
/// instrumented-to-master).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum EventTag {
    Instruction = 0,
    MissmatchMemAccess = 1,
    ExecTransfer = 2,
    Exit = 3,
}

impl EventTag {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(EventTag::Instruction),
            1 => Some(EventTag::MissmatchMemAccess),
            2 => Some(EventTag::ExecTransfer),
            3 => Some(EventTag::Exit),
            _ => None,
        }
    }
}

/// A command sent back on the control pipe (master-to-debugger and
/// master-to-instrumented).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Command {
    Continue = 0,
    Stop = 1,
}

impl Command {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Command::Continue),
            1 => Some(Command::Stop),
            _ => None,
        }
    }
}

/// One side's (debugger or instrumented) register state for the
/// instruction just executed, tagged by ISA.
#[derive(Debug, Clone, Copy)]
pub enum InstructionState {
    Arm32 {
        gpr: arm32::GprState,
        fpr: arm32::FprState,
    },
    Aarch64 {
        gpr: aarch64::GprState,
        fpr: aarch64::FprState,
    },
    X86 {
        gpr: x86::GprState,
        fpr: x86::FprState,
    },
    X86_64 {
        gpr: x86_64::GprState,
        fpr: x86_64::FprState,
    },
}

impl InstructionState {
    pub fn isa(&self) -> Isa {
        match self {
            InstructionState::Arm32 { .. } => Isa::Arm32,
            InstructionState::Aarch64 { .. } => Isa::Aarch64,
            InstructionState::X86 { .. } => Isa::X86,
            InstructionState::X86_64 { .. } => Isa::X86_64,
        }
    }
}

/// Maximum length, including the terminating NUL, of a mnemonic string as
/// carried over the wire. Longer mnemonic text is truncated by the
/// producing side before being sent (`pipes.cpp`'s `writeCString`).
pub const MNEMONIC_BUF_LEN: usize = 32;

/// Maximum length, including the terminating NUL, of the full disassembly
/// string carried alongside the mnemonic. Matches the 128-byte buffer
/// `master.cpp` reads both strings into.
pub const DISASSEMBLY_BUF_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct InstructionEvent {
    pub address: u64,
    /// Short opcode name (e.g. `"mov"`), used as the coverage table key.
    pub mnemonic: String,
    /// Full disassembly text (e.g. `"mov rax, rbx"`), carried into the
    /// per-instruction log entry.
    pub disassembly: String,
    /// Newer wire signature: instructs the debugger side to single-step
    /// this instruction without re-arming a breakpoint.
    pub debugger_skip: bool,
    pub state: InstructionState,
}

#[derive(Debug, Clone, Copy)]
pub struct ExecTransferEvent {
    pub address: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct ExitEvent {
    pub status: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct MemAccess {
    pub address: u64,
    pub size: u32,
}

/// Specified by the wire format but left unhandled by the core:
/// the master logs and discards these rather than feeding them into the
/// diff engine.
#[derive(Debug, Clone)]
pub struct MismatchMemAccessEvent {
    pub address: u64,
    pub do_read: bool,
    pub may_read: bool,
    pub do_write: bool,
    pub may_write: bool,
    pub accesses: Vec<MemAccess>,
}
