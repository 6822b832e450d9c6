//! Read/write framing for events and commands over the data and control
//! pipes. Native byte order, little-endian, matching the
//! producing process's own layout (both ends of every pipe used by this
//! validator run on the same machine).

use std::io::{self, Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use thiserror::Error;

use crate::event::{
    Command, EventTag, ExecTransferEvent, ExitEvent, InstructionEvent, InstructionState, Isa,
    MemAccess, MismatchMemAccessEvent, DISASSEMBLY_BUF_LEN, MNEMONIC_BUF_LEN,
};
use crate::state::{aarch64, arm32, x86, x86_64};

#[derive(Debug, Error)]
pub enum WireError {
    #[error("pipe I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("unknown event tag {0}")]
    UnknownEventTag(u32),
    #[error("unknown command {0}")]
    UnknownCommand(u32),
    #[error("mnemonic bytes are not valid UTF-8")]
    InvalidMnemonic,
}

pub type WireResult<T> = Result<T, WireError>;

/// Writes `s` as a NUL-terminated C string, truncating to `cap - 1` bytes
/// first if necessary so the terminator still fits. Unlike a fixed-width
/// field, this writes exactly `truncated.len() + 1` bytes — no trailing
/// padding — matching `pipes.cpp`'s `writeCString` (`strlen + 1` bytes).
pub fn write_cstr_truncated(w: &mut impl Write, s: &str, cap: usize) -> io::Result<()> {
    let max_payload = cap.saturating_sub(1);
    let bytes = s.as_bytes();
    let truncated = &bytes[..bytes.len().min(max_payload)];
    w.write_all(truncated)?;
    w.write_u8(0)
}

/// Reads a NUL-terminated C string back, one byte at a time, stopping at
/// the first NUL or after `cap` bytes, whichever comes first — matching
/// `pipes.cpp`'s `readCString`. If no NUL appears within `cap` bytes the
/// string is silently truncated to whatever was read, and the NUL (which
/// belongs to a later byte in the stream, if any) is left unconsumed.
pub fn read_cstr(r: &mut impl Read, cap: usize) -> WireResult<String> {
    let mut buf = Vec::with_capacity(cap);
    for _ in 0..cap {
        let b = r.read_u8()?;
        if b == 0 {
            return String::from_utf8(buf).map_err(|_| WireError::InvalidMnemonic);
        }
        buf.push(b);
    }
    String::from_utf8(buf).map_err(|_| WireError::InvalidMnemonic)
}

pub fn write_event_tag(w: &mut impl Write, tag: EventTag) -> io::Result<()> {
    w.write_u32::<LE>(tag as u32)
}

pub fn read_event_tag(r: &mut impl Read) -> WireResult<EventTag> {
    let raw = r.read_u32::<LE>()?;
    EventTag::from_u32(raw).ok_or(WireError::UnknownEventTag(raw))
}

pub fn write_command(w: &mut impl Write, cmd: Command) -> io::Result<()> {
    w.write_u32::<LE>(cmd as u32)
}

pub fn read_command(r: &mut impl Read) -> WireResult<Command> {
    let raw = r.read_u32::<LE>()?;
    Command::from_u32(raw).ok_or(WireError::UnknownCommand(raw))
}

pub fn write_instruction_event(w: &mut impl Write, ev: &InstructionEvent) -> io::Result<()> {
    write_event_tag(w, EventTag::Instruction)?;
    w.write_u64::<LE>(ev.address)?;
    write_cstr_truncated(w, &ev.mnemonic, MNEMONIC_BUF_LEN)?;
    write_cstr_truncated(w, &ev.disassembly, DISASSEMBLY_BUF_LEN)?;
    w.write_u8(ev.debugger_skip as u8)?;
    match &ev.state {
        InstructionState::Arm32 { gpr, fpr } => {
            gpr.write(w)?;
            fpr.write(w)?;
        }
        InstructionState::Aarch64 { gpr, fpr } => {
            gpr.write(w)?;
            fpr.write(w)?;
        }
        InstructionState::X86 { gpr, fpr } => {
            gpr.write(w)?;
            fpr.write(w)?;
        }
        InstructionState::X86_64 { gpr, fpr } => {
            gpr.write(w)?;
            fpr.write(w)?;
        }
    }
    Ok(())
}

/// Reads the body of an instruction event (the tag itself must already
/// have been consumed by the caller via [`read_event_tag`]).
pub fn read_instruction_event_body(r: &mut impl Read, isa: Isa) -> WireResult<InstructionEvent> {
    let address = r.read_u64::<LE>()?;
    let mnemonic = read_cstr(r, MNEMONIC_BUF_LEN)?;
    let disassembly = read_cstr(r, DISASSEMBLY_BUF_LEN)?;
    let debugger_skip = r.read_u8()? != 0;
    let state = match isa {
        Isa::Arm32 => InstructionState::Arm32 {
            gpr: arm32::GprState::read(r)?,
            fpr: arm32::FprState::read(r)?,
        },
        Isa::Aarch64 => InstructionState::Aarch64 {
            gpr: aarch64::GprState::read(r)?,
            fpr: aarch64::FprState::read(r)?,
        },
        Isa::X86 => InstructionState::X86 {
            gpr: x86::GprState::read(r)?,
            fpr: x86::FprState::read(r)?,
        },
        Isa::X86_64 => InstructionState::X86_64 {
            gpr: x86_64::GprState::read(r)?,
            fpr: x86_64::FprState::read(r)?,
        },
    };
    Ok(InstructionEvent {
        address,
        mnemonic,
        disassembly,
        debugger_skip,
        state,
    })
}

pub fn write_exec_transfer_event(w: &mut impl Write, ev: &ExecTransferEvent) -> io::Result<()> {
    write_event_tag(w, EventTag::ExecTransfer)?;
    w.write_u64::<LE>(ev.address)
}

pub fn read_exec_transfer_event_body(r: &mut impl Read) -> WireResult<ExecTransferEvent> {
    Ok(ExecTransferEvent {
        address: r.read_u64::<LE>()?,
    })
}

pub fn write_exit_event(w: &mut impl Write, ev: &ExitEvent) -> io::Result<()> {
    write_event_tag(w, EventTag::Exit)?;
    w.write_i32::<LE>(ev.status)
}

pub fn read_exit_event_body(r: &mut impl Read) -> WireResult<ExitEvent> {
    Ok(ExitEvent {
        status: r.read_i32::<LE>()?,
    })
}

pub fn write_mismatch_mem_access_event(
    w: &mut impl Write,
    ev: &MismatchMemAccessEvent,
) -> io::Result<()> {
    write_event_tag(w, EventTag::MissmatchMemAccess)?;
    w.write_u64::<LE>(ev.address)?;
    w.write_u8(ev.do_read as u8)?;
    w.write_u8(ev.may_read as u8)?;
    w.write_u8(ev.do_write as u8)?;
    w.write_u8(ev.may_write as u8)?;
    w.write_u32::<LE>(ev.accesses.len() as u32)?;
    for access in &ev.accesses {
        w.write_u64::<LE>(access.address)?;
        w.write_u32::<LE>(access.size)?;
    }
    Ok(())
}

pub fn read_mismatch_mem_access_event_body(
    r: &mut impl Read,
) -> WireResult<MismatchMemAccessEvent> {
    let address = r.read_u64::<LE>()?;
    let do_read = r.read_u8()? != 0;
    let may_read = r.read_u8()? != 0;
    let do_write = r.read_u8()? != 0;
    let may_write = r.read_u8()? != 0;
    let count = r.read_u32::<LE>()?;
    let mut accesses = Vec::with_capacity(count as usize);
    for _ in 0..count {
        accesses.push(MemAccess {
            address: r.read_u64::<LE>()?,
            size: r.read_u32::<LE>()?,
        });
    }
    Ok(MismatchMemAccessEvent {
        address,
        do_read,
        may_read,
        do_write,
        may_write,
        accesses,
    })
}
