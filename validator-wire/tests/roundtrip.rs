use std::io::Cursor;

use validator_wire::codec::{
    read_command, read_event_tag, read_exec_transfer_event_body, read_exit_event_body,
    read_instruction_event_body, read_mismatch_mem_access_event_body, write_command,
    write_event_tag, write_exec_transfer_event, write_exit_event, write_instruction_event,
    write_mismatch_mem_access_event,
};
use validator_wire::event::{
    Command, EventTag, ExecTransferEvent, ExitEvent, InstructionEvent, InstructionState, Isa,
    MemAccess, MismatchMemAccessEvent,
};
use validator_wire::state::{aarch64, arm32, x86, x86_64};

#[test]
fn command_round_trips() {
    for cmd in [Command::Continue, Command::Stop] {
        let mut buf = Vec::new();
        write_command(&mut buf, cmd).unwrap();
        let mut cur = Cursor::new(buf);
        assert_eq!(read_command(&mut cur).unwrap(), cmd);
    }
}

#[test]
fn instruction_event_arm32_round_trips() {
    let ev = InstructionEvent {
        address: 0x1000,
        mnemonic: "mov".to_string(),
        disassembly: "mov r0, r1".to_string(),
        debugger_skip: false,
        state: InstructionState::Arm32 {
            gpr: arm32::GprState {
                r: [1; 13],
                sp: 2,
                lr: 3,
                cpsr: 0x6000_0010,
            },
            fpr: arm32::FprState {
                s: [0; 32],
                fpscr: 0,
            },
        },
    };

    let mut buf = Vec::new();
    write_instruction_event(&mut buf, &ev).unwrap();
    let mut cur = Cursor::new(buf);
    assert_eq!(read_event_tag(&mut cur).unwrap(), EventTag::Instruction);
    let back = read_instruction_event_body(&mut cur, Isa::Arm32).unwrap();
    assert_eq!(back.address, ev.address);
    assert_eq!(back.mnemonic, ev.mnemonic);
    assert_eq!(back.disassembly, ev.disassembly);
    assert_eq!(back.debugger_skip, ev.debugger_skip);
    match (ev.state, back.state) {
        (
            InstructionState::Arm32 { gpr: g1, fpr: f1 },
            InstructionState::Arm32 { gpr: g2, fpr: f2 },
        ) => {
            assert_eq!(g1, g2);
            assert_eq!(f1, f2);
        }
        _ => panic!("isa mismatch"),
    }
}

#[test]
fn instruction_event_aarch64_round_trips() {
    let ev = InstructionEvent {
        address: 0xdead_beef,
        mnemonic: "add".to_string(),
        disassembly: "add x0, x1, x2".to_string(),
        debugger_skip: true,
        state: InstructionState::Aarch64 {
            gpr: aarch64::GprState {
                x: [7; 30],
                lr: 8,
                sp: 9,
                nzcv: 0x2000_0000,
            },
            fpr: aarch64::FprState {
                v: [[0, 0]; 32],
                fpcr: 0,
                fpsr: 0,
            },
        },
    };

    let mut buf = Vec::new();
    write_instruction_event(&mut buf, &ev).unwrap();
    let mut cur = Cursor::new(buf);
    read_event_tag(&mut cur).unwrap();
    let back = read_instruction_event_body(&mut cur, Isa::Aarch64).unwrap();
    assert_eq!(back.address, ev.address);
    assert_eq!(back.disassembly, ev.disassembly);
    assert!(back.debugger_skip);
}

#[test]
fn instruction_event_x86_and_x86_64_round_trip() {
    let ev32 = InstructionEvent {
        address: 0x400000,
        mnemonic: "nop".to_string(),
        disassembly: "nop".to_string(),
        debugger_skip: false,
        state: InstructionState::X86 {
            gpr: x86::GprState {
                eax: 1,
                ebx: 2,
                ecx: 3,
                edx: 4,
                esi: 5,
                edi: 6,
                ebp: 7,
                esp: 8,
                eflags: 0x202,
            },
            fpr: x86::FprState {
                st: [Default::default(); 8],
                xmm: [[0; 16]; 8],
                fcw: 0,
                fsw: 0,
                ftw: 0,
                fop: 0,
                mxcsr: 0x1f80,
                mxcsrmask: 0xffff,
            },
        },
    };
    let mut buf = Vec::new();
    write_instruction_event(&mut buf, &ev32).unwrap();
    let mut cur = Cursor::new(buf);
    read_event_tag(&mut cur).unwrap();
    let back = read_instruction_event_body(&mut cur, Isa::X86).unwrap();
    assert_eq!(back.address, ev32.address);
    assert_eq!(back.disassembly, ev32.disassembly);

    let ev64 = InstructionEvent {
        address: 0x7fff_0000,
        mnemonic: "ret".to_string(),
        disassembly: "ret".to_string(),
        debugger_skip: false,
        state: InstructionState::X86_64 {
            gpr: x86_64::GprState {
                rax: 1,
                rbx: 2,
                rcx: 3,
                rdx: 4,
                rsi: 5,
                rdi: 6,
                r8: 7,
                r9: 8,
                r10: 9,
                r11: 10,
                r12: 11,
                r13: 12,
                r14: 13,
                r15: 14,
                rbp: 15,
                rsp: 16,
                eflags: 0x202,
            },
            fpr: x86_64::FprState {
                st: [Default::default(); 8],
                xmm: [[0; 16]; 16],
                fcw: 0,
                fsw: 0,
                ftw: 0,
                fop: 0,
                mxcsr: 0x1f80,
                mxcsrmask: 0xffff,
            },
        },
    };
    let mut buf = Vec::new();
    write_instruction_event(&mut buf, &ev64).unwrap();
    let mut cur = Cursor::new(buf);
    read_event_tag(&mut cur).unwrap();
    let back = read_instruction_event_body(&mut cur, Isa::X86_64).unwrap();
    assert_eq!(back.address, ev64.address);
    assert_eq!(back.disassembly, ev64.disassembly);
}

#[test]
fn overlong_mnemonic_is_truncated_not_rejected() {
    let ev = InstructionEvent {
        address: 0,
        mnemonic: "a".repeat(500),
        disassembly: "b".repeat(500),
        debugger_skip: false,
        state: InstructionState::X86_64 {
            gpr: x86_64::GprState {
                rax: 0,
                rbx: 0,
                rcx: 0,
                rdx: 0,
                rsi: 0,
                rdi: 0,
                r8: 0,
                r9: 0,
                r10: 0,
                r11: 0,
                r12: 0,
                r13: 0,
                r14: 0,
                r15: 0,
                rbp: 0,
                rsp: 0,
                eflags: 0,
            },
            fpr: x86_64::FprState {
                st: [Default::default(); 8],
                xmm: [[0; 16]; 16],
                fcw: 0,
                fsw: 0,
                ftw: 0,
                fop: 0,
                mxcsr: 0,
                mxcsrmask: 0,
            },
        },
    };
    let mut buf = Vec::new();
    write_instruction_event(&mut buf, &ev).unwrap();
    let mut cur = Cursor::new(buf);
    read_event_tag(&mut cur).unwrap();
    let back = read_instruction_event_body(&mut cur, Isa::X86_64).unwrap();
    assert!(back.mnemonic.len() < ev.mnemonic.len());
    assert_eq!(back.mnemonic.len(), validator_wire::MNEMONIC_BUF_LEN - 1);
    assert!(back.disassembly.len() < ev.disassembly.len());
    assert_eq!(
        back.disassembly.len(),
        validator_wire::DISASSEMBLY_BUF_LEN - 1
    );
}

#[test]
fn exec_transfer_and_exit_round_trip() {
    let mut buf = Vec::new();
    write_exec_transfer_event(&mut buf, &ExecTransferEvent { address: 0x1234 }).unwrap();
    let mut cur = Cursor::new(buf);
    assert_eq!(read_event_tag(&mut cur).unwrap(), EventTag::ExecTransfer);
    assert_eq!(
        read_exec_transfer_event_body(&mut cur).unwrap().address,
        0x1234
    );

    let mut buf = Vec::new();
    write_exit_event(&mut buf, &ExitEvent { status: -11 }).unwrap();
    let mut cur = Cursor::new(buf);
    assert_eq!(read_event_tag(&mut cur).unwrap(), EventTag::Exit);
    assert_eq!(read_exit_event_body(&mut cur).unwrap().status, -11);
}

#[test]
fn mismatch_mem_access_event_round_trips_but_is_otherwise_unused() {
    let ev = MismatchMemAccessEvent {
        address: 0x500,
        do_read: true,
        may_read: true,
        do_write: false,
        may_write: true,
        accesses: vec![
            MemAccess {
                address: 0x500,
                size: 4,
            },
            MemAccess {
                address: 0x600,
                size: 8,
            },
        ],
    };
    let mut buf = Vec::new();
    write_mismatch_mem_access_event(&mut buf, &ev).unwrap();
    let mut cur = Cursor::new(buf);
    assert_eq!(
        read_event_tag(&mut cur).unwrap(),
        EventTag::MissmatchMemAccess
    );
    let back = read_mismatch_mem_access_event_body(&mut cur).unwrap();
    assert_eq!(back.accesses.len(), 2);
    assert_eq!(back.accesses[1].address, 0x600);
}
