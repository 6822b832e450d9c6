//! Linux/x86_64 `ptrace`-based [`ReferenceProcess`]. The host architecture
//! this validator runs on is x86_64 in every environment it's deployed to;
//! the other three ISAs are produced by the instrumented side's own
//! wire events and never need a local `ptrace` reader.

use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use nix::sys::ptrace;
use nix::sys::signal::Signal;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{fork, ForkResult, Pid};
use validator_wire::event::InstructionState;
use validator_wire::state::x86_64::{FprState, GprState, St80};

use super::{ProcessStatus, ReferenceProcess};

/// One armed software breakpoint: the address it replaced and the original
/// byte, so it can be lifted again with `unset_breakpoint`.
struct Breakpoint {
    address: u64,
    original_byte: i64,
}

pub struct LinuxReferenceProcess {
    pid: Pid,
    breakpoint: Option<Breakpoint>,
}

impl LinuxReferenceProcess {
    /// Forks, lets the child request tracing and `execvp` the program, and
    /// stops it at the entry point (the first `execve`-induced `SIGTRAP`).
    pub fn launch(program: &Path, args: &[String]) -> io::Result<Self> {
        match unsafe { fork() }.map_err(nix_to_io)? {
            ForkResult::Child => {
                ptrace::traceme().expect("PTRACE_TRACEME failed");
                let program_c = CString::new(program.as_os_str().as_bytes()).expect("nul in path");
                let mut argv: Vec<CString> = vec![program_c.clone()];
                argv.extend(args.iter().map(|a| CString::new(a.as_str()).expect("nul in arg")));
                let _ = nix::unistd::execvp(&program_c, &argv);
                // Only reached if execvp failed.
                unsafe { libc::_exit(127) }
            }
            ForkResult::Parent { child } => {
                match waitpid(child, None).map_err(nix_to_io)? {
                    WaitStatus::Stopped(_, Signal::SIGTRAP) => {}
                    other => {
                        return Err(io::Error::other(format!(
                            "reference process did not stop at exec as expected: {other:?}"
                        )))
                    }
                }
                Ok(LinuxReferenceProcess {
                    pid: child,
                    breakpoint: None,
                })
            }
        }
    }

    fn peek(&self, address: u64) -> io::Result<i64> {
        ptrace::read(self.pid, address as ptrace::AddressType).map_err(nix_to_io)
    }

    fn poke(&self, address: u64, data: i64) -> io::Result<()> {
        unsafe { ptrace::write(self.pid, address as ptrace::AddressType, data) }.map_err(nix_to_io)
    }
}

impl ReferenceProcess for LinuxReferenceProcess {
    fn pid(&self) -> i32 {
        self.pid.as_raw()
    }

    fn set_breakpoint(&mut self, address: u64) -> io::Result<()> {
        let word = self.peek(address)?;
        let trapped = (word & !0xff) | 0xcc;
        self.poke(address, trapped)?;
        self.breakpoint = Some(Breakpoint {
            address,
            original_byte: word,
        });
        Ok(())
    }

    fn unset_breakpoint(&mut self) -> io::Result<()> {
        if let Some(bp) = self.breakpoint.take() {
            self.poke(bp.address, bp.original_byte)?;
        }
        Ok(())
    }

    fn continue_execution(&mut self) -> io::Result<()> {
        ptrace::cont(self.pid, None).map_err(nix_to_io)
    }

    fn single_step(&mut self) -> io::Result<()> {
        ptrace::step(self.pid, None).map_err(nix_to_io)
    }

    fn wait_for_status(&mut self) -> io::Result<ProcessStatus> {
        match waitpid(self.pid, None).map_err(nix_to_io)? {
            WaitStatus::Exited(_, code) => Ok(ProcessStatus::Exited { code }),
            WaitStatus::Signaled(_, sig, _) => Ok(ProcessStatus::Crashed { signal: sig as i32 }),
            WaitStatus::Stopped(_, Signal::SIGTRAP) => {
                self.rewind_breakpoint_trap()?;
                Ok(ProcessStatus::Stopped)
            }
            WaitStatus::Stopped(_, sig) => Ok(ProcessStatus::Crashed { signal: sig as i32 }),
            other => Err(io::Error::other(format!("unexpected wait status: {other:?}"))),
        }
    }

    fn program_counter(&self) -> io::Result<u64> {
        let regs = ptrace::getregs(self.pid).map_err(nix_to_io)?;
        Ok(regs.rip)
    }

    fn read_state(&self) -> io::Result<InstructionState> {
        let regs = ptrace::getregs(self.pid).map_err(nix_to_io)?;
        let fpregs = ptrace::getfpregs(self.pid).map_err(nix_to_io)?;

        let gpr = GprState {
            rax: regs.rax,
            rbx: regs.rbx,
            rcx: regs.rcx,
            rdx: regs.rdx,
            rsi: regs.rsi,
            rdi: regs.rdi,
            r8: regs.r8,
            r9: regs.r9,
            r10: regs.r10,
            r11: regs.r11,
            r12: regs.r12,
            r13: regs.r13,
            r14: regs.r14,
            r15: regs.r15,
            rbp: regs.rbp,
            rsp: regs.rsp,
            eflags: regs.eflags,
        };

        let mut st = [St80::default(); 8];
        for (i, reg) in st.iter_mut().enumerate() {
            let base = i * 16;
            let bytes = &fpregs.st_space[base / 4..base / 4 + 4];
            reg.m0 = bytes[0];
            reg.m1 = bytes[1];
            reg.e = (bytes[2] & 0xffff) as u16;
        }
        let mut xmm = [[0u8; 16]; 16];
        for (i, lane) in xmm.iter_mut().enumerate() {
            for (j, byte) in lane.iter_mut().enumerate() {
                let word = fpregs.xmm_space[i * 4 + j / 4];
                *byte = (word >> ((j % 4) * 8)) as u8;
            }
        }
        let fpr = FprState {
            st,
            xmm,
            fcw: fpregs.cwd,
            fsw: fpregs.swd,
            ftw: fpregs.ftw as u16,
            fop: fpregs.fop,
            mxcsr: fpregs.mxcsr,
            mxcsrmask: fpregs.mxcr_mask,
        };

        Ok(InstructionState::X86_64 { gpr, fpr })
    }
}

impl LinuxReferenceProcess {
    /// `PTRACE_CONT` after hitting `0xcc` leaves `rip` one byte past the
    /// breakpoint and restores the original instruction so single-stepping
    /// through it doesn't re-trap; rewinds `rip` to the breakpoint address.
    fn rewind_breakpoint_trap(&mut self) -> io::Result<()> {
        let Some(bp) = &self.breakpoint else { return Ok(()) };
        let mut regs = ptrace::getregs(self.pid).map_err(nix_to_io)?;
        if regs.rip == bp.address + 1 {
            self.poke(bp.address, bp.original_byte)?;
            regs.rip = bp.address;
            ptrace::setregs(self.pid, regs).map_err(nix_to_io)?;
        }
        Ok(())
    }
}

fn nix_to_io(e: nix::errno::Errno) -> io::Error {
    io::Error::from_raw_os_error(e as i32)
}
