//! The master drive loop: owns the two pipes to the instrumented process
//! and the reference process controller, and feeds both into
//! [`ValidatorEngine`]. Mirrors `master.cpp`'s `start_master` call-by-call.

use std::fs::File;
use std::io;
use std::path::Path;

use log::{error, warn};
use validator_core::memmap::MemoryMapProvider;
use validator_core::report::{self, Verbosity};
use validator_core::ValidatorEngine;
use validator_wire::codec::{
    read_event_tag, read_exec_transfer_event_body, read_instruction_event_body,
    read_mismatch_mem_access_event_body, write_command,
};
use validator_wire::event::{Command, EventTag, Isa};

use crate::debuggee::{ProcessStatus, ReferenceProcess};
use crate::error::ValidatorError;
use crate::memmap::ProcMaps;

pub struct RunOutcome {
    pub exit_code: i32,
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    mut debugged: Box<dyn ReferenceProcess>,
    instrumented_pid: i32,
    mut ctrl: File,
    mut data: File,
    isa: Isa,
    verbosity: Verbosity,
    coverage_path: Option<&Path>,
) -> io::Result<RunOutcome> {
    let memmap: Box<dyn MemoryMapProvider> = Box::new(ProcMaps);
    let mut engine = ValidatorEngine::new(debugged.pid(), instrumented_pid, memmap);

    let exit_code = loop {
        let tag = match read_event_tag(&mut data) {
            Ok(tag) => tag,
            Err(e) => {
                error!("lost the data pipe, exiting: {e}");
                let _ = debugged.continue_execution();
                break ValidatorError::DataPipeLost.exit_code();
            }
        };

        match tag {
            EventTag::Exit => {
                let _ = debugged.continue_execution();
                break 0;
            }

            EventTag::ExecTransfer => match read_exec_transfer_event_body(&mut data) {
                Ok(ev) => engine.signal_exec_transfer(ev.address),
                Err(e) => {
                    error!("lost the data pipe, exiting: {e}");
                    let _ = debugged.continue_execution();
                    break ValidatorError::DataPipeLost.exit_code();
                }
            },

            EventTag::MissmatchMemAccess => {
                // The wire format carries this event but the diff core has
                // no handler for it; log and discard.
                match read_mismatch_mem_access_event_body(&mut data) {
                    Ok(_) => warn!("discarding unhandled MISSMATCHMEMACCESS event"),
                    Err(e) => {
                        error!("lost the data pipe, exiting: {e}");
                        let _ = debugged.continue_execution();
                        break ValidatorError::DataPipeLost.exit_code();
                    }
                }
            }

            EventTag::Instruction => {
                if let Err(e) = write_command(&mut ctrl, Command::Continue) {
                    error!("lost the control pipe, exiting: {e}");
                    let _ = debugged.continue_execution();
                    break ValidatorError::CtrlPipeLost.exit_code();
                }

                let event = match read_instruction_event_body(&mut data, isa) {
                    Ok(ev) => ev,
                    Err(e) => {
                        error!("lost the data pipe, exiting: {e}");
                        let _ = debugged.continue_execution();
                        break ValidatorError::DataPipeLost.exit_code();
                    }
                };

                if !event.debugger_skip {
                    if let Err(e) = debugged.set_breakpoint(event.address) {
                        error!("could not arm the reference process breakpoint: {e}");
                        break ValidatorError::ReferenceExited.exit_code();
                    }
                }

                let code = loop {
                    let step_result = if event.debugger_skip {
                        debugged.single_step()
                    } else {
                        debugged.continue_execution()
                    };
                    if let Err(e) = step_result {
                        error!("could not resume the reference process: {e}");
                        break Some(ValidatorError::ReferenceExited.exit_code());
                    }
                    let status = match debugged.wait_for_status() {
                        Ok(s) => s,
                        Err(e) => {
                            error!("could not wait on the reference process: {e}");
                            break Some(ValidatorError::ReferenceExited.exit_code());
                        }
                    };
                    match status {
                        ProcessStatus::Exited { .. } => {
                            error!("execution diverged, reference process exited!");
                            engine.signal_critical_state();
                            let _ = write_command(&mut ctrl, Command::Stop);
                            break Some(ValidatorError::ReferenceExited.exit_code());
                        }
                        ProcessStatus::Crashed { signal } => {
                            error!("reference process encountered signal {signal}");
                            engine.signal_critical_state();
                            let _ = write_command(&mut ctrl, Command::Stop);
                            break Some(ValidatorError::ReferenceCrashed(signal).exit_code());
                        }
                        ProcessStatus::Stopped => {}
                    }
                    if event.debugger_skip {
                        break None;
                    }
                    match debugged.program_counter() {
                        Ok(pc) if pc == event.address => break None,
                        Ok(_) => continue,
                        Err(e) => {
                            error!("could not read the reference process's registers: {e}");
                            break Some(ValidatorError::ReferenceExited.exit_code());
                        }
                    }
                };
                if let Some(code) = code {
                    break code;
                }

                let dbg_state = match debugged.read_state() {
                    Ok(s) => s,
                    Err(e) => {
                        error!("could not read the reference process's registers: {e}");
                        break ValidatorError::ReferenceExited.exit_code();
                    }
                };
                let rotated_out = engine.signal_new_state(
                    event.address,
                    &event.mnemonic,
                    &event.disassembly,
                    &dbg_state,
                    &event.state,
                );
                if verbosity == Verbosity::Full {
                    if let Some(entry) = &rotated_out {
                        let stdout = io::stdout();
                        let mut out = stdout.lock();
                        let _ = report::write_log_entry(&mut out, entry, engine.errors());
                    }
                }
                if !event.debugger_skip {
                    let _ = debugged.unset_breakpoint();
                }
            }
        }
    };

    let flushed = engine.flush_last_log();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if verbosity == Verbosity::Full {
        for entry in &flushed {
            let _ = report::write_log_entry(&mut out, entry, engine.errors());
        }
    }
    let _ = report::log_cascades(&engine, verbosity, &mut out);

    if let Some(path) = coverage_path {
        match File::create(path) {
            Ok(mut f) => {
                if let Err(e) = report::log_coverage(&engine, &mut f) {
                    error!("could not write coverage file {}: {e}", path.display());
                }
            }
            Err(e) => error!("could not create coverage file {}: {e}", path.display()),
        }
    }

    Ok(RunOutcome { exit_code })
}
