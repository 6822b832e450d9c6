//! Launches the instrumented copy of the program under validation and
//! hands it the two pipe ends it reports through. Code-callback
//! registration inside that process is the DBI engine's own business
//! (external collaborator, per spec); this module only owns getting it
//! running with the right file descriptors open.

use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use nix::unistd::{dup2, fork, ForkResult};

/// Fixed descriptor numbers the instrumented process finds its pipe ends
/// at after `exec`, advertised to it via environment variables so it
/// doesn't need to guess.
const CTRL_FD: RawFd = 200;
const DATA_FD: RawFd = 201;

/// The ends of the two pipes the master keeps after spawning the
/// instrumented process: write commands on `ctrl`, read events from `data`.
pub struct InstrumentedPipes {
    pub pid: i32,
    pub ctrl: File,
    pub data: File,
}

pub fn spawn(program: &Path, args: &[String]) -> io::Result<InstrumentedPipes> {
    let (ctrl_read, ctrl_write) = nix::unistd::pipe().map_err(nix_to_io)?;
    let (data_read, data_write) = nix::unistd::pipe().map_err(nix_to_io)?;

    match unsafe { fork() }.map_err(nix_to_io)? {
        ForkResult::Child => {
            drop(ctrl_write);
            drop(data_read);
            if dup2(ctrl_read.as_raw_fd(), CTRL_FD).is_err() || dup2(data_write.as_raw_fd(), DATA_FD).is_err()
            {
                unsafe { libc::_exit(126) }
            }
            drop(ctrl_read);
            drop(data_write);
            std::env::set_var("VALIDATOR_CTRL_FD", CTRL_FD.to_string());
            std::env::set_var("VALIDATOR_DATA_FD", DATA_FD.to_string());

            let program_c = CString::new(program.as_os_str().as_bytes()).expect("nul in path");
            let mut argv: Vec<CString> = vec![program_c.clone()];
            argv.extend(args.iter().map(|a| CString::new(a.as_str()).expect("nul in arg")));
            let _ = nix::unistd::execvp(&program_c, &argv);
            unsafe { libc::_exit(127) }
        }
        ForkResult::Parent { child } => {
            drop(ctrl_read);
            drop(data_write);
            Ok(InstrumentedPipes {
                pid: child.as_raw(),
                ctrl: owned_fd_to_file(ctrl_write),
                data: owned_fd_to_file(data_read),
            })
        }
    }
}

fn owned_fd_to_file(fd: OwnedFd) -> File {
    unsafe { File::from_raw_fd(std::os::fd::IntoRawFd::into_raw_fd(fd)) }
}

fn nix_to_io(e: nix::errno::Errno) -> io::Error {
    io::Error::from_raw_os_error(e as i32)
}
