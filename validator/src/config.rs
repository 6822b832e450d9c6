use std::path::PathBuf;

use clap::ValueEnum;
use validator_core::report::Verbosity;
use validator_wire::event::Isa;

use crate::cli::{Opt, VerbosityArg};
use crate::error::ValidatorError;

/// Resolved run configuration: CLI flags layered over the `VALIDATOR_*`
/// environment variables, CLI winning when both are given.
pub struct Config {
    pub verbosity: Verbosity,
    pub coverage_path: Option<PathBuf>,
    /// ISA of both the reference and instrumented processes. Both ends of
    /// every pipe this validator drives run on the same machine (spec
    /// §6), so this is always the host architecture.
    pub isa: Isa,
}

impl Config {
    pub fn resolve(opt: &Opt) -> Result<Self, ValidatorError> {
        let verbosity = match opt.verbosity {
            Some(v) => v.into(),
            None => match std::env::var("VALIDATOR_VERBOSITY") {
                Ok(raw) => parse_verbosity(&raw)?.into(),
                // Matches master.cpp's default when VALIDATOR_VERBOSITY is unset.
                Err(_) => Verbosity::Stat,
            },
        };

        let coverage_path = opt
            .coverage
            .clone()
            .or_else(|| std::env::var_os("VALIDATOR_COVERAGE").map(PathBuf::from));

        let isa = host_isa()?;

        Ok(Config {
            verbosity,
            coverage_path,
            isa,
        })
    }
}

fn parse_verbosity(raw: &str) -> Result<VerbosityArg, ValidatorError> {
    VerbosityArg::from_str(raw, true).map_err(|_| ValidatorError::BadConfig {
        name: "VALIDATOR_VERBOSITY",
        value: raw.to_string(),
    })
}

fn host_isa() -> Result<Isa, ValidatorError> {
    match std::env::consts::ARCH {
        "x86_64" => Ok(Isa::X86_64),
        "x86" => Ok(Isa::X86),
        "aarch64" => Ok(Isa::Aarch64),
        "arm" => Ok(Isa::Arm32),
        other => Err(ValidatorError::BadConfig {
            name: "target architecture",
            value: other.to_string(),
        }),
    }
}
