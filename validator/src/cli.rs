use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Differential state validator: runs a program twice, once under direct
/// ptrace control and once under the instrumentation engine it's meant to
/// validate, and reports where their register state diverges.
#[derive(Debug, Parser)]
#[command(name = "validator", version, about)]
pub struct Opt {
    /// Program to validate.
    pub program: PathBuf,

    /// Arguments passed through to `program` in both runs.
    pub args: Vec<String>,

    /// How much detail to print at the end of the run.
    #[arg(long, value_enum)]
    pub verbosity: Option<VerbosityArg>,

    /// Write the mnemonic coverage table to this path instead of stdout.
    #[arg(long)]
    pub coverage: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VerbosityArg {
    Stat,
    Summary,
    Detail,
    Full,
}

impl From<VerbosityArg> for validator_core::report::Verbosity {
    fn from(v: VerbosityArg) -> Self {
        match v {
            VerbosityArg::Stat => validator_core::report::Verbosity::Stat,
            VerbosityArg::Summary => validator_core::report::Verbosity::Summary,
            VerbosityArg::Detail => validator_core::report::Verbosity::Detail,
            VerbosityArg::Full => validator_core::report::Verbosity::Full,
        }
    }
}
