mod cli;
mod config;
mod debuggee;
mod error;
mod instrumented;
mod master;
mod memmap;

use clap::Parser;
use log::error;

use cli::Opt;
use config::Config;
use error::ValidatorError;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("error")).init();

    let opt = Opt::parse();
    let code = match run(&opt) {
        Ok(()) => 0,
        Err(e) => {
            error!("{e}");
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run(opt: &Opt) -> Result<(), ValidatorError> {
    let config = Config::resolve(opt)?;

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    {
        let _ = &config;
        return Err(ValidatorError::LaunchFailed(std::io::Error::other(
            "the reference-process controller is only implemented for Linux/Android",
        )));
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        let debugged = debuggee::linux::LinuxReferenceProcess::launch(&opt.program, &opt.args)
            .map_err(ValidatorError::LaunchFailed)?;

        let pipes = instrumented::spawn(&opt.program, &opt.args).map_err(ValidatorError::LaunchFailed)?;

        let outcome = master::run(
            Box::new(debugged),
            pipes.pid,
            pipes.ctrl,
            pipes.data,
            config.isa,
            config.verbosity,
            config.coverage_path.as_deref(),
        )
        .map_err(|_| ValidatorError::DataPipeLost)?;

        if outcome.exit_code != 0 {
            std::process::exit(outcome.exit_code);
        }
        Ok(())
    }
}
