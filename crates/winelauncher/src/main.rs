use std::path::Path;

use clap::Parser;
use log::{debug, info};
use winelauncher_cfg::{Config, Loaded};
use winelauncher_wine::{exit_code, runtime};

use crate::cli::{Bootstrap, Cli};

mod cli;
mod logger;

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error("Xdg error. {0}")]
    Xdg(#[from] xdg::BaseDirectoriesError),
    #[error("Config error. {0}")]
    Config(#[from] winelauncher_cfg::Error),
    #[error("Argument error. {0}")]
    Args(#[from] cli::Error),
    #[error("Runtime error. {0}")]
    Runtime(#[from] winelauncher_wine::RuntimeError),
    #[error("Wine run error. {0}")]
    Wine(#[from] winelauncher_wine::Error),
}

impl Error {
    /// Config I/O problems are told apart from runtime problems by the exit status.
    fn exit_code(&self) -> i32 {
        match self {
            Self::Xdg(_) | Self::Config(_) => 2,
            _ => 1,
        }
    }
}

fn run() -> Result<i32, Error> {
    let cli = Cli::parse();
    let xdg = xdg::BaseDirectories::new()?;

    let bootstrap = Bootstrap::new(&cli, &xdg.get_config_home());
    let defaults = Config::defaults(&xdg.get_data_home());

    let cfg = match winelauncher_cfg::load(&bootstrap.config, defaults)? {
        Loaded::Existing(cfg) => cfg,
        Loaded::Created(path) => {
            println!("Saved default config file {}", path.display());
            return Ok(0);
        }
        Loaded::Replaced(path, e) => {
            println!(
                "Unable to parse {} ({e}), saved default config file instead",
                path.display()
            );
            return Ok(0);
        }
    };

    let options = cli::resolve(cli, &bootstrap, &cfg)?;

    if let Err(e) = logger::init(&options.log.tag, &options.log.output, options.log.level) {
        eprintln!("Logging disabled. {e}");
    }

    debug!("Logger initialized");
    info!("Using config from {}", bootstrap.config.display());
    debug!("Options: {options:#?}");

    if options.list {
        let report = runtime::list(Path::new(runtime::SYSTEM_WINE), &options.paths.runtimes)?;
        print!("{report}");
        return Ok(0);
    }

    let status = winelauncher_wine::launch(&options.paths, &options.unit)?;
    info!("WINE exited with {status}");

    Ok(exit_code(status))
}
