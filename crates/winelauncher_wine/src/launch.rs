use std::process::ExitStatus;

use log::{debug, info};

use crate::{
    command, env,
    runtime::{self, ensure_runtime_exists},
    Paths, Unit,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Runtime error. {0}")]
    Runtime(#[from] runtime::Error),
    #[error("Command error. {0}")]
    Command(#[from] command::Error),
}

/// Runs the unit's command in its prefix and returns the exit status of the child.
pub fn launch(paths: &Paths, unit: &Unit) -> Result<ExitStatus, Error> {
    info!("Preparing to launch unit: {unit:#?}");
    debug!("Paths: {paths:?}");

    let root = ensure_runtime_exists(paths, &unit.runtime)?;
    let env = env::build(paths, unit, &root, &env::current());
    debug!("Environment: {env:#?}");

    let argv = command::argv(&runtime::loader(&root), &unit.command);
    info!("Running: {argv:?}");

    Ok(command::launch(&argv, &env)?)
}
