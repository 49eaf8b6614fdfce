use std::{
    io::{self, BufRead, BufReader, Read},
    os::unix::process::ExitStatusExt,
    path::Path,
    process::{Command, ExitStatus, Stdio},
    thread,
};

use log::{debug, info, warn};

use crate::env::Environment;

/// Tools that are run as they are instead of through the wine loader.
pub const AUX_TOOLS: &[&str] = &["winetricks"];

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Nothing to run, the command is empty.")]
    EmptyCommand,
    #[error("Unable to run `{0}`. {1}")]
    Spawn(String, #[source] io::Error),
    #[error("Wait error. {0}")]
    Wait(#[source] io::Error),
}

fn is_aux_tool(program: &str) -> bool {
    Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| AUX_TOOLS.contains(&name))
}

/// Argument vector for `command`: the wine `loader` followed by the command,
/// unless the command starts with one of [`AUX_TOOLS`].
#[must_use]
pub fn argv(loader: &Path, command: &[String]) -> Vec<String> {
    match command.first() {
        Some(program) if is_aux_tool(program) => command.to_vec(),
        _ => std::iter::once(loader.display().to_string())
            .chain(command.iter().cloned())
            .collect(),
    }
}

/// Feeds every line of `reader` to `sink` without the line terminator.
/// A final line without a terminator is still delivered.
pub fn relay(reader: impl Read, mut sink: impl FnMut(&str)) -> Result<(), io::Error> {
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(());
        }

        let text = String::from_utf8_lossy(&line);
        sink(text.trim_end_matches(&['\n', '\r'][..]));
    }
}

/// Runs `argv` with exactly the variables in `env`, relaying its stdout and
/// stderr to the log line by line, and waits for it to exit.
pub fn launch(argv: &[String], env: &Environment) -> Result<ExitStatus, Error> {
    let (program, args) = argv.split_first().ok_or(Error::EmptyCommand)?;

    let mut child = Command::new(program)
        .args(args)
        .env_clear()
        .envs(env)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::Spawn(program.clone(), e))?;

    debug!("Started `{program}` with pid {}", child.id());

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    thread::scope(|s| {
        let stdout = stdout.map(|pipe| {
            s.spawn(move || relay(pipe, |line| info!(target: "stdout", "{line}")))
        });
        let stderr = stderr.map(|pipe| {
            s.spawn(move || relay(pipe, |line| info!(target: "stderr", "{line}")))
        });

        let status = child.wait().map_err(Error::Wait)?;

        for handle in [stdout, stderr].into_iter().flatten() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Unable to read output of `{program}`. {e}"),
                Err(_) => warn!("Output relay of `{program}` panicked"),
            }
        }

        debug!("`{program}` exited with {status}");
        Ok(status)
    })
}

/// Exit code to propagate for a finished child, `128 + signal` when it was killed.
#[must_use]
pub fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}
