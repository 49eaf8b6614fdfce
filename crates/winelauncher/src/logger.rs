use std::{
    fs::OpenOptions,
    io::{self, Write},
    path::PathBuf,
};

use log::LevelFilter;
use simplelog::{ConfigBuilder, WriteLogger};
use systemd_journal_logger::JournalLog;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    Journal,
    File(PathBuf),
}

impl From<&str> for LogOutput {
    fn from(value: &str) -> Self {
        match value.trim() {
            "" | "console" => Self::Console,
            "journal" | "syslog" => Self::Journal,
            path => Self::File(PathBuf::from(path)),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to open log file `{0}`. {1}")]
    File(PathBuf, #[source] io::Error),
    #[error("Unable to connect to the journal. {0}")]
    Journal(#[source] io::Error),
    #[error("Logger already set. {0}")]
    SetLogger(#[from] log::SetLoggerError),
}

/// Writer that starts every line with `tag`.
struct Tagged<W> {
    inner: W,
    tag: String,
    line_start: bool,
}

impl<W> Tagged<W> {
    fn new(inner: W, tag: &str) -> Self {
        Self {
            inner,
            tag: tag.to_owned(),
            line_start: true,
        }
    }
}

impl<W: Write> Write for Tagged<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for chunk in buf.split_inclusive(|&b| b == b'\n') {
            if self.line_start {
                write!(self.inner, "{} ", self.tag)?;
            }
            self.inner.write_all(chunk)?;
            self.line_start = chunk.ends_with(b"\n");
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Unknown names fall back to `info`.
#[must_use]
pub fn level(name: &str) -> LevelFilter {
    match name.trim().to_ascii_lowercase().as_str() {
        "debug" => LevelFilter::Debug,
        "warning" | "warn" => LevelFilter::Warn,
        "error" | "critical" => LevelFilter::Error,
        _ => LevelFilter::Info,
    }
}

/// Installs the process-wide logger. `tag` identifies records in the journal
/// and starts every line of a log file.
pub fn init(tag: &str, output: &LogOutput, level: LevelFilter) -> Result<(), Error> {
    match output {
        LogOutput::Console => simple_logger::SimpleLogger::new()
            .with_level(level)
            .init()?,
        LogOutput::Journal => JournalLog::new()
            .map_err(Error::Journal)?
            .with_syslog_identifier(tag.to_owned())
            .install()?,
        LogOutput::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| Error::File(path.clone(), e))?;

            // Relayed child output is told apart by its target.
            let config = ConfigBuilder::new()
                .set_target_level(LevelFilter::Error)
                .build();
            WriteLogger::init(level, config, Tagged::new(file, tag))?;
        }
    }

    log::set_max_level(level);

    Ok(())
}
