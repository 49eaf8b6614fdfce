use std::{
    convert::Infallible,
    fmt, fs, io,
    path::{Path, PathBuf},
    process::{Command, Stdio},
    str::FromStr,
};

use log::{debug, info, warn};

use crate::Paths;

/// Installation root of the distribution-provided WINE.
pub const SYSTEM_ROOT: &str = "/usr";
pub const SYSTEM_WINE: &str = "/usr/bin/wine";

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to find WINE `{name}` in {}. {source}", .root.display())]
    NotFound {
        name: String,
        root: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("No WINE runtime found")]
    NoRuntime,
    #[error("Unable to list WINE versions in `{0}`. {1}")]
    List(PathBuf, #[source] io::Error),
}

/// WINE runtime selector: the system installation or a directory name under
/// [`Paths::runtimes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Runtime {
    #[default]
    System,
    Named(String),
}

impl FromStr for Runtime {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "" | "system" => Self::System,
            name => Self::Named(name.to_owned()),
        })
    }
}

impl fmt::Display for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

impl Runtime {
    /// Installation root, the directory containing `bin/wine`.
    #[must_use]
    pub fn root(&self, runtimes: &Path) -> PathBuf {
        match self {
            Self::System => PathBuf::from(SYSTEM_ROOT),
            Self::Named(name) => runtimes.join(name),
        }
    }
}

#[must_use]
pub fn loader(root: &Path) -> PathBuf {
    root.join("bin").join("wine")
}

#[must_use]
pub fn server(root: &Path) -> PathBuf {
    root.join("bin").join("wineserver")
}

/// Runs `wine --version` and returns its trimmed output.
pub fn probe(wine: &Path) -> Result<String, io::Error> {
    debug!("Probing {}", wine.display());
    let output = Command::new(wine)
        .arg("--version")
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()?;

    if !output.status.success() {
        return Err(io::Error::other(format!(
            "`{} --version` exited with {}",
            wine.display(),
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_owned())
}

/// Checks that the requested runtime can actually be run and returns its root.
///
/// The system runtime is taken as is, a named runtime has to answer `--version`.
pub fn ensure_runtime_exists(paths: &Paths, runtime: &Runtime) -> Result<PathBuf, Error> {
    let root = runtime.root(&paths.runtimes);

    if let Runtime::Named(name) = runtime {
        let version = probe(&loader(&root)).map_err(|source| Error::NotFound {
            name: name.clone(),
            root: root.clone(),
            source,
        })?;
        info!("Using {version} from {}", root.display());
    }

    Ok(root)
}

#[derive(Debug, PartialEq, Eq)]
pub struct Report {
    /// Version string of the system WINE, if installed.
    pub system: Option<String>,
    pub runtimes: PathBuf,
    pub installed: Vec<String>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.system {
            Some(version) => writeln!(f, "System WINE version:\n\t{version}")?,
            None => writeln!(f, "No system WINE found")?,
        }

        if self.installed.is_empty() {
            writeln!(f, "No additional WINE installs available")?;
        } else {
            writeln!(f, "WINE versions available in {}:", self.runtimes.display())?;
            for name in &self.installed {
                writeln!(f, "\t{name}")?;
            }
        }

        Ok(())
    }
}

/// Reports the system WINE found at `system_wine` and every installation
/// directory directly under `runtimes`. Finding neither is an error.
pub fn list(system_wine: &Path, runtimes: &Path) -> Result<Report, Error> {
    let system = system_wine.is_file().then(|| {
        probe(system_wine).unwrap_or_else(|e| {
            warn!("Unable to query system WINE version. {e}");
            "unknown version".to_owned()
        })
    });

    let mut installed = Vec::new();
    if runtimes.is_dir() {
        let entries = fs::read_dir(runtimes).map_err(|e| Error::List(runtimes.to_owned(), e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::List(runtimes.to_owned(), e))?;
            if entry.path().is_dir() {
                installed.push(entry.file_name().to_string_lossy().to_string());
            }
        }
    }
    installed.sort();

    if system.is_none() && installed.is_empty() {
        return Err(Error::NoRuntime);
    }

    Ok(Report {
        system,
        runtimes: runtimes.to_owned(),
        installed,
    })
}
