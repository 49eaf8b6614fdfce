use std::{fmt, path::PathBuf, str::FromStr};

use indexmap::IndexMap;

pub use launch::{launch, Error};

pub use command::{exit_code, Error as CommandError};
pub use runtime::{Error as RuntimeError, Report, Runtime};

pub mod command;
pub mod env;
mod launch;
pub mod runtime;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Arch {
    X32,
    #[default]
    X64,
}

#[derive(thiserror::Error, Debug)]
#[error("Invalid architecture `{0}`, expected 32 or 64")]
pub struct ParseArchError(String);

impl FromStr for Arch {
    type Err = ParseArchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "32" | "win32" => Ok(Self::X32),
            "64" | "win64" => Ok(Self::X64),
            other => Err(ParseArchError(other.to_owned())),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X32 => "32",
            Self::X64 => "64",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Directory holding one wine prefix per prefix name.
    pub prefixes: PathBuf,
    /// Directory holding side-by-side WINE installations.
    pub runtimes: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub prefix: Option<String>,
    pub runtime: Runtime,
    pub arch: Arch,

    pub lib32: String,
    pub lib64: String,

    pub wine_debug: String,
    pub nine_debug: String,
    pub env: IndexMap<String, String>,

    pub command: Vec<String>,
}
