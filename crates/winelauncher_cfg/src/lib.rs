use std::{
    collections::BTreeMap,
    io,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use ini::Ini;

/// Section holding paths and debug channels shared by every prefix.
pub const GENERAL: &str = "general";
/// Fallback section for prefixes without a section of their own.
pub const DEFAULT: &str = "default";

pub const PREFIX_BASE: &str = "prefix_base";
pub const WINE_DIR: &str = "wine_dir";
pub const WINE_LIB32: &str = "wine_lib32";
pub const WINE_LIB64: &str = "wine_lib64";
pub const WINE_DEBUG: &str = "wine_debug";
pub const NINE_DEBUG: &str = "nine_debug";
pub const LOG_DEST: &str = "log_dest";
pub const LOG_LEVEL: &str = "log_level";
pub const WINE_ARCH: &str = "wine_arch";
pub const WINE_VERSION: &str = "wine_version";

const ENV_SUFFIX: &str = ".env";

pub type Section = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub sections: BTreeMap<String, Section>,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Unable to read config file `{0}`. {1}")]
    Read(PathBuf, #[source] io::Error),
    #[error("Unable to write config file `{0}`. {1}")]
    Write(PathBuf, #[source] io::Error),
    #[error("Config parse error. {0}")]
    Parse(#[from] ini::ParseError),
}

/// Outcome of [`load`].
#[derive(Debug)]
pub enum Loaded {
    Existing(Config),
    /// No config existed, defaults were written to the path.
    Created(PathBuf),
    /// The config could not be parsed and was overwritten with defaults.
    Replaced(PathBuf, ini::ParseError),
}

impl Config {
    /// Built-in configuration. Prefixes live under `data_home/wineprefixes`.
    #[must_use]
    pub fn defaults(data_home: &Path) -> Self {
        let general = [
            (PREFIX_BASE, data_home.join("wineprefixes").display().to_string()),
            (WINE_DIR, "/opt/wine".to_owned()),
            (WINE_LIB32, "lib32".to_owned()),
            (WINE_LIB64, "lib".to_owned()),
            (WINE_DEBUG, "-all".to_owned()),
            (NINE_DEBUG, "-all".to_owned()),
        ];
        let default = [
            (LOG_DEST, "console"),
            (LOG_LEVEL, "info"),
            (WINE_ARCH, "64"),
            (WINE_VERSION, "system"),
        ];
        let env = [
            ("mesa_glthread", "true"),
            ("PULSE_LATENCY_MSEC", "60"),
            ("FREETYPE_PROPERTIES", "truetype:interpreter-version=35"),
        ];

        let section = |pairs: &[(&str, &str)]| -> Section {
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect()
        };

        let mut sections = BTreeMap::new();
        sections.insert(
            GENERAL.to_owned(),
            general
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v))
                .collect(),
        );
        sections.insert(DEFAULT.to_owned(), section(&default));
        sections.insert(env_section(DEFAULT), section(&env));

        Self { sections }
    }

    #[must_use]
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Picks the section a prefix reads its settings from: its own when present,
    /// [`DEFAULT`] otherwise.
    #[must_use]
    pub fn active_section<'a>(&self, prefix: Option<&'a str>) -> &'a str {
        match prefix {
            Some(prefix) if self.sections.contains_key(prefix) => prefix,
            _ => DEFAULT,
        }
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }

    /// Looks a key up in `section`, then in [`DEFAULT`], then in [`GENERAL`].
    #[must_use]
    pub fn lookup(&self, section: &str, key: &str) -> Option<&str> {
        [section, DEFAULT, GENERAL]
            .into_iter()
            .find_map(|name| self.get(name, key))
    }

    /// Custom variables for a section: `[default.env]` overlaid with `[<section>.env]`.
    #[must_use]
    pub fn env(&self, section: &str) -> IndexMap<String, String> {
        let mut env = IndexMap::new();
        for name in [DEFAULT, section] {
            if let Some(vars) = self.sections.get(&env_section(name)) {
                env.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
        }
        env
    }

    /// Fills in every key of `defaults` missing from `self`.
    pub fn merge_defaults(&mut self, defaults: Config) {
        for (name, section) in defaults.sections {
            let target = self.sections.entry(name).or_default();
            for (key, value) in section {
                target.entry(key).or_insert(value);
            }
        }
    }

    fn from_ini(ini: &Ini) -> Self {
        let mut sections: BTreeMap<String, Section> = BTreeMap::new();
        for (name, props) in ini.iter() {
            if name.is_none() && props.iter().next().is_none() {
                continue;
            }

            // Keys before the first header belong to the general section.
            let section = sections.entry(name.unwrap_or(GENERAL).to_owned()).or_default();
            for (key, value) in props.iter() {
                section.insert(key.to_owned(), value.to_owned());
            }
        }

        Self { sections }
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        for (name, section) in &self.sections {
            for (key, value) in section {
                ini.with_section(Some(name.as_str()))
                    .set(key.as_str(), value.as_str());
            }
        }
        ini
    }
}

fn env_section(name: &str) -> String {
    format!("{name}{ENV_SUFFIX}")
}

/// Reads a config file as is, without filling in defaults.
pub fn read(path: &Path) -> Result<Config, Error> {
    match Ini::load_from_file(path) {
        Ok(ini) => Ok(Config::from_ini(&ini)),
        Err(ini::Error::Io(e)) => Err(Error::Read(path.to_owned(), e)),
        Err(ini::Error::Parse(e)) => Err(Error::Parse(e)),
    }
}

pub fn write(path: &Path, cfg: &Config) -> Result<(), Error> {
    cfg.to_ini()
        .write_to_file(path)
        .map_err(|e| Error::Write(path.to_owned(), e))
}

/// Loads the config at `path` merged over `defaults`.
///
/// A missing or unparsable file is replaced by `defaults`, in which case the
/// caller is expected to stop and let the user review the new file.
pub fn load(path: &Path, defaults: Config) -> Result<Loaded, Error> {
    match read(path) {
        Ok(mut cfg) => {
            cfg.merge_defaults(defaults);
            Ok(Loaded::Existing(cfg))
        }
        Err(Error::Read(_, e)) if e.kind() == io::ErrorKind::NotFound => {
            write(path, &defaults)?;
            Ok(Loaded::Created(path.to_owned()))
        }
        Err(Error::Parse(e)) => {
            write(path, &defaults)?;
            Ok(Loaded::Replaced(path.to_owned(), e))
        }
        Err(e) => Err(e),
    }
}
