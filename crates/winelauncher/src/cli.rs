use std::{
    env::VarError,
    path::{Path, PathBuf},
};

use clap::Parser;
use log::LevelFilter;
use winelauncher_cfg::{self as cfg, Config};
use winelauncher_wine::{Arch, ParseArchError, Paths, Runtime, Unit};

use crate::logger::{self, LogOutput};

const CONFIG_FILE: &str = "winelauncher.conf";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "A WINE wrapper to handle multiple prefixes",
    long_about = None,
    after_help = "winelauncher will forward LD_PRELOAD, WINEDEBUG and NINEDEBUG environment variables to WINE"
)]
pub struct Cli {
    /// Alternate config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// WINEPREFIX name, appended to the prefix base directory
    #[arg(long, value_name = "NAME")]
    pub prefix: Option<String>,

    /// Prefixes base directory
    #[arg(long, value_name = "DIR", help_heading = "WINE options")]
    pub prefix_base: Option<String>,
    /// WINE installations base directory
    #[arg(long, value_name = "DIR", help_heading = "WINE options")]
    pub wine_base: Option<String>,
    /// lib directory for 32 bit libraries
    #[arg(long, value_name = "NAME", help_heading = "WINE options")]
    pub wine_lib32: Option<String>,
    /// lib directory for 64 bit libraries
    #[arg(long, value_name = "NAME", help_heading = "WINE options")]
    pub wine_lib64: Option<String>,

    /// Log level: debug, info, warning, error or critical
    #[arg(long, value_name = "LEVEL", help_heading = "Logger options")]
    pub log_level: Option<String>,
    /// Log destination: console, journal or a file path
    #[arg(long, value_name = "DEST", help_heading = "Logger options")]
    pub log_output: Option<String>,

    /// WINE version to use, `system` or a directory in the WINE base directory
    #[arg(long, value_name = "NAME|system")]
    pub wine_version: Option<String>,
    /// WINEARCH to use
    #[arg(long, value_name = "32|64")]
    pub wine_arch: Option<Arch>,
    /// List available WINE versions
    #[arg(long)]
    pub list: bool,

    /// Command to execute with WINE
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Invalid `wine_arch` in config. {0}")]
    Arch(#[from] ParseArchError),
    #[error("Unable to expand path. {0}")]
    Expand(#[from] shellexpand::LookupError<VarError>),
}

/// What has to be known before the config file can be read.
#[derive(Debug, PartialEq, Eq)]
pub struct Bootstrap {
    pub config: PathBuf,
    pub prefix: Option<String>,
}

impl Bootstrap {
    #[must_use]
    pub fn new(cli: &Cli, config_home: &Path) -> Self {
        Self {
            config: cli
                .config
                .clone()
                .unwrap_or_else(|| config_home.join(CONFIG_FILE)),
            prefix: cli.prefix.clone(),
        }
    }
}

#[derive(Debug)]
pub struct Log {
    pub tag: String,
    pub output: LogOutput,
    pub level: LevelFilter,
}

/// Fully resolved options of a single run.
#[derive(Debug)]
pub struct Options {
    pub paths: Paths,
    pub unit: Unit,
    pub log: Log,
    /// Show available runtimes instead of launching.
    pub list: bool,
}

fn expand(path: &str) -> Result<PathBuf, Error> {
    Ok(PathBuf::from(shellexpand::full(path)?.as_ref()))
}

/// Merges command line flags over the config. A flag wins over the prefix
/// section, which wins over `[default]`, then `[general]`, then built-ins.
pub fn resolve(cli: Cli, bootstrap: &Bootstrap, cfg: &Config) -> Result<Options, Error> {
    let section = cfg.active_section(bootstrap.prefix.as_deref());
    let value = |flag: Option<String>, key: &str, builtin: &str| {
        flag.unwrap_or_else(|| cfg.lookup(section, key).unwrap_or(builtin).to_owned())
    };

    let paths = Paths {
        prefixes: expand(&value(
            cli.prefix_base,
            cfg::PREFIX_BASE,
            "~/.local/share/wineprefixes",
        ))?,
        runtimes: expand(&value(cli.wine_base, cfg::WINE_DIR, "/opt/wine"))?,
    };

    let arch = match cli.wine_arch {
        Some(arch) => arch,
        None => cfg
            .lookup(section, cfg::WINE_ARCH)
            .map(str::parse::<Arch>)
            .transpose()?
            .unwrap_or_default(),
    };

    let runtime = value(cli.wine_version, cfg::WINE_VERSION, "system")
        .parse::<Runtime>()
        .unwrap_or_default();

    let env_section = bootstrap.prefix.as_deref().unwrap_or(cfg::DEFAULT);
    let list = cli.list || cli.command.is_empty();

    let unit = Unit {
        runtime,
        arch,
        lib32: value(cli.wine_lib32, cfg::WINE_LIB32, "lib32"),
        lib64: value(cli.wine_lib64, cfg::WINE_LIB64, "lib"),
        wine_debug: value(None, cfg::WINE_DEBUG, "-all"),
        nine_debug: value(None, cfg::NINE_DEBUG, "-all"),
        env: cfg.env(env_section),
        command: cli.command,
        prefix: bootstrap.prefix.clone(),
    };

    let log = Log {
        tag: unit.prefix.clone().unwrap_or_else(|| "wine".to_owned()),
        output: LogOutput::from(value(cli.log_output, cfg::LOG_DEST, "console").as_str()),
        level: logger::level(&value(cli.log_level, cfg::LOG_LEVEL, "info")),
    };

    Ok(Options {
        paths,
        unit,
        log,
        list,
    })
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use clap::Parser;
    use log::LevelFilter;
    use pretty_assertions::assert_eq;
    use winelauncher_cfg::Config;
    use winelauncher_wine::{Arch, Runtime};

    use crate::logger::LogOutput;

    use super::{resolve, Bootstrap, Cli, Error, Options};

    fn config() -> Config {
        let mut cfg = Config::defaults(Path::new("/data"));
        let games = cfg.sections.entry("games".to_owned()).or_default();
        games.insert("wine_arch".to_owned(), "32".to_owned());
        games.insert("log_level".to_owned(), "debug".to_owned());
        games.insert("wine_version".to_owned(), "7.0".to_owned());
        games.insert("wine_debug".to_owned(), "fixme-all".to_owned());
        cfg.sections
            .entry("games.env".to_owned())
            .or_default()
            .insert("DXVK_HUD".to_owned(), "fps".to_owned());
        cfg
    }

    fn options(args: &[&str], cfg: &Config) -> Result<Options, Error> {
        let cli = Cli::try_parse_from(std::iter::once("winelauncher").chain(args.iter().copied()))
            .unwrap();
        let bootstrap = Bootstrap::new(&cli, Path::new("/config"));
        resolve(cli, &bootstrap, cfg)
    }

    #[test]
    fn bootstrap_config_path() {
        let cli = Cli::try_parse_from(["winelauncher", "--prefix", "games"]).unwrap();
        assert_eq!(
            Bootstrap::new(&cli, Path::new("/config")),
            Bootstrap {
                config: PathBuf::from("/config/winelauncher.conf"),
                prefix: Some("games".into()),
            }
        );

        let cli = Cli::try_parse_from(["winelauncher", "-c", "/etc/wl.conf"]).unwrap();
        assert_eq!(
            Bootstrap::new(&cli, Path::new("/config")).config,
            PathBuf::from("/etc/wl.conf")
        );
    }

    #[test]
    fn prefix_section_over_default() {
        let options = options(&["--prefix", "games", "game.exe"], &config()).unwrap();

        assert_eq!(options.unit.arch, Arch::X32);
        assert_eq!(options.unit.runtime, Runtime::Named("7.0".into()));
        assert_eq!(options.unit.wine_debug, "fixme-all");
        assert_eq!(options.unit.nine_debug, "-all");
        assert_eq!(options.unit.lib32, "lib32");
        assert_eq!(options.unit.lib64, "lib");
        assert_eq!(
            options.unit.env.get("DXVK_HUD").map(String::as_str),
            Some("fps")
        );
        assert_eq!(options.paths.prefixes, PathBuf::from("/data/wineprefixes"));
        assert_eq!(options.paths.runtimes, PathBuf::from("/opt/wine"));
        assert_eq!(options.log.level, LevelFilter::Debug);
        assert_eq!(options.log.output, LogOutput::Console);
        assert_eq!(options.log.tag, "games");
        assert!(!options.list);
    }

    #[test]
    fn flags_over_config() {
        let options = options(
            &[
                "--prefix",
                "games",
                "--wine-arch",
                "64",
                "--wine-version",
                "system",
                "--log-level",
                "error",
                "--log-output",
                "/tmp/games.log",
                "--wine-base",
                "/srv/wine",
                "--wine-lib64",
                "lib64",
                "game.exe",
            ],
            &config(),
        )
        .unwrap();

        assert_eq!(options.unit.arch, Arch::X64);
        assert_eq!(options.unit.runtime, Runtime::System);
        assert_eq!(options.unit.lib64, "lib64");
        assert_eq!(options.paths.runtimes, PathBuf::from("/srv/wine"));
        assert_eq!(options.log.level, LevelFilter::Error);
        assert_eq!(
            options.log.output,
            LogOutput::File(PathBuf::from("/tmp/games.log"))
        );
    }

    #[test]
    fn unknown_prefix_uses_default_section() {
        let options = options(&["--prefix", "office", "winword.exe"], &config()).unwrap();

        assert_eq!(options.unit.arch, Arch::X64);
        assert_eq!(options.unit.runtime, Runtime::System);
        assert_eq!(options.unit.prefix.as_deref(), Some("office"));
        assert_eq!(options.unit.env.get("DXVK_HUD"), None);
        assert_eq!(
            options.unit.env.get("mesa_glthread").map(String::as_str),
            Some("true")
        );
        assert_eq!(options.log.level, LevelFilter::Info);
    }

    #[test]
    fn command_is_forwarded_verbatim() {
        let options = options(
            &["--prefix", "games", "game.exe", "-windowed", "--list"],
            &config(),
        )
        .unwrap();

        assert_eq!(
            options.unit.command,
            ["game.exe", "-windowed", "--list"].map(String::from)
        );
        assert!(!options.list);
    }

    #[test]
    fn no_command_lists_runtimes() {
        let options = options(&[], &config()).unwrap();

        assert!(options.list);
        assert_eq!(options.unit.prefix, None);
        assert_eq!(options.log.tag, "wine");
    }

    #[test]
    fn invalid_arch_in_config() {
        let mut cfg = config();
        cfg.sections
            .get_mut("games")
            .unwrap()
            .insert("wine_arch".to_owned(), "86".to_owned());

        assert!(matches!(
            options(&["--prefix", "games", "game.exe"], &cfg),
            Err(Error::Arch(_))
        ));
        assert!(Cli::try_parse_from(["winelauncher", "--wine-arch", "86"]).is_err());
    }
}
