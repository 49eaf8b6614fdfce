use std::{
    ffi::{OsStr, OsString},
    path::Path,
};

use indexmap::IndexMap;

use crate::{
    runtime::{loader, server},
    Arch, Paths, Runtime, Unit,
};

pub const WINEDEBUG: &str = "WINEDEBUG";
pub const NINEDEBUG: &str = "NINEDEBUG";

/// Variables of a process environment, kept as the OS hands them over.
pub type Environment = IndexMap<OsString, OsString>;

/// Environment of the current process, including variables that are not
/// valid unicode.
#[must_use]
pub fn current() -> Environment {
    std::env::vars_os().collect()
}

/// `head` followed by `rest` as a colon separated search path. An empty `rest`
/// is dropped, it would add the working directory to the search path.
fn search_path(head: impl Into<OsString>, rest: Option<&OsString>) -> OsString {
    let mut value = head.into();
    if let Some(rest) = rest.filter(|rest| !rest.is_empty()) {
        value.push(":");
        value.push(rest);
    }
    value
}

/// Builds the environment a command runs with inside the unit's prefix.
///
/// `root` is the runtime installation root. Path variables are always derived.
/// Debug channels and custom variables only fill in what is neither inherited
/// from `current` nor derived.
#[must_use]
pub fn build(paths: &Paths, unit: &Unit, root: &Path, current: &Environment) -> Environment {
    let mut env = current.clone();
    let var = |key: &str| current.get(OsStr::new(key));

    if unit.runtime != Runtime::System {
        env.insert("PATH".into(), search_path(root.join("bin"), var("PATH")));
    }

    let prefix = match &unit.prefix {
        Some(name) => Some(paths.prefixes.join(name)),
        None => var("HOME").map(|home| Path::new(home).join(".wine")),
    };
    if let Some(prefix) = prefix {
        env.insert("WINEPREFIX".into(), prefix.into());
    }

    env.insert("WINEVERPATH".into(), root.into());
    env.insert("WINELOADER".into(), loader(root).into());
    env.insert("WINESERVER".into(), server(root).into());

    let lib32 = root.join(&unit.lib32);
    let (dll_path, lib_dirs) = match unit.arch {
        Arch::X32 => {
            env.insert("WINEARCH".into(), "win32".into());
            (lib32.join("wine"), lib32.into_os_string())
        }
        Arch::X64 => {
            let lib64 = root.join(&unit.lib64);
            let mut dirs = lib32.into_os_string();
            dirs.push(":");
            dirs.push(&lib64);
            (lib64.join("wine"), dirs)
        }
    };
    env.insert("WINEDLLPATH".into(), dll_path.into());
    env.insert(
        "LD_LIBRARY_PATH".into(),
        search_path(lib_dirs, var("LD_LIBRARY_PATH")),
    );

    for (key, value) in [(WINEDEBUG, &unit.wine_debug), (NINEDEBUG, &unit.nine_debug)] {
        env.entry(key.into()).or_insert_with(|| value.into());
    }

    // `env` holds every inherited and derived variable at this point.
    for (key, value) in &unit.env {
        env.entry(key.into()).or_insert_with(|| value.into());
    }

    env
}
