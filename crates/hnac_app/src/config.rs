use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use hnac_core::Settings;

pub const DEFAULT_CONFIG_PATH: &str = "hnac.ron";

/// Settings plus the file they came from (`None` when defaults were used).
#[derive(Debug)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub origin: Option<PathBuf>,
}

/// Loads settings from `explicit`, or from `./hnac.ron` when no path was given.
///
/// A missing default file yields the built-in defaults; a missing explicit file
/// is an error.
pub fn load(explicit: Option<&Path>) -> anyhow::Result<LoadedSettings> {
    let path = explicit.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound && explicit.is_none() => {
            return Ok(LoadedSettings {
                settings: Settings::default(),
                origin: None,
            });
        }
        Err(err) => {
            return Err(err).with_context(|| format!("reading settings from {}", path.display()))
        }
    };

    let settings = parse(&content)
        .with_context(|| format!("parsing settings from {}", path.display()))?;
    Ok(LoadedSettings {
        settings,
        origin: Some(path.to_path_buf()),
    })
}

pub fn parse(content: &str) -> anyhow::Result<Settings> {
    Ok(ron::from_str(content)?)
}
