//! Contains structs for `objscene.toml`.

use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use toml::from_str;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: ConfigGeneral,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfigGeneral {
    /// Directory the listed models live in.
    #[serde(default)]
    pub model_dir: PathBuf,

    /// OBJ file names under `model_dir`.
    #[serde(default)]
    pub models: Vec<String>,
}

impl Config {
    /// Reads the config file. A missing file yields an empty config.
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config file at {:?}", path);
            return Ok(Config::default());
        }

        let config = from_str(&read_to_string(path).context("Failed to read config file")?)
            .context("Failed to parse config file")?;
        Ok(config)
    }

    /// Returns the locations of the models listed in this config.
    pub fn model_locations(&self) -> Vec<String> {
        self.general
            .models
            .iter()
            .map(|name| {
                self.general
                    .model_dir
                    .join(name)
                    .to_string_lossy()
                    .into_owned()
            })
            .collect()
    }
}
