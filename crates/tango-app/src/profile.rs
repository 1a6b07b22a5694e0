use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tango_config::Config;

/// A named, stored configuration
#[derive(Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub value: Config,
}

/// Profile files under one directory, `<name>.json` each
pub struct Profiles {
    dir: PathBuf,
}

impl Profiles {
    /// `<user config dir>/tango/profiles`
    pub fn user() -> anyhow::Result<Self> {
        let root = dirs::config_dir().context("No user config directory on this platform")?;
        Ok(Self::at(root.join("tango").join("profiles")))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the profile folder and a default `main` profile if missing
    pub fn init(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let main = self.path("main");
        if !main.exists() {
            let profile = Profile {
                name: "main".into(),
                value: Config::default(),
            };
            fs::write(&main, serde_json::to_string_pretty(&profile)?)?;
            tracing::info!("[PROFILE] created main profile at {}", main.display());
        }

        Ok(())
    }

    /// Load a profile by name, falling back to `main` and then to defaults
    pub fn load(&self, name: &str) -> anyhow::Result<Config> {
        let file = self.path(name);
        if file.exists() {
            return read_profile(&file);
        }

        tracing::warn!("[PROFILE] {name} not found, falling back to main profile or defaults");
        let main = self.path("main");
        if main.exists() {
            read_profile(&main)
        } else {
            Ok(Config::default())
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

fn read_profile(path: &Path) -> anyhow::Result<Config> {
    let data =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let profile: Profile = serde_json::from_str(&data)
        .with_context(|| format!("Invalid profile {}", path.display()))?;
    Ok(profile.value)
}

/// Plain config file, the bare `Config` JSON without the profile wrapper
pub fn load_config_file(path: &Path) -> anyhow::Result<Config> {
    let data =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Invalid config {}", path.display()))
}
