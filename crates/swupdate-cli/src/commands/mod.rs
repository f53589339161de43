//! CLI command implementations.

pub mod check;
pub mod hwrevision;
pub mod info;
pub mod install;
pub mod status;
pub mod versions;

use anyhow::{bail, Context, Result};
use clap::Args;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use swupdate_description::{Selection, SwuArchive, FILE_EXTENSION};

use crate::config::Settings;

/// Software set and running mode, given together or not at all.
#[derive(Args, Debug, Default, Clone)]
pub struct SelectionArgs {
    /// Software set to select (e.g. stable)
    #[arg(long, requires = "running_mode")]
    pub software_set: Option<String>,

    /// Running mode within the software set (e.g. copy1)
    #[arg(long, requires = "software_set")]
    pub running_mode: Option<String>,
}

impl SelectionArgs {
    /// The pair from the flags, else the one from the config file.
    pub fn resolve(&self, settings: &Settings) -> Result<Option<(String, String)>> {
        let (set, mode) = if self.software_set.is_some() || self.running_mode.is_some() {
            (&self.software_set, &self.running_mode)
        } else {
            (&settings.software_set, &settings.running_mode)
        };
        match (set, mode) {
            (Some(set), Some(mode)) => Ok(Some((set.clone(), mode.clone()))),
            (None, None) => Ok(None),
            _ => bail!("software set and running mode must be given together"),
        }
    }

    pub fn selection(&self, settings: &Settings, board: Option<String>) -> Result<Selection> {
        let (software_set, running_mode) = match self.resolve(settings)? {
            Some((set, mode)) => (Some(set), Some(mode)),
            None => (None, None),
        };
        Ok(Selection::new(board, software_set, running_mode))
    }
}

/// An update image or a bare description read from disk.
pub enum Source {
    Image(SwuArchive),
    Description(String),
}

impl Source {
    /// Open `path`. Files with the cpio magic or a `.swu` name are read as archives.
    pub fn open(path: &Path) -> Result<Self> {
        let mut magic = [0u8; 5];
        let is_cpio = File::open(path)
            .and_then(|mut f| f.read_exact(&mut magic))
            .map(|_| &magic == b"07070")
            .unwrap_or(false);
        let named_swu = path.extension().is_some_and(|ext| ext == FILE_EXTENSION);

        if is_cpio || named_swu {
            let archive =
                SwuArchive::open(path).with_context(|| format!("Failed to read: {:?}", path))?;
            Ok(Source::Image(archive))
        } else {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read: {:?}", path))?;
            Ok(Source::Description(text))
        }
    }

    pub fn description_text(&self) -> &str {
        match self {
            Source::Image(archive) => &archive.description,
            Source::Description(text) => text,
        }
    }

    pub fn archive(&self) -> Option<&SwuArchive> {
        match self {
            Source::Image(archive) => Some(archive),
            Source::Description(_) => None,
        }
    }
}

/// Local wall-clock time for progress lines.
pub fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
