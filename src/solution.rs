// Copyright (c) 2026-present, cell-track-engine contributors
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Persisted solver output.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::lineage::Cell;

/// A complete tracking result for one stack of frames.
///
/// `root_directory` is relocated on [`TrackingSolution::load_from_path`] to
/// the parent directory of the file actually loaded, so a solution saved on
/// one machine and copied elsewhere still resolves `image_filenames`
/// relative to wherever it landed, rather than trusting whatever
/// `root_directory` string was baked in at save time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackingSolution {
    pub total_frames: u32,
    pub root_directory: String,
    pub image_filenames: Vec<Vec<String>>,
    pub cells: Vec<Cell>,
}

impl TrackingSolution {
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let mut solution: Self = serde_json::from_str(&contents)?;

        if let Some(parent) = path.parent() {
            solution.root_directory = relocate(parent);
        }

        Ok(solution)
    }
}

fn relocate(parent: &Path) -> String {
    let absolute: PathBuf = if parent.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        parent.to_path_buf()
    };
    absolute.to_string_lossy().into_owned()
}
