//! Temporary on-disk staging for generated images.
//!
//! The messaging adapter uploads from a path, so returned bytes are written to
//! a uniquely named file first. The file lives exactly as long as the
//! [`StagedImage`] value.

use std::{
    io::Write,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use tempfile::{Builder, TempPath};

use crate::{domain::UserId, Result};

#[derive(Debug)]
pub struct StagedImage {
    path: TempPath,
}

impl StagedImage {
    /// Write `bytes` to a fresh `img_<user>_<millis>_*.png` file under `dir`.
    pub fn write(dir: &Path, user_id: UserId, bytes: &[u8]) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let mut file = Builder::new()
            .prefix(&format!("img_{}_{ts}_", user_id.0))
            .suffix(".png")
            .tempfile_in(dir)?;

        file.write_all(bytes)?;
        file.as_file().sync_all()?;

        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn to_path_buf(&self) -> PathBuf {
        self.path.to_path_buf()
    }

    /// Delete now and surface the I/O error; dropping deletes silently.
    pub fn close(self) -> Result<()> {
        self.path.close()?;
        Ok(())
    }
}
