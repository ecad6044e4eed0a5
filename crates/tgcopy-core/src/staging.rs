//! Transient local storage for downloaded media.
//!
//! A `StagedFile` is a guard: the file it points at is removed when the guard is released or
//! dropped, so an error propagating out of the publish step cannot leave files behind.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::{domain::MessageId, Result};

#[derive(Clone, Debug)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    /// Open the staging directory, creating it if absent.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve the path for one message's download. Nothing is written yet.
    pub fn stage(&self, message_id: MessageId, file_name: &str) -> StagedFile {
        StagedFile {
            path: self.dir.join(file_name),
            message_id,
            released: false,
        }
    }
}

#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    message_id: MessageId,
    released: bool,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    /// Track the path the transport actually wrote to, when it differs from the requested one.
    pub fn adopt(&mut self, written: PathBuf) {
        if written != self.path {
            remove_quietly(&self.path, self.message_id);
            self.path = written;
        }
    }

    /// Delete the staged file now.
    pub fn release(mut self) {
        self.released = true;
        remove_quietly(&self.path, self.message_id);
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.released {
            remove_quietly(&self.path, self.message_id);
        }
    }
}

fn remove_quietly(path: &Path, message_id: MessageId) {
    match fs::remove_file(path) {
        Ok(()) => tracing::debug!("removed staged file {} (message {message_id})", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            "failed to remove staged file {} (message {message_id}): {e}",
            path.display()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("downloads");
        let area = StagingArea::open(&dir).unwrap();
        assert!(dir.is_dir());
        assert_eq!(area.dir(), dir.as_path());

        // Opening again is fine.
        StagingArea::open(&dir).unwrap();
    }

    #[test]
    fn release_deletes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let area = StagingArea::open(tmp.path()).unwrap();
        let staged = area.stage(MessageId(7), "7.jpg");
        fs::write(staged.path(), b"jpeg").unwrap();
        let path = staged.path().to_path_buf();

        staged.release();
        assert!(!path.exists());
    }

    #[test]
    fn drop_deletes_file() {
        let tmp = tempfile::tempdir().unwrap();
        let area = StagingArea::open(tmp.path()).unwrap();
        let path = {
            let staged = area.stage(MessageId(8), "8.pdf");
            fs::write(staged.path(), b"pdf").unwrap();
            staged.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn releasing_nothing_is_fine() {
        let tmp = tempfile::tempdir().unwrap();
        let area = StagingArea::open(tmp.path()).unwrap();
        area.stage(MessageId(9), "9.jpg").release();
    }

    #[test]
    fn adopted_path_is_the_one_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let area = StagingArea::open(tmp.path()).unwrap();
        let mut staged = area.stage(MessageId(10), "10.unknown");
        let actual = tmp.path().join("10.bin");
        fs::write(&actual, b"x").unwrap();

        staged.adopt(actual.clone());
        assert_eq!(staged.message_id(), MessageId(10));
        assert_eq!(staged.path(), actual.as_path());
        staged.release();
        assert!(!actual.exists());
    }
}
