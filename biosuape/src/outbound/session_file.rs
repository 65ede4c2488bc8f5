//! File-backed session store.
//!
//! The token is written as a single line to a file the CLI owns. All access
//! goes through `cap_std::fs::Dir` handles opened on the parent directory.

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use tracing::debug;

use crate::domain::SessionToken;
use crate::domain::ports::{SessionStore, SessionStoreError};

/// [`SessionStore`] persisting the token in a single file.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    /// Store the token at `path`. Parent directories are created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the token file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn split(&self) -> io::Result<(&Path, OsString)> {
        let parent = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let file_name = self.path.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "session path must include a file name",
            )
        })?;
        Ok((parent, file_name.to_os_string()))
    }

    /// Open the parent directory, or `None` when it does not exist yet.
    fn open_parent(&self) -> io::Result<Option<(Dir, OsString)>> {
        let (parent, file_name) = self.split()?;
        match Dir::open_ambient_dir(parent, ambient_authority()) {
            Ok(dir) => Ok(Some((dir, file_name))),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error),
        }
    }
}

fn io_error(error: &io::Error) -> SessionStoreError {
    SessionStoreError::io(error.to_string())
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn set(&self, token: &SessionToken) -> Result<(), SessionStoreError> {
        let (parent, file_name) = self.split().map_err(|err| io_error(&err))?;
        Dir::create_ambient_dir_all(parent, ambient_authority()).map_err(|err| io_error(&err))?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority()).map_err(|err| io_error(&err))?;
        dir.write(Path::new(&file_name), format!("{}\n", token.expose()))
            .map_err(|err| io_error(&err))?;
        debug!(path = %self.path.display(), "session token stored");
        Ok(())
    }

    async fn get(&self) -> Result<Option<SessionToken>, SessionStoreError> {
        let Some((dir, file_name)) = self.open_parent().map_err(|err| io_error(&err))? else {
            return Ok(None);
        };
        let contents = match dir.read_to_string(Path::new(&file_name)) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(io_error(&error)),
        };
        let raw = contents.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        SessionToken::new(raw)
            .map(Some)
            .map_err(|err| SessionStoreError::corrupt(err.to_string()))
    }

    async fn clear(&self) -> Result<(), SessionStoreError> {
        let Some((dir, file_name)) = self.open_parent().map_err(|err| io_error(&err))? else {
            return Ok(());
        };
        match dir.remove_file(Path::new(&file_name)) {
            Ok(()) => {
                debug!(path = %self.path.display(), "session token removed");
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(io_error(&error)),
        }
    }
}
