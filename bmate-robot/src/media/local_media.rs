use crate::error::SessionError;
use crate::media::LocalStream;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaStatus {
    Pending,
    Ready(LocalStream),
    Unavailable(SessionError),
}

/// The local capture of this session. Acquired once; until it settles,
/// negotiations wait.
#[derive(Debug)]
pub struct LocalMediaSession {
    status: MediaStatus,
}

impl LocalMediaSession {
    pub fn new() -> Self {
        Self {
            status: MediaStatus::Pending,
        }
    }

    pub fn status(&self) -> &MediaStatus {
        &self.status
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self.status, MediaStatus::Pending)
    }

    pub fn stream(&self) -> Option<&LocalStream> {
        match &self.status {
            MediaStatus::Ready(stream) => Some(stream),
            _ => None,
        }
    }

    pub fn settle(&mut self, result: Result<LocalStream, SessionError>) {
        self.status = match result {
            Ok(stream) => MediaStatus::Ready(stream),
            Err(err) => MediaStatus::Unavailable(err),
        };
    }
}

impl Default for LocalMediaSession {
    fn default() -> Self {
        Self::new()
    }
}
