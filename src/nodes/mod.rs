//! Node operations.
//!
//! Each call runs to completion on the calling thread. Nothing is shared between calls
//! except the collaborators borrowed through [`NodeContext`].

use crate::scratch::TempArea;
use crate::transcode::Transcoder;

/// Batch interleaving (pure).
pub mod interleave;
/// Frame batch to video.
pub mod merge;
/// Video to frame batch.
pub mod split;

/// Collaborators a node invocation needs from its host.
#[derive(Clone, Copy)]
pub struct NodeContext<'a> {
    pub transcoder: &'a dyn Transcoder,
    pub temp: &'a TempArea,
}

impl<'a> NodeContext<'a> {
    pub fn new(transcoder: &'a dyn Transcoder, temp: &'a TempArea) -> Self {
        Self { transcoder, temp }
    }
}

impl std::fmt::Debug for NodeContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeContext")
            .field("transcoder", &self.transcoder.name())
            .field("temp", &self.temp.root())
            .finish()
    }
}
