// src/engine/session.rs
//
// EditSession: one image under edit plus its undo/redo history.
//
// History is a single linear timeline. The undo stack holds every state
// from the loaded original (entry 0) to the current image (last entry);
// the redo stack holds undone states, most recent on top. Any successful
// apply clears the redo stack.

use crate::buffer::ImageBuffer;
use crate::config::SessionConfig;
use crate::engine::{decoder, encoder, pipeline};
use crate::error::{LunarzError, Result};
use crate::ops::Operation;
use crate::request::OperatorRequest;
use std::path::Path;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing loaded; only `load` is meaningful.
    Empty,
    Ready,
}

#[derive(Clone, Debug)]
struct HistoryEntry {
    image: ImageBuffer,
    /// None for the loaded original
    operation: Option<Operation>,
}

#[derive(Debug, Default)]
pub struct EditSession {
    undo: Vec<HistoryEntry>,
    redo: Vec<HistoryEntry>,
    config: SessionConfig,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start over with `image` as the original. Any previous history is dropped.
    pub fn load(&mut self, image: ImageBuffer) {
        debug!(
            target: "lunarz::session",
            width = image.width(),
            height = image.height(),
            channels = image.channels(),
            dropped = self.undo.len() + self.redo.len(),
            "load"
        );
        self.redo.clear();
        self.undo.clear();
        self.undo.push(HistoryEntry {
            image,
            operation: None,
        });
    }

    /// Decode `path` and load it. On failure the session is unchanged.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let (image, _) = decoder::decode_file(path)?;
        self.load(image);
        Ok(())
    }

    /// Run `op` against the current image and record the result.
    ///
    /// On failure nothing changes, including the redo stack.
    pub fn apply(&mut self, op: Operation) -> Result<&ImageBuffer> {
        let current = self.current()?;
        let image = pipeline::apply_op(current, &op)?;
        debug!(
            target: "lunarz::session",
            operation = op.name(),
            discarded_redo = self.redo.len(),
            "apply"
        );
        self.redo.clear();
        self.undo.push(HistoryEntry {
            image,
            operation: Some(op),
        });
        self.evict_over_limit();
        self.current()
    }

    /// Resolve a hosting-surface request and apply it.
    pub fn apply_request(&mut self, request: &OperatorRequest) -> Result<&ImageBuffer> {
        if self.state() == SessionState::Empty {
            return Err(LunarzError::no_image_loaded());
        }
        let op = request.resolve()?;
        self.apply(op)
    }

    fn evict_over_limit(&mut self) {
        let Some(limit) = self.config.max_history else {
            return;
        };
        while self.undo.len() > limit + 1 {
            // Entry 0 is the original and always stays.
            let evicted = self.undo.remove(1);
            debug!(
                target: "lunarz::session",
                operation = evicted.operation.as_ref().map(Operation::name),
                limit,
                "evict"
            );
        }
    }

    /// Step back one edit. Returns false (and does nothing) when only the
    /// original is left or nothing is loaded.
    pub fn undo(&mut self) -> bool {
        if self.undo.len() <= 1 {
            return false;
        }
        match self.undo.pop() {
            Some(entry) => {
                self.redo.push(entry);
                debug!(target: "lunarz::session", undo_depth = self.undo_depth(), redo_depth = self.redo.len(), "undo");
                true
            }
            None => false,
        }
    }

    /// Re-apply the most recently undone edit. Returns false when there is none.
    pub fn redo(&mut self) -> bool {
        match self.redo.pop() {
            Some(entry) => {
                self.undo.push(entry);
                debug!(target: "lunarz::session", undo_depth = self.undo_depth(), redo_depth = self.redo.len(), "redo");
                true
            }
            None => false,
        }
    }

    /// Back to the original, discarding every edit and the redo stack.
    pub fn reset(&mut self) -> Result<()> {
        if self.undo.is_empty() {
            return Err(LunarzError::no_image_loaded());
        }
        self.undo.truncate(1);
        self.redo.clear();
        debug!(target: "lunarz::session", "reset");
        Ok(())
    }

    pub fn current(&self) -> Result<&ImageBuffer> {
        self.undo
            .last()
            .map(|entry| &entry.image)
            .ok_or_else(LunarzError::no_image_loaded)
    }

    pub fn original(&self) -> Result<&ImageBuffer> {
        self.undo
            .first()
            .map(|entry| &entry.image)
            .ok_or_else(LunarzError::no_image_loaded)
    }

    pub fn state(&self) -> SessionState {
        if self.undo.is_empty() {
            SessionState::Empty
        } else {
            SessionState::Ready
        }
    }

    pub fn can_undo(&self) -> bool {
        self.undo.len() > 1
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of edits that can be undone.
    pub fn undo_depth(&self) -> usize {
        self.undo.len().saturating_sub(1)
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Operations behind the current image, oldest first.
    pub fn history(&self) -> Vec<&Operation> {
        self.undo
            .iter()
            .filter_map(|entry| entry.operation.as_ref())
            .collect()
    }

    /// Names of the operations behind the current image, oldest first.
    pub fn history_names(&self) -> Vec<&'static str> {
        self.history().into_iter().map(Operation::name).collect()
    }

    /// Encode the current image to `path`, format from the extension.
    pub fn export(&self, path: &Path) -> Result<()> {
        encoder::save(self.current()?, path)
    }
}
