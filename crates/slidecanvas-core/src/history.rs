//! Gesture batching on top of the room's undo history.
//!
//! A pointer gesture can write to the store many times (one translate per
//! pointer move). [`HistoryController`] pauses room history when a gesture
//! starts and resumes it when the gesture ends, so the gesture undoes as a
//! single step.

use crate::store::{Room, StoreResult};

/// Tracks whether the local participant has an open history batch.
#[derive(Debug, Clone, Default)]
pub struct HistoryController {
    batching: bool,
}

impl HistoryController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a batch is open.
    pub fn is_batching(&self) -> bool {
        self.batching
    }

    /// Open a batch. Nested calls are ignored.
    pub fn begin_gesture<R: Room>(&mut self, room: &mut R) {
        if !self.batching {
            room.pause_history();
            self.batching = true;
            log::debug!("history paused");
        }
    }

    /// Close the open batch, if any.
    pub fn end_gesture<R: Room>(&mut self, room: &mut R) {
        if self.batching {
            room.resume_history();
            self.batching = false;
            log::debug!("history resumed");
        }
    }

    /// Undo the last step. An open batch is closed first so it becomes that step.
    pub fn undo<R: Room>(&mut self, room: &mut R) -> StoreResult<bool> {
        self.end_gesture(room);
        room.undo()
    }

    /// Redo the last undone step.
    pub fn redo<R: Room>(&mut self, room: &mut R) -> StoreResult<bool> {
        self.end_gesture(room);
        room.redo()
    }

    pub fn can_undo<R: Room>(&self, room: &R) -> bool {
        room.can_undo()
    }

    pub fn can_redo<R: Room>(&self, room: &R) -> bool {
        room.can_redo()
    }
}
