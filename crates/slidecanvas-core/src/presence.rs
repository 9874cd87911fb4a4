//! Per-participant ephemeral state and remote-participant rendering helpers.
//!
//! Presence is never persisted. Each connection owns its own [`Presence`];
//! other connections can only read it.

use crate::geometry::{connection_id_to_color, user_id_to_color};
use crate::layers::{LayerId, PenPoint, Rgb, DEFAULT_FILL};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Session-scoped id the room assigns to each connection.
pub type ConnectionId = u32;

/// Identity shown to other participants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
            avatar: None,
        }
    }
}

/// Ephemeral state of one participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Presence {
    /// Selected layer ids, in selection order.
    #[serde(default)]
    pub selection: Vec<LayerId>,
    /// Pointer position in canvas space, `None` when outside the canvas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Point>,
    /// Absolute samples of the stroke being drawn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pencil_draft: Option<Vec<PenPoint>>,
    /// Color of the stroke being drawn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pen_color: Option<Rgb>,
    #[serde(default)]
    pub profile: UserProfile,
}

impl Presence {
    /// Initial presence for a freshly joined participant.
    pub fn for_profile(profile: UserProfile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }
}

/// Partial presence update. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PresenceUpdate {
    selection: Option<Vec<LayerId>>,
    cursor: Option<Option<Point>>,
    pencil_draft: Option<Option<Vec<PenPoint>>>,
    pen_color: Option<Option<Rgb>>,
    profile: Option<UserProfile>,
}

impl PresenceUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(mut self, selection: Vec<LayerId>) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn cursor(mut self, cursor: Option<Point>) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn pencil_draft(mut self, draft: Option<Vec<PenPoint>>) -> Self {
        self.pencil_draft = Some(draft);
        self
    }

    pub fn pen_color(mut self, color: Option<Rgb>) -> Self {
        self.pen_color = Some(color);
        self
    }

    pub fn profile(mut self, profile: UserProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Whether this update writes the selection.
    /// Only selection changes are eligible for the undo history.
    pub fn touches_selection(&self) -> bool {
        self.selection.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn apply_to(self, presence: &mut Presence) {
        if let Some(selection) = self.selection {
            presence.selection = selection;
        }
        if let Some(cursor) = self.cursor {
            presence.cursor = cursor;
        }
        if let Some(draft) = self.pencil_draft {
            presence.pencil_draft = draft;
        }
        if let Some(color) = self.pen_color {
            presence.pen_color = color;
        }
        if let Some(profile) = self.profile {
            presence.profile = profile;
        }
    }
}

/// Another participant in the room.
#[derive(Debug, Clone, PartialEq)]
pub struct Other {
    pub connection_id: ConnectionId,
    pub presence: Presence,
}

/// Presence traffic exchanged with a relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PresenceMessage {
    /// Full presence of a connection.
    Update {
        connection_id: ConnectionId,
        #[serde(flatten)]
        presence: Presence,
    },
    /// The connection left the room.
    Leave { connection_id: ConnectionId },
}

/// Map every layer selected by another participant to that participant's color.
/// When two participants select the same layer, the later one in `others` wins.
pub fn selection_colors(others: &[Other]) -> HashMap<LayerId, &'static str> {
    let mut colors = HashMap::new();
    for other in others {
        let color = connection_id_to_color(other.connection_id);
        for id in &other.presence.selection {
            colors.insert(*id, color);
        }
    }
    colors
}

/// A remote pointer to draw on top of the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCursor {
    pub connection_id: ConnectionId,
    pub position: Point,
    pub color: &'static str,
    pub name: String,
}

/// Cursors of every other participant currently over the canvas.
pub fn remote_cursors(others: &[Other]) -> Vec<RemoteCursor> {
    others
        .iter()
        .filter_map(|other| {
            other.presence.cursor.map(|position| RemoteCursor {
                connection_id: other.connection_id,
                position,
                color: user_id_to_color(&other.presence.profile.user_id),
                name: other.presence.profile.name.clone(),
            })
        })
        .collect()
}

/// A stroke another participant is still drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDraft {
    pub connection_id: ConnectionId,
    pub points: Vec<PenPoint>,
    pub color: Rgb,
}

/// In-progress strokes of every other participant.
pub fn remote_drafts(others: &[Other]) -> Vec<RemoteDraft> {
    others
        .iter()
        .filter_map(|other| {
            other.presence.pencil_draft.as_ref().map(|points| RemoteDraft {
                connection_id: other.connection_id,
                points: points.clone(),
                color: other.presence.pen_color.unwrap_or(DEFAULT_FILL),
            })
        })
        .collect()
}
