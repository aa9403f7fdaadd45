//! Canonical schedule model.
//!
//! Every agenda, whichever wire format it came from, ends up as a
//! [`Meeting`] holding one or more [`Session`]s of [`Talk`]s. Values are
//! built once per fetch and not mutated afterwards.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder instant for agenda entries that carry no date.
pub fn unset_time() -> DateTime<FixedOffset> {
    DateTime::<Utc>::UNIX_EPOCH.fixed_offset()
}

/// A conference, workshop or meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub title: String,
    /// Host the agenda was fetched from.
    pub site: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// Never empty.
    pub sessions: Vec<Session>,
    /// Material attached to the meeting itself.
    pub meeting_talks: Vec<Talk>,
}

impl Meeting {
    /// All talks across all sessions, in session order.
    pub fn talks(&self) -> impl Iterator<Item = &Talk> {
        self.sessions.iter().flat_map(|s| s.talks.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub talks: Vec<Talk>,
    /// Material attached to the session rather than to a talk.
    pub session_material: Vec<Talk>,
}

impl Session {
    /// Id given to sessions synthesized for talks that belong to none.
    pub const AD_HOC_ID: &'static str = "-1";
    /// Title given to sessions synthesized for talks that belong to none.
    pub const AD_HOC_TITLE: &'static str = "<ad-hoc session>";

    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start: unset_time(),
            end: unset_time(),
            talks: Vec::new(),
            session_material: Vec::new(),
        }
    }

    /// An ad-hoc session spanning its talks, which are ordered by start.
    pub fn ad_hoc(mut talks: Vec<Talk>) -> Self {
        talks.sort_by_key(|t| t.start);
        let mut session = Self::new(Self::AD_HOC_ID, Self::AD_HOC_TITLE);
        session.talks = talks;
        session.fit_to_talks();
        session
    }

    /// Sets start/end to the earliest talk start and latest talk end.
    ///
    /// Sessions without talks keep their current times.
    pub fn fit_to_talks(&mut self) {
        if let Some(start) = self.talks.iter().map(|t| t.start).min() {
            self.start = start;
        }
        if let Some(end) = self.talks.iter().map(|t| t.end).max() {
            self.end = end;
        }
    }

    pub fn is_ad_hoc(&self) -> bool {
        self.id == Self::AD_HOC_ID
    }
}

/// Whether a talk is a scheduled contribution or a bundle of loose material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TalkKind {
    #[default]
    Ordinary,
    ExtraMaterial,
}

/// One contribution, or one piece of material attached above contribution level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Talk {
    pub id: String,
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub speakers: Vec<String>,
    /// Nested contributions, or one entry per file for material bundles.
    pub sub_talks: Option<Vec<Talk>>,
    pub kind: TalkKind,
    /// Preferred artifact for this talk, empty when none was found.
    pub best_material_url: String,
    pub best_material_display_name: String,
    /// Extension including the leading dot, e.g. `.pptx`.
    pub best_material_extension: String,
    /// Every file attached to the talk.
    pub all_material: Vec<TalkMaterial>,
}

impl Talk {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start: unset_time(),
            end: unset_time(),
            speakers: Vec::new(),
            sub_talks: None,
            kind: TalkKind::Ordinary,
            best_material_url: String::new(),
            best_material_display_name: String::new(),
            best_material_extension: String::new(),
            all_material: Vec::new(),
        }
    }

    /// A talk made of loose material, without a direct artifact.
    pub fn extra_material(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            kind: TalkKind::ExtraMaterial,
            ..Self::new(id, title)
        }
    }

    pub fn with_times(mut self, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Fills the best-material fields from `material`.
    pub fn with_best_material(mut self, material: &TalkMaterial) -> Self {
        self.best_material_url = material.url.clone();
        self.best_material_display_name = material.display_name.clone();
        self.best_material_extension = material.extension.clone();
        self
    }

    pub fn has_material(&self) -> bool {
        !self.best_material_url.is_empty()
    }

    /// Identity used for de-duplication: same id and same best artifact.
    ///
    /// Deliberately narrower than `==`, which compares every field.
    pub fn same_identity(&self, other: &Talk) -> bool {
        self.id == other.id && self.best_material_url == other.best_material_url
    }
}

/// A single uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalkMaterial {
    pub url: String,
    pub display_name: String,
    /// Extension including the leading dot, empty when the name has none.
    pub extension: String,
    /// Label of the material entry the file belongs to (`slides`, `poster`, ...).
    pub material_type: Option<String>,
}
