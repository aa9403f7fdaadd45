//! Raw agenda trees to the canonical [`Meeting`] model.
//!
//! Both exports are reduced to the same shape:
//! 1. The meeting header (id, trimmed title, dates)
//! 2. Sessions, synthesizing groupings for talks that belong to none
//! 3. Talks with their material, the best artifact picked per talk
//! 4. Loose material on the meeting or a session, as extra-material talks

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use tracing::debug;

use agendafetch_core::{Meeting, Session, Talk, TalkMaterial, unset_time};

use crate::error::{AgendaError, AgendaResult};
use crate::raw::{json, markup};

/// Material entry labels, most wanted first. Missing labels count as `slides`.
const MATERIAL_PREFERENCE: [&str; 4] = ["slides", "transparencies", "poster", "0"];

/// File types, least wanted first.
const EXTENSION_PREFERENCE: [&str; 4] = ["ps", "pdf", "ppt", "pptx"];

/// Replaces backslashes with `/` and drops embedded newlines.
pub fn sanitize(value: &str) -> String {
    value.replace('\\', "/").replace('\n', "")
}

fn material_rank(material: &TalkMaterial) -> usize {
    let label = material
        .material_type
        .as_deref()
        .map(str::to_lowercase)
        .unwrap_or_else(|| "slides".to_string());
    MATERIAL_PREFERENCE
        .iter()
        .position(|p| *p == label)
        .unwrap_or(MATERIAL_PREFERENCE.len())
}

/// Position in [`EXTENSION_PREFERENCE`], `None` for anything else.
fn extension_rank(extension: &str) -> Option<usize> {
    let extension = extension.trim_start_matches('.').to_lowercase();
    EXTENSION_PREFERENCE.iter().position(|e| *e == extension)
}

/// Picks the artifact to present for a talk.
///
/// Entries are ranked by label (`slides`, `transparencies`, `poster`, `0`,
/// anything else); within the best label the file type wins, `pptx` over
/// `ppt` over `pdf` over `ps`. Ties go to the first file.
pub fn find_best_material(all: &[TalkMaterial]) -> Option<&TalkMaterial> {
    let best_rank = all.iter().map(material_rank).min()?;
    all.iter()
        .filter(|m| material_rank(m) == best_rank)
        .fold(None, |best: Option<&TalkMaterial>, m| match best {
            Some(b) if extension_rank(&b.extension) >= extension_rank(&m.extension) => Some(b),
            _ => Some(m),
        })
}

/// `.ext` of the last path component, empty when there is none.
fn file_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

/// Last path component without its extension.
fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Parses a markup date. Values without an offset are taken as UTC.
fn markup_date(value: Option<&str>) -> AgendaResult<DateTime<FixedOffset>> {
    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(unset_time());
    };
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed);
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
        .map(|naive| naive.and_utc().fixed_offset())
        .ok_or_else(|| AgendaError::malformed_response(format!("unparsable date {:?}", value)))
}

/// Resolves a JSON `{date, time, tz}` triple. The local time must exist
/// exactly once in its zone.
fn json_date(value: Option<&json::JsonDate>) -> AgendaResult<DateTime<FixedOffset>> {
    let Some(value) = value else {
        return Ok(unset_time());
    };
    let date = NaiveDate::parse_from_str(value.date.trim(), "%Y-%m-%d")
        .map_err(|e| AgendaError::malformed_response(format!("bad date {:?}", value.date)).with_source(e))?;
    let time = NaiveTime::parse_from_str(value.time.trim(), "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value.time.trim(), "%H:%M"))
        .map_err(|e| AgendaError::malformed_response(format!("bad time {:?}", value.time)).with_source(e))?;
    let tz: Tz = value
        .tz
        .trim()
        .parse()
        .map_err(|_| AgendaError::malformed_response(format!("unknown time zone {:?}", value.tz)))?;

    tz.from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.fixed_offset())
        .ok_or_else(|| {
            AgendaError::malformed_response(format!(
                "{} {} does not exist exactly once in {}",
                value.date, value.time, value.tz
            ))
        })
}

/// Splits contributions that sit outside any session into ad-hoc sessions.
///
/// Each talk joins the group of the nearest defined session starting after
/// it; talks with no later session form one trailing group. Groups keep the
/// order in which their session was first picked.
fn sessionize_orphans(defined: &[Session], talks: Vec<Talk>) -> Vec<Session> {
    if talks.is_empty() {
        return Vec::new();
    }
    if defined.is_empty() {
        return vec![Session::ad_hoc(talks)];
    }

    let mut groups: Vec<(usize, Vec<Talk>)> = Vec::new();
    let mut trailing = Vec::new();
    for talk in talks {
        let nearest = defined
            .iter()
            .enumerate()
            .filter(|(_, s)| s.start > talk.start)
            .min_by_key(|(_, s)| s.start - talk.start)
            .map(|(i, _)| i);
        match nearest {
            Some(i) => match groups.iter_mut().find(|(g, _)| *g == i) {
                Some((_, group)) => group.push(talk),
                None => groups.push((i, vec![talk])),
            },
            None => trailing.push(talk),
        }
    }

    let mut sessions: Vec<Session> = groups
        .into_iter()
        .map(|(_, group)| Session::ad_hoc(group))
        .collect();
    if !trailing.is_empty() {
        sessions.push(Session::ad_hoc(trailing));
    }
    sessions
}

/// Callback invoked with a [`AgendaErrorCode::MissingMaterial`](crate::AgendaErrorCode::MissingMaterial)
/// error for every talk without a usable artifact.
pub type MissingMaterialCallback = Arc<dyn Fn(&AgendaError) + Send + Sync>;

/// Converts raw agenda trees to [`Meeting`]s.
#[derive(Clone, Default)]
pub struct Normalizer {
    on_missing_material: Option<MissingMaterialCallback>,
}

impl fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Normalizer")
            .field("on_missing_material", &self.on_missing_material.is_some())
            .finish()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_missing_material_callback(
        mut self,
        callback: impl Fn(&AgendaError) + Send + Sync + 'static,
    ) -> Self {
        self.on_missing_material = Some(Arc::new(callback));
        self
    }

    fn with_best_material(&self, talk: Talk) -> Talk {
        match find_best_material(&talk.all_material).cloned() {
            Some(best) => talk.with_best_material(&best),
            None => {
                let message = format!("No usable talk slides or poster found for {}", talk.title);
                debug!(talk = %talk.id, title = %talk.title, "no usable material");
                if let Some(ref callback) = self.on_missing_material {
                    callback(&AgendaError::missing_material(message));
                }
                talk
            }
        }
    }

    /// Normalizes the XML export of a conference hosted on `site`.
    ///
    /// # Errors
    ///
    /// [`AgendaErrorCode::MalformedResponse`](crate::AgendaErrorCode::MalformedResponse)
    /// when a date cannot be parsed.
    pub fn normalize_markup(&self, conf: &markup::Conference, site: &str) -> AgendaResult<Meeting> {
        let title = conf.title.trim().to_string();
        let start = markup_date(conf.start_date.as_deref())?;
        let end = markup_date(conf.end_date.as_deref())?;
        let contributions = self.markup_talks(&conf.contributions)?;

        let sessions = if conf.sessions.is_empty() {
            let mut session = Session::new("0", &title);
            session.start = start;
            session.end = end;
            session.talks = contributions;
            session.session_material = markup_extra_material(&conf.material);
            vec![session]
        } else {
            let mut sessions = conf
                .sessions
                .iter()
                .map(|s| self.markup_session(s))
                .collect::<AgendaResult<Vec<_>>>()?;
            let ad_hoc = sessionize_orphans(&sessions, contributions);
            sessions.extend(ad_hoc);
            sessions
        };

        Ok(Meeting {
            id: conf.id.clone(),
            title,
            site: site.to_string(),
            start,
            end,
            sessions,
            meeting_talks: markup_extra_material(&conf.material),
        })
    }

    fn markup_session(&self, raw: &markup::Session) -> AgendaResult<Session> {
        let mut session = Session::new(&raw.id, &raw.title);
        session.start = markup_date(raw.start_date.as_deref())?;
        session.end = markup_date(raw.end_date.as_deref())?;
        session.talks = self.markup_talks(&raw.contributions)?;
        session.session_material = markup_extra_material(&raw.material);
        Ok(session)
    }

    fn markup_talks(&self, contributions: &[markup::Contribution]) -> AgendaResult<Vec<Talk>> {
        contributions.iter().map(|c| self.markup_talk(c)).collect()
    }

    fn markup_talk(&self, raw: &markup::Contribution) -> AgendaResult<Talk> {
        let mut talk = Talk::new(&raw.id, &raw.title);
        if raw.start_date.is_some() {
            talk.start = markup_date(raw.start_date.as_deref())?;
        }
        if raw.end_date.is_some() {
            talk.end = markup_date(raw.end_date.as_deref())?;
        }
        talk.speakers = raw
            .speakers
            .iter()
            .flat_map(|s| &s.users)
            .filter_map(|u| u.name.as_ref())
            .map(markup::UserName::full_name)
            .collect();
        talk.all_material = markup_material(&raw.material);

        let sub_talks = self.markup_talks(&raw.subcontributions)?;
        talk.sub_talks = (!sub_talks.is_empty()).then_some(sub_talks);

        Ok(self.with_best_material(talk))
    }

    /// Normalizes the JSON export of a conference hosted on `site`.
    ///
    /// # Errors
    ///
    /// [`AgendaErrorCode::MalformedResponse`](crate::AgendaErrorCode::MalformedResponse)
    /// when a date, time or zone cannot be resolved.
    pub fn normalize_json(&self, event: &json::Event, site: &str) -> AgendaResult<Meeting> {
        let title = event.title.trim().to_string();
        let start = json_date(event.start_date.as_ref())?;
        let end = json_date(event.end_date.as_ref())?;

        let mut sessions = event
            .sessions
            .iter()
            .map(|s| self.json_session(s))
            .collect::<AgendaResult<Vec<_>>>()?;
        sessions.extend(self.json_sessions_by_name(&event.contributions)?);

        if sessions.is_empty() {
            let mut session = Session::new("0", &title);
            session.start = start;
            session.end = end;
            sessions.push(session);
        }
        for session in sessions.iter_mut().filter(|s| s.title.is_empty()) {
            session.title = title.clone();
        }
        sessions.sort_by_key(|s| s.start);

        Ok(Meeting {
            id: event.id.clone(),
            title,
            site: site.to_string(),
            start,
            end,
            sessions,
            meeting_talks: json_extra_material(&event.folders),
        })
    }

    /// Normalizes a saved export, JSON or markup, detected from its first
    /// non-blank character.
    ///
    /// # Errors
    ///
    /// [`AgendaErrorCode::FormatDeprecated`](crate::AgendaErrorCode::FormatDeprecated)
    /// for a retired markup export, otherwise as the per-format methods.
    pub fn normalize_export(&self, text: &str, site: &str) -> AgendaResult<Meeting> {
        if text.trim_start().starts_with('{') {
            return self.normalize_json(&json::parse_json(text)?, site);
        }
        let conf = markup::parse_markup(text)?;
        if conf.is_deprecated() {
            return Err(AgendaError::format_deprecated("markup export is deprecated").with_site(site));
        }
        self.normalize_markup(&conf, site)
    }

    fn json_session(&self, slot: &json::SessionSlot) -> AgendaResult<Session> {
        let mut session = self.json_session_from(&slot.title, &slot.contributions)?;
        session.id = slot.id.clone();
        if slot.start_date.is_some() {
            session.start = json_date(slot.start_date.as_ref())?;
        }
        if slot.end_date.is_some() {
            session.end = json_date(slot.end_date.as_ref())?;
        }
        if let Some(ref info) = slot.session {
            session.session_material = json_extra_material(&info.folders);
        }
        Ok(session)
    }

    /// Groups top-level contributions by the session name they carry.
    fn json_sessions_by_name(&self, contributions: &[json::Contribution]) -> AgendaResult<Vec<Session>> {
        let mut groups: Vec<(&str, Vec<&json::Contribution>)> = Vec::new();
        for contrib in contributions {
            let name = contrib.session.as_deref().unwrap_or_default();
            match groups.iter_mut().find(|(n, _)| *n == name) {
                Some((_, group)) => group.push(contrib),
                None => groups.push((name, vec![contrib])),
            }
        }
        groups
            .into_iter()
            .map(|(name, group)| self.json_session_from(name, group))
            .collect()
    }

    /// Session `"0"` holding `contributions` ordered by start and spanning them.
    fn json_session_from<'a>(
        &self,
        title: &str,
        contributions: impl IntoIterator<Item = &'a json::Contribution>,
    ) -> AgendaResult<Session> {
        let mut talks = contributions
            .into_iter()
            .map(|c| self.json_talk(c))
            .collect::<AgendaResult<Vec<_>>>()?;
        talks.sort_by_key(|t| t.start);

        let mut session = Session::new("0", title);
        session.talks = talks;
        session.fit_to_talks();
        Ok(session)
    }

    fn json_talk(&self, raw: &json::Contribution) -> AgendaResult<Talk> {
        let mut talk = Talk::new(&raw.id, &raw.title).with_times(
            json_date(raw.start_date.as_ref())?,
            json_date(raw.end_date.as_ref())?,
        );
        talk.speakers = raw.speakers.iter().map(|p| p.full_name.clone()).collect();
        talk.all_material = json_material(&raw.folders);

        let sub_talks: Vec<Talk> = raw
            .sub_contributions
            .iter()
            .map(|sc| self.json_sub_talk(sc))
            .collect();
        talk.sub_talks = (!sub_talks.is_empty()).then_some(sub_talks);

        Ok(self.with_best_material(talk))
    }

    fn json_sub_talk(&self, raw: &json::SubContribution) -> Talk {
        let mut talk = Talk::new(&raw.id, &raw.title);
        talk.speakers = raw.speakers.iter().map(|p| p.full_name.clone()).collect();
        talk.all_material = json_material(&raw.folders);
        self.with_best_material(talk)
    }
}

/// Every uploaded file of the given markup entries, plus direct links.
fn markup_material(entries: &[markup::Material]) -> Vec<TalkMaterial> {
    let mut all = Vec::new();
    for entry in entries {
        let material_type = non_empty(&entry.title);
        for file in entry.files() {
            let Some(url) = file.url.as_deref().filter(|u| !u.trim().is_empty()) else {
                continue;
            };
            let name = sanitize(&file.name);
            let mut extension = file_extension(&name);
            if extension.is_empty() && !file.kind.is_empty() {
                extension = format!(".{}", file.kind);
            }
            all.push(TalkMaterial {
                url: sanitize(url),
                display_name: file_stem(&name),
                extension,
                material_type: material_type.clone(),
            });
        }
        for (kind, link) in entry.direct_links() {
            let url = sanitize(link);
            if all.iter().any(|m: &TalkMaterial| m.url == url) {
                continue;
            }
            all.push(TalkMaterial {
                display_name: file_stem(&url),
                extension: format!(".{}", kind),
                url,
                material_type: material_type.clone(),
            });
        }
    }
    all
}

/// Material hanging off a meeting or session, one talk per entry.
///
/// Files sharing a name stem are alternatives of one upload; the one with the
/// best known file type is kept and stems without a known type are dropped.
fn markup_extra_material(entries: &[markup::Material]) -> Vec<Talk> {
    entries
        .iter()
        .filter_map(|entry| {
            let mut by_stem: Vec<(String, Vec<&markup::File>)> = Vec::new();
            for file in entry.files() {
                let stem = file_stem(&sanitize(&file.name));
                match by_stem.iter_mut().find(|(s, _)| *s == stem) {
                    Some((_, files)) => files.push(file),
                    None => by_stem.push((stem, vec![file])),
                }
            }

            let sub_talks: Vec<Talk> = by_stem
                .into_iter()
                .filter_map(|(stem, files)| {
                    let best = files
                        .into_iter()
                        .filter(|f| f.url.as_deref().is_some_and(|u| !u.trim().is_empty()))
                        .filter_map(|f| extension_rank(&f.kind).map(|rank| (rank, f)))
                        .fold(None, |best: Option<(usize, &markup::File)>, (rank, f)| match best {
                            Some((r, _)) if r >= rank => best,
                            _ => Some((rank, f)),
                        })?
                        .1;
                    let material = TalkMaterial {
                        url: sanitize(best.url.as_deref().unwrap_or_default()),
                        display_name: stem,
                        extension: file_extension(&sanitize(&best.name)),
                        material_type: non_empty(&entry.title),
                    };
                    Some(extra_material_file(&entry.id, &entry.title, material))
                })
                .collect();

            (!sub_talks.is_empty()).then(|| {
                let mut talk = Talk::extra_material(&entry.id, &entry.title);
                talk.sub_talks = Some(sub_talks);
                talk
            })
        })
        .collect()
}

/// Every attachment in the given folders, labelled with the folder title.
fn json_material(folders: &[json::Folder]) -> Vec<TalkMaterial> {
    folders
        .iter()
        .flat_map(|folder| {
            folder.attachments.iter().filter_map(move |a| {
                let url = sanitize(a.download_url.as_deref()?);
                let mut extension = file_extension(&url);
                if extension.is_empty() {
                    extension = a.filename.as_deref().map(file_extension).unwrap_or_default();
                }
                Some(TalkMaterial {
                    display_name: a.title.clone(),
                    extension,
                    url,
                    material_type: non_empty(&folder.title),
                })
            })
        })
        .collect()
}

/// Folders attached to a meeting or session, one talk per folder with one
/// child per attachment.
fn json_extra_material(folders: &[json::Folder]) -> Vec<Talk> {
    folders
        .iter()
        .filter_map(|folder| {
            let sub_talks: Vec<Talk> = json_material(std::slice::from_ref(folder))
                .into_iter()
                .map(|m| extra_material_file("0", &folder.title, m))
                .collect();
            (!sub_talks.is_empty()).then(|| {
                let mut talk = Talk::extra_material(&folder.id, &folder.title);
                talk.sub_talks = Some(sub_talks);
                talk
            })
        })
        .collect()
}

/// Child talk of an extra-material bundle, carrying a single file.
fn extra_material_file(id: &str, title: &str, material: TalkMaterial) -> Talk {
    let mut talk = Talk::extra_material(id, title).with_best_material(&material);
    talk.all_material = vec![material];
    talk
}
