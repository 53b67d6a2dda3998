//! XML loader for the demo data document.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde::de::DeserializeOwned;

use crate::data::DemoData;
use crate::host::{EPG_TAG_INVALID_SERIES_EPISODE, TimerState};
use crate::types::{Channel, ChannelGroup, EpgEntry, Recording, Timer};
use crate::util::clock_time_on_day;
use crate::xml::{
    DemoSections, RawChannel, RawChannelGroup, RawEpgEntry, RawRecording, RawTimer, SectionNode,
    parse_bool, parse_int,
};

/// Icon used for channels without an `<icon>` element.
pub const DEFAULT_ICON: &str =
    "http://www.royalty-free.tv/news/wp-content/uploads/2011/06/cc-logo1.jpg";

/// Name of the settings document inside the client directory.
pub const SETTINGS_FILE_NAME: &str = "PVRDemoAddonSettings.xml";

/// Expected root element.
const ROOT_TAG: &str = "demo";

/// Returns the settings file path for a client directory.
///
/// A separator is inserted only if `client_path` does not already end
/// with `/` or `\`.
#[must_use]
pub fn settings_file(client_path: &str) -> PathBuf {
    if client_path.is_empty() || client_path.ends_with('/') || client_path.ends_with('\\') {
        PathBuf::from(format!("{client_path}{SETTINGS_FILE_NAME}"))
    } else {
        PathBuf::from(format!("{client_path}/{SETTINGS_FILE_NAME}"))
    }
}

/// Failure that voids a whole document load.
#[derive(Debug)]
pub enum LoadError {
    /// The document could not be read.
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The document has no root element.
    MissingRoot,
    /// The root element is not `<demo>`.
    InvalidRoot(String),
    /// The document is not well-formed XML.
    Xml(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read demo data at '{}': {source}", path.display())
            }
            Self::MissingRoot => write!(f, "invalid demo data (no root element found)"),
            Self::InvalidRoot(name) => {
                write!(f, "invalid demo data (no <{ROOT_TAG}> tag found, got <{name}>)")
            }
            Self::Xml(message) => write!(f, "invalid demo data (malformed XML: {message})"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Loads [`DemoData`] from the XML settings document.
#[derive(Debug, Clone)]
pub struct DemoDataLoader {
    /// Prefix prepended to relative channel icons.
    base_path: String,
    /// Icon for channels without one.
    default_icon: String,
    /// Stream URL for channels and recordings without one.
    default_stream: String,
    /// Reference instant for "HH:MM" fields; `None` means the current time.
    now: Option<DateTime<Local>>,
}

/// Builder for `DemoDataLoader`.
#[derive(Debug, Default)]
pub struct DemoDataLoaderBuilder {
    base_path: Option<String>,
    default_icon: Option<String>,
    default_stream: Option<String>,
    now: Option<DateTime<Local>>,
}

impl DemoDataLoaderBuilder {
    /// Sets the prefix for relative channel icons (default: empty).
    #[must_use]
    pub fn base_path(mut self, path: impl Into<String>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Overrides the fallback channel icon (default: [`DEFAULT_ICON`]).
    #[must_use]
    pub fn default_icon(mut self, icon: impl Into<String>) -> Self {
        self.default_icon = Some(icon.into());
        self
    }

    /// Overrides the fallback stream URL (default: empty).
    #[must_use]
    pub fn default_stream(mut self, url: impl Into<String>) -> Self {
        self.default_stream = Some(url.into());
        self
    }

    /// Pins the reference instant used to resolve "HH:MM" fields.
    #[must_use]
    pub const fn now(mut self, now: DateTime<Local>) -> Self {
        self.now = Some(now);
        self
    }

    /// Builds the loader.
    #[must_use]
    pub fn build(self) -> DemoDataLoader {
        DemoDataLoader {
            base_path: self.base_path.unwrap_or_default(),
            default_icon: self
                .default_icon
                .unwrap_or_else(|| String::from(DEFAULT_ICON)),
            default_stream: self.default_stream.unwrap_or_default(),
            now: self.now,
        }
    }
}

impl Default for DemoDataLoader {
    fn default() -> Self {
        DemoDataLoaderBuilder::default().build()
    }
}

impl DemoDataLoader {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> DemoDataLoaderBuilder {
        DemoDataLoaderBuilder::default()
    }

    /// Reads and loads the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Read` if the file cannot be read, otherwise the
    /// errors of [`DemoDataLoader::load_str`].
    pub fn load_file(&self, path: &Path) -> Result<DemoData, LoadError> {
        let xml = std::fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&xml)
    }

    /// Loads a document from text.
    ///
    /// Sections are read in dependency order: channels, channel groups,
    /// EPG, recordings, deleted recordings, timers. Each record is parsed
    /// on its own; records that are malformed or miss a required field are
    /// skipped. Every child node of the channel, group and recording
    /// sections consumes an id, skipped or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the document has no root, the root is not
    /// `<demo>`, or the XML is malformed.
    pub fn load_str(&self, xml: &str) -> Result<DemoData, LoadError> {
        let sections = read_sections(xml)?;
        let now = self.now.unwrap_or_else(Local::now);

        let mut data = DemoData::new();

        let mut unique_id: i32 = 0;
        for node in &sections.channels {
            unique_id = unique_id.saturating_add(1);
            if let Some(channel) = parse_record::<RawChannel>(node, "channel")
                .and_then(|raw| self.scan_channel(&raw, unique_id))
            {
                data.channels.push(channel);
            }
        }

        let mut group_id: i32 = 0;
        for node in &sections.channel_groups {
            group_id = group_id.saturating_add(1);
            if let Some(group) = parse_record::<RawChannelGroup>(node, "group")
                .and_then(|raw| scan_channel_group(raw, group_id))
            {
                data.groups.push(group);
            }
        }

        let mut epg_loaded: usize = 0;
        for node in &sections.epg {
            if let Some(raw) = parse_record::<RawEpgEntry>(node, "entry")
                && scan_epg_entry(&mut data, &raw)
            {
                epg_loaded = epg_loaded.saturating_add(1);
            }
        }

        // Recording ids run on across both recording sections.
        let mut recording_id: i32 = 0;
        for node in &sections.recordings {
            recording_id = recording_id.saturating_add(1);
            if let Some(recording) = parse_record::<RawRecording>(node, "recording")
                .and_then(|raw| self.scan_recording(&raw, recording_id, &now))
            {
                data.recordings.push(recording);
            }
        }
        for node in &sections.recordings_deleted {
            recording_id = recording_id.saturating_add(1);
            if let Some(recording) = parse_record::<RawRecording>(node, "recording")
                .and_then(|raw| self.scan_recording(&raw, recording_id, &now))
            {
                data.recordings_deleted.push(recording);
            }
        }

        for node in &sections.timers {
            if let Some(timer) = parse_record::<RawTimer>(node, "timer")
                .and_then(|raw| scan_timer(&data, &raw, &now))
            {
                data.timers.push(timer);
            }
        }

        tracing::info!(
            channels = data.channels.len(),
            groups = data.groups.len(),
            epg_entries = epg_loaded,
            recordings = data.recordings.len(),
            deleted_recordings = data.recordings_deleted.len(),
            timers = data.timers.len(),
            "demo data loaded"
        );

        Ok(data)
    }

    fn scan_channel(&self, raw: &RawChannel, unique_id: i32) -> Option<Channel> {
        let Some(name) = raw.name.as_deref() else {
            tracing::debug!(unique_id, "skipping channel without name");
            return None;
        };

        Some(Channel {
            unique_id,
            is_radio: bool_field(raw.radio.as_deref(), "radio").unwrap_or(false),
            name: String::from(name),
            number: int_field(raw.number.as_deref(), "number").unwrap_or(unique_id),
            sub_number: int_field(raw.subnumber.as_deref(), "subnumber").unwrap_or(0),
            encryption_system: int_field(raw.encryption.as_deref(), "encryption").unwrap_or(0),
            icon_path: raw.icon.as_deref().map_or_else(
                || self.default_icon.clone(),
                |icon| format!("{}{icon}", self.base_path),
            ),
            stream_url: raw
                .stream
                .clone()
                .unwrap_or_else(|| self.default_stream.clone()),
            epg: Vec::new(),
        })
    }

    fn scan_recording(
        &self,
        raw: &RawRecording,
        recording_id: i32,
        now: &DateTime<Local>,
    ) -> Option<Recording> {
        let Some(title) = raw.title.as_deref() else {
            tracing::debug!(recording_id, "skipping recording without title");
            return None;
        };

        let recording_time = raw.time.as_deref().map_or(0, |value| {
            clock_time_on_day(value, now, 1).unwrap_or_else(|| {
                tracing::debug!(value, "ignoring invalid recording time");
                0
            })
        });

        Some(Recording {
            recording_id: recording_id.to_string(),
            title: String::from(title),
            plot: raw.plot.clone().unwrap_or_default(),
            plot_outline: raw.plotoutline.clone().unwrap_or_default(),
            episode_name: raw.episodetitle.clone().unwrap_or_default(),
            directory: raw.directory.clone().unwrap_or_default(),
            channel_name: raw.channelname.clone().unwrap_or_default(),
            is_radio: bool_field(raw.radio.as_deref(), "radio").unwrap_or(false),
            genre_type: int_field(raw.genretype.as_deref(), "genretype").unwrap_or(0),
            genre_sub_type: int_field(raw.genresubtype.as_deref(), "genresubtype").unwrap_or(0),
            duration: int_field(raw.duration.as_deref(), "duration").unwrap_or(0),
            series_number: int_field(raw.series.as_deref(), "series").unwrap_or(0),
            episode_number: int_field(raw.episode.as_deref(), "episode").unwrap_or(0),
            stream_url: raw
                .url
                .clone()
                .unwrap_or_else(|| self.default_stream.clone()),
            recording_time,
        })
    }
}

fn xml_error(e: quick_xml::Error) -> LoadError {
    LoadError::Xml(e.to_string())
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// Checks the root element and collects the children of each section.
fn read_sections(xml: &str) -> Result<DemoSections, LoadError> {
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let name = tag_name(&e);
                if name != ROOT_TAG {
                    return Err(LoadError::InvalidRoot(name));
                }
                break;
            }
            Event::Empty(e) => {
                let name = tag_name(&e);
                if name != ROOT_TAG {
                    return Err(LoadError::InvalidRoot(name));
                }
                return Ok(DemoSections::default());
            }
            Event::Eof => return Err(LoadError::MissingRoot),
            _ => {}
        }
    }

    let mut sections = DemoSections::default();
    loop {
        match reader.read_event().map_err(xml_error)? {
            Event::Start(e) => {
                let nodes = read_section_children(&mut reader)?;
                sections.insert(&tag_name(&e), nodes);
            }
            Event::Empty(e) => sections.insert(&tag_name(&e), Vec::new()),
            Event::End(_) => return Ok(sections),
            Event::Eof => {
                return Err(LoadError::Xml(format!("unclosed <{ROOT_TAG}> element")));
            }
            _ => {}
        }
    }
}

/// Reads the children of the section just opened, up to its end tag.
///
/// Elements keep their raw markup. Comments, processing instructions,
/// CDATA and runs of non-blank text become [`SectionNode::Other`].
fn read_section_children(reader: &mut Reader<&[u8]>) -> Result<Vec<SectionNode>, LoadError> {
    let mut nodes = Vec::new();
    let mut in_text = false;

    loop {
        let event = reader.read_event().map_err(xml_error)?;
        match event {
            Event::Text(ref t) if t.iter().all(u8::is_ascii_whitespace) => continue,
            Event::Text(_) | Event::GeneralRef(_) => {
                in_text = true;
                continue;
            }
            _ => {}
        }
        if std::mem::take(&mut in_text) {
            nodes.push(SectionNode::Other);
        }

        match event {
            Event::Start(e) => {
                let tag = tag_name(&e);
                let inner = reader.read_text(e.name()).map_err(xml_error)?;
                nodes.push(SectionNode::element(&tag, &inner));
            }
            Event::Empty(e) => nodes.push(SectionNode::element(&tag_name(&e), "")),
            Event::Comment(_) | Event::CData(_) | Event::PI(_) => nodes.push(SectionNode::Other),
            Event::End(_) => return Ok(nodes),
            Event::Eof => return Err(LoadError::Xml(String::from("unclosed section element"))),
            _ => {}
        }
    }
}

/// Deserializes one section child as a record named `tag`.
///
/// Other nodes, foreign elements and records that fail to deserialize
/// yield `None`.
fn parse_record<T: DeserializeOwned>(node: &SectionNode, tag: &str) -> Option<T> {
    let SectionNode::Element { tag: name, document } = node else {
        return None;
    };
    if name != tag {
        tracing::debug!(element = name.as_str(), expected = tag, "skipping foreign element");
        return None;
    }
    match quick_xml::de::from_str(document) {
        Ok(raw) => Some(raw),
        Err(e) => {
            tracing::debug!(element = tag, "skipping malformed record: {e}");
            None
        }
    }
}

/// Parses an optional integer field; unparseable text counts as absent.
fn int_field<T: std::str::FromStr>(value: Option<&str>, field: &str) -> Option<T> {
    let value = value?;
    let parsed = parse_int(value);
    if parsed.is_none() {
        tracing::debug!(field, value, "ignoring non-integer value");
    }
    parsed
}

/// Parses an optional boolean field; unparseable text counts as absent.
fn bool_field(value: Option<&str>, field: &str) -> Option<bool> {
    let value = value?;
    let parsed = parse_bool(value);
    if parsed.is_none() {
        tracing::debug!(field, value, "ignoring non-boolean value");
    }
    parsed
}

fn scan_channel_group(raw: RawChannelGroup, group_id: i32) -> Option<ChannelGroup> {
    let Some(name) = raw.name else {
        tracing::debug!(group_id, "skipping channel group without name");
        return None;
    };

    let members = raw
        .members
        .map(|m| m.items)
        .unwrap_or_default()
        .iter()
        .filter_map(|member| int_field::<i32>(Some(member.as_str()), "member"))
        .filter(|&position| position > -1)
        .collect();

    Some(ChannelGroup {
        group_id,
        is_radio: bool_field(raw.radio.as_deref(), "radio").unwrap_or(false),
        name,
        position: int_field(raw.position.as_deref(), "position").unwrap_or(0),
        members,
    })
}

/// Loads one EPG entry into its channel. Returns `false` if skipped.
fn scan_epg_entry(data: &mut DemoData, raw: &RawEpgEntry) -> bool {
    let (Some(broadcast_id), Some(position), Some(title), Some(start), Some(end)) = (
        int_field::<i32>(raw.broadcastid.as_deref(), "broadcastid"),
        int_field::<i32>(raw.channelid.as_deref(), "channelid"),
        raw.title.as_deref(),
        int_field::<i64>(raw.start.as_deref(), "start"),
        int_field::<i64>(raw.end.as_deref(), "end"),
    ) else {
        tracing::debug!("skipping EPG entry with missing required field");
        return false;
    };

    let Some(channel) = data.channel_by_position_mut(position) else {
        tracing::warn!(
            channelid = position,
            title,
            "skipping EPG entry referencing unknown channel"
        );
        return false;
    };

    let entry = EpgEntry {
        broadcast_id,
        channel_id: channel.unique_id,
        title: String::from(title),
        plot: raw.plot.clone().unwrap_or_default(),
        plot_outline: raw.plotoutline.clone().unwrap_or_default(),
        icon_path: raw.icon.clone().unwrap_or_default(),
        series_number: int_field(raw.series.as_deref(), "series")
            .unwrap_or(EPG_TAG_INVALID_SERIES_EPISODE),
        episode_number: int_field(raw.episode.as_deref(), "episode")
            .unwrap_or(EPG_TAG_INVALID_SERIES_EPISODE),
        episode_name: raw.episodetitle.clone().unwrap_or_default(),
        genre_type: int_field(raw.genretype.as_deref(), "genretype").unwrap_or(0),
        genre_sub_type: int_field(raw.genresubtype.as_deref(), "genresubtype").unwrap_or(0),
        start,
        end,
    };

    tracing::debug!(
        "loaded EPG entry '{}' channel '{}' start '{}' end '{}'",
        entry.title,
        entry.channel_id,
        entry.start,
        entry.end
    );

    channel.epg.push(entry);
    true
}

fn scan_timer(data: &DemoData, raw: &RawTimer, now: &DateTime<Local>) -> Option<Timer> {
    let position = int_field::<i32>(raw.channelid.as_deref(), "channelid")?;
    let Some(channel) = data.channel_by_position(position) else {
        tracing::warn!(
            channelid = position,
            "skipping timer referencing unknown channel"
        );
        return None;
    };

    let (Some(title), Some(summary)) = (raw.title.as_deref(), raw.summary.as_deref()) else {
        tracing::debug!("skipping timer without title or summary");
        return None;
    };

    let today = |value: Option<&str>| {
        value
            .and_then(|v| clock_time_on_day(v, now, 0))
            .unwrap_or(0)
    };

    let timer = Timer {
        channel_uid: channel.unique_id,
        state: int_field(raw.state.as_deref(), "state").map_or(TimerState::New, TimerState::from_raw),
        title: String::from(title),
        summary: String::from(summary),
        start_time: today(raw.starttime.as_deref()),
        end_time: today(raw.endtime.as_deref()),
    };

    tracing::debug!(
        "loaded timer '{}' channel '{}' start '{}' end '{}'",
        timer.title,
        timer.channel_uid,
        timer.start_time,
        timer.end_time
    );

    Some(timer)
}
