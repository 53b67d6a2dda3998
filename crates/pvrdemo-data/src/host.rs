//! Host-facing transfer records and callback contract.
//!
//! The host exchanges records through fixed-size text fields. Every text
//! value crossing this boundary is wrapped in a [`BoundedString`] so that it
//! never exceeds the capacity the host declares for that field.

use std::fmt;

use serde::Serialize;

/// Capacity of name fields (titles, channel and group names, ids).
pub const PVR_ADDON_NAME_STRING_LENGTH: usize = 1024;
/// Capacity of URL and path fields.
pub const PVR_ADDON_URL_STRING_LENGTH: usize = 1024;
/// Capacity of description fields (plot, plot outline, summary).
pub const PVR_ADDON_DESC_STRING_LENGTH: usize = 1024;
/// Capacity of the channel input format field.
pub const PVR_ADDON_INPUT_FORMAT_STRING_LENGTH: usize = 32;

/// Series/episode sentinel for EPG tags.
pub const EPG_TAG_INVALID_SERIES_EPISODE: i32 = -1;
/// EPG tag flags value meaning "no flags".
pub const EPG_TAG_FLAG_UNDEFINED: u32 = 0;
/// Channel uid meaning "no channel".
pub const PVR_CHANNEL_INVALID_UID: i32 = -1;
/// Reserved timer client index; real indices start above it.
pub const PVR_TIMER_NO_CLIENT_INDEX: u32 = 0;
/// Timer type meaning "not typed".
pub const PVR_TIMER_TYPE_NONE: u32 = 0;

/// Stream property name carrying the stream URL.
pub const PVR_STREAM_PROPERTY_STREAMURL: &str = "streamurl";
/// Stream property name flagging a realtime stream.
pub const PVR_STREAM_PROPERTY_ISREALTIMESTREAM: &str = "isrealtimestream";

/// Returns the longest prefix of `value` that fits a C field of `capacity`
/// bytes (one byte is reserved for the terminator) without splitting a
/// UTF-8 character.
#[must_use]
pub fn truncate_to_capacity(value: &str, capacity: usize) -> &str {
    let max = capacity.saturating_sub(1);
    if value.len() <= max {
        return value;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    value.get(..end).unwrap_or_default()
}

/// Text value limited to `N - 1` bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BoundedString<const N: usize>(String);

impl<const N: usize> BoundedString<N> {
    /// Declared capacity of the host field, terminator included.
    pub const CAPACITY: usize = N;

    /// Copies `value` into the field, truncating when it does not fit.
    #[must_use]
    pub fn new(value: &str) -> Self {
        Self(String::from(truncate_to_capacity(value, N)))
    }

    /// Returns the stored text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the field holds no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<&str> for BoundedString<N> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> AsRef<str> for BoundedString<N> {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl<const N: usize> PartialEq<&str> for BoundedString<N> {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl<const N: usize> fmt::Display for BoundedString<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name-sized text field.
pub type NameString = BoundedString<PVR_ADDON_NAME_STRING_LENGTH>;
/// URL-sized text field.
pub type UrlString = BoundedString<PVR_ADDON_URL_STRING_LENGTH>;
/// Description-sized text field.
pub type DescString = BoundedString<PVR_ADDON_DESC_STRING_LENGTH>;
/// Input-format text field.
pub type InputFormatString = BoundedString<PVR_ADDON_INPUT_FORMAT_STRING_LENGTH>;

/// Result codes returned to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PvrError {
    /// Success.
    NoError,
    /// Unspecified failure.
    Unknown,
    /// Operation is not implemented by this backend.
    NotImplemented,
    /// Backend is not available.
    ServerError,
    /// Backend timed out.
    ServerTimeout,
    /// Backend rejected the command.
    RejectedByBackend,
    /// Item already exists.
    AlreadyPresent,
    /// Invalid arguments.
    InvalidParameters,
    /// A recording is in progress.
    RecordingRunning,
    /// Command failed.
    Failed,
}

impl PvrError {
    /// Returns `true` for [`PvrError::NoError`].
    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::NoError)
    }
}

impl fmt::Display for PvrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::NoError => "no error",
            Self::Unknown => "unknown error",
            Self::NotImplemented => "not implemented",
            Self::ServerError => "server error",
            Self::ServerTimeout => "server timeout",
            Self::RejectedByBackend => "rejected by backend",
            Self::AlreadyPresent => "already present",
            Self::InvalidParameters => "invalid parameters",
            Self::RecordingRunning => "recording running",
            Self::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Add-on lifecycle status reported to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddonStatus {
    /// Running normally.
    Ok,
    /// Not created yet, or destroyed.
    #[default]
    Unknown,
    /// Settings are missing.
    NeedSettings,
    /// Creation failed for good.
    PermanentFailure,
}

/// Timer state as defined by the host contract.
///
/// Raw values outside the known set are kept in [`TimerState::Other`] so
/// they reach the host unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    /// Freshly created.
    #[default]
    New,
    /// Scheduled.
    Scheduled,
    /// Recording now.
    Recording,
    /// Finished.
    Completed,
    /// Aborted while recording.
    Aborted,
    /// Cancelled by the user.
    Cancelled,
    /// Conflicts with another timer, will still record.
    ConflictOk,
    /// Conflicts with another timer, will not record.
    ConflictNok,
    /// Error state.
    Error,
    /// Disabled by the user.
    Disabled,
    /// Unknown raw value.
    Other(i32),
}

impl TimerState {
    /// Maps a raw host integer to a state.
    #[must_use]
    pub const fn from_raw(raw: i32) -> Self {
        match raw {
            0 => Self::New,
            1 => Self::Scheduled,
            2 => Self::Recording,
            3 => Self::Completed,
            4 => Self::Aborted,
            5 => Self::Cancelled,
            6 => Self::ConflictOk,
            7 => Self::ConflictNok,
            8 => Self::Error,
            9 => Self::Disabled,
            other => Self::Other(other),
        }
    }

    /// Returns the raw host integer.
    #[must_use]
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::New => 0,
            Self::Scheduled => 1,
            Self::Recording => 2,
            Self::Completed => 3,
            Self::Aborted => 4,
            Self::Cancelled => 5,
            Self::ConflictOk => 6,
            Self::ConflictNok => 7,
            Self::Error => 8,
            Self::Disabled => 9,
            Self::Other(raw) => raw,
        }
    }
}

/// Channel type of a recording.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingChannelType {
    /// Unknown.
    #[default]
    Unknown,
    /// Television.
    Tv,
    /// Radio.
    Radio,
}

/// Channel record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PvrChannel {
    /// Unique channel id.
    pub unique_id: i32,
    /// Radio channel.
    pub is_radio: bool,
    /// Channel number.
    pub channel_number: i32,
    /// Sub channel number.
    pub sub_channel_number: i32,
    /// Display name.
    pub channel_name: NameString,
    /// Input format (unused, always empty).
    pub input_format: InputFormatString,
    /// Conditional access system id, 0 for free-to-air.
    pub encryption_system: i32,
    /// Icon path.
    pub icon_path: UrlString,
    /// Hidden from the channel list.
    pub is_hidden: bool,
}

/// Channel group record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PvrChannelGroup {
    /// Group name.
    pub group_name: NameString,
    /// Radio group.
    pub is_radio: bool,
    /// Sort position.
    pub position: i32,
}

/// Channel group membership record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PvrChannelGroupMember {
    /// Group name.
    pub group_name: NameString,
    /// Unique id of the member channel.
    pub channel_unique_id: i32,
    /// Member channel number.
    pub channel_number: i32,
    /// Member sub channel number.
    pub sub_channel_number: i32,
}

/// EPG tag.
///
/// The host reads tag text through pointers rather than fixed arrays, so
/// these fields are not bounded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EpgTag {
    /// Broadcast id, unique within one synthesized schedule.
    pub unique_broadcast_id: i32,
    /// Owning channel uid.
    pub unique_channel_id: i32,
    /// Title.
    pub title: String,
    /// Start (unix seconds).
    pub start_time: i64,
    /// End (unix seconds).
    pub end_time: i64,
    /// Plot outline.
    pub plot_outline: String,
    /// Plot.
    pub plot: String,
    /// Icon path.
    pub icon_path: String,
    /// Genre type.
    pub genre_type: i32,
    /// Genre sub type.
    pub genre_sub_type: i32,
    /// Tag flags.
    pub flags: u32,
    /// Series number or [`EPG_TAG_INVALID_SERIES_EPISODE`].
    pub series_number: i32,
    /// Episode number or [`EPG_TAG_INVALID_SERIES_EPISODE`].
    pub episode_number: i32,
    /// Episode part number or [`EPG_TAG_INVALID_SERIES_EPISODE`].
    pub episode_part_number: i32,
    /// Episode name.
    pub episode_name: String,
    /// First aired date.
    pub first_aired: String,
}

/// Recording record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PvrRecording {
    /// Recording id.
    pub recording_id: NameString,
    /// Title.
    pub title: NameString,
    /// Episode name.
    pub episode_name: NameString,
    /// Series number.
    pub series_number: i32,
    /// Episode number.
    pub episode_number: i32,
    /// Directory.
    pub directory: UrlString,
    /// Plot outline.
    pub plot_outline: DescString,
    /// Plot.
    pub plot: DescString,
    /// Channel name.
    pub channel_name: NameString,
    /// Start of the recording (unix seconds).
    pub recording_time: i64,
    /// Duration in seconds.
    pub duration: i32,
    /// Genre type.
    pub genre_type: i32,
    /// Genre sub type.
    pub genre_sub_type: i32,
    /// In the trash.
    pub is_deleted: bool,
    /// Channel type.
    pub channel_type: RecordingChannelType,
    /// Channel uid, [`PVR_CHANNEL_INVALID_UID`] when unknown.
    pub channel_uid: i32,
}

/// Timer record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PvrTimer {
    /// Index assigned by the backend.
    pub client_index: u32,
    /// Channel uid.
    pub client_channel_uid: i32,
    /// Start (unix seconds).
    pub start_time: i64,
    /// End (unix seconds).
    pub end_time: i64,
    /// State.
    pub state: TimerState,
    /// Timer type.
    pub timer_type: u32,
    /// Title.
    pub title: NameString,
    /// Summary.
    pub summary: DescString,
}

/// Named stream property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamedValue {
    /// Property name.
    pub name: NameString,
    /// Property value.
    pub value: UrlString,
}

impl NamedValue {
    /// Builds a property from plain strings.
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: NameString::new(name),
            value: UrlString::new(value),
        }
    }
}

/// Signal status of the (virtual) tuner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SignalStatus {
    /// Adapter name.
    pub adapter_name: NameString,
    /// Adapter status.
    pub adapter_status: NameString,
}

/// Disk space reported to the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DriveSpace {
    /// Total space.
    pub total: i64,
    /// Used space.
    pub used: i64,
}

/// Host-side receiver of transferred records.
pub trait TransferSink {
    /// Receives one channel.
    fn transfer_channel(&mut self, channel: PvrChannel);

    /// Receives one channel group.
    fn transfer_channel_group(&mut self, group: PvrChannelGroup);

    /// Receives one channel group member.
    fn transfer_channel_group_member(&mut self, member: PvrChannelGroupMember);

    /// Receives one EPG tag.
    fn transfer_epg_entry(&mut self, tag: EpgTag);

    /// Receives one recording.
    fn transfer_recording(&mut self, recording: PvrRecording);

    /// Receives one timer.
    fn transfer_timer(&mut self, timer: PvrTimer);
}

/// Sink that keeps every transferred record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CollectingSink {
    /// Transferred channels.
    pub channels: Vec<PvrChannel>,
    /// Transferred channel groups.
    pub channel_groups: Vec<PvrChannelGroup>,
    /// Transferred group members.
    pub channel_group_members: Vec<PvrChannelGroupMember>,
    /// Transferred EPG tags.
    pub epg_entries: Vec<EpgTag>,
    /// Transferred recordings.
    pub recordings: Vec<PvrRecording>,
    /// Transferred timers.
    pub timers: Vec<PvrTimer>,
}

impl CollectingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransferSink for CollectingSink {
    fn transfer_channel(&mut self, channel: PvrChannel) {
        self.channels.push(channel);
    }

    fn transfer_channel_group(&mut self, group: PvrChannelGroup) {
        self.channel_groups.push(group);
    }

    fn transfer_channel_group_member(&mut self, member: PvrChannelGroupMember) {
        self.channel_group_members.push(member);
    }

    fn transfer_epg_entry(&mut self, tag: EpgTag) {
        self.epg_entries.push(tag);
    }

    fn transfer_recording(&mut self, recording: PvrRecording) {
        self.recordings.push(recording);
    }

    fn transfer_timer(&mut self, timer: PvrTimer) {
        self.timers.push(timer);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_truncate_short_value_unchanged() {
        // Arrange & Act
        let result = truncate_to_capacity("BBC One", 32);

        // Assert
        assert_eq!(result, "BBC One");
    }

    #[test]
    fn test_truncate_reserves_terminator() {
        // Arrange & Act
        let result = truncate_to_capacity("abcdef", 4);

        // Assert
        assert_eq!(result, "abc");
    }

    #[test]
    fn test_truncate_does_not_split_multibyte_char() {
        // Arrange: "日本" is 6 bytes, capacity 6 leaves room for 5
        let value = "日本";

        // Act
        let result = truncate_to_capacity(value, 6);

        // Assert
        assert_eq!(result, "日");
    }

    #[test]
    fn test_truncate_zero_capacity() {
        // Arrange & Act
        let result = truncate_to_capacity("abc", 0);

        // Assert
        assert_eq!(result, "");
    }

    #[test]
    fn test_bounded_string_respects_capacity() {
        // Arrange
        let long = "x".repeat(PVR_ADDON_INPUT_FORMAT_STRING_LENGTH * 2);

        // Act
        let field = InputFormatString::new(&long);

        // Assert
        assert_eq!(field.as_str().len(), PVR_ADDON_INPUT_FORMAT_STRING_LENGTH - 1);
        assert_eq!(InputFormatString::CAPACITY, 32);
    }

    #[test]
    fn test_timer_state_raw_mapping() {
        // Arrange & Act & Assert
        assert_eq!(TimerState::from_raw(1), TimerState::Scheduled);
        assert_eq!(TimerState::from_raw(8), TimerState::Error);
        assert_eq!(TimerState::from_raw(42), TimerState::Other(42));
        assert_eq!(TimerState::Other(42).as_raw(), 42);
        assert_eq!(TimerState::Cancelled.as_raw(), 5);
    }

    #[test]
    fn test_collecting_sink_keeps_order() {
        // Arrange
        let mut sink = CollectingSink::new();

        // Act
        sink.transfer_timer(PvrTimer {
            client_index: 1,
            ..PvrTimer::default()
        });
        sink.transfer_timer(PvrTimer {
            client_index: 2,
            ..PvrTimer::default()
        });

        // Assert
        let indices: Vec<u32> = sink.timers.iter().map(|t| t.client_index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn test_pvr_error_display() {
        // Arrange & Act & Assert
        assert_eq!(PvrError::ServerError.to_string(), "server error");
        assert!(PvrError::NoError.is_ok());
        assert!(!PvrError::InvalidParameters.is_ok());
    }
}
