//! Records held by the data store.

use crate::host::TimerState;

/// A channel and its EPG template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channel {
    /// Unique id (1-based load sequence).
    pub unique_id: i32,
    /// Radio channel.
    pub is_radio: bool,
    /// Display name.
    pub name: String,
    /// Channel number.
    pub number: i32,
    /// Sub channel number.
    pub sub_number: i32,
    /// Conditional access system id, 0 for none.
    pub encryption_system: i32,
    /// Icon path or URL.
    pub icon_path: String,
    /// Live stream URL.
    pub stream_url: String,
    /// EPG entries with offsets relative to the schedule origin.
    pub epg: Vec<EpgEntry>,
}

/// A channel group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelGroup {
    /// Group id (1-based load sequence).
    pub group_id: i32,
    /// Radio group.
    pub is_radio: bool,
    /// Group name.
    pub name: String,
    /// Sort position.
    pub position: i32,
    /// 1-based channel positions. May point past the channel list.
    pub members: Vec<i32>,
}

/// A program template entry of a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpgEntry {
    /// Broadcast id before replay bias.
    pub broadcast_id: i32,
    /// Unique id of the owning channel.
    pub channel_id: i32,
    /// Title.
    pub title: String,
    /// Plot.
    pub plot: String,
    /// Plot outline.
    pub plot_outline: String,
    /// Icon path.
    pub icon_path: String,
    /// Series number, sentinel when unset.
    pub series_number: i32,
    /// Episode number, sentinel when unset.
    pub episode_number: i32,
    /// Episode title.
    pub episode_name: String,
    /// Genre type.
    pub genre_type: i32,
    /// Genre sub type.
    pub genre_sub_type: i32,
    /// Start offset in seconds.
    pub start: i64,
    /// End offset in seconds.
    pub end: i64,
}

/// A recording.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recording {
    /// Recording id (load sequence rendered as text).
    pub recording_id: String,
    /// Title.
    pub title: String,
    /// Plot.
    pub plot: String,
    /// Plot outline.
    pub plot_outline: String,
    /// Episode title.
    pub episode_name: String,
    /// Directory.
    pub directory: String,
    /// Channel name (free text).
    pub channel_name: String,
    /// Recorded from a radio channel.
    pub is_radio: bool,
    /// Genre type.
    pub genre_type: i32,
    /// Genre sub type.
    pub genre_sub_type: i32,
    /// Duration in seconds.
    pub duration: i32,
    /// Series number.
    pub series_number: i32,
    /// Episode number.
    pub episode_number: i32,
    /// Stream URL.
    pub stream_url: String,
    /// Recording start (unix seconds), 0 when unknown.
    pub recording_time: i64,
}

/// A timer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timer {
    /// Unique id of the target channel.
    pub channel_uid: i32,
    /// State.
    pub state: TimerState,
    /// Title.
    pub title: String,
    /// Summary.
    pub summary: String,
    /// Start (unix seconds), 0 when unknown.
    pub start_time: i64,
    /// End (unix seconds), 0 when unknown.
    pub end_time: i64,
}
