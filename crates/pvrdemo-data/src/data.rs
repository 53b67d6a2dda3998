//! Loaded data store and its query façade.

use crate::host::{
    EPG_TAG_FLAG_UNDEFINED, EPG_TAG_INVALID_SERIES_EPISODE, EpgTag, InputFormatString,
    NameString, PVR_CHANNEL_INVALID_UID, PVR_TIMER_NO_CLIENT_INDEX, PVR_TIMER_TYPE_NONE,
    PvrChannel, PvrChannelGroup, PvrChannelGroupMember, PvrRecording, PvrTimer,
    RecordingChannelType, TransferSink, UrlString,
};
use crate::types::{Channel, ChannelGroup, EpgEntry, Recording, Timer};

/// Converts a 1-based channel position into a vector index.
fn position_to_index(position: i32) -> Option<usize> {
    usize::try_from(position.checked_sub(1)?).ok()
}

/// Converts a collection length into a host count.
fn amount(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

/// In-memory demo data.
///
/// Built once by [`crate::DemoDataLoader`]; the only state that changes
/// afterwards is the EPG epoch, which latches on the first EPG query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemoData {
    pub(crate) channels: Vec<Channel>,
    pub(crate) groups: Vec<ChannelGroup>,
    pub(crate) recordings: Vec<Recording>,
    pub(crate) recordings_deleted: Vec<Recording>,
    pub(crate) timers: Vec<Timer>,
    epg_epoch: Option<i64>,
}

impl DemoData {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All channels in load order.
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// All channel groups in load order.
    #[must_use]
    pub fn channel_groups(&self) -> &[ChannelGroup] {
        &self.groups
    }

    /// Recordings, or deleted recordings when `deleted` is set.
    #[must_use]
    pub fn recordings(&self, deleted: bool) -> &[Recording] {
        if deleted {
            &self.recordings_deleted
        } else {
            &self.recordings
        }
    }

    /// All timers in load order.
    #[must_use]
    pub fn timers(&self) -> &[Timer] {
        &self.timers
    }

    /// The latched EPG epoch, if an EPG query has run.
    #[must_use]
    pub const fn epg_epoch(&self) -> Option<i64> {
        self.epg_epoch
    }

    /// Forgets the EPG epoch; the next EPG query latches a new one.
    pub const fn reset_epg_epoch(&mut self) {
        self.epg_epoch = None;
    }

    /// Looks up a channel by its 1-based position in the channel list.
    ///
    /// This is how group members and EPG/timer back-references address
    /// channels. Positions outside `1..=len` yield `None`.
    #[must_use]
    pub fn channel_by_position(&self, position: i32) -> Option<&Channel> {
        self.channels.get(position_to_index(position)?)
    }

    pub(crate) fn channel_by_position_mut(&mut self, position: i32) -> Option<&mut Channel> {
        self.channels.get_mut(position_to_index(position)?)
    }

    /// Finds the first channel with the given unique id.
    #[must_use]
    pub fn find_channel_by_uid(&self, unique_id: i32) -> Option<&Channel> {
        self.channels.iter().find(|c| c.unique_id == unique_id)
    }

    /// Number of channels.
    #[must_use]
    pub fn channels_amount(&self) -> i32 {
        amount(self.channels.len())
    }

    /// Transfers all channels whose radio flag equals `radio`.
    pub fn get_channels(&self, sink: &mut impl TransferSink, radio: bool) {
        for channel in self.channels.iter().filter(|c| c.is_radio == radio) {
            sink.transfer_channel(to_pvr_channel(channel));
        }
    }

    /// Number of channel groups.
    #[must_use]
    pub fn channel_groups_amount(&self) -> i32 {
        amount(self.groups.len())
    }

    /// Transfers all channel groups whose radio flag equals `radio`.
    pub fn get_channel_groups(&self, sink: &mut impl TransferSink, radio: bool) {
        for group in self.groups.iter().filter(|g| g.is_radio == radio) {
            sink.transfer_channel_group(PvrChannelGroup {
                group_name: NameString::new(&group.name),
                is_radio: radio,
                position: group.position,
            });
        }
    }

    /// Transfers the members of every group named `group_name`.
    ///
    /// Members that do not resolve to a channel are skipped.
    pub fn get_channel_group_members(&self, sink: &mut impl TransferSink, group_name: &str) {
        for group in self.groups.iter().filter(|g| g.name == group_name) {
            for &position in &group.members {
                let Some(channel) = self.channel_by_position(position) else {
                    tracing::debug!(
                        group = %group.name,
                        position,
                        "skipping group member without channel"
                    );
                    continue;
                };
                sink.transfer_channel_group_member(PvrChannelGroupMember {
                    group_name: NameString::new(group_name),
                    channel_unique_id: channel.unique_id,
                    channel_number: channel.number,
                    sub_channel_number: channel.sub_number,
                });
            }
        }
    }

    /// Transfers a synthesized EPG for `channel_uid` covering `[start, end)`.
    ///
    /// The first call on this store latches the epoch to `start`. The
    /// channel's entries are replayed back to back from `epoch + 1`; every
    /// replay shifts times by the previous replay's end and raises broadcast
    /// ids by the number of entries, until the window end is reached.
    pub fn get_epg_for_channel(
        &mut self,
        sink: &mut impl TransferSink,
        channel_uid: i32,
        start: i64,
        end: i64,
    ) {
        let epoch = *self.epg_epoch.get_or_insert(start);

        let Some(channel) = self.find_channel_by_uid(channel_uid) else {
            tracing::debug!(channel_uid, "EPG requested for unknown channel");
            return;
        };
        if channel.epg.is_empty() {
            return;
        }

        let entry_count = amount(channel.epg.len());
        let mut last_end = epoch.saturating_add(1);
        let mut broadcast_bias: i32 = 0;

        while last_end < end {
            let mut replay_end = last_end;
            for entry in &channel.epg {
                let tag = to_epg_tag(entry, channel_uid, last_end, broadcast_bias);
                replay_end = tag.end_time;
                sink.transfer_epg_entry(tag);
            }

            // A template ending at or before its own offset would never advance.
            if replay_end <= last_end {
                tracing::warn!(
                    channel_uid,
                    offset = last_end,
                    "EPG template does not advance time, stopping replay"
                );
                break;
            }
            last_end = replay_end;
            broadcast_bias = broadcast_bias.saturating_add(entry_count);
        }
    }

    /// Number of recordings, or deleted recordings when `deleted` is set.
    #[must_use]
    pub fn recordings_amount(&self, deleted: bool) -> i32 {
        amount(self.recordings(deleted).len())
    }

    /// Transfers recordings, or deleted recordings when `deleted` is set.
    pub fn get_recordings(&self, sink: &mut impl TransferSink, deleted: bool) {
        for recording in self.recordings(deleted) {
            sink.transfer_recording(to_pvr_recording(recording, deleted));
        }
    }

    /// Returns the stream URL of a (non-deleted) recording, or `""`.
    #[must_use]
    pub fn recording_stream_url(&self, recording_id: &str) -> &str {
        self.recordings
            .iter()
            .find(|r| r.recording_id == recording_id)
            .map_or("", |r| r.stream_url.as_str())
    }

    /// Number of timers.
    #[must_use]
    pub fn timers_amount(&self) -> i32 {
        amount(self.timers.len())
    }

    /// Transfers all timers with sequential client indices.
    pub fn get_timers(&self, sink: &mut impl TransferSink) {
        let mut client_index = PVR_TIMER_NO_CLIENT_INDEX;
        for timer in &self.timers {
            client_index = client_index.saturating_add(1);
            sink.transfer_timer(PvrTimer {
                client_index,
                client_channel_uid: timer.channel_uid,
                start_time: timer.start_time,
                end_time: timer.end_time,
                state: timer.state,
                timer_type: PVR_TIMER_TYPE_NONE,
                title: NameString::new(&timer.title),
                summary: timer.summary.as_str().into(),
            });
        }
    }
}

/// Converts a `Channel` to a host `PvrChannel`.
fn to_pvr_channel(channel: &Channel) -> PvrChannel {
    PvrChannel {
        unique_id: channel.unique_id,
        is_radio: channel.is_radio,
        channel_number: channel.number,
        sub_channel_number: channel.sub_number,
        channel_name: NameString::new(&channel.name),
        input_format: InputFormatString::default(),
        encryption_system: channel.encryption_system,
        icon_path: UrlString::new(&channel.icon_path),
        is_hidden: false,
    }
}

/// Converts an `EpgEntry` to a host `EpgTag` placed at `offset`.
fn to_epg_tag(entry: &EpgEntry, channel_uid: i32, offset: i64, broadcast_bias: i32) -> EpgTag {
    EpgTag {
        unique_broadcast_id: entry.broadcast_id.saturating_add(broadcast_bias),
        unique_channel_id: channel_uid,
        title: entry.title.clone(),
        start_time: entry.start.saturating_add(offset),
        end_time: entry.end.saturating_add(offset),
        plot_outline: entry.plot_outline.clone(),
        plot: entry.plot.clone(),
        icon_path: entry.icon_path.clone(),
        genre_type: entry.genre_type,
        genre_sub_type: entry.genre_sub_type,
        flags: EPG_TAG_FLAG_UNDEFINED,
        series_number: entry.series_number,
        episode_number: entry.episode_number,
        episode_part_number: EPG_TAG_INVALID_SERIES_EPISODE,
        episode_name: entry.episode_name.clone(),
        first_aired: String::new(),
    }
}

/// Converts a `Recording` to a host `PvrRecording`.
fn to_pvr_recording(recording: &Recording, deleted: bool) -> PvrRecording {
    PvrRecording {
        recording_id: NameString::new(&recording.recording_id),
        title: NameString::new(&recording.title),
        episode_name: NameString::new(&recording.episode_name),
        series_number: recording.series_number,
        episode_number: recording.episode_number,
        directory: UrlString::new(&recording.directory),
        plot_outline: recording.plot_outline.as_str().into(),
        plot: recording.plot.as_str().into(),
        channel_name: NameString::new(&recording.channel_name),
        recording_time: recording.recording_time,
        duration: recording.duration,
        genre_type: recording.genre_type,
        genre_sub_type: recording.genre_sub_type,
        is_deleted: deleted,
        channel_type: if recording.is_radio {
            RecordingChannelType::Radio
        } else {
            RecordingChannelType::Tv
        },
        channel_uid: PVR_CHANNEL_INVALID_UID,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::indexing_slicing)]

    use super::*;
    use crate::host::{CollectingSink, TimerState};

    fn channel(unique_id: i32, name: &str, radio: bool) -> Channel {
        Channel {
            unique_id,
            is_radio: radio,
            name: String::from(name),
            number: unique_id,
            icon_path: String::from("icon.png"),
            ..Channel::default()
        }
    }

    fn entry(broadcast_id: i32, start: i64, end: i64) -> EpgEntry {
        EpgEntry {
            broadcast_id,
            title: format!("Show {broadcast_id}"),
            series_number: EPG_TAG_INVALID_SERIES_EPISODE,
            episode_number: EPG_TAG_INVALID_SERIES_EPISODE,
            start,
            end,
            ..EpgEntry::default()
        }
    }

    fn sample_data() -> DemoData {
        let mut first = channel(1, "One", false);
        first.epg = vec![entry(10, 0, 100), entry(11, 100, 250)];
        DemoData {
            channels: vec![first, channel(2, "Two", false), channel(3, "Radio", true)],
            groups: vec![
                ChannelGroup {
                    group_id: 1,
                    name: String::from("All"),
                    position: 2,
                    members: vec![0, 1, 3, 4],
                    ..ChannelGroup::default()
                },
                ChannelGroup {
                    group_id: 2,
                    is_radio: true,
                    name: String::from("Radio"),
                    members: vec![3],
                    ..ChannelGroup::default()
                },
            ],
            recordings: vec![Recording {
                recording_id: String::from("1"),
                title: String::from("Rec"),
                stream_url: String::from("http://example.com/rec.ts"),
                ..Recording::default()
            }],
            recordings_deleted: vec![Recording {
                recording_id: String::from("2"),
                title: String::from("Gone"),
                is_radio: true,
                stream_url: String::from("http://example.com/gone.ts"),
                ..Recording::default()
            }],
            timers: vec![
                Timer {
                    channel_uid: 1,
                    state: TimerState::Scheduled,
                    title: String::from("T1"),
                    ..Timer::default()
                },
                Timer {
                    channel_uid: 2,
                    title: String::from("T2"),
                    ..Timer::default()
                },
            ],
            epg_epoch: None,
        }
    }

    #[test]
    fn test_channel_by_position_is_one_based() {
        // Arrange
        let data = sample_data();

        // Act & Assert
        assert_eq!(data.channel_by_position(1).unwrap().name, "One");
        assert_eq!(data.channel_by_position(3).unwrap().name, "Radio");
        assert!(data.channel_by_position(0).is_none());
        assert!(data.channel_by_position(-1).is_none());
        assert!(data.channel_by_position(4).is_none());
        assert!(data.channel_by_position(i32::MIN).is_none());
    }

    #[test]
    fn test_get_channels_filters_radio() {
        // Arrange
        let data = sample_data();
        let mut tv = CollectingSink::new();
        let mut radio = CollectingSink::new();

        // Act
        data.get_channels(&mut tv, false);
        data.get_channels(&mut radio, true);

        // Assert
        assert_eq!(tv.channels.len(), 2);
        assert_eq!(tv.channels[0].channel_name, "One");
        assert!(!tv.channels[0].is_hidden);
        assert_eq!(radio.channels.len(), 1);
        assert_eq!(radio.channels[0].unique_id, 3);
        assert_eq!(data.channels_amount(), 3);
    }

    #[test]
    fn test_get_channel_groups_filters_radio() {
        // Arrange
        let data = sample_data();
        let mut sink = CollectingSink::new();

        // Act
        data.get_channel_groups(&mut sink, false);

        // Assert
        assert_eq!(sink.channel_groups.len(), 1);
        assert_eq!(sink.channel_groups[0].group_name, "All");
        assert_eq!(sink.channel_groups[0].position, 2);
        assert_eq!(data.channel_groups_amount(), 2);
    }

    #[test]
    fn test_group_members_skip_unresolvable_positions() {
        // Arrange: members 0 and 4 do not resolve
        let data = sample_data();
        let mut sink = CollectingSink::new();

        // Act
        data.get_channel_group_members(&mut sink, "All");

        // Assert
        let uids: Vec<i32> = sink
            .channel_group_members
            .iter()
            .map(|m| m.channel_unique_id)
            .collect();
        assert_eq!(uids, vec![1, 3]);
        assert_eq!(sink.channel_group_members[0].group_name, "All");
    }

    #[test]
    fn test_group_members_unknown_group() {
        // Arrange
        let data = sample_data();
        let mut sink = CollectingSink::new();

        // Act
        data.get_channel_group_members(&mut sink, "Nope");

        // Assert
        assert!(sink.channel_group_members.is_empty());
    }

    #[test]
    fn test_epg_replays_template_with_bias() {
        // Arrange
        let mut data = sample_data();
        let mut sink = CollectingSink::new();
        let epoch = 1_000_000;

        // Act
        data.get_epg_for_channel(&mut sink, 1, epoch, epoch + 500);

        // Assert: two replays of two entries each
        let tags = &sink.epg_entries;
        assert_eq!(tags.len(), 4);
        assert_eq!(tags[0].unique_broadcast_id, 10);
        assert_eq!(tags[0].start_time, epoch + 1);
        assert_eq!(tags[1].end_time, epoch + 1 + 250);
        assert_eq!(tags[2].unique_broadcast_id, 10 + 2);
        assert_eq!(tags[2].start_time, epoch + 1 + 250);
        assert_eq!(tags[3].unique_broadcast_id, 11 + 2);
        assert_eq!(tags[3].end_time, epoch + 1 + 500);
        assert!(tags.iter().all(|t| t.unique_channel_id == 1));
        assert_eq!(tags[0].flags, EPG_TAG_FLAG_UNDEFINED);
        assert_eq!(tags[0].episode_part_number, EPG_TAG_INVALID_SERIES_EPISODE);
    }

    #[test]
    fn test_epg_epoch_latches_on_first_query() {
        // Arrange
        let mut data = sample_data();
        let mut first = CollectingSink::new();
        let mut second = CollectingSink::new();

        // Act
        data.get_epg_for_channel(&mut first, 1, 1_000, 1_100);
        data.get_epg_for_channel(&mut second, 1, 5_000, 5_100);

        // Assert: the second window still replays from the first epoch
        assert_eq!(data.epg_epoch(), Some(1_000));
        assert_eq!(second.epg_entries[0].start_time, 1_001);
        assert!(second.epg_entries.last().unwrap().end_time >= 5_100);
    }

    #[test]
    fn test_epg_epoch_latches_for_unknown_channel() {
        // Arrange
        let mut data = sample_data();
        let mut sink = CollectingSink::new();

        // Act
        data.get_epg_for_channel(&mut sink, 99, 42, 100);

        // Assert
        assert!(sink.epg_entries.is_empty());
        assert_eq!(data.epg_epoch(), Some(42));
    }

    #[test]
    fn test_reset_epg_epoch() {
        // Arrange
        let mut data = sample_data();
        let mut sink = CollectingSink::new();
        data.get_epg_for_channel(&mut sink, 1, 1_000, 1_100);

        // Act
        data.reset_epg_epoch();
        let mut after = CollectingSink::new();
        data.get_epg_for_channel(&mut after, 1, 9_000, 9_100);

        // Assert
        assert_eq!(data.epg_epoch(), Some(9_000));
        assert_eq!(after.epg_entries[0].start_time, 9_001);
    }

    #[test]
    fn test_epg_channel_without_entries() {
        // Arrange
        let mut data = sample_data();
        let mut sink = CollectingSink::new();

        // Act
        data.get_epg_for_channel(&mut sink, 2, 0, 10_000);

        // Assert
        assert!(sink.epg_entries.is_empty());
    }

    #[test]
    fn test_epg_window_already_covered() {
        // Arrange: end is not after epoch + 1
        let mut data = sample_data();
        let mut sink = CollectingSink::new();

        // Act
        data.get_epg_for_channel(&mut sink, 1, 1_000, 1_001);

        // Assert
        assert!(sink.epg_entries.is_empty());
    }

    #[test]
    fn test_epg_non_advancing_template_stops() {
        // Arrange
        let mut data = sample_data();
        data.channels[1].epg = vec![entry(1, 0, 0)];
        let mut sink = CollectingSink::new();

        // Act
        data.get_epg_for_channel(&mut sink, 2, 0, 10_000);

        // Assert
        assert_eq!(sink.epg_entries.len(), 1);
    }

    #[test]
    fn test_get_recordings_marks_deleted() {
        // Arrange
        let data = sample_data();
        let mut active = CollectingSink::new();
        let mut deleted = CollectingSink::new();

        // Act
        data.get_recordings(&mut active, false);
        data.get_recordings(&mut deleted, true);

        // Assert
        assert_eq!(active.recordings.len(), 1);
        assert!(!active.recordings[0].is_deleted);
        assert_eq!(active.recordings[0].channel_type, RecordingChannelType::Tv);
        assert_eq!(active.recordings[0].channel_uid, PVR_CHANNEL_INVALID_UID);
        assert_eq!(deleted.recordings.len(), 1);
        assert!(deleted.recordings[0].is_deleted);
        assert_eq!(deleted.recordings[0].channel_type, RecordingChannelType::Radio);
        assert_eq!(data.recordings_amount(false), 1);
        assert_eq!(data.recordings_amount(true), 1);
    }

    #[test]
    fn test_recording_stream_url_lookup() {
        // Arrange
        let data = sample_data();

        // Act & Assert
        assert_eq!(data.recording_stream_url("1"), "http://example.com/rec.ts");
        assert_eq!(data.recording_stream_url("404"), "");
        // deleted recordings are not searched
        assert_eq!(data.recording_stream_url("2"), "");
    }

    #[test]
    fn test_get_timers_assigns_client_indices() {
        // Arrange
        let data = sample_data();
        let mut sink = CollectingSink::new();

        // Act
        data.get_timers(&mut sink);

        // Assert
        assert_eq!(sink.timers.len(), 2);
        assert_eq!(sink.timers[0].client_index, PVR_TIMER_NO_CLIENT_INDEX + 1);
        assert_eq!(sink.timers[1].client_index, PVR_TIMER_NO_CLIENT_INDEX + 2);
        assert_eq!(sink.timers[0].state, TimerState::Scheduled);
        assert_eq!(sink.timers[0].timer_type, PVR_TIMER_TYPE_NONE);
        assert_eq!(sink.timers[1].client_channel_uid, 2);
        assert_eq!(data.timers_amount(), 2);
    }

    #[test]
    fn test_find_channel_by_uid() {
        // Arrange
        let data = sample_data();

        // Act & Assert
        assert_eq!(data.find_channel_by_uid(2).unwrap().name, "Two");
        assert!(data.find_channel_by_uid(7).is_none());
    }

    #[test]
    fn test_empty_store_is_queryable() {
        // Arrange
        let mut data = DemoData::new();
        let mut sink = CollectingSink::new();

        // Act
        data.get_channels(&mut sink, false);
        data.get_channel_groups(&mut sink, false);
        data.get_epg_for_channel(&mut sink, 1, 0, 100);
        data.get_recordings(&mut sink, false);
        data.get_timers(&mut sink);

        // Assert
        assert_eq!(sink, CollectingSink::new());
        assert_eq!(data.channels_amount(), 0);
        assert_eq!(data.timers_amount(), 0);
    }
}
