//! `DemoClient` - host-facing lifecycle around the demo data store.

use std::path::{Path, PathBuf};

use crate::data::DemoData;
use crate::host::{
    AddonStatus, DriveSpace, NameString, NamedValue, PVR_STREAM_PROPERTY_ISREALTIMESTREAM,
    PVR_STREAM_PROPERTY_STREAMURL, PvrError, SignalStatus, TransferSink,
};
use crate::loader::{DemoDataLoader, settings_file};

/// Backend name reported to the host.
pub const BACKEND_NAME: &str = "pulse-eight demo pvr add-on";
/// Backend version reported to the host.
pub const BACKEND_VERSION: &str = "0.1";
/// Connection string reported to the host.
pub const CONNECTION_STRING: &str = "connected";
/// Count returned while no store exists.
pub const AMOUNT_UNAVAILABLE: i32 = -1;
/// Stream played for any EPG tag.
pub const EPG_TAG_STREAM_URL: &str =
    "http://distribution.bbb3d.renderfarming.net/video/mp4/bbb_sunflower_1080p_30fps_normal.mp4";

/// Total drive space reported to the host.
const DRIVE_SPACE_TOTAL: i64 = 1024 * 1024 * 1024;

/// Demo backend as seen by the host.
///
/// Holds no store until [`DemoClient::create`] runs. A failed document
/// load still yields an (empty) store, so queries keep working.
#[derive(Debug, Default)]
pub struct DemoClient {
    /// Loader used by `create` and `reload`.
    loader: Option<DemoDataLoader>,
    /// Document read by `reload`.
    settings_path: Option<PathBuf>,
    /// Loaded store.
    data: Option<DemoData>,
    /// Lifecycle status.
    status: AddonStatus,
}

impl DemoClient {
    /// Creates a client with no store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `PVRDemoAddonSettings.xml` from `client_path`.
    ///
    /// Relative channel icons resolve against `client_path`.
    pub fn create(&mut self, client_path: &str) -> AddonStatus {
        let loader = DemoDataLoader::builder().base_path(client_path).build();
        self.create_with(loader, &settings_file(client_path))
    }

    /// Loads `settings_path` with a preconfigured loader.
    pub fn create_with(&mut self, loader: DemoDataLoader, settings_path: &Path) -> AddonStatus {
        self.data = Some(load_or_empty(&loader, settings_path));
        self.loader = Some(loader);
        self.settings_path = Some(settings_path.to_path_buf());
        self.status = AddonStatus::Ok;
        self.status
    }

    /// Rebuilds the store from the same document.
    ///
    /// The old store stays in place until the new one is complete. The EPG
    /// epoch starts over with the new store.
    pub fn reload(&mut self) -> AddonStatus {
        let (Some(loader), Some(path)) = (self.loader.as_ref(), self.settings_path.as_deref())
        else {
            return AddonStatus::Unknown;
        };
        let fresh = load_or_empty(loader, path);
        self.data = Some(fresh);
        self.status
    }

    /// Drops the store.
    pub fn destroy(&mut self) {
        self.data = None;
        self.loader = None;
        self.settings_path = None;
        self.status = AddonStatus::Unknown;
    }

    /// Current lifecycle status.
    #[must_use]
    pub const fn status(&self) -> AddonStatus {
        self.status
    }

    /// The loaded store, if created.
    #[must_use]
    pub const fn data(&self) -> Option<&DemoData> {
        self.data.as_ref()
    }

    /// Backend name.
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    /// Backend version.
    #[must_use]
    pub const fn backend_version(&self) -> &'static str {
        BACKEND_VERSION
    }

    /// Connection string.
    #[must_use]
    pub const fn connection_string(&self) -> &'static str {
        CONNECTION_STRING
    }

    /// Backend hostname (none for a local demo).
    #[must_use]
    pub const fn backend_hostname(&self) -> &'static str {
        ""
    }

    /// Reported drive space.
    #[must_use]
    pub const fn drive_space(&self) -> DriveSpace {
        DriveSpace {
            total: DRIVE_SPACE_TOTAL,
            used: 0,
        }
    }

    /// Reported tuner signal status.
    #[must_use]
    pub fn signal_status(&self) -> SignalStatus {
        SignalStatus {
            adapter_name: NameString::new("pvr demo adapter 1"),
            adapter_status: NameString::new("OK"),
        }
    }

    /// Number of channels, or [`AMOUNT_UNAVAILABLE`].
    #[must_use]
    pub fn channels_amount(&self) -> i32 {
        self.data
            .as_ref()
            .map_or(AMOUNT_UNAVAILABLE, DemoData::channels_amount)
    }

    /// Number of channel groups, or [`AMOUNT_UNAVAILABLE`].
    #[must_use]
    pub fn channel_groups_amount(&self) -> i32 {
        self.data
            .as_ref()
            .map_or(AMOUNT_UNAVAILABLE, DemoData::channel_groups_amount)
    }

    /// Number of (deleted) recordings, or [`AMOUNT_UNAVAILABLE`].
    #[must_use]
    pub fn recordings_amount(&self, deleted: bool) -> i32 {
        self.data
            .as_ref()
            .map_or(AMOUNT_UNAVAILABLE, |d| d.recordings_amount(deleted))
    }

    /// Number of timers, or [`AMOUNT_UNAVAILABLE`].
    #[must_use]
    pub fn timers_amount(&self) -> i32 {
        self.data
            .as_ref()
            .map_or(AMOUNT_UNAVAILABLE, DemoData::timers_amount)
    }

    /// Transfers TV or radio channels.
    pub fn get_channels(&self, sink: &mut impl TransferSink, radio: bool) -> PvrError {
        self.with_data(|d| d.get_channels(sink, radio))
    }

    /// Transfers TV or radio channel groups.
    pub fn get_channel_groups(&self, sink: &mut impl TransferSink, radio: bool) -> PvrError {
        self.with_data(|d| d.get_channel_groups(sink, radio))
    }

    /// Transfers the members of the named group.
    pub fn get_channel_group_members(
        &self,
        sink: &mut impl TransferSink,
        group_name: &str,
    ) -> PvrError {
        self.with_data(|d| d.get_channel_group_members(sink, group_name))
    }

    /// Transfers the synthesized EPG of a channel.
    pub fn get_epg_for_channel(
        &mut self,
        sink: &mut impl TransferSink,
        channel_uid: i32,
        start: i64,
        end: i64,
    ) -> PvrError {
        let Some(data) = self.data.as_mut() else {
            return PvrError::ServerError;
        };
        data.get_epg_for_channel(sink, channel_uid, start, end);
        PvrError::NoError
    }

    /// Every EPG tag of this backend is playable.
    #[must_use]
    pub const fn is_epg_tag_playable(&self) -> bool {
        true
    }

    /// Transfers recordings or deleted recordings.
    pub fn get_recordings(&self, sink: &mut impl TransferSink, deleted: bool) -> PvrError {
        self.with_data(|d| d.get_recordings(sink, deleted))
    }

    /// Transfers timers.
    pub fn get_timers(&self, sink: &mut impl TransferSink) -> PvrError {
        match self.data.as_ref() {
            Some(d) => {
                d.get_timers(sink);
                PvrError::NoError
            }
            None => PvrError::NotImplemented,
        }
    }

    /// Stream properties of a live channel.
    ///
    /// An unknown channel yields an empty URL.
    ///
    /// # Errors
    ///
    /// `InvalidParameters` if fewer than two properties fit, `ServerError`
    /// if no store exists.
    pub fn get_channel_stream_properties(
        &self,
        channel_uid: i32,
        max_properties: usize,
    ) -> Result<Vec<NamedValue>, PvrError> {
        if max_properties < 2 {
            return Err(PvrError::InvalidParameters);
        }
        let data = self.data.as_ref().ok_or(PvrError::ServerError)?;
        let url = data
            .find_channel_by_uid(channel_uid)
            .map_or("", |c| c.stream_url.as_str());
        Ok(vec![
            NamedValue::new(PVR_STREAM_PROPERTY_STREAMURL, url),
            NamedValue::new(PVR_STREAM_PROPERTY_ISREALTIMESTREAM, "true"),
        ])
    }

    /// Stream properties of a recording.
    ///
    /// # Errors
    ///
    /// `InvalidParameters` if no property fits, `ServerError` if no store
    /// exists.
    pub fn get_recording_stream_properties(
        &self,
        recording_id: &str,
        max_properties: usize,
    ) -> Result<Vec<NamedValue>, PvrError> {
        if max_properties < 1 {
            return Err(PvrError::InvalidParameters);
        }
        let data = self.data.as_ref().ok_or(PvrError::ServerError)?;
        Ok(vec![NamedValue::new(
            PVR_STREAM_PROPERTY_STREAMURL,
            data.recording_stream_url(recording_id),
        )])
    }

    /// Stream properties of an EPG tag.
    ///
    /// # Errors
    ///
    /// `InvalidParameters` if no property fits.
    pub fn get_epg_tag_stream_properties(
        &self,
        max_properties: usize,
    ) -> Result<Vec<NamedValue>, PvrError> {
        if max_properties < 1 {
            return Err(PvrError::InvalidParameters);
        }
        Ok(vec![NamedValue::new(
            PVR_STREAM_PROPERTY_STREAMURL,
            EPG_TAG_STREAM_URL,
        )])
    }

    fn with_data(&self, f: impl FnOnce(&DemoData)) -> PvrError {
        self.data.as_ref().map_or(PvrError::ServerError, |d| {
            f(d);
            PvrError::NoError
        })
    }
}

/// Loads the document, falling back to an empty store on failure.
fn load_or_empty(loader: &DemoDataLoader, path: &Path) -> DemoData {
    match loader.load_file(path) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!("{e}");
            DemoData::new()
        }
    }
}
