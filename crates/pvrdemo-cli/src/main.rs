//! pvrdemo - browse the demo PVR backend data from the command line.

/// Application configuration (TOML).
mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::instrument;
use tracing_subscriber::filter::EnvFilter;
#[cfg(not(feature = "otel"))]
use tracing_subscriber::fmt;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{AppConfig, resolve_config_path};
use pvrdemo_data::host::{CollectingSink, PvrError};
use pvrdemo_data::{DemoClient, settings_file};

/// Maximum number of stream properties requested per item.
const MAX_STREAM_PROPERTIES: usize = 4;

/// CLI argument parser.
#[derive(Parser)]
#[command(about, version)]
struct Cli {
    /// Override config directory (otherwise `$PVRDEMO_CONFIG`, then the XDG location).
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Directory holding `PVRDemoAddonSettings.xml`. Falls back to config, then ".".
    #[arg(long, global = true)]
    client_path: Option<String>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Commands,
}

/// Output format of listing subcommands.
#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Tab-separated lines.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List channels.
    Channels(RadioArgs),
    /// List channel groups.
    Groups(RadioArgs),
    /// List the members of a channel group.
    Members(MembersArgs),
    /// Show the synthesized EPG of a channel.
    Epg(EpgArgs),
    /// List recordings.
    Recordings(RecordingsArgs),
    /// List timers.
    Timers,
    /// Show the stream URL of a recording.
    RecordingUrl(RecordingUrlArgs),
    /// Show the stream properties of a channel.
    ChannelUrl(ChannelUrlArgs),
    /// Show backend information and counts.
    Info,
    /// Write the effective settings to `config.toml`.
    Init(InitArgs),
}

/// Arguments for `channels` and `groups`.
#[derive(clap::Args)]
struct RadioArgs {
    /// List radio entries instead of TV.
    #[arg(long)]
    radio: bool,
}

/// Arguments for the `members` subcommand.
#[derive(clap::Args)]
struct MembersArgs {
    /// Group name (exact match).
    group: String,
}

/// Arguments for the `epg` subcommand.
#[derive(clap::Args)]
struct EpgArgs {
    /// Channel unique id.
    uid: i32,

    /// Window start as unix timestamp (default: now).
    #[arg(long)]
    start: Option<i64>,

    /// Window end as unix timestamp (default: start + `epg.window_hours`).
    #[arg(long)]
    end: Option<i64>,
}

/// Arguments for the `recordings` subcommand.
#[derive(clap::Args)]
struct RecordingsArgs {
    /// List deleted recordings.
    #[arg(long)]
    deleted: bool,
}

/// Arguments for the `recording-url` subcommand.
#[derive(clap::Args)]
struct RecordingUrlArgs {
    /// Recording id.
    id: String,
}

/// Arguments for the `channel-url` subcommand.
#[derive(clap::Args)]
struct ChannelUrlArgs {
    /// Channel unique id.
    uid: i32,
}

/// Arguments for the `init` subcommand.
#[derive(clap::Args)]
struct InitArgs {
    /// EPG window in hours to store.
    #[arg(long)]
    window_hours: Option<u32>,
}

/// Resolves the client directory: `--client-path`, then config, then ".".
fn resolve_client_path(arg: Option<&str>, config: &AppConfig) -> String {
    arg.map(String::from)
        .or_else(|| config.client.path.clone())
        .unwrap_or_else(|| String::from("."))
}

/// Loads config and creates a client over the resolved settings document.
///
/// # Errors
///
/// Returns an error if config loading fails or the settings document does
/// not exist.
fn open_client(cli: &Cli) -> Result<(DemoClient, AppConfig)> {
    let config_path = resolve_config_path(cli.dir.as_ref()).context("failed to resolve config path")?;
    let config = AppConfig::load(&config_path).context("failed to load config")?;

    let client_path = resolve_client_path(cli.client_path.as_deref(), &config);
    let settings = settings_file(&client_path);
    if !settings.exists() {
        bail!("settings file not found: {}", settings.display());
    }

    let mut client = DemoClient::new();
    client.create(&client_path);
    Ok((client, config))
}

/// Converts a host status code into a result.
fn check(code: PvrError, what: &str) -> Result<()> {
    if code.is_ok() {
        Ok(())
    } else {
        Err(anyhow!("{what} failed: {code}"))
    }
}

/// Logs `items` as pretty JSON.
fn emit_json<T: Serialize + ?Sized>(items: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(items).context("failed to serialize output")?;
    tracing::info!("{json}");
    Ok(())
}

/// Formats a unix timestamp in local time; `0` prints as "-".
fn format_time(ts: i64) -> String {
    if ts == 0 {
        return String::from("-");
    }
    chrono::DateTime::from_timestamp(ts, 0).map_or_else(
        || ts.to_string(),
        |dt| {
            dt.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        },
    )
}

/// Runs the `channels` subcommand.
///
/// # Errors
///
/// Returns an error if the client cannot be opened.
#[instrument(skip_all)]
fn run_channels(cli: &Cli, args: &RadioArgs) -> Result<()> {
    let (client, _) = open_client(cli)?;
    let mut sink = CollectingSink::new();
    check(client.get_channels(&mut sink, args.radio), "channel transfer")?;

    if cli.format == OutputFormat::Json {
        return emit_json(&sink.channels);
    }

    tracing::info!("UID\tNumber\tName\t\t\tEncryption\tIcon");
    for ch in &sink.channels {
        tracing::info!(
            "{}\t{}.{}\t{}\t\t{}\t\t{}",
            ch.unique_id,
            ch.channel_number,
            ch.sub_channel_number,
            ch.channel_name,
            ch.encryption_system,
            ch.icon_path,
        );
    }
    tracing::info!("Total: {} channels", sink.channels.len());
    Ok(())
}

/// Runs the `groups` subcommand.
///
/// # Errors
///
/// Returns an error if the client cannot be opened.
#[instrument(skip_all)]
fn run_groups(cli: &Cli, args: &RadioArgs) -> Result<()> {
    let (client, _) = open_client(cli)?;
    let mut sink = CollectingSink::new();
    check(client.get_channel_groups(&mut sink, args.radio), "group transfer")?;

    if cli.format == OutputFormat::Json {
        return emit_json(&sink.channel_groups);
    }

    tracing::info!("Position\tName");
    for group in &sink.channel_groups {
        tracing::info!("{}\t\t{}", group.position, group.group_name);
    }
    tracing::info!("Total: {} groups", sink.channel_groups.len());
    Ok(())
}

/// Runs the `members` subcommand.
///
/// # Errors
///
/// Returns an error if the client cannot be opened.
#[instrument(skip_all)]
fn run_members(cli: &Cli, args: &MembersArgs) -> Result<()> {
    let (client, _) = open_client(cli)?;
    let mut sink = CollectingSink::new();
    check(
        client.get_channel_group_members(&mut sink, &args.group),
        "member transfer",
    )?;

    if cli.format == OutputFormat::Json {
        return emit_json(&sink.channel_group_members);
    }

    if sink.channel_group_members.is_empty() {
        tracing::info!("No members in group '{}'", args.group);
        return Ok(());
    }

    tracing::info!("UID\tNumber");
    for member in &sink.channel_group_members {
        tracing::info!(
            "{}\t{}.{}",
            member.channel_unique_id,
            member.channel_number,
            member.sub_channel_number,
        );
    }
    tracing::info!("Total: {} members", sink.channel_group_members.len());
    Ok(())
}

/// Runs the `epg` subcommand.
///
/// # Errors
///
/// Returns an error if the client cannot be opened or the window is empty.
#[instrument(skip_all)]
fn run_epg(cli: &Cli, args: &EpgArgs) -> Result<()> {
    let (mut client, config) = open_client(cli)?;

    let start = args.start.unwrap_or_else(|| chrono::Utc::now().timestamp());
    let window = i64::from(config.epg.window_hours).saturating_mul(3600);
    let end = args.end.unwrap_or_else(|| start.saturating_add(window));
    if end <= start {
        bail!("--end must be after --start");
    }

    let mut sink = CollectingSink::new();
    check(
        client.get_epg_for_channel(&mut sink, args.uid, start, end),
        "EPG transfer",
    )?;

    if cli.format == OutputFormat::Json {
        return emit_json(&sink.epg_entries);
    }

    tracing::info!(
        "Window: {} .. {}",
        format_time(start),
        format_time(end)
    );
    tracing::info!("ID\tStart\t\t\tEnd\t\t\tTitle");
    for tag in &sink.epg_entries {
        tracing::info!(
            "{}\t{}\t{}\t{}",
            tag.unique_broadcast_id,
            format_time(tag.start_time),
            format_time(tag.end_time),
            tag.title,
        );
    }
    tracing::info!("Total: {} EPG entries", sink.epg_entries.len());
    Ok(())
}

/// Runs the `recordings` subcommand.
///
/// # Errors
///
/// Returns an error if the client cannot be opened.
#[instrument(skip_all)]
fn run_recordings(cli: &Cli, args: &RecordingsArgs) -> Result<()> {
    let (client, _) = open_client(cli)?;
    let mut sink = CollectingSink::new();
    check(
        client.get_recordings(&mut sink, args.deleted),
        "recording transfer",
    )?;

    if cli.format == OutputFormat::Json {
        return emit_json(&sink.recordings);
    }

    tracing::info!("ID\tRecorded\t\tDuration\tChannel\t\tTitle");
    for rec in &sink.recordings {
        tracing::info!(
            "{}\t{}\t{}\t\t{}\t{}",
            rec.recording_id,
            format_time(rec.recording_time),
            rec.duration,
            if rec.channel_name.is_empty() {
                "-"
            } else {
                rec.channel_name.as_str()
            },
            rec.title,
        );
    }
    tracing::info!("Total: {} recordings", sink.recordings.len());
    Ok(())
}

/// Runs the `timers` subcommand.
///
/// # Errors
///
/// Returns an error if the client cannot be opened.
#[instrument(skip_all)]
fn run_timers(cli: &Cli) -> Result<()> {
    let (client, _) = open_client(cli)?;
    let mut sink = CollectingSink::new();
    check(client.get_timers(&mut sink), "timer transfer")?;

    if cli.format == OutputFormat::Json {
        return emit_json(&sink.timers);
    }

    tracing::info!("Index\tChannel\tState\tStart\t\t\tEnd\t\t\tTitle");
    for timer in &sink.timers {
        tracing::info!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            timer.client_index,
            timer.client_channel_uid,
            timer.state.as_raw(),
            format_time(timer.start_time),
            format_time(timer.end_time),
            timer.title,
        );
    }
    tracing::info!("Total: {} timers", sink.timers.len());
    Ok(())
}

/// Runs the `recording-url` subcommand.
///
/// # Errors
///
/// Returns an error if the client cannot be opened or the recording is unknown.
#[instrument(skip_all)]
fn run_recording_url(cli: &Cli, args: &RecordingUrlArgs) -> Result<()> {
    let (client, _) = open_client(cli)?;
    let props = client
        .get_recording_stream_properties(&args.id, MAX_STREAM_PROPERTIES)
        .map_err(|e| anyhow!("stream properties failed: {e}"))?;

    if props.iter().all(|p| p.value.is_empty()) {
        bail!("no stream for recording '{}'", args.id);
    }
    if cli.format == OutputFormat::Json {
        return emit_json(&props);
    }
    for prop in &props {
        tracing::info!("{}\t{}", prop.name, prop.value);
    }
    Ok(())
}

/// Runs the `channel-url` subcommand.
///
/// # Errors
///
/// Returns an error if the client cannot be opened or the channel is unknown.
#[instrument(skip_all)]
fn run_channel_url(cli: &Cli, args: &ChannelUrlArgs) -> Result<()> {
    let (client, _) = open_client(cli)?;
    if client
        .data()
        .and_then(|d| d.find_channel_by_uid(args.uid))
        .is_none()
    {
        bail!("unknown channel uid {}", args.uid);
    }

    let props = client
        .get_channel_stream_properties(args.uid, MAX_STREAM_PROPERTIES)
        .map_err(|e| anyhow!("stream properties failed: {e}"))?;

    if cli.format == OutputFormat::Json {
        return emit_json(&props);
    }
    for prop in &props {
        tracing::info!("{}\t{}", prop.name, prop.value);
    }
    Ok(())
}

/// Backend summary printed by `info`.
#[derive(Serialize)]
struct BackendInfo {
    name: &'static str,
    version: &'static str,
    connection: &'static str,
    hostname: &'static str,
    drive_total: i64,
    drive_used: i64,
    adapter_name: String,
    adapter_status: String,
    channels: i32,
    channel_groups: i32,
    recordings: i32,
    deleted_recordings: i32,
    timers: i32,
}

/// Runs the `info` subcommand.
///
/// # Errors
///
/// Returns an error if the client cannot be opened.
#[instrument(skip_all)]
fn run_info(cli: &Cli) -> Result<()> {
    let (client, _) = open_client(cli)?;
    let drive = client.drive_space();
    let signal = client.signal_status();
    let info = BackendInfo {
        name: client.backend_name(),
        version: client.backend_version(),
        connection: client.connection_string(),
        hostname: client.backend_hostname(),
        drive_total: drive.total,
        drive_used: drive.used,
        adapter_name: signal.adapter_name.to_string(),
        adapter_status: signal.adapter_status.to_string(),
        channels: client.channels_amount(),
        channel_groups: client.channel_groups_amount(),
        recordings: client.recordings_amount(false),
        deleted_recordings: client.recordings_amount(true),
        timers: client.timers_amount(),
    };

    if cli.format == OutputFormat::Json {
        return emit_json(&info);
    }

    tracing::info!("Backend: {} {}", info.name, info.version);
    tracing::info!("Connection: {}", info.connection);
    tracing::info!("Drive space: {} / {}", info.drive_used, info.drive_total);
    tracing::info!("Signal: {} ({})", info.adapter_name, info.adapter_status);
    tracing::info!("Channels: {}", info.channels);
    tracing::info!("Channel groups: {}", info.channel_groups);
    tracing::info!(
        "Recordings: {} ({} deleted)",
        info.recordings,
        info.deleted_recordings
    );
    tracing::info!("Timers: {}", info.timers);
    Ok(())
}

/// Runs the `init` subcommand.
///
/// # Errors
///
/// Returns an error if config loading or saving fails.
#[instrument(skip_all)]
fn run_init(cli: &Cli, args: &InitArgs) -> Result<()> {
    let config_path = resolve_config_path(cli.dir.as_ref()).context("failed to resolve config path")?;
    let mut config = AppConfig::load(&config_path).context("failed to load config")?;

    if let Some(path) = cli.client_path.as_deref() {
        config.client.path = Some(absolute_or_same(path));
    }
    if let Some(hours) = args.window_hours {
        config.epg.window_hours = hours;
    }

    config.save(&config_path).context("failed to save config")?;
    tracing::info!("Saved config to {}", config_path.display());
    Ok(())
}

/// Returns `path` made absolute against the working directory when possible.
fn absolute_or_same(path: &str) -> String {
    std::path::absolute(Path::new(path))
        .map_or_else(|_| String::from(path), |p| p.to_string_lossy().into_owned())
}

/// Entry point.
///
/// # Errors
///
/// Returns an error if subcommand execution fails.
fn main() -> Result<()> {
    #[cfg(not(feature = "otel"))]
    {
        fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .with_target(false)
            .init();
    }

    #[cfg(feature = "otel")]
    {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);

        let otel_layer = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .and_then(|_| {
                let exporter = opentelemetry_otlp::SpanExporter::builder()
                    .with_http()
                    .build()
                    .ok()?;

                let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                    .with_simple_exporter(exporter)
                    .build();

                let tracer = opentelemetry::trace::TracerProvider::tracer(
                    &tracer_provider,
                    env!("CARGO_PKG_NAME"),
                );
                opentelemetry::global::set_tracer_provider(tracer_provider);

                Some(tracing_opentelemetry::layer().with_tracer(tracer))
            });

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .init();
    }

    let cli = Cli::parse();
    match &cli.command {
        Commands::Channels(args) => run_channels(&cli, args),
        Commands::Groups(args) => run_groups(&cli, args),
        Commands::Members(args) => run_members(&cli, args),
        Commands::Epg(args) => run_epg(&cli, args),
        Commands::Recordings(args) => run_recordings(&cli, args),
        Commands::Timers => run_timers(&cli),
        Commands::RecordingUrl(args) => run_recording_url(&cli, args),
        Commands::ChannelUrl(args) => run_channel_url(&cli, args),
        Commands::Info => run_info(&cli),
        Commands::Init(args) => run_init(&cli, args),
    }
}
