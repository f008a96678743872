use chrono::serde::ts_milliseconds_option;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Credentials sent to the authenticate endpoint
#[derive(Serialize, Debug)]
pub struct AuthRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Authentication response
#[derive(Deserialize, Debug)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
}

/// Result of the connection test between Flood and its torrent client
#[derive(Deserialize, Debug)]
pub struct ConnectionTest {
    #[serde(rename = "isConnected", default)]
    pub is_connected: bool,
}

/// Torrent client throttle settings.
///
/// Only the global throttles are typed, every other key the backend returns
/// is kept in `extra` so nothing is lost when the settings are passed on.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct ClientSettings {
    /// Global download cap in bytes/s
    #[serde(
        rename = "throttleGlobalDownSpeed",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub throttle_global_down_speed: Option<u64>,
    /// Global upload cap in bytes/s
    #[serde(
        rename = "throttleGlobalUpSpeed",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub throttle_global_up_speed: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Partial update of the client throttle settings
#[derive(Serialize, Debug, Default)]
pub struct ThrottleUpdate {
    #[serde(
        rename = "throttleGlobalDownSpeed",
        skip_serializing_if = "Option::is_none"
    )]
    pub throttle_global_down_speed: Option<u64>,
    #[serde(
        rename = "throttleGlobalUpSpeed",
        skip_serializing_if = "Option::is_none"
    )]
    pub throttle_global_up_speed: Option<u64>,
}

/// Flood-wide settings
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Settings {
    /// Speed limit presets offered to the user
    #[serde(
        rename = "speedLimits",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub speed_limits: Option<SpeedLimits>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Speed limit presets, in bytes/s
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct SpeedLimits {
    #[serde(default)]
    pub download: Vec<u64>,
    #[serde(default)]
    pub upload: Vec<u64>,
}

/// Transfer rate time series
#[derive(Deserialize, Default, Debug)]
pub struct TransferHistory {
    #[serde(default)]
    pub download: Vec<f64>,
    #[serde(default)]
    pub upload: Vec<f64>,
    #[serde(default)]
    pub timestamps: Vec<i64>,
}

/// Most recent transfer rates, in bytes/s
#[derive(Serialize, Default, Debug, Clone, PartialEq)]
pub struct HistorySummary {
    #[serde(rename = "downloadSpeed")]
    pub download_speed: Option<f64>,
    #[serde(rename = "uploadSpeed")]
    pub upload_speed: Option<f64>,
}

/// Notification feed
#[derive(Deserialize, Default, Debug)]
pub struct Notifications {
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub count: Option<NotificationCount>,
}

#[derive(Deserialize, Default, Debug, Clone, Copy)]
pub struct NotificationCount {
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub unread: u32,
    #[serde(default)]
    pub read: u32,
}

/// A single notification
#[derive(Deserialize, Default, Debug, Clone)]
pub struct Notification {
    /// Event type, e.g. `notification.torrent.finished`
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, with = "ts_milliseconds_option")]
    pub ts: Option<DateTime<Utc>>,
    #[serde(default)]
    pub read: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub data: NotificationData,
}

/// Treats an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Notification payload
#[derive(Deserialize, Default, Debug, Clone)]
pub struct NotificationData {
    pub name: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "feedLabel")]
    pub feed_label: Option<String>,
}

/// Classified summary of the most recent notification
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LastNotification {
    pub title: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub torrent: String,
}

/// Torrent collection, keyed by hash
#[derive(Deserialize, Default, Debug)]
pub struct Torrents {
    #[serde(default)]
    pub torrents: BTreeMap<String, Torrent>,
}

/// Individual torrent record
#[derive(Deserialize, Debug, Clone)]
pub struct Torrent {
    pub hash: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub status: Vec<TorrentStatus>,
}

/// Torrent status tags. A torrent usually carries several at once.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TorrentStatus {
    Complete,
    Seeding,
    Downloading,
    Active,
    Inactive,
    Stopped,
    #[serde(other)]
    Other,
}

/// Torrent totals per status
#[derive(Serialize, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TorrentCounts {
    pub count: usize,
    pub completed: usize,
    pub downloading: usize,
    pub seeding: usize,
    pub stopped: usize,
    pub inactive: usize,
    pub active: usize,
}

/// Body of the start/stop commands
#[derive(Serialize, Debug)]
pub struct TorrentHashes {
    pub hashes: Vec<String>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub status: bool,
}

/// Everything a single poll cycle gathers
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub client_settings: ClientSettings,
    pub settings: Settings,
    pub last_notification: Option<LastNotification>,
    pub history: HistorySummary,
    pub torrents: TorrentCounts,
    pub connected: ConnectionStatus,
}
