use crate::entities::TorrentStatus::{Active, Complete, Downloading, Inactive, Seeding, Stopped};
use crate::entities::{
    HistorySummary, LastNotification, Notification, Snapshot, TorrentCounts, Torrents,
    TransferHistory,
};
use byte_unit::{Byte, UnitType};

const NOTIFICATION_TYPE_NOT_FOUND: &str = "notification type not found";
const TORRENT_NAME_NOT_FOUND: &str = "torrent name not found";
const FEED_NAME_NOT_FOUND: &str = "feed name not found";

impl TransferHistory {
    /// Latest sample of each series, `None` where a series is empty
    #[must_use]
    pub fn latest(&self) -> HistorySummary {
        HistorySummary {
            download_speed: self.download.last().copied(),
            upload_speed: self.upload.last().copied(),
        }
    }
}

impl HistorySummary {
    #[must_use]
    pub fn download_speed_kb(&self) -> Option<u64> {
        self.download_speed.map(to_kilobytes)
    }

    #[must_use]
    pub fn upload_speed_kb(&self) -> Option<u64> {
        self.upload_speed.map(to_kilobytes)
    }
}

impl Torrents {
    /// Counts torrents per status tag in a single pass.
    ///
    /// Tags are not exclusive, so one torrent can land in several buckets.
    #[must_use]
    pub fn counts(&self) -> TorrentCounts {
        self.torrents
            .values()
            .fold(TorrentCounts::default(), |mut counts, torrent| {
                let has = |status| usize::from(torrent.status.contains(&status));
                counts.count += 1;
                counts.completed += has(Complete);
                counts.seeding += has(Seeding);
                counts.downloading += has(Downloading);
                counts.active += has(Active);
                counts.inactive += has(Inactive);
                counts.stopped += has(Stopped);
                counts
            })
    }

    /// Hashes of every torrent, falling back to the collection key
    #[must_use]
    pub fn hashes(&self) -> Vec<String> {
        self.torrents
            .iter()
            .map(|(key, torrent)| torrent.hash.clone().unwrap_or_else(|| key.clone()))
            .collect()
    }
}

impl Notification {
    /// Human label for the notification type
    #[must_use]
    pub fn label(&self) -> String {
        match self.id.as_deref() {
            Some("notification.torrent.finished") => String::from("Finished"),
            Some("notification.torrent.errored") => String::from("Errored"),
            Some("notification.feed.torrent.added") => format!(
                "Added from {}",
                self.data.feed_label.as_deref().unwrap_or(FEED_NAME_NOT_FOUND)
            ),
            Some(other) => other.to_string(),
            None => NOTIFICATION_TYPE_NOT_FOUND.to_string(),
        }
    }

    #[must_use]
    pub fn torrent_name(&self) -> &str {
        self.data
            .name
            .as_deref()
            .or(self.data.title.as_deref())
            .unwrap_or(TORRENT_NAME_NOT_FOUND)
    }

    #[must_use]
    pub fn summarize(&self) -> LastNotification {
        let torrent = self.torrent_name().to_string();
        LastNotification {
            title: format!("{}: {torrent}", self.label()),
            notification_type: self
                .id
                .clone()
                .unwrap_or_else(|| NOTIFICATION_TYPE_NOT_FOUND.to_string()),
            torrent,
        }
    }
}

impl Snapshot {
    /// Current global download cap in kB/s
    #[must_use]
    pub fn download_limit_kb(&self) -> Option<u64> {
        self.client_settings
            .throttle_global_down_speed
            .map(round_kilobytes)
    }

    /// Current global upload cap in kB/s
    #[must_use]
    pub fn upload_limit_kb(&self) -> Option<u64> {
        self.client_settings
            .throttle_global_up_speed
            .map(round_kilobytes)
    }

    /// Selectable download limits in kB/s, current limit included
    #[must_use]
    pub fn download_limit_options(&self) -> Vec<u64> {
        let presets = self
            .settings
            .speed_limits
            .as_ref()
            .map(|limits| limits.download.as_slice())
            .unwrap_or_default();
        speed_limit_options(
            self.client_settings.throttle_global_down_speed.unwrap_or(0),
            presets,
        )
    }

    /// Selectable upload limits in kB/s, current limit included
    #[must_use]
    pub fn upload_limit_options(&self) -> Vec<u64> {
        let presets = self
            .settings
            .speed_limits
            .as_ref()
            .map(|limits| limits.upload.as_slice())
            .unwrap_or_default();
        speed_limit_options(
            self.client_settings.throttle_global_up_speed.unwrap_or(0),
            presets,
        )
    }
}

/// Truncates a bytes/s rate to whole kB/s
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn to_kilobytes(bytes_per_sec: f64) -> u64 {
    (bytes_per_sec / 1024.0).max(0.0) as u64
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn round_kilobytes(bytes_per_sec: u64) -> u64 {
    (bytes_per_sec as f64 / 1024.0).round() as u64
}

/// Merges the current limit with the presets, all in kB/s, sorted and unique
#[must_use]
pub fn speed_limit_options(current_bytes: u64, presets_bytes: &[u64]) -> Vec<u64> {
    let mut options: Vec<u64> = presets_bytes.iter().copied().map(round_kilobytes).collect();
    options.push(round_kilobytes(current_bytes));
    options.sort_unstable();
    options.dedup();
    options
}

/// Human-readable transfer rate, e.g. `98.77 KB/s`
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
#[must_use]
pub fn format_speed(bytes_per_sec: f64) -> String {
    let speed = Byte::from(bytes_per_sec.max(0.0).round() as u64);
    format!("{:#.2}/s", speed.get_appropriate_unit(UnitType::Decimal))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{
        ClientSettings, ConnectionStatus, NotificationData, Settings, SpeedLimits, Torrent,
        TorrentStatus,
    };

    fn torrent(hash: Option<&str>, status: Vec<TorrentStatus>) -> Torrent {
        Torrent {
            hash: hash.map(String::from),
            name: None,
            status,
        }
    }

    fn notification(id: Option<&str>, data: NotificationData) -> Notification {
        Notification {
            id: id.map(String::from),
            data,
            ..Default::default()
        }
    }

    #[test]
    fn test_counts_are_not_exclusive() {
        let mut torrents = Torrents::default();
        torrents.torrents.insert(
            "a".into(),
            torrent(Some("a"), vec![TorrentStatus::Seeding, TorrentStatus::Active]),
        );
        torrents
            .torrents
            .insert("b".into(), torrent(Some("b"), vec![TorrentStatus::Stopped]));
        torrents.torrents.insert(
            "c".into(),
            torrent(Some("c"), vec![TorrentStatus::Complete, TorrentStatus::Other]),
        );

        let counts = torrents.counts();
        assert_eq!(
            counts,
            TorrentCounts {
                count: 3,
                completed: 1,
                downloading: 0,
                seeding: 1,
                stopped: 1,
                inactive: 0,
                active: 1,
            }
        );
    }

    #[test]
    fn test_hashes_fall_back_to_key() {
        let mut torrents = Torrents::default();
        torrents.torrents.insert("abc".into(), torrent(None, vec![]));
        torrents
            .torrents
            .insert("def".into(), torrent(Some("DEF"), vec![]));
        assert_eq!(torrents.hashes(), vec!["abc", "DEF"]);
    }

    #[test]
    fn test_latest_history() {
        let history = TransferHistory {
            download: vec![100.0, 2048.0],
            upload: vec![],
            timestamps: vec![1, 2],
        };
        let latest = history.latest();
        assert_eq!(latest.download_speed, Some(2048.0));
        assert_eq!(latest.upload_speed, None);
        assert_eq!(latest.download_speed_kb(), Some(2));
        assert_eq!(latest.upload_speed_kb(), None);
    }

    #[test]
    fn test_notification_labels() {
        let data = NotificationData {
            name: Some("Ubuntu".into()),
            ..Default::default()
        };
        assert_eq!(
            notification(Some("notification.torrent.errored"), data.clone()).label(),
            "Errored"
        );
        assert_eq!(
            notification(Some("notification.feed.torrent.added"), data.clone()).label(),
            "Added from feed name not found"
        );
        assert_eq!(
            notification(Some("notification.custom"), data.clone()).label(),
            "notification.custom"
        );

        let feed = NotificationData {
            title: Some("Debian".into()),
            feed_label: Some("Linux ISOs".into()),
            ..Default::default()
        };
        let summary = notification(Some("notification.feed.torrent.added"), feed).summarize();
        assert_eq!(summary.title, "Added from Linux ISOs: Debian");
        assert_eq!(summary.torrent, "Debian");
    }

    #[test]
    fn test_notification_placeholders() {
        let summary = notification(None, NotificationData::default()).summarize();
        assert_eq!(
            summary.title,
            "notification type not found: torrent name not found"
        );
        assert_eq!(summary.notification_type, "notification type not found");
        assert_eq!(summary.torrent, "torrent name not found");
    }

    #[test]
    fn test_speed_limit_options() {
        assert_eq!(
            speed_limit_options(51_200, &[1024, 10_240, 102_400]),
            vec![1, 10, 50, 100]
        );
        assert_eq!(speed_limit_options(10_240, &[10_240, 0]), vec![0, 10]);
    }

    #[test]
    fn test_snapshot_limits() {
        let snapshot = Snapshot {
            client_settings: ClientSettings {
                throttle_global_down_speed: Some(51_200),
                throttle_global_up_speed: None,
                ..Default::default()
            },
            settings: Settings {
                speed_limits: Some(SpeedLimits {
                    download: vec![1024, 2048],
                    upload: vec![4096],
                }),
                ..Default::default()
            },
            last_notification: None,
            history: HistorySummary::default(),
            torrents: TorrentCounts::default(),
            connected: ConnectionStatus { status: true },
        };
        assert_eq!(snapshot.download_limit_kb(), Some(50));
        assert_eq!(snapshot.upload_limit_kb(), None);
        assert_eq!(snapshot.download_limit_options(), vec![1, 2, 50]);
        assert_eq!(snapshot.upload_limit_options(), vec![0, 4]);
    }

    #[test]
    fn test_format_speed() {
        assert_eq!("98.77 KB/s", format_speed(98_765.0));
        assert_eq!(to_kilobytes(51_300.0), 50);
    }
}
