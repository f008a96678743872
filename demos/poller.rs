use anyhow::{Result, bail};
use flood_client::client::{FloodApiBuilder, FloodError};
use flood_client::utils::format_speed;
use std::time::Duration;

const SCAN_INTERVAL: Duration = Duration::from_secs(30);

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let mut flood = FloodApiBuilder::from_env()?.build()?;

    match flood.auth().await {
        Ok(true) => {}
        Ok(false) => bail!("Flood rejected the credentials"),
        Err(error) => match error.downcast_ref::<FloodError>() {
            Some(FloodError::Authentication(_)) => bail!("Authentication error on Flood: {error}"),
            _ => bail!("Flood is not ready, try again later: {error}"),
        },
    }

    let mut interval = tokio::time::interval(SCAN_INTERVAL);
    for _ in 0..3 {
        interval.tick().await;
        match flood.global_get().await {
            Ok(snapshot) => {
                println!(
                    "{}: {} torrents ({} downloading, {} seeding), down {}, up {}, connected: {}",
                    flood.host(),
                    snapshot.torrents.count,
                    snapshot.torrents.downloading,
                    snapshot.torrents.seeding,
                    format_speed(snapshot.history.download_speed.unwrap_or_default()),
                    format_speed(snapshot.history.upload_speed.unwrap_or_default()),
                    snapshot.connected.status
                );
                if let Some(notification) = &snapshot.last_notification {
                    println!("last notification: {}", notification.title);
                }
                println!(
                    "download limit options (kB/s): {:?}",
                    snapshot.download_limit_options()
                );
            }
            Err(error) => println!("poll failed: {error:#}"),
        }
    }

    flood.close();
    Ok(())
}
