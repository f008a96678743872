//!# Flood API Client
//!
//! A Rust client library for the [Flood](https://github.com/jesec/flood) torrent web UI API.
//! Built for pollers that periodically read a snapshot of the backend and expose it to
//! sensors, with a strongly-typed interface.
//!
//! ## Features
//!
//! - Cookie-based authentication, with transparent re-authentication on expired sessions
//! - Transfer rates from the history endpoint
//! - Torrent totals per status
//! - Classified summary of the latest notification
//! - Global download and upload limits, set in kB/s
//! - Start and stop all torrents
//! - One call snapshot of everything above for pollers
//!
//! ## Usage example
//!
//! ```rust,no_run
//! use anyhow::Result;
//! use flood_client::client::FloodApi;
//! use flood_client::utils::format_speed;
//! use std::env;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<()> {
//!     let flood = {
//!         let host = env::var("FLOOD_HOST")?;
//!         let username = env::var("FLOOD_USERNAME")?;
//!         let password = env::var("FLOOD_PASSWORD")?;
//!         FloodApi::builder()
//!             .host(host)
//!             .port(3000)
//!             .username(username)
//!             .password(password)
//!             .build()?
//!     };
//!
//!     if !flood.auth().await? {
//!         anyhow::bail!("Flood rejected the credentials");
//!     }
//!
//!     let snapshot = flood.global_get().await?;
//!     println!(
//!         "torrents: {}, downloading: {}, download speed: {}",
//!         snapshot.torrents.count,
//!         snapshot.torrents.downloading,
//!         format_speed(snapshot.history.download_speed.unwrap_or_default())
//!     );
//!
//!     flood.set_download_limit(512).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod entities;
pub mod utils;
