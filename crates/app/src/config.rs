//! Configuration parsing for the map host.
//!
//! CLI flags (each with a `QUAKEMAP_*` environment fallback) are validated
//! once into a [`MapConfig`] that the session and server use without
//! re-parsing anything.

use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use clap::Args;
use feed_ingest::{FeedKind, FeedSource, FetchOptions};
use quake_core::{ComposerConfig, MapView, compose::DEFAULT_TILE_URL, feature::LatLng};

pub const DEFAULT_EARTHQUAKES_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_week.geojson";
pub const DEFAULT_FAULTS_URL: &str =
    "https://raw.githubusercontent.com/fraxen/tectonicplates/master/GeoJSON/PB2002_plates.json";

const MAX_ZOOM: u8 = 22;

#[derive(Clone, Debug)]
/// Canonical settings shared by the session loop and the page renderer.
pub struct MapConfig {
    /// Earthquake feature collection endpoint.
    pub earthquakes_url: String,
    /// Plate boundary feature collection endpoint.
    pub faults_url: String,
    /// Base layers, view and time window handed to the composer.
    pub composer: ComposerConfig,
    /// Options for both fetch threads.
    pub fetch: FetchOptions,
}

impl MapConfig {
    pub fn feed_sources(&self) -> Vec<FeedSource> {
        vec![
            FeedSource {
                kind: FeedKind::Earthquakes,
                url: self.earthquakes_url.clone(),
            },
            FeedSource {
                kind: FeedKind::FaultLines,
                url: self.faults_url.clone(),
            },
        ]
    }
}

#[derive(Clone, Debug)]
/// Settings for `quakemap serve`.
pub struct ServeConfig {
    pub map: MapConfig,
    pub bind: String,
    pub port: u16,
}

/// Map and feed flags shared by every subcommand.
#[derive(Debug, Args)]
pub struct MapArgs {
    /// Earthquake feed URL.
    #[arg(long = "earthquakes-url", env = "QUAKEMAP_EARTHQUAKES_URL", value_name = "URL",
          default_value = DEFAULT_EARTHQUAKES_URL)]
    pub earthquakes_url: String,
    /// Fault line feed URL.
    #[arg(long = "faults-url", env = "QUAKEMAP_FAULTS_URL", value_name = "URL",
          default_value = DEFAULT_FAULTS_URL)]
    pub faults_url: String,
    /// Tile URL template with {id}, {z}, {x}, {y} and {accessToken} placeholders.
    #[arg(long = "tile-url", env = "QUAKEMAP_TILE_URL", value_name = "TEMPLATE",
          default_value = DEFAULT_TILE_URL)]
    pub tile_url: String,
    /// Access token embedded in tile requests.
    #[arg(long = "access-token", env = "QUAKEMAP_ACCESS_TOKEN", value_name = "TOKEN",
          hide_env_values = true)]
    pub access_token: Option<String>,
    /// Initial map center latitude.
    #[arg(long = "center-lat", env = "QUAKEMAP_CENTER_LAT", value_name = "DEG",
          allow_negative_numbers = true)]
    pub center_lat: Option<f64>,
    /// Initial map center longitude.
    #[arg(long = "center-lon", env = "QUAKEMAP_CENTER_LON", value_name = "DEG",
          allow_negative_numbers = true)]
    pub center_lon: Option<f64>,
    /// Initial zoom level.
    #[arg(long = "zoom", env = "QUAKEMAP_ZOOM", value_name = "LEVEL")]
    pub zoom: Option<u8>,
    /// Only show earthquakes this many minutes before the selected time.
    #[arg(long = "time-window-mins", env = "QUAKEMAP_TIME_WINDOW_MINS", value_name = "MINUTES")]
    pub time_window_mins: Option<u64>,
    /// Give up on a feed request after this many seconds (default: wait forever).
    #[arg(long = "fetch-timeout-secs", env = "QUAKEMAP_FETCH_TIMEOUT_SECS", value_name = "SECS")]
    pub fetch_timeout_secs: Option<u64>,
}

/// Flags accepted by the `serve` subcommand.
#[derive(Debug, Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub map: MapArgs,
    /// Address the HTTP server binds to.
    #[arg(long = "bind", env = "QUAKEMAP_BIND", value_name = "ADDR", default_value = "0.0.0.0")]
    pub bind: String,
    /// Port the HTTP server listens on.
    #[arg(long = "port", env = "QUAKEMAP_PORT", value_name = "PORT", default_value_t = 8080)]
    pub port: u16,
}

impl TryFrom<MapArgs> for MapConfig {
    type Error = anyhow::Error;

    fn try_from(args: MapArgs) -> Result<Self> {
        let access_token = args
            .access_token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                anyhow!("Missing tile access token. Provide --access-token or QUAKEMAP_ACCESS_TOKEN.")
            })?;

        for (flag, url) in [
            ("--earthquakes-url", &args.earthquakes_url),
            ("--faults-url", &args.faults_url),
            ("--tile-url", &args.tile_url),
        ] {
            if url.trim().is_empty() {
                bail!("{flag} must not be empty");
            }
        }
        for placeholder in ["{z}", "{x}", "{y}"] {
            if !args.tile_url.contains(placeholder) {
                bail!("--tile-url must contain the {placeholder} placeholder");
            }
        }

        let defaults = MapView::default();
        let lat = args.center_lat.unwrap_or(defaults.center.lat);
        let lon = args.center_lon.unwrap_or(defaults.center.lon);
        if !(-90.0..=90.0).contains(&lat) {
            bail!("--center-lat must be between -90 and 90");
        }
        if !(-180.0..=180.0).contains(&lon) {
            bail!("--center-lon must be between -180 and 180");
        }
        let zoom = args.zoom.unwrap_or(defaults.zoom);
        if zoom > MAX_ZOOM {
            bail!("--zoom must be at most {MAX_ZOOM}");
        }

        let time_window_ms = match args.time_window_mins {
            Some(0) => bail!("--time-window-mins must be at least 1"),
            Some(minutes) => Some(
                i64::try_from(minutes.saturating_mul(60_000))
                    .map_err(|_| anyhow!("--time-window-mins is too large"))?,
            ),
            None => None,
        };
        let timeout = match args.fetch_timeout_secs {
            Some(0) => bail!("--fetch-timeout-secs must be at least 1"),
            other => other.map(Duration::from_secs),
        };

        let mut composer = ComposerConfig::new(access_token);
        composer.view = MapView {
            center: LatLng::new(lat, lon),
            zoom,
        };
        composer.tile_url_template = args.tile_url;
        composer.time_window_ms = time_window_ms;

        Ok(Self {
            earthquakes_url: args.earthquakes_url,
            faults_url: args.faults_url,
            composer,
            fetch: FetchOptions { timeout },
        })
    }
}

impl TryFrom<ServeArgs> for ServeConfig {
    type Error = anyhow::Error;

    fn try_from(args: ServeArgs) -> Result<Self> {
        if args.port == 0 {
            bail!("--port must be between 1 and 65535");
        }
        Ok(Self {
            map: MapConfig::try_from(args.map)?,
            bind: args.bind,
            port: args.port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> MapArgs {
        MapArgs {
            earthquakes_url: DEFAULT_EARTHQUAKES_URL.into(),
            faults_url: DEFAULT_FAULTS_URL.into(),
            tile_url: DEFAULT_TILE_URL.into(),
            access_token: Some("pk.abc".into()),
            center_lat: None,
            center_lon: None,
            zoom: None,
            time_window_mins: None,
            fetch_timeout_secs: None,
        }
    }

    #[test]
    fn defaults_match_the_classic_page() {
        let config = MapConfig::try_from(args()).unwrap();
        assert_eq!(config.composer.view, MapView::default());
        assert_eq!(config.composer.access_token, "pk.abc");
        assert_eq!(config.composer.base_layers.len(), 2);
        assert_eq!(config.composer.time_window_ms, None);
        assert!(config.fetch.timeout.is_none());

        let sources = config.feed_sources();
        assert_eq!(sources[0].kind, FeedKind::Earthquakes);
        assert_eq!(sources[0].url, DEFAULT_EARTHQUAKES_URL);
        assert_eq!(sources[1].kind, FeedKind::FaultLines);
    }

    #[test]
    fn access_token_is_required() {
        let mut missing = args();
        missing.access_token = None;
        assert!(MapConfig::try_from(missing).is_err());

        let mut blank = args();
        blank.access_token = Some("  ".into());
        assert!(MapConfig::try_from(blank).is_err());
    }

    #[test]
    fn view_and_window_are_validated() {
        let mut bad_lat = args();
        bad_lat.center_lat = Some(91.0);
        assert!(MapConfig::try_from(bad_lat).is_err());

        let mut bad_zoom = args();
        bad_zoom.zoom = Some(30);
        assert!(MapConfig::try_from(bad_zoom).is_err());

        let mut zero_window = args();
        zero_window.time_window_mins = Some(0);
        assert!(MapConfig::try_from(zero_window).is_err());

        let mut custom = args();
        custom.center_lat = Some(-33.9);
        custom.center_lon = Some(151.2);
        custom.zoom = Some(6);
        custom.time_window_mins = Some(90);
        custom.fetch_timeout_secs = Some(20);
        let config = MapConfig::try_from(custom).unwrap();
        assert_eq!(config.composer.view.center, LatLng::new(-33.9, 151.2));
        assert_eq!(config.composer.view.zoom, 6);
        assert_eq!(config.composer.time_window_ms, Some(5_400_000));
        assert_eq!(config.fetch.timeout, Some(Duration::from_secs(20)));
    }

    #[test]
    fn tile_template_needs_tile_coordinates() {
        let mut bad = args();
        bad.tile_url = "https://tiles.example/static.png".into();
        assert!(MapConfig::try_from(bad).is_err());
    }
}
