//! Session supervisor: spawns both feed fetches, applies their completions to
//! the map on this thread, and publishes a snapshot after every change.
//!
//! The composer never leaves the session thread, so raising the earthquake
//! overlay and every other map mutation happen in arrival order without locks.
//! The HTTP side only ever sees cloned snapshots.

use std::{
    sync::{
        Arc, Mutex, Once,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

use anyhow::{Context, Result};
use crossbeam_channel::RecvTimeoutError;
use feed_ingest::{FeedEvent, FeedKind, spawn_feed_readers};
use metrics::{counter, gauge};
use quake_core::{FeedError, LayerId, MapComposer, MapSnapshot};
use tracing::{debug, info, warn};

use crate::{
    config::{MapConfig, ServeConfig},
    server::spawn_map_server,
    telemetry,
};

const RECV_POLL: Duration = Duration::from_millis(250);

/// Latest composed map, shared with HTTP handlers.
pub(crate) type SharedSnapshot = Arc<Mutex<Option<MapSnapshot>>>;

/// Fetch both feeds and apply completions until both arrived or shutdown is
/// requested. `publish` runs once up front and after every applied event.
pub(crate) fn compose_map(
    config: &MapConfig,
    shutdown: &AtomicBool,
    mut publish: impl FnMut(&MapComposer),
) -> Result<MapComposer> {
    let span = tracing::info_span!(
        "quakemap.session",
        earthquakes = %config.earthquakes_url,
        faults = %config.faults_url,
        zoom = config.composer.view.zoom,
    );
    let _span_guard = span.enter();

    let mut composer = MapComposer::new(config.composer.clone());
    publish(&composer);

    let sources = config.feed_sources();
    let mut pending = sources.len();
    let events = spawn_feed_readers(sources, config.fetch)?;

    while pending > 0 {
        if shutdown.load(Ordering::SeqCst) {
            debug!("Shutdown requested with {pending} feed(s) outstanding");
            break;
        }
        match events.recv_timeout(RECV_POLL) {
            Ok(event) => {
                pending -= 1;
                apply_event(&mut composer, event);
                publish(&composer);
            }
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(composer)
}

/// Route one fetch completion to the composer. Failures only cost that overlay.
pub(crate) fn apply_event(composer: &mut MapComposer, event: FeedEvent) -> Option<LayerId> {
    let label = event.kind.label();
    counter!("quakemap_feed_fetches_total", "feed" => label).increment(1);

    let document = event
        .result
        .map_err(|err| FeedError::Unavailable(format!("{:#}", anyhow::Error::from(err))));
    let outcome = match event.kind {
        FeedKind::Earthquakes => composer.on_earthquake_feed(document),
        FeedKind::FaultLines => composer.on_fault_feed(document),
    };

    match outcome {
        Ok(id) => {
            if event.kind == FeedKind::Earthquakes {
                let shapes = composer
                    .earthquakes()
                    .map(|layer| layer.points().len())
                    .unwrap_or_default();
                counter!("quakemap_shapes_rendered_total").increment(shapes as u64);
            }
            gauge!("quakemap_overlays_attached")
                .set(composer.context().attached_overlay_count() as f64);
            info!("{label} overlay ready");
            Some(id)
        }
        Err(err) => {
            counter!("quakemap_feed_failures_total", "feed" => label).increment(1);
            warn!("{label} overlay unavailable: {err}");
            None
        }
    }
}

fn publish_into(shared: &SharedSnapshot, composer: &MapComposer) {
    let snapshot = composer.snapshot();
    match shared.lock() {
        Ok(mut guard) => *guard = Some(snapshot),
        Err(err) => warn!("Snapshot lock poisoned: {err}"),
    }
}

fn install_shutdown_handler() -> Arc<AtomicBool> {
    static CTRL_HANDLER: Once = Once::new();

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_shutdown = shutdown.clone();
    CTRL_HANDLER.call_once(move || {
        if let Err(err) = ctrlc::set_handler(move || {
            handler_shutdown.store(true, Ordering::SeqCst);
        }) {
            warn!("Failed to install Ctrl+C handler: {err}");
        }
    });
    shutdown
}

/// Serve the map page and API until Ctrl+C.
pub fn serve(config: ServeConfig) -> Result<()> {
    let shutdown = install_shutdown_handler();
    let metrics = telemetry::init_metrics_recorder();

    let shared: SharedSnapshot = Arc::new(Mutex::new(None));
    let server = spawn_map_server(&config, shared.clone(), Some(metrics))?;
    info!(
        "Map available at http://{}:{}/",
        config.bind, config.port
    );

    let composer = compose_map(&config.map, &shutdown, |composer| {
        publish_into(&shared, composer)
    })?;
    info!(
        "Composition finished with {} overlay(s)",
        composer.context().control().overlays.len()
    );

    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(RECV_POLL);
    }
    info!("Shutting down");
    server.stop();
    Ok(())
}

/// Fetch once, compose, and print the snapshot as JSON.
pub fn snapshot(config: MapConfig) -> Result<()> {
    let shutdown = install_shutdown_handler();
    let composer = compose_map(&config, &shutdown, |_| {})?;
    let json = serde_json::to_string_pretty(&composer.snapshot())
        .context("Failed to serialise map snapshot")?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{
        io::{Read, Write},
        net::TcpListener,
    };

    use feed_ingest::FetchError;
    use quake_core::{ComposerConfig, EARTHQUAKE_OVERLAY, FAULT_OVERLAY};

    use super::*;

    const QUAKES: &str = r#"{"features":[
        {"properties":{"mag":5.4,"title":"M 5.4 - Crete","time":1614931620000},
         "geometry":{"type":"Point","coordinates":[25.1,35.2,12.0]}}]}"#;
    const FAULTS: &str = r#"{"features":[
        {"properties":{"Name":"EU-AF"},
         "geometry":{"type":"LineString","coordinates":[[20.0,34.0],[26.0,35.0]]}}]}"#;

    fn composer() -> MapComposer {
        MapComposer::new(ComposerConfig::new("pk.test"))
    }

    fn event(kind: FeedKind, result: Result<String, FetchError>) -> FeedEvent {
        FeedEvent { kind, result }
    }

    fn serve_once(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        });
        format!("http://{addr}/")
    }

    #[test]
    fn failed_fetch_only_drops_its_overlay() {
        let mut composer = composer();
        let failure = FetchError::Status {
            url: "https://example.invalid/faults".into(),
            status: 404,
        };
        assert!(apply_event(&mut composer, event(FeedKind::FaultLines, Err(failure))).is_none());
        assert!(
            apply_event(&mut composer, event(FeedKind::Earthquakes, Ok(QUAKES.into()))).is_some()
        );

        let snapshot = composer.snapshot();
        assert_eq!(snapshot.overlays.len(), 1);
        assert_eq!(snapshot.overlays[0].name, EARTHQUAKE_OVERLAY);
        assert!(snapshot.fault_lines.is_none());
        assert!(snapshot.complete);
    }

    #[test]
    fn fault_completion_before_earthquakes_is_tolerated() {
        let mut composer = composer();
        let faults = apply_event(&mut composer, event(FeedKind::FaultLines, Ok(FAULTS.into())));
        let quakes = apply_event(&mut composer, event(FeedKind::Earthquakes, Ok(QUAKES.into())));
        assert!(faults.is_some());
        assert_eq!(composer.context().topmost_overlay(), quakes);
    }

    #[test]
    fn compose_map_publishes_after_each_completion() {
        let mut composer_config = ComposerConfig::new("pk.test");
        composer_config.base_layers.truncate(1);
        let closed = TcpListener::bind("127.0.0.1:0").unwrap();
        let closed_url = format!("http://{}/", closed.local_addr().unwrap());
        drop(closed);

        let config = MapConfig {
            earthquakes_url: serve_once(QUAKES),
            faults_url: closed_url,
            composer: composer_config,
            fetch: feed_ingest::FetchOptions {
                timeout: Some(Duration::from_secs(10)),
            },
        };
        let shutdown = AtomicBool::new(false);
        let mut published = Vec::new();
        let composer =
            compose_map(&config, &shutdown, |composer| published.push(composer.is_complete()))
                .unwrap();

        assert_eq!(published, vec![false, false, true]);
        assert!(composer.snapshot().complete);
        let overlays = &composer.context().control().overlays;
        assert_eq!(overlays.len(), 1);
        assert_eq!(overlays[0].name, EARTHQUAKE_OVERLAY);
        assert!(composer.context().overlay_id(FAULT_OVERLAY).is_none());
    }

    #[test]
    fn shutdown_stops_waiting_for_feeds() {
        let config = MapConfig {
            earthquakes_url: "http://127.0.0.1:9/".into(),
            faults_url: "http://127.0.0.1:9/".into(),
            composer: ComposerConfig::new("pk.test"),
            fetch: feed_ingest::FetchOptions::default(),
        };
        let shutdown = AtomicBool::new(true);
        let composer = compose_map(&config, &shutdown, |_| {}).unwrap();
        assert!(composer.context().control().overlays.is_empty());
        assert!(!composer.is_complete());
        assert_eq!(composer.context().control().base_layers.len(), 2);
    }
}
