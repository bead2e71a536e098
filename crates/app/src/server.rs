//! Actix Web server exposing the map page, the composed layers, and metrics.
//!
//! The server runs on a dedicated thread so the session loop stays the only
//! owner of the map. Handlers read the most recently published snapshot.

use std::net::TcpListener;

use actix_web::{App, HttpResponse, HttpServer, web};
use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusHandle;
use quake_core::{MapSnapshot, format_timestamp};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::oneshot;
use tracing::error;

use crate::{config::ServeConfig, html, session::SharedSnapshot};

/// Shared state backing HTTP handlers.
pub(crate) struct ServerState {
    pub(crate) snapshot: SharedSnapshot,
    pub(crate) page: String,
    pub(crate) metrics: Option<&'static PrometheusHandle>,
}

#[derive(Default)]
/// Handle for the map server thread.
pub(crate) struct MapServer {
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl MapServer {
    /// Signal the server to stop and block until the thread exits.
    pub(crate) fn stop(self) {
        if let Some(tx) = self.shutdown {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle {
            let _ = handle.join();
        }
    }
}

#[derive(Deserialize)]
struct TimeQuery {
    until: Option<i64>,
}

/// Bind the listening socket, then spawn the server thread and return a
/// handle that can stop it. Bind failures are returned to the caller.
pub(crate) fn spawn_map_server(
    config: &ServeConfig,
    snapshot: SharedSnapshot,
    metrics: Option<&'static PrometheusHandle>,
) -> Result<MapServer> {
    let page = html::render_page(&config.map);
    let listener = TcpListener::bind((config.bind.as_str(), config.port)).with_context(|| {
        format!("Failed to bind map server to {}:{}", config.bind, config.port)
    })?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let handle = std::thread::Builder::new()
        .name("quakemap-server".into())
        .spawn(move || {
            if let Err(err) = actix_web::rt::System::new().block_on(async move {
                let state = web::Data::new(ServerState {
                    snapshot,
                    page,
                    metrics,
                });
                let server = HttpServer::new(move || {
                    App::new().app_data(state.clone()).configure(routes)
                })
                .listen(listener)?
                .run();

                let srv_handle = server.handle();
                actix_web::rt::spawn(async move {
                    let _ = shutdown_rx.await;
                    srv_handle.stop(true).await;
                });

                server.await
            }) {
                error!("HTTP server error: {err}");
            }
        })
        .context("Failed to spawn map server thread")?;
    Ok(MapServer {
        shutdown: Some(shutdown_tx),
        handle: Some(handle),
    })
}

pub(crate) fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index_route))
        .route("/api/map", web::get().to(map_handler))
        .route("/api/earthquakes", web::get().to(earthquakes_handler))
        .route("/api/faults", web::get().to(faults_handler))
        .route("/api/legend", web::get().to(legend_handler))
        .route("/metrics", web::get().to(metrics_handler));
}

/// Clone the latest snapshot out of the shared slot.
fn latest_snapshot(state: &ServerState) -> Option<MapSnapshot> {
    match state.snapshot.lock() {
        Ok(guard) => guard.clone(),
        Err(_) => None,
    }
}

/// Serve the Leaflet page.
async fn index_route(state: web::Data<ServerState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(state.page.clone())
}

/// Return the full composed map.
async fn map_handler(state: web::Data<ServerState>) -> HttpResponse {
    match latest_snapshot(&state) {
        Some(snapshot) => HttpResponse::Ok().json(snapshot),
        None => HttpResponse::ServiceUnavailable().finish(),
    }
}

/// Earthquake markers visible at `until`, or at the layer's current time.
/// Markers without a time are always included. Answers 204 while the
/// earthquake overlay does not exist.
async fn earthquakes_handler(
    query: web::Query<TimeQuery>,
    state: web::Data<ServerState>,
) -> HttpResponse {
    let Some(quakes) = latest_snapshot(&state).and_then(|snapshot| snapshot.earthquakes) else {
        return HttpResponse::NoContent().finish();
    };
    let instant = query.until.or(quakes.current_time);
    let shapes = match query.until {
        Some(until) => quakes.visible_at(until),
        None => quakes.visible_now(),
    };

    let features: Vec<Value> = shapes
        .iter()
        .map(|shape| {
            json!({
                "type": "Feature",
                "id": shape.id,
                "geometry": {
                    "type": "Point",
                    "coordinates": [shape.position.lon, shape.position.lat],
                },
                "properties": {
                    "mag": shape.magnitude,
                    "depth": shape.depth_km,
                    "time": shape.occurred_at,
                    "style": shape.style,
                    "popup": shape.popup.as_ref().map(|popup| popup.html.as_str()),
                },
            })
        })
        .collect();

    HttpResponse::Ok().json(json!({
        "type": "FeatureCollection",
        "time": instant,
        "timeLabel": instant.map(format_timestamp),
        "features": features,
    }))
}

/// Plate boundaries as GeoJSON lines. Answers 204 while the overlay is absent.
async fn faults_handler(state: web::Data<ServerState>) -> HttpResponse {
    let Some(lines) = latest_snapshot(&state).and_then(|snapshot| snapshot.fault_lines) else {
        return HttpResponse::NoContent().finish();
    };
    let features: Vec<Value> = lines
        .iter()
        .map(|line| {
            let coordinates: Vec<[f64; 2]> = line
                .vertices
                .iter()
                .map(|vertex| [vertex.lon, vertex.lat])
                .collect();
            json!({
                "type": "Feature",
                "properties": { "name": line.name },
                "geometry": { "type": "LineString", "coordinates": coordinates },
            })
        })
        .collect();
    HttpResponse::Ok().json(json!({
        "type": "FeatureCollection",
        "features": features,
    }))
}

async fn legend_handler() -> HttpResponse {
    let legend = quake_core::Legend::build();
    HttpResponse::Ok().json(json!({
        "position": legend.position,
        "entries": legend.entries,
        "html": legend.to_html(),
    }))
}

/// Prometheus text exposition.
async fn metrics_handler(state: web::Data<ServerState>) -> HttpResponse {
    match state.metrics {
        Some(handle) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(handle.render()),
        None => HttpResponse::NotFound().finish(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use feed_ingest::FetchOptions;

    use actix_web::{http::StatusCode, test};
    use quake_core::{ComposerConfig, MapComposer};

    use crate::config::MapConfig;

    use super::*;

    const QUAKES: &str = r#"{"features":[
        {"properties":{"mag":4.2,"title":"M 4.2 - Hokkaido","time":1000},
         "geometry":{"type":"Point","coordinates":[142.0,42.5,30.0]}},
        {"properties":{"mag":6.8,"title":"M 6.8 - Chile","time":5000},
         "geometry":{"type":"Point","coordinates":[-71.5,-30.1,40.0]}}]}"#;

    fn state(composer: Option<&MapComposer>) -> web::Data<ServerState> {
        web::Data::new(ServerState {
            snapshot: Arc::new(Mutex::new(composer.map(MapComposer::snapshot))),
            page: "<html>map</html>".into(),
            metrics: None,
        })
    }

    fn composed() -> MapComposer {
        let mut composer = MapComposer::new(ComposerConfig::new("pk.test"));
        composer.on_earthquake_feed(Ok(QUAKES.into())).unwrap();
        composer
    }

    #[actix_web::test]
    async fn earthquakes_filter_by_until() {
        let composer = composed();
        let app = test::init_service(App::new().app_data(state(Some(&composer))).configure(routes))
            .await;

        let req = test::TestRequest::get().uri("/api/earthquakes").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["features"].as_array().unwrap().len(), 2);
        assert_eq!(body["time"], 5000);

        let req = test::TestRequest::get()
            .uri("/api/earthquakes?until=1000")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let features = body["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["geometry"]["coordinates"][0], 142.0);
        assert_eq!(features[0]["properties"]["style"]["fillColor"], "#fec981");
        assert_eq!(features[0]["properties"]["depth"], 30.0);
        assert_eq!(body["timeLabel"], "January 1 - 0:00 UTC");
    }

    #[actix_web::test]
    async fn absent_overlays_answer_no_content() {
        let composer = MapComposer::new(ComposerConfig::new("pk.test"));
        let app = test::init_service(App::new().app_data(state(Some(&composer))).configure(routes))
            .await;

        for uri in ["/api/earthquakes", "/api/faults"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NO_CONTENT, "{uri}");
        }

        let req = test::TestRequest::get().uri("/api/map").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["overlays"].as_array().unwrap().len(), 0);
        assert_eq!(body["base_layers"].as_array().unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn map_is_unavailable_before_first_publish() {
        let app = test::init_service(App::new().app_data(state(None)).configure(routes)).await;
        let req = test::TestRequest::get().uri("/api/map").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn page_and_legend_are_served() {
        let app = test::init_service(App::new().app_data(state(None)).configure(routes)).await;
        let req = test::TestRequest::get().uri("/").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "<html>map</html>".as_bytes());

        let req = test::TestRequest::get().uri("/api/legend").to_request();
        let legend: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(legend["entries"].as_array().unwrap().len(), 6);
        assert_eq!(legend["entries"][5]["range"], "8+");
        assert_eq!(legend["position"], "bottomright");
    }

    fn serve_config(port: u16) -> ServeConfig {
        ServeConfig {
            map: MapConfig {
                earthquakes_url: "http://127.0.0.1:9/quakes".into(),
                faults_url: "http://127.0.0.1:9/faults".into(),
                composer: ComposerConfig::new("pk.test"),
                fetch: FetchOptions::default(),
            },
            bind: "127.0.0.1".into(),
            port,
        }
    }

    #[::core::prelude::v1::test]
    fn occupied_port_fails_to_spawn() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let shared = Arc::new(Mutex::new(None));

        let err = spawn_map_server(&serve_config(port), shared, None)
            .err()
            .expect("bind on an occupied port must fail");
        assert!(format!("{err:#}").contains("Failed to bind map server"));
    }

    #[::core::prelude::v1::test]
    fn free_port_serves_until_stopped() {
        let shared = Arc::new(Mutex::new(None));
        let server = spawn_map_server(&serve_config(0), shared, None).unwrap();
        server.stop();
    }
}
