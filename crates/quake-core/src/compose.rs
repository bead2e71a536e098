//! Layer composition: base maps at construction, then one overlay per feed as
//! each fetch completes, in whatever order they arrive.

use serde::Serialize;
use tracing::{debug, info};

use crate::{
    binder::Shape,
    error::FeedError,
    feature::{FaultLineFeature, parse_earthquakes, parse_fault_lines},
    legend::Legend,
    map::{
        ControlEntry, FaultLineLayer, Layer, LayerId, MapContext, MapView, OverlayHook, TileLayer,
    },
    time_dimension::{PointLayer, TimeDimensionLayer, shapes_visible_at},
};

pub const EARTHQUAKE_OVERLAY: &str = "Earthquake Points";
pub const FAULT_OVERLAY: &str = "Fault Lines";

pub const DEFAULT_TILE_URL: &str =
    "https://api.tiles.mapbox.com/v4/{id}/{z}/{x}/{y}.png?access_token={accessToken}";

#[derive(Clone, Debug, PartialEq)]
pub struct BaseLayerSpec {
    pub name: String,
    pub style_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComposerConfig {
    pub view: MapView,
    pub tile_url_template: String,
    pub access_token: String,
    /// The first entry is active at startup.
    pub base_layers: Vec<BaseLayerSpec>,
    /// Optional trailing window for the time control, in milliseconds.
    pub time_window_ms: Option<i64>,
}

impl ComposerConfig {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            view: MapView::default(),
            tile_url_template: DEFAULT_TILE_URL.to_string(),
            access_token: access_token.into(),
            base_layers: vec![
                BaseLayerSpec {
                    name: "Satellite Map".into(),
                    style_id: "mapbox.streets-satellite".into(),
                },
                BaseLayerSpec {
                    name: "Dark Map".into(),
                    style_id: "mapbox.dark".into(),
                },
            ],
            time_window_ms: None,
        }
    }
}

/// Owns the map context for the lifetime of a session. All mutation goes
/// through `&mut self`, so a single owner serialises it.
#[derive(Debug)]
pub struct MapComposer {
    context: MapContext,
    time_window_ms: Option<i64>,
    earthquakes: Option<LayerId>,
    faults: Option<LayerId>,
    earthquakes_settled: bool,
    faults_settled: bool,
    legend: Legend,
}

impl MapComposer {
    pub fn new(config: ComposerConfig) -> Self {
        let mut context = MapContext::new(config.view);
        for (index, spec) in config.base_layers.into_iter().enumerate() {
            let tiles = TileLayer {
                url_template: config.tile_url_template.clone(),
                style_id: spec.style_id,
                access_token: config.access_token.clone(),
            };
            context.add_base_layer(spec.name, tiles, index == 0);
        }
        Self {
            context,
            time_window_ms: config.time_window_ms,
            earthquakes: None,
            faults: None,
            earthquakes_settled: false,
            faults_settled: false,
            legend: Legend::build(),
        }
    }

    pub fn context(&self) -> &MapContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut MapContext {
        &mut self.context
    }

    pub fn legend(&self) -> &Legend {
        &self.legend
    }

    pub fn earthquake_layer_id(&self) -> Option<LayerId> {
        self.earthquakes
    }

    pub fn fault_layer_id(&self) -> Option<LayerId> {
        self.faults
    }

    /// True once both feed completions were handled, successful or not.
    pub fn is_complete(&self) -> bool {
        self.earthquakes_settled && self.faults_settled
    }

    pub fn earthquakes(&self) -> Option<&TimeDimensionLayer> {
        match self.context.layer(self.earthquakes?)? {
            Layer::Earthquakes(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn earthquakes_mut(&mut self) -> Option<&mut TimeDimensionLayer> {
        match self.context.layer_mut(self.earthquakes?)? {
            Layer::Earthquakes(layer) => Some(layer),
            _ => None,
        }
    }

    pub fn fault_lines(&self) -> Option<&FaultLineLayer> {
        match self.context.layer(self.faults?)? {
            Layer::FaultLines(layer) => Some(layer),
            _ => None,
        }
    }

    /// Handle completion of the earthquake fetch. On any error the overlay is
    /// simply not built; the error is handed back for logging.
    pub fn on_earthquake_feed(
        &mut self,
        document: Result<String, FeedError>,
    ) -> Result<LayerId, FeedError> {
        self.earthquakes_settled = true;
        let features = document.and_then(|body| parse_earthquakes(&body))?;
        let points = PointLayer::from_features(&features);
        let mut layer = TimeDimensionLayer::new(points);
        if let Some(window) = self.time_window_ms {
            layer = layer.with_duration(window);
        }
        info!(
            "Composed {} earthquake markers ({} interactive)",
            layer.points().len(),
            layer.points().interactions().len()
        );

        if let Some(id) = self.earthquakes {
            debug!("Replacing earthquake overlay contents");
            if let Some(slot) = self.context.layer_mut(id) {
                *slot = Layer::Earthquakes(layer);
            }
            return Ok(id);
        }

        let id = self
            .context
            .add_overlay(EARTHQUAKE_OVERLAY, Layer::Earthquakes(layer));
        self.context.on_overlay_add(OverlayHook::KeepOnTop(id));
        self.context.bring_to_front(id);
        self.earthquakes = Some(id);
        Ok(id)
    }

    /// Handle completion of the fault-line fetch, then raise the earthquake
    /// overlay if it already exists.
    pub fn on_fault_feed(
        &mut self,
        document: Result<String, FeedError>,
    ) -> Result<LayerId, FeedError> {
        self.faults_settled = true;
        let lines = document.and_then(|body| parse_fault_lines(&body))?;
        info!("Composed {} fault line paths", lines.len());

        let layer = Layer::FaultLines(FaultLineLayer { lines });
        let id = match self.faults {
            Some(id) => {
                if let Some(slot) = self.context.layer_mut(id) {
                    *slot = layer;
                }
                id
            }
            None => {
                let id = self.context.add_overlay(FAULT_OVERLAY, layer);
                self.faults = Some(id);
                id
            }
        };

        match self.earthquakes {
            Some(quakes) => {
                self.context.bring_to_front(quakes);
            }
            None => debug!("Earthquake overlay not built yet; nothing to raise"),
        }
        Ok(id)
    }

    pub fn snapshot(&self) -> MapSnapshot {
        let context = &self.context;
        let active = context.active_base();

        let base_layers = context
            .control()
            .base_layers
            .iter()
            .filter_map(|ControlEntry { name, id }| match context.layer(*id)? {
                Layer::Tile(tiles) => Some(BaseLayerView {
                    id: *id,
                    name: name.clone(),
                    url: tiles.leaflet_url(),
                    active: active == Some(*id),
                }),
                _ => None,
            })
            .collect();

        let overlays = context
            .control()
            .overlays
            .iter()
            .filter_map(|ControlEntry { name, id }| {
                let layer = context.layer(*id)?;
                Some(OverlayView {
                    id: *id,
                    name: name.clone(),
                    kind: layer.kind(),
                    visible: context.is_attached(*id),
                    z_index: context.z_index(*id),
                })
            })
            .collect();

        let earthquakes = self.earthquakes().map(|layer| EarthquakeView {
            time_range: layer.time_range(),
            current_time: layer.current_time(),
            available_times: layer.available_times().to_vec(),
            window_ms: layer.window_ms(),
            shapes: layer.points().shapes().to_vec(),
        });

        MapSnapshot {
            view: context.view(),
            base_layers,
            overlays,
            render_order: context.render_order(),
            earthquakes,
            fault_lines: self.fault_lines().map(|layer| layer.lines.clone()),
            legend: self.legend.clone(),
            legend_html: self.legend.to_html(),
            complete: self.is_complete(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct BaseLayerView {
    pub id: LayerId,
    pub name: String,
    pub url: String,
    pub active: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct OverlayView {
    pub id: LayerId,
    pub name: String,
    pub kind: &'static str,
    pub visible: bool,
    pub z_index: Option<usize>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EarthquakeView {
    pub time_range: Option<(i64, i64)>,
    pub current_time: Option<i64>,
    pub available_times: Vec<i64>,
    pub window_ms: Option<i64>,
    pub shapes: Vec<Shape>,
}

impl EarthquakeView {
    pub fn visible_at(&self, instant: i64) -> Vec<&Shape> {
        shapes_visible_at(&self.shapes, Some(instant), self.window_ms)
    }

    /// Shapes at the layer's current time. Untimed shapes are always included.
    pub fn visible_now(&self) -> Vec<&Shape> {
        shapes_visible_at(&self.shapes, self.current_time, self.window_ms)
    }
}

/// Everything the page needs to draw the current state of the map.
#[derive(Clone, Debug, Serialize)]
pub struct MapSnapshot {
    pub view: MapView,
    pub base_layers: Vec<BaseLayerView>,
    pub overlays: Vec<OverlayView>,
    pub render_order: Vec<LayerId>,
    pub earthquakes: Option<EarthquakeView>,
    pub fault_lines: Option<Vec<FaultLineFeature>>,
    pub legend: Legend,
    pub legend_html: String,
    /// No further feed completions will change this map.
    pub complete: bool,
}
