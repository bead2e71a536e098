//! Explicit map context: the layers, the layer control entries, the stacking
//! order and the overlay-add hooks.
//!
//! Base layers live in the tile pane and are therefore always drawn beneath
//! every overlay; only overlays take part in the stacking order.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::{
    feature::{FaultLineFeature, LatLng},
    time_dimension::TimeDimensionLayer,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LayerId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: u8,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: LatLng::new(51.505, -0.09),
            zoom: 4,
        }
    }
}

/// Slippy-map imagery addressed through a URL template.
#[derive(Clone, Debug, PartialEq)]
pub struct TileLayer {
    pub url_template: String,
    pub style_id: String,
    pub access_token: String,
}

impl TileLayer {
    /// Template with the style and credential filled in; `{z}`, `{x}` and `{y}`
    /// are left for the map widget.
    pub fn leaflet_url(&self) -> String {
        let mut values: HashMap<&str, &str> = HashMap::new();
        values.insert("id", &self.style_id);
        values.insert("accessToken", &self.access_token);
        fill_template(&self.url_template, &values)
    }
}

fn fill_template(template: &str, values: &HashMap<&str, &str>) -> String {
    let mut url = template.to_string();
    for (key, value) in values {
        url = url.replace(&format!("{{{key}}}"), value);
    }
    url
}

/// Connected plate-boundary paths drawn as polylines.
#[derive(Clone, Debug, PartialEq)]
pub struct FaultLineLayer {
    pub lines: Vec<FaultLineFeature>,
}

#[derive(Clone, Debug)]
pub enum Layer {
    Tile(TileLayer),
    Earthquakes(TimeDimensionLayer),
    FaultLines(FaultLineLayer),
}

impl Layer {
    pub fn kind(&self) -> &'static str {
        match self {
            Layer::Tile(_) => "tile",
            Layer::Earthquakes(_) => "earthquakes",
            Layer::FaultLines(_) => "fault_lines",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ControlEntry {
    pub name: String,
    pub id: LayerId,
}

/// Entries shown in the layer switcher, in registration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct LayerControl {
    pub base_layers: Vec<ControlEntry>,
    pub overlays: Vec<ControlEntry>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapEvent {
    OverlayAdd(LayerId),
    OverlayRemove(LayerId),
    BaseLayerChange(LayerId),
}

/// Standing reactions to overlay-add events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayHook {
    KeepOnTop(LayerId),
}

#[derive(Debug)]
pub struct MapContext {
    view: MapView,
    layers: BTreeMap<LayerId, Layer>,
    control: LayerControl,
    active_base: Option<LayerId>,
    /// Attached overlays, bottom to top.
    overlay_stack: Vec<LayerId>,
    hooks: Vec<OverlayHook>,
    events: Vec<MapEvent>,
    next_id: u32,
}

impl MapContext {
    pub fn new(view: MapView) -> Self {
        Self {
            view,
            layers: BTreeMap::new(),
            control: LayerControl::default(),
            active_base: None,
            overlay_stack: Vec::new(),
            hooks: Vec::new(),
            events: Vec::new(),
            next_id: 0,
        }
    }

    pub fn view(&self) -> MapView {
        self.view
    }

    pub fn control(&self) -> &LayerControl {
        &self.control
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(&id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.get_mut(&id)
    }

    pub fn active_base(&self) -> Option<LayerId> {
        self.active_base
    }

    /// Every event fired so far, oldest first.
    pub fn events(&self) -> &[MapEvent] {
        &self.events
    }

    pub fn overlay_id(&self, name: &str) -> Option<LayerId> {
        self.control
            .overlays
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.id)
    }

    pub fn base_layer_id(&self, name: &str) -> Option<LayerId> {
        self.control
            .base_layers
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.id)
    }

    /// Register a base layer. The first one registered, or any registered with
    /// `active`, becomes the visible basemap.
    pub fn add_base_layer(
        &mut self,
        name: impl Into<String>,
        tiles: TileLayer,
        active: bool,
    ) -> LayerId {
        let id = self.insert(Layer::Tile(tiles));
        self.control.base_layers.push(ControlEntry {
            name: name.into(),
            id,
        });
        if active || self.active_base.is_none() {
            self.active_base = Some(id);
        }
        id
    }

    /// Attach an overlay on top of the stack and list it in the control.
    pub fn add_overlay(&mut self, name: impl Into<String>, layer: Layer) -> LayerId {
        let id = self.insert(layer);
        self.control.overlays.push(ControlEntry {
            name: name.into(),
            id,
        });
        self.attach(id);
        id
    }

    pub fn is_attached(&self, id: LayerId) -> bool {
        self.overlay_stack.contains(&id)
    }

    /// Toggle an overlay as its checkbox would. Returns whether anything changed.
    pub fn set_overlay_visible(&mut self, id: LayerId, visible: bool) -> bool {
        if !self.control.overlays.iter().any(|entry| entry.id == id) {
            return false;
        }
        match (visible, self.is_attached(id)) {
            (true, false) => {
                self.attach(id);
                true
            }
            (false, true) => {
                self.overlay_stack.retain(|attached| *attached != id);
                self.fire(MapEvent::OverlayRemove(id));
                true
            }
            _ => false,
        }
    }

    /// Switch the basemap. Unknown ids and the already-active layer are ignored.
    pub fn select_base_layer(&mut self, id: LayerId) -> bool {
        let known = self.control.base_layers.iter().any(|entry| entry.id == id);
        if !known || self.active_base == Some(id) {
            return false;
        }
        self.active_base = Some(id);
        self.fire(MapEvent::BaseLayerChange(id));
        true
    }

    /// Raise an attached overlay to the top. Silently does nothing for layers
    /// that are unknown or currently hidden.
    pub fn bring_to_front(&mut self, id: LayerId) -> bool {
        let Some(position) = self.overlay_stack.iter().position(|attached| *attached == id) else {
            return false;
        };
        let raised = self.overlay_stack.remove(position);
        self.overlay_stack.push(raised);
        true
    }

    pub fn on_overlay_add(&mut self, hook: OverlayHook) {
        if !self.hooks.contains(&hook) {
            self.hooks.push(hook);
        }
    }

    /// Active basemap first, then attached overlays from bottom to top.
    pub fn render_order(&self) -> Vec<LayerId> {
        self.active_base
            .iter()
            .chain(self.overlay_stack.iter())
            .copied()
            .collect()
    }

    /// Stack position of an attached overlay, 0 being the lowest.
    pub fn z_index(&self, id: LayerId) -> Option<usize> {
        self.overlay_stack.iter().position(|attached| *attached == id)
    }

    pub fn topmost_overlay(&self) -> Option<LayerId> {
        self.overlay_stack.last().copied()
    }

    pub fn attached_overlay_count(&self) -> usize {
        self.overlay_stack.len()
    }

    fn insert(&mut self, layer: Layer) -> LayerId {
        let id = LayerId(self.next_id);
        self.next_id += 1;
        self.layers.insert(id, layer);
        id
    }

    fn attach(&mut self, id: LayerId) {
        self.overlay_stack.push(id);
        self.fire(MapEvent::OverlayAdd(id));
    }

    fn fire(&mut self, event: MapEvent) {
        debug!("map event {event:?}");
        self.events.push(event);
        if let MapEvent::OverlayAdd(_) = event {
            let hooks = self.hooks.clone();
            for hook in hooks {
                match hook {
                    OverlayHook::KeepOnTop(target) => {
                        self.bring_to_front(target);
                    }
                }
            }
        }
    }
}
