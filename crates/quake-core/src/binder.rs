//! Turns earthquake features into styled circle markers and wires their hover
//! popups.
//!
//! Hover behaviour is data, not closures: every interactive shape gets a pair
//! of [`HoverAction`]s stored under its [`ShapeId`], and pointer events are
//! resolved against that table.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    classify::{StyleSpec, style_for},
    feature::{EarthquakeFeature, LatLng},
    format::build_popup_html,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ShapeId(pub u32);

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Popup {
    pub html: String,
    pub open: bool,
}

/// A circle marker as drawn on the point layer.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Shape {
    pub id: ShapeId,
    pub position: LatLng,
    pub style: StyleSpec,
    pub magnitude: Option<f64>,
    /// Hypocentre depth, when the point carries a third coordinate.
    pub depth_km: Option<f64>,
    /// Epoch milliseconds. Shapes without one stay out of the time range but
    /// are always drawn.
    pub occurred_at: Option<i64>,
    pub popup: Option<Popup>,
}

impl Shape {
    /// A bare marker at the feature's position, before styling or popups.
    pub fn circle_marker(id: ShapeId, feature: &EarthquakeFeature) -> Self {
        Self {
            id,
            position: feature.position,
            style: style_for(None),
            magnitude: None,
            depth_km: feature.depth_km,
            occurred_at: feature.occurred_at(),
            popup: None,
        }
    }

    pub fn popup_open(&self) -> bool {
        self.popup.as_ref().is_some_and(|popup| popup.open)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerEvent {
    Enter,
    Leave,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum HoverAction {
    OpenPopup,
    ClosePopup,
}

/// Handlers registered for one shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct HoverHandlers {
    pub on_enter: HoverAction,
    pub on_leave: HoverAction,
}

impl HoverHandlers {
    fn popup_toggle() -> Self {
        Self {
            on_enter: HoverAction::OpenPopup,
            on_leave: HoverAction::ClosePopup,
        }
    }

    pub fn action_for(&self, event: PointerEvent) -> HoverAction {
        match event {
            PointerEvent::Enter => self.on_enter,
            PointerEvent::Leave => self.on_leave,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct InteractionTable {
    handlers: BTreeMap<ShapeId, HoverHandlers>,
}

impl InteractionTable {
    pub fn handlers_for(&self, id: ShapeId) -> Option<&HoverHandlers> {
        self.handlers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Apply a pointer event to `shape`. Returns `false` when the shape has no
    /// registered handlers, in which case nothing changes.
    pub fn dispatch(&self, shape: &mut Shape, event: PointerEvent) -> bool {
        let Some(handlers) = self.handlers.get(&shape.id) else {
            return false;
        };
        let Some(popup) = shape.popup.as_mut() else {
            return false;
        };
        popup.open = match handlers.action_for(event) {
            HoverAction::OpenPopup => true,
            HoverAction::ClosePopup => false,
        };
        true
    }
}

/// Style `shape` from the feature's magnitude and, when the feature carries
/// properties, bind its popup and hover handlers.
pub fn bind_feature(feature: &EarthquakeFeature, shape: &mut Shape, table: &mut InteractionTable) {
    shape.magnitude = feature.magnitude();
    shape.style = style_for(shape.magnitude);

    let Some(properties) = feature.properties.as_ref() else {
        return;
    };
    shape.popup = Some(Popup {
        html: build_popup_html(properties),
        open: false,
    });
    table.handlers.insert(shape.id, HoverHandlers::popup_toggle());
}
