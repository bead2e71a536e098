//! Point layer of earthquake markers and the time-aware wrapper that filters
//! it by a selected instant.

use crate::binder::{InteractionTable, PointerEvent, Shape, ShapeId, bind_feature};
use crate::feature::EarthquakeFeature;

/// Styled, interactive markers built from one earthquake document.
#[derive(Clone, Debug, Default)]
pub struct PointLayer {
    shapes: Vec<Shape>,
    interactions: InteractionTable,
}

impl PointLayer {
    pub fn from_features(features: &[EarthquakeFeature]) -> Self {
        let mut layer = Self::default();
        for (index, feature) in features.iter().enumerate() {
            let id = ShapeId(index as u32);
            let mut shape = Shape::circle_marker(id, feature);
            bind_feature(feature, &mut shape, &mut layer.interactions);
            layer.shapes.push(shape);
        }
        layer
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|shape| shape.id == id)
    }

    pub fn interactions(&self) -> &InteractionTable {
        &self.interactions
    }

    /// Route a pointer event to a shape. Unknown shapes and shapes without
    /// handlers ignore it.
    pub fn pointer(&mut self, id: ShapeId, event: PointerEvent) -> bool {
        match self.shapes.iter_mut().find(|shape| shape.id == id) {
            Some(shape) => self.interactions.dispatch(shape, event),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}

/// Markers whose time is at or before `instant`, and no older than
/// `window_ms` before it when a window is set. Untimed markers always match,
/// and with no instant only they do.
pub fn shapes_visible_at(
    shapes: &[Shape],
    instant: Option<i64>,
    window_ms: Option<i64>,
) -> Vec<&Shape> {
    shapes
        .iter()
        .filter(|shape| match (shape.occurred_at, instant) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(at), Some(instant)) => {
                let earliest = window_ms.map(|window| instant.saturating_sub(window));
                at <= instant && earliest.is_none_or(|from| at >= from)
            }
        })
        .collect()
}

/// Wraps a [`PointLayer`] so only markers at or before the current time show.
#[derive(Clone, Debug)]
pub struct TimeDimensionLayer {
    points: PointLayer,
    times: Vec<i64>,
    current: Option<i64>,
    duration_ms: Option<i64>,
}

impl TimeDimensionLayer {
    /// Take the time range from the markers themselves and start at the latest
    /// instant, so everything is visible until the user scrubs back.
    pub fn new(points: PointLayer) -> Self {
        let mut times: Vec<i64> = points
            .shapes()
            .iter()
            .filter_map(|shape| shape.occurred_at)
            .collect();
        times.sort_unstable();
        times.dedup();
        let current = times.last().copied();
        Self {
            points,
            times,
            current,
            duration_ms: None,
        }
    }

    /// Only show markers within `duration_ms` before the current time.
    pub fn with_duration(mut self, duration_ms: i64) -> Self {
        self.duration_ms = Some(duration_ms.max(0));
        self
    }

    pub fn points(&self) -> &PointLayer {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut PointLayer {
        &mut self.points
    }

    pub fn available_times(&self) -> &[i64] {
        &self.times
    }

    pub fn time_range(&self) -> Option<(i64, i64)> {
        Some((*self.times.first()?, *self.times.last()?))
    }

    pub fn current_time(&self) -> Option<i64> {
        self.current
    }

    /// Snap to the latest available time not after `instant`, or to the
    /// earliest one when `instant` precedes them all.
    pub fn set_current_time(&mut self, instant: i64) -> Option<i64> {
        self.current = self.snap(instant);
        self.current
    }

    pub fn next_time(&mut self) -> Option<i64> {
        let index = self.current_index()?;
        let next = (index + 1).min(self.times.len() - 1);
        self.current = Some(self.times[next]);
        self.current
    }

    pub fn previous_time(&mut self) -> Option<i64> {
        let index = self.current_index()?;
        self.current = Some(self.times[index.saturating_sub(1)]);
        self.current
    }

    pub fn visible(&self) -> Vec<&Shape> {
        shapes_visible_at(self.points.shapes(), self.current, self.duration_ms)
    }

    pub fn visible_at(&self, instant: i64) -> Vec<&Shape> {
        shapes_visible_at(self.points.shapes(), Some(instant), self.duration_ms)
    }

    pub fn window_ms(&self) -> Option<i64> {
        self.duration_ms
    }

    fn snap(&self, instant: i64) -> Option<i64> {
        let after = self.times.partition_point(|time| *time <= instant);
        match after {
            0 => self.times.first().copied(),
            n => Some(self.times[n - 1]),
        }
    }

    fn current_index(&self) -> Option<usize> {
        let current = self.current?;
        self.times.binary_search(&current).ok()
    }
}
