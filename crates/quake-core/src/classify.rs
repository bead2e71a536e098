//! Magnitude classification shared by marker styling and the legend.
//!
//! Every breakpoint lives in [`MAGNITUDE_CLASSES`]; both the classifier and
//! [`crate::legend`] read that table so the two can never drift apart.

use serde::Serialize;

/// One severity class: magnitudes strictly greater than `lower_bound` (and not
/// claimed by a higher class) fall here.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MagnitudeClass {
    pub lower_bound: f64,
    pub radius: f64,
    pub color: &'static str,
    pub label: &'static str,
}

/// Ordered from least to most severe. The first entry is the catch-all class.
pub static MAGNITUDE_CLASSES: [MagnitudeClass; 6] = [
    MagnitudeClass {
        lower_bound: 0.0,
        radius: 6.0,
        color: "#fff6cf",
        label: "Minor",
    },
    MagnitudeClass {
        lower_bound: 4.0,
        radius: 12.0,
        color: "#fec981",
        label: "Light",
    },
    MagnitudeClass {
        lower_bound: 5.0,
        radius: 24.0,
        color: "#FD8D3C",
        label: "Moderate",
    },
    MagnitudeClass {
        lower_bound: 6.0,
        radius: 48.0,
        color: "#FC4E2A",
        label: "Strong",
    },
    MagnitudeClass {
        lower_bound: 7.0,
        radius: 96.0,
        color: "#E31A1C",
        label: "Major",
    },
    MagnitudeClass {
        lower_bound: 8.0,
        radius: 192.0,
        color: "#710016",
        label: "Great",
    },
];

/// Marker stroke color, identical for every class.
pub const STROKE_COLOR: &str = "#000";

/// Resolve the class for a magnitude.
///
/// Walks the table from the top down with a strict `>` test, so a value sitting
/// exactly on a breakpoint belongs to the class below it. NaN and anything at or
/// under the second breakpoint land in the first class.
pub fn class_for(magnitude: f64) -> &'static MagnitudeClass {
    MAGNITUDE_CLASSES[1..]
        .iter()
        .rev()
        .find(|class| magnitude > class.lower_bound)
        .unwrap_or(&MAGNITUDE_CLASSES[0])
}

pub fn radius_for(magnitude: f64) -> f64 {
    class_for(magnitude).radius
}

pub fn color_for(magnitude: f64) -> &'static str {
    class_for(magnitude).color
}

/// Path options applied to a rendered earthquake marker.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleSpec {
    pub radius: f64,
    pub fill_color: &'static str,
    #[serde(rename = "color")]
    pub stroke_color: &'static str,
    #[serde(rename = "weight")]
    pub stroke_weight: f64,
    pub opacity: f64,
    pub fill_opacity: f64,
}

/// Build the marker style for a magnitude. A missing magnitude is styled as the
/// lowest class.
pub fn style_for(magnitude: Option<f64>) -> StyleSpec {
    let class = magnitude.map_or(&MAGNITUDE_CLASSES[0], class_for);
    StyleSpec {
        radius: class.radius,
        fill_color: class.color,
        stroke_color: STROKE_COLOR,
        stroke_weight: 1.0,
        opacity: 1.0,
        fill_opacity: 0.8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakpoints_fall_into_lower_class() {
        assert_eq!(radius_for(4.0), 6.0);
        assert_eq!(radius_for(4.1), 12.0);
        assert_eq!(radius_for(8.0), 96.0);
        assert_eq!(radius_for(8.01), 192.0);
        assert_eq!(color_for(6.0), "#FD8D3C");
        assert_eq!(color_for(6.01), "#FC4E2A");
        assert_eq!(color_for(7.0), "#FC4E2A");
        assert_eq!(color_for(9.5), "#710016");
    }

    #[test]
    fn low_and_odd_inputs_use_first_class() {
        for magnitude in [-3.2, 0.0, 1.7, 4.0, f64::NAN, f64::NEG_INFINITY] {
            assert_eq!(radius_for(magnitude), 6.0, "magnitude {magnitude}");
            assert_eq!(color_for(magnitude), "#fff6cf", "magnitude {magnitude}");
        }
        assert_eq!(radius_for(f64::INFINITY), 192.0);
    }

    #[test]
    fn radius_never_shrinks_as_magnitude_grows() {
        let mut previous = radius_for(-1.0);
        let mut magnitude = -1.0;
        while magnitude < 10.0 {
            let radius = radius_for(magnitude);
            assert!(radius >= previous, "radius dropped at {magnitude}");
            previous = radius;
            magnitude += 0.05;
        }
    }

    #[test]
    fn classification_is_deterministic() {
        for magnitude in [3.9, 4.5, 5.5, 6.5, 7.5, 8.5] {
            assert_eq!(class_for(magnitude), class_for(magnitude));
        }
    }

    #[test]
    fn table_is_sorted_and_distinct() {
        for pair in MAGNITUDE_CLASSES.windows(2) {
            assert!(pair[0].lower_bound < pair[1].lower_bound);
            assert!(pair[0].radius < pair[1].radius);
            assert_ne!(pair[0].color, pair[1].color);
        }
    }

    #[test]
    fn style_uses_fixed_stroke_and_opacity() {
        let style = style_for(Some(5.2));
        assert_eq!(style.radius, 24.0);
        assert_eq!(style.fill_color, "#FD8D3C");
        assert_eq!(style.stroke_color, "#000");
        assert_eq!(style.stroke_weight, 1.0);
        assert_eq!(style.opacity, 1.0);
        assert_eq!(style.fill_opacity, 0.8);

        assert_eq!(style_for(None), style_for(Some(0.0)));
    }

    #[test]
    fn style_serializes_with_leaflet_option_names() {
        let value = serde_json::to_value(style_for(Some(7.3))).unwrap();
        assert_eq!(value["fillColor"], "#E31A1C");
        assert_eq!(value["color"], "#000");
        assert_eq!(value["weight"], 1.0);
        assert_eq!(value["fillOpacity"], 0.8);
    }
}
