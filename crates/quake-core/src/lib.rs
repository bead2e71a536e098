//! Earthquake map composition: magnitude styling, popups, the time-aware
//! earthquake overlay, fault lines, base maps and the legend.
//!
//! Nothing here performs I/O. Callers hand fetched feed documents to
//! [`MapComposer`] and read back a [`MapSnapshot`] to render.

pub mod binder;
pub mod classify;
pub mod compose;
pub mod error;
pub mod feature;
pub mod format;
pub mod legend;
pub mod map;
pub mod time_dimension;

pub use classify::{MAGNITUDE_CLASSES, MagnitudeClass, StyleSpec, color_for, radius_for, style_for};
pub use compose::{
    ComposerConfig, EARTHQUAKE_OVERLAY, FAULT_OVERLAY, MapComposer, MapSnapshot,
};
pub use error::FeedError;
pub use format::{build_popup_html, format_timestamp};
pub use legend::Legend;
pub use map::{LayerId, MapContext, MapView};
