//! Embedded map page served at `/`.
//!
//! The page is a static template bundled into the binary. Only the initial
//! view and the legend are filled in up front; layers arrive over the JSON API.

mod page;

use quake_core::Legend;

use crate::config::MapConfig;

pub use page::MAP_PAGE_HTML;

/// Fill the page template for one configured map.
pub fn render_page(config: &MapConfig) -> String {
    let view = &config.composer.view;
    let legend = Legend::build().to_html();
    let replacements = [
        ("__CENTER_LAT__", view.center.lat.to_string()),
        ("__CENTER_LON__", view.center.lon.to_string()),
        ("__ZOOM__", view.zoom.to_string()),
        ("__LEGEND_HTML__", legend),
    ];

    let mut page = MAP_PAGE_HTML.to_string();
    for (key, value) in replacements {
        page = page.replace(key, &value);
    }
    page
}
