//! Static severity legend built from the classifier's breakpoint table.

use serde::Serialize;

use crate::classify::{MAGNITUDE_CLASSES, color_for};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LegendEntry {
    pub color: &'static str,
    /// `"4–5"` style range, or `"8+"` for the open-ended top class.
    pub range: String,
    pub label: &'static str,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Legend {
    pub position: &'static str,
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    pub fn build() -> Self {
        let entries = MAGNITUDE_CLASSES
            .iter()
            .enumerate()
            .map(|(index, class)| {
                let range = match MAGNITUDE_CLASSES.get(index + 1) {
                    Some(next) => format!("{}\u{2013}{}", class.lower_bound, next.lower_bound),
                    None => format!("{}+", class.lower_bound),
                };
                LegendEntry {
                    // one unit above the lower bound always sits inside the class
                    color: color_for(class.lower_bound + 1.0),
                    range,
                    label: class.label,
                }
            })
            .collect();
        Self {
            position: "bottomright",
            entries,
        }
    }

    /// Inner HTML for the `info legend` panel.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        let last = self.entries.len().saturating_sub(1);
        for (index, entry) in self.entries.iter().enumerate() {
            let range = entry.range.replace('\u{2013}', "&ndash;");
            html.push_str(&format!(
                "<i style=\"background:{}\"></i> ({range}) {}",
                entry.color, entry.label
            ));
            if index != last {
                html.push_str("<br>");
            }
        }
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::class_for;

    #[test]
    fn entries_follow_the_breakpoint_table() {
        let legend = Legend::build();
        let ranges: Vec<&str> = legend.entries.iter().map(|e| e.range.as_str()).collect();
        assert_eq!(ranges, vec!["0–4", "4–5", "5–6", "6–7", "7–8", "8+"]);
        let labels: Vec<&str> = legend.entries.iter().map(|e| e.label).collect();
        assert_eq!(
            labels,
            vec!["Minor", "Light", "Moderate", "Strong", "Major", "Great"]
        );
        assert_eq!(legend.position, "bottomright");
    }

    #[test]
    fn swatches_match_classifier_colors() {
        for (entry, class) in Legend::build().entries.iter().zip(MAGNITUDE_CLASSES.iter()) {
            assert_eq!(entry.color, class.color);
            assert_eq!(class_for(class.lower_bound + 0.5).color, entry.color);
        }
    }

    #[test]
    fn html_renders_every_class() {
        let html = Legend::build().to_html();
        assert!(html.starts_with("<i style=\"background:#fff6cf\"></i> (0&ndash;4) Minor<br>"));
        assert!(html.contains("<i style=\"background:#FD8D3C\"></i> (5&ndash;6) Moderate<br>"));
        assert!(html.ends_with("<i style=\"background:#710016\"></i> (8+) Great"));
        assert_eq!(html.matches("<i ").count(), 6);
    }
}
