use serde::{Deserialize, Serialize};

use crate::animator::sector_width;
use crate::constants::{COLOR_MPT_BLUE, COLOR_WHITE};
use crate::shared_wheel_game::Slice;

/// Everything a drawing routine needs to paint one sector.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SectorGeometry {
    pub index: usize,
    pub start_angle: f64,
    pub end_angle: f64,
    pub label_angle: f64,
    pub fill: String,
    pub text_color: String,
    pub caption: String,
}

// Labels on brand blue are white, everything else gets brand blue text
fn text_color_for(fill: &str) -> &'static str {
    if fill.eq_ignore_ascii_case(COLOR_MPT_BLUE) {
        COLOR_WHITE
    } else {
        COLOR_MPT_BLUE
    }
}

/// Pure function of the slices and the current rotation.
pub fn sector_geometry(slices: &[Slice], rotation: f64) -> Vec<SectorGeometry> {
    if slices.is_empty() {
        return Vec::new();
    }
    let width = sector_width(slices.len());

    slices
        .iter()
        .enumerate()
        .map(|(i, slice)| {
            let start_angle = i as f64 * width + rotation;
            SectorGeometry {
                index: i,
                start_angle,
                end_angle: start_angle + width,
                label_angle: start_angle + width / 2.0,
                fill: slice.color.clone(),
                text_color: text_color_for(&slice.color).to_string(),
                caption: format!("{} {}", slice.glyph, slice.label),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared_wheel_game::default_slices;
    use std::f64::consts::TAU;

    #[test]
    fn test_sectors_tile_the_circle() {
        let slices = default_slices();
        let sectors = sector_geometry(&slices, 0.75);
        assert_eq!(sectors.len(), 6);
        assert_eq!(sectors[0].start_angle, 0.75);
        for pair in sectors.windows(2) {
            assert!((pair[0].end_angle - pair[1].start_angle).abs() < 1e-12);
        }
        assert!((sectors[5].end_angle - (0.75 + TAU)).abs() < 1e-9);
    }

    #[test]
    fn test_caption_and_text_color() {
        let sectors = sector_geometry(&default_slices(), 0.0);
        assert_eq!(sectors[0].caption, "📓 NoteBook");
        assert_eq!(sectors[0].text_color, COLOR_WHITE);
        assert_eq!(sectors[1].text_color, COLOR_MPT_BLUE);
        assert!(sector_geometry(&[], 1.0).is_empty());
    }
}
