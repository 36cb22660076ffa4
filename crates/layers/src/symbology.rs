/// Upper bound for an edge line width, in pixels.
pub const MAX_EDGE_WIDTH_PX: u32 = 15;

/// Upper bound for a cluster label, in pixels.
pub const MAX_LABEL_SIZE_PX: u32 = 20;

/// Square-root scale clamped to `1..=max`, so heavy items stay readable
/// without drowning the rest.
pub fn sqrt_scale(value: f64, max: u32) -> u32 {
    let scaled = value.max(0.0).sqrt().ceil() as u32;
    scaled.min(max).max(1)
}

/// Line width for an edge of the given weight.
pub fn edge_width(weight: f64) -> u32 {
    sqrt_scale(weight, MAX_EDGE_WIDTH_PX)
}

/// Text size for a cluster holding `size` points.
pub fn label_size(size: u64) -> u32 {
    sqrt_scale(size as f64, MAX_LABEL_SIZE_PX)
}

/// Converts the opacity slider (thousandths) into a 0..=1 factor.
pub fn opacity_from_slider(value: u32) -> f32 {
    value.min(1000) as f32 / 1000.0
}

pub const DEFAULT_EDGE_COLOR: [u8; 3] = [0, 0, 0];

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClusterStyle {
    pub fill: [u8; 3],
    pub opacity: f32,
    /// Multiplier from cluster size to marker radius in metres.
    pub radius_scale: f32,
    pub radius_min_px: f32,
    pub radius_max_px: f32,
}

impl Default for ClusterStyle {
    fn default() -> Self {
        Self {
            fill: [0, 0, 0],
            opacity: 0.8,
            radius_scale: 100.0,
            radius_min_px: 1.0,
            radius_max_px: 25.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_width_is_capped_sqrt() {
        assert_eq!(edge_width(0.0), 1);
        assert_eq!(edge_width(1.0), 1);
        assert_eq!(edge_width(2.0), 2);
        assert_eq!(edge_width(100.0), 10);
        assert_eq!(edge_width(101.0), 11);
        assert_eq!(edge_width(1000.0), 15);
        assert_eq!(edge_width(-4.0), 1);
        assert_eq!(edge_width(f64::NAN), 1);
    }

    #[test]
    fn label_size_is_capped_sqrt() {
        assert_eq!(label_size(0), 1);
        assert_eq!(label_size(16), 4);
        assert_eq!(label_size(17), 5);
        assert_eq!(label_size(10_000), 20);
    }

    #[test]
    fn slider_maps_to_unit_range() {
        assert_eq!(opacity_from_slider(0), 0.0);
        assert_eq!(opacity_from_slider(500), 0.5);
        assert_eq!(opacity_from_slider(5000), 1.0);
    }
}
