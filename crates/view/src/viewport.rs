use foundation::GeoBounds;

/// Value snapshot of what the map currently shows.
///
/// Zoom is floored at capture time; the server only understands integer
/// levels and the reconciler compares levels, not fractional zoom.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewportSnapshot {
    pub current_zoom: i32,
    pub bounds: GeoBounds,
}

impl ViewportSnapshot {
    pub fn capture(zoom: f64, bounds: GeoBounds) -> Self {
        Self {
            current_zoom: zoom.floor() as i32,
            bounds,
        }
    }
}

/// Read side of the map widget.
pub trait ViewportTracker {
    /// Fractional zoom as reported by the widget.
    fn zoom(&self) -> f64;

    /// Currently visible bounding box.
    fn bounds(&self) -> GeoBounds;

    fn snapshot(&self) -> ViewportSnapshot {
        ViewportSnapshot::capture(self.zoom(), self.bounds())
    }
}

/// Notifications raised by the map widget once an interaction settles.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MapEvent {
    MoveEnd,
    ZoomEnd,
}

#[cfg(test)]
mod tests {
    use super::{ViewportSnapshot, ViewportTracker};
    use foundation::GeoBounds;

    struct Fixed(f64);

    impl ViewportTracker for Fixed {
        fn zoom(&self) -> f64 {
            self.0
        }

        fn bounds(&self) -> GeoBounds {
            GeoBounds::new(-10.0, -5.0, 10.0, 5.0)
        }
    }

    #[test]
    fn snapshot_floors_zoom() {
        assert_eq!(Fixed(3.99).snapshot().current_zoom, 3);
        assert_eq!(Fixed(4.0).snapshot().current_zoom, 4);
    }

    #[test]
    fn snapshots_compare_by_value() {
        let a = ViewportSnapshot::capture(3.5, GeoBounds::new(0.0, 0.0, 1.0, 1.0));
        let b = ViewportSnapshot::capture(3.2, GeoBounds::new(0.0, 0.0, 1.0, 1.0));
        let c = ViewportSnapshot::capture(3.5, GeoBounds::new(0.0, 0.0, 1.0, 1.5));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
