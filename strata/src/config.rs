use std::time::Duration;

/// The buffering scheme of a tier's presentation surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferMode {
    /// Drawing happens directly on the visible surface. There is nothing to
    /// flip.
    FrontOnly,
    Double,
    Triple,
}

impl BufferMode {
    pub fn is_multi_buffered(self) -> bool {
        self != BufferMode::FrontOnly
    }
}

/// Tunables of [`Compositor`](crate::Compositor) and the repaint planner.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// The maximum number of rectangles kept by a tier's update set before it
    /// collapses into a bounding box.
    pub update_capacity: usize,
    pub buffer_mode: BufferMode,
    /// `(numerator, denominator)`. When multi-buffered, a repaint whose total
    /// area exceeds this fraction of the tier is promoted to a full repaint.
    pub full_repaint_ratio: (u32, u32),
    /// Request flips to be synchronized with the vertical blank.
    pub wait_for_sync: bool,
    /// The maximum time `repaint_tier` waits for in-progress window updates.
    pub flip_timeout: Duration,
    /// The background is filled with opaque black.
    pub black_background: bool,
    /// Allow drawing two overlapping windows with a single operation. Only
    /// effective with `black_background`.
    pub combine_two_windows: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            update_capacity: 16,
            buffer_mode: BufferMode::Double,
            full_repaint_ratio: (3, 5),
            wait_for_sync: true,
            flip_timeout: Duration::from_millis(100),
            black_background: false,
            combine_two_windows: true,
        }
    }
}

impl Config {
    pub fn with_update_capacity(self, update_capacity: usize) -> Self {
        Self {
            update_capacity: update_capacity.max(1),
            ..self
        }
    }

    pub fn with_buffer_mode(self, buffer_mode: BufferMode) -> Self {
        Self {
            buffer_mode,
            ..self
        }
    }

    pub fn with_full_repaint_ratio(self, num: u32, den: u32) -> Self {
        Self {
            full_repaint_ratio: (num, den.max(1)),
            ..self
        }
    }

    pub fn with_wait_for_sync(self, wait_for_sync: bool) -> Self {
        Self {
            wait_for_sync,
            ..self
        }
    }

    pub fn with_flip_timeout(self, flip_timeout: Duration) -> Self {
        Self {
            flip_timeout,
            ..self
        }
    }

    pub fn with_black_background(self, black_background: bool) -> Self {
        Self {
            black_background,
            ..self
        }
    }

    pub fn with_combine_two_windows(self, combine_two_windows: bool) -> Self {
        Self {
            combine_two_windows,
            ..self
        }
    }

    /// Check whether the two-window combination is in effect.
    pub fn combines_two_windows(&self) -> bool {
        self.black_background && self.combine_two_windows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_sanitize() {
        let config = Config::default()
            .with_update_capacity(0)
            .with_full_repaint_ratio(1, 0);
        assert_eq!(config.update_capacity, 1);
        assert_eq!(config.full_repaint_ratio, (1, 1));
    }

    #[test]
    fn combination_needs_black_background() {
        assert!(!Config::default().combines_two_windows());
        assert!(Config::default()
            .with_black_background(true)
            .combines_two_windows());
        assert!(!Config::default()
            .with_black_background(true)
            .with_combine_two_windows(false)
            .combines_two_windows());
    }
}
