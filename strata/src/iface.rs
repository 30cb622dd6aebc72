//! The types shared between the compositor and its collaborators.
use bandregion::Region;
use bitflags::bitflags;
use cggeom::{box2, cgmath::Vector2, prelude::*, Box2};
use std::fmt;

/// A window handle.
///
/// Handles are generation-checked: a handle to a removed window stays invalid
/// even after its slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HWnd {
    index: u32,
    generation: u32,
}

impl HWnd {
    /// Construct a handle from its raw components. Used to build
    /// [`WindowView`]s for the standalone algorithms.
    pub fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> usize {
        self.index as usize
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for HWnd {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "HWnd({}v{})", self.index, self.generation)
    }
}

/// Identifies a tier of a [`Compositor`](crate::Compositor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TierId(pub(crate) usize);

bitflags! {
    pub struct WindowFlags: u32 {
        /// The window's pixels have a per-pixel alpha channel.
        const HAS_ALPHA = 1;
        /// Pixels matching the window's color key are transparent.
        const HAS_COLOR_KEY = 1 << 1;
        /// `WindowView::opaque_region` is valid. Only meaningful with
        /// `HAS_ALPHA`.
        const HAS_OPAQUE_REGION = 1 << 2;
        /// The window receives input but has no contents.
        const INPUT_ONLY = 1 << 3;
        /// The source rectangle is stretched to the destination rectangle.
        const SCALED = 1 << 4;
        /// The window's color channels are premultiplied by alpha.
        const PREMULTIPLIED = 1 << 5;
        const HIDDEN = 1 << 6;
    }
}

impl Default for WindowFlags {
    fn default() -> Self {
        WindowFlags::empty()
    }
}

/// Determines the z-order band a window lives in. Every window of a lower
/// class is stacked below every window of a higher class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StackingClass {
    Lower,
    Middle,
    Upper,
}

impl Default for StackingClass {
    fn default() -> Self {
        StackingClass::Middle
    }
}

bitflags! {
    /// A set of [`StackingClass`]es.
    pub struct StackingClasses: u8 {
        const LOWER = 1;
        const MIDDLE = 1 << 1;
        const UPPER = 1 << 2;
    }
}

impl From<StackingClass> for StackingClasses {
    fn from(x: StackingClass) -> Self {
        match x {
            StackingClass::Lower => StackingClasses::LOWER,
            StackingClass::Middle => StackingClasses::MIDDLE,
            StackingClass::Upper => StackingClasses::UPPER,
        }
    }
}

impl StackingClasses {
    pub fn contains_class(self, class: StackingClass) -> bool {
        self.contains(class.into())
    }
}

/// A read-only snapshot of a window's compositing-relevant state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowView {
    pub handle: HWnd,
    /// The destination rectangle in the tier's coordinate space.
    pub bounds: Box2<i32>,
    /// The rectangle of the window's buffer mapped onto `bounds`. Must have the
    /// same size as `bounds` unless `SCALED` is set.
    pub source: Box2<i32>,
    pub opacity: u8,
    pub flags: WindowFlags,
    /// A rectangle relative to the origin of `bounds` inside which every pixel
    /// is opaque. Used only when both `HAS_ALPHA` and `HAS_OPAQUE_REGION` are
    /// set.
    pub opaque_region: Option<Box2<i32>>,
    pub class: StackingClass,
}

impl WindowView {
    /// Check if the window draws anything at all.
    pub fn is_drawn(&self) -> bool {
        !self
            .flags
            .intersects(WindowFlags::HIDDEN | WindowFlags::INPUT_ONLY)
            && self.opacity > 0
            && !self.bounds.is_empty()
    }

    /// Check if the contents below the window may show through it.
    pub fn is_translucent(&self) -> bool {
        self.opacity < 255
            || self.flags.intersects(
                WindowFlags::HAS_ALPHA | WindowFlags::HAS_COLOR_KEY | WindowFlags::SCALED,
            )
    }

    /// Check if drawing the window requires blending with the destination.
    pub fn blends(&self) -> bool {
        self.opacity < 255
            || self
                .flags
                .intersects(WindowFlags::HAS_ALPHA | WindowFlags::HAS_COLOR_KEY)
    }

    /// Check if the window covers black perfectly when drawn over opaque
    /// black, i.e., drawing it over black is equivalent to drawing it with
    /// no background at all.
    pub fn is_opaque_over_black(&self) -> bool {
        self.flags.contains(WindowFlags::PREMULTIPLIED)
            && !self.flags.contains(WindowFlags::HAS_COLOR_KEY)
            && self.opacity == 255
    }

    /// Get the area in tier space through which nothing below the window
    /// shows through.
    pub fn occluding_box(&self) -> Option<Box2<i32>> {
        if !self.is_drawn() || self.opacity < 255 || self.flags.contains(WindowFlags::HAS_COLOR_KEY)
        {
            return None;
        }

        if !self.flags.contains(WindowFlags::HAS_ALPHA) {
            Some(self.bounds)
        } else if self.flags.contains(WindowFlags::HAS_OPAQUE_REGION) {
            let opaque = self
                .opaque_region?
                .saturating_translate(Vector2::new(self.bounds.min.x, self.bounds.min.y));
            opaque.intersection(&self.bounds)
        } else {
            None
        }
    }

    /// Map a rectangle inside `bounds` to the corresponding rectangle of the
    /// window's buffer.
    ///
    /// When `SCALED` is set, the result is rounded outward so that it covers
    /// every source pixel contributing to `dst`. Coordinates falling outside
    /// the range of `i32` are saturated.
    pub fn map_to_source(&self, dst: Box2<i32>) -> Box2<i32> {
        let scaled = self.flags.contains(WindowFlags::SCALED);
        let (src, bounds) = (self.source, self.bounds);
        let x = |d, round_up| {
            map_coord(d, [bounds.min.x, bounds.max.x], [src.min.x, src.max.x], scaled, round_up)
        };
        let y = |d, round_up| {
            map_coord(d, [bounds.min.y, bounds.max.y], [src.min.y, src.max.y], scaled, round_up)
        };

        box2! {
            min: [x(dst.min.x, false), y(dst.min.y, false)],
            max: [x(dst.max.x, true), y(dst.max.y, true)],
        }
    }
}

/// Map the coordinate `d` in the span `dst` to the span `src`.
fn map_coord(d: i32, dst: [i32; 2], src: [i32; 2], scaled: bool, round_up: bool) -> i32 {
    let rel = i128::from(d) - i128::from(dst[0]);
    let rel = if !scaled {
        rel
    } else {
        let dst_len = i128::from(dst[1]) - i128::from(dst[0]);
        if dst_len <= 0 {
            return src[0];
        }
        let num = rel * (i128::from(src[1]) - i128::from(src[0]));
        if round_up {
            -((-num).div_euclid(dst_len))
        } else {
            num.div_euclid(dst_len)
        }
    };
    (i128::from(src[0]) + rel)
        .max(i128::from(i32::min_value()))
        .min(i128::from(i32::max_value())) as i32
}

/// A read-only snapshot of a tier: its size, the stacking classes it
/// composites, and the complete window stack from bottom to top.
#[derive(Debug, Clone, Copy)]
pub struct TierView<'a> {
    pub size: Vector2<u32>,
    pub classes: StackingClasses,
    pub windows: &'a [WindowView],
}

impl TierView<'_> {
    pub fn bounds(&self) -> Box2<i32> {
        box2! {
            min: [0, 0],
            max: [
                self.size.x.min(i32::max_value() as u32) as i32,
                self.size.y.min(i32::max_value() as u32) as i32,
            ],
        }
    }

    pub fn pixel_count(&self) -> u64 {
        self.bounds().area()
    }

    pub fn participates(&self, window: &WindowView) -> bool {
        self.classes.contains_class(window.class)
    }

    /// Check if the window at stack position `i` is drawn in this tier.
    pub fn draws(&self, i: usize) -> bool {
        let window = &self.windows[i];
        self.participates(window) && window.is_drawn()
    }
}

/// Receives the draw operations produced by the repaint planner.
///
/// All rectangles are in tier space unless noted otherwise.
pub trait DrawSink {
    fn fill_background(&mut self, rect: Box2<i32>);

    /// Draw the part `src` (in buffer space) of `window` to `dst`. `blend`
    /// indicates whether the pixels must be blended with the destination.
    fn blit_window(&mut self, window: &WindowView, src: Box2<i32>, dst: Box2<i32>, blend: bool);

    /// Draw `upper` over `lower` over opaque black in a single pass, covering
    /// `rect`. The destination's existing contents do not affect the result.
    fn blit_two_windows(&mut self, lower: &WindowView, upper: &WindowView, rect: Box2<i32>);
}

/// A recorded [`DrawSink`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawOp {
    FillBackground(Box2<i32>),
    BlitWindow {
        window: HWnd,
        src: Box2<i32>,
        dst: Box2<i32>,
        blend: bool,
    },
    BlitTwoWindows {
        lower: HWnd,
        upper: HWnd,
        rect: Box2<i32>,
    },
}

impl DrawOp {
    /// Get the destination rectangle.
    pub fn dst(&self) -> Box2<i32> {
        match *self {
            DrawOp::FillBackground(rect) => rect,
            DrawOp::BlitWindow { dst, .. } => dst,
            DrawOp::BlitTwoWindows { rect, .. } => rect,
        }
    }
}

impl DrawSink for Vec<DrawOp> {
    fn fill_background(&mut self, rect: Box2<i32>) {
        self.push(DrawOp::FillBackground(rect));
    }

    fn blit_window(&mut self, window: &WindowView, src: Box2<i32>, dst: Box2<i32>, blend: bool) {
        self.push(DrawOp::BlitWindow {
            window: window.handle,
            src,
            dst,
            blend,
        });
    }

    fn blit_two_windows(&mut self, lower: &WindowView, upper: &WindowView, rect: Box2<i32>) {
        self.push(DrawOp::BlitTwoWindows {
            lower: lower.handle,
            upper: upper.handle,
            rect,
        });
    }
}

bitflags! {
    pub struct FlipFlags: u32 {
        /// Wait for the vertical blank before presenting.
        const WAIT_FOR_SYNC = 1;
        /// The whole tier was repainted. The back buffer can be swapped in.
        const SWAP = 1 << 1;
        /// Only the dirty region was repainted. It must be copied to the front
        /// buffer.
        const BLIT = 1 << 2;
    }
}

/// Presents a repainted tier.
pub trait PresentationGate {
    fn flip(&mut self, tier: TierId, dirty: &Region, flags: FlipFlags);
}
