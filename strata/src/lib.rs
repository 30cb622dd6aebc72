//! The repaint-planning core of a window compositor.
//!
//! A compositor maintains a stack of rectangular, possibly translucent
//! windows for each *tier* (an independently presented screen surface). When
//! something changes, this crate decides what has to be redrawn and how:
//!
//!  - [`cull`](cull::cull) drops the parts of a dirty rectangle hidden by
//!    opaque windows stacked above the change and records the rest in the
//!    tier's [`UpdateSet`].
//!  - [`visibility::compute`] finds the visible pixels of every window.
//!  - [`planner::plan`] decides the rectangles to repaint, and
//!    [`planner::paint`] turns them into calls to a [`DrawSink`].
//!
//! [`Compositor`] ties them together behind a lock: it owns the windows and
//! tiers, routes damage, waits for clients to finish their updates, and
//! presents the result through a [`PresentationGate`].
//!
//! Pixel sets are represented by [`bandregion::Region`].
use quick_error::quick_error;

mod compositor;
pub mod config;
pub mod cull;
pub mod iface;
pub mod planner;
mod stack;
pub mod updates;
pub mod visibility;

pub use self::{
    compositor::{Compositor, WindowDesc},
    config::{BufferMode, Config},
    iface::*,
    stack::Placement,
    updates::UpdateSet,
    visibility::Visibility,
};
pub use bandregion::{Region, RegionError};

quick_error! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum CompositorError {
        /// The window handle is invalid or refers to a removed window.
        BadWindow {
            display("invalid window handle")
        }
        BadTier {
            display("invalid tier")
        }
        /// A window was placed relative to a window of another stacking class.
        ClassMismatch {
            display("the sibling window belongs to another stacking class")
        }
        Region(err: RegionError) {
            from()
            cause(err)
            display("region operation failed: {}", err)
        }
    }
}
