//! Computes which pixels of each window are visible.
//!
//! The tier rectangle is pushed down the window stack from the top. An opaque
//! window keeps the part of the rectangle it covers and passes the pieces
//! around it further down. A translucent window keeps the part it covers but
//! passes the whole rectangle down because whatever is below shows through.
//! Whatever reaches the bottom is background.
use bandregion::{Region, RegionError};
use cggeom::{prelude::*, Box2};

use crate::iface::TierView;

/// The visible parts of a tier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Visibility {
    /// The pixels not covered by any drawn window.
    pub background: Region,
    /// The visible pixels of each window, indexed by stack position.
    pub windows: Vec<Region>,
}

/// Scratch storage for [`compute_with_scratch`].
///
/// Retaining this between computations avoids reallocating the box lists.
#[derive(Debug, Default)]
pub struct Scratch {
    background: Vec<Box2<i32>>,
    windows: Vec<Vec<Box2<i32>>>,
}

impl Scratch {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, num_windows: usize) {
        self.background.clear();
        for boxes in self.windows.iter_mut() {
            boxes.clear();
        }
        self.windows.resize_with(num_windows, Vec::new);
    }
}

/// Compute the visible parts of every window in `view`.
pub fn compute(view: &TierView<'_>) -> Result<Visibility, RegionError> {
    compute_with_scratch(view, &mut Scratch::new())
}

/// [`compute`] using the given scratch storage.
pub fn compute_with_scratch(
    view: &TierView<'_>,
    scratch: &mut Scratch,
) -> Result<Visibility, RegionError> {
    scratch.reset(view.windows.len());

    let bounds = view.bounds();
    if !bounds.is_empty() {
        visible(view, scratch, view.windows.len(), bounds);
    }

    // The boxes collected for each window are disjoint but in no particular
    // order
    let background = Region::from_boxes(&scratch.background)?;
    let windows = scratch
        .windows
        .iter()
        .map(|boxes| Region::from_boxes(boxes))
        .collect::<Result<Vec<_>, _>>()?;

    log::trace!(
        "compute: {} windows, {} background rects",
        windows.len(),
        background.n_rects()
    );

    Ok(Visibility {
        background,
        windows,
    })
}

/// Distribute `clip` among the windows at positions `0..top` and the
/// background.
fn visible(view: &TierView<'_>, scratch: &mut Scratch, top: usize, clip: Box2<i32>) {
    for i in (0..top).rev() {
        if !view.draws(i) {
            continue;
        }
        let window = &view.windows[i];
        let covered = match window.bounds.intersection(&clip) {
            Some(x) => x,
            None => continue,
        };

        if window.is_translucent() {
            visible(view, scratch, i, clip);
        } else {
            for piece in clip.split_around(&covered).iter() {
                visible(view, scratch, i, piece);
            }
        }

        scratch.windows[i].push(covered);
        return;
    }

    scratch.background.push(clip);
}
