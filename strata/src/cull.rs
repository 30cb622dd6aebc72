//! Clips a dirty rectangle against the windows stacked above it.
use arrayvec::ArrayVec;
use cggeom::{prelude::*, Box2};

use crate::{iface::TierView, updates::UpdateSet};

/// Add the parts of `rect` that may change the tier's appearance when the
/// contents at stack position `changed` change.
///
/// `changed` is `None` if the background (or everything) changed. The parts of
/// `rect` hidden by opaque windows above `changed` are dropped, and the
/// remaining pieces are added to `updates`.
pub fn cull(view: &TierView<'_>, changed: Option<usize>, rect: Box2<i32>, updates: &mut UpdateSet) {
    let rect = match rect.intersection(&view.bounds()) {
        Some(x) => x,
        None => return,
    };
    let bottom = changed.map_or(0, |i| i + 1);
    cull_below(view, bottom, view.windows.len(), rect, updates);
}

/// Examine the positions `bottom..top` for an occluder of `rect`.
fn cull_below(
    view: &TierView<'_>,
    bottom: usize,
    top: usize,
    rect: Box2<i32>,
    updates: &mut UpdateSet,
) {
    for i in (bottom..top).rev() {
        if !view.participates(&view.windows[i]) {
            continue;
        }
        let occluded = match view.windows[i]
            .occluding_box()
            .and_then(|area| area.intersection(&rect))
        {
            Some(x) => x,
            None => continue,
        };

        log::trace!("cull: {:?} absorbed {:?} of {:?}", i, occluded, rect);

        let pieces: ArrayVec<[Box2<i32>; 4]> = rect.split_around(&occluded).iter().collect();
        for piece in pieces {
            cull_below(view, bottom, i, piece, updates);
        }
        return;
    }

    log::trace!("cull: accepted {:?}", rect);
    updates.add(rect);
}
