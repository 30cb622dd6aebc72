//! Turns dirty rectangles into draw operations.
use bandregion::{Region, RegionError};
use cggeom::{prelude::*, Box2};

use crate::{
    config::Config,
    iface::{DrawSink, TierView, WindowFlags},
    updates::UpdateSet,
    visibility::Visibility,
};

/// Decide the rectangles to repaint.
///
/// The rectangles of `updates` are clipped to the tier. If repainting them
/// costs more than repainting the whole tier (or, when multi-buffered, more
/// than `config.full_repaint_ratio` of it), a single rectangle covering the
/// whole tier is returned instead.
///
/// The cost is [`UpdateSet::stat`]'s total area, measured after clipping:
/// the parts of the rectangles outside the tier are never painted and don't
/// count.
pub fn plan(view: &TierView<'_>, updates: &UpdateSet, config: &Config) -> Vec<Box2<i32>> {
    let bounds = view.bounds();
    let rects: Vec<_> = updates
        .rects()
        .iter()
        .filter_map(|r| r.intersection(&bounds))
        .collect();
    if rects.is_empty() {
        return rects;
    }

    // The stored rects only count as a whole if none of them sticks out of
    // the tier
    let total = match updates.bounding() {
        Some(b) if bounds.contains_box(&b) => updates.stat().0,
        _ => rects.iter().map(|r| r.area()).sum(),
    };
    let pixels = view.pixel_count();

    let (num, den) = config.full_repaint_ratio;
    let exceeds_ratio = config.buffer_mode.is_multi_buffered()
        && u128::from(total) * u128::from(den) > u128::from(pixels) * u128::from(num);

    if total > pixels || exceeds_ratio {
        log::debug!(
            "plan: {} rects totalling {} of {} pixels; repainting everything",
            rects.len(),
            total,
            pixels
        );
        vec![bounds]
    } else {
        rects
    }
}

/// Two windows drawn by a single operation.
#[derive(Debug)]
struct Pair {
    lower: usize,
    upper: usize,
    area: Region,
}

/// Emit the draw operations repainting `rects`.
///
/// For each rectangle, the background is filled first, and then the windows
/// are drawn from bottom to top.
pub fn paint(
    view: &TierView<'_>,
    visibility: &Visibility,
    rects: &[Box2<i32>],
    config: &Config,
    sink: &mut (impl DrawSink + ?Sized),
) -> Result<(), RegionError> {
    debug_assert_eq!(visibility.windows.len(), view.windows.len());

    let mut num_pairs = 0;

    for &rect in rects.iter() {
        let mut background = visibility.background.intersect_box(rect)?;
        let mut windows = visibility
            .windows
            .iter()
            .map(|r| r.intersect_box(rect))
            .collect::<Result<Vec<_>, _>>()?;

        let pairs = if config.combines_two_windows() {
            combine(view, &mut background, &mut windows)?
        } else {
            Vec::new()
        };
        num_pairs += pairs.len();

        for bx in background.boxes() {
            sink.fill_background(*bx);
        }

        for (i, visible) in windows.iter().enumerate() {
            let window = &view.windows[i];

            for pair in pairs.iter().filter(|p| p.upper == i) {
                let lower = &view.windows[pair.lower];
                for bx in pair.area.boxes() {
                    sink.blit_two_windows(lower, window, *bx);
                }
            }

            let blend = window.blends();
            for bx in visible.boxes() {
                sink.blit_window(window, window.map_to_source(*bx), *bx, blend);
            }
        }
    }

    if num_pairs > 0 {
        log::debug!("paint: combined {} window pairs", num_pairs);
    }

    Ok(())
}

/// Find the areas that can be drawn as pairs of windows and remove them from
/// `background` and `windows`.
///
/// A pair consists of a premultiplied, blending window and the nearest window
/// drawn below it. Its area is where those two are the only drawn windows.
/// The area includes the background below the lower window only if the lower
/// window hides the black background completely.
fn combine(
    view: &TierView<'_>,
    background: &mut Region,
    windows: &mut [Region],
) -> Result<Vec<Pair>, RegionError> {
    let mut pairs = Vec::new();
    let mut below = None;

    for upper in 0..windows.len() {
        if windows[upper].is_empty() {
            continue;
        }
        let lower = match below.replace(upper) {
            Some(x) => x,
            None => continue,
        };

        let upper_w = &view.windows[upper];
        if !upper_w.flags.contains(WindowFlags::PREMULTIPLIED) || !upper_w.blends() {
            continue;
        }

        let mut area = windows[upper].intersect(&windows[lower])?;
        for (k, other) in windows.iter().enumerate() {
            if area.is_empty() {
                break;
            }
            if k != upper && k != lower {
                area.subtract_assign(other)?;
            }
        }
        if !view.windows[lower].is_opaque_over_black() {
            area.subtract_assign(background)?;
        }

        if !area.is_empty() {
            pairs.push(Pair { lower, upper, area });
        }
    }

    // The areas are pairwise disjoint, so they can be removed after all of
    // them are found
    for pair in pairs.iter() {
        windows[pair.lower].subtract_assign(&pair.area)?;
        windows[pair.upper].subtract_assign(&pair.area)?;
        background.subtract_assign(&pair.area)?;
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::BufferMode,
        iface::{DrawOp, HWnd, StackingClass, StackingClasses, WindowView},
        visibility,
    };
    use cggeom::{box2, cgmath::Vector2};

    fn window(i: u32, bounds: Box2<i32>, flags: WindowFlags) -> WindowView {
        WindowView {
            handle: HWnd::from_raw(i, 0),
            bounds,
            source: box2! { min: [0, 0], max: [bounds.width(), bounds.height()] },
            opacity: 255,
            flags,
            opaque_region: None,
            class: StackingClass::Middle,
        }
    }

    fn view(windows: &[WindowView]) -> TierView<'_> {
        TierView {
            size: Vector2::new(100, 100),
            classes: StackingClasses::all(),
            windows,
        }
    }

    fn updates(rects: &[Box2<i32>]) -> UpdateSet {
        let mut set = UpdateSet::new(16);
        for &r in rects {
            set.add(r);
        }
        set
    }

    #[test]
    fn plan_clips_to_tier() {
        let v = view(&[]);
        let set = updates(&[
            box2! { min: [-10, -10], max: [10, 10] },
            box2! { min: [200, 200], max: [300, 300] },
        ]);
        assert_eq!(
            plan(&v, &set, &Config::default()),
            vec![box2! { min: [0, 0], max: [10, 10] }]
        );
    }

    #[test]
    fn plan_falls_back_to_full_repaint() {
        let v = view(&[]);
        let full = vec![box2! { min: [0, 0], max: [100, 100] }];

        // 70% of the tier
        let set = updates(&[box2! { min: [0, 0], max: [70, 100] }]);
        assert_eq!(plan(&v, &set, &Config::default()), full);

        let front = Config::default().with_buffer_mode(BufferMode::FrontOnly);
        assert_eq!(plan(&v, &set, &front), set.rects().to_vec());

        // 50% of the tier
        let set = updates(&[box2! { min: [0, 0], max: [50, 100] }]);
        assert_eq!(plan(&v, &set, &Config::default()), set.rects().to_vec());
    }

    #[test]
    fn plan_ignores_area_outside_tier() {
        let v = view(&[]);

        // 400% of the tier before clipping, 40% after
        let set = updates(&[box2! { min: [-100, 0], max: [40, 400] }]);
        assert!(set.stat().0 > v.pixel_count());
        assert_eq!(
            plan(&v, &set, &Config::default()),
            vec![box2! { min: [0, 0], max: [40, 100] }]
        );

        // Inside the tier, the total comes straight from the set
        let set = updates(&[
            box2! { min: [0, 0], max: [40, 50] },
            box2! { min: [60, 50], max: [100, 100] },
        ]);
        assert_eq!(set.stat().0, 4000);
        assert_eq!(plan(&v, &set, &Config::default()), set.rects().to_vec());

        let set = updates(&[
            box2! { min: [0, 0], max: [40, 80] },
            box2! { min: [60, 20], max: [100, 100] },
        ]);
        assert_eq!(plan(&v, &set, &Config::default()), vec![v.bounds()]);
    }

    #[test]
    fn paint_draws_bottom_to_top() {
        let windows = [
            window(0, box2! { min: [0, 0], max: [50, 50] }, WindowFlags::empty()),
            window(1, box2! { min: [25, 25], max: [75, 75] }, WindowFlags::HAS_ALPHA),
        ];
        let v = view(&windows);
        let vis = visibility::compute(&v).unwrap();

        let mut ops: Vec<DrawOp> = Vec::new();
        let rect = box2! { min: [40, 40], max: [60, 60] };
        paint(&v, &vis, &[rect], &Config::default(), &mut ops).unwrap();

        // The background is filled first
        let first_blit = ops
            .iter()
            .position(|op| !matches!(op, DrawOp::FillBackground(_)))
            .unwrap();
        assert!(ops[first_blit..]
            .iter()
            .all(|op| !matches!(op, DrawOp::FillBackground(_))));

        let blits: Vec<_> = ops[first_blit..].to_vec();
        assert_eq!(
            blits,
            vec![
                DrawOp::BlitWindow {
                    window: windows[0].handle,
                    src: box2! { min: [40, 40], max: [50, 50] },
                    dst: box2! { min: [40, 40], max: [50, 50] },
                    blend: false,
                },
                DrawOp::BlitWindow {
                    window: windows[1].handle,
                    src: box2! { min: [15, 15], max: [35, 35] },
                    dst: rect,
                    blend: true,
                },
            ]
        );

        let filled: u64 = ops[..first_blit].iter().map(|op| op.dst().area()).sum();
        assert_eq!(filled, 400 - 100);
    }

    #[test]
    fn paint_combines_two_windows() {
        let windows = [
            window(0, box2! { min: [0, 0], max: [100, 100] }, WindowFlags::empty()),
            window(
                1,
                box2! { min: [20, 20], max: [80, 80] },
                WindowFlags::HAS_ALPHA | WindowFlags::PREMULTIPLIED,
            ),
        ];
        let v = view(&windows);
        let vis = visibility::compute(&v).unwrap();
        let rect = box2! { min: [0, 0], max: [100, 100] };

        let config = Config::default().with_black_background(true);
        let mut ops: Vec<DrawOp> = Vec::new();
        paint(&v, &vis, &[rect], &config, &mut ops).unwrap();

        assert!(ops.contains(&DrawOp::BlitTwoWindows {
            lower: windows[0].handle,
            upper: windows[1].handle,
            rect: windows[1].bounds,
        }));
        assert!(!ops.iter().any(|op| match op {
            DrawOp::BlitWindow { window, .. } => *window == windows[1].handle,
            _ => false,
        }));

        // Without a black background, nothing is combined
        let mut ops: Vec<DrawOp> = Vec::new();
        paint(&v, &vis, &[rect], &Config::default(), &mut ops).unwrap();
        assert!(!ops
            .iter()
            .any(|op| matches!(op, DrawOp::BlitTwoWindows { .. })));
    }

    #[test]
    fn pair_includes_background_below_premultiplied_lower_window() {
        let windows = [
            window(
                0,
                box2! { min: [0, 0], max: [60, 60] },
                WindowFlags::HAS_ALPHA | WindowFlags::PREMULTIPLIED,
            ),
            window(
                1,
                box2! { min: [40, 40], max: [100, 100] },
                WindowFlags::HAS_ALPHA | WindowFlags::PREMULTIPLIED,
            ),
        ];
        let v = view(&windows);
        let vis = visibility::compute(&v).unwrap();
        let rect = box2! { min: [0, 0], max: [100, 100] };
        let config = Config::default().with_black_background(true);

        let mut ops: Vec<DrawOp> = Vec::new();
        paint(&v, &vis, &[rect], &config, &mut ops).unwrap();

        let overlap = box2! { min: [40, 40], max: [60, 60] };
        assert!(ops.contains(&DrawOp::BlitTwoWindows {
            lower: windows[0].handle,
            upper: windows[1].handle,
            rect: overlap,
        }));
        // The background below the pair is not cleared
        assert!(ops.iter().all(|op| match op {
            DrawOp::FillBackground(r) => r.intersection(&overlap).is_none(),
            _ => true,
        }));

        // A lower window with partial opacity needs the background
        let mut windows = windows;
        windows[0].opacity = 200;
        let v = view(&windows);
        let vis = visibility::compute(&v).unwrap();
        let mut ops: Vec<DrawOp> = Vec::new();
        paint(&v, &vis, &[rect], &config, &mut ops).unwrap();
        assert!(!ops
            .iter()
            .any(|op| matches!(op, DrawOp::BlitTwoWindows { .. })));
    }
}
