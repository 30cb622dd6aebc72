use bandregion::Region;
use cggeom::{box2, cgmath::Vector2, prelude::*, Box2};
use std::{
    cmp::max,
    sync::{Condvar, Mutex, MutexGuard},
    time::Instant,
};

use crate::{
    config::Config,
    cull::cull,
    iface::{
        DrawSink, FlipFlags, HWnd, PresentationGate, StackingClass, StackingClasses, TierId,
        TierView, WindowFlags, WindowView,
    },
    planner,
    stack::{Placement, WindowStack},
    updates::UpdateSet,
    visibility::{self, Visibility},
    CompositorError,
};

type Result<T> = std::result::Result<T, CompositorError>;

/// The initial properties of a window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowDesc {
    pub bounds: Box2<i32>,
    /// Defaults to the rectangle of the size of `bounds` at the buffer
    /// origin.
    pub source: Option<Box2<i32>>,
    pub opacity: u8,
    pub flags: WindowFlags,
    pub opaque_region: Option<Box2<i32>>,
    pub class: StackingClass,
}

impl Default for WindowDesc {
    fn default() -> Self {
        Self {
            bounds: Box2::zero(),
            source: None,
            opacity: 255,
            flags: WindowFlags::empty(),
            opaque_region: None,
            class: StackingClass::Middle,
        }
    }
}

impl WindowDesc {
    pub fn new(bounds: Box2<i32>) -> Self {
        Self {
            bounds,
            ..Self::default()
        }
    }

    fn to_view(&self) -> WindowView {
        WindowView {
            handle: HWnd::from_raw(!0, !0),
            bounds: self.bounds,
            source: self.source.unwrap_or_else(|| buffer_rect(self.bounds)),
            opacity: self.opacity,
            flags: self.flags,
            opaque_region: self.opaque_region,
            class: self.class,
        }
    }
}

fn buffer_rect(bounds: Box2<i32>) -> Box2<i32> {
    box2! { min: [0, 0], max: [bounds.width().max(0), bounds.height().max(0)] }
}

/// The compositor context.
///
/// Every method locks the compositor for its duration. The lock is released
/// only while [`repaint_tier`](Compositor::repaint_tier) waits for window
/// updates to finish.
#[derive(Debug)]
pub struct Compositor {
    state: Mutex<State>,
    update_done: Condvar,
}

#[derive(Debug)]
struct State {
    config: Config,
    stack: WindowStack,
    tiers: Vec<Tier>,
}

#[derive(Debug)]
struct Tier {
    size: Vector2<u32>,
    classes: StackingClasses,
    updates: UpdateSet,
    /// `None` if stale.
    visibility: Option<Visibility>,
    scratch: visibility::Scratch,
    last_flipped: Vec<Box2<i32>>,
}

impl Tier {
    fn view<'a>(&self, windows: &'a [WindowView]) -> TierView<'a> {
        TierView {
            size: self.size,
            classes: self.classes,
            windows,
        }
    }
}

impl State {
    fn tier(&self, tier: TierId) -> Result<&Tier> {
        self.tiers.get(tier.0).ok_or(CompositorError::BadTier)
    }

    /// Record damage at stack position `changed` in every tier compositing
    /// `class`.
    fn damage(&mut self, changed: Option<usize>, rect: Box2<i32>, class: StackingClass) {
        let windows = self.stack.views();
        for tier in self.tiers.iter_mut() {
            if tier.classes.contains_class(class) {
                let view = tier.view(windows);
                cull(&view, changed, rect, &mut tier.updates);
            }
        }
    }

    /// Mark the visibility of every tier compositing `class` as stale.
    fn invalidate(&mut self, class: StackingClass) {
        for tier in self.tiers.iter_mut() {
            if tier.classes.contains_class(class) {
                tier.visibility = None;
            }
        }
    }

    fn has_pending_update(&self, classes: StackingClasses) -> bool {
        self.stack
            .views()
            .iter()
            .any(|v| classes.contains_class(v.class) && self.stack.is_update_pending(v.handle))
    }
}

impl Compositor {
    pub fn new(config: Config) -> Self {
        Self {
            state: Mutex::new(State {
                config,
                stack: WindowStack::new(),
                tiers: Vec::new(),
            }),
            update_done: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn config(&self) -> Config {
        self.lock().config.clone()
    }

    /// Add a tier compositing the windows of the given classes.
    ///
    /// The whole tier is dirty initially, so the first
    /// [`repaint_tier`](Compositor::repaint_tier) paints every pixel of it.
    pub fn add_tier(&self, size: Vector2<u32>, classes: StackingClasses) -> TierId {
        let mut state = self.lock();
        let mut tier = Tier {
            size,
            classes,
            updates: UpdateSet::new(state.config.update_capacity),
            visibility: None,
            scratch: visibility::Scratch::new(),
            last_flipped: Vec::new(),
        };

        // Nothing is on the screen yet, so not even the topmost window can
        // hide this damage
        let bounds = tier.view(&[]).bounds();
        tier.updates.add(bounds);

        state.tiers.push(tier);
        TierId(state.tiers.len() - 1)
    }

    /// Get the rectangles waiting to be repainted.
    pub fn tier_updates(&self, tier: TierId) -> Result<Vec<Box2<i32>>> {
        Ok(self.lock().tier(tier)?.updates.rects().to_vec())
    }

    /// Get the rectangles presented by the last flip of the tier.
    pub fn last_flipped(&self, tier: TierId) -> Result<Vec<Box2<i32>>> {
        Ok(self.lock().tier(tier)?.last_flipped.clone())
    }

    /// Get the visible parts of the tier's windows, recomputing them if
    /// stale.
    pub fn visibility(&self, tier: TierId) -> Result<Visibility> {
        let mut state = self.lock();
        let State { stack, tiers, .. } = &mut *state;
        let t = tiers.get_mut(tier.0).ok_or(CompositorError::BadTier)?;
        if t.visibility.is_none() {
            let view = t.view(stack.views());
            t.visibility = Some(visibility::compute_with_scratch(&view, &mut t.scratch)?);
        }
        Ok(t.visibility.clone().unwrap_or_default())
    }

    pub fn window(&self, hwnd: HWnd) -> Result<WindowView> {
        self.lock().stack.view(hwnd).map(|v| *v)
    }

    /// Get the window handles ordered from bottom to top.
    pub fn stacking_order(&self) -> Vec<HWnd> {
        self.lock().stack.views().iter().map(|v| v.handle).collect()
    }

    pub fn insert_window(&self, desc: WindowDesc, placement: Placement) -> Result<HWnd> {
        let mut state = self.lock();
        let view = desc.to_view();
        let (hwnd, pos) = state.stack.insert(view, placement)?;

        log::debug!("insert_window: {:?} at {}", hwnd, pos);

        state.invalidate(view.class);
        state.damage(Some(pos), view.bounds, view.class);
        Ok(hwnd)
    }

    pub fn remove_window(&self, hwnd: HWnd) -> Result<()> {
        let mut state = self.lock();
        let pos = state.stack.position(hwnd)?;
        let view = *state.stack.view(hwnd)?;

        log::debug!("remove_window: {:?} at {}", hwnd, pos);

        // Damage while the window is still there; only the windows above
        // can hide the exposed area
        state.damage(Some(pos), view.bounds, view.class);
        state.stack.remove(hwnd)?;
        state.invalidate(view.class);

        // A waiter might be waiting for this window
        self.update_done.notify_all();
        Ok(())
    }

    pub fn restack(&self, hwnd: HWnd, placement: Placement) -> Result<()> {
        let mut state = self.lock();
        let (old, new) = state.stack.restack(hwnd, placement)?;
        if old == new {
            return Ok(());
        }
        let view = *state.stack.view(hwnd)?;

        log::debug!("restack: {:?} moved from {} to {}", hwnd, old, new);

        // The windows above both positions are not affected by the move
        state.invalidate(view.class);
        state.damage(Some(max(old, new)), view.bounds, view.class);
        Ok(())
    }

    /// Apply `f` to the window's view and damage its old and new areas.
    fn modify(&self, hwnd: HWnd, f: impl FnOnce(&mut WindowView)) -> Result<()> {
        let mut state = self.lock();
        let pos = state.stack.position(hwnd)?;
        let view = state.stack.view_mut(hwnd)?;

        let old = *view;
        f(&mut *view);
        let new = *view;

        state.invalidate(old.class);
        state.damage(Some(pos), old.bounds, old.class);
        if new.bounds != old.bounds {
            state.damage(Some(pos), new.bounds, old.class);
        }
        Ok(())
    }

    /// Move or resize a window. The source rectangle of an unscaled window is
    /// resized with it.
    pub fn set_bounds(&self, hwnd: HWnd, bounds: Box2<i32>) -> Result<()> {
        self.modify(hwnd, |view| {
            if !view.flags.contains(WindowFlags::SCALED) {
                let size = buffer_rect(bounds).max - buffer_rect(view.bounds).max;
                view.source.max.x = view.source.max.x.saturating_add(size.x);
                view.source.max.y = view.source.max.y.saturating_add(size.y);
            }
            view.bounds = bounds;
        })
    }

    pub fn set_opacity(&self, hwnd: HWnd, opacity: u8) -> Result<()> {
        self.modify(hwnd, |view| view.opacity = opacity)
    }

    pub fn set_flags(&self, hwnd: HWnd, flags: WindowFlags) -> Result<()> {
        self.modify(hwnd, |view| view.flags = flags)
    }

    pub fn set_opaque_region(&self, hwnd: HWnd, opaque_region: Option<Box2<i32>>) -> Result<()> {
        self.modify(hwnd, |view| view.opaque_region = opaque_region)
    }

    pub fn set_source(&self, hwnd: HWnd, source: Box2<i32>) -> Result<()> {
        self.modify(hwnd, |view| view.source = source)
    }

    /// Report that the contents of a window changed inside `rect`, which is
    /// relative to the window's origin.
    pub fn notify_damage(&self, hwnd: HWnd, rect: Box2<i32>) -> Result<()> {
        let mut state = self.lock();
        let pos = state.stack.position(hwnd)?;
        let view = *state.stack.view(hwnd)?;

        if !view.is_drawn() {
            return Ok(());
        }

        let origin = Vector2::new(view.bounds.min.x, view.bounds.min.y);
        if let Some(rect) = rect.saturating_translate(origin).intersection(&view.bounds) {
            state.damage(Some(pos), rect, view.class);
        }
        Ok(())
    }

    /// Report that everything in `rect` of the tier must be redrawn.
    pub fn notify_tier_damage(&self, tier: TierId, rect: Box2<i32>) -> Result<()> {
        let mut state = self.lock();
        let State { stack, tiers, .. } = &mut *state;
        let t = tiers.get_mut(tier.0).ok_or(CompositorError::BadTier)?;
        let view = t.view(stack.views());
        cull(&view, None, rect, &mut t.updates);
        Ok(())
    }

    /// Mark a window as having submitted a frame that is not finished yet.
    /// [`repaint_tier`](Compositor::repaint_tier) waits until
    /// [`finish_update`](Compositor::finish_update) is called.
    pub fn begin_update(&self, hwnd: HWnd) -> Result<()> {
        self.lock().stack.set_update_pending(hwnd, true)
    }

    pub fn finish_update(&self, hwnd: HWnd) -> Result<()> {
        self.lock().stack.set_update_pending(hwnd, false)?;
        self.update_done.notify_all();
        Ok(())
    }

    /// Repaint the dirty parts of a tier and present them.
    ///
    /// Waits (for at most `Config::flip_timeout`) until no window in the tier
    /// has an update in progress. Returns the repainted rectangles.
    pub fn repaint_tier(
        &self,
        tier: TierId,
        sink: &mut (impl DrawSink + ?Sized),
        gate: &mut (impl PresentationGate + ?Sized),
    ) -> Result<Vec<Box2<i32>>> {
        let mut state = self.lock();
        let classes = state.tier(tier)?.classes;
        let timeout = state.config.flip_timeout;
        let deadline = Instant::now() + timeout;

        while state.has_pending_update(classes) {
            let now = Instant::now();
            if now >= deadline {
                let count = state
                    .stack
                    .clear_update_pending(|v| classes.contains_class(v.class));
                log::warn!(
                    "repaint_tier: {} window updates did not finish within {:?}; \
                     proceeding without them",
                    count,
                    timeout
                );
                break;
            }
            state = self.update_done.wait_timeout(state, deadline - now).unwrap().0;
        }

        let State {
            config,
            stack,
            tiers,
        } = &mut *state;
        let t = &mut tiers[tier.0];
        let view = t.view(stack.views());

        let rects = planner::plan(&view, &t.updates, config);
        if rects.is_empty() {
            return Ok(rects);
        }

        let vis = match t.visibility.take() {
            Some(vis) => vis,
            None => visibility::compute_with_scratch(&view, &mut t.scratch)?,
        };
        let dirty = Region::from_boxes(&rects)?;

        let painted = planner::paint(&view, &vis, &rects, config, sink);
        t.visibility = Some(vis);
        painted?;

        t.updates.reset();

        if config.buffer_mode.is_multi_buffered() {
            let mut flags = if rects == [view.bounds()] {
                FlipFlags::SWAP
            } else {
                FlipFlags::BLIT
            };
            if config.wait_for_sync {
                flags |= FlipFlags::WAIT_FOR_SYNC;
            }
            log::trace!("repaint_tier: flipping {:?} with {:?}", dirty, flags);
            gate.flip(tier, &dirty, flags);
        }

        t.last_flipped = rects.clone();
        Ok(rects)
    }
}
