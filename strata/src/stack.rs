//! Window storage and z-order.
use crate::{
    iface::{HWnd, StackingClass, WindowView},
    CompositorError,
};

/// Where a window is put in the window stack.
///
/// The window stack is always ordered by [`StackingClass`]. `Top` and
/// `Bottom` refer to the top and the bottom of the window's class band.
/// `Above` and `Below` require the sibling to be in the same class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    Top,
    Bottom,
    Above(HWnd),
    Below(HWnd),
}

#[derive(Debug)]
enum Slot {
    Used {
        generation: u32,
        /// A frame was submitted but not acknowledged yet.
        update_pending: bool,
    },
    /// Points the next free slot.
    Free {
        generation: u32,
        next_free: Option<usize>,
    },
}

/// A generation-checked window pool and the z-order of the windows in it.
#[derive(Debug, Default)]
pub(crate) struct WindowStack {
    slots: Vec<Slot>,
    first_free: Option<usize>,
    /// Bottom to top.
    views: Vec<WindowView>,
}

type Result<T> = std::result::Result<T, CompositorError>;

impl WindowStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the views of all windows, ordered from bottom to top.
    pub fn views(&self) -> &[WindowView] {
        &self.views
    }

    fn check(&self, hwnd: HWnd) -> Result<()> {
        match self.slots.get(hwnd.index()) {
            Some(&Slot::Used { generation, .. }) if generation == hwnd.generation() => Ok(()),
            _ => Err(CompositorError::BadWindow),
        }
    }

    /// Get the stack position of a window.
    pub fn position(&self, hwnd: HWnd) -> Result<usize> {
        self.check(hwnd)?;
        self.views
            .iter()
            .position(|v| v.handle == hwnd)
            .ok_or(CompositorError::BadWindow)
    }

    pub fn view(&self, hwnd: HWnd) -> Result<&WindowView> {
        let i = self.position(hwnd)?;
        Ok(&self.views[i])
    }

    pub fn view_mut(&mut self, hwnd: HWnd) -> Result<&mut WindowView> {
        let i = self.position(hwnd)?;
        Ok(&mut self.views[i])
    }

    /// Find the stack position for a new window of class `class`.
    fn position_for(&self, class: StackingClass, placement: Placement) -> Result<usize> {
        let len = self.views.len();
        match placement {
            Placement::Top => Ok(self
                .views
                .iter()
                .position(|v| v.class > class)
                .unwrap_or(len)),
            Placement::Bottom => Ok(self
                .views
                .iter()
                .position(|v| v.class >= class)
                .unwrap_or(len)),
            Placement::Above(sibling) | Placement::Below(sibling) => {
                let i = self.position(sibling)?;
                if self.views[i].class != class {
                    return Err(CompositorError::ClassMismatch);
                }
                Ok(if let Placement::Above(_) = placement {
                    i + 1
                } else {
                    i
                })
            }
        }
    }

    /// Insert a window. `view.handle` is overwritten with a newly allocated
    /// handle. Returns the handle and the stack position of the new window.
    pub fn insert(&mut self, mut view: WindowView, placement: Placement) -> Result<(HWnd, usize)> {
        let pos = self.position_for(view.class, placement)?;

        let hwnd = if let Some(i) = self.first_free {
            let generation = match self.slots[i] {
                Slot::Free {
                    generation,
                    next_free,
                } => {
                    self.first_free = next_free;
                    generation
                }
                Slot::Used { .. } => unreachable!(),
            };
            self.slots[i] = Slot::Used {
                generation,
                update_pending: false,
            };
            HWnd::from_raw(i as u32, generation)
        } else {
            self.slots.push(Slot::Used {
                generation: 0,
                update_pending: false,
            });
            HWnd::from_raw((self.slots.len() - 1) as u32, 0)
        };

        view.handle = hwnd;
        self.views.insert(pos, view);
        Ok((hwnd, pos))
    }

    /// Remove a window. Returns its last stack position and view.
    pub fn remove(&mut self, hwnd: HWnd) -> Result<(usize, WindowView)> {
        let pos = self.position(hwnd)?;
        let view = self.views.remove(pos);

        self.slots[hwnd.index()] = Slot::Free {
            generation: hwnd.generation().wrapping_add(1),
            next_free: self.first_free,
        };
        self.first_free = Some(hwnd.index());

        Ok((pos, view))
    }

    /// Move a window. Returns the old and new stack positions.
    pub fn restack(&mut self, hwnd: HWnd, placement: Placement) -> Result<(usize, usize)> {
        let old = self.position(hwnd)?;
        match placement {
            Placement::Above(s) | Placement::Below(s) if s == hwnd => return Ok((old, old)),
            _ => {}
        }

        let view = self.views.remove(old);
        match self.position_for(view.class, placement) {
            Ok(new) => {
                self.views.insert(new, view);
                Ok((old, new))
            }
            Err(e) => {
                self.views.insert(old, view);
                Err(e)
            }
        }
    }

    pub fn set_update_pending(&mut self, hwnd: HWnd, value: bool) -> Result<()> {
        self.check(hwnd)?;
        if let Slot::Used { update_pending, .. } = &mut self.slots[hwnd.index()] {
            *update_pending = value;
        }
        Ok(())
    }

    pub fn is_update_pending(&self, hwnd: HWnd) -> bool {
        match self.slots.get(hwnd.index()) {
            Some(&Slot::Used {
                generation,
                update_pending,
            }) => generation == hwnd.generation() && update_pending,
            _ => false,
        }
    }

    /// Clear the update-pending flag of every window satisfying `pred`.
    /// Returns the number of the cleared flags.
    pub fn clear_update_pending(&mut self, mut pred: impl FnMut(&WindowView) -> bool) -> usize {
        let mut count = 0;
        for view in self.views.iter().filter(|&v| pred(v)) {
            if let Slot::Used { update_pending, .. } = &mut self.slots[view.handle.index()] {
                count += *update_pending as usize;
                *update_pending = false;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iface::WindowFlags;
    use cggeom::box2;

    fn view(class: StackingClass) -> WindowView {
        WindowView {
            handle: HWnd::from_raw(!0, !0),
            bounds: box2! { min: [0, 0], max: [10, 10] },
            source: box2! { min: [0, 0], max: [10, 10] },
            opacity: 255,
            flags: WindowFlags::empty(),
            opaque_region: None,
            class,
        }
    }

    fn order(stack: &WindowStack) -> Vec<HWnd> {
        stack.views().iter().map(|v| v.handle).collect()
    }

    #[test]
    fn stale_handle_is_rejected() {
        let mut stack = WindowStack::new();
        let (a, _) = stack.insert(view(StackingClass::Middle), Placement::Top).unwrap();
        stack.remove(a).unwrap();

        // The slot is reused with a new generation
        let (b, _) = stack.insert(view(StackingClass::Middle), Placement::Top).unwrap();
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);

        assert_eq!(stack.position(a), Err(CompositorError::BadWindow));
        assert_eq!(stack.remove(a).map(|_| ()), Err(CompositorError::BadWindow));
        assert_eq!(stack.position(b), Ok(0));
        assert_eq!(
            stack.position(HWnd::from_raw(42, 0)),
            Err(CompositorError::BadWindow)
        );
    }

    #[test]
    fn class_bands_are_ordered() {
        let mut stack = WindowStack::new();
        let (upper, _) = stack.insert(view(StackingClass::Upper), Placement::Bottom).unwrap();
        let (lower, _) = stack.insert(view(StackingClass::Lower), Placement::Top).unwrap();
        let (mid1, pos) = stack.insert(view(StackingClass::Middle), Placement::Top).unwrap();
        assert_eq!(pos, 1);
        let (mid2, _) = stack.insert(view(StackingClass::Middle), Placement::Top).unwrap();
        let (mid0, _) = stack.insert(view(StackingClass::Middle), Placement::Bottom).unwrap();

        assert_eq!(order(&stack), vec![lower, mid0, mid1, mid2, upper]);

        assert_eq!(stack.restack(mid0, Placement::Top), Ok((1, 3)));
        assert_eq!(order(&stack), vec![lower, mid1, mid2, mid0, upper]);

        assert_eq!(stack.restack(mid0, Placement::Below(mid1)), Ok((3, 1)));
        assert_eq!(order(&stack), vec![lower, mid0, mid1, mid2, upper]);
    }

    #[test]
    fn relative_placement_needs_same_class() {
        let mut stack = WindowStack::new();
        let (lower, _) = stack.insert(view(StackingClass::Lower), Placement::Top).unwrap();
        let (mid, _) = stack.insert(view(StackingClass::Middle), Placement::Top).unwrap();

        assert_eq!(
            stack
                .insert(view(StackingClass::Middle), Placement::Above(lower))
                .map(|_| ()),
            Err(CompositorError::ClassMismatch)
        );
        assert_eq!(
            stack.restack(mid, Placement::Above(lower)),
            Err(CompositorError::ClassMismatch)
        );
        assert_eq!(order(&stack), vec![lower, mid]);

        let (mid2, pos) = stack
            .insert(view(StackingClass::Middle), Placement::Below(mid))
            .unwrap();
        assert_eq!(pos, 1);
        assert_eq!(order(&stack), vec![lower, mid2, mid]);
    }

    #[test]
    fn update_pending_flags() {
        let mut stack = WindowStack::new();
        let (a, _) = stack.insert(view(StackingClass::Middle), Placement::Top).unwrap();
        let (b, _) = stack.insert(view(StackingClass::Upper), Placement::Top).unwrap();

        stack.set_update_pending(a, true).unwrap();
        stack.set_update_pending(b, true).unwrap();
        assert!(stack.is_update_pending(a));

        assert_eq!(
            stack.clear_update_pending(|v| v.class == StackingClass::Middle),
            1
        );
        assert!(!stack.is_update_pending(a));
        assert!(stack.is_update_pending(b));

        stack.remove(b).unwrap();
        assert!(!stack.is_update_pending(b));
        assert_eq!(
            stack.set_update_pending(b, true),
            Err(CompositorError::BadWindow)
        );
    }
}
