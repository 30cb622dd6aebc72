//! Boolean operations on regions.
//!
//! All three binary operations are implemented by a single band sweep,
//! [`region_op`], parameterized by a function processing horizontal spans in
//! the rows where both operands have boxes, and by whether rows covered by
//! only one operand are copied to the output.
//!
//! The sweep proceeds from top to bottom. For every output band, the band is
//! coalesced with the previous one if they are vertically adjacent and have
//! identical spans. Doing this as we go keeps the output canonical without a
//! separate normalization pass.
use cggeom::{box2, prelude::*, Box2};
use std::cmp::{max, min};

use super::{band_len, try_reserve, Region, RegionError, RegionState};

type Result<T> = std::result::Result<T, RegionError>;

/// Processes the overlapping part of a band from each operand, emitting boxes
/// spanning the rows `y1..y2` to `out`.
type OverlapFn = fn(
    out: &mut Vec<Box2<i32>>,
    band1: &[Box2<i32>],
    band2: &[Box2<i32>],
    y1: i32,
    y2: i32,
) -> Result<()>;

impl Region {
    /// Compute the union of `self` and `other`.
    pub fn union(&self, other: &Region) -> Result<Region> {
        if other.is_empty() {
            return self.try_clone();
        }
        if self.is_empty() {
            return other.try_clone();
        }
        if self.state() == RegionState::Single && self.extents.contains_box(&other.extents) {
            return Ok(self.clone());
        }
        if other.state() == RegionState::Single && other.extents.contains_box(&self.extents) {
            return Ok(other.clone());
        }

        region_op(self, other, union_o, true, true)
    }

    /// Compute the intersection of `self` and `other`.
    pub fn intersect(&self, other: &Region) -> Result<Region> {
        let overlap = match self.extents.intersection(&other.extents) {
            Some(x) if !self.is_empty() && !other.is_empty() => x,
            _ => return Ok(Region::new()),
        };

        match (self.state(), other.state()) {
            (RegionState::Single, RegionState::Single) => Ok(Region::from_box(overlap)),
            (RegionState::Single, _) if self.extents.contains_box(&other.extents) => {
                other.try_clone()
            }
            (_, RegionState::Single) if other.extents.contains_box(&self.extents) => {
                self.try_clone()
            }
            _ => region_op(self, other, intersect_o, false, false),
        }
    }

    /// Compute `self` minus `other`.
    pub fn subtract(&self, other: &Region) -> Result<Region> {
        if self.is_empty()
            || other.is_empty()
            || self.extents.intersection(&other.extents).is_none()
        {
            return self.try_clone();
        }
        if other.state() == RegionState::Single && other.extents.contains_box(&self.extents) {
            return Ok(Region::new());
        }

        region_op(self, other, subtract_o, true, false)
    }

    /// Compute `bounds` minus `self`.
    pub fn inverse(&self, bounds: Box2<i32>) -> Result<Region> {
        Region::from_box(bounds).subtract(self)
    }

    pub fn union_box(&self, bx: Box2<i32>) -> Result<Region> {
        self.union(&Region::from_box(bx))
    }

    pub fn intersect_box(&self, bx: Box2<i32>) -> Result<Region> {
        self.intersect(&Region::from_box(bx))
    }

    pub fn subtract_box(&self, bx: Box2<i32>) -> Result<Region> {
        self.subtract(&Region::from_box(bx))
    }

    /// Replace `self` with the union of `self` and `other`. `self` is left
    /// unchanged on error.
    pub fn union_assign(&mut self, other: &Region) -> Result<()> {
        *self = self.union(other)?;
        Ok(())
    }

    /// Replace `self` with the intersection of `self` and `other`. `self` is
    /// left unchanged on error.
    pub fn intersect_assign(&mut self, other: &Region) -> Result<()> {
        *self = self.intersect(other)?;
        Ok(())
    }

    /// Replace `self` with `self` minus `other`. `self` is left unchanged on
    /// error.
    pub fn subtract_assign(&mut self, other: &Region) -> Result<()> {
        *self = self.subtract(other)?;
        Ok(())
    }
}

/// The band sweep. Both operands must be non-empty.
///
/// `append1` (`append2`) indicates whether the rows where only `reg1`
/// (`reg2`) has boxes are included in the output.
fn region_op(
    reg1: &Region,
    reg2: &Region,
    overlap: OverlapFn,
    append1: bool,
    append2: bool,
) -> Result<Region> {
    let (r1, r2) = (reg1.boxes(), reg2.boxes());
    debug_assert!(!r1.is_empty() && !r2.is_empty());

    let mut out = Vec::new();
    try_reserve(&mut out, max(r1.len(), r2.len()) * 2)?;

    let (mut i1, mut i2) = (0, 0);

    // The bottom of the last processed band. Parts of the current bands of
    // `r1` and `r2` above this have already been processed.
    let mut ybot = min(r1[0].min.y, r2[0].min.y);

    // The start of the last band in `out`, which is the coalescing candidate
    let mut prev_band = 0;

    while i1 < r1.len() && i2 < r2.len() {
        let e1 = i1 + band_len(&r1[i1..], r1[i1].min.y);
        let e2 = i2 + band_len(&r2[i2..], r2[i2].min.y);
        let (r1y1, r2y1) = (r1[i1].min.y, r2[i2].min.y);

        // Process the non-overlapping part of the band that starts first
        let ytop = if r1y1 < r2y1 {
            if append1 {
                let top = max(r1y1, ybot);
                let bot = min(r1[i1].max.y, r2y1);
                if top < bot {
                    let cur_band = out.len();
                    append_band(&mut out, &r1[i1..e1], top, bot)?;
                    prev_band = coalesce(&mut out, prev_band, cur_band);
                }
            }
            r2y1
        } else if r2y1 < r1y1 {
            if append2 {
                let top = max(r2y1, ybot);
                let bot = min(r2[i2].max.y, r1y1);
                if top < bot {
                    let cur_band = out.len();
                    append_band(&mut out, &r2[i2..e2], top, bot)?;
                    prev_band = coalesce(&mut out, prev_band, cur_band);
                }
            }
            r1y1
        } else {
            r1y1
        };

        // Process the overlapping part
        ybot = min(r1[i1].max.y, r2[i2].max.y);
        if ybot > ytop {
            let cur_band = out.len();
            overlap(&mut out, &r1[i1..e1], &r2[i2..e2], ytop, ybot)?;
            prev_band = coalesce(&mut out, prev_band, cur_band);
        }

        // Move on to the next band of whichever operand is done
        if r1[i1].max.y == ybot {
            i1 = e1;
        }
        if r2[i2].max.y == ybot {
            i2 = e2;
        }
    }

    // Copy the remaining bands of the operand that still has some. Only the
    // first band may be partially processed or coalescible.
    let rest = if i1 < r1.len() && append1 {
        Some(&r1[i1..])
    } else if i2 < r2.len() && append2 {
        Some(&r2[i2..])
    } else {
        None
    };

    if let Some(rest) = rest {
        let end = band_len(rest, rest[0].min.y);
        let cur_band = out.len();
        append_band(&mut out, &rest[..end], max(rest[0].min.y, ybot), rest[0].max.y)?;
        coalesce(&mut out, prev_band, cur_band);

        try_reserve(&mut out, rest.len() - end)?;
        out.extend_from_slice(&rest[end..]);
    }

    Ok(Region::from_canonical(out))
}

/// Try to merge the band starting at `cur_band` (which extends to the end of
/// `out`) into the band `prev_band..cur_band`. Returns the start of the last
/// band after the operation.
fn coalesce(out: &mut Vec<Box2<i32>>, prev_band: usize, cur_band: usize) -> usize {
    let num = cur_band - prev_band;
    if num == 0 || out.len() - cur_band != num {
        return cur_band;
    }

    let (prev, cur) = out[prev_band..].split_at(num);
    if prev[0].max.y != cur[0].min.y {
        return cur_band;
    }
    if prev
        .iter()
        .zip(cur.iter())
        .any(|(p, c)| p.min.x != c.min.x || p.max.x != c.max.x)
    {
        return cur_band;
    }

    let y2 = cur[0].max.y;
    for bx in out[prev_band..cur_band].iter_mut() {
        bx.max.y = y2;
    }
    out.truncate(cur_band);

    prev_band
}

fn push_box(out: &mut Vec<Box2<i32>>, x1: i32, y1: i32, x2: i32, y2: i32) -> Result<()> {
    debug_assert!(x1 < x2 && y1 < y2);
    if out.len() == out.capacity() {
        try_reserve(out, max(out.len(), 8))?;
    }
    out.push(box2! { min: [x1, y1], max: [x2, y2] });
    Ok(())
}

/// Copy the spans of `band` to `out`, spanning the rows `y1..y2`.
fn append_band(out: &mut Vec<Box2<i32>>, band: &[Box2<i32>], y1: i32, y2: i32) -> Result<()> {
    for bx in band.iter() {
        push_box(out, bx.min.x, y1, bx.max.x, y2)?;
    }
    Ok(())
}

fn union_o(
    out: &mut Vec<Box2<i32>>,
    band1: &[Box2<i32>],
    band2: &[Box2<i32>],
    y1: i32,
    y2: i32,
) -> Result<()> {
    let (mut i1, mut i2) = (0, 0);
    let mut span: Option<(i32, i32)> = None;

    loop {
        // Take the box with the smallest left edge
        let bx = if i1 < band1.len() && (i2 >= band2.len() || band1[i1].min.x < band2[i2].min.x)
        {
            i1 += 1;
            band1[i1 - 1]
        } else if i2 < band2.len() {
            i2 += 1;
            band2[i2 - 1]
        } else {
            break;
        };

        span = Some(match span {
            // Overlapping or touching; extend the current span
            Some((x1, x2)) if bx.min.x <= x2 => (x1, max(x2, bx.max.x)),
            Some((x1, x2)) => {
                push_box(out, x1, y1, x2, y2)?;
                (bx.min.x, bx.max.x)
            }
            None => (bx.min.x, bx.max.x),
        });
    }

    if let Some((x1, x2)) = span {
        push_box(out, x1, y1, x2, y2)?;
    }
    Ok(())
}

fn intersect_o(
    out: &mut Vec<Box2<i32>>,
    band1: &[Box2<i32>],
    band2: &[Box2<i32>],
    y1: i32,
    y2: i32,
) -> Result<()> {
    let (mut i1, mut i2) = (0, 0);

    while i1 < band1.len() && i2 < band2.len() {
        let (a, b) = (band1[i1], band2[i2]);
        let x1 = max(a.min.x, b.min.x);
        let x2 = min(a.max.x, b.max.x);

        if x1 < x2 {
            push_box(out, x1, y1, x2, y2)?;
        }

        // Advance whichever ends first (possibly both)
        if a.max.x == x2 {
            i1 += 1;
        }
        if b.max.x == x2 {
            i2 += 1;
        }
    }
    Ok(())
}

fn subtract_o(
    out: &mut Vec<Box2<i32>>,
    band1: &[Box2<i32>],
    band2: &[Box2<i32>],
    y1: i32,
    y2: i32,
) -> Result<()> {
    let (mut i1, mut i2) = (0, 0);

    // The left edge of the part of the current minuend yet to be processed
    let mut x1 = band1[0].min.x;

    while i1 < band1.len() && i2 < band2.len() {
        let (m, s) = (band1[i1], band2[i2]);

        if s.max.x <= x1 {
            // The subtrahend is entirely to the left
            i2 += 1;
            continue;
        }

        if s.min.x < m.max.x && s.min.x > x1 {
            // The subtrahend starts inside the minuend. Emit the part to its
            // left.
            push_box(out, x1, y1, s.min.x, y2)?;
        }

        if s.min.x < m.max.x {
            // The subtrahend covers the minuend from `max(x1, s.min.x)`
            x1 = s.max.x;
            if x1 >= m.max.x {
                // The minuend is used up
                i1 += 1;
                if i1 < band1.len() {
                    x1 = band1[i1].min.x;
                }
            } else {
                i2 += 1;
            }
        } else {
            // The subtrahend starts after the minuend ends
            push_box(out, x1, y1, m.max.x, y2)?;
            i1 += 1;
            if i1 < band1.len() {
                x1 = band1[i1].min.x;
            }
        }
    }

    // Minuends left after all subtrahends are used up
    while i1 < band1.len() {
        push_box(out, x1, y1, band1[i1].max.x, y2)?;
        i1 += 1;
        if i1 < band1.len() {
            x1 = band1[i1].min.x;
        }
    }
    Ok(())
}
