//! Precise shadowcasting.
//!
//! Visits the rings around an origin outward, one ring per radius step. Each
//! ring cell covers an equal arc of the full circle; opaque cells add their
//! arc to the shadow list and later cells report the fraction of their arc
//! that is still unshadowed. Arcs are kept as exact integer fractions of a
//! full turn so shadow edges compare without rounding.

/// A point on the circle as `numerator / denominator` of a full turn.
type Arc = (i64, i64);

/// Ring walk directions, clockwise starting upward.
const RING_DIRS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Cells at Chebyshev distance `r` from the centre, starting bottom-left.
pub fn ring(cx: i32, cy: i32, r: i32) -> Vec<(i32, i32)> {
    let mut cells = Vec::with_capacity((8 * r.max(0)) as usize);
    let mut x = cx - r;
    let mut y = cy + r;
    for (dx, dy) in RING_DIRS {
        for _ in 0..(2 * r) {
            cells.push((x, y));
            x += dx;
            y += dy;
        }
    }
    cells
}

/// Sweep visibility from `(ox, oy)` out to `radius`.
///
/// `visit(x, y, r, visibility)` fires once for each cell with non-zero
/// visibility (0, 1], the origin first with `r == 0`. Opaque cells are
/// visited but stop light behind them. An opaque origin sees only itself.
pub fn compute<P, V>(ox: i32, oy: i32, radius: u32, light_passes: P, mut visit: V)
where
    P: Fn(i32, i32) -> bool,
    V: FnMut(i32, i32, u32, f64),
{
    visit(ox, oy, 0, 1.0);
    if !light_passes(ox, oy) {
        return;
    }

    let mut shadows: Vec<Arc> = Vec::new();
    for r in 1..=radius {
        let cells = ring(ox, oy, r as i32);
        let n = cells.len() as i64;
        for (i, &(cx, cy)) in cells.iter().enumerate() {
            let i = i as i64;
            let a1 = (if i > 0 { 2 * i - 1 } else { 2 * n - 1 }, 2 * n);
            let a2 = (2 * i + 1, 2 * n);

            let blocks = !light_passes(cx, cy);
            let visibility = check_visibility(a1, a2, blocks, &mut shadows);
            if visibility > 0.0 {
                visit(cx, cy, r, visibility);
            }

            // Whole circle shadowed.
            if shadows.len() == 2 && shadows[0].0 == 0 && shadows[1].0 == shadows[1].1 {
                return;
            }
        }
    }
}

/// Fraction of the arc `a1..a2` left visible; merges it into `shadows`
/// when the cell blocks.
fn check_visibility(a1: Arc, a2: Arc, blocks: bool, shadows: &mut Vec<Arc>) -> f64 {
    if a1.0 > a2.0 {
        // Arc wraps through zero: split it.
        let v1 = check_visibility(a1, (a1.1, a1.1), blocks, shadows);
        let v2 = check_visibility((0, 1), a2, blocks, shadows);
        return (v1 + v2) / 2.0;
    }

    // First shadow edge at or after a1.
    let mut index1 = 0usize;
    let mut edge1 = false;
    while index1 < shadows.len() {
        let old = shadows[index1];
        let diff = old.0 * a1.1 - a1.0 * old.1;
        if diff >= 0 {
            if diff == 0 && index1 % 2 == 0 {
                edge1 = true;
            }
            break;
        }
        index1 += 1;
    }

    // Last shadow edge at or before a2.
    let mut index2 = shadows.len() as isize;
    let mut edge2 = false;
    loop {
        index2 -= 1;
        if index2 < 0 {
            break;
        }
        let old = shadows[index2 as usize];
        let diff = a2.0 * old.1 - old.0 * a2.1;
        if diff >= 0 {
            if diff == 0 && index2 % 2 != 0 {
                edge2 = true;
            }
            break;
        }
    }

    let i1 = index1 as isize;
    let hidden = (i1 == index2 && (edge1 || edge2))
        || (edge1 && edge2 && i1 + 1 == index2 && index2 % 2 != 0)
        || (i1 > index2 && i1 % 2 != 0);
    if hidden {
        return 0.0;
    }

    let remove = (index2 - i1 + 1).max(0) as usize;
    let visible_length = if remove % 2 == 1 {
        if i1 % 2 != 0 {
            // a1 inside a shadow, a2 outside.
            let p = shadows[index1];
            let len = ratio(a2.0 * p.1 - p.0 * a2.1, p.1 * a2.1);
            if blocks {
                shadows.drain(index1..index1 + remove);
                shadows.insert(index1, a2);
            }
            len
        } else {
            // a2 inside a shadow, a1 outside.
            let p = shadows[index2 as usize];
            let len = ratio(p.0 * a1.1 - a1.0 * p.1, a1.1 * p.1);
            if blocks {
                shadows.drain(index1..index1 + remove);
                shadows.insert(index1, a1);
            }
            len
        }
    } else if i1 % 2 != 0 {
        // Both edges inside shadows: only the gap between them shows.
        let p1 = shadows[index1];
        let p2 = shadows[index2 as usize];
        let len = ratio(p2.0 * p1.1 - p1.0 * p2.1, p1.1 * p2.1);
        if blocks {
            shadows.drain(index1..index1 + remove);
        }
        len
    } else {
        if blocks {
            shadows.drain(index1..index1 + remove);
            shadows.insert(index1, a1);
            shadows.insert(index1 + 1, a2);
        }
        return 1.0;
    };

    let arc_length = ratio(a2.0 * a1.1 - a1.0 * a2.1, a1.1 * a2.1);
    visible_length / arc_length
}

#[inline]
fn ratio(num: i64, den: i64) -> f64 {
    num as f64 / den as f64
}
