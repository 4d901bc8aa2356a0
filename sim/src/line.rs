//! Bresenham tracing along a direction vector.

/// Integer scale applied to direction components before stepping.
const STEP_SCALE: f64 = 100.0;

/// Slack on the end coordinate so `dir * magnitude` rounding keeps the endpoint.
const END_SLACK: f64 = 1e-9;

/// Cells from `origin` along the direction `(dx, dy)` for `range` units.
///
/// The origin is always the first cell. The major axis is stepped one cell
/// at a time until it passes `origin + direction * range`; the minor axis
/// follows the accumulated error term.
pub fn trace_ray(origin: (i32, i32), dx: f64, dy: f64, range: f64) -> Vec<(i32, i32)> {
    let (x0, y0) = origin;
    let x1 = dx * range + f64::from(x0);
    let y1 = dy * range + f64::from(y0);
    let adx = (dx.abs() * STEP_SCALE).round() as i64;
    let ady = (dy.abs() * STEP_SCALE).round() as i64;
    let sx = if dx > 0.0 { 1 } else { -1 };
    let sy = if dy > 0.0 { 1 } else { -1 };

    let mut cells = Vec::new();
    let mut eps = 0i64;
    let (mut x, mut y) = (x0, y0);

    if adx > ady {
        while within(x, x1, sx) {
            cells.push((x, y));
            eps += ady;
            if eps * 2 >= adx {
                y += sy;
                eps -= adx;
            }
            x += sx;
        }
    } else {
        while within(y, y1, sy) {
            cells.push((x, y));
            eps += adx;
            if eps * 2 >= ady {
                x += sx;
                eps -= ady;
            }
            y += sy;
        }
    }
    cells
}

/// Cells on the line from `from` to `to`, both ends included.
pub fn trace_line(from: (i32, i32), to: (i32, i32)) -> Vec<(i32, i32)> {
    let dx = f64::from(to.0 - from.0);
    let dy = f64::from(to.1 - from.1);
    let magnitude = (dx * dx + dy * dy).sqrt();
    if magnitude == 0.0 {
        return vec![from];
    }
    trace_ray(from, dx / magnitude, dy / magnitude, magnitude)
}

#[inline]
fn within(coord: i32, end: f64, step: i32) -> bool {
    let c = f64::from(coord);
    if step < 0 {
        c >= end - END_SLACK
    } else {
        c <= end + END_SLACK
    }
}
