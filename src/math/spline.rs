use super::CubicFn;
use itertools::Itertools;
use log::warn;

/// The maximum number of Newton iterations used to find the smoothing weight.
const MAX_ITERATIONS: usize = 64;

/// Knots closer than this fraction of the data range are merged.
const KNOT_TOLERANCE: f64 = 1e-9;

/// A cubic smoothing spline.
///
/// Among all functions `g` with
/// `sum(((g(x_i) - y_i) / dy_i)^2) <= smoothing`, this is the one minimising
/// the integral of `g''(x)^2`, computed with Reinsch's algorithm.
/// A smoothing factor of zero interpolates the data with a natural spline,
/// while a very large one approaches the least-squares line.
#[derive(Clone, Debug)]
pub struct SmoothingSpline {
    /// The x-coordinates at which the pieces join, in ascending order.
    knots: Vec<f64>,
    /// The polynomial between each pair of adjacent knots.
    pieces: Vec<CubicFn>,
}

/// A data point, or several merged points sharing an x-coordinate.
#[derive(Clone, Copy)]
struct Knot {
    x: f64,
    sum: f64,
    sum_sq: f64,
    count: f64,
}

impl Knot {
    fn new((x, y): (f64, f64)) -> Self {
        Self {
            x,
            sum: y,
            sum_sq: y * y,
            count: 1.0,
        }
    }

    fn merge(self, other: Self) -> Self {
        Self {
            x: self.x,
            sum: self.sum + other.sum,
            sum_sq: self.sum_sq + other.sum_sq,
            count: self.count + other.count,
        }
    }

    fn mean(&self) -> f64 {
        self.sum / self.count
    }

    /// The residual any function must incur at this knot.
    fn spread(&self) -> f64 {
        f64::max(self.sum_sq - self.sum * self.sum / self.count, 0.0)
    }
}

impl SmoothingSpline {
    /// Fits a smoothing spline to the given samples.
    ///
    /// Samples must be ordered by `x`; non-finite samples are ignored.
    /// Returns `None` if no finite samples remain.
    pub fn fit(xs: &[f64], ys: &[f64], smoothing: f64) -> Option<Self> {
        let points: Vec<_> = xs
            .iter()
            .copied()
            .zip(ys.iter().copied())
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect();
        let (first, last) = (points.first()?.0, points.last()?.0);
        let tolerance = KNOT_TOLERANCE * f64::max(1.0, last - first);

        let knots: Vec<Knot> = points
            .into_iter()
            .map(Knot::new)
            .coalesce(|a, b| {
                if b.x - a.x <= tolerance {
                    Ok(a.merge(b))
                } else {
                    Err((a, b))
                }
            })
            .collect();

        if knots.len() == 1 {
            return Some(Self {
                knots: vec![knots[0].x],
                pieces: vec![CubicFn::constant(knots[0].mean())],
            });
        }

        // Merged samples consume part of the residual budget up front
        let spread: f64 = knots.iter().map(Knot::spread).sum();
        let smoothing = f64::max(smoothing - spread, 0.0);

        let x: Vec<_> = knots.iter().map(|k| k.x).collect();
        let y: Vec<_> = knots.iter().map(Knot::mean).collect();
        let dy: Vec<_> = knots.iter().map(|k| k.count.sqrt().recip()).collect();
        let pieces = reinsch(&x, &y, &dy, smoothing);

        Some(Self { knots: x, pieces })
    }

    /// Evaluates the spline, extrapolating beyond the end knots with the
    /// outermost pieces.
    pub fn sample(&self, x: f64) -> f64 {
        let idx = self.knots.partition_point(|k| *k <= x);
        let idx = usize::min(idx.saturating_sub(1), self.pieces.len() - 1);
        self.pieces[idx].y(x)
    }
}

/// Reinsch's smoothing spline (Numer. Math. 10, 1967).
///
/// Requires at least two strictly increasing knots. The work arrays are
/// padded by two entries at either end so the recurrences can address
/// neighbours of the first and last knots, which stay zero.
fn reinsch(xs: &[f64], ys: &[f64], dys: &[f64], s: f64) -> Vec<CubicFn> {
    let n = xs.len();
    let padded = |v: &[f64]| {
        let mut out = vec![0.0; n + 4];
        out[2..n + 2].copy_from_slice(v);
        out
    };
    let (x, y, dy) = (padded(xs), padded(ys), padded(dys));
    let zeros = || vec![0.0; n + 4];
    let (mut r, mut r1, mut r2) = (zeros(), zeros(), zeros());
    let (mut t, mut t1, mut u, mut v) = (zeros(), zeros(), zeros(), zeros());
    let (mut a, mut b, mut c, mut d) = (zeros(), zeros(), zeros(), zeros());

    let (n1, n2) = (2, n + 1);
    let (m1, m2) = (n1 + 1, n2 - 1);

    // Set up the banded systems
    let mut h = x[m1] - x[n1];
    let mut f = (y[m1] - y[n1]) / h;
    for i in m1..=m2 {
        let g = h;
        h = x[i + 1] - x[i];
        let e = f;
        f = (y[i + 1] - y[i]) / h;
        a[i] = f - e;
        t[i] = 2.0 * (g + h) / 3.0;
        t1[i] = h / 3.0;
        r2[i] = dy[i - 1] / g;
        r[i] = dy[i + 1] / h;
        r1[i] = -dy[i] / g - dy[i] / h;
    }
    for i in m1..=m2 {
        b[i] = r[i] * r[i] + r1[i] * r1[i] + r2[i] * r2[i];
        c[i] = r[i] * r1[i + 1] + r1[i] * r2[i + 1];
        d[i] = r[i] * r2[i + 2];
    }

    let mut p = 0.0;
    let mut f2 = -s;
    let mut iterations = 0;
    loop {
        // Factorise and solve for the second derivatives
        let (mut f, mut g, mut h) = (0.0, 0.0, 0.0);
        for i in m1..=m2 {
            r1[i - 1] = f * r[i - 1];
            r2[i - 2] = g * r[i - 2];
            r[i] = 1.0 / (p * b[i] + t[i] - f * r1[i - 1] - g * r2[i - 2]);
            u[i] = a[i] - r1[i - 1] * u[i - 1] - r2[i - 2] * u[i - 2];
            f = p * c[i] + t1[i] - h * r1[i - 1];
            g = h;
            h = d[i] * p;
        }
        for i in (m1..=m2).rev() {
            u[i] = r[i] * u[i] - r1[i] * u[i + 1] - r2[i] * u[i + 2];
        }

        // Residuals of the current fit
        let mut e = 0.0;
        let mut h = 0.0;
        for i in n1..=m2 {
            let g = h;
            h = (u[i + 1] - u[i]) / (x[i + 1] - x[i]);
            v[i] = (h - g) * dy[i] * dy[i];
            e += v[i] * (h - g);
        }
        v[n2] = -h * dy[n2] * dy[n2];
        e -= v[n2] * h;

        let prev = f2;
        f2 = e * p * p;
        if f2 >= s || f2 <= prev {
            break;
        }
        if iterations == MAX_ITERATIONS {
            warn!("Smoothing spline did not converge after {} iterations", MAX_ITERATIONS);
            break;
        }
        iterations += 1;

        // Newton step on the smoothing weight
        let mut f = 0.0;
        let mut h = (v[m1] - v[n1]) / (x[m1] - x[n1]);
        for i in m1..=m2 {
            let g = h;
            h = (v[i + 1] - v[i]) / (x[i + 1] - x[i]);
            let g = h - g - r1[i - 1] * r[i - 1] - r2[i - 2] * r[i - 2];
            f += g * r[i] * g;
            r[i] = g;
        }
        let h = e - p * f;
        if h <= 0.0 {
            break;
        }
        p += (s - f2) / (((s / e).sqrt() + p) * h);
    }

    for i in n1..=n2 {
        a[i] = y[i] - p * v[i];
        c[i] = u[i];
    }
    (n1..=m2)
        .map(|i| {
            let h = x[i + 1] - x[i];
            d[i] = (c[i + 1] - c[i]) / (3.0 * h);
            b[i] = (a[i + 1] - a[i]) / h - (h * d[i] + c[i]) * h;
            CubicFn::about(x[i], a[i], b[i], c[i], d[i])
        })
        .collect()
}
