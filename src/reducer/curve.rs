// curve.rs - fit the low-dimensional similarity curve 1 / (1 + a * d^(2b))

const SAMPLES: usize = 300;
const GRID: usize = 41;
const ROUNDS: usize = 6;

/// Least-squares fit of `a` and `b` against the target curve: 1 inside
/// `min_dist`, exponential decay with scale `spread` beyond it. Coarse-to-fine
/// grid search, so the result is identical on every run.
pub fn find_ab_params(spread: f32, min_dist: f32) -> (f32, f32) {
    let spread = f64::from(spread);
    let min_dist = f64::from(min_dist);

    let xs: Vec<f64> = (0..SAMPLES)
        .map(|i| spread * 3.0 * i as f64 / (SAMPLES - 1) as f64)
        .collect();
    let ys: Vec<f64> = xs
        .iter()
        .map(|&x| {
            if x < min_dist {
                1.0
            } else {
                (-(x - min_dist) / spread).exp()
            }
        })
        .collect();

    let sse = |a: f64, b: f64| -> f64 {
        xs.iter()
            .zip(&ys)
            .map(|(&x, &y)| {
                let fit = 1.0 / (1.0 + a * x.powf(2.0 * b));
                (fit - y) * (fit - y)
            })
            .sum()
    };

    let (mut a_lo, mut a_hi) = (0.01f64, 10.0f64);
    let (mut b_lo, mut b_hi) = (0.1f64, 2.0f64);
    let mut best = (1.0f64, 1.0f64, f64::INFINITY);

    for _ in 0..ROUNDS {
        let a_step = (a_hi - a_lo) / (GRID - 1) as f64;
        let b_step = (b_hi - b_lo) / (GRID - 1) as f64;

        for ia in 0..GRID {
            let a = a_lo + ia as f64 * a_step;
            for ib in 0..GRID {
                let b = b_lo + ib as f64 * b_step;
                let err = sse(a, b);
                if err < best.2 {
                    best = (a, b, err);
                }
            }
        }

        a_lo = (best.0 - 2.0 * a_step).max(1e-4);
        a_hi = best.0 + 2.0 * a_step;
        b_lo = (best.1 - 2.0 * b_step).max(1e-3);
        b_hi = best.1 + 2.0 * b_step;
    }

    (best.0 as f32, best.1 as f32)
}
