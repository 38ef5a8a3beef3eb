use ndarray::{s, linalg::general_mat_mul, Array2, ArrayView1, ArrayView2, ArrayViewMut2, Axis};
use rayon::prelude::*;

use crate::error::{Error, Result};

/// Compute strategy for the dense product
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DenseStrategy {
    Direct,       // ndarray general_mat_mul
    Blocked,      // Block-based multiplication for cache efficiency
}

/// Grouped dense product: `Y = X W^T + b`.
///
/// `data` is `(rows, F)`, `weight` is `(H, F / groups)` and `bias` is `(H)`.
/// Group `g` multiplies feature columns `[g*F/G, (g+1)*F/G)` with weight rows
/// `[g*H/G, (g+1)*H/G)` and writes the same range of output columns.
pub fn compute_dense(
    data: &ArrayView2<f32>,
    weight: &ArrayView2<f32>,
    bias: Option<&ArrayView1<f32>>,
    groups: usize,
) -> Result<Array2<f32>> {
    let (rows, features) = data.dim();
    let (hidden, group_features) = weight.dim();

    if groups == 0 || hidden == 0 || features % groups != 0 || hidden % groups != 0 {
        return Err(Error::Execution(format!(
            "Dense product cannot split {} features and {} hidden units into {} groups",
            features, hidden, groups
        )));
    }

    if features / groups != group_features {
        return Err(Error::Execution(format!(
            "Incompatible weight shape for dense product: expected [{}, {}], got [{}, {}]",
            hidden, features / groups, hidden, group_features
        )));
    }

    if let Some(b) = bias {
        if b.len() != hidden {
            return Err(Error::Execution(format!(
                "Incompatible bias shape for dense product: expected [{}], got [{}]",
                hidden, b.len()
            )));
        }
    }

    let group_hidden = hidden / groups;
    let strategy = optimize_dense_for_shapes(rows, group_features, group_hidden);
    let mut result = Array2::<f32>::zeros((rows, hidden));

    // Each group writes a disjoint block of output columns
    result
        .axis_chunks_iter_mut(Axis(1), group_hidden)
        .into_par_iter()
        .enumerate()
        .for_each(|(g, mut y)| {
            let x = data.slice(s![.., g * group_features..(g + 1) * group_features]);
            let w = weight.slice(s![g * group_hidden..(g + 1) * group_hidden, ..]);

            match strategy {
                DenseStrategy::Direct => general_mat_mul(1.0, &x, &w.t(), 0.0, &mut y),
                DenseStrategy::Blocked => dense_blocked(&x, &w, &mut y),
            }
        });

    if let Some(b) = bias {
        for mut row in result.rows_mut() {
            row += b;
        }
    }

    Ok(result)
}

/// Pick a strategy from the per-group problem size
pub fn optimize_dense_for_shapes(rows: usize, features: usize, hidden: usize) -> DenseStrategy {
    let x_elements = rows * features;
    let w_elements = hidden * features;

    if x_elements < 1000 || w_elements < 1000 || x_elements > 100_000 {
        DenseStrategy::Direct
    } else {
        DenseStrategy::Blocked
    }
}

/// Blocked `Y = X W^T`; `y` must be zeroed by the caller
fn dense_blocked(x: &ArrayView2<f32>, w: &ArrayView2<f32>, y: &mut ArrayViewMut2<f32>) {
    let (m, k) = x.dim();
    let n = w.nrows();

    const BLOCK_SIZE: usize = 64;

    for i in (0..m).step_by(BLOCK_SIZE) {
        let i_end = std::cmp::min(i + BLOCK_SIZE, m);

        for j in (0..n).step_by(BLOCK_SIZE) {
            let j_end = std::cmp::min(j + BLOCK_SIZE, n);

            for k_block in (0..k).step_by(BLOCK_SIZE) {
                let k_end = std::cmp::min(k_block + BLOCK_SIZE, k);

                for ii in i..i_end {
                    for jj in j..j_end {
                        let mut acc = 0.0;
                        for kk in k_block..k_end {
                            acc += x[[ii, kk]] * w[[jj, kk]];
                        }
                        y[[ii, jj]] += acc;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array};
    use rand::prelude::*;

    fn naive(x: &Array2<f32>, w: &Array2<f32>, b: Option<&Array<f32, ndarray::Ix1>>, groups: usize) -> Array2<f32> {
        let (rows, features) = x.dim();
        let hidden = w.nrows();
        let (fg, hg) = (features / groups, hidden / groups);
        let mut y = Array2::zeros((rows, hidden));
        for r in 0..rows {
            for h in 0..hidden {
                let g = h / hg;
                let mut acc = b.map(|b| b[h]).unwrap_or(0.0);
                for k in 0..fg {
                    acc += x[[r, g * fg + k]] * w[[h, k]];
                }
                y[[r, h]] = acc;
            }
        }
        y
    }

    fn random(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<f32> {
        Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-1.0..1.0))
    }

    #[test]
    fn test_dense_small() {
        let x = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        let w = arr2(&[[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
        let b = arr1(&[0.5, -0.5, 0.0]);

        let y = compute_dense(&x.view(), &w.view(), Some(&b.view()), 1).unwrap();
        assert_eq!(y, arr2(&[[1.5, 1.5, 3.0], [3.5, 3.5, 7.0]]));
    }

    #[test]
    fn test_dense_groups() {
        // Two groups: first half of features feeds first half of outputs
        let x = arr2(&[[1.0, 2.0, 3.0, 4.0]]);
        let w = arr2(&[[1.0, 1.0], [2.0, 0.0]]);

        let y = compute_dense(&x.view(), &w.view(), None, 2).unwrap();
        assert_eq!(y, arr2(&[[3.0, 6.0]]));
    }

    #[test]
    fn test_strategies_agree_with_naive() {
        let mut rng = StdRng::seed_from_u64(7);
        for &(rows, features, hidden, groups) in &[(4, 8, 6, 2), (40, 96, 64, 1), (64, 128, 96, 4)] {
            let x = random(rows, features, &mut rng);
            let w = random(hidden, features / groups, &mut rng);
            let b = Array::from_shape_fn(hidden, |_| rng.gen_range(-1.0..1.0));

            let y = compute_dense(&x.view(), &w.view(), Some(&b.view()), groups).unwrap();
            let expected = naive(&x, &w, Some(&b), groups);
            for (a, e) in y.iter().zip(expected.iter()) {
                assert!((a - e).abs() < 1e-4, "{} vs {}", a, e);
            }
        }
    }

    #[test]
    fn test_shape_mismatch() {
        let x = Array2::<f32>::zeros((2, 4));
        let w = Array2::<f32>::zeros((3, 3));
        assert!(compute_dense(&x.view(), &w.view(), None, 1).is_err());

        let w = Array2::<f32>::zeros((3, 4));
        let b = arr1(&[0.0, 0.0]);
        assert!(compute_dense(&x.view(), &w.view(), Some(&b.view()), 1).is_err());
        assert!(compute_dense(&x.view(), &w.view(), None, 3).is_err());
    }
}
