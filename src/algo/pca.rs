use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sprs::CsMat;
use tracing::debug;

use super::DEFAULT_SEED;

pub const DEFAULT_MAX_ITER: usize = 1000;
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Eigenvalues below this are treated as absent directions.
const EIGEN_EPS: f64 = 1e-12;

/// Principal component analysis by power iteration.
///
/// The covariance matrix is never built: each step applies
/// `C v = Xcᵀ (Xc v) / max(n - 1, 1)` with `Xc` the column-centered input,
/// touching only the sparse non-zeros plus one dense pass for the mean.
/// Later components are kept orthogonal to earlier ones by Gram-Schmidt.
#[derive(Debug, Clone)]
pub struct Pca {
    n_components: usize,
    max_iter: usize,
    tolerance: f64,
    seed: u64,
}

/// Result of a PCA fit.
#[derive(Debug, Clone)]
pub struct PcaFit {
    /// Unit-length principal axes, or all-zero when the data has no variance left.
    pub components: Vec<Vec<f64>>,
    /// Variance captured by each component.
    pub explained_variance: Vec<f64>,
    /// Column means subtracted before projecting.
    pub mean: Vec<f64>,
}

impl PcaFit {
    /// Project rows onto the fitted components.
    pub fn transform(&self, data: &CsMat<f64>) -> Vec<Vec<f64>> {
        let offsets: Vec<f64> = self.components.iter().map(|c| dot(&self.mean, c)).collect();
        data.outer_iterator()
            .map(|row| {
                self.components
                    .iter()
                    .zip(offsets.iter())
                    .map(|(c, &offset)| {
                        if is_zero(c) {
                            return 0.0;
                        }
                        let x: f64 = row.iter().map(|(j, &v)| v * c[j]).sum();
                        x - offset
                    })
                    .collect()
            })
            .collect()
    }
}

impl Pca {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            max_iter: DEFAULT_MAX_ITER,
            tolerance: DEFAULT_TOLERANCE,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Fit and project in one step. Never fails; degenerate axes project to 0.
    pub fn fit_transform(&self, data: &CsMat<f64>) -> Vec<Vec<f64>> {
        self.fit(data).transform(data)
    }

    pub fn fit(&self, data: &CsMat<f64>) -> PcaFit {
        let n = data.rows();
        let dim = data.cols();
        let mean = column_means(data);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);

        let mut components: Vec<Vec<f64>> = Vec::with_capacity(self.n_components);
        let mut explained_variance: Vec<f64> = Vec::with_capacity(self.n_components);

        for _ in 0..self.n_components {
            let (component, variance) = if n < 2 || dim == 0 {
                (vec![0.0; dim], 0.0)
            } else {
                self.leading_eigenvector(data, &mean, &components, &mut rng)
            };
            components.push(component);
            explained_variance.push(variance);
        }

        debug!(
            rows = n,
            cols = dim,
            variance = ?explained_variance,
            "Fitted principal components"
        );

        PcaFit {
            components,
            explained_variance,
            mean,
        }
    }

    fn leading_eigenvector(
        &self,
        data: &CsMat<f64>,
        mean: &[f64],
        previous: &[Vec<f64>],
        rng: &mut ChaCha8Rng,
    ) -> (Vec<f64>, f64) {
        let dim = mean.len();
        let mut v: Vec<f64> = (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect();
        orthogonalize(&mut v, previous);
        if normalize(&mut v) == 0.0 {
            return (vec![0.0; dim], 0.0);
        }

        let mut eigenvalue = 0.0;
        for _ in 0..self.max_iter {
            let mut w = covariance_product(data, mean, &v);
            orthogonalize(&mut w, previous);
            eigenvalue = dot(&v, &w);
            if normalize(&mut w) < EIGEN_EPS {
                return (vec![0.0; dim], 0.0);
            }
            let converged = (1.0 - dot(&v, &w).abs()) < self.tolerance;
            v = w;
            if converged {
                break;
            }
        }

        if eigenvalue < EIGEN_EPS {
            return (vec![0.0; dim], 0.0);
        }
        flip_sign(&mut v);
        (v, eigenvalue)
    }
}

/// `Xcᵀ (Xc v) / max(n - 1, 1)` without materializing `Xc`.
fn covariance_product(data: &CsMat<f64>, mean: &[f64], v: &[f64]) -> Vec<f64> {
    let n = data.rows();
    let mean_dot = dot(mean, v);

    // Xc v
    let projected: Vec<f64> = data
        .outer_iterator()
        .map(|row| row.iter().map(|(j, &x)| x * v[j]).sum::<f64>() - mean_dot)
        .collect();

    // Xcᵀ p = Xᵀ p - mean * Σp
    let mut out = vec![0.0; mean.len()];
    for (row, &p) in data.outer_iterator().zip(projected.iter()) {
        for (j, &x) in row.iter() {
            out[j] += x * p;
        }
    }
    let total: f64 = projected.iter().sum();
    let scale = 1.0 / (n.saturating_sub(1).max(1)) as f64;
    for (o, &m) in out.iter_mut().zip(mean.iter()) {
        *o = (*o - m * total) * scale;
    }
    out
}

fn column_means(data: &CsMat<f64>) -> Vec<f64> {
    let n = data.rows();
    let mut mean = vec![0.0; data.cols()];
    if n == 0 {
        return mean;
    }
    for row in data.outer_iterator() {
        for (j, &x) in row.iter() {
            mean[j] += x;
        }
    }
    let inv = 1.0 / n as f64;
    for m in mean.iter_mut() {
        *m *= inv;
    }
    mean
}

fn orthogonalize(v: &mut [f64], basis: &[Vec<f64>]) {
    for b in basis {
        let proj = dot(v, b);
        if proj != 0.0 {
            for (x, &y) in v.iter_mut().zip(b.iter()) {
                *x -= proj * y;
            }
        }
    }
}

/// Scale to unit length in place; returns the original norm.
fn normalize(v: &mut [f64]) -> f64 {
    let norm = dot(v, v).sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    norm
}

/// Make the largest-magnitude entry positive (first one wins on ties).
fn flip_sign(v: &mut [f64]) {
    let mut pivot = 0.0f64;
    for &x in v.iter() {
        if x.abs() > pivot.abs() {
            pivot = x;
        }
    }
    if pivot < 0.0 {
        for x in v.iter_mut() {
            *x = -*x;
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn is_zero(v: &[f64]) -> bool {
    v.iter().all(|&x| x == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMat;

    fn matrix(rows: &[Vec<f64>]) -> CsMat<f64> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut tri = TriMat::new((rows.len(), cols));
        for (i, row) in rows.iter().enumerate() {
            for (j, &x) in row.iter().enumerate() {
                if x != 0.0 {
                    tri.add_triplet(i, j, x);
                }
            }
        }
        tri.to_csr()
    }

    #[test]
    fn default_seed_is_shared() {
        let data = matrix(&[
            vec![1.0, 0.0, 0.5],
            vec![0.0, 1.0, 0.2],
            vec![0.7, 0.7, 0.0],
            vec![0.0, 0.3, 1.0],
        ]);
        let implicit = Pca::new(2).fit_transform(&data);
        let explicit = Pca::new(2).with_seed(DEFAULT_SEED).fit_transform(&data);
        assert_eq!(implicit, explicit);
    }

    #[test]
    fn finds_dominant_axis() {
        // Variance lives almost entirely on column 0.
        let data = matrix(&[
            vec![-2.0, 0.1],
            vec![-1.0, -0.1],
            vec![1.0, -0.1],
            vec![2.0, 0.1],
        ]);
        let fit = Pca::new(2).fit(&data);
        assert!((fit.components[0][0].abs() - 1.0).abs() < 1e-6);
        assert!(fit.explained_variance[0] > fit.explained_variance[1]);
        // Largest entry is made positive.
        assert!(fit.components[0][0] > 0.0);
    }

    #[test]
    fn components_are_orthonormal() {
        let data = matrix(&[
            vec![1.0, 0.0, 0.5],
            vec![0.0, 1.0, 0.2],
            vec![0.7, 0.7, 0.0],
            vec![0.0, 0.3, 1.0],
            vec![0.4, 0.0, 0.9],
        ]);
        let fit = Pca::new(2).fit(&data);
        let c = &fit.components;
        assert!((dot(&c[0], &c[0]) - 1.0).abs() < 1e-9);
        assert!((dot(&c[1], &c[1]) - 1.0).abs() < 1e-9);
        assert!(dot(&c[0], &c[1]).abs() < 1e-6);
    }

    #[test]
    fn projection_is_centered() {
        let data = matrix(&[
            vec![1.0, 0.0, 0.0],
            vec![0.9, 0.1, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.0, 0.1, 0.9],
        ]);
        let points = Pca::new(2).fit_transform(&data);
        assert_eq!(points.len(), 4);
        for axis in 0..2 {
            let sum: f64 = points.iter().map(|p| p[axis]).sum();
            assert!(sum.abs() < 1e-9);
        }
        // The two groups land on opposite sides of the first axis.
        assert!(points[0][0] * points[2][0] < 0.0);
    }

    #[test]
    fn single_row_projects_to_origin() {
        let data = matrix(&[vec![0.3, 0.4]]);
        let points = Pca::new(2).fit_transform(&data);
        assert_eq!(points, vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn identical_rows_project_to_origin() {
        let data = matrix(&[vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]]);
        let points = Pca::new(2).fit_transform(&data);
        for p in points {
            assert_eq!(p, vec![0.0, 0.0]);
        }
    }

    #[test]
    fn one_dimensional_variance_zeroes_second_axis() {
        let data = matrix(&[vec![1.0, 0.0], vec![2.0, 0.0], vec![3.0, 0.0]]);
        let fit = Pca::new(2).fit(&data);
        assert!(fit.explained_variance[1] == 0.0);
        let points = fit.transform(&data);
        for p in &points {
            assert_eq!(p[1], 0.0);
        }
        assert!((points[0][0] + 1.0).abs() < 1e-9);
        assert!((points[2][0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_vocabulary_projects_to_origin() {
        let data = matrix(&[vec![], vec![]]);
        let points = Pca::new(2).fit_transform(&data);
        assert_eq!(points, vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn deterministic_for_seed() {
        let data = matrix(&[
            vec![1.0, 0.2, 0.0],
            vec![0.1, 1.0, 0.3],
            vec![0.0, 0.4, 1.0],
            vec![0.6, 0.0, 0.8],
        ]);
        let a = Pca::new(2).with_seed(3).fit_transform(&data);
        let b = Pca::new(2).with_seed(3).fit_transform(&data);
        assert_eq!(a, b);
    }
}
