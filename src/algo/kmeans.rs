use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use sprs::{CsMat, CsVecView};
use tracing::debug;

use super::DEFAULT_SEED;
use crate::error::{Error, Result};

pub const DEFAULT_N_INIT: usize = 10;
pub const DEFAULT_MAX_ITER: usize = 300;

/// K-means (Lloyd's algorithm) over sparse rows with k-means++ seeding.
///
/// Runs `n_init` independent initializations and keeps the one with the
/// lowest inertia. Every random choice flows from `seed`, so the same matrix
/// and seed always yield the same labels.
#[derive(Debug, Clone)]
pub struct Kmeans {
    k: usize,
    n_init: usize,
    max_iter: usize,
    seed: u64,
}

/// Result of a k-means fit.
#[derive(Debug, Clone)]
pub struct KmeansFit {
    /// Cluster id in `[0, k)` for each row.
    pub labels: Vec<usize>,
    /// Dense centroid per cluster (vocabulary-sized).
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances from each row to its centroid.
    pub inertia: f64,
    /// Lloyd iterations used by the winning run.
    pub n_iter: usize,
}

impl Kmeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            n_init: DEFAULT_N_INIT,
            max_iter: DEFAULT_MAX_ITER,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter.max(1);
        self
    }

    pub fn n_clusters(&self) -> usize {
        self.k
    }

    /// Fit and return one label per row.
    pub fn fit_predict(&self, data: &CsMat<f64>) -> Result<Vec<usize>> {
        Ok(self.fit(data)?.labels)
    }

    pub fn fit(&self, data: &CsMat<f64>) -> Result<KmeansFit> {
        let n = data.rows();
        if self.k == 0 || self.k > n {
            return Err(Error::InvalidClusterCount {
                requested: self.k as i64,
                n_items: n,
            });
        }

        let rows: Vec<CsVecView<f64>> = data.outer_iterator().collect();
        let row_sq: Vec<f64> = rows
            .iter()
            .map(|r| r.iter().map(|(_, &x)| x * x).sum::<f64>())
            .collect();
        let dim = data.cols();

        let mut master = ChaCha8Rng::seed_from_u64(self.seed);
        let seeds: Vec<u64> = (0..self.n_init).map(|_| master.gen()).collect();

        // At most one batch of runs holds centroids at a time, plus the best so far.
        let batch = rayon::current_num_threads().max(1);
        let mut best: Option<KmeansFit> = None;
        for chunk in seeds.chunks(batch) {
            let runs: Vec<KmeansFit> = chunk
                .par_iter()
                .map(|&seed| self.run(&rows, &row_sq, dim, seed))
                .collect();
            for run in runs {
                // Strict comparison keeps the earliest run on ties.
                best = match best {
                    Some(b) if b.inertia <= run.inertia => Some(b),
                    _ => Some(run),
                };
            }
        }
        let best = best.ok_or_else(|| Error::Other("k-means produced no runs".into()))?;

        debug!(
            k = self.k,
            inertia = best.inertia,
            n_iter = best.n_iter,
            "K-means converged"
        );
        Ok(best)
    }

    fn run(&self, rows: &[CsVecView<f64>], row_sq: &[f64], dim: usize, seed: u64) -> KmeansFit {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut centroids = init_plus_plus(rows, row_sq, dim, self.k, &mut rng);
        let mut labels = vec![usize::MAX; rows.len()];
        let mut n_iter = 0;

        for _ in 0..self.max_iter {
            n_iter += 1;
            if !assign(rows, row_sq, &centroids, &mut labels) {
                break;
            }
            update_centroids(rows, &labels, &mut centroids);
        }
        // Labels must match the final centroids even when the iteration cap was hit.
        assign(rows, row_sq, &centroids, &mut labels);

        let centroid_sq: Vec<f64> = centroids.iter().map(|c| sq_norm(c)).collect();
        let inertia: f64 = rows
            .iter()
            .zip(labels.iter())
            .enumerate()
            .map(|(i, (row, &l))| sq_distance(row, row_sq[i], &centroids[l], centroid_sq[l]))
            .sum();

        KmeansFit {
            labels,
            centroids,
            inertia,
            n_iter,
        }
    }
}

/// k-means++ seeding: each next center is drawn with probability proportional
/// to its squared distance from the nearest center chosen so far.
fn init_plus_plus(
    rows: &[CsVecView<f64>],
    row_sq: &[f64],
    dim: usize,
    k: usize,
    rng: &mut ChaCha8Rng,
) -> Vec<Vec<f64>> {
    let n = rows.len();
    let mut chosen: Vec<usize> = Vec::with_capacity(k);
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    let mut closest = vec![f64::INFINITY; n];

    let mut next = rng.gen_range(0..n);
    loop {
        chosen.push(next);
        let center = densify(&rows[next], dim);
        let center_sq = row_sq[next];
        for (i, row) in rows.iter().enumerate() {
            let d = sq_distance(row, row_sq[i], &center, center_sq);
            if d < closest[i] {
                closest[i] = d;
            }
        }
        centroids.push(center);
        if centroids.len() == k {
            break;
        }

        let total: f64 = closest.iter().sum();
        next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut pick = closest.iter().rposition(|&d| d > 0.0).unwrap_or(0);
            for (i, &d) in closest.iter().enumerate() {
                if target < d {
                    pick = i;
                    break;
                }
                target -= d;
            }
            pick
        } else {
            // Every remaining row coincides with a center; fall back to uniform choice.
            let unused: Vec<usize> = (0..n).filter(|i| !chosen.contains(i)).collect();
            unused[rng.gen_range(0..unused.len())]
        };
    }

    centroids
}

/// Assign every row to its nearest centroid (ties to the lower index).
/// Returns whether any label changed.
fn assign(
    rows: &[CsVecView<f64>],
    row_sq: &[f64],
    centroids: &[Vec<f64>],
    labels: &mut [usize],
) -> bool {
    let centroid_sq: Vec<f64> = centroids.iter().map(|c| sq_norm(c)).collect();
    let mut changed = false;
    for (i, row) in rows.iter().enumerate() {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for (c, centroid) in centroids.iter().enumerate() {
            let d = sq_distance(row, row_sq[i], centroid, centroid_sq[c]);
            if d < best_dist {
                best_dist = d;
                best = c;
            }
        }
        if labels[i] != best {
            labels[i] = best;
            changed = true;
        }
    }
    changed
}

/// Move each centroid to the mean of its members, in place. Empty clusters keep their centroid.
fn update_centroids(rows: &[CsVecView<f64>], labels: &[usize], centroids: &mut [Vec<f64>]) {
    let mut counts = vec![0usize; centroids.len()];
    for &l in labels {
        counts[l] += 1;
    }

    for (centroid, &count) in centroids.iter_mut().zip(counts.iter()) {
        if count > 0 {
            centroid.iter_mut().for_each(|x| *x = 0.0);
        }
    }
    for (row, &l) in rows.iter().zip(labels.iter()) {
        let centroid = &mut centroids[l];
        for (j, &x) in row.iter() {
            centroid[j] += x;
        }
    }
    for (centroid, &count) in centroids.iter_mut().zip(counts.iter()) {
        if count > 1 {
            let inv = 1.0 / count as f64;
            centroid.iter_mut().for_each(|x| *x *= inv);
        }
    }
}

fn densify(row: &CsVecView<f64>, dim: usize) -> Vec<f64> {
    let mut out = vec![0.0; dim];
    for (j, &x) in row.iter() {
        out[j] = x;
    }
    out
}

fn sq_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

/// ||row - centroid||² via ||row||² - 2 row·centroid + ||centroid||².
fn sq_distance(row: &CsVecView<f64>, row_sq: f64, centroid: &[f64], centroid_sq: f64) -> f64 {
    let dot: f64 = row.iter().map(|(j, &x)| x * centroid[j]).sum();
    (row_sq - 2.0 * dot + centroid_sq).max(0.0)
}
