use crate::core::models::sequence::Sequence;
use crate::engine::utils::sampling::{SamplingError, weighted_choice};
use nalgebra::DVector;
use rand::Rng;
use tracing::{debug, trace};

/// One-hot encoding with four features per position in A, C, G, U order.
///
/// The squared Euclidean distance between two encodings is twice their
/// Hamming distance.
pub fn one_hot(sequence: &Sequence) -> DVector<f64> {
    let mut features = DVector::zeros(sequence.len() * 4);
    for (position, base) in sequence.bases().iter().enumerate() {
        features[position * 4 + base.index()] = 1.0;
    }
    features
}

#[derive(Debug, Clone)]
pub struct Clustering {
    pub assignments: Vec<usize>,
    pub centroids: Vec<DVector<f64>>,
    pub iterations: usize,
}

impl Clustering {
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.assignments
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c == cluster)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn distance_to_centroid(&self, points: &[DVector<f64>], point: usize, cluster: usize) -> f64 {
        (&points[point] - &self.centroids[cluster]).norm_squared()
    }
}

fn nearest(point: &DVector<f64>, centroids: &[DVector<f64>]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(c, centroid)| (c, (point - centroid).norm_squared()))
        .fold((0, f64::INFINITY), |best, candidate| {
            if candidate.1 < best.1 { candidate } else { best }
        })
}

fn initial_centroids(
    points: &[DVector<f64>],
    k: usize,
    rng: &mut impl Rng,
) -> Result<Vec<DVector<f64>>, SamplingError> {
    let mut chosen = vec![rng.gen_range(0..points.len())];
    while chosen.len() < k {
        let centroids: Vec<DVector<f64>> = chosen.iter().map(|&i| points[i].clone()).collect();
        let weights: Vec<f64> = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if chosen.contains(&i) {
                    0.0
                } else {
                    nearest(p, &centroids).1
                }
            })
            .collect();
        let next = if weights.iter().any(|&w| w > 0.0) {
            weighted_choice(&weights, rng)?
        } else {
            let remaining: Vec<usize> = (0..points.len()).filter(|i| !chosen.contains(i)).collect();
            remaining[rng.gen_range(0..remaining.len())]
        };
        chosen.push(next);
    }
    Ok(chosen.into_iter().map(|i| points[i].clone()).collect())
}

/// Lloyd's k-means with k-means++ initialisation.
///
/// A cluster that loses all its members is reseeded at the point farthest from
/// its current centroid. `k` must not exceed the number of points.
pub fn kmeans(
    points: &[DVector<f64>],
    k: usize,
    max_iterations: usize,
    rng: &mut impl Rng,
) -> Result<Clustering, SamplingError> {
    if points.is_empty() || k == 0 {
        return Ok(Clustering {
            assignments: vec![0; points.len()],
            centroids: Vec::new(),
            iterations: 0,
        });
    }
    let k = k.min(points.len());
    let dimension = points[0].len();
    let mut centroids = initial_centroids(points, k, rng)?;
    let mut assignments = vec![usize::MAX; points.len()];
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        let mut changed = false;
        for (i, point) in points.iter().enumerate() {
            let (cluster, _) = nearest(point, &centroids);
            if assignments[i] != cluster {
                assignments[i] = cluster;
                changed = true;
            }
        }
        if !changed {
            break;
        }

        let mut sums = vec![DVector::<f64>::zeros(dimension); k];
        let mut counts = vec![0usize; k];
        for (point, &cluster) in points.iter().zip(&assignments) {
            sums[cluster] += point;
            counts[cluster] += 1;
        }
        for cluster in 0..k {
            if counts[cluster] > 0 {
                centroids[cluster] = &sums[cluster] / counts[cluster] as f64;
            } else {
                let farthest = points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| (i, (p - &centroids[cluster]).norm_squared()))
                    .fold((0, f64::NEG_INFINITY), |best, c| if c.1 > best.1 { c } else { best })
                    .0;
                trace!(cluster, farthest, "Reseeding empty cluster.");
                centroids[cluster] = points[farthest].clone();
            }
        }
    }

    debug!(k, iterations, "k-means converged.");
    Ok(Clustering {
        assignments,
        centroids,
        iterations,
    })
}
