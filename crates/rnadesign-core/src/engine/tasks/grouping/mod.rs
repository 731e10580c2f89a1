//! Partitioning the accepted pool into equally sized, diverse groups.
//!
//! The pool is clustered with seeded k-means over one-hot encodings, the
//! clusters are balanced to exactly `group_size` members, and a bounded local
//! search then trades members to raise within-group diversity while keeping
//! groups well separated. The result is a local optimum.

pub mod kmeans;
pub mod refine;

use crate::core::metrics::{DistanceMatrix, hamming_matrix};
use crate::core::models::group::{Group, validate_partition};
use crate::core::models::pool::CandidatePool;
use crate::engine::config::GroupingConfig;
use crate::engine::error::EngineError;
use kmeans::{Clustering, kmeans, one_hot};
use nalgebra::DVector;
use rand::Rng;
use refine::{Partition, refine};
use std::collections::HashSet;
use tracing::{info, instrument};

#[instrument(skip_all, name = "grouping", fields(group_size = config.group_size, n_groups = config.n_groups))]
pub fn group(
    pool: &CandidatePool,
    config: &GroupingConfig,
    rng: &mut impl Rng,
) -> Result<Vec<Group>, EngineError> {
    let required = config.required_variants();
    if pool.len() < required {
        return Err(EngineError::InsufficientVariants {
            required,
            group_size: config.group_size,
            n_groups: config.n_groups,
            available: pool.len(),
        });
    }

    let sequences = pool.sequences();
    let distances = hamming_matrix(&sequences);
    let points: Vec<DVector<f64>> = sequences.iter().map(|s| one_hot(s)).collect();

    let clustering = kmeans(&points, config.n_groups, config.kmeans_max_iterations, rng)?;
    let mut partition = balance(&clustering, &points, config.n_groups, config.group_size);
    let outcome = refine(
        &distances,
        &mut partition,
        config.inter_weight,
        config.improvement_tolerance,
        config.max_iterations,
    );

    let groups: Vec<Group> = partition
        .groups
        .iter()
        .enumerate()
        .map(|(index, members)| {
            let ids = members.iter().filter_map(|&p| pool.id_at(p)).collect();
            Group::new(index, ids)
        })
        .collect();
    validate_partition(pool, &groups, config.group_size)?;

    info!(
        kmeans_iterations = clustering.iterations,
        refinement_iterations = outcome.iterations,
        objective = outcome.objective,
        "Grouping finished."
    );
    Ok(groups)
}

/// Trims oversized clusters to their members closest to the centroid, then
/// fills undersized clusters, in cluster order, with the nearest leftovers.
fn balance(
    clustering: &Clustering,
    points: &[DVector<f64>],
    n_groups: usize,
    group_size: usize,
) -> Partition {
    let mut groups: Vec<Vec<usize>> = Vec::with_capacity(n_groups);
    let mut leftover: Vec<usize> = Vec::new();

    for cluster in 0..n_groups {
        let mut members = if cluster < clustering.centroids.len() {
            clustering.members(cluster)
        } else {
            Vec::new()
        };
        members.sort_by(|&a, &b| {
            clustering
                .distance_to_centroid(points, a, cluster)
                .total_cmp(&clustering.distance_to_centroid(points, b, cluster))
                .then(a.cmp(&b))
        });
        if members.len() > group_size {
            leftover.extend(members.drain(group_size..));
        }
        groups.push(members);
    }
    leftover.sort_unstable();

    for (cluster, members) in groups.iter_mut().enumerate() {
        while members.len() < group_size && !leftover.is_empty() {
            let nearest = (0..leftover.len())
                .min_by(|&a, &b| {
                    let da = cluster_distance(clustering, points, leftover[a], cluster, members.as_slice());
                    let db = cluster_distance(clustering, points, leftover[b], cluster, members.as_slice());
                    da.total_cmp(&db).then(a.cmp(&b))
                })
                .unwrap_or(0);
            members.push(leftover.remove(nearest));
        }
    }

    Partition {
        groups,
        unselected: leftover,
    }
}

fn cluster_distance(
    clustering: &Clustering,
    points: &[DVector<f64>],
    point: usize,
    cluster: usize,
    members: &[usize],
) -> f64 {
    if cluster < clustering.centroids.len() {
        clustering.distance_to_centroid(points, point, cluster)
    } else {
        members
            .iter()
            .map(|&m| (&points[point] - &points[m]).norm_squared())
            .sum()
    }
}

/// Caps the pool at `target` members by farthest-point selection on Hamming
/// distance, starting from the member with the largest total distance.
/// Survivors keep their acceptance order.
#[instrument(skip_all, name = "diverse_subset", fields(target = target))]
pub fn select_diverse_subset(pool: CandidatePool, target: usize) -> CandidatePool {
    if pool.len() <= target {
        return pool;
    }
    let distances = hamming_matrix(&pool.sequences());
    let chosen = farthest_point_selection(&distances, target);
    let dropped = pool.len() - chosen.len();

    let subset: CandidatePool = pool
        .into_variants()
        .into_iter()
        .enumerate()
        .filter(|(position, _)| chosen.contains(position))
        .map(|(_, variant)| variant)
        .collect();
    info!(kept = subset.len(), dropped, "Selected diverse subset.");
    subset
}

fn farthest_point_selection(distances: &DistanceMatrix, target: usize) -> HashSet<usize> {
    let n = distances.size();
    let mut chosen = HashSet::with_capacity(target);
    if target == 0 || n == 0 {
        return chosen;
    }

    let first = (0..n)
        .max_by_key(|&i| (distances.row(i).iter().sum::<usize>(), std::cmp::Reverse(i)))
        .unwrap_or(0);
    chosen.insert(first);
    let mut min_distance: Vec<usize> = distances.row(first).to_vec();

    while chosen.len() < target.min(n) {
        let next = (0..n)
            .filter(|i| !chosen.contains(i))
            .max_by_key(|&i| (min_distance[i], std::cmp::Reverse(i)));
        let Some(next) = next else { break };
        chosen.insert(next);
        for (i, distance) in min_distance.iter_mut().enumerate() {
            *distance = (*distance).min(distances.get(next, i));
        }
    }
    chosen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::variant_from;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn random_pool(n: usize, length: usize, seed: u64) -> CandidatePool {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut seen = HashSet::new();
        let mut pool = CandidatePool::new();
        while pool.len() < n {
            let s: String = (0..length)
                .map(|_| ['A', 'C', 'G', 'U'][rng.gen_range(0..4)])
                .collect();
            if seen.insert(s.clone()) {
                pool.push(variant_from(&s));
            }
        }
        pool
    }

    fn config(group_size: usize, n_groups: usize) -> GroupingConfig {
        GroupingConfig {
            group_size,
            n_groups,
            max_iterations: 1000,
            improvement_tolerance: 1e-9,
            inter_weight: 1.0,
            kmeans_max_iterations: 100,
        }
    }

    #[test]
    fn pool_smaller_than_required_is_insufficient_variants() {
        let pool = random_pool(15, 12, 1);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let result = group(&pool, &config(10, 2), &mut rng);
        assert!(matches!(
            result,
            Err(EngineError::InsufficientVariants {
                required: 20,
                available: 15,
                ..
            })
        ));
    }

    #[test]
    fn pool_of_exact_size_is_fully_partitioned() {
        let pool = random_pool(20, 12, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let groups = group(&pool, &config(10, 2), &mut rng).unwrap();
        assert_eq!(groups.len(), 2);
        assert!(validate_partition(&pool, &groups, 10).is_ok());
        let used: HashSet<_> = groups.iter().flat_map(|g| g.members().to_vec()).collect();
        assert_eq!(used.len(), 20);
    }

    #[test]
    fn groups_are_disjoint_and_sized_when_pool_is_larger() {
        let pool = random_pool(25, 16, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let groups = group(&pool, &config(4, 3), &mut rng).unwrap();
        assert_eq!(groups.len(), 3);
        assert!(validate_partition(&pool, &groups, 4).is_ok());
        assert_eq!(
            groups.iter().map(Group::index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn grouping_is_reproducible_for_a_seed() {
        let pool = random_pool(18, 14, 4);
        let first = group(&pool, &config(3, 3), &mut ChaCha8Rng::seed_from_u64(5)).unwrap();
        let second = group(&pool, &config(3, 3), &mut ChaCha8Rng::seed_from_u64(5)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn balance_produces_exact_group_sizes() {
        let pool = random_pool(11, 10, 6);
        let points: Vec<DVector<f64>> = pool.sequences().iter().map(|s| one_hot(s)).collect();
        let clustering = kmeans(&points, 3, 50, &mut ChaCha8Rng::seed_from_u64(1)).unwrap();
        let partition = balance(&clustering, &points, 3, 3);
        assert!(partition.groups.iter().all(|g| g.len() == 3));
        assert_eq!(partition.unselected.len(), 2);
    }

    #[test]
    fn diverse_subset_keeps_far_apart_members_in_order() {
        let pool: CandidatePool = ["AAAAAAAA", "AAAAAAAC", "UUUUUUUU", "GGGGGGGG", "AAAAAACC"]
            .into_iter()
            .map(variant_from)
            .collect();
        let subset = select_diverse_subset(pool, 3);
        let seqs: Vec<String> = subset.variants().map(|v| v.sequence.to_string()).collect();
        assert_eq!(seqs, vec!["AAAAAAAA", "UUUUUUUU", "GGGGGGGG"]);
    }

    #[test]
    fn diverse_subset_is_identity_below_target() {
        let pool: CandidatePool = ["ACGU", "UGCA"].into_iter().map(variant_from).collect();
        let subset = select_diverse_subset(pool, 5);
        assert_eq!(subset.len(), 2);
    }
}
