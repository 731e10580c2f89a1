//! Local-search refinement of a balanced group assignment.
//!
//! The objective is `mean_intra + inter_weight * mean_inter`, where
//! `mean_intra` is the mean pairwise Hamming distance inside groups (every
//! group has the same size, so the per-group means average to the pooled
//! mean) and `mean_inter` is the mean distance between members of different
//! groups. Each iteration applies the single best move: either swapping two
//! members of different groups or replacing a member with an unselected pool
//! entry. Gains are evaluated incrementally from per-group distance sums.

use crate::core::metrics::DistanceMatrix;
use tracing::{debug, instrument};

/// Group membership as pool positions, plus the positions left out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub groups: Vec<Vec<usize>>,
    pub unselected: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinementOutcome {
    pub iterations: usize,
    pub swaps: usize,
    pub replacements: usize,
    pub initial_objective: f64,
    pub objective: f64,
}

#[derive(Debug, Clone, Copy)]
enum Move {
    Swap {
        first_group: usize,
        first: usize,
        second_group: usize,
        second: usize,
    },
    Replace {
        group: usize,
        member: usize,
        outsider: usize,
    },
}

/// Objective value of `groups`, computed from scratch.
pub fn objective(distances: &DistanceMatrix, groups: &[Vec<usize>], inter_weight: f64) -> f64 {
    let mut intra = 0i64;
    let mut total = 0i64;
    let selected: Vec<usize> = groups.iter().flatten().copied().collect();
    for group in groups {
        for (a, &i) in group.iter().enumerate() {
            for &j in &group[a + 1..] {
                intra += distances.get(i, j) as i64;
            }
        }
    }
    for (a, &i) in selected.iter().enumerate() {
        for &j in &selected[a + 1..] {
            total += distances.get(i, j) as i64;
        }
    }
    let group_size = groups.first().map_or(0, Vec::len);
    let pairs = PairCounts::new(groups.len(), group_size);
    pairs.value(intra, total, inter_weight)
}

#[derive(Debug, Clone, Copy)]
struct PairCounts {
    intra: i64,
    inter: i64,
}

impl PairCounts {
    fn new(n_groups: usize, group_size: usize) -> Self {
        let per_group = (group_size * group_size.saturating_sub(1) / 2) as i64;
        let intra = per_group * n_groups as i64;
        let selected = n_groups * group_size;
        let all = (selected * selected.saturating_sub(1) / 2) as i64;
        Self {
            intra,
            inter: all - intra,
        }
    }

    fn value(&self, intra_sum: i64, total_sum: i64, inter_weight: f64) -> f64 {
        let mean_intra = if self.intra > 0 {
            intra_sum as f64 / self.intra as f64
        } else {
            0.0
        };
        let mean_inter = if self.inter > 0 {
            (total_sum - intra_sum) as f64 / self.inter as f64
        } else {
            0.0
        };
        mean_intra + inter_weight * mean_inter
    }
}

struct Refiner<'a> {
    distances: &'a DistanceMatrix,
    inter_weight: f64,
    pairs: PairCounts,
    /// `group_sums[v][g]`: summed distance from pool entry `v` to members of group `g`.
    group_sums: Vec<Vec<i64>>,
    /// Summed distance from pool entry `v` to every selected member.
    selected_sums: Vec<i64>,
    intra: i64,
    total: i64,
}

impl<'a> Refiner<'a> {
    fn new(distances: &'a DistanceMatrix, partition: &Partition, inter_weight: f64) -> Self {
        let n = distances.size();
        let n_groups = partition.groups.len();
        let mut group_sums = vec![vec![0i64; n_groups]; n];
        for (v, sums) in group_sums.iter_mut().enumerate() {
            for (g, group) in partition.groups.iter().enumerate() {
                sums[g] = group.iter().map(|&m| distances.get(v, m) as i64).sum();
            }
        }
        let selected_sums: Vec<i64> = group_sums.iter().map(|s| s.iter().sum()).collect();

        let intra = partition
            .groups
            .iter()
            .enumerate()
            .map(|(g, group)| group.iter().map(|&m| group_sums[m][g]).sum::<i64>())
            .sum::<i64>()
            / 2;
        let total = partition
            .groups
            .iter()
            .flatten()
            .map(|&m| selected_sums[m])
            .sum::<i64>()
            / 2;

        let group_size = partition.groups.first().map_or(0, Vec::len);
        Self {
            distances,
            inter_weight,
            pairs: PairCounts::new(n_groups, group_size),
            group_sums,
            selected_sums,
            intra,
            total,
        }
    }

    fn current(&self) -> f64 {
        self.pairs.value(self.intra, self.total, self.inter_weight)
    }

    fn d(&self, a: usize, b: usize) -> i64 {
        self.distances.get(a, b) as i64
    }

    fn gain(&self, intra_delta: i64, total_delta: i64) -> f64 {
        self.pairs
            .value(self.intra + intra_delta, self.total + total_delta, self.inter_weight)
            - self.current()
    }

    fn best_move(&self, partition: &Partition) -> Option<(Move, f64)> {
        let mut best: Option<(Move, f64)> = None;
        let mut consider = |candidate: Move, gain: f64| {
            if best.is_none_or(|(_, g)| gain > g) {
                best = Some((candidate, gain));
            }
        };

        let groups = &partition.groups;
        for first_group in 0..groups.len() {
            for second_group in first_group + 1..groups.len() {
                for (first, &x) in groups[first_group].iter().enumerate() {
                    for (second, &y) in groups[second_group].iter().enumerate() {
                        let dxy = self.d(x, y);
                        let intra_delta = (self.group_sums[y][first_group] - dxy
                            - self.group_sums[x][first_group])
                            + (self.group_sums[x][second_group]
                                - dxy
                                - self.group_sums[y][second_group]);
                        consider(
                            Move::Swap {
                                first_group,
                                first,
                                second_group,
                                second,
                            },
                            self.gain(intra_delta, 0),
                        );
                    }
                }
            }
        }

        for (group, members) in groups.iter().enumerate() {
            for (member, &x) in members.iter().enumerate() {
                for (outsider, &u) in partition.unselected.iter().enumerate() {
                    let dux = self.d(u, x);
                    let intra_delta = self.group_sums[u][group] - dux - self.group_sums[x][group];
                    let total_delta = self.selected_sums[u] - dux - self.selected_sums[x];
                    consider(
                        Move::Replace {
                            group,
                            member,
                            outsider,
                        },
                        self.gain(intra_delta, total_delta),
                    );
                }
            }
        }
        best
    }

    fn apply(&mut self, partition: &mut Partition, chosen: Move) {
        let n = self.distances.size();
        match chosen {
            Move::Swap {
                first_group,
                first,
                second_group,
                second,
            } => {
                let x = partition.groups[first_group][first];
                let y = partition.groups[second_group][second];
                let dxy = self.d(x, y);
                self.intra += (self.group_sums[y][first_group] - dxy - self.group_sums[x][first_group])
                    + (self.group_sums[x][second_group] - dxy - self.group_sums[y][second_group]);
                for v in 0..n {
                    let delta = self.d(v, y) - self.d(v, x);
                    self.group_sums[v][first_group] += delta;
                    self.group_sums[v][second_group] -= delta;
                }
                partition.groups[first_group][first] = y;
                partition.groups[second_group][second] = x;
            }
            Move::Replace {
                group,
                member,
                outsider,
            } => {
                let x = partition.groups[group][member];
                let u = partition.unselected[outsider];
                let dux = self.d(u, x);
                self.intra += self.group_sums[u][group] - dux - self.group_sums[x][group];
                self.total += self.selected_sums[u] - dux - self.selected_sums[x];
                for v in 0..n {
                    let delta = self.d(v, u) - self.d(v, x);
                    self.group_sums[v][group] += delta;
                    self.selected_sums[v] += delta;
                }
                partition.groups[group][member] = u;
                partition.unselected[outsider] = x;
            }
        }
    }
}

/// Improves `partition` in place until no move gains more than
/// `improvement_tolerance` or `max_iterations` moves were applied.
/// Group sizes never change.
#[instrument(skip_all, name = "group_refinement")]
pub fn refine(
    distances: &DistanceMatrix,
    partition: &mut Partition,
    inter_weight: f64,
    improvement_tolerance: f64,
    max_iterations: usize,
) -> RefinementOutcome {
    let mut refiner = Refiner::new(distances, partition, inter_weight);
    let initial_objective = refiner.current();
    let mut outcome = RefinementOutcome {
        iterations: 0,
        swaps: 0,
        replacements: 0,
        initial_objective,
        objective: initial_objective,
    };

    while outcome.iterations < max_iterations {
        let Some((chosen, gain)) = refiner.best_move(partition) else {
            break;
        };
        if gain <= improvement_tolerance {
            break;
        }
        match chosen {
            Move::Swap { .. } => outcome.swaps += 1,
            Move::Replace { .. } => outcome.replacements += 1,
        }
        refiner.apply(partition, chosen);
        outcome.iterations += 1;
    }

    for group in &mut partition.groups {
        group.sort_unstable();
    }
    partition.unselected.sort_unstable();
    outcome.objective = refiner.current();

    debug!(
        iterations = outcome.iterations,
        swaps = outcome.swaps,
        replacements = outcome.replacements,
        initial = outcome.initial_objective,
        objective = outcome.objective,
        "Group refinement finished."
    );
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metrics::hamming_matrix;
    use crate::core::models::sequence::Sequence;

    fn matrix(seqs: &[&str]) -> DistanceMatrix {
        let parsed: Vec<Sequence> = seqs.iter().map(|s| s.parse().unwrap()).collect();
        let refs: Vec<&Sequence> = parsed.iter().collect();
        hamming_matrix(&refs)
    }

    const SEQS: [&str; 8] = [
        "AAAAAAAA", "AAAAAAAC", "AAAAAACC", "CCCCAAAA", "GGGGGGGG", "GGGGUUUU", "UUUUUUUU",
        "ACGUACGU",
    ];

    #[test]
    fn refinement_never_decreases_the_objective() {
        let distances = matrix(&SEQS);
        let mut partition = Partition {
            groups: vec![vec![0, 1], vec![2, 3]],
            unselected: vec![4, 5, 6, 7],
        };
        let outcome = refine(&distances, &mut partition, 1.0, 1e-9, 100);
        assert!(outcome.objective >= outcome.initial_objective);
        assert!(outcome.replacements > 0);
    }

    #[test]
    fn incremental_objective_matches_full_recomputation() {
        let distances = matrix(&SEQS);
        let mut partition = Partition {
            groups: vec![vec![0, 1, 2], vec![3, 4, 5]],
            unselected: vec![6, 7],
        };
        let outcome = refine(&distances, &mut partition, 0.5, 1e-9, 100);
        let recomputed = objective(&distances, &partition.groups, 0.5);
        assert!((outcome.objective - recomputed).abs() < 1e-9);
    }

    #[test]
    fn refinement_preserves_sizes_and_disjointness() {
        let distances = matrix(&SEQS);
        let mut partition = Partition {
            groups: vec![vec![0, 1], vec![2, 3], vec![4, 5]],
            unselected: vec![6, 7],
        };
        refine(&distances, &mut partition, 1.0, 1e-9, 100);
        assert!(partition.groups.iter().all(|g| g.len() == 2));
        let mut all: Vec<usize> = partition.groups.iter().flatten().copied().collect();
        all.extend(&partition.unselected);
        all.sort();
        assert_eq!(all, (0..8).collect::<Vec<_>>());
    }

    #[test]
    fn zero_iterations_leaves_assignment_unchanged() {
        let distances = matrix(&SEQS);
        let mut partition = Partition {
            groups: vec![vec![0, 1], vec![2, 3]],
            unselected: vec![4, 5, 6, 7],
        };
        let before = partition.clone();
        let outcome = refine(&distances, &mut partition, 1.0, 1e-9, 0);
        assert_eq!(partition, before);
        assert_eq!(outcome.iterations, 0);
    }

    #[test]
    fn single_member_groups_maximise_inter_distance() {
        let distances = matrix(&["AAAA", "AAAC", "UUUU"]);
        let mut partition = Partition {
            groups: vec![vec![0], vec![1]],
            unselected: vec![2],
        };
        refine(&distances, &mut partition, 1.0, 1e-9, 10);
        let chosen: Vec<usize> = partition.groups.iter().flatten().copied().collect();
        assert!(chosen.contains(&2));
    }
}
