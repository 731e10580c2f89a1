//! Pairwise sequence metrics and the distance matrices built from them.
//!
//! Two distances are used throughout the pipeline: the Hamming distance between
//! equal-length sequences, and Lmax, the length of the longest contiguous
//! substring two sequences share. Matrices over a list of sequences feed the
//! grouping stage and downstream analysis.

use crate::core::models::sequence::{Base, Sequence};
use itertools::Itertools;
use std::io::Write;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Number of differing positions. Any length difference counts as differing positions.
pub fn hamming_distance(a: &[Base], b: &[Base]) -> usize {
    let mismatches = a.iter().zip(b).filter(|(x, y)| x != y).count();
    mismatches + a.len().abs_diff(b.len())
}

/// Length of the longest contiguous substring shared by `a` and `b`.
pub fn longest_common_substring(a: &[Base], b: &[Base]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];
    let mut best = 0;

    for &x in a {
        for (j, &y) in b.iter().enumerate() {
            current[j + 1] = if x == y { previous[j] + 1 } else { 0 };
            best = best.max(current[j + 1]);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    best
}

/// Whether `a` and `b` share a contiguous substring longer than `threshold`.
/// Stops at the first such substring.
pub fn shares_substring_longer_than(a: &[Base], b: &[Base], threshold: usize) -> bool {
    let mut previous = vec![0usize; b.len() + 1];
    let mut current = vec![0usize; b.len() + 1];

    for &x in a {
        for (j, &y) in b.iter().enumerate() {
            current[j + 1] = if x == y { previous[j] + 1 } else { 0 };
            if current[j + 1] > threshold {
                return true;
            }
        }
        std::mem::swap(&mut previous, &mut current);
    }
    false
}

/// A dense symmetric matrix of integer distances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceMatrix {
    size: usize,
    values: Vec<usize>,
}

impl DistanceMatrix {
    fn from_rows(rows: Vec<Vec<usize>>) -> Self {
        let size = rows.len();
        Self {
            size,
            values: rows.into_iter().flatten().collect(),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> usize {
        self.values[i * self.size + j]
    }

    pub fn row(&self, i: usize) -> &[usize] {
        &self.values[i * self.size..(i + 1) * self.size]
    }

    /// Mean over all unordered pairs `i < j`; zero when fewer than two entries exist.
    pub fn mean_off_diagonal(&self) -> f64 {
        mean((0..self.size).tuple_combinations().map(|(i, j)| self.get(i, j)))
    }

    pub fn write_csv<W: Write>(&self, labels: &[String], writer: W) -> Result<(), csv::Error> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        let mut header = vec![String::new()];
        header.extend(labels.iter().cloned());
        csv_writer.write_record(&header)?;
        for i in 0..self.size {
            let mut record = vec![labels.get(i).cloned().unwrap_or_else(|| i.to_string())];
            record.extend(self.row(i).iter().map(|v| v.to_string()));
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

fn build_matrix<F>(sequences: &[&Sequence], metric: F) -> DistanceMatrix
where
    F: Fn(&[Base], &[Base]) -> usize + Sync,
{
    let n = sequences.len();

    #[cfg(not(feature = "parallel"))]
    let iterator = 0..n;

    #[cfg(feature = "parallel")]
    let iterator = (0..n).into_par_iter();

    let rows: Vec<Vec<usize>> = iterator
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        0
                    } else {
                        metric(sequences[i].bases(), sequences[j].bases())
                    }
                })
                .collect()
        })
        .collect();

    DistanceMatrix::from_rows(rows)
}

pub fn hamming_matrix(sequences: &[&Sequence]) -> DistanceMatrix {
    build_matrix(sequences, hamming_distance)
}

/// Pairwise Lmax. The diagonal is zero rather than the sequence length.
pub fn lmax_matrix(sequences: &[&Sequence]) -> DistanceMatrix {
    build_matrix(sequences, longest_common_substring)
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupDiversity {
    pub mean_intra_hamming: f64,
    pub mean_inter_hamming: f64,
    pub mean_intra_lmax: f64,
    pub mean_inter_lmax: f64,
    /// For each variant (groups concatenated in order), its largest Lmax to any other variant.
    pub per_variant_max_lmax: Vec<usize>,
}

pub fn group_diversity(groups: &[Vec<&Sequence>]) -> GroupDiversity {
    let all: Vec<&Sequence> = groups.iter().flatten().copied().collect();
    let hamming = hamming_matrix(&all);
    let lmax = lmax_matrix(&all);

    let mut offsets = Vec::with_capacity(groups.len());
    let mut start = 0;
    for group in groups {
        offsets.push(start..start + group.len());
        start += group.len();
    }

    let intra_pairs: Vec<(usize, usize)> = offsets
        .iter()
        .flat_map(|range| range.clone().tuple_combinations())
        .collect();
    let inter_pairs: Vec<(usize, usize)> = offsets
        .iter()
        .tuple_combinations()
        .flat_map(|(a, b)| a.clone().cartesian_product(b.clone()))
        .collect();

    GroupDiversity {
        mean_intra_hamming: mean(intra_pairs.iter().map(|&(i, j)| hamming.get(i, j))),
        mean_inter_hamming: mean(inter_pairs.iter().map(|&(i, j)| hamming.get(i, j))),
        mean_intra_lmax: mean(intra_pairs.iter().map(|&(i, j)| lmax.get(i, j))),
        mean_inter_lmax: mean(inter_pairs.iter().map(|&(i, j)| lmax.get(i, j))),
        per_variant_max_lmax: (0..all.len())
            .map(|i| lmax.row(i).iter().copied().max().unwrap_or(0))
            .collect(),
    }
}

fn mean(values: impl Iterator<Item = usize>) -> f64 {
    let (sum, count) = values.fold((0usize, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}
