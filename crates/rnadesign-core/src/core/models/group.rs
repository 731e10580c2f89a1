use super::ids::VariantId;
use super::pool::CandidatePool;
use super::sequence::Sequence;
use std::collections::HashSet;
use thiserror::Error;

/// A set of pool members. Groups never own variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    index: usize,
    members: Vec<VariantId>,
}

impl Group {
    pub fn new(index: usize, members: Vec<VariantId>) -> Self {
        Self { index, members }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn members(&self) -> &[VariantId] {
        &self.members
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: VariantId) -> bool {
        self.members.contains(&id)
    }

    /// Member sequences resolved against the owning pool. Ids missing from
    /// the pool are skipped.
    pub fn sequences<'p>(&self, pool: &'p CandidatePool) -> Vec<&'p Sequence> {
        self.members
            .iter()
            .filter_map(|&id| pool.get(id).map(|v| &v.sequence))
            .collect()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PartitionError {
    #[error("Group {group} has {found} members, expected {expected}")]
    WrongSize {
        group: usize,
        expected: usize,
        found: usize,
    },
    #[error("Variant {id:?} appears in more than one group")]
    Overlap { id: VariantId },
    #[error("Variant {id:?} in group {group} is not part of the pool")]
    ForeignMember { group: usize, id: VariantId },
}

/// Checks that groups are disjoint, drawn from `pool`, and all of `group_size`.
pub fn validate_partition(
    pool: &CandidatePool,
    groups: &[Group],
    group_size: usize,
) -> Result<(), PartitionError> {
    let mut seen = HashSet::new();
    for group in groups {
        if group.len() != group_size {
            return Err(PartitionError::WrongSize {
                group: group.index(),
                expected: group_size,
                found: group.len(),
            });
        }
        for &id in group.members() {
            if !pool.contains(id) {
                return Err(PartitionError::ForeignMember {
                    group: group.index(),
                    id,
                });
            }
            if !seen.insert(id) {
                return Err(PartitionError::Overlap { id });
            }
        }
    }
    Ok(())
}
