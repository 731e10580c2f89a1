use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StructureError {
    #[error("Structure is empty")]
    Empty,
    #[error("Invalid dot-bracket symbol '{symbol}' at position {position}")]
    InvalidSymbol { symbol: char, position: usize },
    #[error("Unmatched ')' at position {position}")]
    UnmatchedClose { position: usize },
    #[error("Unmatched '(' at position {position}")]
    UnmatchedOpen { position: usize },
    #[error("Structure lengths differ: expected {expected}, found {found}")]
    LengthMismatch { expected: usize, found: usize },
}

/// A validated dot-bracket secondary structure with its pair table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Structure {
    notation: String,
    partners: Vec<Option<usize>>,
}

impl Structure {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.notation
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.partners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }

    pub fn partner(&self, position: usize) -> Option<usize> {
        self.partners.get(position).copied().flatten()
    }

    pub fn is_paired(&self, position: usize) -> bool {
        self.partner(position).is_some()
    }

    /// Base pairs as `(i, j)` with `i < j`, in order of `i`.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.partners
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.filter(|&j| j > i).map(|j| (i, j)))
    }

    pub fn pair_count(&self) -> usize {
        self.pairs().count()
    }

    /// Number of base pairs present in exactly one of the two structures.
    pub fn base_pair_distance(&self, other: &Structure) -> Result<usize, StructureError> {
        if self.len() != other.len() {
            return Err(StructureError::LengthMismatch {
                expected: self.len(),
                found: other.len(),
            });
        }
        let ours: HashSet<(usize, usize)> = self.pairs().collect();
        let theirs: HashSet<(usize, usize)> = other.pairs().collect();
        Ok(ours.symmetric_difference(&theirs).count())
    }
}

impl FromStr for Structure {
    type Err = StructureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let notation = s.trim();
        if notation.is_empty() {
            return Err(StructureError::Empty);
        }

        let mut partners = vec![None; notation.chars().count()];
        let mut open = Vec::new();

        for (position, symbol) in notation.chars().enumerate() {
            match symbol {
                '.' => {}
                '(' => open.push(position),
                ')' => {
                    let opening = open
                        .pop()
                        .ok_or(StructureError::UnmatchedClose { position })?;
                    partners[opening] = Some(position);
                    partners[position] = Some(opening);
                }
                _ => return Err(StructureError::InvalidSymbol { symbol, position }),
            }
        }

        if let Some(&position) = open.last() {
            return Err(StructureError::UnmatchedOpen { position });
        }

        Ok(Self {
            notation: notation.to_string(),
            partners,
        })
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.notation)
    }
}
