use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Base {
    A,
    C,
    G,
    U,
}

impl Base {
    pub const ALL: [Base; 4] = [Base::A, Base::C, Base::G, Base::U];

    /// Parses a single nucleotide symbol. Lowercase is accepted and `T` is read as `U`.
    pub fn from_char(symbol: char) -> Option<Self> {
        match symbol.to_ascii_uppercase() {
            'A' => Some(Base::A),
            'C' => Some(Base::C),
            'G' => Some(Base::G),
            'U' | 'T' => Some(Base::U),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Base::A => 'A',
            Base::C => 'C',
            Base::G => 'G',
            Base::U => 'U',
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline]
    pub fn is_strong(self) -> bool {
        matches!(self, Base::C | Base::G)
    }

    pub fn alternatives(self) -> impl Iterator<Item = Base> {
        Base::ALL.into_iter().filter(move |&b| b != self)
    }
}

impl fmt::Display for Base {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Sequence is empty")]
    Empty,
    #[error("Invalid nucleotide '{symbol}' at position {position}")]
    InvalidBase { symbol: char, position: usize },
    #[error("Position {position} is out of bounds for a sequence of length {length}")]
    OutOfBounds { position: usize, length: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sequence {
    bases: Vec<Base>,
}

impl Sequence {
    pub fn from_bases(bases: Vec<Base>) -> Result<Self, SequenceError> {
        if bases.is_empty() {
            return Err(SequenceError::Empty);
        }
        Ok(Self { bases })
    }

    #[inline]
    pub fn bases(&self) -> &[Base] {
        &self.bases
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }

    pub fn base(&self, position: usize) -> Option<Base> {
        self.bases.get(position).copied()
    }

    pub fn with_substitution(&self, position: usize, base: Base) -> Result<Self, SequenceError> {
        if position >= self.len() {
            return Err(SequenceError::OutOfBounds {
                position,
                length: self.len(),
            });
        }
        let mut bases = self.bases.clone();
        bases[position] = base;
        Ok(Self { bases })
    }

    /// Fraction of G and C bases, in `[0, 1]`.
    pub fn gc_content(&self) -> f64 {
        let strong = self.bases.iter().filter(|b| b.is_strong()).count();
        strong as f64 / self.len() as f64
    }

    /// Length of the longest stretch of one repeated base.
    pub fn max_homopolymer_run(&self) -> usize {
        self.bases
            .chunk_by(|a, b| a == b)
            .map(<[Base]>::len)
            .max()
            .unwrap_or(0)
    }

    pub fn base_counts(&self) -> [usize; 4] {
        let mut counts = [0; 4];
        for base in &self.bases {
            counts[base.index()] += 1;
        }
        counts
    }
}

impl FromStr for Sequence {
    type Err = SequenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bases = trimmed
            .chars()
            .enumerate()
            .map(|(position, symbol)| {
                Base::from_char(symbol).ok_or(SequenceError::InvalidBase { symbol, position })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_bases(bases)
    }
}

impl TryFrom<String> for Sequence {
    type Error = SequenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Sequence> for String {
    fn from(sequence: Sequence) -> Self {
        sequence.to_string()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text: String = self.bases.iter().map(|b| b.to_char()).collect();
        f.write_str(&text)
    }
}
