//! Data models for RNA variant design.
//!
//! A [`sequence::Sequence`] is an immutable string over `{A, C, G, U}` and a
//! [`structure::Structure`] is its validated dot-bracket annotation. Candidates
//! become [`variant::Variant`]s once folded and accepted; accepted variants live
//! in a [`pool::CandidatePool`] and are referenced, never copied, by [`group::Group`]s.

pub mod group;
pub mod ids;
pub mod pool;
pub mod sequence;
pub mod structure;
pub mod variant;
