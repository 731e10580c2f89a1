//! Helpers shared by the pipeline stages: weighted sampling and the derivation
//! of independent random streams from one master seed.

pub mod sampling;
pub mod seeding;
