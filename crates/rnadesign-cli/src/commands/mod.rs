pub mod analyze;
pub mod design;
