pub mod explain;
pub mod rules;
