pub mod config;
pub mod driver;
pub mod error;
pub mod formula;
pub mod kernel;
pub mod polynomial;
pub mod proof;
pub mod prover;
pub mod rules;
pub mod simplification;
pub mod subtyping;
pub mod type_system;

#[cfg(test)]
mod tests;
