pub mod bitset;
pub mod declaration;
pub mod expr;
pub mod heap;
pub mod name;
pub mod types;
