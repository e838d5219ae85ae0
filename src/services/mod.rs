pub mod compare;

pub use compare::{CompareRequest, Comparator};
