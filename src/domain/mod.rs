pub mod address;
pub mod estimate;
pub mod property;
pub mod standardize;
pub mod stats;
