pub mod connection;
pub mod properties;

pub use properties::PropertyStore;
