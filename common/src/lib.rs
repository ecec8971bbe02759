pub mod bundle;
pub mod error;
pub mod metrics;
pub mod utils;
