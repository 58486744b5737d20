pub mod traits;

// Invoice source implementations
pub mod dashboard;
