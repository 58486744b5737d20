pub mod aggregator;
pub mod coordinator;
pub mod renderer;
