// Pure book logic: no I/O in here
pub mod types;      // ladders, levels, fill results
pub mod book;       // venue books + cross-venue aggregation
pub mod simulator;  // walks the aggregated book for a target quantity
