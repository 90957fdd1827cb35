pub mod roster_pipeline;

pub use roster_pipeline::RosterPipeline;
