pub mod cancel;
pub mod etl;
pub mod extractors;
pub mod headers;
pub mod manager;
pub mod season;
pub mod strategies;
pub mod url_builder;

pub use crate::domain::ports::{Fetcher, Pipeline, Storage};
pub use crate::utils::error::Result;
