//! Result exports written to the run's output directory.

pub mod export;
