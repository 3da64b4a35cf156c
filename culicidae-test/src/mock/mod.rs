//! Mock implementations for testing
//!
//! Scripted predictors for the pipeline seam and a table store that fails on demand.

mod predictor;
mod table_store;

pub use predictor::{FailingPredictor, SlowPredictor, StaticPredictor};
pub use table_store::FailingTableStore;
