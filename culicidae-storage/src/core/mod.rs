pub mod traits;

pub use traits::{Record, TableStore};
