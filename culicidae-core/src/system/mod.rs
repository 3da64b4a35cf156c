pub mod paths;

// Re-export commonly used functions
pub use paths::{
    culicidae_data_dir, culicidae_home, culicidae_images_dir, culicidae_store_dir,
    describe_paths, is_custom_data_dir,
};
