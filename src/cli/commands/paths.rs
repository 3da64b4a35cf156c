use crate::cli::output::*;
use anyhow::Result;
use culicidae_core::Config;

pub fn run(config: Config) -> Result<()> {
    section_header("Culicidae paths");
    println!("{}", culicidae_core::describe_paths());
    tree(&[
        ("Store (configured)", config.store.path().display().to_string()),
        (
            "Images (configured)",
            config.pipeline.image_root().display().to_string(),
        ),
        (
            "Predictor",
            config
                .predictor
                .endpoint
                .clone()
                .unwrap_or_else(|| "not configured".to_string()),
        ),
    ]);
    if config.predictor.endpoint.is_none() {
        warning("Observations will be stored for review without a predicted species");
    }
    Ok(())
}
