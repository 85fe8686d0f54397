use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct InitReport<'a> {
    home: &'a Path,
}

/// Lay out a home directory and report where it is.
pub fn run(home: &Path, json: bool) -> Result<()> {
    latch_runtime::init_home(home)
        .with_context(|| format!("failed to initialize home {}", home.display()))?;

    if json {
        println!("{}", serde_json::to_string(&InitReport { home })?);
    } else {
        println!("Initialized home at {}", home.display());
    }
    Ok(())
}
