//! Interactive prompts using dialoguer

use std::path::Path;

use anyhow::Result;
use dialoguer::Confirm;

/// Prompt user to confirm proceeding with an action
pub fn confirm_step(message: &str) -> Result<bool> {
    let confirmed = Confirm::new()
        .with_prompt(message)
        .default(true)
        .interact()?;
    Ok(confirmed)
}

/// Prompt user to confirm writing the balanced cohort
pub fn confirm_write(record_count: usize, path: &Path) -> Result<bool> {
    let message = if path.exists() {
        format!(
            "Overwrite {} with {} balanced record(s)?",
            path.display(),
            record_count
        )
    } else {
        format!("Write {} balanced record(s) to {}?", record_count, path.display())
    };
    confirm_step(&message)
}

/// Prompt user to confirm starting a download run
pub fn confirm_download(file_count: usize, destination: &Path) -> Result<bool> {
    let message = format!(
        "Download {} file(s) into {}?",
        file_count,
        destination.display()
    );
    confirm_step(&message)
}
