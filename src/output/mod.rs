use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::OutputFormat;
use crate::digest::DigestResult;

/// Render a result in the requested format
pub fn render(result: &DigestResult, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(result.content.clone()),
        OutputFormat::Json => {
            serde_json::to_string_pretty(result).context("Failed to serialize result")
        }
    }
}

/// Save result to file
pub async fn save_to_file(result: &DigestResult, path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(result, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print result to console
pub fn print_to_console(result: &DigestResult, format: &OutputFormat) -> Result<()> {
    let content = render(result, format)?;
    println!("{}", content);
    Ok(())
}
