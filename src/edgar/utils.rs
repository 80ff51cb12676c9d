use anyhow::{anyhow, Result};
use std::path::Path;

/// Writes a downloaded JSON document to `filepath`, refusing truncated or
/// invalid payloads and checking the bytes that landed on disk.
pub fn save_verified_json(filepath: &Path, content: &str) -> Result<()> {
    // Verify content is complete JSON
    if !content.trim_end().ends_with('}') {
        return Err(anyhow!("Incomplete JSON response"));
    }
    serde_json::from_str::<serde_json::Value>(content)
        .map_err(|e| anyhow!("Invalid JSON in response: {}", e))?;

    if let Some(parent) = filepath.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    std::fs::write(filepath, content)?;
    log::debug!("Saved content to {:?}", filepath);

    // Verify the saved content
    let saved_content = std::fs::read_to_string(filepath)?;
    log::debug!("Verified saved content length: {}", saved_content.len());

    if saved_content.len() != content.len() {
        return Err(anyhow!(
            "Content length mismatch: received {} bytes but saved {} bytes",
            content.len(),
            saved_content.len()
        ));
    }

    Ok(())
}
