use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::config::Settings;
use crate::error::{ParseError, Result};

/// Run the configured converter once over `path` and return the extracted text.
///
/// stdout and stderr are both captured; on failure they travel with the error
/// so the caller can log what the converter complained about.
pub fn extract_text(path: &Path, settings: &Settings) -> Result<String> {
    debug!(converter = %settings.converter, path = %path.display(), "Extracting text");

    let output = Command::new(&settings.converter)
        .args(&settings.converter_args)
        .arg(path)
        .output()
        .map_err(|source| ParseError::Launch {
            program: settings.converter.clone(),
            source,
        })?;

    if !output.status.success() {
        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        captured.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(ParseError::Conversion {
            path: path.to_path_buf(),
            output: captured.trim_end().to_string(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
