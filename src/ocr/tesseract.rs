use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Local OCR engine: one `tesseract stdin stdout` process per frame.
pub struct TesseractEngine {
    binary: String,
}

impl TesseractEngine {
    pub fn new(binary: String) -> Self {
        Self { binary }
    }

    /// Check that the configured binary runs at all.
    #[allow(dead_code)]
    pub async fn available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|status| status.success())
            .unwrap_or(false)
    }

    pub async fn recognize(&self, png_bytes: &[u8], lang: &str) -> Result<String> {
        let mut process = Command::new(&self.binary)
            .arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(lang)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.binary))?;

        {
            let mut stdin = process
                .stdin
                .take()
                .context("tesseract stdin not captured")?;
            stdin
                .write_all(png_bytes)
                .await
                .context("failed to write frame to tesseract")?;
        }

        let output = process
            .wait_with_output()
            .await
            .context("failed to wait for tesseract")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("tesseract exited with {}: {}", output.status, stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
