//! Markdown to EPUB conversion through an external converter (pandoc)

use crate::errors::{WorkerError, WorkerResult};
use tokio::process::Command;
use tracing::{debug, info};

/// Runs `{command} manuscript.md -o book.epub` in a scratch directory
#[derive(Debug, Clone)]
pub struct EpubConverter {
    program: String,
    extra_args: Vec<String>,
}

impl EpubConverter {
    /// `command` may carry extra arguments, e.g. `"pandoc --toc"`
    pub fn new(command: &str) -> WorkerResult<Self> {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts
            .next()
            .ok_or_else(|| WorkerError::Converter("no converter command configured".into()))?;

        Ok(Self {
            program,
            extra_args: parts.collect(),
        })
    }

    pub async fn convert(&self, manuscript: &str) -> WorkerResult<Vec<u8>> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("manuscript.md");
        let output = dir.path().join("book.epub");

        tokio::fs::write(&input, manuscript).await?;

        debug!(program = %self.program, dir = %dir.path().display(), "Running converter");
        let result = Command::new(&self.program)
            .args(&self.extra_args)
            .arg(&input)
            .arg("-o")
            .arg(&output)
            .output()
            .await
            .map_err(|e| WorkerError::Converter(format!("could not start {}: {}", self.program, e)))?;

        if !result.status.success() {
            return Err(WorkerError::Converter(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        let bytes = tokio::fs::read(&output).await?;
        info!(bytes = bytes.len(), "E-book converted");
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_rejected() {
        assert!(EpubConverter::new("   ").is_err());
        let converter = EpubConverter::new("pandoc --toc").unwrap();
        assert_eq!(converter.program, "pandoc");
        assert_eq!(converter.extra_args, vec!["--toc"]);
    }

    #[tokio::test]
    async fn test_missing_program() {
        let converter = EpubConverter::new("definitely-not-a-converter-binary").unwrap();
        let err = converter.convert("# Hi").await.unwrap_err();
        assert!(matches!(err, WorkerError::Converter(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_converter_output_is_returned() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fake-pandoc.sh");
        std::fs::write(&script, "cp \"$1\" \"$3\"\n").unwrap();

        let command = format!("sh {}", script.display());
        let converter = EpubConverter::new(&command).unwrap();
        let bytes = converter.convert("# Chapter\n\nText").await.unwrap();
        assert_eq!(bytes, b"# Chapter\n\nText");
    }
}
