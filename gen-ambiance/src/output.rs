//! Writing finished artifacts to disk

use anyhow::{Context, Result};
use gateway_client::{Artifact, OutputFormat};
use std::path::{Path, PathBuf};

use crate::download::{download_file, format_bytes};

/// Where an artifact ended up
#[derive(Debug, PartialEq)]
pub enum Delivery {
    Saved { path: PathBuf, bytes: u64 },
    Link(String),
}

impl std::fmt::Display for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Saved { path, bytes } => {
                write!(f, "Saved {} ({})", path.display(), format_bytes(*bytes))
            }
            Self::Link(url) => write!(f, "Audio available at {}", url),
        }
    }
}

/// File extension for an inline artifact, preferring its declared content type
pub fn extension_for(content_type: Option<&str>, format: OutputFormat) -> &'static str {
    let declared = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase());
    match declared.as_deref() {
        Some("audio/wav" | "audio/x-wav" | "audio/wave") => "wav",
        Some("audio/mpeg" | "audio/mp3") => "mp3",
        _ => format.as_str(),
    }
}

/// Content type sent with an uploaded file, from its extension
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "ogg" => Some("audio/ogg"),
        "flac" => Some("audio/flac"),
        _ => None,
    }
}

/// Store an artifact.
///
/// Inline audio is always written, to `output` or `<stem>.<ext>` in the
/// current directory. URL artifacts are downloaded only when `output` is set.
pub async fn deliver(
    artifact: &Artifact,
    output: Option<&Path>,
    stem: &str,
    format: OutputFormat,
) -> Result<Delivery> {
    match artifact {
        Artifact::Inline {
            bytes,
            content_type,
        } => {
            let path = output.map(Path::to_path_buf).unwrap_or_else(|| {
                PathBuf::from(format!(
                    "{}.{}",
                    stem,
                    extension_for(content_type.as_deref(), format)
                ))
            });
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, bytes)
                .context(format!("Failed to write {}", path.display()))?;
            Ok(Delivery::Saved {
                path,
                bytes: bytes.len() as u64,
            })
        }
        Artifact::Url(url) => match output {
            Some(path) => {
                let description = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(stem)
                    .to_string();
                let bytes = download_file(url, path, &description).await?;
                Ok(Delivery::Saved {
                    path: path.to_path_buf(),
                    bytes,
                })
            }
            None => Ok(Delivery::Link(url.clone())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for(Some("audio/wav"), OutputFormat::Mp3), "wav");
        assert_eq!(extension_for(Some("Audio/MPEG; charset=binary"), OutputFormat::Wav), "mp3");
        assert_eq!(extension_for(Some("application/octet-stream"), OutputFormat::Wav), "wav");
        assert_eq!(extension_for(None, OutputFormat::Mp3), "mp3");
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for(Path::new("rain.WAV")), Some("audio/wav"));
        assert_eq!(content_type_for(Path::new("loop.mp3")), Some("audio/mpeg"));
        assert_eq!(content_type_for(Path::new("notes.txt")), None);
        assert_eq!(content_type_for(Path::new("noext")), None);
    }

    #[tokio::test]
    async fn test_inline_written_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/cafe.mp3");
        let artifact = Artifact::Inline {
            bytes: b"foo".to_vec(),
            content_type: Some("audio/mpeg".to_string()),
        };

        let delivery = deliver(&artifact, Some(&path), "cafe-jazz", OutputFormat::Mp3)
            .await
            .unwrap();
        assert_eq!(
            delivery,
            Delivery::Saved {
                path: path.clone(),
                bytes: 3
            }
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"foo");
    }

    #[tokio::test]
    async fn test_url_without_output_is_printed() {
        let artifact = Artifact::Url("https://x/y.mp3".to_string());
        let delivery = deliver(&artifact, None, "cyberpunk-pluie", OutputFormat::Mp3)
            .await
            .unwrap();
        assert_eq!(delivery, Delivery::Link("https://x/y.mp3".to_string()));
        assert_eq!(delivery.to_string(), "Audio available at https://x/y.mp3");
    }
}
