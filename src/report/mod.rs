//! Incident report generation from video.
//!
//! A [`ReportGenerator`] turns a video into free-text analysis; [`document`] lays the
//! text out as a paginated PDF.

pub mod document;
pub mod gemini;

pub use document::{paginate, render_pdf, Page, PageLayout};
pub use gemini::GeminiReportGenerator;

use crate::error::{CaseLinkError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Video container types accepted for analysis, with their MIME types.
const VIDEO_TYPES: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("avi", "video/x-msvideo"),
    ("mov", "video/quicktime"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
];

/// A video file to analyze.
#[derive(Debug, Clone)]
pub struct VideoAsset {
    pub path: PathBuf,
    pub mime_type: String,
    pub display_name: String,
}

impl VideoAsset {
    /// Describe a local video file, checking that it exists and has a supported extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CaseLinkError::InvalidInput(format!(
                "Video file not found: {}",
                path.display()
            )));
        }

        let mime_type = mime_type_for(path).ok_or_else(|| {
            CaseLinkError::InvalidInput(format!(
                "Unsupported video format: {} (expected one of: {})",
                path.display(),
                supported_extensions().join(", ")
            ))
        })?;

        let display_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video")
            .to_string();

        Ok(Self {
            path: path.to_path_buf(),
            mime_type: mime_type.to_string(),
            display_name,
        })
    }
}

/// MIME type for a supported video path.
pub fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    VIDEO_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

/// Supported video file extensions.
pub fn supported_extensions() -> Vec<&'static str> {
    VIDEO_TYPES.iter().map(|(e, _)| *e).collect()
}

/// Produces an incident report from a video.
#[async_trait]
pub trait ReportGenerator: Send + Sync {
    /// Analyze `video` and return the report text.
    ///
    /// Fails with [`CaseLinkError::Generation`] when the service returns no text.
    async fn generate(&self, video: &VideoAsset) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_types() {
        assert_eq!(mime_type_for(Path::new("cctv.mp4")), Some("video/mp4"));
        assert_eq!(mime_type_for(Path::new("CCTV.MOV")), Some("video/quicktime"));
        assert_eq!(mime_type_for(Path::new("a/b/clip.mkv")), Some("video/x-matroska"));
        assert_eq!(mime_type_for(Path::new("notes.txt")), None);
        assert_eq!(mime_type_for(Path::new("noext")), None);
    }

    #[test]
    fn test_video_asset_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("atm_cam.avi");
        std::fs::write(&video, b"fake").unwrap();

        let asset = VideoAsset::from_path(&video).unwrap();
        assert_eq!(asset.mime_type, "video/x-msvideo");
        assert_eq!(asset.display_name, "atm_cam.avi");

        let text = dir.path().join("notes.txt");
        std::fs::write(&text, b"fake").unwrap();
        assert!(matches!(VideoAsset::from_path(&text), Err(CaseLinkError::InvalidInput(_))));

        let missing = dir.path().join("missing.mp4");
        assert!(matches!(VideoAsset::from_path(&missing), Err(CaseLinkError::InvalidInput(_))));
    }
}
