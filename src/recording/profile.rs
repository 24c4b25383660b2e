use crate::config::CaptureFormat;

// extension used when the browser picks the encoding itself
const DEFAULT_EXTENSION: &str = "webm";
const DEFAULT_CONTENT_TYPE: &str = "video/webm";

/// Encoding chosen for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureProfile {
    /// `None` lets the capture collaborator choose.
    pub mime_type: Option<String>,
    pub extension: String,
}

impl CaptureProfile {
    pub fn browser_default() -> Self {
        CaptureProfile {
            mime_type: None,
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// First format in `formats` the encoder reports as supported.
    pub fn select(formats: &[CaptureFormat], is_supported: impl Fn(&str) -> bool) -> Self {
        formats
            .iter()
            .find(|format| is_supported(&format.mime_type))
            .map(|format| CaptureProfile {
                mime_type: Some(format.mime_type.clone()),
                extension: format.extension.clone(),
            })
            .unwrap_or_else(Self::browser_default)
    }

    /// Type stamped on the assembled artifact.
    pub fn content_type(&self) -> &str {
        self.mime_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    /// `<prefix>-<timestamp>.<ext>`, colons swapped out so the name is a
    /// valid file name everywhere.
    pub fn file_name(&self, prefix: &str, timestamp: &str) -> String {
        format!(
            "{}-{}.{}",
            prefix,
            timestamp.replace(':', "-"),
            self.extension
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CaptureConfig;

    #[test]
    fn prefers_first_supported_format() {
        let formats = CaptureConfig::default().formats;
        let profile = CaptureProfile::select(&formats, |mime| mime.starts_with("video/webm"));
        assert_eq!(profile.mime_type.as_deref(), Some("video/webm;codecs=vp9"));
        assert_eq!(profile.extension, "webm");

        let ios = CaptureProfile::select(&formats, |mime| mime == "video/mp4");
        assert_eq!(ios.content_type(), "video/mp4");
        assert_eq!(ios.extension, "mp4");
    }

    #[test]
    fn falls_back_to_browser_default() {
        let formats = CaptureConfig::default().formats;
        let profile = CaptureProfile::select(&formats, |_| false);
        assert_eq!(profile, CaptureProfile::browser_default());
        assert_eq!(profile.content_type(), "video/webm");
    }

    #[test]
    fn file_name_strips_colons() {
        let profile = CaptureProfile::select(&[CaptureFormat::new("video/mp4", "mp4")], |_| true);
        assert_eq!(
            profile.file_name("video", "2024-05-01T12:30:05.123Z"),
            "video-2024-05-01T12-30-05.123Z.mp4"
        );
    }
}
