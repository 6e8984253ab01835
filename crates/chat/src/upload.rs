//! Upload classification and content extraction.
//!
//! An uploaded file is classified by its declared content type and filename
//! extension, then reduced to the text that becomes the Attachment content:
//! images go through provider image analysis, recognized text files are
//! decoded (and routed through report analysis when they look like a medical
//! report), and everything else is stored as an opaque marker.

use aura_core::provider::Provider;

/// Filename extensions decoded as text.
const TEXT_EXTENSIONS: [&str; 6] = [".txt", ".md", ".py", ".js", ".jsx", ".css"];

/// Keywords that route a decoded text file through report analysis.
const REPORT_KEYWORDS: [&str; 5] = ["blood", "test", "report", "lab", "result"];

/// How an uploaded file will be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadKind {
    /// Declared `image/*` content type; routed through image analysis.
    Image { mime_type: String },
    /// Recognized text extension; decoded as UTF-8.
    Text,
    /// Everything else; stored as an opaque marker.
    Unsupported,
}

/// Classify a file by declared content type, then filename extension.
pub fn classify(filename: &str, content_type: Option<&str>) -> UploadKind {
    if let Some(ct) = content_type {
        if ct.starts_with("image/") {
            return UploadKind::Image {
                mime_type: ct.to_string(),
            };
        }
    }

    if TEXT_EXTENSIONS.iter().any(|ext| filename.ends_with(ext)) {
        return UploadKind::Text;
    }

    UploadKind::Unsupported
}

/// Whether decoded text looks like a medical report worth analyzing.
pub fn looks_like_report(text: &str) -> bool {
    let lowered = text.to_lowercase();
    REPORT_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Reduce an uploaded file to the text stored as the Attachment content.
pub async fn extract_content(
    provider: &dyn Provider,
    filename: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> String {
    match classify(filename, content_type) {
        UploadKind::Image { mime_type } => {
            let analysis = provider.analyze_report_image(data, &mime_type).await;
            format!("[Image Analysis Result]\n{analysis}")
        }
        UploadKind::Text => {
            let text = String::from_utf8_lossy(data).into_owned();
            if looks_like_report(&text) {
                provider.analyze_report_text(&text).await
            } else {
                text
            }
        }
        UploadKind::Unsupported => {
            format!("[Binary/Unsupported file content - Name: {filename}]")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use aura_core::provider::{ChatOutcome, ConverseRequest};

    struct StubProvider;

    #[async_trait]
    impl Provider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn converse(&self, _request: ConverseRequest) -> ChatOutcome {
            ChatOutcome::Unavailable
        }

        async fn analyze_report_text(&self, _text: &str) -> String {
            "TEXT ANALYSIS".into()
        }

        async fn analyze_report_image(&self, _image: &[u8], mime_type: &str) -> String {
            format!("IMAGE ANALYSIS ({mime_type})")
        }
    }

    #[test]
    fn image_content_type_wins_over_extension() {
        let kind = classify("scan.txt", Some("image/png"));
        assert_eq!(
            kind,
            UploadKind::Image {
                mime_type: "image/png".into()
            }
        );
    }

    #[test]
    fn recognized_text_extensions() {
        for name in ["a.txt", "b.md", "c.py", "d.js", "e.jsx", "f.css"] {
            assert_eq!(classify(name, Some("text/plain")), UploadKind::Text, "{name}");
        }
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        assert_eq!(classify("archive.zip", Some("application/zip")), UploadKind::Unsupported);
        assert_eq!(classify("noext", None), UploadKind::Unsupported);
    }

    #[test]
    fn report_keywords_are_case_insensitive() {
        assert!(looks_like_report("Routine BLOOD panel"));
        assert!(looks_like_report("lab values attached"));
        assert!(!looks_like_report("meeting notes for tuesday"));
    }

    #[tokio::test]
    async fn image_upload_is_wrapped_with_marker() {
        let content =
            extract_content(&StubProvider, "scan.png", Some("image/png"), &[0x89]).await;
        assert_eq!(content, "[Image Analysis Result]\nIMAGE ANALYSIS (image/png)");
    }

    #[tokio::test]
    async fn report_text_is_analyzed() {
        let content = extract_content(
            &StubProvider,
            "panel.txt",
            Some("text/plain"),
            b"blood test results follow",
        )
        .await;
        assert_eq!(content, "TEXT ANALYSIS");
    }

    #[tokio::test]
    async fn plain_text_is_stored_verbatim() {
        let content = extract_content(
            &StubProvider,
            "notes.txt",
            Some("text/plain"),
            b"The secret code is AURA-2026.",
        )
        .await;
        assert_eq!(content, "The secret code is AURA-2026.");
    }

    #[tokio::test]
    async fn unsupported_upload_names_the_file() {
        let content =
            extract_content(&StubProvider, "data.bin", Some("application/octet-stream"), &[0, 1])
                .await;
        assert_eq!(content, "[Binary/Unsupported file content - Name: data.bin]");
    }
}
