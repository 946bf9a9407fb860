use serde::Serialize;

/// One download submission. Built once from the form, immutable after send.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadRequest {
    pub url: String,
    pub options: OptionSet,
}

/// Options forwarded to the server's extraction engine. Unset keys are
/// omitted from the JSON body so the server keeps its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OptionSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postprocessors: Option<Vec<Postprocessor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noplaylist: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookiedata: Option<String>,
}

/// A post-processing directive, in the engine's own key naming.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Postprocessor {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferredcodec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferredquality: Option<String>,
}

impl Postprocessor {
    pub fn extract_audio(codec: &str, quality: &str) -> Self {
        Self {
            key: "FFmpegExtractAudio".to_string(),
            preferredcodec: Some(codec.to_string()),
            preferredquality: Some(quality.to_string()),
        }
    }
}

impl OptionSet {
    /// Combine the form inputs into the option mapping the server expects.
    ///
    /// Audio-only wins over any quality/container selection; the container
    /// narrows the format selector; playlists are opt-in (the server
    /// defaults to single-video).
    pub fn from_form(
        quality: Option<&str>,
        container: Option<&str>,
        audio_only: bool,
        allow_playlist: bool,
        cookie_text: &str,
    ) -> Self {
        let mut options = OptionSet::default();

        if let Some(quality) = quality {
            options.format = Some(quality.to_string());
        }

        if let Some(container) = container {
            let base = options.format.as_deref().unwrap_or("best");
            options.format = Some(format!("{}[ext={}]", base, container));
        }

        if audio_only {
            options.format = Some("bestaudio/best".to_string());
            options.postprocessors = Some(vec![Postprocessor::extract_audio("mp3", "192")]);
        }

        if allow_playlist {
            options.noplaylist = Some(false);
        }

        let cookie_text = cookie_text.trim();
        if !cookie_text.is_empty() {
            options.cookiedata = Some(cookie_text.to_string());
        }

        options
    }
}

/// Opaque reference to a server-side download job.
#[derive(Debug, Clone)]
pub struct JobHandle {
    pub id: String,
}
