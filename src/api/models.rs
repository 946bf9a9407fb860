use serde::Deserialize;
use url::Url;

/// Response from `POST /download`
#[derive(Debug, Clone, Deserialize)]
pub struct StartDownloadResponse {
    pub download_id: String,
}

/// Server-side job status as reported by `GET /progress/{id}`.
///
/// `not_found` is what the server answers when asked about an unknown id;
/// the client treats it like `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Starting,
    Downloading,
    Finished,
    Error,
    NotFound,
}

/// One snapshot of a job's progress. Everything except `status` is
/// best-effort: the server omits fields it does not know yet.
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressSnapshot {
    pub status: JobStatus,
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub downloaded_bytes: Option<u64>,
    #[serde(default)]
    pub total_bytes: Option<u64>,
    #[serde(default)]
    pub eta: Option<u64>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Response from `POST /info`
#[derive(Debug, Clone, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    pub uploader: String,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub formats: Vec<FormatInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormatInfo {
    #[serde(default)]
    pub format_id: String,
    #[serde(default)]
    pub ext: String,
    #[serde(default)]
    pub quality: String,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub height: u64,
    #[serde(default)]
    pub width: u64,
}

/// One completed file from `GET /downloads`
#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    pub filename: String,
    pub size_mb: f64,
    pub modified: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileListResponse {
    pub files: Vec<FileEntry>,
}

/// Error payload the server attaches to non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: Url,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
        })
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_snapshot_full() {
        let json = r#"{
            "status": "downloading",
            "percent": 45.3,
            "downloaded_bytes": 4750000,
            "total_bytes": 10485760,
            "speed": 524288.5,
            "eta": 11,
            "filename": "downloads/video.mp4"
        }"#;
        let snapshot: ProgressSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.status, JobStatus::Downloading);
        assert_eq!(snapshot.percent, 45.3);
        assert_eq!(snapshot.total_bytes, Some(10485760));
        assert_eq!(snapshot.eta, Some(11));
        assert!(snapshot.error.is_none());
    }

    #[test]
    fn test_progress_snapshot_minimal() {
        let snapshot: ProgressSnapshot =
            serde_json::from_str(r#"{"status": "starting", "percent": 0}"#).unwrap();
        assert_eq!(snapshot.status, JobStatus::Starting);
        assert!(snapshot.filename.is_none());
    }

    #[test]
    fn test_not_found_status() {
        let snapshot: ProgressSnapshot =
            serde_json::from_str(r#"{"status": "not_found", "error": "Download not found"}"#)
                .unwrap();
        assert_eq!(snapshot.status, JobStatus::NotFound);
        assert_eq!(snapshot.error.as_deref(), Some("Download not found"));
    }

    #[test]
    fn test_file_list_response() {
        let json = r#"{"files": [
            {"filename": "a.mp4", "size": 1048576, "size_mb": 1.0, "modified": "2025-01-02 10:00:00"}
        ]}"#;
        let list: FileListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(list.files.len(), 1);
        assert_eq!(list.files[0].filename, "a.mp4");
        assert_eq!(list.files[0].size_mb, 1.0);
    }
}
