use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use log::{info, warn};

use crate::api::models::{JobStatus, ProgressSnapshot};
use crate::api::ApiClient;
use crate::domain::{AppError, DownloadRequest, JobHandle};
use crate::utils::file_name;

/// Fixed delay between progress polls.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What a poll tick produced.
///
/// `Finished`, `Failed` and `TrackingFailed` are terminal: the stream ends
/// right after yielding one of them.
#[derive(Debug, Clone)]
pub enum PollEvent {
    Progress(ProgressSnapshot),
    Finished { filename: String },
    Failed { message: String },
    TrackingFailed { message: String },
}

/// Owns the lifecycle of one in-flight download job, from submission to
/// terminal resolution. Instances are cheap clones around a shared client,
/// passed explicitly to whoever drives them.
#[derive(Clone)]
pub struct DownloadSession {
    client: ApiClient,
    poll_interval: Duration,
}

impl DownloadSession {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(client: ApiClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    /// Submit a download request. Validation failures short-circuit before
    /// any network I/O; on acceptance the server's opaque job id comes back
    /// as a handle to poll with.
    pub async fn submit(&self, request: DownloadRequest) -> Result<JobHandle, AppError> {
        let url = request.url.trim();
        if url.is_empty() {
            return Err(AppError::EmptyUrl);
        }
        if url::Url::parse(url).is_err() {
            return Err(AppError::InvalidUrl);
        }

        info!("submitting download for {}", url);
        let id = self
            .client
            .start_download(&request)
            .await
            .map_err(|e| AppError::Api(e.to_string()))?;
        info!("server accepted job {}", id);
        Ok(JobHandle { id })
    }

    /// The polling state machine as a cancellable stream: drop (or abort)
    /// the stream and no further ticks happen.
    ///
    /// Each tick sleeps the fixed interval, then asks the server for the
    /// job's status. A tick only starts after the previous request has
    /// settled, so polls can never overlap. Any failure to reach or parse
    /// the endpoint is terminal; nothing is retried.
    pub fn poll_events(&self, handle: JobHandle) -> BoxStream<'static, PollEvent> {
        let state = PollState::Ticking {
            client: self.client.clone(),
            job_id: handle.id,
            interval: self.poll_interval,
        };

        futures::stream::unfold(state, |state| async move {
            let PollState::Ticking {
                client,
                job_id,
                interval,
            } = state
            else {
                return None;
            };

            tokio::time::sleep(interval).await;

            match client.progress(&job_id).await {
                Err(e) => {
                    warn!("progress poll for {} failed: {}", job_id, e);
                    let event = PollEvent::TrackingFailed {
                        message: format!("Error tracking progress: {}", e),
                    };
                    Some((event, PollState::Done))
                }
                Ok(snapshot) => match snapshot.status {
                    JobStatus::Finished => {
                        let filename = snapshot
                            .filename
                            .as_deref()
                            .map(|f| file_name(f).to_string())
                            .unwrap_or_default();
                        info!("job {} finished: {}", job_id, filename);
                        Some((PollEvent::Finished { filename }, PollState::Done))
                    }
                    JobStatus::Error | JobStatus::NotFound => {
                        let message = snapshot
                            .error
                            .unwrap_or_else(|| "Unknown error".to_string());
                        warn!("job {} failed: {}", job_id, message);
                        Some((PollEvent::Failed { message }, PollState::Done))
                    }
                    JobStatus::Starting | JobStatus::Downloading => Some((
                        PollEvent::Progress(snapshot),
                        PollState::Ticking {
                            client,
                            job_id,
                            interval,
                        },
                    )),
                },
            }
        })
        .boxed()
    }
}

enum PollState {
    Ticking {
        client: ApiClient,
        job_id: String,
        interval: Duration,
    },
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::ApiConfig;
    use crate::domain::OptionSet;

    const FAST_POLL: Duration = Duration::from_millis(10);

    fn session_for(server: &mockito::Server) -> DownloadSession {
        let client = ApiClient::new(ApiConfig::new(&server.url()).unwrap());
        DownloadSession::with_poll_interval(client, FAST_POLL)
    }

    fn request(url: &str) -> DownloadRequest {
        DownloadRequest {
            url: url.to_string(),
            options: OptionSet::default(),
        }
    }

    #[tokio::test]
    async fn test_empty_url_never_hits_the_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/download")
            .expect(0)
            .create_async()
            .await;

        let session = session_for(&server);
        assert!(matches!(
            session.submit(request("")).await,
            Err(AppError::EmptyUrl)
        ));
        assert!(matches!(
            session.submit(request("   ")).await,
            Err(AppError::EmptyUrl)
        ));
        assert!(matches!(
            session.submit(request("not a url")).await,
            Err(AppError::InvalidUrl)
        ));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_returns_job_handle() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/download")
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true, "download_id": "abc"}"#)
            .create_async()
            .await;

        let handle = session_for(&server)
            .submit(request("https://x/1"))
            .await
            .unwrap();
        assert_eq!(handle.id, "abc");
    }

    #[tokio::test]
    async fn test_submit_surfaces_server_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/download")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Failed to start download: boom"}"#)
            .create_async()
            .await;

        let err = session_for(&server)
            .submit(request("https://x/1"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to start download: boom");
    }

    #[tokio::test]
    async fn test_finished_is_terminal_with_one_success_event() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/progress/abc")
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "finished", "percent": 100, "filename": "downloads/v.mp4"}"#)
            .create_async()
            .await;

        let mut events = session_for(&server).poll_events(JobHandle {
            id: "abc".to_string(),
        });

        match events.next().await {
            Some(PollEvent::Finished { filename }) => assert_eq!(filename, "v.mp4"),
            other => panic!("expected Finished, got {:?}", other),
        }
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_error_is_terminal_with_server_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/progress/abc")
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "error", "error": "Video unavailable"}"#)
            .create_async()
            .await;

        let mut events = session_for(&server).poll_events(JobHandle {
            id: "abc".to_string(),
        });

        match events.next().await {
            Some(PollEvent::Failed { message }) => assert_eq!(message, "Video unavailable"),
            other => panic!("expected Failed, got {:?}", other),
        }
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_stops_polling_without_retry() {
        // Nothing listens on this port; the first tick fails and ends the stream
        let client = ApiClient::new(ApiConfig::new("http://127.0.0.1:9").unwrap());
        let session = DownloadSession::with_poll_interval(client, FAST_POLL);

        let mut events = session.poll_events(JobHandle {
            id: "abc".to_string(),
        });

        match events.next().await {
            Some(PollEvent::TrackingFailed { message }) => {
                assert!(message.starts_with("Error tracking progress:"));
            }
            other => panic!("expected TrackingFailed, got {:?}", other),
        }
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_downloading_then_finished_sequence() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/progress/abc")
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "downloading", "percent": 50.0}"#)
            .create_async()
            .await;

        let mut events = session_for(&server).poll_events(JobHandle {
            id: "abc".to_string(),
        });

        match events.next().await {
            Some(PollEvent::Progress(snapshot)) => assert_eq!(snapshot.percent, 50.0),
            other => panic!("expected Progress, got {:?}", other),
        }

        // Later-registered mocks take precedence; the next tick sees `finished`
        server
            .mock("GET", "/progress/abc")
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "finished", "percent": 100, "filename": "v.mp4"}"#)
            .create_async()
            .await;

        match events.next().await {
            Some(PollEvent::Finished { filename }) => assert_eq!(filename, "v.mp4"),
            other => panic!("expected Finished, got {:?}", other),
        }
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_dropping_the_stream_stops_ticks() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/progress/abc")
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "downloading", "percent": 10.0}"#)
            .expect(1)
            .create_async()
            .await;

        let mut events = session_for(&server).poll_events(JobHandle {
            id: "abc".to_string(),
        });
        assert!(matches!(
            events.next().await,
            Some(PollEvent::Progress(_))
        ));
        drop(events);

        // Give any stray tick time to fire; exactly one request must have landed
        tokio::time::sleep(FAST_POLL * 5).await;
        mock.assert_async().await;
    }
}
