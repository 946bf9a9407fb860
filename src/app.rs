use std::path::PathBuf;
use std::time::Duration;

use futures::StreamExt;
use iced::{task, Subscription, Task};
use log::{debug, info, warn};

use crate::api::models::{ApiConfig, FileEntry, JobStatus, ProgressSnapshot, VideoInfo};
use crate::api::ApiClient;
use crate::application::{DownloadSession, FileManager, PollEvent, SaveEvent};
use crate::domain::{DownloadRequest, JobHandle, OptionSet};
use crate::ui::{DownloadMessage, DownloadView};
use crate::utils::{file_name, format_duration, format_file_size, format_speed};

/// The completed-files list refreshes on this cadence, independent of any
/// active download session.
const FILES_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

pub struct DownloadApp {
    view: DownloadView,
    api: ApiClient,
    session: DownloadSession,
    files: FileManager,
    active: Option<ActiveSession>,
}

/// The one in-flight session. Replacing it goes through `end_session`,
/// which aborts the poll task first, so two poll timers never coexist.
struct ActiveSession {
    job_id: String,
    poll_abort: task::Handle,
}

impl Default for DownloadApp {
    fn default() -> Self {
        Self::new()
    }
}

impl DownloadApp {
    pub fn new() -> Self {
        let config = match std::env::var("VIDEO_DOWNLOADER_SERVER") {
            Ok(value) => ApiConfig::new(&value).unwrap_or_else(|e| {
                warn!("ignoring invalid VIDEO_DOWNLOADER_SERVER ({}): {}", value, e);
                ApiConfig::default()
            }),
            Err(_) => ApiConfig::default(),
        };
        info!("using download server at {}", config.base_url);

        let api = ApiClient::new(config);
        Self {
            view: DownloadView::default(),
            session: DownloadSession::new(api.clone()),
            files: FileManager::new(api.clone()),
            api,
            active: None,
        }
    }

    fn end_session(&mut self) {
        if let Some(active) = self.active.take() {
            debug!("aborting poll task for job {}", active.job_id);
            active.poll_abort.abort();
        }
    }

    fn refresh_files(&self) -> Task<Message> {
        let files = self.files.clone();
        Task::perform(
            async move { files.refresh().await.map_err(|e| e.to_string()) },
            Message::FilesLoaded,
        )
    }
}

pub fn boot() -> (DownloadApp, Task<Message>) {
    let app = DownloadApp::new();
    let initial = app.refresh_files();
    (app, initial)
}

#[derive(Debug, Clone)]
pub enum Message {
    Ui(DownloadMessage),
    InfoReceived(Result<VideoInfo, String>),
    Submitted(Result<JobHandle, String>),
    /// An event from the poll stream, tagged with the job it belongs to
    /// so stale sessions can never touch current state.
    Poll {
        job_id: String,
        event: PollEvent,
    },
    FilesRefreshTick,
    FilesLoaded(Result<Vec<FileEntry>, String>),
    DeleteConfirmed {
        filename: String,
        confirmed: bool,
    },
    DeleteFinished(Result<(), String>),
    CleanupConfirmed(bool),
    CleanupFinished(Result<(), String>),
    SaveTargetChosen {
        filename: String,
        target: Option<PathBuf>,
    },
    Save(SaveEvent),
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::Ui(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                DownloadMessage::GetInfoPressed => {
                    let url = app.view.video_url.trim().to_string();
                    if url.is_empty() {
                        app.view.status_message = "Please enter a video URL".to_string();
                        return Task::none();
                    }

                    app.view.status_message = "Fetching video information...".to_string();
                    let api = app.api.clone();
                    return Task::perform(
                        async move { api.video_info(&url).await.map_err(|e| e.to_string()) },
                        Message::InfoReceived,
                    );
                }
                DownloadMessage::DownloadPressed => {
                    let url = app.view.video_url.trim().to_string();
                    if url.is_empty() {
                        app.view.status_message = "Please enter a video URL".to_string();
                        return Task::none();
                    }

                    let request = DownloadRequest {
                        url,
                        options: OptionSet::from_form(
                            app.view.quality,
                            app.view.container,
                            app.view.audio_only,
                            app.view.allow_playlist,
                            &app.view.cookie_text,
                        ),
                    };

                    app.view.is_downloading = true;
                    app.view.percent = 0.0;
                    app.view.progress_detail.clear();
                    app.view.completed_file = None;
                    app.view.status_message = "Starting download...".to_string();

                    let session = app.session.clone();
                    return Task::perform(
                        async move { session.submit(request).await.map_err(|e| e.to_string()) },
                        Message::Submitted,
                    );
                }
                DownloadMessage::CancelTrackingPressed => {
                    app.end_session();
                    app.view.is_downloading = false;
                    app.view.percent = 0.0;
                    app.view.progress_detail.clear();
                    app.view.status_message =
                        "Progress tracking cancelled (the server may keep working)".to_string();
                }
                DownloadMessage::RefreshFilesPressed => {
                    return app.refresh_files();
                }
                DownloadMessage::CleanupPressed => {
                    return Task::perform(
                        FileManager::confirm(
                            "Clean up all files".to_string(),
                            "Delete ALL downloaded files on the server? This cannot be undone."
                                .to_string(),
                        ),
                        Message::CleanupConfirmed,
                    );
                }
                DownloadMessage::DeleteFilePressed(filename) => {
                    let description =
                        format!("Delete \"{}\"? This cannot be undone.", filename);
                    return Task::perform(
                        FileManager::confirm("Delete file".to_string(), description),
                        move |confirmed| Message::DeleteConfirmed {
                            filename: filename.clone(),
                            confirmed,
                        },
                    );
                }
                DownloadMessage::SaveFilePressed(filename) => {
                    let files = app.files.clone();
                    let suggested = filename.clone();
                    return Task::perform(
                        async move { files.choose_save_path(suggested).await },
                        move |target| Message::SaveTargetChosen {
                            filename: filename.clone(),
                            target,
                        },
                    );
                }
                _ => {}
            }
        }
        Message::InfoReceived(result) => match result {
            Ok(info) => {
                app.view.status_message = "Video information loaded".to_string();
                app.view.video_info = Some(info);
            }
            Err(e) => {
                app.view.status_message = format!("Failed to get video information: {}", e);
            }
        },
        Message::Submitted(result) => match result {
            Ok(handle) => {
                // A new job always replaces (and aborts) the previous session
                app.end_session();

                let job_id = handle.id.clone();
                let tag = job_id.clone();
                let stream = app
                    .session
                    .poll_events(handle)
                    .map(move |event| Message::Poll {
                        job_id: tag.clone(),
                        event,
                    });
                let (poll_task, poll_abort) = Task::stream(stream).abortable();

                app.active = Some(ActiveSession { job_id, poll_abort });
                app.view.status_message = "Download started, tracking progress...".to_string();
                return poll_task;
            }
            Err(e) => {
                app.view.is_downloading = false;
                app.view.status_message = format!("Failed to start download: {}", e);
            }
        },
        Message::Poll { job_id, event } => {
            let is_current = app
                .active
                .as_ref()
                .is_some_and(|active| active.job_id == job_id);
            if !is_current {
                debug!("ignoring stale poll event for job {}", job_id);
                return Task::none();
            }

            match event {
                PollEvent::Progress(snapshot) => {
                    app.view.percent = snapshot.percent;
                    if snapshot.status == JobStatus::Starting {
                        app.view.status_message = "Preparing download...".to_string();
                        app.view.progress_detail.clear();
                    } else {
                        let name = snapshot
                            .filename
                            .as_deref()
                            .map(file_name)
                            .unwrap_or("...");
                        app.view.status_message = format!("Downloading: {}", name);
                        app.view.progress_detail = progress_details(&snapshot);
                    }
                }
                PollEvent::Finished { filename } => {
                    app.active = None;
                    app.view.is_downloading = false;
                    app.view.percent = 100.0;
                    app.view.progress_detail.clear();
                    app.view.completed_file = Some(filename);
                    app.view.status_message = "Download completed successfully!".to_string();
                    return app.refresh_files();
                }
                PollEvent::Failed { message } => {
                    app.active = None;
                    app.view.is_downloading = false;
                    app.view.percent = 0.0;
                    app.view.progress_detail.clear();
                    app.view.status_message = format!("Download failed: {}", message);
                }
                PollEvent::TrackingFailed { message } => {
                    app.active = None;
                    app.view.is_downloading = false;
                    app.view.percent = 0.0;
                    app.view.progress_detail.clear();
                    app.view.status_message = message;
                }
            }
        }
        Message::FilesRefreshTick => {
            return app.refresh_files();
        }
        Message::FilesLoaded(result) => match result {
            Ok(files) => {
                app.view.files = files;
                app.view.files_error = None;
            }
            Err(e) => {
                app.view.files_error = Some(e);
            }
        },
        Message::DeleteConfirmed {
            filename,
            confirmed,
        } => {
            if confirmed {
                let files = app.files.clone();
                return Task::perform(
                    async move { files.delete(filename).await.map_err(|e| e.to_string()) },
                    Message::DeleteFinished,
                );
            }
        }
        Message::DeleteFinished(result) => match result {
            Ok(()) => return app.refresh_files(),
            Err(e) => {
                app.view.status_message = format!("Failed to delete file: {}", e);
            }
        },
        Message::CleanupConfirmed(confirmed) => {
            if confirmed {
                let files = app.files.clone();
                return Task::perform(
                    async move { files.cleanup_all().await.map_err(|e| e.to_string()) },
                    Message::CleanupFinished,
                );
            }
        }
        Message::CleanupFinished(result) => match result {
            Ok(()) => return app.refresh_files(),
            Err(e) => {
                app.view.status_message = format!("Failed to clean up files: {}", e);
            }
        },
        Message::SaveTargetChosen { filename, target } => match target {
            Some(path) => {
                app.view.status_message = format!("Saving to: {}", path.display());
                return Task::stream(app.files.save_stream(filename, path)).map(Message::Save);
            }
            None => {
                app.view.status_message = "Save cancelled".to_string();
            }
        },
        Message::Save(event) => match event {
            SaveEvent::Progress(progress) => {
                app.view.status_message = format!("Saving file: {:.0}%", progress * 100.0);
            }
            SaveEvent::Completed(path) => {
                app.view.status_message = format!("Saved: {}", path.display());
            }
            SaveEvent::Failed(e) => {
                app.view.status_message = format!("Failed to save file: {}", e);
            }
        },
    }
    Task::none()
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::Ui)
}

pub fn subscription(_app: &DownloadApp) -> Subscription<Message> {
    iced::time::every(FILES_REFRESH_INTERVAL).map(|_| Message::FilesRefreshTick)
}

/// Speed, bytes and ETA line under the progress bar
fn progress_details(snapshot: &ProgressSnapshot) -> String {
    let mut parts = Vec::new();

    if let Some(speed) = snapshot.speed {
        parts.push(format_speed(speed as u64));
    }
    if let (Some(done), Some(total)) = (snapshot.downloaded_bytes, snapshot.total_bytes) {
        parts.push(format!(
            "{} / {}",
            format_file_size(done),
            format_file_size(total)
        ));
    }
    if let Some(eta) = snapshot.eta {
        parts.push(format!("ETA {}", format_duration(eta)));
    }

    parts.join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submitted(app: &mut DownloadApp, id: &str) {
        let _ = update(
            app,
            Message::Submitted(Ok(JobHandle { id: id.to_string() })),
        );
    }

    #[test]
    fn test_empty_url_shows_validation_error_without_submitting() {
        let mut app = DownloadApp::new();
        let _ = update(&mut app, Message::Ui(DownloadMessage::DownloadPressed));
        assert!(!app.view.is_downloading);
        assert_eq!(app.view.status_message, "Please enter a video URL");
        assert!(app.active.is_none());
    }

    #[test]
    fn test_second_submit_replaces_the_active_session() {
        let mut app = DownloadApp::new();
        submitted(&mut app, "job-1");
        assert_eq!(app.active.as_ref().unwrap().job_id, "job-1");

        submitted(&mut app, "job-2");
        assert_eq!(app.active.as_ref().unwrap().job_id, "job-2");
    }

    #[test]
    fn test_stale_poll_events_are_ignored() {
        let mut app = DownloadApp::new();
        submitted(&mut app, "job-2");

        let _ = update(
            &mut app,
            Message::Poll {
                job_id: "job-1".to_string(),
                event: PollEvent::Failed {
                    message: "old session".to_string(),
                },
            },
        );
        assert!(app.active.is_some());
        assert!(!app.view.status_message.contains("old session"));
    }

    #[test]
    fn test_terminal_event_clears_the_session() {
        let mut app = DownloadApp::new();
        submitted(&mut app, "job-1");

        let _ = update(
            &mut app,
            Message::Poll {
                job_id: "job-1".to_string(),
                event: PollEvent::Finished {
                    filename: "v.mp4".to_string(),
                },
            },
        );
        assert!(app.active.is_none());
        assert!(!app.view.is_downloading);
        assert_eq!(app.view.completed_file.as_deref(), Some("v.mp4"));
    }

    #[test]
    fn test_cancel_tracking_is_idempotent() {
        let mut app = DownloadApp::new();
        submitted(&mut app, "job-1");

        let _ = update(
            &mut app,
            Message::Ui(DownloadMessage::CancelTrackingPressed),
        );
        assert!(app.active.is_none());

        let _ = update(
            &mut app,
            Message::Ui(DownloadMessage::CancelTrackingPressed),
        );
        assert!(app.active.is_none());
    }

    #[test]
    fn test_progress_details_line() {
        let snapshot = ProgressSnapshot {
            status: JobStatus::Downloading,
            percent: 50.0,
            speed: Some(1024.0),
            downloaded_bytes: Some(512),
            total_bytes: Some(1024),
            eta: Some(5),
            filename: None,
            error: None,
        };
        assert_eq!(
            progress_details(&snapshot),
            "1.00 KB/s | 512.00 B / 1.00 KB | ETA 0:05"
        );
    }
}
