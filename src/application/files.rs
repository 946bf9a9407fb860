use std::path::PathBuf;

use futures::{stream::BoxStream, StreamExt};
use log::info;
use tokio::io::AsyncWriteExt;

use crate::api::models::FileEntry;
use crate::api::ApiClient;
use crate::domain::AppError;

#[derive(Debug, Clone)]
pub enum SaveEvent {
    Progress(f32),
    Completed(PathBuf),
    Failed(AppError),
}

/// Operations on the server's list of completed files: refreshing it,
/// deleting entries, and saving a file to the local disk.
#[derive(Clone)]
pub struct FileManager {
    client: ApiClient,
}

impl FileManager {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn refresh(&self) -> Result<Vec<FileEntry>, AppError> {
        self.client
            .list_downloads()
            .await
            .map_err(|e| AppError::Api(e.to_string()))
    }

    pub async fn delete(&self, filename: String) -> Result<(), AppError> {
        self.client
            .delete_file(&filename)
            .await
            .map_err(|e| AppError::Api(e.to_string()))?;
        info!("deleted {}", filename);
        Ok(())
    }

    pub async fn cleanup_all(&self) -> Result<(), AppError> {
        self.client
            .cleanup()
            .await
            .map_err(|e| AppError::Api(e.to_string()))?;
        info!("cleaned up all server-side files");
        Ok(())
    }

    /// Destructive actions go through a native dialog first.
    pub async fn confirm(title: String, description: String) -> bool {
        let result = rfd::AsyncMessageDialog::new()
            .set_level(rfd::MessageLevel::Warning)
            .set_title(title.as_str())
            .set_description(description.as_str())
            .set_buttons(rfd::MessageButtons::OkCancel)
            .show()
            .await;
        matches!(result, rfd::MessageDialogResult::Ok)
    }

    pub async fn choose_save_path(&self, suggested_filename: String) -> Option<PathBuf> {
        rfd::AsyncFileDialog::new()
            .set_file_name(&suggested_filename)
            .save_file()
            .await
            .map(|handle| handle.path().to_path_buf())
    }

    /// Stream a completed file from the server to a local path, emitting
    /// progress along the way.
    pub fn save_stream(&self, filename: String, path: PathBuf) -> BoxStream<'static, SaveEvent> {
        futures::stream::unfold(
            SaveRuntimeState::Start {
                client: self.client.clone(),
                filename,
                path,
            },
            |state| async move {
                match state {
                    SaveRuntimeState::Start {
                        client,
                        filename,
                        path,
                    } => {
                        let file = match tokio::fs::File::create(&path).await {
                            Ok(file) => file,
                            Err(e) => {
                                return Some((
                                    SaveEvent::Failed(AppError::Io(format!(
                                        "Failed to create file: {}",
                                        e
                                    ))),
                                    SaveRuntimeState::Finished,
                                ));
                            }
                        };

                        match client.download_file_stream(&filename).await {
                            Ok((total_size, stream)) => Some((
                                SaveEvent::Progress(0.0),
                                SaveRuntimeState::Saving {
                                    file,
                                    stream: stream.boxed(),
                                    written: 0,
                                    total: total_size,
                                    path,
                                },
                            )),
                            Err(e) => Some((
                                SaveEvent::Failed(AppError::Api(e.to_string())),
                                SaveRuntimeState::Finished,
                            )),
                        }
                    }
                    SaveRuntimeState::Saving {
                        mut file,
                        mut stream,
                        mut written,
                        total,
                        path,
                    } => match stream.next().await {
                        Some(Ok(chunk)) => {
                            if let Err(e) = file.write_all(&chunk).await {
                                return Some((
                                    SaveEvent::Failed(AppError::Io(format!(
                                        "Write error: {}",
                                        e
                                    ))),
                                    SaveRuntimeState::Finished,
                                ));
                            }

                            written += chunk.len() as u64;

                            let progress = match total {
                                Some(total_size) if total_size > 0 => {
                                    written as f32 / total_size as f32
                                }
                                _ => 0.0,
                            };

                            Some((
                                SaveEvent::Progress(progress),
                                SaveRuntimeState::Saving {
                                    file,
                                    stream,
                                    written,
                                    total,
                                    path,
                                },
                            ))
                        }
                        Some(Err(e)) => Some((
                            SaveEvent::Failed(AppError::Api(e.to_string())),
                            SaveRuntimeState::Finished,
                        )),
                        None => {
                            if let Err(e) = file.sync_all().await {
                                return Some((
                                    SaveEvent::Failed(AppError::Io(format!(
                                        "Failed to sync file: {}",
                                        e
                                    ))),
                                    SaveRuntimeState::Finished,
                                ));
                            }

                            Some((SaveEvent::Completed(path), SaveRuntimeState::Finished))
                        }
                    },
                    SaveRuntimeState::Finished => None,
                }
            },
        )
        .boxed()
    }
}

enum SaveRuntimeState {
    Start {
        client: ApiClient,
        filename: String,
        path: PathBuf,
    },
    Saving {
        file: tokio::fs::File,
        stream: BoxStream<'static, crate::api::Result<bytes::Bytes>>,
        written: u64,
        total: Option<u64>,
        path: PathBuf,
    },
    Finished,
}
