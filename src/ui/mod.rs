use iced::{
    widget::{
        button, checkbox, column, pick_list, progress_bar, row, scrollable, text, text_input,
        Space,
    },
    Element, Length,
};

use crate::api::models::{FileEntry, FormatInfo, VideoInfo};
use crate::utils::{format_duration, format_file_size};

pub const QUALITY_PRESETS: [&str; 5] = [
    "best",
    "best[height<=1080]",
    "best[height<=720]",
    "best[height<=480]",
    "worst",
];

pub const CONTAINER_PRESETS: [&str; 3] = ["mp4", "webm", "mkv"];

/// Main view state
pub struct DownloadView {
    pub video_url: String,
    pub quality: Option<&'static str>,
    pub container: Option<&'static str>,
    pub audio_only: bool,
    pub allow_playlist: bool,
    pub cookie_text: String,
    pub status_message: String,
    pub is_downloading: bool,
    pub percent: f64,
    pub progress_detail: String,
    pub completed_file: Option<String>,
    pub video_info: Option<VideoInfo>,
    pub files: Vec<FileEntry>,
    pub files_error: Option<String>,
}

impl Default for DownloadView {
    fn default() -> Self {
        Self {
            video_url: String::new(),
            quality: None,
            container: None,
            audio_only: false,
            allow_playlist: false,
            cookie_text: String::new(),
            status_message: "Enter a video URL to download".to_string(),
            is_downloading: false,
            percent: 0.0,
            progress_detail: String::new(),
            completed_file: None,
            video_info: None,
            files: Vec::new(),
            files_error: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    VideoUrlChanged(String),
    QualityPicked(&'static str),
    ContainerPicked(&'static str),
    AudioOnlyToggled(bool),
    AllowPlaylistToggled(bool),
    CookieTextChanged(String),
    GetInfoPressed,
    DownloadPressed,
    CancelTrackingPressed,
    RefreshFilesPressed,
    CleanupPressed,
    DeleteFilePressed(String),
    SaveFilePressed(String),
}

impl DownloadView {
    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::VideoUrlChanged(url) => {
                self.video_url = url;
            }
            DownloadMessage::QualityPicked(quality) => {
                self.quality = Some(quality);
            }
            DownloadMessage::ContainerPicked(container) => {
                self.container = Some(container);
            }
            DownloadMessage::AudioOnlyToggled(checked) => {
                self.audio_only = checked;
            }
            DownloadMessage::AllowPlaylistToggled(checked) => {
                self.allow_playlist = checked;
            }
            DownloadMessage::CookieTextChanged(cookies) => {
                self.cookie_text = cookies;
            }
            // Everything else is handled by the app
            _ => {}
        }
    }

    pub fn view(&self) -> Element<'_, DownloadMessage> {
        let mut page = column![
            text("Remote Video Downloader").size(32),
            Space::new().height(Length::Fixed(20.0)),
            text("Video URL:").size(16),
            text_input("https://...", &self.video_url)
                .on_input(DownloadMessage::VideoUrlChanged)
                .padding(10),
            Space::new().height(Length::Fixed(10.0)),
            row![
                pick_list(
                    QUALITY_PRESETS,
                    self.quality,
                    DownloadMessage::QualityPicked
                )
                .placeholder("Quality (auto)"),
                pick_list(
                    CONTAINER_PRESETS,
                    self.container,
                    DownloadMessage::ContainerPicked
                )
                .placeholder("Container (any)"),
            ]
            .spacing(10),
            row![
                checkbox(self.audio_only)
                    .label("Audio only (MP3)")
                    .on_toggle(DownloadMessage::AudioOnlyToggled),
                checkbox(self.allow_playlist)
                    .label("Download playlist")
                    .on_toggle(DownloadMessage::AllowPlaylistToggled),
            ]
            .spacing(20),
            text_input("Cookies (optional, Netscape format)", &self.cookie_text)
                .on_input(DownloadMessage::CookieTextChanged)
                .padding(10),
            Space::new().height(Length::Fixed(10.0)),
            row![
                button("Get Info")
                    .on_press(DownloadMessage::GetInfoPressed)
                    .padding([10, 20]),
                button("Download Video")
                    .on_press(DownloadMessage::DownloadPressed)
                    .padding([10, 20]),
            ]
            .spacing(10),
            Space::new().height(Length::Fixed(10.0)),
            text(&self.status_message).size(14),
        ]
        .padding(20)
        .spacing(10);

        if self.is_downloading {
            page = page
                .push(progress_bar(0.0..=100.0, self.percent as f32))
                .push(text(format!("{:.1}%", self.percent)).size(14))
                .push(text(&self.progress_detail).size(13))
                .push(
                    button("Cancel Tracking")
                        .on_press(DownloadMessage::CancelTrackingPressed)
                        .padding([6, 14]),
                );
        }

        if let Some(filename) = &self.completed_file {
            page = page.push(
                row![
                    text(format!("Ready: {}", filename)).size(14),
                    button("Save File")
                        .on_press(DownloadMessage::SaveFilePressed(filename.clone()))
                        .padding([6, 14]),
                ]
                .spacing(10),
            );
        }

        if let Some(info) = &self.video_info {
            page = page.push(Space::new().height(Length::Fixed(10.0)));
            page = page.push(self.info_card(info));
        }

        page = page.push(Space::new().height(Length::Fixed(20.0)));
        page = page.push(self.files_section());

        scrollable(page).into()
    }

    fn info_card(&self, info: &VideoInfo) -> Element<'_, DownloadMessage> {
        let mut card = column![
            text("Video Information").size(20),
            text(format!("Title: {}", info.title)).size(14),
            text(format!("Uploader: {}", info.uploader)).size(14),
        ]
        .spacing(5);

        if info.duration > 0.0 {
            card = card.push(
                text(format!("Duration: {}", format_duration(info.duration as u64))).size(14),
            );
        }
        if info.view_count > 0 {
            card = card.push(text(format!("Views: {}", info.view_count)).size(14));
        }
        if !info.description.is_empty() {
            card = card.push(text(format!("Description: {}", info.description)).size(13));
        }

        if !info.formats.is_empty() {
            card = card.push(text("Available formats:").size(14));
            for format in &info.formats {
                card = card.push(text(format_line(format)).size(13));
            }
        }

        card.into()
    }

    fn files_section(&self) -> Element<'_, DownloadMessage> {
        let mut section = column![
            row![
                text("Downloaded Files").size(20),
                button("Refresh")
                    .on_press(DownloadMessage::RefreshFilesPressed)
                    .padding([6, 14]),
                button("Clean Up All")
                    .on_press(DownloadMessage::CleanupPressed)
                    .padding([6, 14]),
            ]
            .spacing(10),
        ]
        .spacing(8);

        if let Some(error) = &self.files_error {
            section = section.push(text(format!("Error loading files: {}", error)).size(14));
        } else if self.files.is_empty() {
            section = section.push(text("No downloaded files yet").size(14));
        } else {
            for file in &self.files {
                section = section.push(
                    row![
                        column![
                            text(&file.filename).size(14),
                            text(format!("{} MB, modified {}", file.size_mb, file.modified))
                                .size(12),
                        ]
                        .spacing(2),
                        button("Save")
                            .on_press(DownloadMessage::SaveFilePressed(file.filename.clone()))
                            .padding([6, 14]),
                        button("Delete")
                            .on_press(DownloadMessage::DeleteFilePressed(file.filename.clone()))
                            .padding([6, 14]),
                    ]
                    .spacing(10),
                );
            }
        }

        section.into()
    }
}

/// One line of the format list, e.g. `MP4 - 720p - 1280x720 (12.00 MB)`
fn format_line(format: &FormatInfo) -> String {
    let quality = if format.quality.is_empty() {
        "Unknown quality"
    } else {
        &format.quality
    };
    let resolution = if format.height > 0 {
        format!(" - {}x{}", format.width, format.height)
    } else {
        String::new()
    };
    let size = match format.filesize {
        Some(bytes) if bytes > 0 => format!(" ({})", format_file_size(bytes)),
        _ => String::new(),
    };
    format!("{} - {}{}{}", format.ext.to_uppercase(), quality, resolution, size)
}
