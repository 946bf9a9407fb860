mod api;
mod app;
mod application;
mod domain;
mod ui;
mod utils;

fn main() -> iced::Result {
    env_logger::init();

    iced::application(app::boot, app::update, app::view)
        .title("Remote Video Downloader")
        .subscription(app::subscription)
        .run()
}
