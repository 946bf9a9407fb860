pub mod files;
pub mod session;

pub use files::{FileManager, SaveEvent};
pub use session::{DownloadSession, PollEvent};
