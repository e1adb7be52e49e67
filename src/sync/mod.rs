//! The proof-of-work sync driver and its supporting pieces.

mod announcements;
mod config;
mod driver;
mod error;

pub use announcements::AnnouncementEmitter;
pub use config::{
    SyncConfig, DEFAULT_BOOTSTRAP_HEADERS, DEFAULT_PRUNE_WINDOW, DEFAULT_QUEUE_POLL_INTERVAL,
    DEFAULT_RESUME_LOOKBACK,
};
pub use driver::{SyncDriver, SyncDriverBuilder, SyncDriverHandle, UnwindPoint};
pub use error::SyncError;
