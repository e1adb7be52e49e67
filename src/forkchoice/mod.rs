//! Total-difficulty fork choice over recently seen headers.

mod view;

pub use view::{ForkChoiceView, DEFAULT_RETENTION_DEPTH};
