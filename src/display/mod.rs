//! Text rendering for hosts: notifications and per-feature audit traces.
pub mod notify;
pub mod trace;

pub use notify::{Level, Notification};
pub use trace::format_trace;
