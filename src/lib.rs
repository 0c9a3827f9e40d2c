//! Display Recorder - capture a display, record it, play it back or save it.
//!
//! The recording lifecycle lives in [`recorder::SessionController`]; the
//! platform capture and recorder primitives sit behind the traits in
//! [`capture`] and [`recorder::media`].

pub mod capture;
pub mod config;
pub mod logging;
pub mod playback;
pub mod recorder;
pub mod shell;
pub mod ui;
pub mod utils;

pub use config::AppConfig;
pub use recorder::{SessionController, SessionError, SessionState};
