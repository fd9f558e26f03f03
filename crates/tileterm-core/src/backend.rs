//! The abstract windowing interface.
//!
//! The compositing and font core never talks to a window system directly;
//! it produces pixel buffers, and a [`Backend`] implementation owns the
//! window lifecycle and the final blit. Backends are interchangeable — the
//! core is written once against this trait.

use std::fmt;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for window creation.
#[derive(Clone, Debug)]
pub struct WindowConfig {
    /// Window title.
    pub title: String,
    /// Number of grid columns.
    pub cols: u32,
    /// Number of grid rows.
    pub rows: u32,
    /// Cell width in pixels (from the loaded font).
    pub cell_width: u32,
    /// Cell height in pixels (from the loaded font).
    pub cell_height: u32,
    /// Whether the window may be resized by the user.
    pub resizable: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "tileterm".into(),
            cols: 80,
            rows: 24,
            cell_width: 8,
            cell_height: 16,
            resizable: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Minimal window events surfaced to the client loop.
///
/// Full keyboard translation belongs to the client; the backend only
/// reports the typed character where the window system provides one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// The user asked to close the window.
    CloseRequested,
    /// The window surface changed size (pixels).
    Resized { width: u32, height: u32 },
    /// The window system requested a repaint.
    RedrawRequested,
    /// A character was typed.
    Key(char),
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for backend operations.
#[derive(Debug)]
pub enum BackendError {
    /// Window creation failed.
    WindowCreation(String),
    /// Creating or presenting the pixel surface failed.
    Surface(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WindowCreation(msg) => write!(f, "window creation failed: {msg}"),
            Self::Surface(msg) => write!(f, "surface error: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// A windowing backend: window lifecycle, surface present, event polling.
pub trait Backend {
    /// Create (or recreate) the window described by `config`.
    fn create_window(&mut self, config: &WindowConfig) -> Result<(), BackendError>;

    /// Blit an RGBA pixel buffer (`width * height * 4` bytes, row-major)
    /// to the window surface and present it.
    fn present_surface(&mut self, pixels: &[u8], width: u32, height: u32)
    -> Result<(), BackendError>;

    /// Poll for the next pending window event, without blocking.
    fn poll_event(&mut self) -> Option<Event>;
}
