//! Winit windowing backend for tileterm.
//!
//! The reference [`Backend`] implementation:
//! - [`winit`] for window creation and input events
//! - [`softbuffer`] for CPU-based pixel presentation
//!
//! The compositing core never appears here — this crate only owns the
//! window, converts the context's RGBA output into the surface's `0RGB`
//! layout, and surfaces a minimal event stream.

use std::collections::VecDeque;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use winit::application::ApplicationHandler;
use winit::dpi::{LogicalSize, PhysicalSize};
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::Key;
use winit::platform::pump_events::EventLoopExtPumpEvents;
use winit::window::{Window, WindowId};

use tileterm_core::{Backend, BackendError, Event, WindowConfig};

/// Winit + softbuffer backend.
///
/// Events are pumped non-blockingly on every [`poll_event`] call, so the
/// game loop stays in control of timing.
///
/// [`poll_event`]: Backend::poll_event
pub struct WinitBackend {
    event_loop: EventLoop<()>,
    app: App,
}

impl WinitBackend {
    pub fn new() -> Result<Self, BackendError> {
        let event_loop =
            EventLoop::new().map_err(|e| BackendError::WindowCreation(e.to_string()))?;
        Ok(Self {
            event_loop,
            app: App::default(),
        })
    }

    fn pump(&mut self) {
        let _ = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.app);
    }
}

impl Backend for WinitBackend {
    fn create_window(&mut self, config: &WindowConfig) -> Result<(), BackendError> {
        self.app.config = Some(config.clone());
        self.app.window = None;
        self.app.surface = None;
        // The window is created inside `resumed`, which fires on the first
        // pump after the config is in place.
        self.pump();
        if let Some(err) = self.app.error.take() {
            return Err(err);
        }
        if self.app.window.is_none() {
            return Err(BackendError::WindowCreation(
                "event loop did not resume".into(),
            ));
        }
        Ok(())
    }

    fn present_surface(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> Result<(), BackendError> {
        let surface = self
            .app
            .surface
            .as_mut()
            .ok_or_else(|| BackendError::Surface("no window surface".into()))?;

        let (Some(w), Some(h)) = (NonZeroU32::new(width), NonZeroU32::new(height)) else {
            return Ok(());
        };
        surface
            .resize(w, h)
            .map_err(|e| BackendError::Surface(e.to_string()))?;
        let mut buf = surface
            .buffer_mut()
            .map_err(|e| BackendError::Surface(e.to_string()))?;

        let count = (width as usize * height as usize).min(pixels.len() / 4);
        for (dst, src) in buf.iter_mut().zip(pixels.chunks_exact(4).take(count)) {
            *dst = 0xFF000000
                | ((src[0] as u32) << 16)
                | ((src[1] as u32) << 8)
                | (src[2] as u32);
        }
        buf.present()
            .map_err(|e| BackendError::Surface(e.to_string()))?;
        Ok(())
    }

    fn poll_event(&mut self) -> Option<Event> {
        self.pump();
        self.app.events.pop_front()
    }
}

// ---------------------------------------------------------------------------
// ApplicationHandler
// ---------------------------------------------------------------------------

#[derive(Default)]
struct App {
    config: Option<WindowConfig>,
    window: Option<Arc<Window>>,
    surface: Option<softbuffer::Surface<Arc<Window>, Arc<Window>>>,
    events: VecDeque<Event>,
    error: Option<BackendError>,
}

impl App {
    fn init_window(&mut self, event_loop: &ActiveEventLoop) -> Result<(), BackendError> {
        let Some(config) = self.config.as_ref() else {
            return Ok(());
        };
        let pixel_w = config.cols * config.cell_width;
        let pixel_h = config.rows * config.cell_height;

        let attrs = Window::default_attributes()
            .with_title(&config.title)
            .with_inner_size(LogicalSize::new(pixel_w, pixel_h))
            .with_resizable(config.resizable);
        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .map_err(|e| BackendError::WindowCreation(e.to_string()))?,
        );

        let context = softbuffer::Context::new(window.clone())
            .map_err(|e| BackendError::Surface(e.to_string()))?;
        let surface = softbuffer::Surface::new(&context, window.clone())
            .map_err(|e| BackendError::Surface(e.to_string()))?;

        self.window = Some(window);
        self.surface = Some(surface);
        log::debug!("created {pixel_w}x{pixel_h} window");
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(err) = self.init_window(event_loop) {
            self.error = Some(err);
        }
    }

    fn window_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.events.push_back(Event::CloseRequested);
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.events.push_back(Event::Resized { width, height });
            }
            WindowEvent::RedrawRequested => {
                self.events.push_back(Event::RedrawRequested);
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if !event.state.is_pressed() {
                    return;
                }
                if let Key::Character(text) = event.logical_key {
                    if let Some(ch) = text.chars().next() {
                        self.events.push_back(Event::Key(ch));
                    }
                }
            }
            _ => {}
        }
    }
}
