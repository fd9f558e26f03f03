//! **tileterm-core** — Display backend for terminal-emulation game clients
//! (core types).
//!
//! This crate provides the foundational types used across the *tileterm*
//! workspace: geometry primitives, the RGBA color model with a mutable
//! indexed palette, draw requests consumed from the terminal-emulation
//! layer, and the abstract windowing backend interface.

pub mod backend;
pub mod color;
pub mod draw;
pub mod geom;

pub use backend::{Backend, BackendError, Event, WindowConfig};
pub use color::{Color, ColorContext, Palette, PALETTE_MAX};
pub use draw::{DrawRequest, NO_TILE};
pub use geom::Point;
