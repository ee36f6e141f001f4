/// Interactive NMR spectrum viewer.
///
/// 1D traces are decimated to the visible window, phased live and overlaid
/// with draggable peak markers. 2D spectra are drawn as contour polylines on
/// the GPU with an optional magnifier inset. Numerical work runs on a compute
/// worker; committed edits land in a session history.

pub mod app;
pub mod compute;
pub mod config;
pub mod contour;
pub mod data;
pub mod demo;
pub mod error;
pub mod gui;
pub mod history;
pub mod render;
pub mod view;

pub use error::{Result, ViewError};
