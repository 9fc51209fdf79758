//! Pixel format negotiation for Windows OpenGL surfaces.
//!
//! Applications describe what they need as a [`SurfaceCaps`] value; this
//! crate negotiates with the driver over one of two wire protocols (the
//! legacy GDI descriptor calls, or the extended WGL_ARB_pixel_format
//! attribute queries), picks a concrete pixel format, and applies it to
//! the surface exactly once.
//!
//! The native boundary is the [`PixelFormatApi`] trait. On Windows the
//! [`win32::GdiDevice`] backend implements it over a live HDC; everywhere
//! else the core logic still compiles and is tested against scripted
//! devices.
//!
//! Typical flow:
//!
//! ```no_run
//! # fn demo(api: &dyn wgl_config::PixelFormatApi) -> wgl_config::ConfigResult<()> {
//! use wgl_config::{ClosestMatch, GraphicsConfig, SurfaceCaps, SurfaceKind};
//!
//! let requested = SurfaceCaps::window_default();
//! let mut config = GraphicsConfig::new("display-0", requested, SurfaceKind::WINDOW);
//! config.resolve(api, &ClosestMatch)?;
//! config.commit(api)?;
//! # Ok(())
//! # }
//! ```

pub mod arb;
pub mod caps;
pub mod chooser;
pub mod config;
pub mod device;
pub mod enumerate;
pub mod error;
pub mod pfd;
pub mod select;

#[cfg(windows)]
pub mod win32;

#[cfg(test)]
pub(crate) mod testutil;

pub use caps::{Acceleration, SurfaceCaps, SurfaceKind};
pub use chooser::{CapsChooser, ClosestMatch, FirstMatch};
pub use config::GraphicsConfig;
pub use device::{DeviceProfile, PixelFormatApi, Protocol};
pub use error::{ConfigError, ConfigResult};
pub use pfd::PixelFormatRecord;
pub use select::Selection;

#[cfg(windows)]
pub use win32::GdiDevice;
