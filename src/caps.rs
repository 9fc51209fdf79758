//! Surface capability descriptors.
//!
//! A [`SurfaceCaps`] value describes either a requested or an achieved
//! pixel format: bit depths, buffering, multisampling and the kind of
//! surface it can back. Two instances live on every
//! [`GraphicsConfig`](crate::config::GraphicsConfig): the immutable
//! request and the driver-resolved result.

use std::fmt::{self, Display};

use bitflags::bitflags;

bitflags! {
    /// Kinds of rendering target a pixel format can back.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct SurfaceKind: u32 {
        /// On-screen window.
        const WINDOW = 1 << 0;
        /// Off-screen GDI bitmap.
        const BITMAP = 1 << 1;
        /// Off-screen pbuffer.
        const PBUFFER = 1 << 2;
        /// Framebuffer object emulation (window format under the hood).
        const FBO = 1 << 3;
    }
}

impl SurfaceKind {
    /// Kinds that require a displayable native format.
    pub const DISPLAYABLE: SurfaceKind = SurfaceKind::WINDOW
        .union(SurfaceKind::BITMAP)
        .union(SurfaceKind::FBO);
}

/// Hardware acceleration tri-state of a format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Acceleration {
    /// Not specified (request) or not reported (result).
    #[default]
    Unset,
    /// Software rasterizer.
    Software,
    /// Hardware accelerated.
    Accelerated,
}

/// A surface format capability descriptor.
///
/// Pure value semantics: equality and ordering are capability-wise.
/// `Default` zeroes every bit depth and sets the kind to WINDOW; no
/// operation promotes a 0 field to a non-zero default outside of native
/// format decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceCaps {
    pub red_bits: u32,
    pub green_bits: u32,
    pub blue_bits: u32,
    pub alpha_bits: u32,
    pub depth_bits: u32,
    pub stencil_bits: u32,
    pub accum_red_bits: u32,
    pub accum_green_bits: u32,
    pub accum_blue_bits: u32,
    pub accum_alpha_bits: u32,
    pub double_buffered: bool,
    pub stereo: bool,
    /// Multisample buffers requested/achieved.
    pub sample_buffers: bool,
    /// Samples per pixel; meaningful only when `sample_buffers` is set.
    pub samples: u32,
    /// False requests a translucent (blur-behind) window background.
    pub background_opaque: bool,
    pub kinds: SurfaceKind,
    pub acceleration: Acceleration,
    /// Pbuffer: bind as texture.
    pub pbuffer_render_to_texture: bool,
    /// Pbuffer: bind as rectangle texture. Requires render-to-texture.
    pub pbuffer_render_to_texture_rect: bool,
    /// Pbuffer: floating point color components.
    pub pbuffer_float: bool,
}

impl Default for SurfaceCaps {
    fn default() -> Self {
        Self {
            red_bits: 0,
            green_bits: 0,
            blue_bits: 0,
            alpha_bits: 0,
            depth_bits: 0,
            stencil_bits: 0,
            accum_red_bits: 0,
            accum_green_bits: 0,
            accum_blue_bits: 0,
            accum_alpha_bits: 0,
            double_buffered: false,
            stereo: false,
            sample_buffers: false,
            samples: 0,
            background_opaque: true,
            kinds: SurfaceKind::WINDOW,
            acceleration: Acceleration::Unset,
            pbuffer_render_to_texture: false,
            pbuffer_render_to_texture_rect: false,
            pbuffer_float: false,
        }
    }
}

impl SurfaceCaps {
    /// The conventional on-screen window profile, used when the caller
    /// does not supply a request of its own: RGB 8/8/8 with alpha 8,
    /// depth 24, stencil 8, double buffered.
    pub fn window_default() -> Self {
        Self {
            red_bits: 8,
            green_bits: 8,
            blue_bits: 8,
            alpha_bits: 8,
            depth_bits: 24,
            stencil_bits: 8,
            double_buffered: true,
            ..Self::default()
        }
    }

    /// Total color depth excluding alpha.
    pub fn color_bits(&self) -> u32 {
        self.red_bits + self.green_bits + self.blue_bits
    }

    /// Total accumulation depth excluding alpha.
    pub fn accum_bits(&self) -> u32 {
        self.accum_red_bits + self.accum_green_bits + self.accum_blue_bits
    }

    /// True if any accumulation channel is requested.
    pub fn wants_accum(&self) -> bool {
        self.accum_red_bits > 0
            || self.accum_green_bits > 0
            || self.accum_blue_bits > 0
            || self.accum_alpha_bits > 0
    }

    pub fn is_onscreen(&self) -> bool {
        self.kinds.contains(SurfaceKind::WINDOW)
    }

    pub fn is_fbo(&self) -> bool {
        self.kinds.contains(SurfaceKind::FBO)
    }

    pub fn is_pbuffer(&self) -> bool {
        self.kinds.contains(SurfaceKind::PBUFFER)
    }

    pub fn is_bitmap(&self) -> bool {
        self.kinds.contains(SurfaceKind::BITMAP)
    }
}

impl Display for SurfaceCaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rgba {}/{}/{}/{} depth {} stencil {}",
            self.red_bits,
            self.green_bits,
            self.blue_bits,
            self.alpha_bits,
            self.depth_bits,
            self.stencil_bits
        )?;
        if self.wants_accum() {
            write!(
                f,
                " accum {}/{}/{}/{}",
                self.accum_red_bits,
                self.accum_green_bits,
                self.accum_blue_bits,
                self.accum_alpha_bits
            )?;
        }
        if self.double_buffered {
            write!(f, " double")?;
        }
        if self.stereo {
            write!(f, " stereo")?;
        }
        if self.sample_buffers {
            write!(f, " samples {}", self.samples)?;
        }
        write!(f, " kinds {:?}", self.kinds)?;
        if self.acceleration != Acceleration::Unset {
            write!(f, " {:?}", self.acceleration)?;
        }
        Ok(())
    }
}
