//! Legacy protocol codec: the fixed-size PIXELFORMATDESCRIPTOR record.
//!
//! Always available on every device, but with narrower coverage than the
//! extended protocol: no multisampling, no pbuffers, no float components.

use tracing::debug;

use crate::caps::{Acceleration, SurfaceCaps, SurfaceKind};
use crate::device::PixelFormatApi;
use crate::error::{ConfigError, ConfigResult};

pub const PFD_DOUBLEBUFFER: u32 = 0x0000_0001;
pub const PFD_STEREO: u32 = 0x0000_0002;
pub const PFD_DRAW_TO_WINDOW: u32 = 0x0000_0004;
pub const PFD_DRAW_TO_BITMAP: u32 = 0x0000_0008;
pub const PFD_SUPPORT_GDI: u32 = 0x0000_0010;
pub const PFD_SUPPORT_OPENGL: u32 = 0x0000_0020;
pub const PFD_GENERIC_FORMAT: u32 = 0x0000_0040;
pub const PFD_GENERIC_ACCELERATED: u32 = 0x0000_1000;
pub const PFD_DOUBLEBUFFER_DONTCARE: u32 = 0x4000_0000;
pub const PFD_STEREO_DONTCARE: u32 = 0x8000_0000;

pub const PFD_TYPE_RGBA: u8 = 0;
pub const PFD_TYPE_COLORINDEX: u8 = 1;

pub const PFD_MAIN_PLANE: u8 = 0;

/// Exact mirror of the Win32 `PIXELFORMATDESCRIPTOR` struct. Field
/// widths and order must match the native layout byte for byte.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelFormatRecord {
    pub n_size: u16,
    pub n_version: u16,
    pub dw_flags: u32,
    pub i_pixel_type: u8,
    pub c_color_bits: u8,
    pub c_red_bits: u8,
    pub c_red_shift: u8,
    pub c_green_bits: u8,
    pub c_green_shift: u8,
    pub c_blue_bits: u8,
    pub c_blue_shift: u8,
    pub c_alpha_bits: u8,
    pub c_alpha_shift: u8,
    pub c_accum_bits: u8,
    pub c_accum_red_bits: u8,
    pub c_accum_green_bits: u8,
    pub c_accum_blue_bits: u8,
    pub c_accum_alpha_bits: u8,
    pub c_depth_bits: u8,
    pub c_stencil_bits: u8,
    pub c_aux_buffers: u8,
    pub i_layer_type: u8,
    pub b_reserved: u8,
    pub dw_layer_mask: u32,
    pub dw_visible_mask: u32,
    pub dw_damage_mask: u32,
}

impl PixelFormatRecord {
    /// A blank record with size and version preset, ready to be filled
    /// by DescribePixelFormat.
    pub fn new() -> Self {
        Self {
            n_size: std::mem::size_of::<Self>() as u16,
            n_version: 1,
            ..Self::default()
        }
    }
}

/// Derive the surface kinds a legacy record can back from its draw-to
/// flags. A window-capable format also backs FBO emulation.
pub fn record_kind_bits(record: &PixelFormatRecord) -> SurfaceKind {
    let mut kinds = SurfaceKind::empty();
    if record.dw_flags & PFD_DRAW_TO_WINDOW != 0 {
        kinds |= SurfaceKind::WINDOW | SurfaceKind::FBO;
    }
    if record.dw_flags & PFD_DRAW_TO_BITMAP != 0 {
        kinds |= SurfaceKind::BITMAP;
    }
    kinds
}

/// Encode a capability request into a legacy record.
///
/// The legacy protocol cannot express multisampling, translucency or
/// pbuffers; a pbuffer request degrades to a bitmap target here, matching
/// the native API's behavior.
pub fn caps_to_record(caps: &SurfaceCaps) -> ConfigResult<PixelFormatRecord> {
    let color_bits = caps.color_bits();
    if color_bits < 15 {
        return Err(ConfigError::UnsupportedCombination(format!(
            "bit depths < 15 (non true-color) not supported, got {color_bits}"
        )));
    }

    let mut flags = PFD_SUPPORT_OPENGL | PFD_GENERIC_ACCELERATED;
    if caps.is_onscreen() || caps.is_fbo() {
        flags |= PFD_DRAW_TO_WINDOW;
    } else if caps.is_pbuffer() || caps.is_bitmap() {
        flags |= PFD_DRAW_TO_BITMAP;
    } else {
        return Err(ConfigError::InvalidArgument(format!(
            "no surface kind set in caps: {caps}"
        )));
    }

    if caps.double_buffered {
        // Bitmap targets rarely support real double buffering.
        if caps.is_bitmap() || caps.is_pbuffer() {
            flags |= PFD_DOUBLEBUFFER_DONTCARE;
        } else {
            flags |= PFD_DOUBLEBUFFER;
        }
    }
    if caps.stereo {
        flags |= PFD_STEREO;
    }

    let mut record = PixelFormatRecord::new();
    record.dw_flags = flags;
    record.i_pixel_type = PFD_TYPE_RGBA;
    record.c_color_bits = color_bits as u8;
    record.c_red_bits = caps.red_bits as u8;
    record.c_green_bits = caps.green_bits as u8;
    record.c_blue_bits = caps.blue_bits as u8;
    record.c_alpha_bits = caps.alpha_bits as u8;
    record.c_accum_bits = caps.accum_bits() as u8;
    record.c_accum_red_bits = caps.accum_red_bits as u8;
    record.c_accum_green_bits = caps.accum_green_bits as u8;
    record.c_accum_blue_bits = caps.accum_blue_bits as u8;
    record.c_accum_alpha_bits = caps.accum_alpha_bits as u8;
    record.c_depth_bits = caps.depth_bits as u8;
    record.c_stencil_bits = caps.stencil_bits as u8;
    record.i_layer_type = PFD_MAIN_PLANE;
    Ok(record)
}

/// Decode a legacy record into a capability descriptor.
///
/// Returns `None` when the format does not support OpenGL at all or when
/// its draw-target kinds do not intersect `permitted`; callers must treat
/// that as "format not acceptable", never as a zero-capability format.
pub fn record_to_caps(record: &PixelFormatRecord, permitted: SurfaceKind) -> Option<SurfaceCaps> {
    if record.dw_flags & PFD_SUPPORT_OPENGL == 0 {
        return None;
    }
    let kinds = record_kind_bits(record) & permitted;
    if kinds.is_empty() {
        return None;
    }

    let generic = record.dw_flags & PFD_GENERIC_FORMAT != 0;
    let generic_accel = record.dw_flags & PFD_GENERIC_ACCELERATED != 0;
    let acceleration = if generic && !generic_accel {
        Acceleration::Software
    } else {
        Acceleration::Accelerated
    };

    Some(SurfaceCaps {
        red_bits: record.c_red_bits as u32,
        green_bits: record.c_green_bits as u32,
        blue_bits: record.c_blue_bits as u32,
        alpha_bits: record.c_alpha_bits as u32,
        depth_bits: record.c_depth_bits as u32,
        stencil_bits: record.c_stencil_bits as u32,
        accum_red_bits: record.c_accum_red_bits as u32,
        accum_green_bits: record.c_accum_green_bits as u32,
        accum_blue_bits: record.c_accum_blue_bits as u32,
        accum_alpha_bits: record.c_accum_alpha_bits as u32,
        double_buffered: record.dw_flags & PFD_DOUBLEBUFFER != 0,
        stereo: record.dw_flags & PFD_STEREO != 0,
        kinds,
        acceleration,
        ..SurfaceCaps::default()
    })
}

/// Describe format `id` on the device and decode it.
///
/// A failed describe means the format is not displayable under the legacy
/// protocol; that is reported as `Ok(None)`, not an error.
pub fn describe_caps<A: PixelFormatApi + ?Sized>(
    api: &A,
    id: u32,
    permitted: SurfaceKind,
) -> ConfigResult<Option<SurfaceCaps>> {
    if id == 0 {
        return Err(ConfigError::InvalidArgument("pixel format id 0".into()));
    }
    let mut record = PixelFormatRecord::new();
    if api.describe_format(id, Some(&mut record)) == 0 {
        debug!(
            device = api.device_name(),
            id,
            code = api.last_error(),
            "non-displayable pixel format"
        );
        return Ok(None);
    }
    Ok(record_to_caps(&record, permitted))
}
