//! Extended protocol codec: WGL_ARB_pixel_format attribute lists.
//!
//! Available only when the driver advertises the extension. Attribute
//! lists are bounded (key, value) sequences terminated by a 0 sentinel,
//! fed to the native choose call and returned by the native query call.

use tracing::debug;

use crate::caps::{Acceleration, SurfaceCaps, SurfaceKind};
use crate::device::{DeviceProfile, PixelFormatApi};
use crate::error::{ConfigError, ConfigResult};
use crate::pfd::PixelFormatRecord;

pub const GL_FALSE: i32 = 0;
pub const GL_TRUE: i32 = 1;

pub const WGL_NUMBER_PIXEL_FORMATS_ARB: i32 = 0x2000;
pub const WGL_DRAW_TO_WINDOW_ARB: i32 = 0x2001;
pub const WGL_DRAW_TO_BITMAP_ARB: i32 = 0x2002;
pub const WGL_ACCELERATION_ARB: i32 = 0x2003;
pub const WGL_SUPPORT_OPENGL_ARB: i32 = 0x2010;
pub const WGL_DOUBLE_BUFFER_ARB: i32 = 0x2011;
pub const WGL_STEREO_ARB: i32 = 0x2012;
pub const WGL_PIXEL_TYPE_ARB: i32 = 0x2013;
pub const WGL_COLOR_BITS_ARB: i32 = 0x2014;
pub const WGL_RED_BITS_ARB: i32 = 0x2015;
pub const WGL_GREEN_BITS_ARB: i32 = 0x2017;
pub const WGL_BLUE_BITS_ARB: i32 = 0x2019;
pub const WGL_ALPHA_BITS_ARB: i32 = 0x201B;
pub const WGL_ACCUM_BITS_ARB: i32 = 0x201D;
pub const WGL_ACCUM_RED_BITS_ARB: i32 = 0x201E;
pub const WGL_ACCUM_GREEN_BITS_ARB: i32 = 0x201F;
pub const WGL_ACCUM_BLUE_BITS_ARB: i32 = 0x2020;
pub const WGL_ACCUM_ALPHA_BITS_ARB: i32 = 0x2021;
pub const WGL_DEPTH_BITS_ARB: i32 = 0x2022;
pub const WGL_STENCIL_BITS_ARB: i32 = 0x2023;
pub const WGL_NO_ACCELERATION_ARB: i32 = 0x2025;
pub const WGL_GENERIC_ACCELERATION_ARB: i32 = 0x2026;
pub const WGL_FULL_ACCELERATION_ARB: i32 = 0x2027;
pub const WGL_TYPE_RGBA_ARB: i32 = 0x202B;
pub const WGL_DRAW_TO_PBUFFER_ARB: i32 = 0x202D;
pub const WGL_SAMPLE_BUFFERS_ARB: i32 = 0x2041;
pub const WGL_SAMPLES_ARB: i32 = 0x2042;
pub const WGL_BIND_TO_TEXTURE_RGB_ARB: i32 = 0x2070;
pub const WGL_BIND_TO_TEXTURE_RGBA_ARB: i32 = 0x2071;
pub const WGL_BIND_TO_TEXTURE_RECTANGLE_RGB_NV: i32 = 0x20A0;
pub const WGL_BIND_TO_TEXTURE_RECTANGLE_RGBA_NV: i32 = 0x20A1;
pub const WGL_FLOAT_COMPONENTS_NV: i32 = 0x20B0;
pub const WGL_BIND_TO_TEXTURE_RECTANGLE_FLOAT_RGB_NV: i32 = 0x20B8;
pub const WGL_TYPE_RGBA_FLOAT_ATI: i32 = 0x21A0;

/// Maximum number of (key, value) pairs in an attribute list; the native
/// choose call takes fixed-size buffers.
pub const MAX_ATTRIBS: usize = 256;
/// Maximum number of candidate formats requested from the native choose.
pub const MAX_PFORMATS: usize = 256;

/// Which vendor extension carries the floating point request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatMode {
    None,
    /// WGL_NV_float_buffer, preferred.
    Nv,
    /// WGL_ATI_pixel_format_float.
    Ati,
}

/// A bounded, ordered attribute list for the extended protocol.
#[derive(Debug, Clone, Default)]
pub struct AttribList {
    items: Vec<i32>,
}

impl AttribList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of (key, value) pairs pushed so far.
    pub fn pairs(&self) -> usize {
        self.items.len() / 2
    }

    /// Append one pair. Exceeding [`MAX_ATTRIBS`] is rejected, never
    /// truncated.
    pub fn push(&mut self, key: i32, value: i32) -> ConfigResult<()> {
        if self.pairs() >= MAX_ATTRIBS {
            return Err(ConfigError::InvalidArgument(format!(
                "attribute list exceeds {MAX_ATTRIBS} pairs"
            )));
        }
        self.items.push(key);
        self.items.push(value);
        Ok(())
    }

    /// Terminate with the 0 sentinel and yield the raw list.
    pub fn finish(mut self) -> Vec<i32> {
        self.items.push(0);
        self.items
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.items
    }
}

/// Look up the value for `key` in a sentinel-terminated attribute list.
pub fn find_attrib(attribs: &[i32], key: i32) -> Option<i32> {
    let mut i = 0;
    while i + 1 < attribs.len() && attribs[i] != 0 {
        if attribs[i] == key {
            return Some(attribs[i + 1]);
        }
        i += 2;
    }
    None
}

/// Encode a capability request into a choose-operation attribute list.
///
/// Emission order is fixed: support-opengl, acceleration, surface kind,
/// double buffer, stereo, RGB bits, optional alpha, optional stencil,
/// depth, optional accumulation block, optional multisample block,
/// optional pbuffer block, sentinel. Pbuffer requests carrying texture or
/// float attributes are validated against the native API's invariants;
/// violations are configuration errors, not recoverable fallbacks.
pub fn caps_to_attribs(
    caps: &SurfaceCaps,
    profile: &DeviceProfile,
) -> ConfigResult<(Vec<i32>, FloatMode)> {
    let mut list = AttribList::new();
    list.push(WGL_SUPPORT_OPENGL_ARB, GL_TRUE)?;

    match caps.acceleration {
        Acceleration::Unset => {}
        Acceleration::Software => list.push(WGL_ACCELERATION_ARB, WGL_NO_ACCELERATION_ARB)?,
        Acceleration::Accelerated => list.push(WGL_ACCELERATION_ARB, WGL_FULL_ACCELERATION_ARB)?,
    }

    let use_pbuffer = caps.is_pbuffer() && profile.pbuffer;
    let surface_key = if caps.is_onscreen() {
        WGL_DRAW_TO_WINDOW_ARB
    } else if caps.is_fbo() {
        // FBO emulation rides on a window-capable format.
        WGL_DRAW_TO_WINDOW_ARB
    } else if use_pbuffer {
        WGL_DRAW_TO_PBUFFER_ARB
    } else if caps.is_bitmap() {
        WGL_DRAW_TO_BITMAP_ARB
    } else if caps.is_pbuffer() {
        return Err(ConfigError::UnsupportedCombination(
            "pbuffer surface requires WGL_ARB_pbuffer".into(),
        ));
    } else {
        return Err(ConfigError::InvalidArgument(format!(
            "no surface kind set in caps: {caps}"
        )));
    };
    list.push(surface_key, GL_TRUE)?;

    list.push(
        WGL_DOUBLE_BUFFER_ARB,
        if caps.double_buffered { GL_TRUE } else { GL_FALSE },
    )?;
    list.push(WGL_STEREO_ARB, if caps.stereo { GL_TRUE } else { GL_FALSE })?;

    list.push(WGL_RED_BITS_ARB, caps.red_bits as i32)?;
    list.push(WGL_GREEN_BITS_ARB, caps.green_bits as i32)?;
    list.push(WGL_BLUE_BITS_ARB, caps.blue_bits as i32)?;
    if caps.alpha_bits > 0 {
        list.push(WGL_ALPHA_BITS_ARB, caps.alpha_bits as i32)?;
    }
    if caps.stencil_bits > 0 {
        list.push(WGL_STENCIL_BITS_ARB, caps.stencil_bits as i32)?;
    }
    list.push(WGL_DEPTH_BITS_ARB, caps.depth_bits as i32)?;

    if caps.wants_accum() {
        let total =
            caps.accum_red_bits + caps.accum_green_bits + caps.accum_blue_bits + caps.accum_alpha_bits;
        list.push(WGL_ACCUM_BITS_ARB, total as i32)?;
        list.push(WGL_ACCUM_RED_BITS_ARB, caps.accum_red_bits as i32)?;
        list.push(WGL_ACCUM_GREEN_BITS_ARB, caps.accum_green_bits as i32)?;
        list.push(WGL_ACCUM_BLUE_BITS_ARB, caps.accum_blue_bits as i32)?;
        list.push(WGL_ACCUM_ALPHA_BITS_ARB, caps.accum_alpha_bits as i32)?;
    }

    if caps.sample_buffers && profile.multisample {
        list.push(WGL_SAMPLE_BUFFERS_ARB, GL_TRUE)?;
        list.push(WGL_SAMPLES_ARB, caps.samples as i32)?;
    }

    let mut float_mode = FloatMode::None;
    if use_pbuffer {
        let rtt = caps.pbuffer_render_to_texture;
        let rect = caps.pbuffer_render_to_texture_rect;
        let use_float = caps.pbuffer_float;

        if rect && !rtt {
            return Err(ConfigError::UnsupportedCombination(
                "render-to-texture-rectangle requires render-to-texture".into(),
            ));
        }
        if rect && !profile.nv_texture_rectangle {
            return Err(ConfigError::UnsupportedCombination(
                "render-to-texture-rectangle requires GL_NV_texture_rectangle".into(),
            ));
        }
        if use_float {
            // Prefer the NVidia extension over ATI.
            float_mode = if profile.nv_float_buffer {
                FloatMode::Nv
            } else if profile.ati_float_pixel {
                FloatMode::Ati
            } else {
                return Err(ConfigError::UnsupportedCombination(
                    "floating point pbuffers not supported by this hardware".into(),
                ));
            };
            debug!(?float_mode, "using floating point extension");
        }

        if float_mode == FloatMode::Ati {
            if rtt {
                return Err(ConfigError::UnsupportedCombination(
                    "render to floating point texture not supported on ATI hardware".into(),
                ));
            }
            list.push(WGL_PIXEL_TYPE_ARB, WGL_TYPE_RGBA_FLOAT_ATI)?;
        } else if !rtt {
            list.push(WGL_PIXEL_TYPE_ARB, WGL_TYPE_RGBA_ARB)?;
        }

        if float_mode == FloatMode::Nv {
            list.push(WGL_FLOAT_COMPONENTS_NV, GL_TRUE)?;
        }

        if rtt {
            if use_float {
                if !rect {
                    return Err(ConfigError::UnsupportedCombination(
                        "render to floating point texture requires render-to-texture-rectangle"
                            .into(),
                    ));
                }
                list.push(WGL_BIND_TO_TEXTURE_RECTANGLE_FLOAT_RGB_NV, GL_TRUE)?;
            } else if rect {
                list.push(WGL_BIND_TO_TEXTURE_RECTANGLE_RGB_NV, GL_TRUE)?;
            } else {
                list.push(WGL_BIND_TO_TEXTURE_RGB_ARB, GL_TRUE)?;
            }
        }
    } else {
        list.push(WGL_PIXEL_TYPE_ARB, WGL_TYPE_RGBA_ARB)?;
    }

    Ok((list.finish(), float_mode))
}

/// The key list used to describe an arbitrary format via the extended
/// query. Multisample and float keys are only asked for when the device
/// advertises the extension; some drivers fail the whole query otherwise.
pub fn general_query_keys(profile: &DeviceProfile) -> Vec<i32> {
    let mut keys = vec![WGL_DRAW_TO_WINDOW_ARB];
    if profile.pbuffer {
        keys.push(WGL_DRAW_TO_PBUFFER_ARB);
    }
    keys.extend_from_slice(&[
        WGL_DRAW_TO_BITMAP_ARB,
        WGL_ACCELERATION_ARB,
        WGL_SUPPORT_OPENGL_ARB,
        WGL_DEPTH_BITS_ARB,
        WGL_STENCIL_BITS_ARB,
        WGL_DOUBLE_BUFFER_ARB,
        WGL_STEREO_ARB,
        WGL_PIXEL_TYPE_ARB,
        WGL_RED_BITS_ARB,
        WGL_GREEN_BITS_ARB,
        WGL_BLUE_BITS_ARB,
        WGL_ALPHA_BITS_ARB,
        WGL_ACCUM_RED_BITS_ARB,
        WGL_ACCUM_GREEN_BITS_ARB,
        WGL_ACCUM_BLUE_BITS_ARB,
        WGL_ACCUM_ALPHA_BITS_ARB,
    ]);
    if profile.multisample {
        keys.push(WGL_SAMPLE_BUFFERS_ARB);
        keys.push(WGL_SAMPLES_ARB);
    }
    if profile.pbuffer && profile.nv_float_buffer {
        keys.push(WGL_FLOAT_COMPONENTS_NV);
    }
    keys
}

fn value_of(keys: &[i32], values: &[i32], key: i32) -> Option<i32> {
    keys.iter().position(|&k| k == key).map(|i| values[i])
}

/// Derive the surface kinds the queried draw-target flags report true.
pub fn attrib_kind_bits(keys: &[i32], values: &[i32]) -> SurfaceKind {
    let mut kinds = SurfaceKind::empty();
    if value_of(keys, values, WGL_DRAW_TO_WINDOW_ARB) == Some(GL_TRUE) {
        kinds |= SurfaceKind::WINDOW | SurfaceKind::FBO;
    }
    if value_of(keys, values, WGL_DRAW_TO_BITMAP_ARB) == Some(GL_TRUE) {
        kinds |= SurfaceKind::BITMAP;
    }
    if value_of(keys, values, WGL_DRAW_TO_PBUFFER_ARB) == Some(GL_TRUE) {
        kinds |= SurfaceKind::PBUFFER;
    }
    kinds
}

/// Decode queried attribute values into a capability descriptor.
///
/// `displayable` reflects whether the legacy describe of the same id
/// succeeded; when it did not, on-screen kind bits are stripped before
/// the permitted-kinds intersection so only pbuffer-only formats survive.
/// Returns `None` when the surviving kind set is empty.
pub fn attribs_to_caps(
    keys: &[i32],
    values: &[i32],
    permitted: SurfaceKind,
    displayable: bool,
) -> Option<SurfaceCaps> {
    if value_of(keys, values, WGL_SUPPORT_OPENGL_ARB) == Some(GL_FALSE) {
        return None;
    }

    let mut kinds = attrib_kind_bits(keys, values);
    if !displayable {
        kinds &= !SurfaceKind::DISPLAYABLE;
    }
    kinds &= permitted;
    if kinds.is_empty() {
        return None;
    }

    let acceleration = match value_of(keys, values, WGL_ACCELERATION_ARB) {
        Some(v) if v == WGL_FULL_ACCELERATION_ARB => Acceleration::Accelerated,
        Some(_) => Acceleration::Software,
        None => Acceleration::Unset,
    };

    let float_pixel_type =
        value_of(keys, values, WGL_PIXEL_TYPE_ARB) == Some(WGL_TYPE_RGBA_FLOAT_ATI);
    let float_components = value_of(keys, values, WGL_FLOAT_COMPONENTS_NV) == Some(GL_TRUE);

    let bits = |key| value_of(keys, values, key).unwrap_or(0).max(0) as u32;
    Some(SurfaceCaps {
        red_bits: bits(WGL_RED_BITS_ARB),
        green_bits: bits(WGL_GREEN_BITS_ARB),
        blue_bits: bits(WGL_BLUE_BITS_ARB),
        alpha_bits: bits(WGL_ALPHA_BITS_ARB),
        depth_bits: bits(WGL_DEPTH_BITS_ARB),
        stencil_bits: bits(WGL_STENCIL_BITS_ARB),
        accum_red_bits: bits(WGL_ACCUM_RED_BITS_ARB),
        accum_green_bits: bits(WGL_ACCUM_GREEN_BITS_ARB),
        accum_blue_bits: bits(WGL_ACCUM_BLUE_BITS_ARB),
        accum_alpha_bits: bits(WGL_ACCUM_ALPHA_BITS_ARB),
        double_buffered: value_of(keys, values, WGL_DOUBLE_BUFFER_ARB) == Some(GL_TRUE),
        stereo: value_of(keys, values, WGL_STEREO_ARB) == Some(GL_TRUE),
        sample_buffers: value_of(keys, values, WGL_SAMPLE_BUFFERS_ARB) == Some(GL_TRUE),
        samples: bits(WGL_SAMPLES_ARB),
        kinds,
        acceleration,
        pbuffer_float: float_pixel_type || float_components,
        ..SurfaceCaps::default()
    })
}

/// Query format `id` through the extended protocol and decode it.
pub fn query_format_caps<A: PixelFormatApi + ?Sized>(
    api: &A,
    profile: &DeviceProfile,
    id: u32,
    permitted: SurfaceKind,
) -> ConfigResult<Option<SurfaceCaps>> {
    if id == 0 {
        return Err(ConfigError::InvalidArgument("pixel format id 0".into()));
    }
    let keys = general_query_keys(profile);
    let mut values = vec![0i32; keys.len()];
    if !api.query_attribs(id, &keys, &mut values) {
        return Err(ConfigError::NativeCallFailure {
            call: "wglGetPixelFormatAttribivARB",
            code: api.last_error(),
        });
    }
    let mut record = PixelFormatRecord::new();
    let displayable = api.describe_format(id, Some(&mut record)) != 0;
    Ok(attribs_to_caps(&keys, &values, permitted, displayable))
}

/// Probe whether the driver accepts `id` in extended queries.
///
/// Some GPUs fail the query with a zero (success) last-error code; that
/// is treated as valid.
pub fn format_id_valid<A: PixelFormatApi + ?Sized>(api: &A, id: u32) -> bool {
    let keys = [WGL_COLOR_BITS_ARB];
    let mut values = [0i32];
    if !api.query_attribs(id, &keys, &mut values) {
        return api.last_error() == 0;
    }
    true
}
