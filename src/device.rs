//! The native device boundary.
//!
//! [`PixelFormatApi`] is the seam between the negotiation engine and the
//! platform: one implementor wraps a live GDI device context
//! ([`win32::GdiDevice`](crate::win32) on Windows), tests script a fake.
//! The engine never acquires the device lock itself; the caller holds
//! whatever lock the surface layer mandates for the duration of each
//! call, and the trait object is only borrowed for that call.
//!
//! Which of the two query protocols a device supports is probed once per
//! distinct device and cached for the process lifetime.

use std::collections::HashMap;
use std::fmt::{self, Display};

use lazy_static::lazy_static;
use parking_lot::Mutex;
use tracing::debug;

use crate::pfd::PixelFormatRecord;

/// WGL_ARB_pixel_format: the extended attribute query/choose protocol.
pub const EXT_ARB_PIXEL_FORMAT: &str = "WGL_ARB_pixel_format";
/// WGL_ARB_multisample: sample buffer attributes.
pub const EXT_ARB_MULTISAMPLE: &str = "WGL_ARB_multisample";
/// WGL_ARB_pbuffer: off-screen pbuffer surfaces.
pub const EXT_ARB_PBUFFER: &str = "WGL_ARB_pbuffer";
/// WGL_NV_float_buffer: NVidia floating point components.
pub const EXT_NV_FLOAT_BUFFER: &str = "WGL_NV_float_buffer";
/// WGL_ATI_pixel_format_float: ATI floating point pixel type.
pub const EXT_ATI_PIXEL_FORMAT_FLOAT: &str = "WGL_ATI_pixel_format_float";
/// GL_NV_texture_rectangle: rectangle texture render targets.
pub const EXT_NV_TEXTURE_RECTANGLE: &str = "GL_NV_texture_rectangle";

/// Native pixel format query protocol available on a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Fixed-size PIXELFORMATDESCRIPTOR queries, always available.
    Legacy,
    /// Attribute-list query/choose, gated on WGL_ARB_pixel_format.
    Extended,
}

impl Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Legacy => write!(f, "legacy"),
            Protocol::Extended => write!(f, "extended"),
        }
    }
}

/// Raw access to one device's pixel format calls.
///
/// Format handles are 1-based; 0 is never a valid id. All methods block
/// for the duration of the native call.
pub trait PixelFormatApi {
    /// Stable name of the underlying device, used in diagnostics and as
    /// the probe cache key.
    fn device_name(&self) -> &str;

    /// True if the named WGL/GL extension is advertised by the device.
    fn has_extension(&self, name: &str) -> bool;

    /// DescribePixelFormat. Fills `out` (when given) with the legacy
    /// record for `id` and returns the device's total number of formats,
    /// or 0 on failure. Passing `out = None` turns this into the format
    /// count probe.
    fn describe_format(&self, id: u32, out: Option<&mut PixelFormatRecord>) -> u32;

    /// SetPixelFormat. Applies `id` to the device's current surface.
    fn set_format(&self, id: u32, record: &PixelFormatRecord) -> bool;

    /// wglGetPixelFormatAttribivARB. Queries `keys` for format `id` into
    /// `out` (same length as `keys`). Returns false on failure or when
    /// the extended protocol is unavailable.
    fn query_attribs(&self, id: u32, keys: &[i32], out: &mut [i32]) -> bool;

    /// wglChoosePixelFormatARB. Returns at most `max` format ids in the
    /// driver's own preference order, or `None` if the call failed or
    /// the extended protocol is unavailable.
    fn choose_formats(&self, attribs: &[i32], max: usize) -> Option<Vec<u32>>;

    /// GetLastError equivalent for the most recent failed call.
    fn last_error(&self) -> u32;

    /// Enable blur-behind translucency on the surface backing this
    /// device, if the platform supports it. Used after committing a
    /// non-opaque format; best effort.
    fn enable_blur_behind(&self) -> bool {
        false
    }
}

/// Cached per-device capability probe: which protocol is available and
/// which optional extensions the driver advertises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    pub protocol: Protocol,
    pub multisample: bool,
    pub pbuffer: bool,
    pub nv_float_buffer: bool,
    pub ati_float_pixel: bool,
    pub nv_texture_rectangle: bool,
}

lazy_static! {
    static ref PROFILE_CACHE: Mutex<HashMap<String, DeviceProfile>> = Mutex::new(HashMap::new());
}

impl DeviceProfile {
    /// Query the device's extension set directly, without the cache.
    pub fn probe<A: PixelFormatApi + ?Sized>(api: &A) -> Self {
        let protocol = if api.has_extension(EXT_ARB_PIXEL_FORMAT) {
            Protocol::Extended
        } else {
            Protocol::Legacy
        };
        let profile = Self {
            protocol,
            multisample: api.has_extension(EXT_ARB_MULTISAMPLE),
            pbuffer: api.has_extension(EXT_ARB_PBUFFER),
            nv_float_buffer: api.has_extension(EXT_NV_FLOAT_BUFFER),
            ati_float_pixel: api.has_extension(EXT_ATI_PIXEL_FORMAT_FLOAT),
            nv_texture_rectangle: api.has_extension(EXT_NV_TEXTURE_RECTANGLE),
        };
        debug!(device = api.device_name(), ?profile, "probed device profile");
        profile
    }

    /// Probe the device at most once per process; concurrent first use is
    /// serialized and the second caller observes the cached result.
    pub fn get<A: PixelFormatApi + ?Sized>(api: &A) -> Self {
        let mut cache = PROFILE_CACHE.lock();
        if let Some(profile) = cache.get(api.device_name()) {
            return *profile;
        }
        let profile = Self::probe(api);
        cache.insert(api.device_name().to_string(), profile);
        profile
    }
}
