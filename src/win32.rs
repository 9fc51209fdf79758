//! Real device backend over GDI and WGL.
//!
//! Wraps a live device context handle. The caller owns the surface and
//! the display lock; a [`GdiDevice`] must only be used while that lock is
//! held, and it borrows the HDC rather than owning it.

#![cfg(windows)]

use std::collections::HashSet;
use std::ffi::CStr;
use std::mem;

use tracing::debug;
use windows::core::PCSTR;
use windows::Win32::Foundation::{GetLastError, BOOL, HWND};
use windows::Win32::Graphics::Dwm::{DwmEnableBlurBehindWindow, DWM_BB_ENABLE, DWM_BLURBEHIND};
use windows::Win32::Graphics::Gdi::{WindowFromDC, HDC};
use windows::Win32::Graphics::OpenGL::{
    wglGetProcAddress, DescribePixelFormat, SetPixelFormat, PFD_FLAGS, PFD_LAYER_TYPE,
    PFD_PIXEL_TYPE, PIXELFORMATDESCRIPTOR,
};

use crate::device::PixelFormatApi;
use crate::pfd::PixelFormatRecord;

type GetPixelFormatAttribivArb = unsafe extern "system" fn(
    hdc: HDC,
    pixel_format: i32,
    layer_plane: i32,
    n_attributes: u32,
    attributes: *const i32,
    values: *mut i32,
) -> BOOL;

type ChoosePixelFormatArb = unsafe extern "system" fn(
    hdc: HDC,
    attrib_i_list: *const i32,
    attrib_f_list: *const f32,
    max_formats: u32,
    formats: *mut i32,
    num_formats: *mut u32,
) -> BOOL;

type GetExtensionsStringArb = unsafe extern "system" fn(hdc: HDC) -> *const core::ffi::c_char;

/// Extended-protocol entry points, resolved once per device.
struct WglExt {
    get_pixel_format_attribiv: Option<GetPixelFormatAttribivArb>,
    choose_pixel_format: Option<ChoosePixelFormatArb>,
}

unsafe fn load<T>(name: &CStr) -> Option<T> {
    let proc = wglGetProcAddress(PCSTR(name.as_ptr() as *const u8))?;
    // FARPROC -> typed entry point; sizes always match.
    Some(mem::transmute_copy(&proc))
}

fn to_native(record: &PixelFormatRecord) -> PIXELFORMATDESCRIPTOR {
    PIXELFORMATDESCRIPTOR {
        nSize: record.n_size,
        nVersion: record.n_version,
        dwFlags: PFD_FLAGS(record.dw_flags),
        iPixelType: PFD_PIXEL_TYPE(record.i_pixel_type as i8),
        cColorBits: record.c_color_bits,
        cRedBits: record.c_red_bits,
        cRedShift: record.c_red_shift,
        cGreenBits: record.c_green_bits,
        cGreenShift: record.c_green_shift,
        cBlueBits: record.c_blue_bits,
        cBlueShift: record.c_blue_shift,
        cAlphaBits: record.c_alpha_bits,
        cAlphaShift: record.c_alpha_shift,
        cAccumBits: record.c_accum_bits,
        cAccumRedBits: record.c_accum_red_bits,
        cAccumGreenBits: record.c_accum_green_bits,
        cAccumBlueBits: record.c_accum_blue_bits,
        cAccumAlphaBits: record.c_accum_alpha_bits,
        cDepthBits: record.c_depth_bits,
        cStencilBits: record.c_stencil_bits,
        cAuxBuffers: record.c_aux_buffers,
        iLayerType: PFD_LAYER_TYPE(record.i_layer_type as i8),
        bReserved: record.b_reserved,
        dwLayerMask: record.dw_layer_mask,
        dwVisibleMask: record.dw_visible_mask,
        dwDamageMask: record.dw_damage_mask,
    }
}

fn from_native(pfd: &PIXELFORMATDESCRIPTOR) -> PixelFormatRecord {
    PixelFormatRecord {
        n_size: pfd.nSize,
        n_version: pfd.nVersion,
        dw_flags: pfd.dwFlags.0,
        i_pixel_type: pfd.iPixelType.0 as u8,
        c_color_bits: pfd.cColorBits,
        c_red_bits: pfd.cRedBits,
        c_red_shift: pfd.cRedShift,
        c_green_bits: pfd.cGreenBits,
        c_green_shift: pfd.cGreenShift,
        c_blue_bits: pfd.cBlueBits,
        c_blue_shift: pfd.cBlueShift,
        c_alpha_bits: pfd.cAlphaBits,
        c_alpha_shift: pfd.cAlphaShift,
        c_accum_bits: pfd.cAccumBits,
        c_accum_red_bits: pfd.cAccumRedBits,
        c_accum_green_bits: pfd.cAccumGreenBits,
        c_accum_blue_bits: pfd.cAccumBlueBits,
        c_accum_alpha_bits: pfd.cAccumAlphaBits,
        c_depth_bits: pfd.cDepthBits,
        c_stencil_bits: pfd.cStencilBits,
        c_aux_buffers: pfd.cAuxBuffers,
        i_layer_type: pfd.iLayerType.0 as u8,
        b_reserved: pfd.bReserved,
        dw_layer_mask: pfd.dwLayerMask,
        dw_visible_mask: pfd.dwVisibleMask,
        dw_damage_mask: pfd.dwDamageMask,
    }
}

/// A WGL-capable device context.
///
/// Requires a current GL context on the HDC when constructed, since the
/// ARB entry points and the extension string are context-dependent.
pub struct GdiDevice {
    hdc: HDC,
    name: String,
    extensions: HashSet<String>,
    ext: WglExt,
}

impl GdiDevice {
    /// Wrap `hdc`, resolving the ARB entry points and extension set.
    ///
    /// `gl_extensions` is the GL_EXTENSIONS string of the current
    /// context (needed for GL_NV_texture_rectangle); pass "" when only
    /// WGL queries matter.
    pub fn new(hdc: HDC, name: impl Into<String>, gl_extensions: &str) -> Self {
        let mut extensions: HashSet<String> =
            gl_extensions.split_whitespace().map(str::to_string).collect();

        unsafe {
            if let Some(get_string) =
                load::<GetExtensionsStringArb>(c"wglGetExtensionsStringARB")
            {
                let raw = get_string(hdc);
                if !raw.is_null() {
                    let all = CStr::from_ptr(raw).to_string_lossy();
                    extensions.extend(all.split_whitespace().map(str::to_string));
                }
            }
        }

        let ext = WglExt {
            get_pixel_format_attribiv: unsafe {
                load::<GetPixelFormatAttribivArb>(c"wglGetPixelFormatAttribivARB")
            },
            choose_pixel_format: unsafe {
                load::<ChoosePixelFormatArb>(c"wglChoosePixelFormatARB")
            },
        };

        let device = Self {
            hdc,
            name: name.into(),
            extensions,
            ext,
        };
        debug!(
            device = device.name,
            extensions = device.extensions.len(),
            "wrapped GDI device"
        );
        device
    }
}

impl PixelFormatApi for GdiDevice {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn has_extension(&self, name: &str) -> bool {
        // The attribute entry points must actually have resolved, not
        // just be advertised.
        if name == crate::device::EXT_ARB_PIXEL_FORMAT
            && (self.ext.get_pixel_format_attribiv.is_none()
                || self.ext.choose_pixel_format.is_none())
        {
            return false;
        }
        self.extensions.contains(name)
    }

    fn describe_format(&self, id: u32, out: Option<&mut PixelFormatRecord>) -> u32 {
        let size = mem::size_of::<PIXELFORMATDESCRIPTOR>() as u32;
        unsafe {
            match out {
                None => DescribePixelFormat(self.hdc, id as i32, 0, None) as u32,
                Some(record) => {
                    let mut pfd = PIXELFORMATDESCRIPTOR::default();
                    let n =
                        DescribePixelFormat(self.hdc, id as i32, size, Some(&mut pfd as *mut _));
                    if n != 0 {
                        *record = from_native(&pfd);
                    }
                    n as u32
                }
            }
        }
    }

    fn set_format(&self, id: u32, record: &PixelFormatRecord) -> bool {
        let pfd = to_native(record);
        unsafe { SetPixelFormat(self.hdc, id as i32, &pfd).is_ok() }
    }

    fn query_attribs(&self, id: u32, keys: &[i32], out: &mut [i32]) -> bool {
        debug_assert_eq!(keys.len(), out.len());
        let Some(query) = self.ext.get_pixel_format_attribiv else {
            return false;
        };
        unsafe {
            query(
                self.hdc,
                id as i32,
                0,
                keys.len() as u32,
                keys.as_ptr(),
                out.as_mut_ptr(),
            )
            .as_bool()
        }
    }

    fn choose_formats(&self, attribs: &[i32], max: usize) -> Option<Vec<u32>> {
        let choose = self.ext.choose_pixel_format?;
        let mut formats = vec![0i32; max];
        let mut count = 0u32;
        let ok = unsafe {
            choose(
                self.hdc,
                attribs.as_ptr(),
                std::ptr::null(),
                max as u32,
                formats.as_mut_ptr(),
                &mut count,
            )
            .as_bool()
        };
        if !ok {
            return None;
        }
        formats.truncate((count as usize).min(max));
        Some(formats.into_iter().map(|id| id as u32).collect())
    }

    fn last_error(&self) -> u32 {
        unsafe { GetLastError().0 }
    }

    fn enable_blur_behind(&self) -> bool {
        let hwnd: HWND = unsafe { WindowFromDC(self.hdc) };
        if hwnd.is_invalid() {
            return false;
        }
        let blur = DWM_BLURBEHIND {
            dwFlags: DWM_BB_ENABLE,
            fEnable: BOOL(1),
            ..Default::default()
        };
        unsafe { DwmEnableBlurBehindWindow(hwnd, &blur).is_ok() }
    }
}
