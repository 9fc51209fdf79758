//! Scripted device double for unit tests.
//!
//! `FakeDevice` implements [`PixelFormatApi`] over an in-memory format
//! table, so the codec, enumerator, selector and configuration state
//! machine can be exercised without a live driver.
//!
//! The device profile cache is keyed by device name and lives for the
//! whole process; every test must therefore use a unique device name.

use std::cell::Cell;
use std::collections::HashMap;

use crate::arb::*;
use crate::caps::{Acceleration, SurfaceCaps, SurfaceKind};
use crate::device::PixelFormatApi;
use crate::pfd::{caps_to_record, PixelFormatRecord};

/// How the fake answers the native choose call.
#[derive(Debug, Clone)]
pub enum ChooseBehavior {
    /// The call itself fails.
    Unsupported,
    /// The call succeeds with zero candidates.
    Empty,
    /// Fixed id list, returned verbatim (driver preference order).
    Ids(Vec<u32>),
    /// Filter the format table by the requested attributes: bit counts
    /// are minimums, booleans and enums are exact, per the WGL rules.
    Matching,
}

/// One entry in the fake device's format table.
#[derive(Debug, Clone)]
pub struct FakeFormat {
    pub id: u32,
    pub attribs: HashMap<i32, i32>,
    pub record: PixelFormatRecord,
    /// Whether the legacy describe call succeeds for this id.
    pub displayable: bool,
}

fn attribs_from_caps(caps: &SurfaceCaps) -> HashMap<i32, i32> {
    let mut map = HashMap::new();
    map.insert(WGL_SUPPORT_OPENGL_ARB, GL_TRUE);
    map.insert(
        WGL_DRAW_TO_WINDOW_ARB,
        (caps.is_onscreen() || caps.is_fbo()) as i32,
    );
    map.insert(WGL_DRAW_TO_BITMAP_ARB, caps.is_bitmap() as i32);
    map.insert(WGL_DRAW_TO_PBUFFER_ARB, caps.is_pbuffer() as i32);
    map.insert(
        WGL_ACCELERATION_ARB,
        match caps.acceleration {
            Acceleration::Software => WGL_NO_ACCELERATION_ARB,
            _ => WGL_FULL_ACCELERATION_ARB,
        },
    );
    map.insert(WGL_DOUBLE_BUFFER_ARB, caps.double_buffered as i32);
    map.insert(WGL_STEREO_ARB, caps.stereo as i32);
    map.insert(WGL_PIXEL_TYPE_ARB, WGL_TYPE_RGBA_ARB);
    map.insert(WGL_RED_BITS_ARB, caps.red_bits as i32);
    map.insert(WGL_GREEN_BITS_ARB, caps.green_bits as i32);
    map.insert(WGL_BLUE_BITS_ARB, caps.blue_bits as i32);
    map.insert(WGL_ALPHA_BITS_ARB, caps.alpha_bits as i32);
    map.insert(WGL_DEPTH_BITS_ARB, caps.depth_bits as i32);
    map.insert(WGL_STENCIL_BITS_ARB, caps.stencil_bits as i32);
    map.insert(WGL_ACCUM_RED_BITS_ARB, caps.accum_red_bits as i32);
    map.insert(WGL_ACCUM_GREEN_BITS_ARB, caps.accum_green_bits as i32);
    map.insert(WGL_ACCUM_BLUE_BITS_ARB, caps.accum_blue_bits as i32);
    map.insert(WGL_ACCUM_ALPHA_BITS_ARB, caps.accum_alpha_bits as i32);
    map.insert(WGL_SAMPLE_BUFFERS_ARB, caps.sample_buffers as i32);
    map.insert(WGL_SAMPLES_ARB, caps.samples as i32);
    map.insert(WGL_FLOAT_COMPONENTS_NV, caps.pbuffer_float as i32);
    map
}

impl FakeFormat {
    /// Build a format whose record and attributes both reflect `caps`.
    pub fn from_caps(id: u32, caps: &SurfaceCaps) -> Self {
        let record = caps_to_record(caps).expect("fixture caps must encode");
        Self {
            id,
            attribs: attribs_from_caps(caps),
            record,
            displayable: true,
        }
    }

    /// Accelerated double-buffered window format, RGBA 8/8/8/8, depth 24,
    /// stencil 8.
    pub fn window_rgb888(id: u32) -> Self {
        Self::from_caps(
            id,
            &SurfaceCaps {
                acceleration: Acceleration::Accelerated,
                ..SurfaceCaps::window_default()
            },
        )
    }

    /// Pbuffer-only format: extended attributes advertise the pbuffer
    /// target and the legacy describe fails.
    pub fn pbuffer_only(id: u32, caps: &SurfaceCaps) -> Self {
        let mut caps = *caps;
        caps.kinds = SurfaceKind::PBUFFER;
        let mut format = Self {
            id,
            attribs: attribs_from_caps(&caps),
            record: PixelFormatRecord::new(),
            displayable: false,
        };
        format.attribs.insert(WGL_DRAW_TO_WINDOW_ARB, GL_FALSE);
        format
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.attribs.insert(WGL_DEPTH_BITS_ARB, depth as i32);
        self.record.c_depth_bits = depth as u8;
        self
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.attribs
            .insert(WGL_SAMPLE_BUFFERS_ARB, (samples > 0) as i32);
        self.attribs.insert(WGL_SAMPLES_ARB, samples as i32);
        self
    }
}

/// In-memory [`PixelFormatApi`] implementation.
pub struct FakeDevice {
    pub name: String,
    pub extensions: Vec<&'static str>,
    pub formats: Vec<FakeFormat>,
    pub choose: ChooseBehavior,
    pub error_code: u32,
    pub fail_set_format: bool,
    committed: Cell<Option<u32>>,
    blur_requested: Cell<bool>,
}

impl FakeDevice {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            extensions: Vec::new(),
            formats: Vec::new(),
            choose: ChooseBehavior::Matching,
            error_code: 6, // ERROR_INVALID_HANDLE, an arbitrary nonzero code
            fail_set_format: false,
            committed: Cell::new(None),
            blur_requested: Cell::new(false),
        }
    }

    pub fn with_extensions(mut self, extensions: &[&'static str]) -> Self {
        self.extensions.extend_from_slice(extensions);
        self
    }

    pub fn with_format(mut self, format: FakeFormat) -> Self {
        self.formats.push(format);
        self
    }

    pub fn with_choose(mut self, choose: ChooseBehavior) -> Self {
        self.choose = choose;
        self
    }

    pub fn committed_format(&self) -> Option<u32> {
        self.committed.get()
    }

    pub fn blur_requested(&self) -> bool {
        self.blur_requested.get()
    }

    fn format(&self, id: u32) -> Option<&FakeFormat> {
        self.formats.iter().find(|f| f.id == id)
    }

    fn has_arb(&self) -> bool {
        self.extensions.contains(&crate::device::EXT_ARB_PIXEL_FORMAT)
    }

    fn satisfies(&self, format: &FakeFormat, attribs: &[i32]) -> bool {
        let mut i = 0;
        while i + 1 < attribs.len() && attribs[i] != 0 {
            let (key, requested) = (attribs[i], attribs[i + 1]);
            let actual = if key == WGL_ACCUM_BITS_ARB {
                // Fixtures store accumulation per channel only.
                [
                    WGL_ACCUM_RED_BITS_ARB,
                    WGL_ACCUM_GREEN_BITS_ARB,
                    WGL_ACCUM_BLUE_BITS_ARB,
                    WGL_ACCUM_ALPHA_BITS_ARB,
                ]
                .iter()
                .map(|k| format.attribs.get(k).copied().unwrap_or(0))
                .sum()
            } else {
                format.attribs.get(&key).copied().unwrap_or(0)
            };
            let ok = match key {
                // Bit counts are minimums.
                WGL_RED_BITS_ARB | WGL_GREEN_BITS_ARB | WGL_BLUE_BITS_ARB
                | WGL_ALPHA_BITS_ARB | WGL_DEPTH_BITS_ARB | WGL_STENCIL_BITS_ARB
                | WGL_ACCUM_BITS_ARB | WGL_ACCUM_RED_BITS_ARB | WGL_ACCUM_GREEN_BITS_ARB
                | WGL_ACCUM_BLUE_BITS_ARB | WGL_ACCUM_ALPHA_BITS_ARB | WGL_SAMPLES_ARB => {
                    actual >= requested
                }
                // Everything else matches exactly.
                _ => actual == requested,
            };
            if !ok {
                return false;
            }
            i += 2;
        }
        true
    }
}

impl PixelFormatApi for FakeDevice {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn has_extension(&self, name: &str) -> bool {
        self.extensions.contains(&name)
    }

    fn describe_format(&self, id: u32, out: Option<&mut PixelFormatRecord>) -> u32 {
        if self.formats.is_empty() {
            return 0;
        }
        let count = self.formats.len() as u32;
        match out {
            None => count,
            Some(record) => match self.format(id) {
                Some(format) if format.displayable => {
                    *record = format.record;
                    count
                }
                _ => 0,
            },
        }
    }

    fn set_format(&self, id: u32, _record: &PixelFormatRecord) -> bool {
        if self.fail_set_format {
            return false;
        }
        self.committed.set(Some(id));
        true
    }

    fn query_attribs(&self, id: u32, keys: &[i32], out: &mut [i32]) -> bool {
        if !self.has_arb() {
            return false;
        }
        if keys == [WGL_NUMBER_PIXEL_FORMATS_ARB] {
            out[0] = self.formats.len() as i32;
            return true;
        }
        let Some(format) = self.format(id) else {
            return false;
        };
        for (slot, key) in out.iter_mut().zip(keys) {
            *slot = *format.attribs.get(key).unwrap_or(&0);
        }
        true
    }

    fn choose_formats(&self, attribs: &[i32], max: usize) -> Option<Vec<u32>> {
        if !self.has_arb() {
            return None;
        }
        match &self.choose {
            ChooseBehavior::Unsupported => None,
            ChooseBehavior::Empty => Some(Vec::new()),
            ChooseBehavior::Ids(ids) => Some(ids.iter().copied().take(max).collect()),
            ChooseBehavior::Matching => Some(
                self.formats
                    .iter()
                    .filter(|f| self.satisfies(f, attribs))
                    .map(|f| f.id)
                    .take(max)
                    .collect(),
            ),
        }
    }

    fn last_error(&self) -> u32 {
        self.error_code
    }

    fn enable_blur_behind(&self) -> bool {
        self.blur_requested.set(true);
        true
    }
}
