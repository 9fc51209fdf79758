//! Format selection: native choose first, enumerate-and-filter second.
//!
//! The extended protocol's choose call returns candidates in the
//! driver's own preference order, which is treated as authoritative and
//! never re-sorted here. When it fails or comes back empty, every format
//! on the device is enumerated, decoded and filtered instead. A pluggable
//! [`CapsChooser`](crate::chooser::CapsChooser) then picks exactly one
//! candidate.

use tracing::debug;

use crate::arb;
use crate::caps::{SurfaceCaps, SurfaceKind};
use crate::chooser::CapsChooser;
use crate::device::{DeviceProfile, PixelFormatApi, Protocol};
use crate::enumerate;
use crate::error::{ConfigError, ConfigResult};
use crate::pfd;

/// Outcome of a successful resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Native format handle, 1-based.
    pub format_id: u32,
    /// Exact capabilities the driver reports for that handle.
    pub caps: SurfaceCaps,
}

/// Decode a pool of format ids through the extended query, keeping the
/// given order. Formats the driver refuses to describe are skipped, not
/// fatal; the pool usually contains ids the current context cannot use.
fn decode_extended_ids<A: PixelFormatApi + ?Sized>(
    api: &A,
    profile: &DeviceProfile,
    ids: &[u32],
    permitted: SurfaceKind,
) -> Vec<(u32, SurfaceCaps)> {
    let mut out = Vec::with_capacity(ids.len());
    for &id in ids {
        if id == 0 {
            debug!(device = api.device_name(), "skipping invalid format id 0");
            continue;
        }
        match arb::query_format_caps(api, profile, id, permitted) {
            Ok(Some(caps)) => out.push((id, caps)),
            Ok(None) => {}
            Err(err) => {
                debug!(device = api.device_name(), id, %err, "skipping format");
            }
        }
    }
    out
}

/// Strategy 1: drive the native choose operation.
///
/// Encoding errors (invariant violations in the request) propagate; a
/// failed or empty choose call yields an empty list so the caller can
/// fall through to enumeration.
fn native_choose<A: PixelFormatApi + ?Sized>(
    api: &A,
    profile: &DeviceProfile,
    requested: &SurfaceCaps,
    permitted: SurfaceKind,
) -> ConfigResult<Vec<(u32, SurfaceCaps)>> {
    let (attribs, _float_mode) = arb::caps_to_attribs(requested, profile)?;
    let Some(ids) = api.choose_formats(&attribs, arb::MAX_PFORMATS) else {
        debug!(
            device = api.device_name(),
            code = api.last_error(),
            "wglChoosePixelFormatARB failed"
        );
        return Ok(Vec::new());
    };
    debug!(
        device = api.device_name(),
        candidates = ids.len(),
        "native choose"
    );
    Ok(decode_extended_ids(api, profile, &ids, permitted))
}

/// Strategy 2: enumerate every format and keep the decodable ones.
fn enumerate_and_filter<A: PixelFormatApi + ?Sized>(
    api: &A,
    profile: &DeviceProfile,
    permitted: SurfaceKind,
) -> ConfigResult<Vec<(u32, SurfaceCaps)>> {
    let count = enumerate::count_formats(api, profile.protocol)?;
    let ids = enumerate::all_format_ids(count);
    match profile.protocol {
        Protocol::Extended => Ok(decode_extended_ids(api, profile, &ids, permitted)),
        Protocol::Legacy => {
            let mut out = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(caps) = pfd::describe_caps(api, id, permitted)? {
                    out.push((id, caps));
                }
            }
            Ok(out)
        }
    }
}

/// Resolve a capability request to one concrete native format.
pub fn resolve_format<A: PixelFormatApi + ?Sized>(
    api: &A,
    requested: &SurfaceCaps,
    permitted: SurfaceKind,
    chooser: &dyn CapsChooser,
) -> ConfigResult<Selection> {
    let profile = DeviceProfile::get(api);

    let mut candidates = Vec::new();
    if profile.protocol == Protocol::Extended {
        candidates = native_choose(api, &profile, requested, permitted)?;
        if candidates.is_empty() {
            debug!(
                device = api.device_name(),
                "native choose yielded no candidates, enumerating"
            );
        }
    }
    if candidates.is_empty() {
        candidates = enumerate_and_filter(api, &profile, permitted)?;
    }

    let no_match = || ConfigError::NoAcceptableFormat {
        device: api.device_name().to_string(),
        requested: *requested,
        protocol: profile.protocol,
    };
    if candidates.is_empty() {
        return Err(no_match());
    }

    let caps_list: Vec<SurfaceCaps> = candidates.iter().map(|&(_, caps)| caps).collect();
    let index = chooser.choose(requested, &caps_list).ok_or_else(no_match)?;
    let &(format_id, caps) = candidates.get(index).ok_or_else(|| {
        ConfigError::InvalidArgument(format!(
            "chooser returned index {index} for {} candidates",
            candidates.len()
        ))
    })?;
    debug!(device = api.device_name(), format_id, %caps, "format chosen");
    Ok(Selection { format_id, caps })
}
