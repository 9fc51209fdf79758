//! Graphics configuration: binds a device to a (requested, chosen)
//! capability pair and a resolved native format.
//!
//! Lifecycle is a one-way state machine:
//!
//! ```text
//! Unresolved --resolve--> Determined --commit--> Committed
//! ```
//!
//! Resolution has no native side effect; commit applies the format to the
//! device's live surface. Configurations describing externally created
//! surfaces are born Determined and may never be committed. A committed
//! configuration cannot be re-resolved; discard and recreate it instead.
//!
//! Instances are not safe for concurrent mutation; read-only access is
//! fine once the configuration has stabilized at Committed.

use tracing::{debug, warn};

use crate::arb;
use crate::caps::{SurfaceCaps, SurfaceKind};
use crate::chooser::CapsChooser;
use crate::device::{DeviceProfile, PixelFormatApi, Protocol};
use crate::error::{ConfigError, ConfigResult};
use crate::pfd;
use crate::select::{self, Selection};

/// A per-surface pixel format configuration.
#[derive(Debug, Clone)]
pub struct GraphicsConfig {
    device: String,
    requested: SurfaceCaps,
    chosen: SurfaceCaps,
    permitted: SurfaceKind,
    format_id: u32,
    determined: bool,
    external: bool,
    committed: bool,
}

impl GraphicsConfig {
    /// Create an unresolved configuration for a surface this engine will
    /// format itself. `chosen` starts as a copy of the request until
    /// resolution replaces it with the driver's exact values.
    pub fn new(device: impl Into<String>, requested: SurfaceCaps, permitted: SurfaceKind) -> Self {
        Self {
            device: device.into(),
            requested,
            chosen: requested,
            permitted,
            format_id: 0,
            determined: false,
            external: false,
            committed: false,
        }
    }

    /// Describe an externally created surface's already-set format.
    ///
    /// The resulting configuration is Determined and permanently
    /// external: its surface format must never be modified by this
    /// engine, so [`commit`](Self::commit) always fails on it.
    pub fn from_external<A: PixelFormatApi + ?Sized>(
        api: &A,
        format_id: u32,
    ) -> ConfigResult<Self> {
        if format_id == 0 {
            return Err(ConfigError::InvalidArgument(format!(
                "invalid pixel format id {format_id}"
            )));
        }
        let profile = DeviceProfile::get(api);
        let caps = match profile.protocol {
            Protocol::Extended => {
                arb::query_format_caps(api, &profile, format_id, SurfaceKind::all())?
            }
            Protocol::Legacy => pfd::describe_caps(api, format_id, SurfaceKind::all())?,
        };
        let caps = caps.ok_or_else(|| ConfigError::NoAcceptableFormat {
            device: api.device_name().to_string(),
            requested: SurfaceCaps::default(),
            protocol: profile.protocol,
        })?;
        debug!(
            device = api.device_name(),
            format_id, %caps, "described external format"
        );
        Ok(Self {
            device: api.device_name().to_string(),
            requested: caps,
            chosen: caps,
            permitted: SurfaceKind::all(),
            format_id,
            determined: true,
            external: true,
            committed: false,
        })
    }

    /// Resolve the requested capabilities to a concrete native format.
    ///
    /// Pre-selection only: no native side effect. Idempotent for a
    /// deterministic chooser. Forbidden on external configurations and
    /// after commit.
    pub fn resolve<A: PixelFormatApi + ?Sized>(
        &mut self,
        api: &A,
        chooser: &dyn CapsChooser,
    ) -> ConfigResult<(u32, SurfaceCaps)> {
        if self.external {
            return Err(ConfigError::ProtocolMismatch(
                "cannot re-resolve an external configuration".into(),
            ));
        }
        if self.committed {
            return Err(ConfigError::ProtocolMismatch(
                "cannot re-resolve a committed configuration, discard and recreate it".into(),
            ));
        }
        let Selection { format_id, caps } =
            select::resolve_format(api, &self.requested, self.permitted, chooser)?;
        self.format_id = format_id;
        self.chosen = caps;
        self.determined = true;
        Ok((format_id, caps))
    }

    /// Apply the chosen format to the device's live surface.
    ///
    /// Requires a determined, non-external configuration. Re-committing
    /// the same handle is a no-op. On native failure the configuration
    /// stays Determined so the caller can inspect and retry or abandon.
    pub fn commit<A: PixelFormatApi + ?Sized>(&mut self, api: &A) -> ConfigResult<()> {
        if self.external {
            return Err(ConfigError::ProtocolMismatch(
                "external surface formats must not be modified".into(),
            ));
        }
        if !self.determined {
            return Err(ConfigError::ProtocolMismatch(
                "cannot commit an undetermined configuration".into(),
            ));
        }
        if self.committed {
            return Ok(());
        }

        let mut record = pfd::PixelFormatRecord::new();
        if api.describe_format(self.format_id, Some(&mut record)) == 0 {
            // Non-displayable formats carry no legacy record; fall back
            // to the encoded request so SetPixelFormat still gets one.
            record = pfd::caps_to_record(&self.chosen)?;
        }
        if !api.set_format(self.format_id, &record) {
            return Err(ConfigError::NativeCallFailure {
                call: "SetPixelFormat",
                code: api.last_error(),
            });
        }
        if !self.chosen.background_opaque {
            // Best effort; translucency failing is not a commit failure.
            if !api.enable_blur_behind() {
                warn!(
                    device = self.device,
                    format_id = self.format_id,
                    "could not enable blur-behind translucency"
                );
            }
        }
        debug!(
            device = self.device,
            format_id = self.format_id,
            "pixel format committed"
        );
        self.committed = true;
        Ok(())
    }

    /// True once a format id and chosen capabilities are known.
    pub fn is_determined(&self) -> bool {
        self.determined
    }

    /// True for configurations describing surfaces this engine did not
    /// create and must not reformat.
    pub fn is_external(&self) -> bool {
        self.external
    }

    /// True once the format has been applied to a live surface.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// The chosen native format handle, or 0 while unresolved.
    pub fn format_id(&self) -> u32 {
        if self.determined {
            self.format_id
        } else {
            0
        }
    }

    /// The application's original request. Never mutated.
    pub fn requested(&self) -> &SurfaceCaps {
        &self.requested
    }

    /// The driver-resolved capabilities; equals the request until the
    /// configuration is determined.
    pub fn chosen(&self) -> &SurfaceCaps {
        &self.chosen
    }

    pub fn device_name(&self) -> &str {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chooser::FirstMatch;
    use crate::device::EXT_ARB_PIXEL_FORMAT;
    use crate::testutil::{FakeDevice, FakeFormat};

    fn window_device(name: &str) -> FakeDevice {
        FakeDevice::new(name)
            .with_extensions(&[EXT_ARB_PIXEL_FORMAT])
            .with_format(FakeFormat::window_rgb888(1))
            .with_format(FakeFormat::window_rgb888(2).with_depth(16))
    }

    fn unresolved(device: &str) -> GraphicsConfig {
        GraphicsConfig::new(device, SurfaceCaps::window_default(), SurfaceKind::WINDOW)
    }

    #[test]
    fn test_new_configuration_is_unresolved() {
        let config = unresolved("config-new");
        assert!(!config.is_determined());
        assert!(!config.is_external());
        assert!(!config.is_committed());
        assert_eq!(config.format_id(), 0);
        assert_eq!(config.chosen(), config.requested());
    }

    #[test]
    fn test_resolve_determines_without_side_effect() {
        let dev = window_device("config-resolve");
        let mut config = unresolved("config-resolve");
        let (id, caps) = config.resolve(&dev, &FirstMatch).unwrap();
        assert!(id > 0);
        assert!(config.is_determined());
        assert!(!config.is_committed());
        assert_eq!(config.format_id(), id);
        assert_eq!(*config.chosen(), caps);
        // No SetPixelFormat yet.
        assert_eq!(dev.committed_format(), None);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let dev = window_device("config-idempotent");
        let mut config = unresolved("config-idempotent");
        let first = config.resolve(&dev, &FirstMatch).unwrap();
        let second = config.resolve(&dev, &FirstMatch).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_commit_applies_format() {
        let dev = window_device("config-commit");
        let mut config = unresolved("config-commit");
        let (id, _) = config.resolve(&dev, &FirstMatch).unwrap();
        config.commit(&dev).unwrap();
        assert!(config.is_committed());
        assert_eq!(dev.committed_format(), Some(id));
        assert!(!dev.blur_requested());
    }

    #[test]
    fn test_commit_requires_determined() {
        let dev = window_device("config-undetermined");
        let mut config = unresolved("config-undetermined");
        let err = config.commit(&dev).unwrap_err();
        assert!(matches!(err, ConfigError::ProtocolMismatch(_)));
    }

    #[test]
    fn test_commit_failure_stays_determined() {
        let mut dev = window_device("config-commit-fail");
        dev.fail_set_format = true;
        let mut config = unresolved("config-commit-fail");
        config.resolve(&dev, &FirstMatch).unwrap();
        let err = config.commit(&dev).unwrap_err();
        assert!(matches!(err, ConfigError::NativeCallFailure { .. }));
        assert!(config.is_determined());
        assert!(!config.is_committed());
    }

    #[test]
    fn test_recommit_is_noop() {
        let dev = window_device("config-recommit");
        let mut config = unresolved("config-recommit");
        config.resolve(&dev, &FirstMatch).unwrap();
        config.commit(&dev).unwrap();
        config.commit(&dev).unwrap();
        assert!(config.is_committed());
    }

    #[test]
    fn test_resolve_after_commit_is_rejected() {
        let dev = window_device("config-reresolve");
        let mut config = unresolved("config-reresolve");
        config.resolve(&dev, &FirstMatch).unwrap();
        config.commit(&dev).unwrap();
        let err = config.resolve(&dev, &FirstMatch).unwrap_err();
        assert!(matches!(err, ConfigError::ProtocolMismatch(_)));
    }

    #[test]
    fn test_external_is_determined_and_never_committable() {
        let dev = window_device("config-external");
        let config = GraphicsConfig::from_external(&dev, 1).unwrap();
        assert!(config.is_determined());
        assert!(config.is_external());
        assert_eq!(config.format_id(), 1);
        assert_eq!(config.chosen().depth_bits, 24);

        let mut config = config;
        let err = config.commit(&dev).unwrap_err();
        assert!(matches!(err, ConfigError::ProtocolMismatch(_)));
        assert_eq!(dev.committed_format(), None);
    }

    #[test]
    fn test_external_rejects_zero_id() {
        let dev = window_device("config-external-zero");
        let err = GraphicsConfig::from_external(&dev, 0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidArgument(_)));
    }

    #[test]
    fn test_external_undecodable_format_is_error() {
        let dev = window_device("config-external-bad");
        let err = GraphicsConfig::from_external(&dev, 99).unwrap_err();
        assert!(matches!(err, ConfigError::NativeCallFailure { .. }));
    }

    #[test]
    fn test_commit_translucent_format_requests_blur() {
        let mut requested = SurfaceCaps::window_default();
        requested.background_opaque = false;
        let dev = window_device("config-blur");
        let mut config = GraphicsConfig::new("config-blur", requested, SurfaceKind::WINDOW);
        config.resolve(&dev, &FirstMatch).unwrap();
        // The fake reports every format as opaque-capable; force the
        // translucency request through the chosen caps.
        config.chosen.background_opaque = false;
        config.commit(&dev).unwrap();
        assert!(dev.blur_requested());
    }
}
