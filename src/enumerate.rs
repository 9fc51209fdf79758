//! Candidate format enumeration for both protocols.
//!
//! Format ids are 1-based. The legacy protocol reports a dense range; the
//! extended protocol reports a count via a dedicated attribute query.

use tracing::warn;

use crate::arb::WGL_NUMBER_PIXEL_FORMATS_ARB;
use crate::device::{PixelFormatApi, Protocol};
use crate::error::{ConfigError, ConfigResult};

/// Count the formats a device exposes under `protocol`.
///
/// Legacy counting fails hard on a zero result; under the extended
/// protocol an empty device is a legitimate outcome, reported as `Ok(0)`
/// with a diagnostic.
pub fn count_formats<A: PixelFormatApi + ?Sized>(
    api: &A,
    protocol: Protocol,
) -> ConfigResult<u32> {
    match protocol {
        Protocol::Legacy => {
            let n = api.describe_format(1, None);
            if n == 0 {
                return Err(ConfigError::NativeCallFailure {
                    call: "DescribePixelFormat",
                    code: api.last_error(),
                });
            }
            Ok(n)
        }
        Protocol::Extended => {
            // The format id argument is ignored for this key, but some
            // drivers reject id 0; always pass 1.
            let keys = [WGL_NUMBER_PIXEL_FORMATS_ARB];
            let mut values = [0i32];
            if !api.query_attribs(1, &keys, &mut values) {
                warn!(
                    device = api.device_name(),
                    code = api.last_error(),
                    "format count query failed"
                );
                return Ok(0);
            }
            let n = values[0].max(0) as u32;
            if n == 0 {
                warn!(device = api.device_name(), "device reports no pixel formats");
            }
            Ok(n)
        }
    }
}

/// List all candidate format ids given a count: the dense range `1..=n`.
pub fn all_format_ids(n: u32) -> Vec<u32> {
    (1..=n).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeDevice, FakeFormat};

    #[test]
    fn test_legacy_count_matches_format_table() {
        let dev = FakeDevice::new("enum-legacy")
            .with_format(FakeFormat::window_rgb888(1))
            .with_format(FakeFormat::window_rgb888(2))
            .with_format(FakeFormat::window_rgb888(3));
        assert_eq!(count_formats(&dev, Protocol::Legacy).unwrap(), 3);
    }

    #[test]
    fn test_legacy_count_zero_is_error() {
        let dev = FakeDevice::new("enum-legacy-empty");
        let err = count_formats(&dev, Protocol::Legacy).unwrap_err();
        assert!(matches!(err, ConfigError::NativeCallFailure { .. }));
    }

    #[test]
    fn test_extended_count_zero_is_empty_not_error() {
        let dev = FakeDevice::new("enum-ext-empty")
            .with_extensions(&[crate::device::EXT_ARB_PIXEL_FORMAT]);
        assert_eq!(count_formats(&dev, Protocol::Extended).unwrap(), 0);
    }

    #[test]
    fn test_extended_count_reads_number_formats_key() {
        let dev = FakeDevice::new("enum-ext")
            .with_extensions(&[crate::device::EXT_ARB_PIXEL_FORMAT])
            .with_format(FakeFormat::window_rgb888(1))
            .with_format(FakeFormat::window_rgb888(2));
        assert_eq!(count_formats(&dev, Protocol::Extended).unwrap(), 2);
    }

    #[test]
    fn test_all_ids_are_one_based_dense() {
        assert_eq!(all_format_ids(4), vec![1, 2, 3, 4]);
        assert!(all_format_ids(0).is_empty());
    }
}
