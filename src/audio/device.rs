//! Input-device discovery, loopback classification, and rate negotiation.
//!
//! [`DeviceResolver`] enumerates the input devices of the default cpal host
//! and classifies each as a loopback candidate by case-insensitive name
//! matching against a marker set (virtual-cable driver names plus the
//! platform monitor/loopback naming conventions).  Classification is a pure
//! string heuristic — no device is opened and no audio is probed during
//! discovery.
//!
//! Rate negotiation prefers the STT target rate, falls back to the device's
//! reported default rate, and fails with [`DeviceError::Unavailable`] when
//! the device advertises support for neither.

use cpal::traits::{DeviceTrait, HostTrait};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Loopback name markers
// ---------------------------------------------------------------------------

/// Default marker substrings that identify a loopback-capable input device.
///
/// Covers the common virtual audio drivers (BlackHole on macOS, VB-Cable and
/// Voicemeeter on Windows, "Stereo Mix" style endpoints) and the PulseAudio
/// monitor-source naming used on Linux.  Matching is case-insensitive.
const DEFAULT_MARKERS: &[&str] = &[
    "blackhole",
    "black hole",
    "loopback",
    "vb-cable",
    "vb cable",
    "vb-audio",
    "vbaudio",
    "virtual cable",
    "cable",
    "stereo mix",
    "what u hear",
    "voicemeeter",
    "monitor",
    "pulse",
];

// ---------------------------------------------------------------------------
// DeviceError
// ---------------------------------------------------------------------------

/// Errors that can occur while discovering devices or negotiating a rate.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The host failed to enumerate its input devices.
    #[error("failed to enumerate audio devices: {0}")]
    Enumerate(#[from] cpal::DevicesError),

    /// A device selected earlier is no longer present at its index.
    #[error("input device {0} is no longer available")]
    NotFound(usize),

    /// The device accepts neither the target rate nor its own default rate.
    #[error("device '{name}' supports neither {target} Hz nor its default rate {default} Hz")]
    Unavailable {
        name: String,
        target: u32,
        default: u32,
    },
}

// ---------------------------------------------------------------------------
// RateRange / Device
// ---------------------------------------------------------------------------

/// An inclusive sample-rate range advertised by a device configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateRange {
    /// Lowest supported rate in Hz.
    pub min: u32,
    /// Highest supported rate in Hz.
    pub max: u32,
}

impl RateRange {
    /// Returns `true` when `rate` falls inside this range.
    pub fn contains(&self, rate: u32) -> bool {
        rate >= self.min && rate <= self.max
    }
}

/// A plain-data description of one input device, valid for the discovery
/// call that produced it.
///
/// `index` is the position within the host's input-device enumeration and is
/// what `device_index` in the configuration refers to.
#[derive(Debug, Clone)]
pub struct Device {
    /// Position in the host's input-device list.
    pub index: usize,
    /// Display name reported by the driver.
    pub name: String,
    /// Name of the platform audio API (e.g. "CoreAudio", "WASAPI", "ALSA").
    pub host: String,
    /// Interleaved channel count of the default input configuration.
    pub channels: u16,
    /// Default sample rate reported by the device, in Hz.
    pub default_sample_rate: u32,
    /// Supported rate ranges; empty when the driver did not report any.
    pub supported_rates: Vec<RateRange>,
    /// `true` when the display name matched a loopback marker.
    pub is_loopback: bool,
}

impl Device {
    /// Returns `true` when any advertised range covers `rate`.
    pub fn supports_rate(&self, rate: u32) -> bool {
        self.supported_rates.iter().any(|r| r.contains(rate))
    }
}

// ---------------------------------------------------------------------------
// DeviceResolver
// ---------------------------------------------------------------------------

/// Discovers input devices and picks the loopback source to capture from.
///
/// # Example
///
/// ```rust,no_run
/// use audio_assistant::audio::DeviceResolver;
///
/// let resolver = DeviceResolver::new();
/// let devices = resolver.discover().unwrap();
/// match resolver.select_loopback(&devices) {
///     Some(device) => println!("capturing from {}", device.name),
///     None => println!("no loopback device — install a virtual audio driver"),
/// }
/// ```
pub struct DeviceResolver {
    /// Lowercase marker substrings used for loopback classification.
    markers: Vec<String>,
}

impl DeviceResolver {
    /// Create a resolver with the built-in marker set.
    pub fn new() -> Self {
        Self::with_markers(DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect())
    }

    /// Create a resolver with a custom marker set.
    ///
    /// Markers are matched case-insensitively as substrings of the device
    /// display name.  Useful when a site-specific virtual driver is not in
    /// the default list.
    pub fn with_markers(markers: Vec<String>) -> Self {
        Self {
            markers: markers.into_iter().map(|m| m.to_lowercase()).collect(),
        }
    }

    /// Enumerate the input devices of the default host.
    ///
    /// Devices are returned in enumeration order; `Device::index` values are
    /// stable for the lifetime of the device set.  No device is opened.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Enumerate`] when the host cannot list its
    /// devices at all.  Individual devices that fail to report a default
    /// input configuration are skipped with a warning.
    pub fn discover(&self) -> Result<Vec<Device>, DeviceError> {
        let host = cpal::default_host();
        let host_name = host.id().name();

        let mut devices = Vec::new();
        for (index, device) in host.input_devices()?.enumerate() {
            let name = device.name().unwrap_or_else(|_| format!("input {index}"));

            let default = match device.default_input_config() {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("device: skipping '{name}': no default input config ({e})");
                    continue;
                }
            };

            let mut supported_rates: Vec<RateRange> = match device.supported_input_configs() {
                Ok(ranges) => ranges
                    .map(|r| RateRange {
                        min: r.min_sample_rate().0,
                        max: r.max_sample_rate().0,
                    })
                    .collect(),
                Err(e) => {
                    log::debug!("device: '{name}' did not report supported configs ({e})");
                    Vec::new()
                }
            };
            // Per-channel configs repeat the same rate ranges.
            supported_rates.sort_unstable_by_key(|r| (r.min, r.max));
            supported_rates.dedup();

            devices.push(Device {
                index,
                is_loopback: self.classify(&name),
                name,
                host: host_name.to_string(),
                channels: default.channels(),
                default_sample_rate: default.sample_rate().0,
                supported_rates,
            });
        }

        log::debug!(
            "device: discovered {} input devices on {host_name}",
            devices.len()
        );
        Ok(devices)
    }

    /// Return the first loopback candidate, or `None` when no device
    /// matched a marker.
    ///
    /// Absence of a loopback device is an expected condition, not an error;
    /// the caller decides whether to fall back to a microphone and is
    /// responsible for surfacing setup guidance.
    pub fn select_loopback<'a>(&self, devices: &'a [Device]) -> Option<&'a Device> {
        devices.iter().find(|d| d.is_loopback)
    }

    /// Negotiate a capture rate for `device`, preferring `target`.
    ///
    /// Order of preference:
    /// 1. `target`, when an advertised range covers it.
    /// 2. The device's own default rate.
    /// 3. [`DeviceError::Unavailable`].
    ///
    /// A device that advertised no ranges at all is trusted at its default
    /// rate — some drivers only reveal supported rates on open.
    pub fn negotiate_rate(&self, device: &Device, target: u32) -> Result<u32, DeviceError> {
        if device.supported_rates.is_empty() {
            log::debug!(
                "device: '{}' reported no rate ranges, trusting its default {} Hz",
                device.name,
                device.default_sample_rate
            );
            return Ok(device.default_sample_rate);
        }

        if device.supports_rate(target) {
            return Ok(target);
        }

        if device.supports_rate(device.default_sample_rate) {
            log::info!(
                "device: '{}' does not support {} Hz, using its default {} Hz",
                device.name,
                target,
                device.default_sample_rate
            );
            return Ok(device.default_sample_rate);
        }

        Err(DeviceError::Unavailable {
            name: device.name.clone(),
            target,
            default: device.default_sample_rate,
        })
    }

    /// Returns `true` when `name` contains any loopback marker.
    fn classify(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.markers.iter().any(|marker| lower.contains(marker))
    }
}

impl Default for DeviceResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-open the cpal handle for the device at `index`.
///
/// Discovery hands out plain data; the capture coordinator resolves the
/// actual handle only when a stream is about to be built.
pub(crate) fn open_input_device(index: usize) -> Result<cpal::Device, DeviceError> {
    let host = cpal::default_host();
    host.input_devices()?
        .nth(index)
        .ok_or(DeviceError::NotFound(index))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str, default_rate: u32, rates: &[(u32, u32)], loopback: bool) -> Device {
        Device {
            index: 0,
            name: name.into(),
            host: "test".into(),
            channels: 2,
            default_sample_rate: default_rate,
            supported_rates: rates
                .iter()
                .map(|&(min, max)| RateRange { min, max })
                .collect(),
            is_loopback: loopback,
        }
    }

    // ---- Classification ------------------------------------------------------

    #[test]
    fn classifies_virtual_driver_names() {
        let resolver = DeviceResolver::new();
        for name in [
            "BlackHole 2ch",
            "CABLE Output (VB-Audio Virtual Cable)",
            "Stereo Mix (Realtek Audio)",
            "Voicemeeter Out B1",
            "Monitor of Built-in Audio Analog Stereo",
            "pulse",
            "Loopback Audio",
        ] {
            assert!(resolver.classify(name), "expected loopback: {name}");
        }
    }

    #[test]
    fn classification_is_case_insensitive() {
        let resolver = DeviceResolver::new();
        assert!(resolver.classify("BLACKHOLE 16CH"));
        assert!(resolver.classify("stereo MIX"));
    }

    #[test]
    fn microphones_are_not_loopback() {
        let resolver = DeviceResolver::new();
        for name in [
            "MacBook Pro Microphone",
            "USB Audio Device",
            "Headset (WH-1000XM4)",
        ] {
            assert!(!resolver.classify(name), "unexpected loopback: {name}");
        }
    }

    #[test]
    fn custom_markers_override_defaults() {
        let resolver = DeviceResolver::with_markers(vec!["Sitecable".into()]);
        assert!(resolver.classify("SiteCable Input 1"));
        assert!(!resolver.classify("BlackHole 2ch"));
    }

    // ---- select_loopback -------------------------------------------------------

    #[test]
    fn select_loopback_returns_first_candidate() {
        let resolver = DeviceResolver::new();
        let devices = vec![
            device("Built-in Microphone", 44_100, &[], false),
            device("BlackHole 2ch", 48_000, &[], true),
            device("Loopback Audio", 48_000, &[], true),
        ];
        let selected = resolver.select_loopback(&devices).expect("candidate");
        assert_eq!(selected.name, "BlackHole 2ch");
    }

    #[test]
    fn select_loopback_none_when_absent() {
        let resolver = DeviceResolver::new();
        let devices = vec![device("Built-in Microphone", 44_100, &[], false)];
        assert!(resolver.select_loopback(&devices).is_none());
    }

    // ---- negotiate_rate ---------------------------------------------------------

    #[test]
    fn negotiate_prefers_target_rate() {
        let resolver = DeviceResolver::new();
        let d = device("BlackHole 2ch", 48_000, &[(8_000, 96_000)], true);
        assert_eq!(resolver.negotiate_rate(&d, 16_000).unwrap(), 16_000);
    }

    #[test]
    fn negotiate_falls_back_to_device_default() {
        let resolver = DeviceResolver::new();
        // Only 44.1/48 kHz supported — 16 kHz target is rejected.
        let d = device("Stereo Mix", 48_000, &[(44_100, 48_000)], true);
        assert_eq!(resolver.negotiate_rate(&d, 16_000).unwrap(), 48_000);
    }

    #[test]
    fn negotiate_fails_when_neither_rate_supported() {
        let resolver = DeviceResolver::new();
        // Device claims a default outside its own advertised ranges.
        let d = device("Broken Driver", 48_000, &[(96_000, 96_000)], false);
        let err = resolver.negotiate_rate(&d, 16_000).unwrap_err();
        assert!(matches!(err, DeviceError::Unavailable { .. }));
        assert!(err.to_string().contains("Broken Driver"));
    }

    #[test]
    fn negotiate_trusts_default_when_rates_unknown() {
        let resolver = DeviceResolver::new();
        let d = device("Opaque Device", 44_100, &[], false);
        assert_eq!(resolver.negotiate_rate(&d, 16_000).unwrap(), 44_100);
    }

    // ---- RateRange ----------------------------------------------------------

    #[test]
    fn rate_range_bounds_are_inclusive() {
        let r = RateRange {
            min: 16_000,
            max: 48_000,
        };
        assert!(r.contains(16_000));
        assert!(r.contains(48_000));
        assert!(!r.contains(15_999));
        assert!(!r.contains(48_001));
    }

    #[test]
    fn supports_rate_checks_all_ranges() {
        let d = device("X", 48_000, &[(8_000, 8_000), (44_100, 48_000)], false);
        assert!(d.supports_rate(8_000));
        assert!(d.supports_rate(44_100));
        assert!(!d.supports_rate(16_000));
    }
}
