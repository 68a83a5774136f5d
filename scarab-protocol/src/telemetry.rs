//! Telemetry frame decoding.
//!
//! A telemetry line is a comma-separated list of `KEY:VALUE` tokens:
//!
//! ```text
//! CPU:42,CPUT:55.5,GPU:31,GPUT:48.0,VRAM:4.2/12.0,RAM:12.1/32.0,NET:LAN,SPEED:1000 Mbps,DOWN:12.5,UP:1.2
//! ```
//!
//! Decoding fills a *staging* frame; the caller only replaces the shared
//! frame when enough fields were recognized, so a reader never sees a
//! partially updated frame. A value of -1 from the host means the sensor
//! could not be read.

use heapless::String;

/// Maximum length of the short network strings ("LAN", "1000 Mbps", ...)
pub const NET_STR_LEN: usize = 16;

/// Number of recognized telemetry keys
pub const FIELD_COUNT: usize = 10;

/// Minimum recognized fields for a frame to be committed (half the schema)
pub const MIN_FIELDS: usize = FIELD_COUNT / 2;

/// Substituted for a reported RAM total of ~0 so percentage math downstream
/// never divides by zero
pub const RAM_TOTAL_FALLBACK_GB: f32 = 16.0;

/// One complete set of hardware metrics from the PC client.
///
/// Committed atomically: either every recognized field of a new frame
/// becomes visible at once, or nothing changes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryFrame {
    /// CPU usage 0-100, -1 = sensor error
    pub cpu_percent: i16,
    /// CPU temperature in Celsius, -1 = sensor error
    pub cpu_temp: f32,
    /// GPU usage 0-100, -1 = sensor error
    pub gpu_percent: i16,
    /// GPU temperature in Celsius, -1 = sensor error
    pub gpu_temp: f32,
    /// VRAM used in GB
    pub vram_used: f32,
    /// VRAM total in GB
    pub vram_total: f32,
    /// RAM used in GB
    pub ram_used_gb: f32,
    /// RAM total in GB (floored to a safe default if reported as ~0)
    pub ram_total_gb: f32,
    /// Connection type: "LAN" or "WLAN"
    pub net_type: String<NET_STR_LEN>,
    /// Link speed: "1000 Mbps" etc
    pub net_speed: String<NET_STR_LEN>,
    /// Download speed in Mbps
    pub net_down_mbps: f32,
    /// Upload speed in Mbps
    pub net_up_mbps: f32,
}

impl TelemetryFrame {
    /// Zero-initialized staging frame
    pub const fn new() -> Self {
        Self {
            cpu_percent: 0,
            cpu_temp: 0.0,
            gpu_percent: 0,
            gpu_temp: 0.0,
            vram_used: 0.0,
            vram_total: 0.0,
            ram_used_gb: 0.0,
            ram_total_gb: 0.0,
            net_type: String::new(),
            net_speed: String::new(),
            net_down_mbps: 0.0,
            net_up_mbps: 0.0,
        }
    }
}

impl Default for TelemetryFrame {
    fn default() -> Self {
        Self::new()
    }
}

/// Telemetry decoding errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TelemetryError {
    /// Fewer than [`MIN_FIELDS`] keys were recognized; the frame is discarded
    Incomplete {
        /// How many keys were recognized
        recognized: usize,
    },
}

/// Decode one telemetry line into a staging frame.
///
/// Unknown keys are ignored for forward compatibility. A numeric value
/// that fails to parse leaves that field at its zero default without
/// aborting the frame. Returns the frame only if at least [`MIN_FIELDS`]
/// keys were recognized.
pub fn parse(line: &str) -> Result<TelemetryFrame, TelemetryError> {
    let mut frame = TelemetryFrame::new();
    let mut recognized = 0;

    for token in line.split(',') {
        let Some((key, value)) = token.split_once(':') else {
            continue;
        };

        match key {
            "CPU" => {
                frame.cpu_percent = value.parse().unwrap_or(0);
                recognized += 1;
            }
            "CPUT" => {
                frame.cpu_temp = value.parse().unwrap_or(0.0);
                recognized += 1;
            }
            "GPU" => {
                frame.gpu_percent = value.parse().unwrap_or(0);
                recognized += 1;
            }
            "GPUT" => {
                frame.gpu_temp = value.parse().unwrap_or(0.0);
                recognized += 1;
            }
            "VRAM" => {
                (frame.vram_used, frame.vram_total) = parse_pair(value);
                recognized += 1;
            }
            "RAM" => {
                (frame.ram_used_gb, frame.ram_total_gb) = parse_pair(value);
                if frame.ram_total_gb < 0.1 {
                    frame.ram_total_gb = RAM_TOTAL_FALLBACK_GB;
                }
                recognized += 1;
            }
            "NET" => {
                frame.net_type = truncate(value);
                recognized += 1;
            }
            "SPEED" => {
                frame.net_speed = truncate(value);
                recognized += 1;
            }
            "DOWN" => {
                frame.net_down_mbps = value.parse().unwrap_or(0.0);
                recognized += 1;
            }
            "UP" => {
                frame.net_up_mbps = value.parse().unwrap_or(0.0);
                recognized += 1;
            }
            _ => {}
        }
    }

    if recognized >= MIN_FIELDS {
        Ok(frame)
    } else {
        Err(TelemetryError::Incomplete { recognized })
    }
}

/// Decode a `used/total` value pair; either half defaults to 0 on failure
fn parse_pair(value: &str) -> (f32, f32) {
    match value.split_once('/') {
        Some((used, total)) => (used.parse().unwrap_or(0.0), total.parse().unwrap_or(0.0)),
        None => (value.parse().unwrap_or(0.0), 0.0),
    }
}

/// Copy as many whole characters as fit into a bounded string
fn truncate<const N: usize>(value: &str) -> String<N> {
    let mut out = String::new();
    for c in value.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_LINE: &str = "CPU:42,CPUT:55.5,GPU:31,GPUT:48.0,VRAM:4.2/12.0,\
                             RAM:12.1/32.0,NET:LAN,SPEED:1000 Mbps,DOWN:12.5,UP:1.2";

    #[test]
    fn test_full_frame() {
        let frame = parse(FULL_LINE).unwrap();
        assert_eq!(frame.cpu_percent, 42);
        assert_eq!(frame.cpu_temp, 55.5);
        assert_eq!(frame.gpu_percent, 31);
        assert_eq!(frame.gpu_temp, 48.0);
        assert_eq!(frame.vram_used, 4.2);
        assert_eq!(frame.vram_total, 12.0);
        assert_eq!(frame.ram_used_gb, 12.1);
        assert_eq!(frame.ram_total_gb, 32.0);
        assert_eq!(frame.net_type.as_str(), "LAN");
        assert_eq!(frame.net_speed.as_str(), "1000 Mbps");
        assert_eq!(frame.net_down_mbps, 12.5);
        assert_eq!(frame.net_up_mbps, 1.2);
    }

    #[test]
    fn test_sensor_error_sentinels_pass_through() {
        let frame = parse("CPU:-1,CPUT:-1,GPU:10,GPUT:40.0,RAM:8.0/16.0").unwrap();
        assert_eq!(frame.cpu_percent, -1);
        assert_eq!(frame.cpu_temp, -1.0);
    }

    #[test]
    fn test_below_threshold_is_rejected() {
        let err = parse("CPU:42,GPU:31").unwrap_err();
        assert_eq!(err, TelemetryError::Incomplete { recognized: 2 });
    }

    #[test]
    fn test_exactly_threshold_is_accepted() {
        assert!(parse("CPU:1,CPUT:2,GPU:3,GPUT:4,UP:5").is_ok());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let frame = parse("CPU:42,FUTURE:7,CPUT:50.0,GPU:1,GPUT:2,UP:3").unwrap();
        assert_eq!(frame.cpu_percent, 42);
    }

    #[test]
    fn test_bad_number_leaves_zero_default() {
        let frame = parse("CPU:abc,CPUT:50.0,GPU:1,GPUT:2,UP:3").unwrap();
        assert_eq!(frame.cpu_percent, 0);
        assert_eq!(frame.cpu_temp, 50.0);
    }

    #[test]
    fn test_ram_total_near_zero_gets_fallback() {
        let frame = parse("CPU:1,CPUT:2,GPU:3,GPUT:4,RAM:4.0/0.0").unwrap();
        assert_eq!(frame.ram_total_gb, RAM_TOTAL_FALLBACK_GB);
    }

    #[test]
    fn test_long_net_string_truncated() {
        let frame =
            parse("CPU:1,CPUT:2,GPU:3,GPUT:4,NET:SOME_VERY_LONG_CONNECTION_NAME").unwrap();
        assert_eq!(frame.net_type.len(), NET_STR_LEN);
    }

    #[test]
    fn test_garbage_line_rejected() {
        assert!(parse("hello world").is_err());
        assert!(parse("").is_err());
    }
}
