//! Persisted color theme and the SET_CLR_* command family
//!
//! Every visual parameter lives in one flat [`Theme`] record so the whole
//! thing can be serialized in one piece and re-applied atomically. Colors
//! are 24-bit RGB packed into `u32`.

use crate::dispatch::{CommandHandler, Context, Outcome, UiIntent};

/// "GUI0"
pub const THEME_MAGIC: u32 = 0x4755_4930;

/// Bumped on incompatible layout changes; a stored record with a different
/// version is discarded in favor of defaults
pub const THEME_VERSION: u16 = 1;

/// Number of panels (CPU, GPU, RAM, NET)
pub const PANEL_COUNT: usize = 4;

/// All visual parameters, persisted as one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Theme {
    pub magic: u32,
    pub version: u16,

    /// Normal-mode background per panel
    pub bg: [u32; PANEL_COUNT],
    /// Screensaver background per panel
    pub ss_bg: [u32; PANEL_COUNT],

    /// Gauge track color
    pub arc_bg: u32,
    pub arc_cpu: u32,
    pub arc_gpu: u32,

    pub bar_bg: u32,
    pub bar_ram: u32,
    /// RAM bar above 70%
    pub bar_ram_warn: u32,
    /// RAM bar above 85%
    pub bar_ram_crit: u32,

    pub net_down: u32,
    pub net_up: u32,
    pub net_chart_bg: u32,
    pub net_chart_border: u32,

    /// Title label per panel
    pub text_title: [u32; PANEL_COUNT],
    pub text_value: u32,
    pub text_secondary: u32,

    /// Temperature readout: cold (<60C), warm (60-70C), hot (>70C)
    pub temp: [u32; 3],

    pub color_error: u32,
    pub color_ok: u32,
}

impl Theme {
    /// Factory defaults
    pub const fn new() -> Self {
        Self {
            magic: THEME_MAGIC,
            version: THEME_VERSION,
            bg: [0x000000; PANEL_COUNT],
            ss_bg: [0x00008B, 0x8B0000, 0x5D4037, 0x000000],
            arc_bg: 0x55555C,
            arc_cpu: 0x0071C5,
            arc_gpu: 0x76B900,
            bar_bg: 0x222222,
            bar_ram: 0x43E97B,
            bar_ram_warn: 0xFFA500,
            bar_ram_crit: 0xFF4444,
            net_down: 0x00FFFF,
            net_up: 0xFF00FF,
            net_chart_bg: 0x001428,
            net_chart_border: 0x00FFFF,
            text_title: [0x0071C5, 0x76B900, 0x888888, 0x00FFFF],
            text_value: 0xFFFFFF,
            text_secondary: 0x888888,
            temp: [0x4CAF50, 0xFF6B6B, 0xFF4444],
            color_error: 0xFF4444,
            color_ok: 0x4CAF50,
        }
    }

    /// Whether a record read back from storage has the expected layout
    pub fn is_valid(&self) -> bool {
        self.magic == THEME_MAGIC && self.version == THEME_VERSION
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

/// Handles `SET_CLR_*` and `RESET_THEME` lines.
///
/// Any recognized command claims the line even when its argument turns out
/// to be malformed; a malformed argument just changes nothing. Valid
/// changes are persisted and broadcast to the render side as one intent.
pub struct ThemeHandler {
    theme: Theme,
}

impl ThemeHandler {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }
}

impl CommandHandler for ThemeHandler {
    fn handle(&mut self, line: &str, ctx: &mut Context<'_>) -> Outcome {
        let changed = if line == "RESET_THEME" {
            self.theme = Theme::new();
            true
        } else if let Some(v) = line.strip_prefix("SET_CLR_ARC_CPU:") {
            set_color(&mut self.theme.arc_cpu, v)
        } else if let Some(v) = line.strip_prefix("SET_CLR_ARC_GPU:") {
            set_color(&mut self.theme.arc_gpu, v)
        } else if let Some(v) = line.strip_prefix("SET_CLR_ARC_BG:") {
            set_color(&mut self.theme.arc_bg, v)
        } else if let Some(v) = line.strip_prefix("SET_CLR_BAR_RAM:") {
            set_color(&mut self.theme.bar_ram, v)
        } else if let Some(v) = line.strip_prefix("SET_CLR_NET_DN:") {
            set_color(&mut self.theme.net_down, v)
        } else if let Some(v) = line.strip_prefix("SET_CLR_NET_UP:") {
            set_color(&mut self.theme.net_up, v)
        } else if let Some(v) = line.strip_prefix("SET_CLR_TXT_VAL:") {
            set_color(&mut self.theme.text_value, v)
        } else if let Some(v) = line.strip_prefix("SET_CLR_TXT_TITLE:") {
            set_indexed(&mut self.theme.text_title, v)
        } else if let Some(v) = line.strip_prefix("SET_CLR_BG_NORM:") {
            set_indexed(&mut self.theme.bg, v)
        } else if let Some(v) = line.strip_prefix("SET_CLR_BG_SS:") {
            set_indexed(&mut self.theme.ss_bg, v)
        } else if let Some(v) = line.strip_prefix("SET_CLR_TEMP:") {
            set_indexed(&mut self.theme.temp, v)
        } else {
            return Outcome::NotClaimed;
        };

        if changed {
            // Best-effort persist; the RAM copy stays authoritative
            let _ = ctx.store.save_theme(&self.theme);
            ctx.intents.publish(UiIntent::ThemeChanged(self.theme));
        }

        Outcome::Claimed
    }
}

/// `RRGGBB` with an optional `0x` prefix
fn parse_color(hex: &str) -> Option<u32> {
    let hex = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    u32::from_str_radix(hex, 16).ok()
}

fn set_color(field: &mut u32, value: &str) -> bool {
    match parse_color(value) {
        Some(color) => {
            *field = color;
            true
        }
        None => false,
    }
}

/// `<index>:RRGGBB` into one element of a color array
fn set_indexed(fields: &mut [u32], value: &str) -> bool {
    let Some((idx, hex)) = value.split_once(':') else {
        return false;
    };
    let Ok(idx) = idx.parse::<usize>() else {
        return false;
    };
    if idx >= fields.len() {
        return false;
    }
    match parse_color(hex) {
        Some(color) => {
            fields[idx] = color;
            true
        }
        None => false,
    }
}
