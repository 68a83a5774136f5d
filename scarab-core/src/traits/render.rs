//! Render surface trait
//!
//! Abstracts the four round panels. The engine never talks to a display
//! controller directly; it pushes state changes through this trait and the
//! firmware decides how pixels get drawn.

use scarab_protocol::telemetry::TelemetryFrame;

use crate::assets::ImageTable;
use crate::theme::Theme;

/// One frame's worth of drawing across all four panels
pub trait RenderSurface {
    /// Push the latest telemetry onto the gauges.
    ///
    /// `stale` dims the panels to signal that the host has gone quiet but
    /// the values shown are the last known ones.
    fn apply_snapshot(&mut self, frame: &TelemetryFrame, stale: bool);

    /// Switch all panels to screensaver imagery
    fn enter_screensaver(&mut self, images: &ImageTable);

    /// Return all panels to live gauges
    fn exit_screensaver(&mut self);

    /// Re-color every widget from the theme
    fn apply_theme(&mut self, theme: &Theme);

    /// Update the CPU/GPU title labels
    fn set_names(&mut self, cpu: &str, gpu: &str);

    /// Advance the graphics engine clock (animations, redraw scheduling)
    fn tick(&mut self, elapsed_ms: u32);
}
