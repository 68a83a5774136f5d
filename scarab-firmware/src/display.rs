//! Render state for the four round panels
//!
//! [`Screens`] is the seam where a panel driver attaches: it implements
//! [`RenderSurface`] by tracking what each panel should currently show
//! and logging transitions. The gauge/chart drawing itself lives behind
//! this trait and is out of scope for the protocol engine.

use defmt::*;
use heapless::String;

use scarab_core::assets::ImageTable;
use scarab_core::dispatch::UiIntent;
use scarab_core::identity::NAME_LEN;
use scarab_core::theme::Theme;
use scarab_core::traits::render::RenderSurface;
use scarab_protocol::image::Slot;
use scarab_protocol::telemetry::TelemetryFrame;

/// What the panels are currently showing
pub struct Screens {
    cpu_name: String<NAME_LEN>,
    gpu_name: String<NAME_LEN>,
    theme: Theme,
    frame: TelemetryFrame,
    stale: bool,
    screensaver: bool,
    gfx_clock_ms: u64,
}

impl Screens {
    pub const fn new() -> Self {
        Self {
            cpu_name: String::new(),
            gpu_name: String::new(),
            theme: Theme::new(),
            frame: TelemetryFrame::new(),
            stale: false,
            screensaver: false,
            gfx_clock_ms: 0,
        }
    }

    pub fn screensaver_active(&self) -> bool {
        self.screensaver
    }
}

impl RenderSurface for Screens {
    fn apply_snapshot(&mut self, frame: &TelemetryFrame, stale: bool) {
        self.frame = frame.clone();
        self.stale = stale;
        debug!(
            "panels: cpu={}%/{}C gpu={}%/{}C ram={}/{}GB net dn={} up={} stale={}",
            frame.cpu_percent,
            frame.cpu_temp,
            frame.gpu_percent,
            frame.gpu_temp,
            frame.ram_used_gb,
            frame.ram_total_gb,
            frame.net_down_mbps,
            frame.net_up_mbps,
            stale
        );
    }

    fn enter_screensaver(&mut self, images: &ImageTable) {
        self.screensaver = true;
        for slot in Slot::ALL {
            if images.is_custom(slot) {
                debug!("panel {}: custom screensaver image", slot.index());
            } else {
                debug!(
                    "panel {}: built-in screensaver, bg=0x{:06X}",
                    slot.index(),
                    self.theme.ss_bg[slot.index()]
                );
            }
        }
    }

    fn exit_screensaver(&mut self) {
        self.screensaver = false;
    }

    fn apply_theme(&mut self, theme: &Theme) {
        self.theme = *theme;
        debug!("theme re-applied to all panels");
    }

    fn set_names(&mut self, cpu: &str, gpu: &str) {
        self.cpu_name.clear();
        let _ = self.cpu_name.push_str(cpu);
        self.gpu_name.clear();
        let _ = self.gpu_name.push_str(gpu);
        debug!("title labels: cpu={} gpu={}", cpu, gpu);
    }

    fn tick(&mut self, elapsed_ms: u32) {
        self.gfx_clock_ms += elapsed_ms as u64;
    }
}

/// Everything the render lock protects: panel state plus the live image
/// table
pub struct RenderState {
    pub screens: Screens,
    pub images: ImageTable,
}

impl RenderState {
    pub const fn new() -> Self {
        Self {
            screens: Screens::new(),
            images: ImageTable::new(),
        }
    }

    /// Apply one handler-published intent under the render lock
    pub fn apply_intent(&mut self, intent: UiIntent) {
        match intent {
            UiIntent::NamesChanged { cpu, gpu } => {
                self.screens.set_names(&cpu, &gpu);
            }
            UiIntent::ThemeChanged(theme) => {
                self.screens.apply_theme(&theme);
            }
            UiIntent::SlotLoaded { slot, image } => {
                info!(
                    "slot {}: new image installed ({} bytes)",
                    slot.index(),
                    image.byte_size()
                );
                self.images.install(slot, image);
                if self.screens.screensaver_active() {
                    self.screens.enter_screensaver(&self.images);
                }
            }
            UiIntent::SlotCleared(slot) => {
                info!("slot {}: image cleared", slot.index());
                self.images.clear(slot);
                if self.screens.screensaver_active() {
                    self.screens.enter_screensaver(&self.images);
                }
            }
        }
    }
}
