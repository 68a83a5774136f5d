//! Scarab - quad-display PC monitor firmware
//!
//! Main firmware binary for RP2350-based boards driving four round
//! 240x240 panels from a single PC telemetry link. The host pushes
//! newline-delimited telemetry and commands over UART; the firmware
//! renders gauges, falls back to a screensaver when the host goes quiet,
//! and persists theme, identity and uploaded screensaver images to flash.

#![no_std]
#![no_main]

extern crate alloc;

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::block::ImageDef;
use embassy_rp::peripherals::UART0;
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_rp::watchdog::Watchdog;
use embassy_time::{Duration, Timer};
use embedded_alloc::LlffHeap as Heap;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use scarab_core::assets::LoadedImage;
use scarab_core::identity::HwIdentity;
use scarab_core::theme::Theme;
use scarab_core::traits::render::RenderSurface;
use scarab_core::traits::store::{SettingsStore, SlotStore};
use scarab_protocol::image::Slot;

use crate::channels::RENDER;
use crate::storage::FlashStore;

mod channels;
mod display;
mod storage;
mod tasks;

#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

// Heap allocator for image blobs (four resident slots plus one upload
// scratch buffer at ~169KB each in the worst case)
#[global_allocator]
static HEAP: Heap = Heap::empty();

// Heap size: 448KB of the RP2350's 520KB SRAM
const HEAP_SIZE: usize = 448 * 1024;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});

// Static cells for UART buffers (must live forever)
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 1024]> = StaticCell::new();

/// Watchdog period; the render task feeds once per second
const WATCHDOG_TIMEOUT: Duration = Duration::from_secs(5);

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Scarab firmware starting...");

    // Initialize heap allocator
    init_heap();

    // Initialize RP2350 peripherals
    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let mut store = FlashStore::new(p.FLASH, p.DMA_CH0);

    // Settings: anything missing or unreadable falls back to defaults
    let theme = match store.load_theme() {
        Ok(Some(theme)) => theme,
        Ok(None) => {
            info!("no stored theme, using defaults");
            Theme::new()
        }
        Err(e) => {
            warn!("theme record unreadable ({}), using defaults", e);
            Theme::new()
        }
    };
    let identity = match store.load_identity() {
        Ok(Some(identity)) => identity,
        Ok(None) => {
            info!("no stored identity, using placeholders");
            HwIdentity::new()
        }
        Err(e) => {
            warn!("identity record unreadable ({}), using placeholders", e);
            HwIdentity::new()
        }
    };

    // Seed the render state and preload stored slot images into RAM
    let mut slot_sizes = [None; Slot::COUNT];
    {
        let mut render = RENDER.lock().await;
        render.screens.apply_theme(&theme);
        render
            .screens
            .set_names(&identity.cpu_name, &identity.gpu_name);
        for slot in Slot::ALL {
            match store.load(slot) {
                Ok(Some(blob)) => match LoadedImage::from_blob(blob) {
                    Ok(image) => {
                        info!(
                            "slot {}: stored image loaded ({} bytes)",
                            slot.index(),
                            image.byte_size()
                        );
                        slot_sizes[slot.index()] = Some(image.header().data_size);
                        render.images.install(slot, image);
                    }
                    Err(_) => {
                        warn!("slot {}: stored blob invalid, ignoring", slot.index());
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    warn!("slot {}: unreadable ({})", slot.index(), e);
                }
            }
        }
    }

    // UART link to the host PC (default config: 115200 8N1)
    let uart_config = UartConfig::default();
    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 1024]);
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    info!("Host UART initialized");

    let mut watchdog = Watchdog::new(p.WATCHDOG);
    watchdog.start(WATCHDOG_TIMEOUT);

    spawner
        .spawn(tasks::host_rx_task(rx, store, identity, theme, slot_sizes))
        .unwrap();
    spawner.spawn(tasks::host_tx_task(tx)).unwrap();
    spawner.spawn(tasks::render_task(watchdog)).unwrap();
    spawner.spawn(tasks::gfx_tick_task()).unwrap();
    info!("All tasks spawned, firmware running");

    loop {
        Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Initialize the heap allocator
fn init_heap() {
    use core::mem::MaybeUninit;
    static mut HEAP_MEM: [MaybeUninit<u8>; HEAP_SIZE] = [MaybeUninit::uninit(); HEAP_SIZE];
    #[allow(static_mut_refs)]
    unsafe {
        HEAP.init(HEAP_MEM.as_ptr() as usize, HEAP_SIZE)
    }
}
