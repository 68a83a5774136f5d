//! Host TX task: drains the response channel onto the UART
//!
//! The only writer of the transmit half, so response lines from any
//! handler come out whole, one per line.

use defmt::*;
use embassy_rp::uart::BufferedUartTx;
use embedded_io_async::Write;

use crate::channels::RESPONSES;

#[embassy_executor::task]
pub async fn host_tx_task(mut tx: BufferedUartTx) {
    info!("Host TX task started");

    loop {
        let line = RESPONSES.receive().await;
        if let Err(e) = tx.write_all(line.as_bytes()).await {
            warn!("host UART write error: {}", e);
            continue;
        }
        if let Err(e) = tx.write_all(b"\n").await {
            warn!("host UART write error: {}", e);
        }
    }
}
