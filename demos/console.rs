//! Drive a pole display from the terminal.
//!
//! Run with:
//! ```sh
//! POLE_DISPLAY_PORT=/dev/ttyUSB0 cargo run --example console --features serial
//! ```
//!
//! Every line typed is sent as display text. Commands:
//!
//! - `:i <0-4>` set the indicator (0 Off, 1 Price, 2 Total, 3 Collect, 4 Change)
//! - `:connect` / `:disconnect`
//! - `:ports` list serial ports
//! - `:quit`

use pole_display::{ConnectionManager, DisplayConfig, Indicator, SerialTransport};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = DisplayConfig::default();
    let transport = SerialTransport::from_config(&config);
    let mut display = ConnectionManager::new(transport, config);
    let scheduler = display.scheduler();

    if let Err(e) = display.connect().await {
        eprintln!("{}", e);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            ":quit" => break,
            ":connect" => {
                if let Err(e) = display.connect().await {
                    eprintln!("{}", e);
                }
            }
            ":disconnect" => display.disconnect().await,
            ":ports" => match SerialTransport::list_ports() {
                Ok(ports) => ports.iter().for_each(|p| println!("{}", p)),
                Err(e) => eprintln!("{}", e),
            },
            cmd if cmd.starts_with(":i") => {
                let result = cmd[2..]
                    .trim()
                    .parse::<u8>()
                    .map_err(|e| pole_display::Error::Config(e.to_string()))
                    .and_then(Indicator::try_from);
                match result {
                    Ok(indicator) => {
                        let _ = scheduler.set_indicator(indicator).await;
                    }
                    Err(e) => eprintln!("{}", e),
                }
            }
            _ => {
                let _ = scheduler.set_text(line.clone());
            }
        }

        if let Some(err) = display.last_error() {
            eprintln!("Error: {}", err);
        }
    }

    display.disconnect().await;
    Ok(())
}
