//! List Globals - print what the running compositor advertises.
//!
//! This example demonstrates:
//! - Connecting with the builder (or `WAYLAND_DISPLAY`/`XDG_RUNTIME_DIR`)
//! - Collecting globals with a registry roundtrip
//! - Binding a global within a version range
//!
//! # Running
//!
//! ```sh
//! cargo run --example list_globals
//! RUST_LOG=waywire::wire=trace cargo run --example list_globals   # wire dump
//! cargo run --example list_globals -- wayland-1                   # other display
//! ```

use waywire_client::wl::{ShmEvent, WlShm};
use waywire_client::{Connection, Globals, Proxy};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut builder = Connection::builder();
    if let Some(display) = std::env::args_os().nth(1) {
        builder = builder.display(display);
    }
    let conn = builder.connect().await?;

    let globals = Globals::init(&conn).await?;
    println!("{}", serde_json::to_string_pretty(&globals.list())?);

    // wl_shm announces its pixel formats right after binding
    if globals.contains("wl_shm") {
        let shm: WlShm = globals.bind(1..=1)?;
        shm.on_event(|_, _, ShmEvent::Format { format }| {
            eprintln!("wl_shm format 0x{format:08x}");
        });
        conn.roundtrip().await?;
    }

    conn.disconnect();
    Ok(())
}
