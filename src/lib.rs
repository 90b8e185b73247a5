//! # waywire-client
//!
//! Pure-Rust client runtime for the Wayland wire protocol.
//!
//! The crate speaks the protocol directly over the compositor's Unix socket,
//! without linking libwayland. It covers the runtime every generated protocol
//! binding sits on:
//!
//! - **Transport**: byte and file descriptor I/O on the socket
//! - **Codec**: message framing and argument encoding
//! - **Objects**: id allocation, proxy lifecycle and typed proxies
//! - **Queues**: ordered event delivery and the roundtrip barrier
//! - **Globals**: discovery and version-checked binding
//!
//! ## Example
//!
//! ```ignore
//! use waywire_client::wl::WlCompositor;
//! use waywire_client::{Connection, Globals};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let conn = Connection::connect_to_env().await?;
//!     let globals = Globals::init(&conn).await?;
//!
//!     let compositor: WlCompositor = globals.bind(1..=4)?;
//!     let surface = compositor.create_surface()?;
//!     surface.commit()?;
//!
//!     conn.roundtrip().await?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod connection;
pub mod error;
pub mod interface;
pub mod object;
pub mod protocol;
pub mod queue;
pub mod transport;
pub mod wl;
pub mod writer;

mod globals;

pub use connection::{Connection, ConnectionBuilder};
pub use error::{BindError, Result, WaywireError};
pub use globals::{Global, Globals};
pub use object::{DropGuard, ObjectHandle, Proxy};
pub use queue::EventQueue;
