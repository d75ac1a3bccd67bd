//! Client for the out-of-process design renderer.
//!
//! The renderer listens on a Unix-domain socket. Each render is one
//! connection: the client writes a JSON request, half-closes its write
//! side, and reads a JSON response carrying either an error message or a
//! base64-encoded PNG.
//!
//! - [`protocol`] holds the wire types.
//! - [`client::SocketRenderer`] implements the `Renderer` seam with bounded
//!   concurrency and a per-render timeout.
//! - [`process::RendererProcess`] supervises a locally spawned renderer.

pub mod client;
pub mod process;
pub mod protocol;

pub use client::{RendererConfig, SocketRenderer};
pub use process::{ProcessConfig, ProcessError, RendererProcess};
