#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Session bootstrapping and the interactive relay loop.
//!
//! This crate holds the reproducible core of the console client: starting
//! or resuming a conversation against the relay service, streaming inbound
//! activity batches to the terminal, and relaying operator input back to
//! the bot until the exit phrase is typed.
//!
//! # Key Features
//! - `SessionBootstrapper` for the start-new and resume paths
//! - One loop, pluggable streaming transport (managed callback or raw socket)
//! - Message-kind filtered rendering with a debug alternative

mod bootstrap;
mod error;
mod manager;
mod render;
pub mod transport;

pub use bootstrap::SessionBootstrapper;
pub use error::{Error, Result};
pub use manager::{LoopConfig, RelayLoop};
pub use render::{RenderMode, Renderer};
pub use transport::{CallbackTransport, SocketTransport, Transport, TransportKind};
