//! Synchronous, timestamped sample transfer interface for bladeRF transceivers.
//!
//! # Overview
//!
//! `brf-sync` describes the driver surface a streaming layer needs from a
//! bladeRF: configure a direction, enable channels, move wire-format sample
//! buffers with per-transfer [`Metadata`], and read back the hardware sample
//! clock. The surface is the [`SyncTransfer`] trait.
//!
//! [`SimTransceiver`] implements the trait in software so streaming code can
//! be exercised without hardware.
//!
//! # Sample Formats
//!
//! Wire buffers hold interleaved I/Q pairs; see [`SampleFormat`] for the
//! byte layouts and full-scale values.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use brf_sync::{ChannelLayout, Direction, MetaFlags, Metadata, SampleFormat,
//!                SimTransceiver, SyncConfig, SyncTransfer};
//!
//! let mut dev = SimTransceiver::new();
//! dev.sync_config(&SyncConfig {
//!     layout: ChannelLayout::RxX1,
//!     format: SampleFormat::Sc16Q11Meta,
//!     num_buffers: 32,
//!     buffer_size: 4096,
//!     num_transfers: 16,
//!     stream_timeout: Duration::from_secs(1),
//! })?;
//! dev.enable_module(Direction::Rx, 0, true)?;
//!
//! let mut buf = vec![0u8; SampleFormat::Sc16Q11Meta.bytes_for(1024)];
//! let mut meta = Metadata { flags: MetaFlags::RX_NOW, ..Default::default() };
//! dev.sync_rx(&mut buf, 1024, &mut meta, Duration::from_millis(100))?;
//! assert_eq!(meta.actual_count, 1024);
//! # Ok::<(), brf_sync::Error>(())
//! ```

pub mod error;
pub mod format;
pub mod meta;
pub mod sim;
pub mod sync;

pub use error::{Error, ErrorCode, Result};
pub use format::SampleFormat;
pub use meta::{MetaFlags, MetaStatus, Metadata};
pub use sim::{RxSource, SimTransceiver, TxRecord};
pub use sync::{ChannelLayout, Direction, SyncConfig, SyncTransfer, MAX_TRANSFERS};
