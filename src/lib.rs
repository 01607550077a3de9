#![doc = include_str!("../readme.md")]

pub mod args;
pub mod buffer;
pub mod burst;
pub mod convert;
pub mod error;
pub mod flags;
pub mod queue;
pub mod reader;
pub mod stream;
pub mod time;

pub use args::{stream_args_info, ArgInfo, ArgType, StreamArgs, SyncParams};
pub use convert::{native_stream_format, stream_formats, HostFormat, HostSample};
pub use error::{Error, Result, StreamError};
pub use flags::StreamFlags;
pub use queue::TxResponse;
pub use reader::{AsyncRxConfig, AsyncRxSamples, RxChunk, RxSamples};
pub use stream::{ReadInfo, StreamEngine, StreamHandle};
pub use time::TimeConverter;

pub use brf_sync::{Direction, SampleFormat};
