//! Stream arguments
//!
//! Options arrive as `key=value` markup (`"buffers=16, format=sc8"`) and are
//! resolved into the parameters handed to the driver. Missing, zero or
//! unparsable numbers select the automatic value.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::str::FromStr;
use std::time::Duration;

use brf_sync::{ChannelLayout, SampleFormat, SyncConfig, MAX_TRANSFERS};

use crate::error::{Error, Result};

pub const DEFAULT_NUM_BUFFERS: u32 = 32;
/// Samples per buffer
pub const DEFAULT_BUFFER_LEN: u32 = 4096;
/// Buffer lengths are rounded up to a multiple of this
pub const BUFFER_LEN_ALIGN: u32 = 1024;
/// Internal hand-off timeout given to the driver
pub const STREAM_TIMEOUT: Duration = Duration::from_secs(1);

/// Unresolved `key=value` stream options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamArgs {
    pairs: BTreeMap<String, String>,
}

impl StreamArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.pairs.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    fn int(&self, key: &str) -> i64 {
        match self.get(key) {
            None => 0,
            Some(value) => value.trim().parse().unwrap_or_else(|_| {
                tracing::warn!("ignoring stream argument {}={}", key, value);
                0
            }),
        }
    }

    /// Resolve the options into driver parameters.
    pub fn resolve(&self) -> Result<SyncParams> {
        let format = match self.get("format") {
            None => SampleFormat::default(),
            Some(name) => name
                .trim()
                .parse()
                .map_err(|_| Error::InvalidWireFormat(name.to_string()))?,
        };

        let num_buffers = match self.int("buffers") {
            n if n <= 0 => DEFAULT_NUM_BUFFERS,
            1 => 2,
            n => n.min(u32::MAX as i64) as u32,
        };

        let buffer_size = match self.int("buflen") {
            n if n <= 0 => DEFAULT_BUFFER_LEN,
            n => {
                let align = BUFFER_LEN_ALIGN as i64;
                let n = n.min(i32::MAX as i64);
                ((n + align - 1) / align * align) as u32
            }
        };

        let num_transfers = match self.int("transfers") {
            n if n <= 0 => num_buffers / 2,
            n => n.min(u32::MAX as i64) as u32,
        }
        .min(num_buffers)
        .min(MAX_TRANSFERS);

        Ok(SyncParams {
            format,
            num_buffers,
            buffer_size,
            num_transfers,
        })
    }
}

impl FromStr for StreamArgs {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let pairs = s
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| match item.split_once('=') {
                Some((k, v)) => (k.trim().to_string(), v.trim().to_string()),
                None => (item.to_string(), String::new()),
            });
        Ok(Self::from_pairs(pairs))
    }
}

/// Resolved driver parameters for one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncParams {
    pub format: SampleFormat,
    pub num_buffers: u32,
    /// Samples per buffer, a multiple of 1024
    pub buffer_size: u32,
    pub num_transfers: u32,
}

impl SyncParams {
    pub fn sync_config(&self, layout: ChannelLayout) -> SyncConfig {
        SyncConfig {
            layout,
            format: self.format,
            num_buffers: self.num_buffers,
            buffer_size: self.buffer_size,
            num_transfers: self.num_transfers,
            stream_timeout: STREAM_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgType {
    Int,
    String,
}

/// Description of one stream argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgInfo {
    pub key: &'static str,
    /// Default value
    pub value: String,
    pub name: &'static str,
    pub description: &'static str,
    pub units: &'static str,
    pub arg_type: ArgType,
    pub range: Option<(f64, f64)>,
    pub options: Vec<&'static str>,
    pub option_names: Vec<&'static str>,
}

/// Schema of the options understood by [`StreamArgs::resolve`].
pub fn stream_args_info() -> Vec<ArgInfo> {
    vec![
        ArgInfo {
            key: "buffers",
            value: DEFAULT_NUM_BUFFERS.to_string(),
            name: "Buffer Count",
            description: "Number of async USB buffers.",
            units: "buffers",
            arg_type: ArgType::Int,
            range: None,
            options: Vec::new(),
            option_names: Vec::new(),
        },
        ArgInfo {
            key: "buflen",
            value: DEFAULT_BUFFER_LEN.to_string(),
            name: "Buffer Length",
            description: "Number of bytes per USB buffer, the number must be a multiple of 1024.",
            units: "bytes",
            arg_type: ArgType::Int,
            range: None,
            options: Vec::new(),
            option_names: Vec::new(),
        },
        ArgInfo {
            key: "transfers",
            value: "0".to_string(),
            name: "Num Transfers",
            description: "Number of async USB transfers. Use 0 for automatic",
            units: "bytes",
            arg_type: ArgType::Int,
            range: Some((0.0, MAX_TRANSFERS as f64)),
            options: Vec::new(),
            option_names: Vec::new(),
        },
        ArgInfo {
            key: "format",
            value: SampleFormat::default().name().to_string(),
            name: "Sample Format",
            description: "Sample format (sc16, sc16_meta, sc8, sc8_meta, sc16_packed)",
            units: "",
            arg_type: ArgType::String,
            range: None,
            options: SampleFormat::ALL.iter().map(|f| f.name()).collect(),
            option_names: SampleFormat::ALL.iter().map(|f| f.display_name()).collect(),
        },
    ]
}
