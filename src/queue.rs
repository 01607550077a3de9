//! Receive command and transmit response queues

use std::collections::VecDeque;

use crate::error::StreamError;
use crate::flags::StreamFlags;

/// A pending receive request queued by stream activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxCommand {
    /// `HAS_TIME` when `time_ns` is the start time
    pub flags: StreamFlags,
    pub time_ns: i64,
    /// Remaining sample periods; 0 means continuous
    pub num_elems: usize,
}

impl RxCommand {
    pub fn is_bounded(&self) -> bool {
        self.num_elems != 0
    }

    pub fn has_time(&self) -> bool {
        self.flags.contains(StreamFlags::HAS_TIME)
    }
}

/// FIFO of receive commands.
#[derive(Debug, Default)]
pub struct RxCommandQueue {
    commands: VecDeque<RxCommand>,
}

impl RxCommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: RxCommand) {
        self.commands.push_back(cmd);
    }

    pub fn front(&self) -> Option<&RxCommand> {
        self.commands.front()
    }

    pub fn front_mut(&mut self) -> Option<&mut RxCommand> {
        self.commands.front_mut()
    }

    pub fn pop(&mut self) -> Option<RxCommand> {
        self.commands.pop_front()
    }

    /// Account for `produced` periods against the front command.
    ///
    /// Bounded commands count down and are removed on reaching zero;
    /// continuous commands are left alone.
    pub fn consume(&mut self, produced: usize) {
        let exhausted = match self.commands.front_mut() {
            Some(cmd) if cmd.is_bounded() => {
                cmd.num_elems = cmd.num_elems.saturating_sub(produced);
                cmd.num_elems == 0
            }
            _ => false,
        };
        if exhausted {
            self.commands.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// An asynchronous transmit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxResponse {
    pub flags: StreamFlags,
    pub time_ns: i64,
    pub status: Result<(), StreamError>,
}

impl TxResponse {
    /// SoapySDR status code: 0 or a negative error code.
    pub fn code(&self) -> i32 {
        match self.status {
            Ok(()) => 0,
            Err(err) => err.code(),
        }
    }

    pub fn has_time(&self) -> bool {
        self.flags.contains(StreamFlags::HAS_TIME)
    }
}

/// FIFO of transmit events awaiting `read_stream_status`.
#[derive(Debug, Default)]
pub struct TxResponseQueue {
    responses: VecDeque<TxResponse>,
}

impl TxResponseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, resp: TxResponse) {
        self.responses.push_back(resp);
    }

    pub fn front(&self) -> Option<&TxResponse> {
        self.responses.front()
    }

    pub fn pop(&mut self) -> Option<TxResponse> {
        self.responses.pop_front()
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}
