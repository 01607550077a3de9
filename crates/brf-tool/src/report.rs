//! Printable reports (plain text or one JSON object per line)

use std::fmt;

use bladerf_stream::{ArgInfo, ArgType, HostFormat, StreamFlags, TxResponse};
use serde::Serialize;

/// Stream capabilities
#[derive(Debug, Clone, Serialize)]
pub struct InfoReport {
    pub host_formats: Vec<String>,
    pub native_format: String,
    pub full_scale: f64,
    pub stream_args: Vec<ArgReport>,
}

/// One entry of the stream argument schema
#[derive(Debug, Clone, Serialize)]
pub struct ArgReport {
    pub key: String,
    pub value: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub units: String,
    #[serde(rename = "type")]
    pub arg_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub option_names: Vec<String>,
}

impl From<&ArgInfo> for ArgReport {
    fn from(info: &ArgInfo) -> Self {
        Self {
            key: info.key.to_string(),
            value: info.value.clone(),
            name: info.name.to_string(),
            description: info.description.to_string(),
            units: info.units.to_string(),
            arg_type: match info.arg_type {
                ArgType::Int => "int",
                ArgType::String => "string",
            }
            .to_string(),
            range: info.range.map(|(lo, hi)| [lo, hi]),
            options: info.options.iter().map(|s| s.to_string()).collect(),
            option_names: info.option_names.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl InfoReport {
    pub fn new(formats: &[HostFormat], native: (HostFormat, f64), args: &[ArgInfo]) -> Self {
        Self {
            host_formats: formats.iter().map(|f| f.name().to_string()).collect(),
            native_format: native.0.name().to_string(),
            full_scale: native.1,
            stream_args: args.iter().map(ArgReport::from).collect(),
        }
    }
}

impl fmt::Display for InfoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Host formats:  {}", self.host_formats.join(", "))?;
        writeln!(
            f,
            "Native format: {} (full scale {})",
            self.native_format, self.full_scale
        )?;
        writeln!(f, "Stream arguments:")?;
        for arg in &self.stream_args {
            write!(f, "  {:<10} = {:<10} {}", arg.key, arg.value, arg.description)?;
            if !arg.options.is_empty() {
                write!(f, " [{}]", arg.options.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Outcome of a receive capture
#[derive(Debug, Clone, Default, Serialize)]
pub struct CaptureSummary {
    pub samples: usize,
    pub chunks: usize,
    pub overflows: usize,
    pub timeouts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_time_ns: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_time_ns: Option<i64>,
}

impl fmt::Display for CaptureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} samples in {} chunks, {} overflows, {} timeouts",
            self.samples, self.chunks, self.overflows, self.timeouts
        )?;
        if let (Some(first), Some(last)) = (self.first_time_ns, self.last_time_ns) {
            write!(f, ", time {} ns .. {} ns", first, last)?;
        }
        Ok(())
    }
}

/// A transmit status event
#[derive(Debug, Clone, Serialize)]
pub struct StatusEvent {
    pub event: &'static str,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_ns: Option<i64>,
}

impl From<&TxResponse> for StatusEvent {
    fn from(resp: &TxResponse) -> Self {
        let event = match resp.status {
            Err(err) => err.name(),
            Ok(()) if resp.flags.contains(StreamFlags::END_BURST) => "END_BURST",
            Ok(()) => "OK",
        };
        Self {
            event,
            code: resp.code(),
            time_ns: resp.has_time().then_some(resp.time_ns),
        }
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<10} code {:>3}", self.event, self.code)?;
        if let Some(t) = self.time_ns {
            write!(f, " at {} ns", t)?;
        }
        Ok(())
    }
}

/// Print `report` as text, or as one line of JSON.
pub fn emit<R: Serialize + fmt::Display>(report: &R, json: bool) {
    if json {
        match serde_json::to_string(report) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!("Failed to serialize report: {}", e),
        }
    } else {
        println!("{}", report);
    }
}
