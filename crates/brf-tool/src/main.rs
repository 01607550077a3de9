//! Command-line front end for the bladeRF streaming engine
//!
//! Runs against the simulated transceiver from `brf-sync`.
//!
//! # Usage Examples
//!
//! ## Capabilities
//! ```bash
//! brf-tool info --json
//! ```
//!
//! ## Bounded receive to a file
//! ```bash
//! brf-tool --rate 2M rx --count 100000 --out capture.cf32
//! ```
//!
//! ## Receive through the async adapter, two channels, 8-bit wire format
//! ```bash
//! brf-tool --channels 0,1 --args "format=sc8" rx --count 50000 --out both.cs16 --host-format cs16 --stream
//! ```
//!
//! ## Tone bursts with status polling
//! ```bash
//! brf-tool -v tx --bursts 4 --burst-len 2000 --tone 100k --json
//! ```

mod report;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::str::FromStr;
use std::time::Duration;

use bladerf_stream::{
    native_stream_format, stream_args_info, stream_formats, AsyncRxConfig, AsyncRxSamples,
    HostSample, RxChunk, RxSamples, StreamArgs, StreamEngine, StreamError, StreamFlags,
};
use brf_sync::{Direction, SimTransceiver, SyncTransfer};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use num_complex::Complex;
use tracing::{debug, info, warn};

use report::{CaptureSummary, InfoReport, StatusEvent};

type BoxResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Frequency or rate in Hz (accepts k/M suffix, e.g. 2.5M)
#[derive(Debug, Clone, Copy)]
struct Hertz(f64);

impl FromStr for Hertz {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(stripped) = s.strip_suffix('M') {
            let val: f64 = stripped.trim().parse().map_err(|_| "Invalid MHz value")?;
            Ok(Hertz(val * 1_000_000.0))
        } else if let Some(stripped) = s.strip_suffix('k') {
            let val: f64 = stripped.trim().parse().map_err(|_| "Invalid kHz value")?;
            Ok(Hertz(val * 1_000.0))
        } else {
            let val: f64 = s.parse().map_err(|_| "Invalid Hz value")?;
            Ok(Hertz(val))
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HostFormatArg {
    Cf32,
    Cs16,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Timestamped bladeRF streaming against a simulated transceiver", long_about = None)]
struct Args {
    /// Verbosity level (-v=info, -vv=debug, -vvv=trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Sample rate in Hz (accepts k/M suffix)
    #[arg(short, long, default_value = "1M", value_parser = Hertz::from_str, global = true)]
    rate: Hertz,

    /// Stream arguments (e.g. "buffers=16, buflen=8192, format=sc8")
    #[arg(short, long, default_value = "", global = true)]
    args: String,

    /// Channels to stream (e.g. "0" or "0,1")
    #[arg(short, long, default_value = "0", value_delimiter = ',', global = true)]
    channels: Vec<usize>,

    /// Let the simulated clocks follow wall time
    #[arg(long, default_value_t = false, global = true)]
    realtime: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show host formats and the stream argument schema
    Info {
        /// Output as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Receive a fixed number of samples into a raw file
    Rx {
        /// Samples per channel to receive
        #[arg(short = 'n', long, default_value_t = 100_000)]
        count: usize,

        /// Output file (interleaved I/Q, channels interleaved per sample)
        #[arg(short, long)]
        out: String,

        /// Host sample format written to the file
        #[arg(long, default_value = "cf32")]
        host_format: HostFormatArg,

        /// Read through the async adapter
        #[arg(long, default_value_t = false)]
        stream: bool,

        /// Output the summary as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Transmit tone bursts and report their status events
    Tx {
        /// Number of bursts
        #[arg(long, default_value_t = 4)]
        bursts: usize,

        /// Samples per burst
        #[arg(long, default_value_t = 10_000)]
        burst_len: usize,

        /// Silence between bursts, in samples
        #[arg(long, default_value_t = 5_000)]
        gap: usize,

        /// Tone offset in Hz (accepts k/M suffix)
        #[arg(long, default_value = "100k", value_parser = Hertz::from_str, allow_hyphen_values = true)]
        tone: Hertz,

        /// Tone amplitude, 1.0 being full scale
        #[arg(long, default_value_t = 0.7)]
        amplitude: f32,

        /// Output events as JSON (one object per line)
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

/// Raw little-endian file encoding of a host sample
trait RawSample: HostSample {
    fn write_le<W: Write>(&self, out: &mut W) -> io::Result<()>;
}

impl RawSample for Complex<f32> {
    fn write_le<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.re.to_le_bytes())?;
        out.write_all(&self.im.to_le_bytes())
    }
}

impl RawSample for Complex<i16> {
    fn write_le<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_all(&self.re.to_le_bytes())?;
        out.write_all(&self.im.to_le_bytes())
    }
}

fn simulator(args: &Args) -> SimTransceiver {
    let mut sim = if args.realtime {
        SimTransceiver::free_running()
    } else {
        SimTransceiver::new()
    };
    sim.set_sample_rate(Direction::Rx, args.rate.0);
    sim.set_sample_rate(Direction::Tx, args.rate.0);
    sim
}

/// Fold one chunk into the summary and append it to `out`.
fn record_chunk<T: RawSample, W: Write>(
    chunk: &RxChunk<T>,
    summary: &mut CaptureSummary,
    out: &mut W,
) -> io::Result<()> {
    if chunk.overflow {
        summary.overflows += 1;
        warn!("overflow at {} ns", chunk.time_ns);
        return Ok(());
    }
    summary.chunks += 1;
    summary.samples += chunk.len();
    summary.first_time_ns.get_or_insert(chunk.time_ns);
    summary.last_time_ns = Some(chunk.time_ns);

    for n in 0..chunk.len() {
        for channel in &chunk.samples {
            channel[n].write_le(out)?;
        }
    }
    Ok(())
}

fn capture<T: RawSample>(args: &Args, count: usize, out: &str) -> BoxResult<CaptureSummary> {
    let stream_args: StreamArgs = args.args.parse()?;
    let mut engine = StreamEngine::new(simulator(args));
    let rx = engine.setup_stream(
        Direction::Rx,
        T::FORMAT.name(),
        &args.channels,
        &stream_args,
    )?;
    info!("RX mtu {} samples", engine.mtu(&rx));
    engine.activate_stream(&rx, StreamFlags::empty(), 0, count)?;

    let mut file = BufWriter::new(File::create(out)?);
    let mut summary = CaptureSummary::default();
    for item in RxSamples::<_, T>::new(&mut engine, &rx).with_max_timeouts(10) {
        match item {
            Ok(chunk) => record_chunk(&chunk, &mut summary, &mut file)?,
            Err(StreamError::Timeout) => summary.timeouts += 1,
            Err(e) => return Err(e.into()),
        }
    }
    file.flush()?;
    engine.close_stream(rx)?;
    Ok(summary)
}

async fn capture_async<T: RawSample>(
    args: &Args,
    count: usize,
    out: &str,
) -> BoxResult<CaptureSummary> {
    let config = AsyncRxConfig {
        channels: args.channels.clone(),
        args: args.args.parse()?,
        num_elems: count,
        ..Default::default()
    };
    let mut stream = AsyncRxSamples::<T>::new(StreamEngine::new(simulator(args)), config)?;

    let mut file = BufWriter::new(File::create(out)?);
    let mut summary = CaptureSummary::default();
    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => record_chunk(&chunk, &mut summary, &mut file)?,
            Err(StreamError::Timeout) => summary.timeouts += 1,
            Err(e) => return Err(e.into()),
        }
    }
    file.flush()?;
    Ok(summary)
}

struct BurstPlan {
    bursts: usize,
    burst_len: usize,
    gap: usize,
    tone: f64,
    amplitude: f32,
}

fn transmit(args: &Args, plan: &BurstPlan, json: bool) -> BoxResult<()> {
    let stream_args: StreamArgs = args.args.parse()?;
    let mut engine = StreamEngine::new(simulator(args));
    let tx = engine.setup_stream(Direction::Tx, "CF32", &args.channels, &stream_args)?;
    engine.activate_stream(&tx, StreamFlags::empty(), 0, 0)?;

    let rate = args.rate.0;
    let step = 2.0 * std::f64::consts::PI * plan.tone / rate;
    let tone: Vec<Complex<f32>> = (0..plan.burst_len)
        .map(|n| {
            let phase = step * n as f64;
            Complex::new(phase.cos() as f32, phase.sin() as f32) * plan.amplitude
        })
        .collect();
    let bufs: Vec<&[Complex<f32>]> = args.channels.iter().map(|_| tone.as_slice()).collect();

    // first burst 10 ms from now
    let clock = bladerf_stream::TimeConverter::new(rate);
    let now = engine.hardware_mut().timestamp(Direction::Tx)?;
    let mut start = now + clock.ns_to_ticks(10_000_000);
    let timeout = Duration::from_millis(100);

    for burst in 0..plan.bursts {
        let time_ns = clock.ticks_to_ns(start);
        let sent = engine.write_all(
            &tx,
            &bufs,
            StreamFlags::HAS_TIME | StreamFlags::END_BURST,
            time_ns,
            timeout,
        )?;
        debug!("burst {}: {} samples at {} ns", burst, sent, time_ns);
        start += (plan.burst_len + plan.gap) as u64;
    }

    let mut events = 0;
    loop {
        match engine.read_stream_status(&tx, timeout) {
            Ok(resp) => {
                events += 1;
                report::emit(&StatusEvent::from(&resp), json);
            }
            Err(StreamError::Timeout) => break,
            Err(e) => return Err(e.into()),
        }
    }
    info!("{} status events", events);

    engine.deactivate_stream(&tx, StreamFlags::empty(), 0)?;
    engine.close_stream(tx)?;
    Ok(())
}

#[tokio::main]
async fn main() -> BoxResult<()> {
    let args = Args::parse();

    // 0 = WARN (quiet), 1 = INFO, 2 = DEBUG, 3+ = TRACE
    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .try_init();

    match &args.command {
        Command::Info { json } => {
            let report = InfoReport::new(
                &stream_formats(),
                native_stream_format(),
                &stream_args_info(),
            );
            report::emit(&report, *json);
        }
        Command::Rx {
            count,
            out,
            host_format,
            stream,
            json,
        } => {
            let summary = match (host_format, stream) {
                (HostFormatArg::Cf32, false) => capture::<Complex<f32>>(&args, *count, out)?,
                (HostFormatArg::Cs16, false) => capture::<Complex<i16>>(&args, *count, out)?,
                (HostFormatArg::Cf32, true) => {
                    capture_async::<Complex<f32>>(&args, *count, out).await?
                }
                (HostFormatArg::Cs16, true) => {
                    capture_async::<Complex<i16>>(&args, *count, out).await?
                }
            };
            report::emit(&summary, *json);
        }
        Command::Tx {
            bursts,
            burst_len,
            gap,
            tone,
            amplitude,
            json,
        } => {
            let plan = BurstPlan {
                bursts: *bursts,
                burst_len: *burst_len,
                gap: *gap,
                tone: tone.0,
                amplitude: *amplitude,
            };
            transmit(&args, &plan, *json)?;
        }
    }

    Ok(())
}
