//! Example: Decode the control track of a story tape
//!
//! Decodes every frame of a stereo WAV recording and prints them.
//!
//! Usage:
//!   cargo run --release --example decode_tape -- \
//!       --file story.wav -n 20
//!
//! Look up the frames shown at given playback times:
//!   cargo run --release --example decode_tape -- \
//!       --file story.wav --at 1.5 --at 30
//!
//! With CSV output and a streaming cross-check:
//!   cargo run --release --example decode_tape -- \
//!       --file story.wav \
//!       --csv-output frames.csv \
//!       --stream-buffer 1024

use clap::Parser;
use ruxpunk::{
    Analysis, ControlBlock, ControlTrackSource, DecodedFrame, Joint, OfflineAnalyzer,
    StreamingDecoder, WavFileSource,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to WAV file
    #[arg(short, long)]
    file: String,

    /// Number of frames to print (0 = all)
    #[arg(short, long, default_value = "20")]
    n: usize,

    /// Samples read per analyzer block
    #[arg(long, default_value = "8192")]
    chunk_size: usize,

    /// Playback time in seconds to look up (repeatable)
    #[arg(long)]
    at: Vec<f64>,

    /// CSV output file path (optional)
    #[arg(long)]
    csv_output: Option<String>,

    /// Re-decode with the streaming decoder using this buffer size and compare
    #[arg(long)]
    stream_buffer: Option<usize>,
}

fn write_csv(path: &str, analysis: &Analysis) -> Result<(), std::io::Error> {
    let mut writer = BufWriter::new(File::create(path)?);

    write!(writer, "Id,Sample,Time[s]")?;
    for joint in Joint::ALL {
        write!(writer, ",{}", joint.name())?;
    }
    writeln!(writer)?;

    for (id, entry) in analysis.index.frames().iter().enumerate() {
        write!(
            writer,
            "{},{},{:.6}",
            id,
            entry.sample_position,
            entry.seconds(analysis.format.sample_rate)
        )?;
        for joint in Joint::ALL {
            write!(writer, ",{}", entry.frame.joint(joint))?;
        }
        writeln!(writer)?;
    }
    writer.flush()
}

/// Feed the file through a streaming decoder in fixed buffers
fn stream_file(path: &str, buffer_size: usize) -> ruxpunk::Result<Vec<DecodedFrame>> {
    let mut source = WavFileSource::open(path)?;
    let mut block = ControlBlock::with_capacity(buffer_size);
    let mut frames = Vec::new();
    let mut decoder = StreamingDecoder::with_callback(|f| frames.push(f));
    while source.read_block(buffer_size.max(1), &mut block)? > 0 {
        decoder.feed(&block.samples);
    }
    drop(decoder);
    Ok(frames)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    info!("=== Story Tape Decode ===");
    info!("File: {}", args.file);

    let analysis = OfflineAnalyzer::new()
        .with_chunk_size(args.chunk_size)
        .analyze_file(&args.file)?;

    info!(
        "{} frames over {:.2}s ({} Hz, {} channels)",
        analysis.index.len(),
        analysis.duration(),
        analysis.format.sample_rate,
        analysis.format.channels
    );

    let limit = if args.n == 0 { usize::MAX } else { args.n };
    for (id, entry) in analysis.index.frames().iter().take(limit).enumerate() {
        info!(
            "Frame #{}: {} at t={:.6}s (pos={})",
            id,
            entry.frame,
            entry.seconds(analysis.format.sample_rate),
            entry.sample_position
        );
    }

    for time in &args.at {
        match analysis.frame_at_seconds(*time) {
            Ok(frame) => info!("At {:.3}s: {}", time, frame),
            Err(e) => warn!("At {:.3}s: {}", time, e),
        }
    }

    if let Some(csv_path) = &args.csv_output {
        info!("CSV output: {}", csv_path);
        write_csv(csv_path, &analysis)?;
    }

    if let Some(buffer_size) = args.stream_buffer {
        let streamed = stream_file(&args.file, buffer_size)?;
        let offline: Vec<DecodedFrame> = analysis.index.frames().iter().map(|e| e.frame).collect();
        if streamed == offline {
            info!(
                "Streaming decode with {}-sample buffers matches ({} frames)",
                buffer_size,
                streamed.len()
            );
        } else {
            warn!(
                "Streaming decode differs: {} streamed frames vs {} offline",
                streamed.len(),
                offline.len()
            );
        }
    }

    info!("Done!");

    Ok(())
}
