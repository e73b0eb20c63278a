//! Example: Simulated live playback
//!
//! Plays a story tape through a streaming decoder the way an audio tap
//! would (fixed buffers at the recording's sample rate) while the full
//! recording is analyzed in the background. Once the analysis is published,
//! each live frame is checked against the indexed frame with the same
//! ordinal.
//!
//! Usage:
//!   cargo run --release --example live_tap -- \
//!       --file story.wav --buffer-size 1024 --speed 4

use clap::Parser;
use ruxpunk::{
    AnalysisWorker, ControlBlock, ControlTrackSource, StreamingDecoder, WavFileSource,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to WAV file
    #[arg(short, long)]
    file: String,

    /// Samples per tap buffer
    #[arg(long, default_value = "1024")]
    buffer_size: usize,

    /// Playback speed multiplier (0 = as fast as possible)
    #[arg(long, default_value = "1.0")]
    speed: f64,

    /// Capacity of the frame channel between the tap and the consumer
    #[arg(long, default_value = "256")]
    queue: usize,
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
    let buffer_size = args.buffer_size.max(1);

    info!("=== Live Tap Simulation ===");
    info!("File: {}", args.file);

    let mut worker = AnalysisWorker::new();
    worker.load(&args.file)?;

    let mut source = WavFileSource::open(&args.file)?;
    let sample_rate = source.sample_rate();
    let buffer_period = if args.speed > 0.0 && sample_rate > 0 {
        Duration::from_secs_f64(buffer_size as f64 / sample_rate as f64 / args.speed)
    } else {
        Duration::ZERO
    };

    let (mut decoder, frames) = StreamingDecoder::forwarding(args.queue);
    let dropped = decoder.sink().dropped_counter();
    let playhead = Arc::new(AtomicU64::new(0));

    // Audio thread: feed fixed buffers at the playback rate
    let tap_playhead = Arc::clone(&playhead);
    let tap = std::thread::Builder::new()
        .name("audio_tap".to_string())
        .spawn(move || -> ruxpunk::Result<u64> {
            let mut block = ControlBlock::with_capacity(buffer_size);
            while source.read_block(buffer_size, &mut block)? > 0 {
                decoder.feed(&block.samples);
                tap_playhead.store(decoder.samples_fed(), Ordering::Release);
                if !buffer_period.is_zero() {
                    std::thread::sleep(buffer_period);
                }
            }
            Ok(decoder.samples_fed())
        })?;

    let mut received: u64 = 0;
    let mut mismatches: u64 = 0;
    let mut checked: u64 = 0;
    for frame in frames.iter() {
        received += 1;

        if worker.latest().is_none()
            && let Some(result) = worker.poll()
        {
            match result {
                Ok(analysis) => info!(
                    "Background analysis ready: {} frames, {:.2}s",
                    analysis.index.len(),
                    analysis.duration()
                ),
                Err(e) => warn!("Background analysis failed: {}", e),
            }
        }

        let position = playhead.load(Ordering::Acquire);
        let seconds = position as f64 / sample_rate.max(1) as f64;
        debug!("Live frame #{} near {:.3}s: {}", received, seconds, frame);

        // Frames arrive in decode order, so the n-th live frame is the n-th
        // indexed frame until the queue drops one
        if dropped.load(Ordering::Relaxed) == 0
            && let Some(analysis) = worker.latest()
        {
            let ordinal = (received - 1) as usize;
            checked += 1;
            match analysis.index.frames().get(ordinal) {
                Some(entry) if entry.frame == frame => {}
                Some(entry) => {
                    mismatches += 1;
                    debug!(
                        "Index shows {} at {:.3}s, live shows {}",
                        entry.frame,
                        entry.seconds(sample_rate),
                        frame
                    );
                }
                None => {
                    mismatches += 1;
                    warn!("Live frame #{} is past the end of the index", received);
                }
            }
        }
    }

    let samples = match tap.join() {
        Ok(result) => result?,
        Err(_) => return Err("audio tap thread panicked".into()),
    };

    info!(
        "Played {} samples: {} live frames, {} dropped, {}/{} differed from the index",
        samples,
        received,
        dropped.load(Ordering::Relaxed),
        mismatches,
        checked
    );
    info!("Done!");

    Ok(())
}
