// SPDX-License-Identifier: MPL-2.0
use paced_player::config;
use paced_player::error::Result;
use paced_player::media::{self, MediaDescriptor, StreamDetails};
use paced_player::video_player::sink::generate_default_filename;
use paced_player::video_player::{ExportFormat, MemorySink, VideoPlayer};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

const DEFAULT_TICK_HZ: u32 = 60;

const USAGE: &str = "\
Usage: paced_player [OPTIONS] <FILE>

Options:
  --probe            Print stream information and exit
  --speed <X>        Playback speed (0.25 to 4.0)
  --seek <SECONDS>   Start position
  --tick-hz <N>      Render ticks per second [default: 60]
  --snapshot <PATH>  Save the last presented frame (file or directory)
  --config <PATH>    Settings file to use instead of the default location
  -h, --help         Print this help";

struct Args {
    probe: bool,
    speed: Option<f64>,
    seek: Option<f64>,
    tick_hz: u32,
    snapshot: Option<PathBuf>,
    config: Option<PathBuf>,
    file: PathBuf,
}

fn parse_args() -> std::result::Result<Option<Args>, pico_args::Error> {
    let mut args = pico_args::Arguments::from_env();
    if args.contains(["-h", "--help"]) {
        return Ok(None);
    }

    let parsed = Args {
        probe: args.contains("--probe"),
        speed: args.opt_value_from_str("--speed")?,
        seek: args.opt_value_from_str("--seek")?,
        tick_hz: args
            .opt_value_from_str("--tick-hz")?
            .unwrap_or(DEFAULT_TICK_HZ),
        snapshot: args.opt_value_from_str("--snapshot")?,
        config: args.opt_value_from_str("--config")?,
        file: args.free_from_str()?,
    };

    let remaining = args.finish();
    if !remaining.is_empty() {
        log::warn!("Ignoring unused arguments: {:?}", remaining);
    }
    Ok(Some(parsed))
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = match parse_args() {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("error: {e}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    if args.probe {
        print_descriptor(&media::probe(&args.file)?);
        return Ok(());
    }

    let config = match &args.config {
        Some(path) => config::load_from_path(path)?,
        None => config::load()?,
    };

    let mut player = VideoPlayer::open_with_config(&args.file, config)?;
    if let Some(speed) = args.speed {
        player.set_playback_speed(speed);
    }
    if let Some(target) = args.seek {
        player.seek(target)?;
    }

    let tick = Duration::from_secs_f64(1.0 / f64::from(args.tick_hz.max(1)));
    let mut sink = MemorySink::new();
    let started = Instant::now();

    player.play();
    while !player.is_end_of_stream() {
        player.update(&mut sink);
        std::thread::sleep(tick);
    }
    player.health()?;

    println!(
        "presented {} frames, last at {:.3}s of {:.3}s, in {:.3}s wall time at {:.2}x",
        sink.frames_received(),
        player.current_time(),
        player.duration(),
        started.elapsed().as_secs_f64(),
        player.playback_speed()
    );

    if let Some(target) = &args.snapshot {
        let path = if target.is_dir() {
            let format = ExportFormat::default();
            target.join(generate_default_filename(
                &args.file,
                player.current_time(),
                format,
            ))
        } else {
            target.clone()
        };
        sink.save_snapshot(&path)?;
        println!("snapshot written to {}", path.display());
    }

    Ok(())
}

fn print_descriptor(descriptor: &MediaDescriptor) {
    println!("{}", descriptor.absolute_path.display());
    println!("  duration: {:.3}s", descriptor.duration_secs);
    println!("  bitrate:  {} b/s", descriptor.bitrate_bps);
    for (key, value) in &descriptor.metadata {
        println!("  {key}: {value}");
    }

    for stream in &descriptor.streams {
        let profile = stream
            .profile
            .as_deref()
            .map(|p| format!(" ({p})"))
            .unwrap_or_default();
        print!(
            "  #{} {:?}: {}{} [{}]",
            stream.index,
            stream.kind(),
            stream.codec_name,
            profile,
            stream.codec_long_name
        );
        match &stream.details {
            StreamDetails::Video {
                width,
                height,
                sample_aspect_ratio,
                display_aspect_ratio,
            } => println!(
                " {width}x{height} SAR {sample_aspect_ratio:.4} DAR {display_aspect_ratio:.4}"
            ),
            StreamDetails::Audio {
                sample_rate,
                channels,
                channel_layout,
                bits_per_sample,
            } => println!(
                " {sample_rate} Hz, {channels} ch ({channel_layout}), {bits_per_sample} bits"
            ),
            StreamDetails::Subtitle => println!(),
        }
    }
}
