//! nesound CLI: play the built-in demo tune or render it to WAV.
//!
//! Usage:
//!   cargo run --bin ns-cli
//!   cargo run --bin ns-cli -- --wav output.wav --seconds 4 --pal

use ns_master::{demo_script, Controller, Region};
use std::io::Write;
use std::{env, fs, process};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage();
        return;
    }

    let wav_path = flag_value(&args, "--wav");
    let seconds = flag_value(&args, "--seconds")
        .map(|s| {
            s.parse::<f64>().unwrap_or_else(|_| {
                eprintln!("Invalid --seconds value: {}", s);
                process::exit(1);
            })
        })
        .unwrap_or(f64::INFINITY);
    let region = if args.iter().any(|a| a == "--pal") {
        Region::Pal
    } else {
        Region::Ntsc
    };

    let ctrl = Controller::with_script(demo_script(region), region);
    println!("Region:   {:?} ({} Hz)", region, region.cpu_clock_hz());
    println!("Writes:   {}", ctrl.script().len());
    println!("Length:   {:.2} s", ctrl.duration());
    println!();

    match wav_path {
        Some(wav) => render_to_wav(&ctrl, &wav, seconds),
        None => play_audio(ctrl, seconds),
    }
}

fn usage() {
    println!("Usage: ns-cli [--wav output.wav] [--seconds N] [--pal]");
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn play_audio(mut ctrl: Controller, seconds: f64) {
    if let Err(e) = ctrl.play() {
        eprintln!("Failed to start playback: {}", e);
        process::exit(1);
    }
    println!("Playing...");
    println!();

    while ctrl.is_playing() {
        if let (Some(pos), Some(stats)) = (ctrl.position(), ctrl.stats()) {
            print!(
                "\rTime: {:6.2} s | Buffer: {:3.0}% | Underruns: {}",
                pos,
                stats.fill * 100.0,
                stats.underrun_frames
            );
            let _ = std::io::stdout().flush();
            if pos >= seconds {
                ctrl.stop();
                break;
            }
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }

    println!("\rDone.                                          ");
}

fn render_to_wav(ctrl: &Controller, path: &str, seconds: f64) {
    let sample_rate: u32 = 44100;
    let max_seconds = seconds.min(300.0);
    println!("Rendering to {} at {} Hz...", path, sample_rate);

    let wav = ctrl
        .render_to_wav(sample_rate, max_seconds)
        .unwrap_or_else(|e| {
            eprintln!("Failed to render: {}", e);
            process::exit(1);
        });
    println!("Rendered {} bytes", wav.len());

    fs::write(path, &wav).unwrap_or_else(|e| {
        eprintln!("Failed to write {}: {}", path, e);
        process::exit(1);
    });

    println!("Done.");
}
