use clap::{crate_name, crate_version, value_parser, Arg, ArgAction, Command};
use console_image::progress::{NoProgress, ProgressReporter};
use console_image::{terminal, Geometry, Settings};
use pbr::ProgressBar;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::time::Duration;

pub type BinResult<T, E = Box<dyn std::error::Error + Send + Sync>> = Result<T, E>;

fn main() {
    if let Err(e) = bin_main() {
        eprintln!("error: {}", e);
        if let Some(e) = e.source() {
            eprintln!("error: {}", e);
        }
        std::process::exit(1);
    }
}

fn bin_main() -> BinResult<()> {
    let matches = Command::new(crate_name!())
        .version(crate_version!())
        .about("Shows an image or animated GIF in the terminal using truecolor half-blocks")
        .arg(Arg::new("fps")
            .long("fps")
            .short('r')
            .help("Frame rate of animations")
            .value_parser(value_parser!(u8))
            .value_name("num")
            .default_value("15"))
        .arg(Arg::new("width")
            .long("width")
            .short('W')
            .value_parser(value_parser!(u16))
            .value_name("cols")
            .help("Terminal width to fit the image into.\nBy default it's measured, or 80 when not writing to a terminal"))
        .arg(Arg::new("height")
            .long("height")
            .short('H')
            .value_parser(value_parser!(u16))
            .value_name("rows")
            .help("Terminal height to fit the image into.\nBy default it's measured, or 24 when not writing to a terminal"))
        .arg(Arg::new("quiet")
            .long("quiet")
            .short('q')
            .action(ArgAction::SetTrue)
            .help("Do not display the progress bar while preparing animations"))
        .arg(Arg::new("FILE")
            .help("GIF, PNG, JPEG, BMP or ICO file; reads stdin if missing or \"-\"")
            .value_parser(value_parser!(PathBuf)))
        .get_matches_from(wild::args_os());

    let fps = *matches.get_one::<u8>("fps").ok_or("Missing fps")?;
    if fps == 0 {
        return Err("fps must be at least 1".into());
    } else if fps > 60 {
        return Err("60 fps is maximum".into());
    }
    let quiet = matches.get_flag("quiet");
    if !quiet && fps > 30 {
        eprintln!("warning: most terminals can't repaint {fps} frames per second; expect flicker");
    }
    let settings = Settings { fps, ..Settings::default() };

    let buf = console_image::load(matches.get_one::<PathBuf>("FILE").map(|p| p.as_path()))?;
    let frames = console_image::normalize(console_image::decode(&buf)?)?;

    let measured = terminal::geometry()?;
    let geometry = Geometry {
        cols: matches.get_one::<u16>("width").copied().unwrap_or(measured.cols),
        rows: matches.get_one::<u16>("height").copied().unwrap_or(measured.rows),
    };
    let frames = console_image::scale(frames, geometry, &settings)?;

    let mut pb;
    let mut nopb = NoProgress {};
    let progress: &mut dyn ProgressReporter = if quiet || frames.len() < 2 || !io::stderr().is_terminal() {
        &mut nopb
    } else {
        pb = ProgressBar::on(io::stderr(), frames.len() as u64);
        pb.show_speed = false;
        pb.show_percent = false;
        pb.format(" #_. ");
        pb.message("Frame ");
        pb.set_max_refresh_rate(Some(Duration::from_millis(250)));
        &mut pb
    };
    let encoded = console_image::encode_all(&frames, progress)?;
    progress.done(&format!("{} frames ready", encoded.len()));

    // installed before the loop starts, so an early Ctrl-C isn't lost
    let cancel = if encoded.len() > 1 {
        terminal::interrupt_channel()?
    } else {
        crossbeam_channel::never()
    };
    console_image::display(&encoded, &settings, &cancel)?;
    Ok(())
}
