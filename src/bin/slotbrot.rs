// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use clap::{App, Arg, ArgMatches};
use log::info;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use slotbrot::{write_image, FractalParams, Headless, Preview, RenderMode, Renderer, Screen};

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

fn value_of<T: FromStr>(matches: &ArgMatches, name: &str) -> Option<T> {
    matches.value_of(name).and_then(|s| T::from_str(s).ok())
}

const WORKERS: &str = "workers";
const OUTPUT: &str = "output";
const PARAMS: &str = "params";
const REMOTE: &str = "remote";
const SIZE: &str = "size";
const FRAME: &str = "frame";
const MODE: &str = "mode";
const PASSES: &str = "passes";
const TIMEOUT: &str = "timeout";

const MAX_WORKERS: usize = 256;
const PREVIEW_EVERY: u64 = 64;

fn args<'a>() -> ArgMatches<'a> {
    App::new("slotbrot")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Parallel Buddhabrot renderer")
        .arg(
            Arg::with_name(WORKERS)
                .required(false)
                .long(WORKERS)
                .short("n")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        MAX_WORKERS,
                        "Could not parse worker count",
                        &format!("Worker count must be between 1 and {}", MAX_WORKERS),
                    )
                })
                .help("Number of worker threads (default: one per CPU)"),
        )
        .arg(
            Arg::with_name(OUTPUT)
                .required(false)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file; the format follows the extension"),
        )
        .arg(
            Arg::with_name(PARAMS)
                .required(false)
                .long(PARAMS)
                .short("p")
                .takes_value(true)
                .default_value("fractal.data")
                .help("Fractal parameter file"),
        )
        .arg(
            Arg::with_name(REMOTE)
                .long(REMOTE)
                .short("r")
                .help("Write a live preview, live.png, next to the output while rendering"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("800x600")
                .validator(|s| validate_pair::<usize>(&s, 'x', "Could not parse image size"))
                .help("Image size when the parameter file doesn't give one"),
        )
        .arg(
            Arg::with_name(FRAME)
                .long(FRAME)
                .short("f")
                .help("Ignore the parameter file's view and frame the whole set"),
        )
        .arg(
            Arg::with_name(MODE)
                .required(false)
                .long(MODE)
                .short("m")
                .takes_value(true)
                .default_value("buddhabrot")
                .possible_values(&["buddhabrot", "mandelbrot"])
                .help("What to render"),
        )
        .arg(
            Arg::with_name(PASSES)
                .required(false)
                .long(PASSES)
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        slotbrot::render::MAX_PASSES,
                        "Could not parse pass count",
                        "Pass count must be between 1 and 64",
                    )
                })
                .help("Sub-pixel passes per pixel (default: 8, or 1 for mandelbrot)"),
        )
        .arg(
            Arg::with_name(TIMEOUT)
                .required(false)
                .long(TIMEOUT)
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1u64,
                        86_400,
                        "Could not parse timeout",
                        "Timeout must be between 1 and 86400 seconds",
                    )
                })
                .help("Give up if no worker reports for this many seconds"),
        )
        .get_matches()
}

fn run(matches: &ArgMatches) -> slotbrot::Result<()> {
    let (cols, rows) = matches
        .value_of(SIZE)
        .and_then(|s| parse_pair::<usize>(s, 'x'))
        .unwrap_or((800, 600));
    let output = matches.value_of(OUTPUT).map(Path::new);

    let mut screen: Box<dyn Screen> = if matches.is_present(REMOTE) {
        let live = output
            .and_then(Path::parent)
            .unwrap_or_else(|| Path::new(""))
            .join("live.png");
        info!("live preview at {}", live.display());
        Box::new(Preview::new(live, PREVIEW_EVERY).with_dimensions(cols, rows))
    } else {
        Box::new(Headless::with_dimensions(cols, rows))
    };

    let source = matches.value_of(PARAMS).unwrap_or("fractal.data");
    let mut params = FractalParams::load(source, &*screen)?;
    if matches.is_present(FRAME) {
        params = params.framed();
    }

    let mut renderer = Renderer::new(params)
        .mode(value_of(matches, MODE).unwrap_or(RenderMode::Buddhabrot))
        .stall_timeout(value_of(matches, TIMEOUT).map(Duration::from_secs));
    if let Some(workers) = value_of(matches, WORKERS) {
        renderer = renderer.workers(workers);
    }
    if let Some(passes) = value_of(matches, PASSES) {
        renderer = renderer.passes(passes);
    }

    let (mut image, _) = renderer.render(&mut *screen)?;
    image.finalize();
    match output {
        Some(path) => {
            write_image(path, &image)?;
            info!("wrote {}", path.display());
        }
        None => info!("no output file given; nothing written"),
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let matches = args();
    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
