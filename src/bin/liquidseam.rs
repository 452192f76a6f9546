// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate image;

use clap::{App, Arg, ArgMatches};
use failure::format_err;
use image::{GenericImageView, GrayImage};
use liquidseam::{
    energy_to_image, AnyRaster, BuiltinEnergy, Carver, Outcome, Progress, Raster, ResizeOrder,
    Sample,
};
use log::{error, info};
use std::path::Path;
use std::process;
use std::str::FromStr;

struct Options<'a> {
    width: Option<usize>,
    height: Option<usize>,
    energy: BuiltinEnergy,
    rigidity: f32,
    order: ResizeOrder,
    bias: Option<GrayImage>,
    bias_weight: f32,
    rigidity_mask: Option<GrayImage>,
    side_switch: usize,
    enl_step: f32,
    use_cache: bool,
    dump_energy: Option<&'a str>,
}

fn parses<T: FromStr>(v: String) -> Result<(), String>
where
    T::Err: std::fmt::Display,
{
    v.parse::<T>().map(|_| ()).map_err(|e| e.to_string())
}

fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> Result<Option<T>, failure::Error>
where
    T::Err: std::fmt::Display,
{
    match matches.value_of(name) {
        None => Ok(None),
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|e| format_err!("--{}: {}", name, e)),
    }
}

// Masks are grey images the size of the input.  White protects, black
// attracts seams, mid-grey is neutral.
fn load_mask(path: &str, width: u32, height: u32) -> Result<GrayImage, failure::Error> {
    let mask = image::open(path)?.to_luma8();
    if mask.dimensions() != (width, height) {
        return Err(format_err!(
            "mask {} is {}x{}, the image is {}x{}",
            path,
            mask.width(),
            mask.height(),
            width,
            height
        ));
    }
    Ok(mask)
}

fn carve<S: Sample>(raster: Raster<S>, opts: &Options) -> Result<Raster<S>, failure::Error> {
    let (width, height) = raster.dimensions();
    let target = (opts.width.unwrap_or(width), opts.height.unwrap_or(height));

    let mut carver = Carver::new(raster)?;
    carver.init(opts.rigidity)?;
    carver.set_energy_function(opts.energy)?;
    carver.set_resize_order(opts.order);
    carver.set_side_switch_frequency(opts.side_switch);
    carver.set_enl_step(opts.enl_step)?;
    carver.set_use_cache(opts.use_cache);

    if let Some(mask) = &opts.bias {
        let buffer: Vec<f32> = mask
            .as_raw()
            .iter()
            .map(|&v| (f32::from(v) - 127.5) / 127.5)
            .collect();
        carver.bias_add(&buffer, opts.bias_weight)?;
    }
    if let Some(mask) = &opts.rigidity_mask {
        carver.rigidity_mask_add_rgb(mask.as_raw(), 1)?;
    }

    if let Some(path) = opts.dump_energy {
        let energy = carver.energy_map()?;
        energy_to_image(&energy, width, height)?.save(path)?;
        info!("energy map written to {}", path);
    }

    match carver.resize_with_progress(target.0, target.1, &mut Progress::new())? {
        Outcome::Completed => Ok(carver.into_raster()?),
        Outcome::Cancelled => Err(format_err!("resize was cancelled")),
    }
}

fn run() -> Result<(), failure::Error> {
    let matches = App::new("liquidseam")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Content-aware image resizing by seam carving")
        .arg(
            Arg::with_name("input")
                .help("The image to resize")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("output")
                .help("Where to write the result")
                .required(true)
                .index(2),
        )
        .arg(
            Arg::with_name("width")
                .long("width")
                .takes_value(true)
                .value_name("PIXELS")
                .help("Target width (default: unchanged)"),
        )
        .arg(
            Arg::with_name("height")
                .long("height")
                .takes_value(true)
                .value_name("PIXELS")
                .help("Target height (default: unchanged)"),
        )
        .arg(
            Arg::with_name("energy")
                .long("energy")
                .short("e")
                .takes_value(true)
                .value_name("NAME")
                .default_value("grad-xabs")
                .validator(parses::<BuiltinEnergy>)
                .help("Energy function: grad-norm, grad-sumabs, grad-xabs, luma-grad-norm, luma-grad-sumabs, luma-grad-xabs, null"),
        )
        .arg(
            Arg::with_name("rigidity")
                .long("rigidity")
                .short("r")
                .takes_value(true)
                .value_name("R")
                .default_value("0")
                .validator(parses::<f32>)
                .help("Penalty for seams that bend"),
        )
        .arg(
            Arg::with_name("order")
                .long("order")
                .takes_value(true)
                .value_name("ORDER")
                .default_value("horizontal")
                .validator(parses::<ResizeOrder>)
                .help("horizontal, vertical or interleaved"),
        )
        .arg(
            Arg::with_name("bias")
                .long("bias")
                .takes_value(true)
                .value_name("MASK")
                .help("Grey mask: white protects, black discards"),
        )
        .arg(
            Arg::with_name("bias-weight")
                .long("bias-weight")
                .takes_value(true)
                .value_name("W")
                .default_value("1000")
                .validator(parses::<f32>)
                .help("Strength of the bias mask"),
        )
        .arg(
            Arg::with_name("rigidity-mask")
                .long("rigidity-mask")
                .takes_value(true)
                .value_name("MASK")
                .help("Grey mask scaling the rigidity per pixel"),
        )
        .arg(
            Arg::with_name("side-switch")
                .long("side-switch")
                .takes_value(true)
                .value_name("N")
                .default_value("0")
                .validator(parses::<usize>)
                .help("Flip the diagonal preference N times per pass"),
        )
        .arg(
            Arg::with_name("enl-step")
                .long("enl-step")
                .takes_value(true)
                .value_name("S")
                .default_value("2")
                .validator(parses::<f32>)
                .help("Grow by at most S times the width per step, 1 < S <= 2"),
        )
        .arg(
            Arg::with_name("no-cache")
                .long("no-cache")
                .help("Recompute pixel readings instead of caching them"),
        )
        .arg(
            Arg::with_name("dump-energy")
                .long("dump-energy")
                .takes_value(true)
                .value_name("FILE")
                .help("Write the initial energy map as a grey image"),
        )
        .get_matches();

    let input = matches
        .value_of("input")
        .ok_or_else(|| format_err!("no input image"))?;
    let output = matches
        .value_of("output")
        .ok_or_else(|| format_err!("no output image"))?;

    let image = image::open(input)?;
    let (width, height) = image.dimensions();
    let masks = |name: &str| -> Result<Option<GrayImage>, failure::Error> {
        matches
            .value_of(name)
            .map(|path| load_mask(path, width, height))
            .transpose()
    };

    let opts = Options {
        width: value(&matches, "width")?,
        height: value(&matches, "height")?,
        energy: value(&matches, "energy")?.unwrap_or(BuiltinEnergy::GradXAbs),
        rigidity: value(&matches, "rigidity")?.unwrap_or(0.0),
        order: value(&matches, "order")?.unwrap_or_default(),
        bias: masks("bias")?,
        bias_weight: value(&matches, "bias-weight")?.unwrap_or(1000.0),
        rigidity_mask: masks("rigidity-mask")?,
        side_switch: value(&matches, "side-switch")?.unwrap_or(0),
        enl_step: value(&matches, "enl-step")?.unwrap_or(2.0),
        use_cache: !matches.is_present("no-cache"),
        dump_energy: matches.value_of("dump-energy"),
    };

    info!("{}: {}x{}", input, width, height);
    let carved = match AnyRaster::from_dynamic(image)? {
        AnyRaster::U8(r) => AnyRaster::U8(carve(r, &opts)?),
        AnyRaster::U16(r) => AnyRaster::U16(carve(r, &opts)?),
        AnyRaster::F32(r) => AnyRaster::F32(carve(r, &opts)?),
    };
    let (w, h) = carved.dimensions();
    carved.into_dynamic()?.save(Path::new(output))?;
    info!("{}: {}x{}", output, w, h);
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run() {
        error!("{}", e);
        process::exit(1);
    }
}
