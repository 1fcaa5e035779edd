//! Example: build the color pyramid on both paths and a packed depth pyramid.
//!
//! Loads a PNG (or synthesizes a test pattern when no input is given), runs
//! the fragment and compute color paths on the same source, reports the
//! largest per-texel difference between them, then reduces the luminance as
//! depth into a packed min-pyramid.
//!
//! Results are written to a JSON file; timing is printed to stdout.
//!
//! Run from the workspace root:
//!   cargo run -p mip-pyramid --example pyramid_demo -- --help
//!   cargo run -p mip-pyramid --example pyramid_demo -- --width 1280 --height 720

use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use image::ImageReader;
use mip_pyramid::{
    CommandBuffer, Device, Image, MipChainLayout, MipGenerator, MipGeneratorConfig, Texel,
    TextureDesc, TextureFormat, TextureId, TextureUsage, UVec2, Vec4,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(about = "Compare fragment and compute color pyramids, then build a depth pyramid")]
struct Args {
    /// Optional RGBA input; a synthetic pattern is used when omitted
    #[arg(long)]
    input: Option<String>,

    /// Width of the synthetic pattern
    #[arg(long, default_value_t = 640)]
    width: u32,

    /// Height of the synthetic pattern
    #[arg(long, default_value_t = 360)]
    height: u32,

    /// Output JSON path
    #[arg(long, default_value = "pyramid_demo.json")]
    out: String,
}

#[derive(Serialize)]
struct PathResult {
    path: String,
    level_count: usize,
    elapsed_ms: f64,
    draws: usize,
    dispatches: usize,
}

#[derive(Serialize)]
struct DemoResult {
    width: u32,
    height: u32,
    color: Vec<PathResult>,
    max_path_difference: f32,
    depth_levels: usize,
    depth_elapsed_ms: f64,
    /// Minimum of the coarsest depth level.
    nearest_depth: f32,
}

fn synthetic(width: u32, height: u32) -> Result<Image<Texel>> {
    let mut data = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let u = x as f32 / width as f32;
            let v = y as f32 / height as f32;
            let ring = ((u - 0.5).hypot(v - 0.5) * 40.0).sin() * 0.5 + 0.5;
            data.push(Vec4::new(u, v, ring, 1.0));
        }
    }
    Image::from_vec(width as usize, height as usize, data).context("building synthetic image")
}

fn load(path: &str) -> Result<Image<Texel>> {
    let rgba = ImageReader::open(path)
        .with_context(|| format!("opening {path}"))?
        .decode()
        .with_context(|| format!("decoding {path}"))?
        .into_rgba8();
    let (w, h) = rgba.dimensions();
    let data = rgba
        .pixels()
        .map(|p| Vec4::from_array(p.0.map(|c| c as f32 / 255.0)))
        .collect();
    Image::from_vec(w as usize, h as usize, data).context("building texel image")
}

fn color_textures(device: &mut Device, size: UVec2, input: &Image<Texel>) -> Result<(TextureId, TextureId)> {
    let usage = TextureUsage::SAMPLED | TextureUsage::STORAGE | TextureUsage::RENDER_TARGET;
    let source = device.create_texture(TextureDesc::new_2d(
        "demo source",
        size.x,
        size.y,
        TextureFormat::Rgba32Float,
        usage,
    ))?;
    let pyramid = device.create_texture(
        TextureDesc::new_2d("demo pyramid", size.x, size.y, TextureFormat::Rgba32Float, usage)
            .with_full_mip_chain(),
    )?;
    device.write(source, 0, 0, input)?;
    Ok((source, pyramid))
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let input = match &args.input {
        Some(path) => load(path)?,
        None => synthetic(args.width, args.height)?,
    };
    let size = input.extent();
    println!("source: {}x{}", size.x, size.y);

    let mut device = Device::new();
    let mut results = Vec::new();
    let mut pyramids = Vec::new();

    for prefer_fragment_path in [true, false] {
        let mut generator = MipGenerator::new(MipGeneratorConfig {
            prefer_fragment_path,
            ..MipGeneratorConfig::default()
        })?;
        let (source, pyramid) = color_textures(&mut device, size, &input)?;

        let t0 = Instant::now();
        let mut cmd = CommandBuffer::new("demo color");
        let level_count =
            generator.render_color_gaussian_pyramid(&mut device, &mut cmd, size, source, pyramid)?;
        let report = device.submit(cmd)?;
        let elapsed_ms = t0.elapsed().as_secs_f64() * 1e3;

        let path = format!("{:?}", generator.path_kind()).to_lowercase();
        println!("  {path}: {level_count} levels ({elapsed_ms:.2} ms)");
        results.push(PathResult {
            path,
            level_count,
            elapsed_ms,
            draws: report.draws,
            dispatches: report.dispatches,
        });

        generator.release(&mut device);
        pyramids.push((pyramid, level_count));
    }

    let mut max_path_difference = 0.0f32;
    let (fragment, count) = pyramids[0];
    let (compute, _) = pyramids[1];
    for mip in 0..count as u32 {
        let a = device.read(fragment, mip, 0)?;
        let b = device.read(compute, mip, 0)?;
        for (x, y) in a.data().iter().zip(b.data()) {
            max_path_difference = max_path_difference.max((*x - *y).abs().max_element());
        }
    }
    println!("max fragment/compute difference: {max_path_difference:.2e}");

    let layout = MipChainLayout::packed(size);
    let atlas = layout.atlas_size();
    let depth = device.create_texture(TextureDesc::new_2d(
        "demo depth",
        atlas.x,
        atlas.y,
        TextureFormat::R32Float,
        TextureUsage::STORAGE,
    ))?;
    let mut staging = Image::new_fill(atlas.x as usize, atlas.y as usize, Vec4::ONE);
    for y in 0..input.height() {
        for x in 0..input.width() {
            let t = input.texel(x, y);
            let luma = 0.2126 * t.x + 0.7152 * t.y + 0.0722 * t.z;
            staging.set(x, y, Vec4::new(luma, 0.0, 0.0, 0.0));
        }
    }
    device.write(depth, 0, 0, &staging)?;

    let generator = MipGenerator::new(MipGeneratorConfig::default())?;
    let t0 = Instant::now();
    let mut cmd = CommandBuffer::new("demo depth");
    generator.render_min_depth_pyramid(&device, &mut cmd, depth, &layout)?;
    device.submit(cmd)?;
    let depth_elapsed_ms = t0.elapsed().as_secs_f64() * 1e3;

    let coarsest = layout
        .levels()
        .last()
        .copied()
        .context("packed layout has at least one level")?;
    let nearest_depth = device
        .read(depth, 0, 0)?
        .texel(coarsest.offset.x as usize, coarsest.offset.y as usize)
        .x;
    println!(
        "depth: {} levels ({depth_elapsed_ms:.2} ms), nearest {nearest_depth:.4}",
        layout.level_count()
    );

    let result = DemoResult {
        width: size.x,
        height: size.y,
        color: results,
        max_path_difference,
        depth_levels: layout.level_count(),
        depth_elapsed_ms,
        nearest_depth,
    };
    let out_file =
        std::fs::File::create(&args.out).with_context(|| format!("creating {}", args.out))?;
    serde_json::to_writer_pretty(out_file, &result)
        .with_context(|| format!("writing JSON to {}", args.out))?;

    println!("results written to {}", args.out);
    Ok(())
}
