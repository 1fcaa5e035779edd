use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::{GrayImage, RgbaImage};
use log::info;
use mp_core::{
    Image, MipChainLayout, MipRect, Texel, TextureDesc, TextureFormat, TextureUsage, UVec2, Vec4,
};
use mp_pyr::{CommandBuffer, Device, MipGenerator, MipGeneratorConfig, SubmitReport};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "mp_gallery")]
#[command(about = "Run the pyramid builders on image files")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Color Gaussian pyramid of an RGBA image.
    #[command(name = "color")]
    Color(ColorArgs),
    /// Packed min-depth pyramid of a grayscale image read as depth.
    #[command(name = "depth")]
    Depth(DepthArgs),
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    #[arg(long, required = true)]
    input: PathBuf,
    #[arg(long, default_value = "out/gallery")]
    out: PathBuf,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum PathArg {
    Fragment,
    Compute,
}

#[derive(Args, Debug, Clone)]
struct ColorArgs {
    #[command(flatten)]
    common: CommonArgs,
    /// Overrides `prefer_fragment_path` from the config.
    #[arg(long, value_enum)]
    path: Option<PathArg>,
    /// JSON generator config; missing fields take their defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct DepthArgs {
    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Clone, Serialize)]
struct ReportDto {
    copies: usize,
    draws: usize,
    dispatches: usize,
    thread_groups: u64,
    samples: usize,
}

impl From<SubmitReport> for ReportDto {
    fn from(r: SubmitReport) -> Self {
        Self {
            copies: r.copies,
            draws: r.draws,
            dispatches: r.dispatches,
            thread_groups: r.thread_groups,
            samples: r.samples,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
struct ColorSummary {
    case: &'static str,
    width: u32,
    height: u32,
    config: MipGeneratorConfig,
    level_count: usize,
    level_sizes: Vec<[u32; 2]>,
    report: ReportDto,
    elapsed_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
struct DepthSummary {
    case: &'static str,
    width: u32,
    height: u32,
    atlas: [u32; 2],
    layout: MipChainLayout,
    report: ReportDto,
    elapsed_ms: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.cmd {
        Command::Color(args) => run_color(args),
        Command::Depth(args) => run_depth(args),
    }
}

fn run_color(args: ColorArgs) -> Result<()> {
    let case_dir = prepare_case(&args.common, "color")?;

    let mut config = match &args.config {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            MipGeneratorConfig::from_json_str(&json)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None => MipGeneratorConfig::default(),
    };
    if let Some(path) = args.path {
        config.prefer_fragment_path = matches!(path, PathArg::Fragment);
    }

    let input = load_rgba(&args.common.input)?;
    let size = input.extent();
    let usage = TextureUsage::SAMPLED | TextureUsage::STORAGE | TextureUsage::RENDER_TARGET;

    let mut device = Device::new();
    let source = device.create_texture(TextureDesc::new_2d(
        "gallery source",
        size.x,
        size.y,
        TextureFormat::Rgba16Float,
        usage,
    ))?;
    let pyramid = device.create_texture(
        TextureDesc::new_2d(
            "gallery pyramid",
            size.x,
            size.y,
            TextureFormat::Rgba16Float,
            usage,
        )
        .with_full_mip_chain(),
    )?;
    device.write(source, 0, 0, &input)?;

    let mut generator = MipGenerator::new(config.clone())?;
    let t0 = Instant::now();
    let mut cmd = CommandBuffer::new("gallery color");
    let level_count =
        generator.render_color_gaussian_pyramid(&mut device, &mut cmd, size, source, pyramid)?;
    let report = device.submit(cmd).context("executing color pyramid")?;
    let elapsed_ms = t0.elapsed().as_secs_f64() * 1e3;
    info!("color pyramid: {level_count} levels in {elapsed_ms:.2} ms");

    let desc = device.desc(pyramid)?.clone();
    let mut level_sizes = Vec::with_capacity(level_count);
    for mip in 0..level_count as u32 {
        let extent = desc.mip_extent(mip);
        level_sizes.push([extent.x, extent.y]);
        let level = device.read(pyramid, mip, 0)?;
        save_rgba(case_dir.join(format!("level_{mip}.png")), level, extent)?;
    }
    generator.release(&mut device);

    write_json(
        case_dir.join("summary.json"),
        &ColorSummary {
            case: "color",
            width: size.x,
            height: size.y,
            config,
            level_count,
            level_sizes,
            report: report.into(),
            elapsed_ms,
        },
    )
}

fn run_depth(args: DepthArgs) -> Result<()> {
    let case_dir = prepare_case(&args.common, "depth")?;

    let depth = load_depth(&args.common.input)?;
    let size = depth.extent();
    let layout = MipChainLayout::packed(size);
    let atlas = layout.atlas_size();

    let mut device = Device::new();
    let texture = device.create_texture(TextureDesc::new_2d(
        "gallery depth",
        atlas.x,
        atlas.y,
        TextureFormat::R32Float,
        TextureUsage::SAMPLED | TextureUsage::STORAGE,
    ))?;

    let mut staging = Image::new_fill(atlas.x as usize, atlas.y as usize, Vec4::ONE);
    staging
        .as_view_mut()
        .subview_mut(0, 0, depth.width(), depth.height())?
        .copy_from(&depth.as_view())?;
    device.write(texture, 0, 0, &staging)?;

    let generator = MipGenerator::new(MipGeneratorConfig::default())?;
    let t0 = Instant::now();
    let mut cmd = CommandBuffer::new("gallery depth");
    generator.render_min_depth_pyramid(&device, &mut cmd, texture, &layout)?;
    let report = device.submit(cmd).context("executing depth pyramid")?;
    let elapsed_ms = t0.elapsed().as_secs_f64() * 1e3;
    info!(
        "depth pyramid: {} levels in {elapsed_ms:.2} ms",
        layout.level_count()
    );

    let result = device.read(texture, 0, 0)?;
    save_depth(case_dir.join("atlas.png"), result, MipRect::new(0, 0, atlas.x, atlas.y))?;
    for (i, rect) in layout.levels().iter().enumerate() {
        save_depth(case_dir.join(format!("level_{i}.png")), result, *rect)?;
    }

    write_json(
        case_dir.join("summary.json"),
        &DepthSummary {
            case: "depth",
            width: size.x,
            height: size.y,
            atlas: [atlas.x, atlas.y],
            layout,
            report: report.into(),
            elapsed_ms,
        },
    )
}

fn prepare_case(common: &CommonArgs, case_name: &str) -> Result<PathBuf> {
    ensure_file_exists(&common.input, "input")?;

    let case_dir = common.out.join(case_name);
    fs::create_dir_all(&case_dir)
        .with_context(|| format!("creating output directory {}", case_dir.display()))?;
    fs::copy(&common.input, case_dir.join("input.png")).with_context(|| {
        format!(
            "copying input {} -> {}",
            common.input.display(),
            case_dir.join("input.png").display()
        )
    })?;

    Ok(case_dir)
}

fn load_rgba(path: &Path) -> Result<Image<Texel>> {
    let rgba = image::open(path)
        .with_context(|| format!("opening input image {}", path.display()))?
        .to_rgba8();
    let (w, h) = rgba.dimensions();
    let data = rgba
        .pixels()
        .map(|p| Vec4::from_array(p.0.map(|c| c as f32 / 255.0)))
        .collect();

    Image::from_vec(w as usize, h as usize, data)
        .with_context(|| format!("constructing texel image from {}", path.display()))
}

fn load_depth(path: &Path) -> Result<Image<Texel>> {
    let luma = image::open(path)
        .with_context(|| format!("opening input image {}", path.display()))?
        .to_luma8();
    let (w, h) = luma.dimensions();
    if w == 0 || h == 0 {
        bail!("depth input {} is empty", path.display());
    }
    let data = luma
        .pixels()
        .map(|p| Vec4::new(p.0[0] as f32 / 255.0, 0.0, 0.0, 0.0))
        .collect();

    Image::from_vec(w as usize, h as usize, data)
        .with_context(|| format!("constructing depth image from {}", path.display()))
}

fn save_rgba(path: PathBuf, level: &Image<Texel>, extent: UVec2) -> Result<()> {
    let mut out = RgbaImage::new(extent.x, extent.y);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let t = level.texel(x as usize, y as usize).clamp(Vec4::ZERO, Vec4::ONE) * 255.0;
        px.0 = t.round().to_array().map(|c| c as u8);
    }
    out.save(&path)
        .with_context(|| format!("saving image {}", path.display()))
}

fn save_depth(path: PathBuf, atlas: &Image<Texel>, rect: MipRect) -> Result<()> {
    let mut out = GrayImage::new(rect.size.x, rect.size.y);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let d = atlas
            .texel((rect.offset.x + x) as usize, (rect.offset.y + y) as usize)
            .x;
        px.0 = [(d.clamp(0.0, 1.0) * 255.0).round() as u8];
    }
    out.save(&path)
        .with_context(|| format!("saving image {}", path.display()))
}

fn write_json(path: PathBuf, value: &impl Serialize) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).context("serializing json")?;
    fs::write(&path, bytes).with_context(|| format!("writing json {}", path.display()))
}

fn ensure_file_exists(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        bail!("{} file does not exist: {}", what, path.display());
    }
    if !path.is_file() {
        bail!("{} path is not a file: {}", what, path.display());
    }
    Ok(())
}
