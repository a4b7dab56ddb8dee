// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Headless

// The following lints are part of the Linebender standard set,
// but resolving them has been deferred for now.
#![allow(
    clippy::cast_possible_truncation,
    clippy::allow_attributes_without_reason
)]

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Parser;
use tilesdf::kurbo::{Point, Rect, Vec2};
use tilesdf::peniko::color::palette;
use tilesdf::util::{block_on_wgpu, RenderContext};
use tilesdf::wgpu::{
    self, BufferDescriptor, BufferUsages, CommandEncoderDescriptor, Device, Extent3d, Queue,
    TexelCopyBufferInfo, TextureDescriptor, TextureFormat, TextureUsages,
};
use tilesdf::{CommandStream, FillMode, Paint, Renderer, RendererOptions, SdfOperator};

fn main() -> Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::init();
    let args = Args::parse();
    let pixels = if args.use_cpu {
        render_cpu(&args)?
    } else {
        match pollster::block_on(render_gpu(&args)) {
            Ok(pixels) => pixels,
            Err(err) => {
                log::warn!("GPU rendering failed ({err}), falling back to the CPU shaders");
                render_cpu(&args)?
            }
        }
    };
    let out_path = args.out_directory.join("shapes.png");
    std::fs::create_dir_all(&args.out_directory)?;
    let mut file = File::create(&out_path)?;
    let mut png_encoder = png::Encoder::new(&mut file, args.width, args.height);
    png_encoder.set_color(png::ColorType::Rgba);
    png_encoder.set_depth(png::BitDepth::Eight);
    let mut writer = png_encoder.write_header()?;
    writer.write_image_data(&pixels)?;
    writer.finish()?;
    println!("Wrote result ({}x{}) to {out_path:?}", args.width, args.height);
    Ok(())
}

/// Draws the demo scene, laid out in a 1000x700 world fitted to the target.
fn scene(stream: &mut CommandStream, args: &Args) {
    let world = Rect::new(0.0, 0.0, 1000.0, 700.0);
    stream.set_world_box(Some(world));
    // Zoom around the center of the world.
    let center = world.center();
    stream.set_camera(center - center.to_vec2() / args.scale, args.scale);
    if let Some(aa_width) = args.aa_width {
        stream.set_aa_width(aa_width);
    }

    stream.disc(Point::new(120.0, 120.0), 70.0, palette::css::TOMATO);
    stream.oriented_box(
        Point::new(240.0, 60.0),
        Point::new(400.0, 180.0),
        40.0,
        6.0,
        Paint::new(palette::css::GOLD).with_fill(FillMode::Outline),
    );
    stream.ellipse(
        Point::new(460.0, 120.0),
        Point::new(600.0, 120.0),
        60.0,
        palette::css::MEDIUM_SEA_GREEN,
    );
    stream.triangle(
        Point::new(660.0, 190.0),
        Point::new(740.0, 50.0),
        Point::new(820.0, 190.0),
        4.0,
        Paint::new(palette::css::DEEP_SKY_BLUE).with_fill(FillMode::Hollow),
    );
    stream.pie(
        Point::new(110.0, 330.0),
        Vec2::new(0.0, -1.0),
        70.0,
        2.2,
        palette::css::ORCHID,
    );
    stream.arc(
        Point::new(290.0, 340.0),
        Vec2::new(1.0, 0.0),
        60.0,
        2.0,
        12.0,
        palette::css::SALMON,
    );
    stream.uneven_capsule(
        Point::new(420.0, 300.0),
        Point::new(540.0, 380.0),
        40.0,
        15.0,
        palette::css::KHAKI,
    );
    stream.trapezoid(
        Point::new(660.0, 280.0),
        Point::new(660.0, 400.0),
        70.0,
        30.0,
        palette::css::SLATE_BLUE,
    );
    stream.aabox(
        Rect::new(820.0, 270.0, 960.0, 400.0),
        20.0,
        palette::css::TEAL,
    );

    // Two blobs merged into one outlined shape, with a bite taken out.
    stream.begin_combination(25.0);
    stream.disc(Point::new(200.0, 560.0), 60.0, palette::css::CORAL);
    stream.disc(Point::new(320.0, 560.0), 50.0, palette::css::PLUM);
    stream.disc(
        Point::new(260.0, 620.0),
        30.0,
        Paint::new(palette::css::WHITE).with_op(SdfOperator::Subtraction),
    );
    stream.end_combination(true);

    stream.set_clip_rect(Rect::new(440.0, 460.0, 960.0, 680.0));
    stream.text(
        Point::new(460.0, 520.0),
        64.0,
        "TILESDF",
        Paint::new(palette::css::LIGHT_CYAN).with_fill(FillMode::Outline),
    );
    stream.reset_clip();
}

fn render_cpu(args: &Args) -> Result<Vec<u8>> {
    let options = RendererOptions::default();
    let mut stream = CommandStream::new(options.capacities);
    stream.set_viewport(args.width, args.height);
    stream.begin_frame();
    scene(&mut stream, args);
    stream.end_frame();
    let frame = tilesdf::cpu::render_to_pixels(
        &stream,
        &tilesdf::RenderParams::default(),
        options.capacities.nodes,
    )?;
    Ok(frame.pixels)
}

async fn render_gpu(args: &Args) -> Result<Vec<u8>> {
    let mut context = RenderContext::new();
    let device_handle = context.first_device().await?;
    let device = &device_handle.device;
    let queue = &device_handle.queue;
    let mut renderer = Renderer::new(device, RendererOptions::default())?;
    renderer.resize(device, args.width, args.height);
    renderer.begin_frame();
    scene(renderer.stream(), args);
    renderer.end_frame(device, queue);
    renderer.bin_commands();

    let size = Extent3d {
        width: args.width,
        height: args.height,
        depth_or_array_layers: 1,
    };
    let target = device.create_texture(&TextureDescriptor {
        label: Some("Target texture"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TextureFormat::Rgba8Unorm,
        usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());
    renderer.flush_to_view(device, queue, &view)?;
    let counters = renderer.bin_counters(device, queue)?;
    log::info!(
        "{} occupied tiles, {} tile nodes",
        counters.occupied_tiles,
        counters.node_count
    );
    read_back(device, queue, &target, size)
}

fn read_back(device: &Device, queue: &Queue, target: &wgpu::Texture, size: Extent3d) -> Result<Vec<u8>> {
    let (width, height) = (size.width, size.height);
    let padded_byte_width = (width * 4).next_multiple_of(256);
    let buffer_size = padded_byte_width as u64 * height as u64;
    let buffer = device.create_buffer(&BufferDescriptor {
        label: Some("val"),
        size: buffer_size,
        usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let mut encoder = device.create_command_encoder(&CommandEncoderDescriptor {
        label: Some("Copy out buffer"),
    });
    encoder.copy_texture_to_buffer(
        target.as_image_copy(),
        TexelCopyBufferInfo {
            buffer: &buffer,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_byte_width),
                rows_per_image: None,
            },
        },
        size,
    );
    queue.submit([encoder.finish()]);
    let buf_slice = buffer.slice(..);

    let (sender, receiver) = futures_intrusive::channel::shared::oneshot_channel();
    buf_slice.map_async(wgpu::MapMode::Read, move |v| sender.send(v).unwrap());
    if let Some(recv_result) = block_on_wgpu(device, receiver.receive()) {
        recv_result?;
    } else {
        bail!("channel was closed");
    }

    let data = buf_slice.get_mapped_range();
    let mut result_unpadded = Vec::<u8>::with_capacity((width * height * 4).try_into()?);
    for row in 0..height {
        let start = (row * padded_byte_width).try_into()?;
        result_unpadded.extend(&data[start..start + (width * 4) as usize]);
    }
    Ok(result_unpadded)
}

#[derive(Parser, Debug)]
#[command(about, long_about = None, bin_name="cargo run -p headless --")]
struct Args {
    #[arg(long, default_value_t = 1000)]
    width: u32,
    #[arg(long, default_value_t = 700)]
    height: u32,
    /// Extra zoom applied on top of fitting the scene to the width
    #[arg(long, default_value_t = 1.0)]
    scale: f64,
    /// Width of the antialiasing ramp in pixels
    #[arg(long)]
    aa_width: Option<f32>,
    /// Directory to store the result into
    #[arg(long, default_value_os_t = default_directory())]
    out_directory: PathBuf,
    #[arg(long)]
    /// Whether to render with the CPU shaders
    use_cpu: bool,
}

fn default_directory() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("outputs")
}
