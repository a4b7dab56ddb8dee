// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tests which render on a real device and compare against the CPU mirrors.
//!
//! Without a compatible adapter the tests log that and pass.

use tilesdf::cpu::render_to_pixels;
use tilesdf::kurbo::{Point, Rect};
use tilesdf::peniko::color::palette;
use tilesdf::util::{block_on_wgpu, RenderContext};
use tilesdf::wgpu::{
    self, BufferDescriptor, BufferUsages, CommandEncoderDescriptor, Device, Extent3d, Queue,
    TexelCopyBufferInfo, TextureDescriptor, TextureFormat, TextureUsages,
};
use tilesdf::{CommandStream, Renderer, RendererOptions};

const WIDTH: u32 = 200;
const HEIGHT: u32 = 150;

fn scene(stream: &mut CommandStream) {
    stream.disc(Point::new(60.0, 60.0), 40.0, palette::css::RED);
    stream.begin_combination(8.0);
    stream.disc(Point::new(130.0, 80.0), 25.0, palette::css::ROYAL_BLUE);
    stream.aabox(
        Rect::new(120.0, 40.0, 180.0, 70.0),
        4.0,
        palette::css::GOLD,
    );
    stream.end_combination(true);
    stream.set_clip_rect(Rect::new(0.0, 100.0, 100.0, 150.0));
    stream.disc(Point::new(100.0, 120.0), 30.0, palette::css::LIME);
    stream.reset_clip();
}

/// Renders `frames` frames of the scene and reads back the last one.
fn render_gpu(device: &Device, queue: &Queue, renderer: &mut Renderer, frames: usize) -> Vec<u8> {
    let size = Extent3d {
        width: WIDTH,
        height: HEIGHT,
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
    renderer.resize(device, WIDTH, HEIGHT);
    for _ in 0..frames {
        renderer.begin_frame();
        scene(renderer.stream());
        renderer.end_frame(device, queue);
        renderer.bin_commands();
        renderer.flush_to_view(device, queue, &view).unwrap();
    }

    let padded_byte_width = (WIDTH * 4).next_multiple_of(256);
    let buffer = device.create_buffer(&BufferDescriptor {
        label: Some("val"),
        size: padded_byte_width as u64 * HEIGHT as u64,
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
    block_on_wgpu(device, receiver.receive())
        .expect("channel was closed")
        .unwrap();
    let data = buf_slice.get_mapped_range();
    let mut pixels = Vec::with_capacity((WIDTH * HEIGHT * 4) as usize);
    for row in 0..HEIGHT {
        let start = (row * padded_byte_width) as usize;
        pixels.extend(&data[start..start + (WIDTH * 4) as usize]);
    }
    pixels
}

fn with_device(test: impl FnOnce(&Device, &Queue)) {
    let mut context = RenderContext::new();
    let Some(device_id) = pollster::block_on(context.device(None)) else {
        eprintln!("no compatible device, skipping");
        return;
    };
    let handle = &context.devices[device_id];
    test(&handle.device, &handle.queue);
}

#[test]
fn gpu_matches_cpu() {
    with_device(|device, queue| {
        let mut renderer = Renderer::new(device, RendererOptions::default()).unwrap();
        let gpu = render_gpu(device, queue, &mut renderer, 1);

        let mut stream = CommandStream::new(RendererOptions::default().capacities);
        stream.set_viewport(WIDTH, HEIGHT);
        stream.begin_frame();
        scene(&mut stream);
        stream.end_frame();
        let cpu = render_to_pixels(
            &stream,
            renderer.render_params(),
            RendererOptions::default().capacities.nodes,
        )
        .unwrap();

        assert_eq!(gpu.len(), cpu.pixels.len());
        let total: u64 = gpu
            .iter()
            .zip(&cpu.pixels)
            .map(|(a, b)| u64::from(a.abs_diff(*b)))
            .sum();
        let mean = total as f64 / gpu.len() as f64;
        assert!(mean < 0.5, "mean channel difference {mean}");

        let counters = renderer.bin_counters(device, queue).unwrap();
        assert_eq!(counters, cpu.counters);
        assert_eq!(counters.failed, 0);
    });
}

#[test]
fn frames_outnumbering_slots_complete() {
    with_device(|device, queue| {
        let options = RendererOptions {
            wait_for_completion: false,
            ..Default::default()
        };
        let mut renderer = Renderer::new(device, options).unwrap();
        let pixels = render_gpu(device, queue, &mut renderer, 10);
        device.poll(wgpu::PollType::wait_indefinitely()).unwrap();

        let stats = renderer.stats();
        assert_eq!(stats.completed_frames, 10);
        assert_eq!(stats.in_flight, 0);
        assert!(stats.stream.commands > 0);
        // Center of the red disc.
        let ix = ((60 * WIDTH + 60) * 4) as usize;
        assert_eq!(&pixels[ix..ix + 4], &[0xff, 0, 0, 0xff]);
    });
}

#[test]
fn reload_keeps_rendering() {
    with_device(|device, queue| {
        let mut renderer = Renderer::new(device, RendererOptions::default()).unwrap();
        renderer.reload_shaders(device).unwrap();
        let pixels = render_gpu(device, queue, &mut renderer, 1);
        // Far corner is background.
        let ix = (((HEIGHT - 1) * WIDTH + WIDTH - 1) * 4) as usize;
        assert_eq!(&pixels[ix..ix + 4], &[0x1e, 0x1e, 0x24, 0xff]);
    });
}

#[test]
fn surface_format_sets_target_format() {
    with_device(|device, _| {
        let renderer = Renderer::new(
            device,
            RendererOptions {
                surface_format: Some(TextureFormat::Bgra8Unorm),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(renderer.target_format(), TextureFormat::Bgra8Unorm);
    });
}

#[cfg(feature = "hot_reload")]
fn copy_shader_dir(from: &std::path::Path, to: &std::path::Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let path = entry.unwrap().path();
        let target = to.join(path.file_name().unwrap());
        if path.is_dir() {
            copy_shader_dir(&path, &target);
        } else {
            std::fs::copy(&path, &target).unwrap();
        }
    }
}

#[cfg(feature = "hot_reload")]
#[test]
fn failed_reload_keeps_previous_pipelines() {
    with_device(|device, queue| {
        let dir = std::env::temp_dir().join(format!("tilesdf-shaders-{}", std::process::id()));
        copy_shader_dir(&tilesdf_shaders::compile::shader_dir(), &dir);
        let mut renderer = Renderer::new(
            device,
            RendererOptions {
                shader_dir: Some(dir.clone()),
                ..Default::default()
            },
        )
        .unwrap();

        std::fs::write(dir.join("binning.wgsl"), "@compute fn main( {").unwrap();
        let reloaded = renderer.reload_shaders(device);
        std::fs::remove_dir_all(&dir).unwrap();
        assert!(reloaded.is_err());

        let pixels = render_gpu(device, queue, &mut renderer, 1);
        // Center of the red disc.
        let ix = ((60 * WIDTH + 60) * 4) as usize;
        assert_eq!(&pixels[ix..ix + 4], &[0xff, 0, 0, 0xff]);
    });
}
