// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::borrow::Cow;
use std::collections::HashMap;

use tilesdf_shaders::BindType;
use wgpu::{
    BindGroup, BindGroupLayout, BindGroupLayoutEntry, BindingType, Buffer, BufferBindingType,
    ColorTargetState, CommandEncoderDescriptor, ComputePassDescriptor, ComputePipeline, Device,
    PipelineCompilationOptions, PipelineLayout, Queue, RenderPipeline, ShaderModule, ShaderStages,
    TextureView,
};

use crate::recording::{BufferProxy, Command, ImageProxy, Recording, ResourceId, ShaderId};
use crate::util::block_on_wgpu;
use crate::{Error, Result};

#[derive(Default)]
pub(crate) struct WgpuEngine {
    shaders: Vec<Shader>,
    /// Pipeline creation errors captured since the last [`WgpuEngine::take_failure`].
    failures: Vec<(&'static str, wgpu::Error)>,
}

enum PipelineState {
    Compute(ComputePipeline),
    Render(RenderPipeline),
}

struct WgpuShader {
    pipeline: PipelineState,
    bind_group_layout: BindGroupLayout,
}

struct Shader {
    label: &'static str,
    /// `None` if the pipeline failed to build. Work using it is skipped.
    wgpu: Option<WgpuShader>,
    reported_missing: bool,
}

pub(crate) enum ExternalResource<'a> {
    Buffer(BufferProxy, &'a Buffer),
    Image(ImageProxy, &'a TextureView),
}

/// The transient bind map contains the resources of a single call of
/// `run_recording()`.
///
/// Every buffer used by the renderer is owned outside the engine, so this is
/// the only place proxies get resolved.
#[derive(Default)]
struct TransientBindMap<'a> {
    bufs: HashMap<ResourceId, &'a Buffer>,
    images: HashMap<ResourceId, &'a TextureView>,
}

impl WgpuEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn add(&mut self, label: &'static str, wgpu: Option<WgpuShader>) -> ShaderId {
        let id = self.shaders.len();
        self.shaders.push(Shader {
            label,
            wgpu,
            reported_missing: false,
        });
        ShaderId(id)
    }

    /// Runs `create` inside a validation error scope.
    ///
    /// A failed pipeline is logged and recorded, and the shader is registered
    /// without one.
    fn add_checked(
        &mut self,
        device: &Device,
        label: &'static str,
        create: impl FnOnce() -> WgpuShader,
    ) -> ShaderId {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = create();
        match block_on_wgpu(device, device.pop_error_scope()) {
            None => self.add(label, Some(shader)),
            Some(err) => {
                log::error!("failed to create pipeline for {label}: {err}");
                self.failures.push((label, err));
                self.add(label, None)
            }
        }
    }

    /// Registers a shader which has no pipeline, for example because its
    /// source could not be found.
    pub fn add_missing_shader(&mut self, label: &'static str) -> ShaderId {
        self.add(label, None)
    }

    /// Add a compute shader with a `main` entry point.
    ///
    /// Only one bind group is supported, with bindings numbered in the order
    /// of `layout`.
    pub fn add_compute_shader(
        &mut self,
        device: &Device,
        label: &'static str,
        wgsl: Cow<'static, str>,
        layout: &[BindType],
    ) -> ShaderId {
        let entries = layout_entries(layout.iter().map(|ty| (*ty, ShaderStages::COMPUTE)));
        self.add_checked(device, label, || {
            let parts = PipelineParts::new(device, label, wgsl, &entries);
            let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&parts.pipeline_layout),
                module: &parts.module,
                entry_point: Some("main"),
                compilation_options: PipelineCompilationOptions::default(),
                cache: None,
            });
            parts.finish(PipelineState::Compute(pipeline))
        })
    }

    /// Add a render shader with `vs_main` and `fs_main` entry points and no
    /// vertex buffers. Tiles are drawn as non-indexed triangle lists.
    pub fn add_render_shader(
        &mut self,
        device: &Device,
        label: &'static str,
        wgsl: Cow<'static, str>,
        bind_layout: &[(BindType, ShaderStages)],
        color_attachment: ColorTargetState,
    ) -> ShaderId {
        let entries = layout_entries(bind_layout.iter().copied());
        self.add_checked(device, label, || {
            let parts = PipelineParts::new(device, label, wgsl, &entries);
            let module = &parts.module;
            let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&parts.pipeline_layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(color_attachment)],
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            });
            parts.finish(PipelineState::Render(pipeline))
        })
    }

    /// Returns the first pipeline error captured since the last call.
    pub fn take_failure(&mut self) -> Option<(&'static str, wgpu::Error)> {
        let mut failures = std::mem::take(&mut self.failures).into_iter();
        failures.next()
    }

    /// Returns the pipeline of `id`, logging once if it is missing.
    fn pipeline(&mut self, id: ShaderId) -> Option<&WgpuShader> {
        let shader = &mut self.shaders[id.0];
        if shader.wgpu.is_none() && !shader.reported_missing {
            log::error!("no pipeline for {}, skipping work which uses it", shader.label);
            shader.reported_missing = true;
        }
        shader.wgpu.as_ref()
    }

    pub fn run_recording(
        &mut self,
        device: &Device,
        queue: &Queue,
        recording: &Recording,
        external_resources: &[ExternalResource<'_>],
        label: &'static str,
    ) -> Result<()> {
        let transient_map = TransientBindMap::new(external_resources);

        let mut encoder =
            device.create_command_encoder(&CommandEncoderDescriptor { label: Some(label) });
        for command in &recording.commands {
            match command {
                Command::Clear(proxy, offset, size) => {
                    let buf = transient_map.get_buf(proxy, "clear")?;
                    encoder.clear_buffer(buf, *offset, *size);
                }
                Command::Dispatch(shader_id, wg_size, bindings) => {
                    let (x, y, z) = *wg_size;
                    if x == 0 || y == 0 || z == 0 {
                        continue;
                    }
                    let Some(shader) = self.pipeline(*shader_id) else {
                        continue;
                    };
                    let PipelineState::Compute(pipeline) = &shader.pipeline else {
                        panic!("cannot issue a dispatch with a render pipeline");
                    };
                    let bind_group = transient_map.create_bind_group(
                        device,
                        &shader.bind_group_layout,
                        bindings,
                        "dispatch",
                    )?;
                    let mut cpass = encoder.begin_compute_pass(&ComputePassDescriptor::default());
                    cpass.set_pipeline(pipeline);
                    cpass.set_bind_group(0, &bind_group, &[]);
                    cpass.dispatch_workgroups(x, y, z);
                }
                Command::DrawIndirect(draw_params) => {
                    let render_target = transient_map.get_image(&draw_params.target);
                    let indirect = transient_map.get_buf(&draw_params.indirect, "indirect draw")?;
                    let shader = self.pipeline(draw_params.shader_id);
                    let bind_group = shader
                        .map(|shader| {
                            transient_map.create_bind_group(
                                device,
                                &shader.bind_group_layout,
                                &draw_params.resources,
                                "draw",
                            )
                        })
                        .transpose()?;
                    // The pass runs even without a pipeline so the target is still cleared.
                    let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: None,
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: render_target,
                            depth_slice: None,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: draw_params.clear_color.map_or(wgpu::LoadOp::Load, |[r, g, b, a]| {
                                    wgpu::LoadOp::Clear(wgpu::Color {
                                        r: r.into(),
                                        g: g.into(),
                                        b: b.into(),
                                        a: a.into(),
                                    })
                                }),
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: None,
                        occlusion_query_set: None,
                        timestamp_writes: None,
                    });
                    if let (Some(shader), Some(bind_group)) = (shader, bind_group) {
                        let PipelineState::Render(pipeline) = &shader.pipeline else {
                            panic!("cannot issue a draw with a compute pipeline");
                        };
                        rpass.set_pipeline(pipeline);
                        rpass.set_bind_group(0, &bind_group, &[]);
                        rpass.draw_indirect(indirect, 0);
                    }
                }
            }
        }
        queue.submit(Some(encoder.finish()));
        Ok(())
    }
}

/// The module and layouts shared by both kinds of pipeline.
struct PipelineParts {
    module: ShaderModule,
    bind_group_layout: BindGroupLayout,
    pipeline_layout: PipelineLayout,
}

impl PipelineParts {
    fn new(
        device: &Device,
        label: &str,
        wgsl: Cow<'_, str>,
        entries: &[BindGroupLayoutEntry],
    ) -> Self {
        // Sources can come from disk on reload, so naga validation stays on.
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(wgsl),
        });
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries,
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        Self {
            module,
            bind_group_layout,
            pipeline_layout,
        }
    }

    fn finish(self, pipeline: PipelineState) -> WgpuShader {
        WgpuShader {
            pipeline,
            bind_group_layout: self.bind_group_layout,
        }
    }
}

/// One buffer binding per entry, numbered from zero.
fn layout_entries(
    layout: impl Iterator<Item = (BindType, ShaderStages)>,
) -> Vec<BindGroupLayoutEntry> {
    layout
        .zip(0..)
        .map(|((bind_type, visibility), binding)| {
            let ty = match bind_type {
                BindType::Uniform => BufferBindingType::Uniform,
                storage => BufferBindingType::Storage {
                    read_only: !storage.is_mutable(),
                },
            };
            BindGroupLayoutEntry {
                binding,
                visibility,
                ty: BindingType::Buffer {
                    ty,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }
        })
        .collect()
}

impl<'a> TransientBindMap<'a> {
    /// Indexes the caller's buffers and views by proxy id.
    fn new(external_resources: &'a [ExternalResource<'_>]) -> Self {
        let mut map = Self::default();
        for resource in external_resources {
            match *resource {
                ExternalResource::Buffer(proxy, buffer) => {
                    map.bufs.insert(proxy.id, buffer);
                }
                ExternalResource::Image(proxy, view) => {
                    map.images.insert(proxy.id, view);
                }
            }
        }
        map
    }

    fn get_buf(&self, proxy: &BufferProxy, usage: &'static str) -> Result<&'a Buffer> {
        self.bufs
            .get(&proxy.id)
            .copied()
            .ok_or(Error::UnavailableBufferUsed(proxy.name, usage))
    }

    fn get_image(&self, proxy: &ImageProxy) -> &'a TextureView {
        // All render passes target a view handed in by the caller.
        self.images
            .get(&proxy.id)
            .copied()
            .expect("texture not materialized")
    }

    fn create_bind_group(
        &self,
        device: &Device,
        layout: &BindGroupLayout,
        bindings: &[BufferProxy],
        usage: &'static str,
    ) -> Result<BindGroup> {
        let entries = bindings
            .iter()
            .enumerate()
            .map(|(i, proxy)| {
                Ok(wgpu::BindGroupEntry {
                    binding: i as u32,
                    resource: self.get_buf(proxy, usage)?.as_entire_binding(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: None,
            layout,
            entries: &entries,
        }))
    }
}
