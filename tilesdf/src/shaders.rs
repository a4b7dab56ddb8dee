// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Load rendering shaders.

use tilesdf_shaders::BindType::{self, BufReadOnly, Buffer, Uniform};
use wgpu::{Device, ShaderStages, TextureFormat};

use crate::cpu::CpuEngine;
use crate::recording::ShaderId;
use crate::wgpu_engine::WgpuEngine;
use crate::{Error, RendererOptions};

/// Bindings of `clear.wgsl`.
pub(crate) const CLEAR_BINDINGS: [BindType; 3] = [Uniform, Buffer, Buffer];

/// Bindings of `binning.wgsl`.
pub(crate) const BINNING_BINDINGS: [BindType; 9] = [
    Uniform,
    BufReadOnly,
    BufReadOnly,
    BufReadOnly,
    BufReadOnly,
    Buffer,
    Buffer,
    Buffer,
    Buffer,
];

/// Bindings of `write_indirect.wgsl`.
pub(crate) const WRITE_INDIRECT_BINDINGS: [BindType; 2] = [BufReadOnly, Buffer];

/// Bindings of `raster.wgsl`, visible to both stages.
pub(crate) const RASTER_BINDINGS: [BindType; 7] = [
    Uniform,
    BufReadOnly,
    BufReadOnly,
    BufReadOnly,
    BufReadOnly,
    BufReadOnly,
    BufReadOnly,
];

/// Workgroup size of `clear.wgsl`.
pub(crate) const CLEAR_WG: u32 = 256;

/// Workgroup extent of `binning.wgsl` along each axis.
pub(crate) const BINNING_WG: u32 = 8;

// Shaders for the full pipeline
pub struct FullShaders {
    pub clear: ShaderId,
    pub binning: ShaderId,
    pub write_indirect: ShaderId,
    pub raster: ShaderId,
}

pub(crate) fn full_shaders(
    device: &Device,
    engine: &mut WgpuEngine,
    options: &RendererOptions,
) -> Result<FullShaders, Error> {
    #[cfg(feature = "hot_reload")]
    let mut shaders = match &options.shader_dir {
        Some(dir) => tilesdf_shaders::compile::ShaderInfo::from_dir(dir)?,
        None => tilesdf_shaders::compile::ShaderInfo::from_default()?,
    };
    #[cfg(not(feature = "hot_reload"))]
    let shaders = tilesdf_shaders::SHADERS;

    macro_rules! source {
        ($name:ident) => {{
            #[cfg(feature = "hot_reload")]
            let source = shaders
                .remove(stringify!($name))
                .map(|info| std::borrow::Cow::Owned(info.source));
            #[cfg(not(feature = "hot_reload"))]
            let source = Some(shaders.$name.wgsl.code.clone());
            if source.is_none() {
                log::error!("shader {} was not found", stringify!($name));
            }
            source
        }};
    }
    macro_rules! add_shader {
        ($name:ident, $bindings:expr) => {{
            let label = concat!("tilesdf.", stringify!($name));
            match source!($name) {
                Some(source) => engine.add_compute_shader(device, label, source, &$bindings),
                None => engine.add_missing_shader(label),
            }
        }};
    }

    let clear = add_shader!(clear, CLEAR_BINDINGS);
    let binning = add_shader!(binning, BINNING_BINDINGS);
    let write_indirect = add_shader!(write_indirect, WRITE_INDIRECT_BINDINGS);

    let raster_layout = RASTER_BINDINGS.map(|ty| (ty, ShaderStages::VERTEX_FRAGMENT));
    let raster = match source!(raster) {
        Some(source) => engine.add_render_shader(
            device,
            "tilesdf.raster",
            source,
            &raster_layout,
            wgpu::ColorTargetState {
                format: options.surface_format.unwrap_or(TextureFormat::Rgba8Unorm),
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            },
        ),
        None => engine.add_missing_shader("tilesdf.raster"),
    };

    Ok(FullShaders {
        clear,
        binning,
        write_indirect,
        raster,
    })
}

/// Registers the CPU mirrors of the shaders.
pub(crate) fn cpu_shaders(engine: &mut CpuEngine) -> FullShaders {
    use tilesdf_shaders::cpu;

    FullShaders {
        clear: engine.add_shader(cpu::clear),
        binning: engine.add_shader(cpu::binning),
        write_indirect: engine.add_shader(cpu::write_indirect),
        raster: engine.add_shader(cpu::raster),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilesdf_shaders::{ShaderStage, SHADERS};

    #[test]
    fn bind_layouts_match_shader_sources() {
        assert_eq!(&*SHADERS.clear.bindings, &CLEAR_BINDINGS);
        assert_eq!(&*SHADERS.binning.bindings, &BINNING_BINDINGS);
        assert_eq!(&*SHADERS.write_indirect.bindings, &WRITE_INDIRECT_BINDINGS);
        assert_eq!(&*SHADERS.raster.bindings, &RASTER_BINDINGS);
    }

    #[test]
    fn binding_indices_are_sequential() {
        for shader in [
            &SHADERS.clear,
            &SHADERS.binning,
            &SHADERS.write_indirect,
            &SHADERS.raster,
        ] {
            let expected = (0..shader.bindings.len() as u8).collect::<Vec<_>>();
            assert_eq!(&*shader.wgsl.binding_indices, &expected, "{}", shader.name);
        }
    }

    #[test]
    fn workgroup_sizes_match_dispatches() {
        assert_eq!(
            SHADERS.clear.stage,
            ShaderStage::Compute {
                workgroup_size: [CLEAR_WG, 1, 1]
            }
        );
        assert_eq!(
            SHADERS.binning.stage,
            ShaderStage::Compute {
                workgroup_size: [BINNING_WG, BINNING_WG, 1]
            }
        );
        assert_eq!(SHADERS.raster.stage, ShaderStage::Render);
    }
}
