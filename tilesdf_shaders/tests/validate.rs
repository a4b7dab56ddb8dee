// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Checks the embedded shaders and their reflected metadata.

use naga::valid::{Capabilities, ValidationFlags, Validator};
use tilesdf_shaders::{BindType, Shader, ShaderStage, SHADERS};

fn all_shaders() -> [Shader<'static>; 4] {
    [
        SHADERS.binning,
        SHADERS.clear,
        SHADERS.raster,
        SHADERS.write_indirect,
    ]
}

#[test]
fn embedded_shaders_validate() {
    for shader in all_shaders() {
        let module = naga::front::wgsl::parse_str(&shader.wgsl.code)
            .unwrap_or_else(|err| panic!("{}: {err}", shader.name));
        Validator::new(ValidationFlags::all(), Capabilities::empty())
            .validate(&module)
            .unwrap_or_else(|err| panic!("{}: {err}", shader.name));
    }
}

#[test]
fn binding_metadata() {
    use BindType::*;
    for shader in all_shaders() {
        assert_eq!(
            shader.bindings.len(),
            shader.wgsl.binding_indices.len(),
            "{}",
            shader.name
        );
    }
    assert_eq!(
        SHADERS.clear.stage,
        ShaderStage::Compute {
            workgroup_size: [256, 1, 1]
        }
    );
    assert_eq!(*SHADERS.clear.bindings, [Uniform, Buffer, Buffer]);
    assert_eq!(
        SHADERS.binning.stage,
        ShaderStage::Compute {
            workgroup_size: [8, 8, 1]
        }
    );
    assert_eq!(
        *SHADERS.binning.bindings,
        [
            Uniform,
            BufReadOnly,
            BufReadOnly,
            BufReadOnly,
            BufReadOnly,
            Buffer,
            Buffer,
            Buffer,
            Buffer
        ]
    );
    assert_eq!(*SHADERS.write_indirect.bindings, [BufReadOnly, Buffer]);
    assert_eq!(SHADERS.raster.stage, ShaderStage::Render);
    assert_eq!(
        *SHADERS.raster.bindings,
        [
            Uniform,
            BufReadOnly,
            BufReadOnly,
            BufReadOnly,
            BufReadOnly,
            BufReadOnly,
            BufReadOnly
        ]
    );
    assert_eq!(*SHADERS.raster.wgsl.binding_indices, [0, 1, 2, 3, 4, 5, 6]);
}
