// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Types that are shared between the main crate and build.

/// The type of resource that will be bound to a slot in a shader.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum BindType {
    /// A storage buffer with read/write access.
    Buffer,
    /// A storage buffer with read only access.
    BufReadOnly,
    /// A small buffer to be used as uniforms.
    Uniform,
}

impl BindType {
    pub fn is_mutable(self) -> bool {
        matches!(self, Self::Buffer)
    }
}

/// Pipeline stage a shader module is written for.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ShaderStage {
    /// A compute shader with a `main` entry point.
    Compute { workgroup_size: [u32; 3] },
    /// A render shader with `vs_main` and `fs_main` entry points.
    Render,
}

#[derive(Clone, Debug)]
pub struct BindingInfo {
    pub name: Option<String>,
    pub location: (u32, u32),
    pub ty: BindType,
}
