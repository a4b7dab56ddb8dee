// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The WGSL shaders of the tilesdf renderer, together with the metadata needed
//! to build pipelines for them.
//!
//! Four shaders make up a frame:
//!
//! - `clear` resets the per-tile list heads and the binning counters.
//! - `binning` builds one linked list of command indices per tile.
//! - `write_indirect` turns the number of occupied tiles into the arguments
//!   of an indirect draw.
//! - `raster` draws one quad per occupied tile and evaluates the signed
//!   distance functions of the commands in its list.
//!
//! Your first choice should be to use the build time generated [`SHADERS`].
//! The [`compile`] module, behind the `compile` feature, loads and validates
//! the sources at run time for hot reloading. The [`cpu`] module, behind the
//! default `cpu` feature, mirrors every shader for tests and headless use.

// LINEBENDER LINT SET - lib.rs - v2
// See https://linebender.org/wiki/canonical-lints/
// These lints aren't included in Cargo.toml because they
// shouldn't apply to examples and tests
#![warn(unused_crate_dependencies)]
#![warn(clippy::print_stdout, clippy::print_stderr)]
// Targeting e.g. 32-bit means structs containing usize can give false positives for 64-bit.
#![cfg_attr(target_pointer_width = "64", warn(clippy::trivially_copy_pass_by_ref))]
// END LINEBENDER LINT SET
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs, reason = "We have many as-yet undocumented items.")]
#![allow(
    unnameable_types,
    clippy::cast_possible_truncation,
    reason = "Deferred, only apply in some feature sets so not expect"
)]

mod types;

#[cfg(feature = "compile")]
pub mod compile;
#[cfg(feature = "cpu")]
pub mod cpu;

pub use types::{BindType, BindingInfo, ShaderStage};

use std::borrow::Cow;

#[derive(Clone, Debug)]
pub struct Shader<'a> {
    pub name: Cow<'a, str>,
    pub stage: ShaderStage,
    /// Resources used by the shader, in binding order.
    ///
    /// For render shaders this is the union over the vertex and fragment
    /// entry points.
    pub bindings: Cow<'a, [BindType]>,
    pub wgsl: WgslSource<'a>,
}

#[derive(Clone, Debug)]
pub struct WgslSource<'a> {
    pub code: Cow<'a, str>,

    /// Contains the binding index of each resource listed in [`Shader::bindings`].
    /// This is guaranteed to have the same element count as `Shader::bindings`.
    ///
    /// Each index is the value of the corresponding `@binding(..)` declaration
    /// in the shader source. The bind group index is always 0.
    pub binding_indices: Cow<'a, [u8]>,
}

include!(concat!(env!("OUT_DIR"), "/shaders.rs"));

pub use generated::SHADERS;
