// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! CPU implementations of the shaders.
//!
//! Each function takes the resources in the binding order of its shader, so
//! a frame can be run without a GPU for testing and headless rendering. The
//! render shader has no bindable output; [`raster`] takes the target pixels
//! as one extra read/write buffer of packed RGBA8 after the shader bindings.

// Allow un-idiomatic Rust to more closely match shaders
#![expect(
    clippy::needless_range_loop,
    reason = "Keeps code easily comparable to GPU shaders"
)]

mod binning;
mod clear;
mod raster;
pub mod sdf;
mod util;
mod write_indirect;

pub use binning::binning;
pub use clear::clear;
pub use raster::raster;
pub use util::{pack4x8unorm, unpack4x8unorm, Vec2};
pub use write_indirect::write_indirect;

use std::cell::{Ref, RefCell, RefMut};
use std::ops::Deref;

use bytemuck::Pod;

/// A resource bound to a CPU shader.
#[derive(Clone, Copy)]
pub enum CpuBinding<'a> {
    /// Data the shader only reads, such as a uniform.
    Buffer(&'a [u8]),
    /// A `read_write` storage buffer.
    BufferRW(&'a RefCell<Vec<u8>>),
}

/// Shared view of a binding's contents.
pub enum BindingRef<'a, T: ?Sized> {
    Slice(&'a T),
    Cell(Ref<'a, T>),
}

impl<T: ?Sized> Deref for BindingRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        match self {
            BindingRef::Slice(s) => s,
            BindingRef::Cell(r) => r,
        }
    }
}

impl<'a> CpuBinding<'a> {
    fn map<T: ?Sized + 'static>(&self, f: impl Fn(&[u8]) -> &T) -> BindingRef<'_, T> {
        match self {
            CpuBinding::Buffer(b) => BindingRef::Slice(f(*b)),
            CpuBinding::BufferRW(b) => BindingRef::Cell(Ref::map(b.borrow(), |buf| f(buf.as_slice()))),
        }
    }

    fn cell(&self) -> &'a RefCell<Vec<u8>> {
        match self {
            CpuBinding::Buffer(_) => panic!("read-only binding used as read_write"),
            CpuBinding::BufferRW(b) => b,
        }
    }

    /// Views the start of the binding as one `T`, like a WGSL struct binding.
    pub fn as_typed<T: Pod>(&self) -> BindingRef<'_, T> {
        self.map(|b| bytemuck::from_bytes(&b[..size_of::<T>()]))
    }

    pub fn as_typed_mut<T: Pod>(&self) -> RefMut<'a, T> {
        RefMut::map(self.cell().borrow_mut(), |b| {
            bytemuck::from_bytes_mut(&mut b[..size_of::<T>()])
        })
    }

    /// Views the binding as a runtime-sized array.
    pub fn as_slice<T: Pod>(&self) -> BindingRef<'_, [T]> {
        self.map(|b| bytemuck::cast_slice(&b[..b.len() / size_of::<T>() * size_of::<T>()]))
    }

    pub fn as_slice_mut<T: Pod>(&self) -> RefMut<'a, [T]> {
        RefMut::map(self.cell().borrow_mut(), |b| {
            let len = b.len() / size_of::<T>() * size_of::<T>();
            bytemuck::cast_slice_mut(&mut b[..len])
        })
    }
}
