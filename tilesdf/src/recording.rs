// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct ShaderId(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ResourceId(pub NonZeroU64);

impl ResourceId {
    pub fn next() -> Self {
        static ID_COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(NonZeroU64::MIN.saturating_add(ID_COUNTER.fetch_add(1, Ordering::Relaxed)))
    }
}

/// List of [`Command`]s for an engine to execute in order.
///
/// Every dispatch and draw runs in its own pass, so the order of the
/// commands is also the order in which their writes become visible.
#[derive(Default, Debug)]
pub struct Recording {
    pub commands: Vec<Command>,
}

/// Proxy used as a handle to a buffer.
#[derive(Clone, Copy, Debug)]
pub struct BufferProxy {
    pub size: u64,
    pub id: ResourceId,
    pub name: &'static str,
}

/// Proxy used as a handle to a render target.
#[derive(Clone, Copy, Debug)]
pub struct ImageProxy {
    pub width: u32,
    pub height: u32,
    pub id: ResourceId,
}

/// Single command inside a [`Recording`] to get executed by an engine.
#[derive(Debug)]
pub enum Command {
    /// Commands to clear the buffer from an offset on for a length of the given size.
    /// If the size is [None], it clears until the end.
    Clear(BufferProxy, u64, Option<u64>),
    Dispatch(ShaderId, (u32, u32, u32), Vec<BufferProxy>),
    DrawIndirect(DrawParams),
}

/// An indirect draw of a render shader into a target.
#[derive(Debug)]
pub struct DrawParams {
    pub shader_id: ShaderId,
    /// Buffer holding a `DrawIndirect` at offset zero.
    pub indirect: BufferProxy,
    pub resources: Vec<BufferProxy>,
    pub target: ImageProxy,
    /// Premultiplied color the target is cleared to before drawing, or
    /// `None` to keep its contents.
    pub clear_color: Option<[f32; 4]>,
}

impl Recording {
    /// Appends a [`Command`] to the back of the [`Recording`].
    pub fn push(&mut self, cmd: Command) {
        self.commands.push(cmd);
    }

    pub fn dispatch<R>(&mut self, shader: ShaderId, wg_size: (u32, u32, u32), resources: R)
    where
        R: IntoIterator<Item = BufferProxy>,
    {
        let r = resources.into_iter().collect();
        self.push(Command::Dispatch(shader, wg_size, r));
    }

    /// Issue an indirect draw.
    pub fn draw_indirect(&mut self, params: DrawParams) {
        self.push(Command::DrawIndirect(params));
    }

    /// Commands to clear the whole buffer.
    pub fn clear_all(&mut self, buf: BufferProxy) {
        self.push(Command::Clear(buf, 0, None));
    }

    /// Returns a [`Vec`] containing all the [`Command`]s in order.
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}

impl BufferProxy {
    pub fn new(size: u64, name: &'static str) -> Self {
        let id = ResourceId::next();
        debug_assert!(size > 0);
        Self { id, size, name }
    }
}

impl ImageProxy {
    pub fn new(width: u32, height: u32) -> Self {
        let id = ResourceId::next();
        Self { width, height, id }
    }
}
