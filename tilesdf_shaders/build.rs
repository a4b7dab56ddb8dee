// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Preprocesses and validates the shaders, and generates the `SHADERS` table.

// These modules are also included in the main crate, where the items are reachable
#[allow(warnings, reason = "Checked elsewhere")]
#[path = "src/compile/mod.rs"]
mod compile;
#[allow(warnings, reason = "Checked elsewhere")]
#[path = "src/types.rs"]
mod types;

use std::fmt::Write;
use std::path::{Path, PathBuf};

use compile::ShaderInfo;

fn main() {
    let shader_dir = compile::shader_dir();
    for path in wgsl_files(&shader_dir) {
        println!("cargo:rerun-if-changed={}", path.display());
    }
    println!("cargo:rerun-if-changed={}", shader_dir.display());

    let shaders = match ShaderInfo::from_default() {
        Ok(shaders) => shaders,
        Err(err) => {
            for line in err.to_string().lines() {
                println!("cargo:warning={line}");
            }
            panic!("the embedded shaders failed to compile");
        }
    };
    // Sorted by name so the output is deterministic.
    let mut shaders = shaders.into_iter().collect::<Vec<_>>();
    shaders.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = String::new();
    write_table(&mut out, &shaders).expect("writing to a String can't fail");
    let out_dir = std::env::var_os("OUT_DIR").expect("cargo sets OUT_DIR");
    std::fs::write(Path::new(&out_dir).join("shaders.rs"), out)
        .expect("failed to write the shader table");
}

/// Every `.wgsl` file under `dir`, including the shared imports.
fn wgsl_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return files;
    };
    for path in entries.flatten().map(|entry| entry.path()) {
        if path.is_dir() {
            files.extend(wgsl_files(&path));
        } else if path.extension().is_some_and(|ext| ext == "wgsl") {
            files.push(path);
        }
    }
    files
}

/// Writes the `Shaders` struct, with one field per shader, and its value.
fn write_table(out: &mut String, shaders: &[(String, ShaderInfo)]) -> std::fmt::Result {
    writeln!(out, "pub struct Shaders<'a> {{")?;
    for (name, _) in shaders {
        writeln!(out, "    pub {name}: Shader<'a>,")?;
    }
    writeln!(out, "}}")?;

    writeln!(out, "mod generated {{")?;
    writeln!(out, "    use super::*;")?;
    writeln!(out, "    use BindType::*;")?;
    writeln!(out, "    pub const SHADERS: Shaders<'static> = Shaders {{")?;
    for (name, info) in shaders {
        let (types, indices): (Vec<_>, Vec<_>) = info
            .bindings
            .iter()
            .map(|binding| (binding.ty, binding.location.1 as u8))
            .unzip();
        writeln!(
            out,
            "        {name}: Shader {{ \
             name: Cow::Borrowed({name:?}), \
             stage: ShaderStage::{stage:?}, \
             bindings: Cow::Borrowed(&{types:?}), \
             wgsl: WgslSource {{ \
             code: Cow::Borrowed({code:?}), \
             binding_indices: Cow::Borrowed(&{indices:?}) }} }},",
            stage = info.stage,
            code = info.source,
        )?;
    }
    writeln!(out, "    }};")?;
    writeln!(out, "}}")?;
    Ok(())
}
