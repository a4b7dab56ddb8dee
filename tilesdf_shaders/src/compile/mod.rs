// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Preprocessing and validation of the WGSL sources.
//!
//! This runs at build time to produce [`SHADERS`](crate::SHADERS) and, with
//! the `compile` feature, at run time to reload shaders from disk.

use naga::{
    front::wgsl,
    valid::{Capabilities, ModuleInfo, ValidationError, ValidationFlags},
    AddressSpace, Module, ShaderStage as NagaStage, StorageAccess, WithSpan,
};

use std::{
    collections::{HashMap, HashSet},
    fmt, fs, io,
    path::{Path, PathBuf},
};

pub mod preprocess;

use crate::types::{BindType, BindingInfo, ShaderStage};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse shader: {0}")]
    Parse(#[from] wgsl::ParseError),
    #[error("failed to validate shader: {0}")]
    Validate(#[from] WithSpan<ValidationError>),
    #[error("shader has neither a compute `main` nor `vs_main` and `fs_main` entry points")]
    EntryPointNotFound,
    #[error("failed to read shader source: {0}")]
    Io(#[from] io::Error),
}

/// Failures of a batch of shaders, each tagged with the shader name.
#[derive(Debug, Default)]
pub struct ErrorVec(pub Vec<(String, Error)>);

impl fmt::Display for ErrorVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, err)) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{name}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorVec {}

#[derive(Debug)]
pub struct ShaderInfo {
    pub source: String,
    pub module: Module,
    pub module_info: ModuleInfo,
    pub stage: ShaderStage,
    pub bindings: Vec<BindingInfo>,
}

/// Directory holding the shader sources of this crate.
pub fn shader_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("shader")
}

impl ShaderInfo {
    /// Parses, validates and reflects a preprocessed shader.
    ///
    /// Bindings are collected over every entry point of the module.
    pub fn new(source: String) -> Result<Self, Error> {
        let module = wgsl::parse_str(&source)?;
        let module_info = naga::valid::Validator::new(
            ValidationFlags::all() & !ValidationFlags::CONTROL_FLOW_UNIFORMITY,
            Capabilities::all(),
        )
        .validate(&module)?;
        let entry = |name: &str, stage: NagaStage| {
            module
                .entry_points
                .iter()
                .position(|e| e.name == name && e.stage == stage)
        };
        let (stage, entry_indices) = if let Some(main) = entry("main", NagaStage::Compute) {
            let workgroup_size = module.entry_points[main].workgroup_size;
            (ShaderStage::Compute { workgroup_size }, vec![main])
        } else {
            match (
                entry("vs_main", NagaStage::Vertex),
                entry("fs_main", NagaStage::Fragment),
            ) {
                (Some(vs), Some(fs)) => (ShaderStage::Render, vec![vs, fs]),
                _ => return Err(Error::EntryPointNotFound),
            }
        };
        let mut bindings = vec![];
        for (var_handle, var) in module.global_variables.iter() {
            let used = entry_indices
                .iter()
                .any(|ix| !module_info.get_entry_point(*ix)[var_handle].is_empty());
            if !used {
                continue;
            }
            let Some(binding) = &var.binding else {
                continue;
            };
            let ty = match var.space {
                AddressSpace::Storage { access } if access.contains(StorageAccess::STORE) => {
                    BindType::Buffer
                }
                AddressSpace::Uniform => BindType::Uniform,
                _ => BindType::BufReadOnly,
            };
            bindings.push(BindingInfo {
                name: var.name.clone(),
                location: (binding.group, binding.binding),
                ty,
            });
        }
        bindings.sort_by_key(|res| res.location);
        Ok(Self {
            source,
            module,
            module_info,
            stage,
            bindings,
        })
    }

    /// Loads every top level `*.wgsl` file of `shader_dir`, resolving
    /// imports from its `shared` directory.
    pub fn from_dir(shader_dir: impl AsRef<Path>) -> Result<HashMap<String, Self>, ErrorVec> {
        let shader_dir = shader_dir.as_ref();
        let io_error = |err: io::Error| ErrorVec(vec![(shader_dir.display().to_string(), err.into())]);
        let imports = preprocess::get_imports(shader_dir).map_err(io_error)?;
        let defines = HashSet::new();
        let mut info = HashMap::default();
        let mut errors = ErrorVec::default();
        for entry in shader_dir.read_dir().map_err(io_error)? {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(err) => {
                    errors.0.push((shader_dir.display().to_string(), err.into()));
                    continue;
                }
            };
            if !path.is_file() || path.extension().is_none_or(|e| e != "wgsl") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let result = fs::read_to_string(&path)
                .map_err(Error::from)
                .and_then(|contents| {
                    Self::new(preprocess::preprocess(&contents, name, &defines, &imports))
                });
            match result {
                Ok(shader) => {
                    info.insert(name.to_string(), shader);
                }
                Err(err) => errors.0.push((name.to_string(), err)),
            }
        }
        if errors.0.is_empty() {
            Ok(info)
        } else {
            Err(errors)
        }
    }

    /// Loads the shaders shipped with this crate.
    pub fn from_default() -> Result<HashMap<String, Self>, ErrorVec> {
        Self::from_dir(shader_dir())
    }
}
