// Copyright 2026 the Tilesdf Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

/// Reads every `shared/*.wgsl` file below `shader_dir`, keyed by file stem.
pub fn get_imports(shader_dir: &Path) -> io::Result<HashMap<String, String>> {
    let mut imports = HashMap::new();
    let imports_dir = shader_dir.join("shared");
    for entry in imports_dir.read_dir()? {
        let path = entry?.path();
        if path.extension().is_none_or(|e| e != "wgsl") {
            continue;
        }
        if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
            imports.insert(name.to_owned(), fs::read_to_string(&path)?);
        }
    }
    Ok(imports)
}

struct StackItem {
    active: bool,
    else_passed: bool,
}

/// Expands `#import`, `#ifdef`, `#ifndef`, `#else` and `#endif`.
///
/// Malformed directives are reported through `log::warn!` and otherwise
/// ignored, so a broken shader surfaces as a parse error later on.
pub fn preprocess(
    input: &str,
    shader_name: &str,
    defines: &HashSet<String>,
    imports: &HashMap<String, String>,
) -> String {
    let mut output = String::with_capacity(input.len());
    let mut stack: Vec<StackItem> = vec![];
    'all_lines: for (line_number, mut line) in input.lines().enumerate() {
        loop {
            if line.is_empty() {
                break;
            }
            let hash_index = line.find('#');
            let comment_index = line.find("//");
            let hash_index = match (hash_index, comment_index) {
                (Some(hash_index), None) => hash_index,
                (Some(hash_index), Some(comment_index)) if hash_index < comment_index => hash_index,
                // No directive outside a comment.
                _ => break,
            };
            let directive_start = &line[hash_index + '#'.len_utf8()..];
            let directive_len = directive_start
                .find(|c: char| !c.is_alphanumeric())
                .unwrap_or(directive_start.len());
            let directive = &directive_start[..directive_len];
            let remainder = directive_start[directive_len..].trim();
            let directive_is_at_start = line.trim_start().starts_with('#');

            match directive {
                item @ ("ifdef" | "ifndef" | "else" | "endif") if !directive_is_at_start => {
                    log::warn!(
                        "#{item} must be the first item on its line, ignoring \
                         (line {line_number} of {shader_name}.wgsl)"
                    );
                    break;
                }
                def_test @ ("ifdef" | "ifndef") => {
                    let exists = defines.contains(remainder);
                    stack.push(StackItem {
                        active: (def_test == "ifdef") == exists,
                        else_passed: false,
                    });
                    continue 'all_lines;
                }
                "else" => {
                    match stack.last_mut() {
                        Some(item) if item.else_passed => log::warn!(
                            "Second #else for the same condition \
                             (line {line_number} of {shader_name}.wgsl)"
                        ),
                        Some(item) => {
                            item.else_passed = true;
                            item.active = !item.active;
                        }
                        None => log::warn!(
                            "#else without condition (line {line_number} of {shader_name}.wgsl)"
                        ),
                    }
                    continue 'all_lines;
                }
                "endif" => {
                    if stack.pop().is_none() {
                        log::warn!("Mismatched #endif (line {line_number} of {shader_name}.wgsl)");
                    }
                    continue 'all_lines;
                }
                "import" => {
                    output.push_str(&line[..hash_index]);
                    let directive_end = &directive_start[directive_len..];
                    let Some(name_start) = directive_end.find(|c: char| !c.is_whitespace()) else {
                        log::warn!(
                            "#import needs an argument (line {line_number} of {shader_name}.wgsl)"
                        );
                        continue 'all_lines;
                    };
                    let name_start = &directive_end[name_start..];
                    let name_end = name_start
                        .find(|c: char| !(c == '_' || c.is_alphanumeric()))
                        .unwrap_or(name_start.len());
                    let import_name = &name_start[..name_end];
                    line = &name_start[name_end..];
                    match imports.get(import_name) {
                        Some(import) => {
                            if stack.iter().all(|item| item.active) {
                                output.push_str(&preprocess(import, shader_name, defines, imports));
                            }
                        }
                        None => log::warn!(
                            "Unknown import `{import_name}` (line {line_number} of {shader_name}.wgsl)"
                        ),
                    }
                    continue;
                }
                val => {
                    log::warn!(
                        "Unknown preprocessor directive `{val}` (line {line_number} of {shader_name}.wgsl)"
                    );
                    break;
                }
            }
        }
        if stack.iter().all(|item| item.active) {
            output.push_str(line);
            output.push('\n');
        }
    }
    output
}
