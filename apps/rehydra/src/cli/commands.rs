//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Rendering is kept separate from printing so output can be checked
//! without capturing stdout.

use crate::error::AppError;
use crate::flatten::HeaderFlattener;
use rehydra_core::{
    Arg, Dependency, DefinitionTable, Func, JsonAccessor, Session, SessionOptions,
};
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of an environment file (100 MB).
const MAX_ENV_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file path: it must exist and be a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, AppError> {
    let canonical = path
        .canonicalize()
        .map_err(|_| AppError::InvalidPath(path.display().to_string()))?;

    if !canonical.is_file() {
        return Err(AppError::InvalidPath(path.display().to_string()));
    }

    Ok(canonical)
}

/// Read an environment file after path and size checks.
pub fn read_environment(path: &Path) -> Result<String, AppError> {
    let canonical = validate_file_path(path)?;

    let size = std::fs::metadata(&canonical)
        .map_err(|e| AppError::io(path, e))?
        .len();
    if size > MAX_ENV_FILE_SIZE {
        return Err(AppError::FileTooLarge {
            path: path.display().to_string(),
            size,
            limit: MAX_ENV_FILE_SIZE,
        });
    }

    std::fs::read_to_string(&canonical).map_err(|e| AppError::io(path, e))
}

fn print_json(output: &Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(output).unwrap_or_default()
    );
}

fn args_json(args: &[Arg]) -> Value {
    args.iter()
        .map(|arg| json!({ "name": arg.name, "type": arg.ty.to_string() }))
        .collect()
}

// =============================================================================
// REHYDRATE COMMAND
// =============================================================================

/// Rehydrate `root` from the environment in `file` and print its graph.
pub fn cmd_rehydrate(
    file: &Path,
    root: &str,
    options: SessionOptions,
    json_mode: bool,
) -> Result<(), AppError> {
    let blob = read_environment(file)?;
    let accessor = JsonAccessor::new();
    let mut session = Session::with_options(&accessor, &blob, options)?;
    let func = session.rehydrate(root)?;

    tracing::info!(root = %root, functions = session.funcs().count(), "rehydration complete");

    if json_mode {
        print_json(&render_graph_json(&func));
    } else {
        print!("{}", render_graph_text(&func));
    }
    Ok(())
}

/// One line per reachable function, followed by its uniforms and images.
#[must_use]
pub fn render_graph_text(root: &Func) -> String {
    let mut out = String::new();

    for func in root.reachable() {
        let _ = writeln!(out, "{}", func);
        let Some(body) = func.body() else { continue };
        for dep in body.dependencies() {
            match dep {
                Dependency::Uniform { name, ty } => {
                    let _ = writeln!(out, "  uniform {}: {}", name, ty);
                }
                Dependency::Image(image) => {
                    let _ = writeln!(out, "  image {}: {} (unresolved)", image.name, image.ty);
                }
                Dependency::Var(_) | Dependency::Func(_) => {}
            }
        }
    }

    out
}

/// JSON summary of every reachable function.
#[must_use]
pub fn render_graph_json(root: &Func) -> Value {
    let functions: Vec<Value> = root
        .reachable()
        .iter()
        .map(|func| {
            let dependencies: Vec<Value> = func
                .body()
                .map(|body| {
                    body.dependencies()
                        .iter()
                        .map(|dep| match dep {
                            Dependency::Func(callee) => json!({
                                "kind": dep.kind(),
                                "name": dep.name(),
                                "recursive": callee.is_recursive(),
                            }),
                            _ => json!({ "kind": dep.kind(), "name": dep.name() }),
                        })
                        .collect()
                })
                .unwrap_or_default();

            json!({
                "name": func.name(),
                "args": args_json(func.args()),
                "return_type": func.return_type().to_string(),
                "body": func.body().map(|body| body.to_string()),
                "dependencies": dependencies,
            })
        })
        .collect();

    json!({ "root": root.name(), "functions": functions })
}

// =============================================================================
// DEFINITIONS COMMAND
// =============================================================================

/// List the definition table of the environment in `file`.
pub fn cmd_definitions(file: &Path, options: SessionOptions, json_mode: bool) -> Result<(), AppError> {
    let blob = read_environment(file)?;
    let accessor = JsonAccessor::new();
    let session = Session::with_options(&accessor, &blob, options)?;

    if json_mode {
        print_json(&render_definitions_json(session.table()));
    } else {
        print!("{}", render_definitions_text(session.table()));
    }
    Ok(())
}

fn body_kind<E, D>(def: &rehydra_core::Definition<E, D>) -> &'static str {
    if def.is_reduce() { "reduce" } else { "pure" }
}

/// One line per definition: signature and body kind.
#[must_use]
pub fn render_definitions_text<E, D>(table: &DefinitionTable<E, D>) -> String {
    let mut out = String::new();
    for def in table.iter() {
        let args: Vec<_> = def
            .args
            .iter()
            .map(|arg| format!("{}: {}", arg.name, arg.ty))
            .collect();
        let _ = writeln!(
            out,
            "{}({}) -> {} [{}]",
            def.name,
            args.join(", "),
            def.return_type,
            body_kind(def)
        );
    }
    out
}

/// JSON listing of the definition table.
#[must_use]
pub fn render_definitions_json<E, D>(table: &DefinitionTable<E, D>) -> Value {
    let definitions: Vec<Value> = table
        .iter()
        .map(|def| {
            json!({
                "name": def.name,
                "args": args_json(&def.args),
                "return_type": def.return_type.to_string(),
                "kind": body_kind(def),
            })
        })
        .collect();
    json!({ "count": table.len(), "definitions": definitions })
}

// =============================================================================
// FLATTEN COMMAND
// =============================================================================

/// Flatten `headers` (resolved against `base`) to `output` or stdout.
pub fn cmd_flatten(headers: &[String], base: &Path, output: Option<&Path>) -> Result<(), AppError> {
    let mut flattener = HeaderFlattener::new(base);

    match output {
        Some(path) => {
            let mut buffer = Vec::new();
            flattener.flatten_all(headers, &mut buffer)?;
            std::fs::write(path, &buffer).map_err(|e| AppError::io(path, e))?;
            tracing::info!(
                output = %path.display(),
                headers = flattener.visited().count(),
                bytes = buffer.len(),
                "headers flattened"
            );
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            flattener.flatten_all(headers, &mut lock)?;
            lock.flush()
                .map_err(|e| AppError::io(Path::new("<stdout>"), e))?;
        }
    }
    Ok(())
}
