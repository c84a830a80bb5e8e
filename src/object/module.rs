use std::path::{Path, PathBuf};
use std::rc::Rc;

use diag::LineIndex;
use indexmap::IndexMap;
use waifu_syntax::ast;

use crate::env::Frame;
use crate::resolver::ResolvedVars;
use crate::value::Value;

/// The per-module data that outlives the module's evaluation: functions
/// declared in the module keep a handle to it so that later calls can
/// consult the right side table and attribute errors to the right file.
#[derive(Debug)]
pub struct ModuleCtx {
  pub name: String,
  pub file: PathBuf,
  pub lines: LineIndex,
  pub vars: ResolvedVars,
}

impl ModuleCtx {
  /// Display path used in the `In module <path> ...` diagnostic prefix.
  pub fn path(&self) -> String {
    self.file.display().to_string()
  }
}

/// Why an import could not produce a module. `Soft` faults are reported
/// against the import statement; `Fatal` means the imported module itself
/// failed and the whole run is aborting.
#[derive(Debug)]
pub enum ImportFault {
  Soft(String),
  Fatal(crate::error::Error),
}

/// A loaded module. Its source buffer is dropped once evaluation
/// completes; everything needed afterwards lives in `env` and `ctx`.
#[derive(Debug)]
pub struct Module {
  pub name: String,
  pub env: Rc<Frame>,
  pub ctx: Rc<ModuleCtx>,
}

impl Module {
  /// Every name bound in the top frame when evaluation completed, minus
  /// the preloaded builtins, in slot order.
  pub fn exported_entries(&self) -> Vec<(String, Value)> {
    self
      .env
      .entries()
      .into_iter()
      .skip(crate::builtins::NAMES.len())
      .collect()
  }

  pub fn exported_names(&self) -> Vec<String> {
    self
      .exported_entries()
      .into_iter()
      .map(|(name, _)| name)
      .collect()
  }
}

/// Loaded modules by name, plus the evaluation stack used for cycle
/// detection. Module names are file stems: `a/b/c.waifu` loads as `c`.
#[derive(Debug, Default)]
pub struct Registry {
  modules: IndexMap<String, Rc<Module>>,
  stack: Vec<String>,
}

impl Registry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, name: &str) -> Option<Rc<Module>> {
    self.modules.get(name).cloned()
  }

  pub fn insert(&mut self, module: Rc<Module>) {
    self.modules.insert(module.name.clone(), module);
  }

  /// True while a module of this name is being evaluated somewhere below
  /// us on the stack; importing it again would be a cycle.
  pub fn is_evaluating(&self, name: &str) -> bool {
    self.stack.iter().any(|n| n == name)
  }

  pub fn push(&mut self, name: &str) {
    self.stack.push(name.to_string());
  }

  pub fn pop(&mut self) {
    self.stack.pop();
  }
}

/// Maps module paths to source text.
pub trait ModuleLoader {
  fn load(&self, path: &Path) -> std::io::Result<String>;
}

/// Reads modules from the filesystem.
pub struct FsLoader;

impl ModuleLoader for FsLoader {
  fn load(&self, path: &Path) -> std::io::Result<String> {
    std::fs::read_to_string(path)
  }
}

/// Computes the file path of an import.
///
/// `a.b.c` maps to `a/b/c.waifu` relative to the working directory. A
/// leading dot resolves against the importing module's directory, and each
/// additional dot ascends one directory further.
pub fn resolve_path(import: &ast::Import, importer: &Path) -> Result<PathBuf, String> {
  let suffix: PathBuf = {
    let mut p = PathBuf::new();
    for segment in &import.path {
      p.push(segment.as_ref());
    }
    p.set_extension("waifu");
    p
  };

  if import.dots == 0 {
    return Ok(suffix);
  }

  // `.m` is a sibling of the importer, `..m` lives one directory up:
  // ancestors() yields the importer itself first, so `.m` skips one.
  match importer.ancestors().nth(import.dots) {
    Some(base) => Ok(base.join(suffix)),
    None => Err(format!(
      "'{}' can not be resolved to a valid relative path for {}.",
      dotted(import),
      importer.display()
    )),
  }
}

/// The import path as written, e.g. `..a.b`.
pub fn dotted(import: &ast::Import) -> String {
  let mut out = ".".repeat(import.dots);
  for (i, segment) in import.path.iter().enumerate() {
    if i > 0 {
      out.push('.');
    }
    out.push_str(segment.as_ref());
  }
  out
}

#[cfg(test)]
mod tests {
  use beef::lean::Cow;
  use span::Spanned;

  use super::*;

  fn import(dots: usize, path: &[&str]) -> ast::Import {
    ast::Import {
      dots,
      path: path
        .iter()
        .map(|s| Spanned::new(0..0, Cow::owned(s.to_string())))
        .collect(),
    }
  }

  #[test]
  fn absolute_imports_resolve_against_cwd() {
    let i = import(0, &["a", "b", "c"]);
    assert_eq!(
      resolve_path(&i, Path::new("x/main.waifu")).unwrap(),
      PathBuf::from("a/b/c.waifu")
    );
  }

  #[test]
  fn one_dot_is_a_sibling() {
    let i = import(1, &["util"]);
    assert_eq!(
      resolve_path(&i, Path::new("pkg/main.waifu")).unwrap(),
      PathBuf::from("pkg/util.waifu")
    );
  }

  #[test]
  fn two_dots_ascend_one_directory() {
    let i = import(2, &["shared", "util"]);
    assert_eq!(
      resolve_path(&i, Path::new("pkg/sub/main.waifu")).unwrap(),
      PathBuf::from("pkg/shared/util.waifu")
    );
  }

  #[test]
  fn too_many_dots_is_an_error() {
    let i = import(5, &["x"]);
    let err = resolve_path(&i, Path::new("main.waifu")).unwrap_err();
    assert!(err.contains("can not be resolved"), "got: {err}");
  }

  #[test]
  fn dotted_round_trip() {
    assert_eq!(dotted(&import(2, &["a", "b"])), "..a.b");
    assert_eq!(dotted(&import(0, &["m"])), "m");
  }
}
