//! An interpreter for Waifu, a small dynamically-typed scripting language
//! with Japanese-flavored keywords and indentation-sensitive syntax.
//!
//! The pipeline runs per module: lexer → parser → resolver → tree-walking
//! evaluator. [`Waifu`] is the module manager coordinating it: it loads
//! imports, detects cycles, and owns the host I/O handles.
//!
//! ```no_run
//! let mut waifu = waifu::Waifu::new();
//! waifu.eval("print(1 + 2 * 3)").unwrap();
//! ```

mod builtins;
mod env;
mod error;
mod eval;
mod object;
mod resolver;
mod value;

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use diag::{Report, Source};
use waifu_syntax::{lexer, parser};

use crate::env::Frame;
use crate::eval::Interp;
use crate::object::module::{dotted, resolve_path, ImportFault, Module, ModuleCtx, Registry};
use crate::resolver::Resolver;

pub use crate::error::{Error, Result};
pub use crate::object::module::{FsLoader, ModuleLoader};
pub use crate::value::Value;

use waifu_syntax::ast;

/// The interpreter. One value holds everything process-wide: the module
/// registry, the evaluation stack, the loader, and the I/O handles.
pub struct Waifu {
  registry: Registry,
  loader: Box<dyn ModuleLoader>,
  output: Box<dyn Write>,
  input: Box<dyn BufRead>,
  errors: Box<dyn Write>,
  color: bool,
}

impl Default for Waifu {
  fn default() -> Self {
    Self::builder().finish()
  }
}

impl Waifu {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn builder() -> Builder {
    Builder {
      loader: Box::new(FsLoader),
      output: Box::new(io::stdout()),
      input: Box::new(io::BufReader::new(io::stdin())),
      errors: Box::new(io::stderr()),
      color: false,
    }
  }

  /// Runs the file at `path` as the entry module.
  pub fn run_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let source = match self.loader.load(path) {
      Ok(source) => source,
      Err(_) => {
        let message = format!("File at path {} does not exist.", path.display());
        let _ = writeln!(self.errors, "{message}");
        return Err(Error::Load(message));
      }
    };
    let name = path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| "main".to_string());
    self.run_module(&name, path.to_path_buf(), source).map(drop)
  }

  /// Runs `source` as a module named `main`, rooted in the working
  /// directory.
  pub fn eval(&mut self, source: &str) -> Result<()> {
    self
      .run_module("main", PathBuf::from("main.waifu"), source.to_string())
      .map(drop)
  }

  fn run_module(&mut self, name: &str, file: PathBuf, source: String) -> Result<Rc<Module>> {
    self.registry.push(name);
    let result = self.pipeline(name, file, source);
    self.registry.pop();
    result
  }

  /// Runs all stages for one module. Any stage with errors aborts before
  /// the next stage runs; the source buffer is released on return.
  fn pipeline(&mut self, name: &str, file: PathBuf, source: String) -> Result<Rc<Module>> {
    let path = file.display().to_string();
    let lines = Source::file(path.as_str(), source.as_str()).line_index();

    let tokens = match lexer::lex(&source) {
      Ok(tokens) => tokens,
      Err(errors) => {
        for e in &errors {
          self.report_error(&path, lines.line_of_span(e.span), &e.message);
        }
        return Err(Error::Syntax(errors.len()));
      }
    };

    let ast = match parser::parse(&source, tokens) {
      Ok(ast) => ast,
      Err(errors) => {
        for e in &errors {
          self.report_error(&path, lines.line_of_span(e.span), &e.message);
        }
        return Err(Error::Syntax(errors.len()));
      }
    };

    let resolution = Resolver::resolve(self, &ast, &file)?;
    if !resolution.unused.is_empty() {
      let mut message = String::from("Warning! the following variables are unused:");
      for (span, name) in &resolution.unused {
        message.push_str(&format!("\nLine[{}]: {}", lines.line_of_span(*span), name));
      }
      self.report_warning(&path, &message);
    }
    if !resolution.diagnostics.is_empty() {
      for d in &resolution.diagnostics {
        self.report_error(&path, lines.line_of_span(d.span), &d.message);
      }
      return Err(Error::Semantic(resolution.diagnostics.len()));
    }

    let ctx = Rc::new(ModuleCtx {
      name: name.to_string(),
      file,
      lines,
      vars: resolution.vars,
    });
    let env = Frame::top();
    for builtin in builtins::all() {
      env.define(builtin.name(), Value::Native(builtin));
    }
    let module = Rc::new(Module {
      name: name.to_string(),
      env,
      ctx,
    });
    self.registry.insert(module.clone());

    match Interp::run(self, &module, &ast) {
      Ok(()) => Ok(module),
      Err(e) => {
        let ctx = e.ctx.as_ref().unwrap_or(&module.ctx);
        let (path, line) = (ctx.path(), ctx.lines.line_of_span(e.span));
        self.report_error(&path, line, &e.message);
        Err(Error::Runtime)
      }
    }
  }

  /// Loads (or finds) the module an import names. Called from both the
  /// resolver and the evaluator; the first call evaluates the module, the
  /// second finds it in the registry.
  pub(crate) fn import_module(
    &mut self,
    import: &ast::Import,
    importer: &Path,
  ) -> std::result::Result<Rc<Module>, ImportFault> {
    let name = import.module_name();
    if self.registry.is_evaluating(name) {
      return Err(ImportFault::Soft(format!(
        "Import error: Cyclic import of module '{name}'."
      )));
    }
    if let Some(module) = self.registry.get(name) {
      return Ok(module);
    }

    let path =
      resolve_path(import, importer).map_err(|m| ImportFault::Soft(format!("Import error: {m}")))?;
    let source = match self.loader.load(&path) {
      Ok(source) => source,
      Err(_) => {
        return Err(ImportFault::Soft(format!(
          "Import error: Could not load '{}' from {}.",
          dotted(import),
          importer.display()
        )))
      }
    };

    let name = name.to_string();
    self
      .run_module(&name, path, source)
      .map_err(ImportFault::Fatal)
  }

  fn report_error(&mut self, path: &str, line: u32, message: &str) {
    let report = Report::error()
      .line(line)
      .message(message)
      .color(self.color)
      .build();
    let rendered = report
      .emit_to_string()
      .unwrap_or_else(|_| message.to_string());
    let _ = writeln!(self.errors, "In module {path} {rendered}");
  }

  fn report_warning(&mut self, path: &str, message: &str) {
    let report = Report::warning()
      .message(message)
      .color(self.color)
      .build();
    let rendered = report
      .emit_to_string()
      .unwrap_or_else(|_| message.to_string());
    let _ = writeln!(self.errors, "In module {path} {rendered}");
  }

  pub(crate) fn write_out(&mut self, s: &str) -> io::Result<()> {
    self.output.write_all(s.as_bytes())?;
    self.output.flush()
  }

  pub(crate) fn read_line(&mut self) -> io::Result<Option<String>> {
    let mut buf = String::new();
    if self.input.read_line(&mut buf)? == 0 {
      return Ok(None);
    }
    while buf.ends_with(&['\n', '\r'][..]) {
      buf.pop();
    }
    Ok(Some(buf))
  }
}

/// Configures a [`Waifu`] instance: where output and diagnostics go,
/// where input comes from, and how modules are loaded.
pub struct Builder {
  loader: Box<dyn ModuleLoader>,
  output: Box<dyn Write>,
  input: Box<dyn BufRead>,
  errors: Box<dyn Write>,
  color: bool,
}

impl Builder {
  pub fn loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
    self.loader = Box::new(loader);
    self
  }

  pub fn output(mut self, output: impl Write + 'static) -> Self {
    self.output = Box::new(output);
    self
  }

  pub fn input(mut self, input: impl BufRead + 'static) -> Self {
    self.input = Box::new(input);
    self
  }

  pub fn errors(mut self, errors: impl Write + 'static) -> Self {
    self.errors = Box::new(errors);
    self
  }

  /// Enables ANSI color in diagnostics.
  pub fn color(mut self, enabled: bool) -> Self {
    self.color = enabled;
    self
  }

  pub fn finish(self) -> Waifu {
    Waifu {
      registry: Registry::new(),
      loader: self.loader,
      output: self.output,
      input: self.input,
      errors: self.errors,
      color: self.color,
    }
  }
}
