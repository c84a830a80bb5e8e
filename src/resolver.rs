//! Name resolution.
//!
//! A pre-execution pass over the syntax tree that assigns every name
//! reference a lexical depth and slot, validates the scoping rules, and
//! collects unused-variable diagnostics. Imports are driven from here:
//! the imported module must be fully evaluated before its exportable
//! names can be defined in the importer's scope.

use std::collections::HashMap;
use std::mem;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use span::Span;
use waifu_syntax::ast::{self, NodeId};

use crate::error::Error;
use crate::object::module::ImportFault;
use crate::{builtins, Waifu};

/// Side table produced for the evaluator: node → (lexical depth, slot).
///
/// Depth counts parent hops from the innermost frame at the reference's
/// dynamic location; the slot is the index of the binding within its
/// frame.
pub type ResolvedVars = HashMap<NodeId, (usize, usize)>;

/// A non-fatal resolution diagnostic.
#[derive(Debug)]
pub struct Diagnostic {
  pub message: String,
  pub span: Span,
}

/// Everything the pass produces. `diagnostics` are errors that abort the
/// pipeline before evaluation; `unused` feeds the grouped warning.
#[derive(Debug)]
pub struct Resolution {
  pub vars: ResolvedVars,
  pub diagnostics: Vec<Diagnostic>,
  pub unused: Vec<(Span, String)>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FuncKind {
  None,
  Function,
  Method,
  Initializer,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ClassKind {
  None,
  Class,
  Subclass,
}

struct VarState {
  used: bool,
  span: Span,
}

pub struct Resolver<'w> {
  waifu: &'w mut Waifu,
  /// File path of the module being resolved, for relative imports.
  file: PathBuf,
  scopes: Vec<IndexMap<String, VarState>>,
  globals: IndexMap<String, VarState>,
  vars: ResolvedVars,
  diagnostics: Vec<Diagnostic>,
  unused: Vec<(Span, String)>,
  func: FuncKind,
  class: ClassKind,
}

impl<'w> Resolver<'w> {
  /// Resolves a whole module. `Err` means a nested import aborted the run;
  /// this module's own problems are reported through [`Resolution`].
  pub fn resolve(waifu: &'w mut Waifu, ast: &ast::Module, file: &Path) -> Result<Resolution, Error> {
    let mut globals = IndexMap::new();
    for name in builtins::NAMES {
      globals.insert(
        name.to_string(),
        VarState {
          used: true,
          span: Span::default(),
        },
      );
    }

    let mut resolver = Resolver {
      waifu,
      file: file.to_path_buf(),
      scopes: Vec::new(),
      globals,
      vars: ResolvedVars::new(),
      diagnostics: Vec::new(),
      unused: Vec::new(),
      func: FuncKind::None,
      class: ClassKind::None,
    };

    for stmt in &ast.body {
      resolver.stmt(stmt)?;
    }
    let globals = mem::take(&mut resolver.globals);
    resolver.check_unused(globals);

    Ok(Resolution {
      vars: resolver.vars,
      diagnostics: resolver.diagnostics,
      unused: resolver.unused,
    })
  }

  fn error(&mut self, span: Span, message: String) {
    self.diagnostics.push(Diagnostic { message, span });
  }

  fn begin_scope(&mut self) {
    self.scopes.push(IndexMap::new());
  }

  fn end_scope(&mut self) {
    let scope = self.scopes.pop().expect("scope stack never empties early");
    self.check_unused(scope);
  }

  fn check_unused(&mut self, scope: IndexMap<String, VarState>) {
    for (name, state) in scope {
      if !state.used {
        self.unused.push((state.span, name));
      }
    }
  }

  /// Binds `name` in the innermost scope (or the globals below it).
  fn define(&mut self, name: &str, span: Span, used: bool) {
    let state = VarState { used, span };
    match self.scopes.last_mut() {
      Some(scope) => {
        scope.insert(name.to_string(), state);
      }
      None => {
        self.globals.insert(name.to_string(), state);
      }
    }
  }

  /// Reports `message` if any enclosing local scope already binds `name`.
  /// The globals are exempt: top-level names may be redeclared.
  fn check_already_defined(&mut self, name: &str, span: Span, message: String) {
    if self.scopes.iter().any(|scope| scope.contains_key(name)) {
      self.error(span, message);
    }
  }

  /// Walks the scope chain for `name` and records its depth and slot
  /// against `id`. Reads mark the binding used; assignments do not.
  fn resolve_name(&mut self, name: &str, id: NodeId, mark_used: bool) -> bool {
    for (depth, scope) in self.scopes.iter_mut().rev().enumerate() {
      if let Some((slot, _, state)) = scope.get_full_mut(name) {
        if mark_used {
          state.used = true;
        }
        self.vars.insert(id, (depth, slot));
        return true;
      }
    }
    if let Some((slot, _, state)) = self.globals.get_full_mut(name) {
      if mark_used {
        state.used = true;
      }
      self.vars.insert(id, (self.scopes.len(), slot));
      return true;
    }
    false
  }

  /// `baka` requires the name to be fresh; a plain assignment binds the
  /// name it resolves to, or defines a new one.
  fn assign_target(&mut self, id: NodeId, name: &ast::Ident, new_var: bool) {
    if new_var {
      self.check_already_defined(
        name.as_ref(),
        name.span,
        format!(
          "Can't use 'baka' cause '{}' is already defined in current scope.",
          name.as_ref()
        ),
      );
    }
    if new_var || !self.resolve_name(name.as_ref(), id, false) {
      self.define(name.as_ref(), name.span, false);
    }
  }

  fn stmt(&mut self, stmt: &ast::Stmt) -> Result<(), Error> {
    let span = stmt.span;
    match &**stmt {
      ast::StmtKind::Var(v) => {
        // run the initializer, then put the variable in scope
        self.expr(&v.value)?;
        self.assign_target(v.id, &v.name, v.new_var);
        Ok(())
      }
      ast::StmtKind::Expr(e) => self.expr(e),
      ast::StmtKind::Block(body) => self.scoped(body),
      ast::StmtKind::If(i) => {
        self.expr(&i.cond)?;
        self.scoped(&i.then)?;
        if let Some(otherwise) = &i.otherwise {
          self.scoped(otherwise)?;
        }
        Ok(())
      }
      ast::StmtKind::While(w) => {
        self.expr(&w.cond)?;
        self.scoped(&w.body)
      }
      ast::StmtKind::Ctrl(ctrl) => {
        match &**ctrl {
          ast::Ctrl::Return(value) => {
            if self.func == FuncKind::None {
              self.error(span, "Can't use 'shinu' outside of functions.".to_string());
            }
            if let Some(value) = value {
              if self.func == FuncKind::Initializer {
                self.error(span, "Can't return a value from 'shison'.".to_string());
              }
              self.expr(value)?;
            }
          }
          ast::Ctrl::Break | ast::Ctrl::Continue => {}
        }
        Ok(())
      }
      ast::StmtKind::Func(f) => self.func_decl(f),
      ast::StmtKind::Class(c) => self.class_decl(c),
      ast::StmtKind::Import(import) => self.import_stmt(import, span),
    }
  }

  fn scoped(&mut self, body: &[ast::Stmt]) -> Result<(), Error> {
    self.begin_scope();
    let result = body.iter().try_for_each(|stmt| self.stmt(stmt));
    self.end_scope();
    result
  }

  fn func_decl(&mut self, f: &ast::Func) -> Result<(), Error> {
    if let Some(decorator) = &f.decorator {
      // unresolved decorators late-bind at runtime
      self.resolve_name(decorator.name.as_ref(), decorator.id, true);
    }
    if !f.is_lambda() {
      self.check_already_defined(
        f.name.as_ref(),
        f.name.span,
        format!(
          "Can not redefine function as '{}' already exists in current scope.",
          f.name.as_ref()
        ),
      );
      self.define(f.name.as_ref(), f.name.span, true);
    }
    self.function_body(f, FuncKind::Function)
  }

  fn function_body(&mut self, f: &ast::Func, kind: FuncKind) -> Result<(), Error> {
    let enclosing = mem::replace(&mut self.func, kind);
    self.begin_scope();
    for param in &f.params {
      self.define(param.as_ref(), param.span, false);
    }
    let result = f.body.iter().try_for_each(|stmt| self.stmt(stmt));
    self.end_scope();
    self.func = enclosing;
    result
  }

  fn class_decl(&mut self, c: &ast::Class) -> Result<(), Error> {
    self.check_already_defined(
      c.name.as_ref(),
      c.name.span,
      format!(
        "Can not redefine class as '{}' already exists in current scope.",
        c.name.as_ref()
      ),
    );
    self.define(c.name.as_ref(), c.name.span, true);

    for sup in &c.supers {
      if sup.name == c.name {
        self.error(sup.name.span, "A class can't inherit from itself.".to_string());
      } else {
        // unresolved superclasses late-bind at runtime
        self.resolve_name(sup.name.as_ref(), sup.id, true);
      }
    }

    let kind = if c.supers.is_empty() {
      ClassKind::Class
    } else {
      ClassKind::Subclass
    };
    let enclosing = mem::replace(&mut self.class, kind);

    // methods resolve inside a `watashi` scope, itself inside a `haha`
    // scope when there are superclasses; the evaluator builds the same
    // frames around method calls
    if kind == ClassKind::Subclass {
      self.begin_scope();
      self.define("haha", c.name.span, true);
    }
    self.begin_scope();
    self.define("watashi", c.name.span, true);

    let mut result = Ok(());
    for method in &c.methods {
      let kind = if !method.is_static && method.func.name.as_ref() == "shison" {
        FuncKind::Initializer
      } else {
        FuncKind::Method
      };
      result = self.function_body(&method.func, kind);
      if result.is_err() {
        break;
      }
    }

    self.end_scope();
    if kind == ClassKind::Subclass {
      self.end_scope();
    }
    self.class = enclosing;
    result
  }

  fn import_stmt(&mut self, import: &ast::Import, span: Span) -> Result<(), Error> {
    let file = self.file.clone();
    match self.waifu.import_module(import, &file) {
      Ok(module) => {
        // imported names are an explicit request, never "unused"
        for name in module.exported_names() {
          self.define(&name, span, true);
        }
        Ok(())
      }
      Err(ImportFault::Soft(message)) => {
        self.error(span, message);
        Ok(())
      }
      Err(ImportFault::Fatal(e)) => Err(e),
    }
  }

  fn expr(&mut self, expr: &ast::Expr) -> Result<(), Error> {
    let span = expr.span;
    match &**expr {
      ast::ExprKind::Literal(_) => Ok(()),
      ast::ExprKind::Grouping(inner) => self.expr(inner),
      ast::ExprKind::Binary(b) => {
        self.expr(&b.left)?;
        self.expr(&b.right)
      }
      ast::ExprKind::Logical(l) => {
        self.expr(&l.left)?;
        self.expr(&l.right)
      }
      ast::ExprKind::Unary(u) => self.expr(&u.right),
      ast::ExprKind::GetVar(v) => {
        // unresolved reads become a deferred runtime error
        self.resolve_name(v.name.as_ref(), v.id, true);
        Ok(())
      }
      ast::ExprKind::Assign(a) => {
        self.expr(&a.value)?;
        self.assign_target(a.id, &a.name, a.new_var);
        Ok(())
      }
      ast::ExprKind::GetField(g) => self.expr(&g.target),
      ast::ExprKind::SetField(s) => {
        self.expr(&s.value)?;
        self.expr(&s.target)
      }
      ast::ExprKind::Call(c) => {
        self.expr(&c.callee)?;
        c.args.iter().try_for_each(|arg| self.expr(arg))
      }
      ast::ExprKind::GetSelf(s) => {
        if self.class == ClassKind::None {
          self.error(span, "Can't use 'watashi' outside of classes.".to_string());
        } else {
          self.resolve_name("watashi", s.id, true);
        }
        Ok(())
      }
      ast::ExprKind::GetSuper(s) => {
        match self.class {
          ClassKind::None => {
            self.error(span, "Can't use 'haha' outside of classes.".to_string());
          }
          ClassKind::Class => {
            self.error(
              span,
              "Can't use 'haha' in a class with no superclass.".to_string(),
            );
          }
          ClassKind::Subclass => {
            self.resolve_name("haha", s.id, true);
          }
        }
        Ok(())
      }
      ast::ExprKind::Lambda(f) => self.func_decl(f),
    }
  }
}

#[cfg(test)]
mod tests;
