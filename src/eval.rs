//! The tree-walking evaluator.
//!
//! `break`, `continue` and `return` are explicit unwind signals flowing
//! through `Result`: loops consume `Break`/`Continue`, call boundaries
//! consume `Return`, and `Fail` carries a runtime error all the way out.

use std::cell::RefCell;
use std::mem;
use std::rc::Rc;

use indexmap::IndexMap;
use span::Span;
use waifu_syntax::ast::{self, NodeId};

use crate::env::Frame;
use crate::error::{fail, RuntimeError};
use crate::object::class::{Class, Instance};
use crate::object::function::{BoundMethod, UserFunc};
use crate::object::module::{ImportFault, Module, ModuleCtx};
use crate::value::Value;
use crate::Waifu;

#[derive(Debug)]
pub enum Unwind {
  Break,
  Continue,
  Return(Value),
  Fail(RuntimeError),
}

impl From<RuntimeError> for Unwind {
  fn from(e: RuntimeError) -> Self {
    Unwind::Fail(e)
  }
}

type Exec = Result<(), Unwind>;
type Eval = Result<Value, Unwind>;

pub struct Interp<'w> {
  waifu: &'w mut Waifu,
  /// The module whose code is currently executing; swapped at call
  /// boundaries when crossing into a function from another module.
  ctx: Rc<ModuleCtx>,
  env: Rc<Frame>,
}

impl<'w> Interp<'w> {
  pub fn run(waifu: &'w mut Waifu, module: &Module, ast: &ast::Module) -> Result<(), RuntimeError> {
    let mut interp = Interp {
      waifu,
      ctx: module.ctx.clone(),
      env: module.env.clone(),
    };
    for stmt in &ast.body {
      if let Err(unwind) = interp.stmt(stmt) {
        return Err(match unwind {
          Unwind::Fail(e) => e.locate(&module.ctx),
          // the parser and resolver reject stray break/continue/return
          _ => RuntimeError::new("Invalid control flow at module top level.", stmt.span)
            .locate(&module.ctx),
        });
      }
    }
    Ok(())
  }

  fn stmt(&mut self, stmt: &ast::Stmt) -> Exec {
    let span = stmt.span;
    match &**stmt {
      ast::StmtKind::Var(v) => {
        let value = self.expr(&v.value)?;
        self.bind(v.id, v.new_var, &v.name, value)
      }
      ast::StmtKind::Expr(e) => {
        self.expr(e)?;
        Ok(())
      }
      ast::StmtKind::Block(body) => self.exec_block(body, Frame::child(&self.env)),
      ast::StmtKind::If(i) => {
        if self.expr(&i.cond)?.is_truthy() {
          self.exec_block(&i.then, Frame::child(&self.env))
        } else if let Some(otherwise) = &i.otherwise {
          self.exec_block(otherwise, Frame::child(&self.env))
        } else {
          Ok(())
        }
      }
      ast::StmtKind::While(w) => {
        while self.expr(&w.cond)?.is_truthy() {
          match self.exec_block(&w.body, Frame::child(&self.env)) {
            Ok(()) => {}
            Err(Unwind::Break) => break,
            Err(Unwind::Continue) => continue,
            Err(other) => return Err(other),
          }
        }
        Ok(())
      }
      ast::StmtKind::Ctrl(ctrl) => match &**ctrl {
        ast::Ctrl::Return(value) => {
          let value = match value {
            Some(value) => self.expr(value)?,
            None => Value::Nil,
          };
          Err(Unwind::Return(value))
        }
        ast::Ctrl::Break => Err(Unwind::Break),
        ast::Ctrl::Continue => Err(Unwind::Continue),
      },
      ast::StmtKind::Func(f) => self.func_decl(f, span),
      ast::StmtKind::Class(c) => self.class_decl(c),
      ast::StmtKind::Import(import) => self.import(import, span),
    }
  }

  fn exec_block(&mut self, body: &[ast::Stmt], env: Rc<Frame>) -> Exec {
    let saved = mem::replace(&mut self.env, env);
    let result = body.iter().try_for_each(|stmt| self.stmt(stmt));
    self.env = saved;
    result
  }

  /// Writes `value` through the resolver's index, or defines a fresh
  /// binding in the current frame when there is none to write to.
  fn bind(&mut self, id: NodeId, new_var: bool, name: &ast::Ident, value: Value) -> Exec {
    if !new_var {
      if let Some(&(depth, slot)) = self.ctx.vars.get(&id) {
        if self.env.assign_at(depth, slot, value) {
          return Ok(());
        }
        fail!(name.span, "Undefined variable '{}'.", name.as_ref());
      }
    }
    self.env.define(name.as_ref(), value);
    Ok(())
  }

  fn get_var(&mut self, id: NodeId, name: &str, span: Span) -> Eval {
    if let Some(&(depth, slot)) = self.ctx.vars.get(&id) {
      match self.env.get_at(depth, slot) {
        Some(value) => Ok(value),
        None => fail!(span, "Undefined variable '{name}'."),
      }
    } else {
      // reads the resolver couldn't place may late-bind at module top
      match self.env.module_top().get_by_name(name) {
        Some(value) => Ok(value),
        None => fail!(span, "Undefined variable '{name}'."),
      }
    }
  }

  fn func_decl(&mut self, f: &Rc<ast::Func>, span: Span) -> Exec {
    let mut value = Value::Func(Rc::new(UserFunc {
      decl: f.clone(),
      closure: self.env.clone(),
      ctx: self.ctx.clone(),
    }));

    if let Some(decorator) = &f.decorator {
      let dec = self.get_var(decorator.id, decorator.name.as_ref(), decorator.name.span)?;
      let Value::Func(dec) = dec else {
        fail!(
          decorator.name.span,
          "Decorator must be a function taking exactly one argument."
        );
      };
      if dec.arity() != 1 {
        fail!(
          decorator.name.span,
          "Decorator must be a function taking exactly one argument."
        );
      }
      value = self.call_function(&dec, None, vec![value], span)?;
    }

    self.env.define(f.name.as_ref(), value);
    Ok(())
  }

  fn class_decl(&mut self, c: &ast::Class) -> Exec {
    let mut supers = Vec::with_capacity(c.supers.len());
    for sup in &c.supers {
      match self.get_var(sup.id, sup.name.as_ref(), sup.name.span)? {
        Value::Class(class) => supers.push(class),
        _ => fail!(sup.name.span, "Superclass must be a class."),
      }
    }

    // the class is an instance of its metaclass, which carries the static
    // methods and inherits from the superclasses' metaclasses
    let meta_supers = supers.iter().filter_map(|s| s.metaclass.clone()).collect();
    let metaclass = Rc::new(Class {
      name: format!("__{}__", c.name.as_ref()),
      supers: meta_supers,
      methods: RefCell::new(IndexMap::new()),
      metaclass: None,
    });
    let class = Rc::new(Class {
      name: c.name.to_string(),
      supers,
      methods: RefCell::new(IndexMap::new()),
      metaclass: Some(metaclass.clone()),
    });

    // subclass methods close over a one-slot `haha` frame holding their
    // declaring class, so super-dispatch can search its superclass list
    let has_supers = !class.supers.is_empty();
    let method_env = if has_supers {
      let env = Frame::child(&self.env);
      env.define("haha", Value::Class(class.clone()));
      env
    } else {
      self.env.clone()
    };
    let static_env = if has_supers {
      let env = Frame::child(&self.env);
      env.define("haha", Value::Class(metaclass.clone()));
      env
    } else {
      self.env.clone()
    };

    for method in &c.methods {
      let closure = if method.is_static {
        static_env.clone()
      } else {
        method_env.clone()
      };
      let func = Rc::new(UserFunc {
        decl: method.func.clone(),
        closure,
        ctx: self.ctx.clone(),
      });
      let table = if method.is_static {
        &metaclass.methods
      } else {
        &class.methods
      };
      table.borrow_mut().insert(method.func.name.to_string(), func);
    }

    self.env.define(c.name.as_ref(), Value::Class(class));
    Ok(())
  }

  fn import(&mut self, import: &ast::Import, span: Span) -> Exec {
    let file = self.ctx.file.clone();
    match self.waifu.import_module(import, &file) {
      Ok(module) => {
        for (name, value) in module.exported_entries() {
          self.env.define(&name, value);
        }
        Ok(())
      }
      Err(ImportFault::Soft(message)) => fail!(span, "{message}"),
      Err(ImportFault::Fatal(e)) => fail!(span, "{e}"),
    }
  }

  fn expr(&mut self, expr: &ast::Expr) -> Eval {
    let span = expr.span;
    match &**expr {
      ast::ExprKind::Literal(lit) => Ok(match &**lit {
        ast::Literal::Nil => Value::Nil,
        ast::Literal::Bool(b) => Value::Bool(*b),
        ast::Literal::Number(n) => Value::Num(*n),
        ast::Literal::String(s) => Value::Str(s.as_ref().into()),
      }),
      ast::ExprKind::Grouping(inner) => self.expr(inner),
      ast::ExprKind::Binary(b) => {
        let left = self.expr(&b.left)?;
        let right = self.expr(&b.right)?;
        self.binary(span, b.op, left, right)
      }
      ast::ExprKind::Logical(l) => {
        // short-circuit: the value that decided the result is returned
        let left = self.expr(&l.left)?;
        match l.op {
          ast::LogicalOp::Or if left.is_truthy() => Ok(left),
          ast::LogicalOp::And if !left.is_truthy() => Ok(left),
          _ => self.expr(&l.right),
        }
      }
      ast::ExprKind::Unary(u) => {
        let operand = self.expr(&u.right)?;
        match u.op {
          ast::UnaryOp::Neg => match operand {
            Value::Num(n) => Ok(Value::Num(-n)),
            _ => fail!(span, "Can only apply '-' to a numeric operand."),
          },
          ast::UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        }
      }
      ast::ExprKind::GetVar(v) => self.get_var(v.id, v.name.as_ref(), v.name.span),
      ast::ExprKind::Assign(a) => {
        let value = self.expr(&a.value)?;
        self.bind(a.id, a.new_var, &a.name, value.clone())?;
        Ok(value)
      }
      ast::ExprKind::GetField(g) => {
        let target = self.expr(&g.target)?;
        self.get_field(span, target, &g.name)
      }
      ast::ExprKind::SetField(s) => {
        let target = self.expr(&s.target)?;
        let Value::Instance(instance) = target else {
          fail!(span, "Only instances have settable properties.");
        };
        let value = self.expr(&s.value)?;
        instance
          .fields
          .borrow_mut()
          .insert(s.name.to_string(), value.clone());
        Ok(value)
      }
      ast::ExprKind::Call(c) => {
        let callee = self.expr(&c.callee)?;
        let mut args = Vec::with_capacity(c.args.len());
        for arg in &c.args {
          args.push(self.expr(arg)?);
        }
        self.call_value(span, callee, args)
      }
      ast::ExprKind::GetSelf(s) => match self.ctx.vars.get(&s.id) {
        Some(&(depth, slot)) => match self.env.get_at(depth, slot) {
          Some(value) => Ok(value),
          None => fail!(span, "Undefined variable 'watashi'."),
        },
        None => fail!(span, "Can't use 'watashi' outside of classes."),
      },
      ast::ExprKind::GetSuper(s) => self.get_super(s, span),
      ast::ExprKind::Lambda(f) => Ok(Value::Func(Rc::new(UserFunc {
        decl: f.clone(),
        closure: self.env.clone(),
        ctx: self.ctx.clone(),
      }))),
    }
  }

  fn binary(&mut self, span: Span, op: ast::BinaryOp, left: Value, right: Value) -> Eval {
    use ast::BinaryOp::*;
    match op {
      Add => match (&left, &right) {
        // if either side is a string, `+` concatenates representations
        (Value::Str(_), _) | (_, Value::Str(_)) => Ok(Value::Str(format!("{left}{right}").into())),
        (Value::Num(l), Value::Num(r)) => Ok(Value::Num(l + r)),
        _ => fail!(span, "Can only apply '+' to numeric operands."),
      },
      Eq => Ok(Value::Bool(left == right)),
      Neq => Ok(Value::Bool(left != right)),
      Sub | Mul | Div | Less | LessEq | More | MoreEq => {
        let (Value::Num(l), Value::Num(r)) = (&left, &right) else {
          fail!(span, "Can only apply '{op}' to numeric operands.");
        };
        let (l, r) = (*l, *r);
        Ok(match op {
          Sub => Value::Num(l - r),
          Mul => Value::Num(l * r),
          Div => {
            if r == 0.0 {
              fail!(span, "Can not divide by zero.");
            }
            Value::Num(l / r)
          }
          Less => Value::Bool(l < r),
          LessEq => Value::Bool(l <= r),
          More => Value::Bool(l > r),
          MoreEq => Value::Bool(l >= r),
          _ => unreachable!("arm only entered for numeric operators"),
        })
      }
    }
  }

  fn get_field(&mut self, span: Span, target: Value, name: &ast::Ident) -> Eval {
    match target {
      Value::Instance(instance) => {
        let field = instance.fields.borrow().get(name.as_ref()).cloned();
        if let Some(value) = field {
          return Ok(value);
        }
        match instance.class.find_method(name.as_ref()) {
          Some(func) => Ok(Value::Method(Rc::new(BoundMethod {
            func,
            receiver: Value::Instance(instance.clone()),
          }))),
          None => fail!(name.span, "Property '{}' does not exist.", name.as_ref()),
        }
      }
      // class values answer with their metaclass's methods, bound to the
      // class itself
      Value::Class(class) => {
        let method = class
          .metaclass
          .as_ref()
          .and_then(|meta| meta.find_method(name.as_ref()));
        match method {
          Some(func) => Ok(Value::Method(Rc::new(BoundMethod {
            func,
            receiver: Value::Class(class.clone()),
          }))),
          None => fail!(name.span, "Property '{}' does not exist.", name.as_ref()),
        }
      }
      _ => fail!(span, "Only instances have properties."),
    }
  }

  fn get_super(&mut self, s: &ast::GetSuper, span: Span) -> Eval {
    let Some(&(depth, slot)) = self.ctx.vars.get(&s.id) else {
      fail!(span, "Can't use 'haha' outside of subclasses.");
    };
    let Some(Value::Class(class)) = self.env.get_at(depth, slot) else {
      fail!(span, "Can't use 'haha' outside of subclasses.");
    };
    // the receiver sits one frame below the `haha` frame
    let Some(receiver) = self.env.get_at(depth - 1, 0) else {
      fail!(span, "Can't use 'haha' outside of subclasses.");
    };
    match class.find_super_method(s.method.as_ref()) {
      Some(func) => Ok(Value::Method(Rc::new(BoundMethod { func, receiver }))),
      None => fail!(s.method.span, "Property '{}' does not exist.", s.method.as_ref()),
    }
  }

  fn call_value(&mut self, span: Span, callee: Value, args: Vec<Value>) -> Eval {
    match callee {
      Value::Func(func) => {
        self.check_arity(span, func.arity(), args.len())?;
        self.call_function(&func, None, args, span)
      }
      Value::Method(method) => {
        self.check_arity(span, method.func.arity(), args.len())?;
        self.call_function(&method.func, Some(method.receiver.clone()), args, span)
      }
      Value::Class(class) => self.instantiate(span, &class, args),
      Value::Native(native) => {
        self.check_arity(span, native.arity(), args.len())?;
        native
          .call(self.waifu, args, span)
          .map_err(|e| Unwind::Fail(e.locate(&self.ctx)))
      }
      _ => fail!(span, "Can only invoke callables."),
    }
  }

  fn check_arity(&self, span: Span, expected: usize, got: usize) -> Result<(), Unwind> {
    if expected != got {
      fail!(span, "Expected {expected} arguments but got {got}.");
    }
    Ok(())
  }

  fn call_function(
    &mut self,
    func: &Rc<UserFunc>,
    receiver: Option<Value>,
    args: Vec<Value>,
    span: Span,
  ) -> Eval {
    check_recursion_limit(span)?;

    let closure = match receiver {
      Some(receiver) => {
        let watashi = Frame::child(&func.closure);
        watashi.define("watashi", receiver);
        watashi
      }
      None => func.closure.clone(),
    };
    let frame = Frame::child(&closure);
    for (param, arg) in func.decl.params.iter().zip(args) {
      frame.define(param.as_ref(), arg);
    }

    let caller_ctx = mem::replace(&mut self.ctx, func.ctx.clone());
    let result = match self.exec_block(&func.decl.body, frame) {
      Ok(()) => Ok(Value::Nil),
      Err(Unwind::Return(value)) => Ok(value),
      Err(Unwind::Fail(e)) => Err(Unwind::Fail(e.locate(&func.ctx))),
      Err(other) => Err(other),
    };
    self.ctx = caller_ctx;
    result
  }

  fn instantiate(&mut self, span: Span, class: &Rc<Class>, args: Vec<Value>) -> Eval {
    let instance = Rc::new(Instance::new(class));
    match class.find_method("shison") {
      Some(init) => {
        self.check_arity(span, init.arity(), args.len())?;
        self.call_function(&init, Some(Value::Instance(instance.clone())), args, span)?;
      }
      None => self.check_arity(span, 0, args.len())?,
    }
    Ok(Value::Instance(instance))
  }
}

// A call frame costs a few hundred bytes of native stack across
// `stmt`/`expr`/`call_function`; erring well on the safe side here keeps
// deep recursion an error instead of an abort.
const MINIMUM_STACK_REQUIRED: usize = 128_000;

#[cfg(target_family = "wasm")]
fn check_recursion_limit(_span: Span) -> Result<(), Unwind> {
  Ok(())
}

#[cfg(not(target_family = "wasm"))]
fn check_recursion_limit(span: Span) -> Result<(), Unwind> {
  if stacker::remaining_stack()
    .map(|available| available > MINIMUM_STACK_REQUIRED)
    .unwrap_or(true)
  {
    Ok(())
  } else {
    fail!(span, "Stack overflow.");
  }
}
