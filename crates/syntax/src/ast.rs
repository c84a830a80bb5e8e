//! Syntax tree for Waifu programs.
//!
//! Nodes own their strings and share function payloads behind [`Rc`]: the
//! evaluator keeps declaration nodes alive inside closures long after the
//! module's source buffer is gone.

use std::rc::Rc;

use beef::lean::Cow;
use span::{Span, Spanned};

pub type Ident = Spanned<Cow<'static, str>>;

/// Identity of a name-carrying node, assigned by the parser at
/// construction. The resolver's side table is keyed on these.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Default)]
pub struct Module {
  pub body: Vec<Stmt>,
}

impl Module {
  pub fn new() -> Self {
    Self { body: vec![] }
  }
}

pub type Stmt = Spanned<StmtKind>;

#[derive(Debug)]
pub enum StmtKind {
  Var(Box<Var>),
  Expr(Box<Expr>),
  Block(Vec<Stmt>),
  If(Box<If>),
  While(Box<While>),
  Ctrl(Box<Ctrl>),
  Func(Rc<Func>),
  Class(Box<Class>),
  Import(Box<Import>),
}

/// `name <- value` / `baka name <- value` in statement position.
#[derive(Debug)]
pub struct Var {
  pub id: NodeId,
  pub new_var: bool,
  pub name: Ident,
  pub value: Expr,
}

#[derive(Debug)]
pub struct If {
  pub cond: Expr,
  pub then: Vec<Stmt>,
  pub otherwise: Option<Vec<Stmt>>,
}

#[derive(Debug)]
pub struct While {
  pub cond: Expr,
  pub body: Vec<Stmt>,
}

#[derive(Debug)]
pub enum Ctrl {
  Return(Option<Expr>),
  Break,
  Continue,
}

#[derive(Debug)]
pub struct Func {
  pub id: NodeId,
  pub decorator: Option<GetVar>,
  /// Empty for lambdas.
  pub name: Ident,
  pub params: Vec<Ident>,
  pub body: Vec<Stmt>,
}

impl Func {
  pub fn is_lambda(&self) -> bool {
    self.name.as_ref().is_empty()
  }
}

#[derive(Debug)]
pub struct Class {
  pub id: NodeId,
  pub name: Ident,
  pub supers: Vec<GetVar>,
  pub methods: Vec<Method>,
}

#[derive(Debug)]
pub struct Method {
  pub is_static: bool,
  pub func: Rc<Func>,
}

/// `senpai ..a.b` — `dots` counts the leading dots.
#[derive(Debug)]
pub struct Import {
  pub dots: usize,
  pub path: Vec<Ident>,
}

impl Import {
  /// The name the imported module is registered under.
  pub fn module_name(&self) -> &str {
    self
      .path
      .last()
      .map(|i| i.as_ref())
      .expect("import path is never empty")
  }
}

pub type Expr = Spanned<ExprKind>;

#[derive(Debug)]
pub enum ExprKind {
  Literal(Box<Literal>),
  Grouping(Box<Expr>),
  Binary(Box<Binary>),
  Logical(Box<Logical>),
  Unary(Box<Unary>),
  GetVar(Box<GetVar>),
  Assign(Box<Assign>),
  GetField(Box<GetField>),
  SetField(Box<SetField>),
  Call(Box<Call>),
  GetSelf(Box<GetSelf>),
  GetSuper(Box<GetSuper>),
  Lambda(Rc<Func>),
}

#[derive(Debug)]
pub enum Literal {
  Nil,
  Bool(bool),
  Number(f64),
  String(Cow<'static, str>),
}

#[derive(Debug)]
pub struct Binary {
  pub op: BinaryOp,
  pub left: Expr,
  pub right: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Eq,
  Neq,
  Less,
  LessEq,
  More,
  MoreEq,
}

impl std::fmt::Display for BinaryOp {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let symbol = match self {
      BinaryOp::Add => "+",
      BinaryOp::Sub => "-",
      BinaryOp::Mul => "*",
      BinaryOp::Div => "/",
      BinaryOp::Eq => "=",
      BinaryOp::Neq => "!=",
      BinaryOp::Less => "<",
      BinaryOp::LessEq => "<=",
      BinaryOp::More => ">",
      BinaryOp::MoreEq => ">=",
    };
    f.write_str(symbol)
  }
}

#[derive(Debug)]
pub struct Logical {
  pub op: LogicalOp,
  pub left: Expr,
  pub right: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogicalOp {
  And,
  Or,
}

#[derive(Debug)]
pub struct Unary {
  pub op: UnaryOp,
  pub right: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
  Not,
  Neg,
}

impl std::fmt::Display for UnaryOp {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(match self {
      UnaryOp::Not => "not",
      UnaryOp::Neg => "-",
    })
  }
}

#[derive(Debug)]
pub struct GetVar {
  pub id: NodeId,
  pub name: Ident,
}

/// `name <- value` in expression position (assignment tails).
#[derive(Debug)]
pub struct Assign {
  pub id: NodeId,
  pub new_var: bool,
  pub name: Ident,
  pub value: Expr,
}

#[derive(Debug)]
pub struct GetField {
  pub target: Expr,
  pub name: Ident,
}

#[derive(Debug)]
pub struct SetField {
  pub target: Expr,
  pub name: Ident,
  pub value: Expr,
}

#[derive(Debug)]
pub struct Call {
  pub callee: Expr,
  pub args: Vec<Expr>,
}

/// `watashi`
#[derive(Debug)]
pub struct GetSelf {
  pub id: NodeId,
}

/// `haha.method`
#[derive(Debug)]
pub struct GetSuper {
  pub id: NodeId,
  pub method: Ident,
}

pub fn var_stmt(s: impl Into<Span>, id: NodeId, new_var: bool, name: Ident, value: Expr) -> Stmt {
  Stmt::new(
    s,
    StmtKind::Var(Box::new(Var {
      id,
      new_var,
      name,
      value,
    })),
  )
}

pub fn expr_stmt(expr: Expr) -> Stmt {
  Stmt::new(expr.span, StmtKind::Expr(Box::new(expr)))
}

pub fn block_stmt(s: impl Into<Span>, body: Vec<Stmt>) -> Stmt {
  Stmt::new(s, StmtKind::Block(body))
}

pub fn if_stmt(s: impl Into<Span>, cond: Expr, then: Vec<Stmt>, otherwise: Option<Vec<Stmt>>) -> Stmt {
  Stmt::new(
    s,
    StmtKind::If(Box::new(If {
      cond,
      then,
      otherwise,
    })),
  )
}

pub fn while_stmt(s: impl Into<Span>, cond: Expr, body: Vec<Stmt>) -> Stmt {
  Stmt::new(s, StmtKind::While(Box::new(While { cond, body })))
}

pub fn return_stmt(s: impl Into<Span>, value: Option<Expr>) -> Stmt {
  Stmt::new(s, StmtKind::Ctrl(Box::new(Ctrl::Return(value))))
}

pub fn break_stmt(s: impl Into<Span>) -> Stmt {
  Stmt::new(s, StmtKind::Ctrl(Box::new(Ctrl::Break)))
}

pub fn continue_stmt(s: impl Into<Span>) -> Stmt {
  Stmt::new(s, StmtKind::Ctrl(Box::new(Ctrl::Continue)))
}

pub fn func_stmt(s: impl Into<Span>, func: Func) -> Stmt {
  Stmt::new(s, StmtKind::Func(Rc::new(func)))
}

pub fn class_stmt(
  s: impl Into<Span>,
  id: NodeId,
  name: Ident,
  supers: Vec<GetVar>,
  methods: Vec<Method>,
) -> Stmt {
  Stmt::new(
    s,
    StmtKind::Class(Box::new(Class {
      id,
      name,
      supers,
      methods,
    })),
  )
}

pub fn import_stmt(s: impl Into<Span>, dots: usize, path: Vec<Ident>) -> Stmt {
  Stmt::new(s, StmtKind::Import(Box::new(Import { dots, path })))
}

pub fn expr_binary(s: impl Into<Span>, op: BinaryOp, left: Expr, right: Expr) -> Expr {
  Expr::new(s, ExprKind::Binary(Box::new(Binary { op, left, right })))
}

pub fn expr_logical(s: impl Into<Span>, op: LogicalOp, left: Expr, right: Expr) -> Expr {
  Expr::new(s, ExprKind::Logical(Box::new(Logical { op, left, right })))
}

pub fn expr_unary(s: impl Into<Span>, op: UnaryOp, right: Expr) -> Expr {
  Expr::new(s, ExprKind::Unary(Box::new(Unary { op, right })))
}

pub fn expr_grouping(s: impl Into<Span>, inner: Expr) -> Expr {
  Expr::new(s, ExprKind::Grouping(Box::new(inner)))
}

pub fn expr_get_var(id: NodeId, name: Ident) -> Expr {
  Expr::new(name.span, ExprKind::GetVar(Box::new(GetVar { id, name })))
}

pub fn expr_assign(s: impl Into<Span>, id: NodeId, name: Ident, value: Expr) -> Expr {
  Expr::new(
    s,
    ExprKind::Assign(Box::new(Assign {
      id,
      new_var: false,
      name,
      value,
    })),
  )
}

pub fn expr_get_field(s: impl Into<Span>, target: Expr, name: Ident) -> Expr {
  Expr::new(s, ExprKind::GetField(Box::new(GetField { target, name })))
}

pub fn expr_set_field(s: impl Into<Span>, target: Expr, name: Ident, value: Expr) -> Expr {
  Expr::new(
    s,
    ExprKind::SetField(Box::new(SetField {
      target,
      name,
      value,
    })),
  )
}

pub fn expr_call(s: impl Into<Span>, callee: Expr, args: Vec<Expr>) -> Expr {
  Expr::new(s, ExprKind::Call(Box::new(Call { callee, args })))
}

pub fn expr_get_self(s: impl Into<Span>, id: NodeId) -> Expr {
  Expr::new(s, ExprKind::GetSelf(Box::new(GetSelf { id })))
}

pub fn expr_get_super(s: impl Into<Span>, id: NodeId, method: Ident) -> Expr {
  Expr::new(s, ExprKind::GetSuper(Box::new(GetSuper { id, method })))
}

pub fn expr_lambda(s: impl Into<Span>, func: Func) -> Expr {
  Expr::new(s, ExprKind::Lambda(Rc::new(func)))
}

pub mod lit {
  use super::*;
  use crate::{Error, Result};

  pub fn nil(s: impl Into<Span>) -> Expr {
    Expr::new(s, ExprKind::Literal(Box::new(Literal::Nil)))
  }

  pub fn bool(s: impl Into<Span>, lexeme: &str) -> Expr {
    let v = match lexeme {
      "true" => true,
      "false" => false,
      _ => unreachable!("bool is only ever `true` or `false`"),
    };
    Expr::new(s.into(), ExprKind::Literal(Box::new(Literal::Bool(v))))
  }

  pub fn num(s: impl Into<Span>, lexeme: &str) -> Result<Expr> {
    let s = s.into();
    let value = lexeme
      .parse()
      .map_err(|e| Error::new(format!("Invalid number: {e}."), s))?;
    Ok(Expr::new(
      s,
      ExprKind::Literal(Box::new(Literal::Number(value))),
    ))
  }

  pub fn str(s: impl Into<Span>, lexeme: &str) -> Expr {
    let lexeme = lexeme.strip_prefix('"').unwrap_or(lexeme);
    let lexeme = lexeme.strip_suffix('"').unwrap_or(lexeme);
    Expr::new(
      s.into(),
      ExprKind::Literal(Box::new(Literal::String(Cow::owned(lexeme.to_string())))),
    )
  }
}
