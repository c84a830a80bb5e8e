use std::error::Error as StdError;
use std::fmt::Display;
use std::rc::Rc;

use beef::lean::Cow;
use span::Span;

use crate::object::module::ModuleCtx;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Why a run was aborted. The individual diagnostics have already been
/// written to the error sink by the time this is returned.
#[derive(Debug)]
pub enum Error {
  /// The entry source could not be read.
  Load(String),
  /// Lexical or parse errors stopped the pipeline.
  Syntax(usize),
  /// Resolver errors stopped the pipeline.
  Semantic(usize),
  /// A runtime error terminated evaluation.
  Runtime,
}

impl Display for Error {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Error::Load(message) => write!(f, "{message}"),
      Error::Syntax(n) => write!(f, "aborted after {n} syntax error(s)"),
      Error::Semantic(n) => write!(f, "aborted after {n} semantic error(s)"),
      Error::Runtime => write!(f, "aborted due to a runtime error"),
    }
  }
}

impl StdError for Error {}

/// A runtime fault.
///
/// `ctx` identifies the module whose source contains `span`; it is filled
/// in at the innermost call boundary the error unwinds through, so errors
/// raised inside imported functions report against the right file.
#[derive(Clone, Debug)]
pub struct RuntimeError {
  pub message: Cow<'static, str>,
  pub span: Span,
  pub ctx: Option<Rc<ModuleCtx>>,
}

impl RuntimeError {
  pub fn new(message: impl Into<Cow<'static, str>>, span: impl Into<Span>) -> Self {
    Self {
      message: message.into(),
      span: span.into(),
      ctx: None,
    }
  }

  pub fn locate(mut self, ctx: &Rc<ModuleCtx>) -> Self {
    if self.ctx.is_none() {
      self.ctx = Some(ctx.clone());
    }
    self
  }
}

/// Raises a [`RuntimeError`] from the evaluator or a native function.
macro_rules! fail {
  ($span:expr, $($args:tt)*) => {
    return Err($crate::error::RuntimeError::new(format!($($args)*), $span).into())
  };
}

pub(crate) use fail;
