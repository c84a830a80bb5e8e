use std::rc::Rc;

use waifu_syntax::ast;

use crate::env::Frame;
use crate::object::module::ModuleCtx;
use crate::value::Value;

/// Runtime representation of a user-defined function (or lambda).
///
/// `closure` is the frame that was active at the declaration; calling the
/// function builds a fresh child frame on top of it. `ctx` points back at
/// the defining module, whose side table and line index outlive the
/// module's own evaluation.
#[derive(Debug)]
pub struct UserFunc {
  pub decl: Rc<ast::Func>,
  pub closure: Rc<Frame>,
  pub ctx: Rc<ModuleCtx>,
}

impl UserFunc {
  pub fn name(&self) -> &str {
    self.decl.name.as_ref()
  }

  pub fn arity(&self) -> usize {
    self.decl.params.len()
  }
}

/// A method plucked off an object, carrying its receiver.
///
/// Calling it inserts a one-slot `watashi` frame between the call frame
/// and the function's closure.
#[derive(Debug)]
pub struct BoundMethod {
  pub func: Rc<UserFunc>,
  pub receiver: Value,
}
