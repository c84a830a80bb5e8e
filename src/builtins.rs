//! Host functions preloaded into every module's top frame.

use std::rc::Rc;

use span::Span;

use crate::error::{fail, RuntimeError};
use crate::value::Value;
use crate::Waifu;

/// The host-callable contract: anything exposing an arity and a call
/// implementation. The evaluator enforces the arity before calling.
pub trait NativeCallable {
  fn name(&self) -> &'static str;
  fn arity(&self) -> usize;
  fn call(&self, host: &mut Waifu, args: Vec<Value>, span: Span) -> Result<Value, RuntimeError>;
}

/// Builtin names in seeding order. The resolver preloads its globals scope
/// from this list and [`all`] populates top frames in the same order, so
/// the two sides agree on slot numbering.
pub const NAMES: &[&str] = &["input", "print"];

pub fn all() -> Vec<Rc<dyn NativeCallable>> {
  vec![Rc::new(Input), Rc::new(Print)]
}

/// `print(x)` writes the Waifu-representation of `x` and a newline to the
/// host's output, and returns `baito`.
struct Print;

impl NativeCallable for Print {
  fn name(&self) -> &'static str {
    "print"
  }

  fn arity(&self) -> usize {
    1
  }

  fn call(&self, host: &mut Waifu, args: Vec<Value>, span: Span) -> Result<Value, RuntimeError> {
    if host.write_out(&format!("{}\n", args[0])).is_err() {
      fail!(span, "Failed to write to output.");
    }
    Ok(Value::Nil)
  }
}

/// `input(prompt)` writes the prompt, reads one line from the host's
/// input, and returns it with the line terminator stripped.
struct Input;

impl NativeCallable for Input {
  fn name(&self) -> &'static str {
    "input"
  }

  fn arity(&self) -> usize {
    1
  }

  fn call(&self, host: &mut Waifu, args: Vec<Value>, span: Span) -> Result<Value, RuntimeError> {
    if host.write_out(&args[0].to_string()).is_err() {
      fail!(span, "Failed to write to output.");
    }
    match host.read_line() {
      Ok(Some(line)) => Ok(Value::Str(line.into())),
      Ok(None) => fail!(span, "EOF while reading input."),
      Err(_) => fail!(span, "Failed to read input."),
    }
  }
}
