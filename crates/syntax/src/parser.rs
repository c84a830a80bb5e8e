#![deny(unused_must_use)]

use span::Span;

use crate::ast::NodeId;
use crate::lexer::TokenKind::*;
use crate::lexer::{Token, TokenKind};
use crate::{ast, Error, Result};

/// Parses a token stream produced by [`crate::lexer::lex`].
///
/// Parsing always terminates: an unexpected token is recorded and the
/// parser resynchronizes at the next statement boundary.
pub fn parse(src: &str, tokens: Vec<Token>) -> Result<ast::Module, Vec<Error>> {
  let parser = Parser::new(src, tokens);
  parser.module()
}

struct Context {
  loop_depth: usize,
}

impl Default for Context {
  fn default() -> Self {
    Self { loop_depth: 0 }
  }
}

struct Parser<'src> {
  src: &'src str,
  tokens: Vec<Token>,
  pos: usize,
  errors: Vec<Error>,
  ctx: Context,
  next_id: u32,
}

impl<'src> Parser<'src> {
  fn new(src: &'src str, tokens: Vec<Token>) -> Self {
    debug_assert!(matches!(tokens.last(), Some(t) if t.is(Tok_Eof)));
    Self {
      src,
      tokens,
      pos: 0,
      errors: Vec::new(),
      ctx: Context::default(),
      next_id: 0,
    }
  }

  fn module(mut self) -> Result<ast::Module, Vec<Error>> {
    let mut module = ast::Module::new();

    while !self.current().is(Tok_Eof) {
      match self.declaration() {
        Ok(stmt) => module.body.push(stmt),
        Err(e) => {
          self.errors.push(e);
          self.sync();
        }
      }
    }

    if self.errors.is_empty() {
      Ok(module)
    } else {
      Err(self.errors)
    }
  }

  fn node_id(&mut self) -> NodeId {
    let id = NodeId(self.next_id);
    self.next_id += 1;
    id
  }

  #[inline]
  fn current(&self) -> &Token {
    &self.tokens[self.pos]
  }

  #[inline]
  fn previous(&self) -> &Token {
    &self.tokens[self.pos.saturating_sub(1)]
  }

  #[inline]
  fn lexeme(&self, span: Span) -> &'src str {
    &self.src[span.range()]
  }

  /// Move forward by one token, returning the previous one.
  #[inline]
  fn bump(&mut self) -> &Token {
    if !self.current().is(Tok_Eof) {
      self.pos += 1;
    }
    self.previous()
  }

  #[inline]
  fn bump_if(&mut self, kind: TokenKind) -> bool {
    if self.current().is(kind) {
      self.bump();
      true
    } else {
      false
    }
  }

  #[inline]
  fn expect(&mut self, kind: TokenKind) -> Result<()> {
    if self.bump_if(kind) {
      Ok(())
    } else {
      Err(Error::new(
        format!("Expect {}.", kind.name()),
        self.current().span,
      ))
    }
  }

  fn ident(&mut self) -> Result<ast::Ident> {
    if self.current().is(Lit_Ident) {
      self.bump();
      let span = self.previous().span;
      let name = beef::lean::Cow::owned(self.lexeme(span).to_string());
      Ok(ast::Ident::new(span, name))
    } else {
      Err(Error::new("Expect identifier.", self.current().span))
    }
  }

  fn unexpected(&self) -> Error {
    Error::new(
      format!("Unexpected token {}.", self.current().kind.name()),
      self.current().span,
    )
  }

  /// Calls `f` in the context `ctx`.
  /// `ctx` is used only for the duration of the call to `f`.
  #[inline]
  fn with_ctx<T>(&mut self, mut ctx: Context, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
    std::mem::swap(&mut self.ctx, &mut ctx);
    let res = f(self);
    std::mem::swap(&mut self.ctx, &mut ctx);
    res
  }

  /// Skips ahead to the next statement boundary: just past a newline, or
  /// right before a keyword that begins a statement.
  fn sync(&mut self) {
    while !self.current().is(Tok_Eof) {
      match self.current().kind {
        Kw_Fn | Kw_Class | Kw_While | Kw_If | Kw_NewVar | Kw_Break | Kw_Continue | Kw_Return
        | Kw_Import => break,
        _ => {}
      }
      if self.bump().is(Tok_Newline) {
        break;
      }
    }
  }
}

mod expr;
mod stmt;

// On average, a single parse_XXX() method consumes between 10 and 700 bytes
// of stack space. Assuming ~50 recursive calls per dive and 700 bytes of
// stack space per call, we'll require 50 * 700 = 35k bytes of stack space in
// order to dive. For future proofing, we round this value up to 64k bytes.
const MINIMUM_STACK_REQUIRED: usize = 64_000;

#[cfg(target_family = "wasm")]
fn check_recursion_limit(_span: Span) -> Result<()> {
  Ok(())
}

#[cfg(not(target_family = "wasm"))]
fn check_recursion_limit(span: Span) -> Result<()> {
  if !cfg!(feature = "check-recursion-limit")
    || stacker::remaining_stack()
      .map(|available| available > MINIMUM_STACK_REQUIRED)
      .unwrap_or(true)
  {
    Ok(())
  } else {
    Err(Error::new("Nesting limit reached.", span))
  }
}
