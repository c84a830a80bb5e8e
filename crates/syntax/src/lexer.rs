#![allow(non_camel_case_types)]

use std::borrow::Borrow;
use std::fmt;
use std::mem::discriminant;

use logos::Logos;
use span::Span;

use crate::Error;

/// A token of the block-structured stream consumed by the parser.
///
/// The stream contains the synthesized `Tok_Newline`, `Tok_Indent` and
/// `Tok_Dedent` tokens in addition to what was scanned from the source, and
/// always ends with `Tok_Eof`.
#[derive(Clone, Debug)]
pub struct Token {
  pub kind: TokenKind,
  pub span: Span,
}

impl Token {
  pub fn is(&self, kind: impl Borrow<TokenKind>) -> bool {
    discriminant(&self.kind) == discriminant(kind.borrow())
  }
}

/// Scans `src` into a token stream.
///
/// The scan always runs to the end of the input so that every lexical error
/// is reported in one pass. The stream invariants:
///
/// - one `Tok_Newline` per non-empty logical line, at its end;
/// - blank and comment-only lines produce nothing and do not touch block
///   state;
/// - a strictly deeper line after a `:` pushes a level and emits one
///   `Tok_Indent`; a shallower line emits one `Tok_Dedent` per popped level;
/// - remaining levels are closed out before the final `Tok_Eof`.
pub fn lex(src: &str) -> Result<Vec<Token>, Vec<Error>> {
  let eof = Span::from(src.len()..src.len());

  let mut tokens = Vec::new();
  let mut errors = Vec::new();
  let mut indent = IndentStack::new();
  // Indentation of the upcoming line, measured at its leading newline.
  let mut pending_ws: Option<(u64, Span)> = None;
  let mut line_has_tokens = false;
  let mut line_ends_with_colon = false;

  let mut lexer = logos::Lexer::<TokenKind>::new(src);
  while let Some(kind) = lexer.next() {
    let span = Span::from(lexer.span());
    match kind {
      TokenKind::_Whitespace | TokenKind::_Comment => continue,
      TokenKind::_Indentation => {
        pending_ws = Some((measure_indent(lexer.slice()), span));
        continue;
      }
      TokenKind::_UnterminatedString => {
        errors.push(Error::new("Unterminated string.", span));
        continue;
      }
      TokenKind::Tok_Error => {
        errors.push(Error::new(
          format!("Unexpected character: {}.", lexer.slice()),
          span,
        ));
        continue;
      }
      _ => {}
    }

    if let Some((ws, ws_span)) = pending_ws.take() {
      if line_has_tokens {
        // the newline terminates (and is attributed to) the previous line
        let nl = Span::from(ws_span.start..ws_span.start + 1);
        tokens.push(Token {
          kind: TokenKind::Tok_Newline,
          span: nl,
        });
      }
      // block tokens and errors belong to the line being opened
      let line_start = Span::from(ws_span.end..ws_span.end);
      open_or_close_blocks(
        ws,
        line_start,
        line_ends_with_colon,
        &mut indent,
        &mut tokens,
        &mut errors,
      );
    }

    line_has_tokens = true;
    line_ends_with_colon = matches!(kind, TokenKind::Tok_Colon);
    tokens.push(Token { kind, span });
  }

  // EOF close-out: terminate the last logical line, then drain the stack.
  if line_has_tokens {
    tokens.push(Token {
      kind: TokenKind::Tok_Newline,
      span: eof,
    });
  }
  while indent.level() > 0 {
    indent.pop();
    tokens.push(Token {
      kind: TokenKind::Tok_Dedent,
      span: eof,
    });
  }
  tokens.push(Token {
    kind: TokenKind::Tok_Eof,
    span: eof,
  });

  if errors.is_empty() {
    Ok(tokens)
  } else {
    Err(errors)
  }
}

fn open_or_close_blocks(
  ws: u64,
  at: Span,
  after_colon: bool,
  indent: &mut IndentStack,
  tokens: &mut Vec<Token>,
  errors: &mut Vec<Error>,
) {
  if ws > indent.level() {
    if after_colon {
      indent.push(ws);
      tokens.push(Token {
        kind: TokenKind::Tok_Indent,
        span: at,
      });
    } else {
      errors.push(Error::new("Can not indent without block creation.", at));
    }
  } else if ws == indent.level() {
    if after_colon {
      errors.push(Error::new("Expect indentation after block creation.", at));
    }
  } else {
    if after_colon {
      errors.push(Error::new("Can not dedent after block creation.", at));
    }
    while ws < indent.level() {
      indent.pop();
      tokens.push(Token {
        kind: TokenKind::Tok_Dedent,
        span: at,
      });
    }
    if ws != indent.level() {
      errors.push(Error::new(
        "Dedent does not match any outer indentation level.",
        at,
      ));
    }
  }
}

fn measure_indent(s: &str) -> u64 {
  let pos = s.rfind('\n').unwrap_or(0);
  (s.len() - pos - 1) as u64
}

struct IndentStack {
  stack: Vec<u64>,
}

impl IndentStack {
  fn new() -> Self {
    Self { stack: vec![0] }
  }

  fn level(&self) -> u64 {
    *self.stack.last().expect("indent stack never empties")
  }

  fn push(&mut self, n: u64) {
    self.stack.push(n);
  }

  fn pop(&mut self) {
    if self.stack.len() > 1 {
      self.stack.pop();
    }
  }
}

// When adding a token matched with a `token` directive, also give it a
// readable name in `TokenKind::name` below.
#[derive(Clone, Copy, Debug, Logos, PartialEq)]
pub enum TokenKind {
  // Keywords
  #[token("and")]
  Kw_And,
  #[token("or")]
  Kw_Or,
  #[token("not")]
  Kw_Not,
  #[token("nani")]
  Kw_If,
  #[token("daijobu")]
  Kw_Else,
  #[token("yandere")]
  Kw_While,
  #[token("yamero")]
  Kw_Break,
  #[token("kowai")]
  Kw_Continue,
  #[token("desu")]
  Kw_Fn,
  #[token("shinu")]
  Kw_Return,
  #[token("baka")]
  Kw_NewVar,
  #[token("waifu")]
  Kw_Class,
  #[token("neesan")]
  Kw_Extends,
  #[token("oppai")]
  Kw_Static,
  #[token("watashi")]
  Kw_Self,
  #[token("haha")]
  Kw_Super,
  #[token("senpai")]
  Kw_Import,

  // Brackets
  #[token("(")]
  Brk_ParenL,
  #[token(")")]
  Brk_ParenR,

  // Misc characters
  #[token(".")]
  Op_Dot,
  #[token(",")]
  Tok_Comma,
  #[token(":")]
  Tok_Colon,
  #[token("?")]
  Tok_Question,
  #[token("@")]
  Tok_At,

  // Operators
  #[token("<-")]
  Op_Arrow,
  #[token("=")]
  Op_Equal,
  #[token("!=")]
  Op_BangEqual,
  #[token("+")]
  Op_Plus,
  #[token("-")]
  Op_Minus,
  #[token("*")]
  Op_Star,
  #[token("/")]
  Op_Slash,
  #[token(">")]
  Op_More,
  #[token(">=")]
  Op_MoreEqual,
  #[token("<")]
  Op_Less,
  #[token("<=")]
  Op_LessEqual,

  // Literals
  /// `baito`
  #[token("baito")]
  Lit_Nil,
  /// `0`, `1.5`, `42.25`, etc.
  #[regex(r"[0-9]+(\.[0-9]+)?")]
  Lit_Number,
  /// `true` or `false`
  #[token("true")]
  #[token("false")]
  Lit_Bool,
  /// Double-quoted, no escape processing; may span lines.
  #[regex(r#""[^"]*""#)]
  Lit_String,
  /// `a`, `b_c`, `__x0`, etc.
  #[regex("[a-zA-Z_][a-zA-Z0-9_]*")]
  Lit_Ident,

  #[doc(hidden)]
  #[regex(r"(\r?\n)+[ ]*", priority = 10)]
  _Indentation,
  // no `\n` here: trailing spaces must not swallow the newline that
  // carries the next line's indentation
  #[doc(hidden)]
  #[regex(r"[ \t\r]+")]
  _Whitespace,
  #[doc(hidden)]
  #[regex(r"#[^\n]*")]
  _Comment,
  #[doc(hidden)]
  #[regex(r#""[^"]*"#)]
  _UnterminatedString,

  /// Synthesized at the end of each non-empty logical line.
  Tok_Newline,
  /// Synthesized when a line opens a new block level.
  Tok_Indent,
  /// Synthesized when a line closes a block level.
  Tok_Dedent,

  #[error]
  Tok_Error,
  Tok_Eof,
}

impl TokenKind {
  pub fn name(&self) -> &'static str {
    use TokenKind::*;
    match self {
      Kw_And => "`and`",
      Kw_Or => "`or`",
      Kw_Not => "`not`",
      Kw_If => "`nani`",
      Kw_Else => "`daijobu`",
      Kw_While => "`yandere`",
      Kw_Break => "`yamero`",
      Kw_Continue => "`kowai`",
      Kw_Fn => "`desu`",
      Kw_Return => "`shinu`",
      Kw_NewVar => "`baka`",
      Kw_Class => "`waifu`",
      Kw_Extends => "`neesan`",
      Kw_Static => "`oppai`",
      Kw_Self => "`watashi`",
      Kw_Super => "`haha`",
      Kw_Import => "`senpai`",
      Brk_ParenL => "`(`",
      Brk_ParenR => "`)`",
      Op_Dot => "`.`",
      Tok_Comma => "`,`",
      Tok_Colon => "`:`",
      Tok_Question => "`?`",
      Tok_At => "`@`",
      Op_Arrow => "`<-`",
      Op_Equal => "`=`",
      Op_BangEqual => "`!=`",
      Op_Plus => "`+`",
      Op_Minus => "`-`",
      Op_Star => "`*`",
      Op_Slash => "`/`",
      Op_More => "`>`",
      Op_MoreEqual => "`>=`",
      Op_Less => "`<`",
      Op_LessEqual => "`<=`",
      Lit_Nil => "`baito`",
      Lit_Number => "number",
      Lit_Bool => "bool",
      Lit_String => "string",
      Lit_Ident => "identifier",
      Tok_Newline => "newline",
      Tok_Indent => "indent",
      Tok_Dedent => "dedent",
      Tok_Eof => "end of input",
      _Indentation | _Whitespace | _Comment | _UnterminatedString | Tok_Error => "invalid",
    }
  }
}

/// Kind-and-lexeme view of a token stream, for tests and debugging.
pub struct DebugToken<'src>(pub &'src Token, pub &'src str);

impl<'src> fmt::Debug for DebugToken<'src> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let kind = self.0.kind;
    match kind {
      TokenKind::Lit_Ident | TokenKind::Lit_Number | TokenKind::Lit_String => {
        write!(f, "({kind:?} `{}`)", &self.1[self.0.span.range()])
      }
      _ => write!(f, "({kind:?})"),
    }
  }
}

#[cfg(test)]
mod tests;
