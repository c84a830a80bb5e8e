use indoc::indoc;

use super::*;

fn render(src: &str) -> String {
  let tokens = lex(src).expect("lexing failed");
  tokens
    .iter()
    .map(|t| format!("{:?}", DebugToken(t, src)))
    .collect::<Vec<_>>()
    .join(" ")
}

fn kinds(src: &str) -> Vec<TokenKind> {
  lex(src).expect("lexing failed").iter().map(|t| t.kind).collect()
}

fn errors(src: &str) -> Vec<String> {
  match lex(src) {
    Ok(_) => vec![],
    Err(errors) => errors.into_iter().map(|e| e.message.to_string()).collect(),
  }
}

#[test]
fn empty_input() {
  assert_eq!(kinds(""), vec![TokenKind::Tok_Eof]);
}

#[test]
fn simple_tokens() {
  use TokenKind::*;
  assert_eq!(kinds("<-"), vec![Op_Arrow, Tok_Newline, Tok_Eof]);
  assert_eq!(kinds("."), vec![Op_Dot, Tok_Newline, Tok_Eof]);
  assert_eq!(kinds("<="), vec![Op_LessEqual, Tok_Newline, Tok_Eof]);
  assert_eq!(kinds("<"), vec![Op_Less, Tok_Newline, Tok_Eof]);
  assert_eq!(kinds(">="), vec![Op_MoreEqual, Tok_Newline, Tok_Eof]);
  assert_eq!(kinds("("), vec![Brk_ParenL, Tok_Newline, Tok_Eof]);
  assert_eq!(kinds("@"), vec![Tok_At, Tok_Newline, Tok_Eof]);
  assert_eq!(kinds("baka"), vec![Kw_NewVar, Tok_Newline, Tok_Eof]);
  assert_eq!(kinds("yamero"), vec![Kw_Break, Tok_Newline, Tok_Eof]);
  assert_eq!(kinds("kowai"), vec![Kw_Continue, Tok_Newline, Tok_Eof]);
  assert_eq!(kinds("senpai"), vec![Kw_Import, Tok_Newline, Tok_Eof]);
  // a number runs as far as it can, the rest is an identifier
  assert_eq!(kinds("1f"), vec![Lit_Number, Lit_Ident, Tok_Newline, Tok_Eof]);
  // keyword prefixes are identifiers
  assert_eq!(kinds("bakari"), vec![Lit_Ident, Tok_Newline, Tok_Eof]);
}

#[test]
fn expression_line() {
  insta::assert_snapshot!(
    render("print(1 + 2 * 3)\n"),
    @"(Lit_Ident `print`) (Brk_ParenL) (Lit_Number `1`) (Op_Plus) (Lit_Number `2`) (Op_Star) (Lit_Number `3`) (Brk_ParenR) (Tok_Newline) (Tok_Eof)"
  );
}

#[test]
fn block_tokens() {
  let src = indoc! {r#"
    yandere baito:
      42
  "#};
  insta::assert_snapshot!(
    render(src),
    @"(Kw_While) (Lit_Nil) (Tok_Colon) (Tok_Newline) (Tok_Indent) (Lit_Number `42`) (Tok_Newline) (Tok_Dedent) (Tok_Eof)"
  );
}

#[test]
fn nested_blocks_closed_at_eof() {
  let src = "nani a:\n  nani b:\n    c";
  use TokenKind::*;
  assert_eq!(
    kinds(src),
    vec![
      Kw_If, Lit_Ident, Tok_Colon, Tok_Newline, Tok_Indent, Kw_If, Lit_Ident, Tok_Colon,
      Tok_Newline, Tok_Indent, Lit_Ident, Tok_Newline, Tok_Dedent, Tok_Dedent, Tok_Eof,
    ]
  );
}

#[test]
fn blank_line_does_not_close_block() {
  let src = "nani true:\n  a\n\n  b\n";
  use TokenKind::*;
  assert_eq!(
    kinds(src),
    vec![
      Kw_If, Lit_Bool, Tok_Colon, Tok_Newline, Tok_Indent, Lit_Ident, Tok_Newline, Lit_Ident,
      Tok_Newline, Tok_Dedent, Tok_Eof,
    ]
  );
}

#[test]
fn comment_line_does_not_affect_blocks() {
  let src = "nani true:\n  a\n# outdented comment\n  b\n";
  use TokenKind::*;
  assert_eq!(
    kinds(src),
    vec![
      Kw_If, Lit_Bool, Tok_Colon, Tok_Newline, Tok_Indent, Lit_Ident, Tok_Newline, Lit_Ident,
      Tok_Newline, Tok_Dedent, Tok_Eof,
    ]
  );
}

#[test]
fn comment_only_file() {
  assert_eq!(kinds("# nothing here\n"), vec![TokenKind::Tok_Eof]);
}

#[test]
fn dedent_per_level() {
  let src = "nani a:\n  nani b:\n    c\nd\n";
  let dedents = kinds(src)
    .into_iter()
    .filter(|k| *k == TokenKind::Tok_Dedent)
    .count();
  assert_eq!(dedents, 2);
}

#[test]
fn strings() {
  assert_eq!(
    render(r#""konnichiwa""#),
    r#"(Lit_String `"konnichiwa"`) (Tok_Newline) (Tok_Eof)"#
  );
  // strings may span lines and carry no escapes
  assert_eq!(
    kinds("\"a\nb\""),
    vec![TokenKind::Lit_String, TokenKind::Tok_Newline, TokenKind::Tok_Eof]
  );
}

#[test]
fn unterminated_string() {
  assert_eq!(errors(r#""never ends"#), vec!["Unterminated string."]);
}

#[test]
fn indent_without_colon() {
  assert_eq!(
    errors("a\n  b\n"),
    vec!["Can not indent without block creation."]
  );
}

#[test]
fn colon_without_indent() {
  assert_eq!(
    errors("nani a:\nb\n"),
    vec!["Expect indentation after block creation."]
  );
}

#[test]
fn dedent_after_colon() {
  assert_eq!(
    errors("nani a:\n  nani b:\nc\n"),
    vec!["Can not dedent after block creation."]
  );
}

#[test]
fn dedent_to_unknown_level() {
  assert_eq!(
    errors("nani a:\n    b\n  c\n"),
    vec!["Dedent does not match any outer indentation level."]
  );
}

#[test]
fn unexpected_character() {
  assert_eq!(errors("a ; b\n"), vec!["Unexpected character: ;."]);
  // `!` is only valid as part of `!=`
  assert_eq!(errors("not !a\n"), vec!["Unexpected character: !."]);
}

#[test]
fn lexing_continues_past_errors() {
  let errors = errors("; ;\n$\n");
  assert_eq!(errors.len(), 3);
}

#[test]
fn indentation_balance() {
  // every INDENT has a matching DEDENT, even without trailing newline
  for src in ["nani a:\n  b", "nani a:\n  nani b:\n    c\n  d", "a\n"] {
    let (mut indents, mut dedents) = (0, 0);
    for kind in kinds(src) {
      match kind {
        TokenKind::Tok_Indent => indents += 1,
        TokenKind::Tok_Dedent => dedents += 1,
        _ => {}
      }
    }
    assert_eq!(indents, dedents, "unbalanced for {src:?}");
  }
}
