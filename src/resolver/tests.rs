use indoc::indoc;
use waifu_syntax::ast::{self, NodeId};

use super::*;

/// Collects the name-reference nodes of a module in traversal order, so a
/// test can line resolutions up against the source text.
fn collect_refs(body: &[ast::Stmt], out: &mut Vec<(String, NodeId)>) {
  for stmt in body {
    collect_stmt(stmt, out);
  }
}

fn collect_stmt(stmt: &ast::Stmt, out: &mut Vec<(String, NodeId)>) {
  match &**stmt {
    ast::StmtKind::Var(v) => {
      collect_expr(&v.value, out);
      out.push((v.name.to_string(), v.id));
    }
    ast::StmtKind::Expr(e) => collect_expr(e, out),
    ast::StmtKind::Block(body) => collect_refs(body, out),
    ast::StmtKind::If(i) => {
      collect_expr(&i.cond, out);
      collect_refs(&i.then, out);
      if let Some(otherwise) = &i.otherwise {
        collect_refs(otherwise, out);
      }
    }
    ast::StmtKind::While(w) => {
      collect_expr(&w.cond, out);
      collect_refs(&w.body, out);
    }
    ast::StmtKind::Ctrl(ctrl) => {
      if let ast::Ctrl::Return(Some(value)) = &**ctrl {
        collect_expr(value, out);
      }
    }
    ast::StmtKind::Func(f) => collect_func(f, out),
    ast::StmtKind::Class(c) => {
      for sup in &c.supers {
        out.push((sup.name.to_string(), sup.id));
      }
      for method in &c.methods {
        collect_func(&method.func, out);
      }
    }
    ast::StmtKind::Import(_) => {}
  }
}

fn collect_func(f: &ast::Func, out: &mut Vec<(String, NodeId)>) {
  if let Some(decorator) = &f.decorator {
    out.push((decorator.name.to_string(), decorator.id));
  }
  collect_refs(&f.body, out);
}

fn collect_expr(expr: &ast::Expr, out: &mut Vec<(String, NodeId)>) {
  match &**expr {
    ast::ExprKind::Literal(_) => {}
    ast::ExprKind::Grouping(inner) => collect_expr(inner, out),
    ast::ExprKind::Binary(b) => {
      collect_expr(&b.left, out);
      collect_expr(&b.right, out);
    }
    ast::ExprKind::Logical(l) => {
      collect_expr(&l.left, out);
      collect_expr(&l.right, out);
    }
    ast::ExprKind::Unary(u) => collect_expr(&u.right, out),
    ast::ExprKind::GetVar(v) => out.push((v.name.to_string(), v.id)),
    ast::ExprKind::Assign(a) => {
      collect_expr(&a.value, out);
      out.push((a.name.to_string(), a.id));
    }
    ast::ExprKind::GetField(g) => collect_expr(&g.target, out),
    ast::ExprKind::SetField(s) => {
      collect_expr(&s.target, out);
      collect_expr(&s.value, out);
    }
    ast::ExprKind::Call(c) => {
      collect_expr(&c.callee, out);
      for arg in &c.args {
        collect_expr(arg, out);
      }
    }
    ast::ExprKind::GetSelf(s) => out.push(("watashi".to_string(), s.id)),
    ast::ExprKind::GetSuper(s) => out.push(("haha".to_string(), s.id)),
    ast::ExprKind::Lambda(f) => collect_func(f, out),
  }
}

struct Resolved {
  resolution: Resolution,
  refs: Vec<(String, NodeId)>,
}

impl Resolved {
  /// Depth and slot of the `n`-th reference to `name`, in source order.
  fn of(&self, name: &str, n: usize) -> Option<(usize, usize)> {
    let (_, id) = self
      .refs
      .iter()
      .filter(|(r, _)| r == name)
      .nth(n)
      .unwrap_or_else(|| panic!("no reference #{n} to {name}"));
    self.resolution.vars.get(id).copied()
  }

  fn messages(&self) -> Vec<&str> {
    self
      .resolution
      .diagnostics
      .iter()
      .map(|d| d.message.as_str())
      .collect()
  }

  fn unused_names(&self) -> Vec<&str> {
    self
      .resolution
      .unused
      .iter()
      .map(|(_, name)| name.as_str())
      .collect()
  }
}

fn resolve(src: &str) -> Resolved {
  let ast = waifu_syntax::parse(src).expect("source should parse");
  let mut waifu = Waifu::new();
  let resolution =
    Resolver::resolve(&mut waifu, &ast, Path::new("test.waifu")).expect("no fatal import errors");
  let mut refs = Vec::new();
  collect_refs(&ast.body, &mut refs);
  Resolved { resolution, refs }
}

// the globals scope is preloaded with `input` (slot 0) and `print`
// (slot 1), so user bindings start at slot 2

#[test]
fn global_read_resolves_to_the_top_frame() {
  let r = resolve("i <- 10\ni\n");
  assert_eq!(r.resolution.vars.len(), 1);
  assert_eq!(r.of("i", 1), Some((0, 2)));
  assert!(r.messages().is_empty());
}

#[test]
fn nested_function_scopes() {
  let src = indoc! {r#"
    desu f(a):
      desu g(b):
        a <- b
      g(a)
      shinu a
    f(12)
  "#};
  let r = resolve(src);
  // inside g: b is g's first slot, the assignment to a reaches f's scope
  assert_eq!(r.of("b", 0), Some((0, 0)));
  assert_eq!(r.of("a", 0), Some((1, 0)));
  // back in f: g sits next to a, reads of a stay local
  assert_eq!(r.of("g", 0), Some((0, 1)));
  assert_eq!(r.of("a", 1), Some((0, 0)));
  assert_eq!(r.of("a", 2), Some((0, 0)));
  // the call to f lands in the globals
  assert_eq!(r.of("f", 0), Some((0, 2)));
  assert!(r.messages().is_empty());
  assert!(r.unused_names().is_empty());
}

#[test]
fn block_scopes_count_toward_depth() {
  let src = indoc! {r#"
    desu f(n):
      nani true:
        n <- n + 1
      shinu n
    f(1)
  "#};
  let r = resolve(src);
  // inside the block, n lives one frame up in f's scope
  assert_eq!(r.of("n", 0), Some((1, 0)));
  assert_eq!(r.of("n", 1), Some((1, 0)));
  // after the block
  assert_eq!(r.of("n", 2), Some((0, 0)));
}

#[test]
fn method_scopes_include_watashi_and_haha() {
  let src = indoc! {r#"
    waifu A:
      desu f():
        shinu 1
    waifu B neesan A:
      desu f():
        shinu haha.f() + watashi.g()
      desu g():
        shinu 2
  "#};
  let r = resolve(src);
  // from a method body: params (empty) at 0, watashi at 1, haha at 2
  assert_eq!(r.of("haha", 0), Some((2, 0)));
  assert_eq!(r.of("watashi", 0), Some((1, 0)));
  // the superclass reference resolves in the globals, after the builtins
  assert_eq!(r.of("A", 0), Some((0, 2)));
  assert!(r.messages().is_empty());
}

#[test]
fn unresolved_reads_have_no_entry() {
  let r = resolve("ghost\n");
  assert_eq!(r.of("ghost", 0), None);
  // deferred to the evaluator, not a resolution error
  assert!(r.messages().is_empty());
}

#[test]
fn baka_in_locals_is_checked() {
  let src = indoc! {r#"
    desu f():
      baka i <- 3
      baka i <- 4
      shinu i
  "#};
  let r = resolve(src);
  assert_eq!(
    r.messages(),
    vec!["Can't use 'baka' cause 'i' is already defined in current scope."]
  );
}

#[test]
fn global_baka_redefinition_is_allowed() {
  let r = resolve("baka i <- 2\nbaka i <- 3\ni\n");
  assert!(r.messages().is_empty());
  // both definitions share one slot
  assert_eq!(r.of("i", 2), Some((0, 2)));
}

#[test]
fn return_context_checks() {
  let r = resolve("shinu 1\n");
  assert_eq!(r.messages(), vec!["Can't use 'shinu' outside of functions."]);

  let src = indoc! {r#"
    waifu P:
      desu shison():
        shinu 5
  "#};
  let r = resolve(src);
  assert_eq!(r.messages(), vec!["Can't return a value from 'shison'."]);

  // a bare return is fine in a constructor
  let src = indoc! {r#"
    waifu P:
      desu shison():
        shinu
  "#};
  let r = resolve(src);
  assert!(r.messages().is_empty());
}

#[test]
fn class_context_checks() {
  let r = resolve("watashi\n");
  assert_eq!(r.messages(), vec!["Can't use 'watashi' outside of classes."]);

  let src = indoc! {r#"
    waifu A:
      desu f():
        shinu haha.f()
  "#};
  let r = resolve(src);
  assert_eq!(
    r.messages(),
    vec!["Can't use 'haha' in a class with no superclass."]
  );

  let src = indoc! {r#"
    waifu A neesan A:
      desu f():
        shinu 1
  "#};
  let r = resolve(src);
  assert_eq!(r.messages(), vec!["A class can't inherit from itself."]);
}

#[test]
fn unused_variables_are_collected_per_scope() {
  let src = indoc! {r#"
    desu f(used, ignored):
      shinu used
    f(1, 2)
    leftover <- 3
  "#};
  let r = resolve(src);
  // inner scopes pop first, the globals close out the list
  assert_eq!(r.unused_names(), vec!["ignored", "leftover"]);
}

#[test]
fn declarations_never_warn_as_unused() {
  let src = indoc! {r#"
    desu never_called():
      shinu 1
    waifu NeverUsed:
      desu f():
        shinu 2
  "#};
  let r = resolve(src);
  assert!(r.unused_names().is_empty());
}

#[test]
fn decorators_mark_their_target_used() {
  let src = indoc! {r#"
    desu dec(f):
      shinu f
    @dec
    desu g():
      shinu 1
    g()
  "#};
  let r = resolve(src);
  assert!(r.unused_names().is_empty());
  assert!(r.messages().is_empty());
  // the decorator reference resolves like any read
  assert_eq!(r.of("dec", 0), Some((0, 2)));
}
