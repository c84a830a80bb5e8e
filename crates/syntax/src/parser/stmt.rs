use std::rc::Rc;

use super::*;

impl<'src> Parser<'src> {
  pub(super) fn declaration(&mut self) -> Result<ast::Stmt> {
    match self.current().kind {
      Tok_At => self.decorated_func_stmt(),
      Kw_Fn => self.func_stmt(None),
      Kw_Class => self.class_stmt(),
      Kw_Import => self.import_stmt(),
      _ => self.statement(),
    }
  }

  fn decorated_func_stmt(&mut self) -> Result<ast::Stmt> {
    self.expect(Tok_At)?;
    let name = self.ident()?;
    let id = self.node_id();
    let decorator = ast::GetVar { id, name };
    self.expect(Tok_Newline)?;
    if !self.current().is(Kw_Fn) {
      return Err(Error::new(
        "Decorators can only be applied to functions.",
        self.current().span,
      ));
    }
    self.func_stmt(Some(decorator))
  }

  fn func_stmt(&mut self, decorator: Option<ast::GetVar>) -> Result<ast::Stmt> {
    self.expect(Kw_Fn)?;
    let start = self.previous().span.start;
    let name = self.ident()?;
    let func = self.func(decorator, name)?;
    let end = self.previous().span.end;
    Ok(ast::func_stmt(start..end, func))
  }

  fn func(&mut self, decorator: Option<ast::GetVar>, name: ast::Ident) -> Result<ast::Func> {
    let id = self.node_id();
    let params = self.func_params()?;
    // `yamero`/`kowai` may not cross a function boundary into an outer loop.
    let body = self.with_ctx(Context::default(), Self::block)?;
    Ok(ast::Func {
      id,
      decorator,
      name,
      params,
      body,
    })
  }

  fn func_params(&mut self) -> Result<Vec<ast::Ident>> {
    self.expect(Brk_ParenL)?;
    let mut params: Vec<ast::Ident> = Vec::new();
    if !self.current().is(Brk_ParenR) {
      loop {
        let param = self.ident()?;
        if params.contains(&param) {
          return Err(Error::new(
            format!("Duplicate parameter '{param}'."),
            param.span,
          ));
        }
        if params.len() == 127 {
          // soft limit, parsing continues
          self
            .errors
            .push(Error::new("Can't have more than 127 parameters.", param.span));
        }
        params.push(param);
        if !self.bump_if(Tok_Comma) {
          break;
        }
      }
    }
    self.expect(Brk_ParenR)?;
    Ok(params)
  }

  fn class_stmt(&mut self) -> Result<ast::Stmt> {
    self.expect(Kw_Class)?;
    let start = self.previous().span.start;
    let id = self.node_id();
    let name = self.ident()?;

    let mut supers = Vec::new();
    if self.bump_if(Kw_Extends) {
      loop {
        let super_name = self.ident()?;
        let id = self.node_id();
        supers.push(ast::GetVar {
          id,
          name: super_name,
        });
        if !self.bump_if(Tok_Comma) {
          break;
        }
      }
    }

    self.expect(Tok_Colon)?;
    self.expect(Tok_Newline)?;
    self.expect(Tok_Indent)?;

    let mut methods = Vec::new();
    while !self.current().is(Tok_Dedent) && !self.current().is(Tok_Eof) {
      let is_static = self.bump_if(Kw_Static);
      if !self.current().is(Kw_Fn) {
        return Err(Error::new(
          "Class bodies can only contain method declarations.",
          self.current().span,
        ));
      }
      self.bump();
      let name = self.ident()?;
      let func = self.func(None, name)?;
      methods.push(ast::Method {
        is_static,
        func: Rc::new(func),
      });
    }
    self.expect(Tok_Dedent)?;

    let end = self.previous().span.end;
    Ok(ast::class_stmt(start..end, id, name, supers, methods))
  }

  fn import_stmt(&mut self) -> Result<ast::Stmt> {
    self.expect(Kw_Import)?;
    let start = self.previous().span.start;
    let mut dots = 0;
    while self.bump_if(Op_Dot) {
      dots += 1;
    }
    let mut path = vec![self.ident()?];
    while self.bump_if(Op_Dot) {
      path.push(self.ident()?);
    }
    let end = self.previous().span.end;
    self.expect(Tok_Newline)?;
    Ok(ast::import_stmt(start..end, dots, path))
  }

  fn statement(&mut self) -> Result<ast::Stmt> {
    match self.current().kind {
      Kw_If => self.if_stmt(),
      Kw_While => self.while_stmt(),
      Kw_Break => self.break_stmt(),
      Kw_Continue => self.continue_stmt(),
      Kw_Return => self.return_stmt(),
      Kw_NewVar => self.new_var_stmt(),
      _ => self.expr_stmt(),
    }
  }

  fn if_stmt(&mut self) -> Result<ast::Stmt> {
    self.expect(Kw_If)?;
    let start = self.previous().span.start;
    let cond = self.expr()?;
    let then = self.block()?;
    let otherwise = if self.bump_if(Kw_Else) {
      Some(self.block()?)
    } else {
      None
    };
    let end = self.previous().span.end;
    Ok(ast::if_stmt(start..end, cond, then, otherwise))
  }

  fn while_stmt(&mut self) -> Result<ast::Stmt> {
    self.expect(Kw_While)?;
    let start = self.previous().span.start;
    let cond = self.expr()?;
    let ctx = Context {
      loop_depth: self.ctx.loop_depth + 1,
    };
    let body = self.with_ctx(ctx, Self::block)?;
    let end = self.previous().span.end;
    Ok(ast::while_stmt(start..end, cond, body))
  }

  fn break_stmt(&mut self) -> Result<ast::Stmt> {
    self.expect(Kw_Break)?;
    let span = self.previous().span;
    if self.ctx.loop_depth == 0 {
      return Err(Error::new("Can't use 'yamero' outside of loops.", span));
    }
    self.expect(Tok_Newline)?;
    Ok(ast::break_stmt(span))
  }

  fn continue_stmt(&mut self) -> Result<ast::Stmt> {
    self.expect(Kw_Continue)?;
    let span = self.previous().span;
    if self.ctx.loop_depth == 0 {
      return Err(Error::new("Can't use 'kowai' outside of loops.", span));
    }
    self.expect(Tok_Newline)?;
    Ok(ast::continue_stmt(span))
  }

  fn return_stmt(&mut self) -> Result<ast::Stmt> {
    self.expect(Kw_Return)?;
    let start = self.previous().span.start;
    let value = if self.current().is(Tok_Newline) {
      None
    } else {
      Some(self.expr()?)
    };
    let end = self.previous().span.end;
    self.expect(Tok_Newline)?;
    Ok(ast::return_stmt(start..end, value))
  }

  fn new_var_stmt(&mut self) -> Result<ast::Stmt> {
    self.expect(Kw_NewVar)?;
    let target = self.expr()?;
    if self.expect(Op_Arrow).is_err() {
      return Err(Error::new(
        "Expect '<-' after 'baka' and a variable name.",
        self.current().span,
      ));
    }
    let value = self.assign_tail()?;
    let stmt = self.assign_stmt(target, value, true)?;
    self.expect(Tok_Newline)?;
    Ok(stmt)
  }

  fn expr_stmt(&mut self) -> Result<ast::Stmt> {
    let target = self.expr()?;
    let stmt = if self.bump_if(Op_Arrow) {
      let value = self.assign_tail()?;
      self.assign_stmt(target, value, false)?
    } else {
      ast::expr_stmt(target)
    };
    self.expect(Tok_Newline)?;
    Ok(stmt)
  }

  fn assign_stmt(&mut self, target: ast::Expr, value: ast::Expr, new_var: bool) -> Result<ast::Stmt> {
    let span = target.span.join(value.span);
    match target.into_inner() {
      ast::ExprKind::GetVar(v) => {
        let id = self.node_id();
        Ok(ast::var_stmt(span, id, new_var, v.name, value))
      }
      ast::ExprKind::GetField(f) if !new_var => Ok(ast::expr_stmt(ast::expr_set_field(
        span, f.target, f.name, value,
      ))),
      ast::ExprKind::GetField(_) => Err(Error::new(
        "Can't use 'baka' with property assignments.",
        span,
      )),
      _ => Err(Error::new("Invalid assignment target.", span)),
    }
  }

  /// Assignment is right-associative: `a <- b <- c` assigns `c` to `b`,
  /// then the value of that assignment (`c`) to `a`.
  pub(super) fn assign_tail(&mut self) -> Result<ast::Expr> {
    let target = self.expr()?;
    if !self.bump_if(Op_Arrow) {
      return Ok(target);
    }
    let value = self.assign_tail()?;
    let span = target.span.join(value.span);
    match target.into_inner() {
      ast::ExprKind::GetVar(v) => {
        let id = self.node_id();
        Ok(ast::expr_assign(span, id, v.name, value))
      }
      ast::ExprKind::GetField(f) => Ok(ast::expr_set_field(span, f.target, f.name, value)),
      _ => Err(Error::new("Invalid assignment target.", span)),
    }
  }

  pub(super) fn block(&mut self) -> Result<Vec<ast::Stmt>> {
    check_recursion_limit(self.current().span)?;
    self.expect(Tok_Colon)?;
    self.expect(Tok_Newline)?;
    self.expect(Tok_Indent)?;

    let mut body = vec![self.declaration()?];
    while !self.current().is(Tok_Dedent) && !self.current().is(Tok_Eof) {
      body.push(self.declaration()?);
    }

    self.expect(Tok_Dedent)?;
    Ok(body)
  }
}
