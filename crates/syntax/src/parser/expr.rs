use beef::lean::Cow;

use super::*;

impl<'src> Parser<'src> {
  pub(super) fn expr(&mut self) -> Result<ast::Expr> {
    if self.current().is(Tok_Question) {
      return self.lambda_expr();
    }
    self.or_expr()
  }

  /// `? a, b: body` becomes an anonymous function whose body is a single
  /// `shinu body`.
  fn lambda_expr(&mut self) -> Result<ast::Expr> {
    self.expect(Tok_Question)?;
    let start = self.previous().span;

    let mut params: Vec<ast::Ident> = Vec::new();
    if self.current().is(Lit_Ident) {
      loop {
        let param = self.ident()?;
        if params.contains(&param) {
          return Err(Error::new(
            format!("Duplicate parameter '{param}'."),
            param.span,
          ));
        }
        params.push(param);
        if !self.bump_if(Tok_Comma) {
          break;
        }
      }
    }
    if self.expect(Tok_Colon).is_err() {
      return Err(Error::new(
        "Expect ':' after lambda parameters.",
        self.current().span,
      ));
    }

    let id = self.node_id();
    let body = self.expr()?;
    let end = body.span;
    let func = ast::Func {
      id,
      decorator: None,
      name: ast::Ident::new(start, Cow::borrowed("")),
      params,
      body: vec![ast::return_stmt(end, Some(body))],
    };
    Ok(ast::expr_lambda(start.join(end), func))
  }

  fn or_expr(&mut self) -> Result<ast::Expr> {
    let mut left = self.and_expr()?;
    while self.bump_if(Kw_Or) {
      let right = self.and_expr()?;
      let span = left.span.join(right.span);
      left = ast::expr_logical(span, ast::LogicalOp::Or, left, right);
    }
    Ok(left)
  }

  fn and_expr(&mut self) -> Result<ast::Expr> {
    let mut left = self.eq_expr()?;
    while self.bump_if(Kw_And) {
      let right = self.eq_expr()?;
      let span = left.span.join(right.span);
      left = ast::expr_logical(span, ast::LogicalOp::And, left, right);
    }
    Ok(left)
  }

  fn eq_expr(&mut self) -> Result<ast::Expr> {
    let mut left = self.comp_expr()?;
    loop {
      let op = match self.current().kind {
        Op_Equal => ast::BinaryOp::Eq,
        Op_BangEqual => ast::BinaryOp::Neq,
        _ => break,
      };
      self.bump(); // bump operator
      let right = self.comp_expr()?;
      let span = left.span.join(right.span);
      left = ast::expr_binary(span, op, left, right);
    }
    Ok(left)
  }

  fn comp_expr(&mut self) -> Result<ast::Expr> {
    let mut left = self.add_expr()?;
    loop {
      let op = match self.current().kind {
        Op_Less => ast::BinaryOp::Less,
        Op_LessEqual => ast::BinaryOp::LessEq,
        Op_More => ast::BinaryOp::More,
        Op_MoreEqual => ast::BinaryOp::MoreEq,
        _ => break,
      };
      self.bump(); // bump operator
      let right = self.add_expr()?;
      let span = left.span.join(right.span);
      left = ast::expr_binary(span, op, left, right);
    }
    Ok(left)
  }

  fn add_expr(&mut self) -> Result<ast::Expr> {
    let mut left = self.mul_expr()?;
    loop {
      let op = match self.current().kind {
        Op_Plus => ast::BinaryOp::Add,
        Op_Minus => ast::BinaryOp::Sub,
        _ => break,
      };
      self.bump(); // bump operator
      let right = self.mul_expr()?;
      let span = left.span.join(right.span);
      left = ast::expr_binary(span, op, left, right);
    }
    Ok(left)
  }

  fn mul_expr(&mut self) -> Result<ast::Expr> {
    let mut left = self.unary_expr()?;
    loop {
      let op = match self.current().kind {
        Op_Star => ast::BinaryOp::Mul,
        Op_Slash => ast::BinaryOp::Div,
        _ => break,
      };
      self.bump(); // bump operator
      let right = self.unary_expr()?;
      let span = left.span.join(right.span);
      left = ast::expr_binary(span, op, left, right);
    }
    Ok(left)
  }

  fn unary_expr(&mut self) -> Result<ast::Expr> {
    let op = match self.current().kind {
      Kw_Not => ast::UnaryOp::Not,
      Op_Minus => ast::UnaryOp::Neg,
      _ => return self.postfix_expr(),
    };
    self.bump(); // bump operator
    let start = self.previous().span;
    let right = self.unary_expr()?;
    let span = start.join(right.span);
    Ok(ast::expr_unary(span, op, right))
  }

  fn postfix_expr(&mut self) -> Result<ast::Expr> {
    let mut expr = self.primary_expr()?;
    loop {
      match self.current().kind {
        Brk_ParenL => {
          let args = self.call_args()?; // bumps `(`
          let span = expr.span.join(self.previous().span);
          expr = ast::expr_call(span, expr, args);
        }
        Op_Dot => {
          self.bump(); // bump `.`
          let name = self.ident()?;
          let span = expr.span.join(name.span);
          expr = ast::expr_get_field(span, expr, name);
        }
        _ => break,
      }
    }
    Ok(expr)
  }

  fn call_args(&mut self) -> Result<Vec<ast::Expr>> {
    self.expect(Brk_ParenL)?;
    let mut args = Vec::new();
    if !self.current().is(Brk_ParenR) {
      args.push(self.expr()?);
      while self.bump_if(Tok_Comma) {
        if args.len() == 127 {
          // soft limit, parsing continues
          self.errors.push(Error::new(
            "Can't have more than 127 arguments.",
            self.current().span,
          ));
        }
        args.push(self.expr()?);
      }
    }
    self.expect(Brk_ParenR)?;
    Ok(args)
  }

  fn primary_expr(&mut self) -> Result<ast::Expr> {
    check_recursion_limit(self.current().span)?;

    if self.bump_if(Lit_Nil) {
      return Ok(ast::lit::nil(self.previous().span));
    }

    if self.bump_if(Lit_Bool) {
      let span = self.previous().span;
      let lexeme = self.lexeme(span);
      return Ok(ast::lit::bool(span, lexeme));
    }

    if self.bump_if(Lit_Number) {
      let span = self.previous().span;
      let lexeme = self.lexeme(span);
      return ast::lit::num(span, lexeme);
    }

    if self.bump_if(Lit_String) {
      let span = self.previous().span;
      let lexeme = self.lexeme(span);
      return Ok(ast::lit::str(span, lexeme));
    }

    if self.bump_if(Kw_Self) {
      let span = self.previous().span;
      let id = self.node_id();
      return Ok(ast::expr_get_self(span, id));
    }

    if self.bump_if(Kw_Super) {
      let span = self.previous().span;
      if self.expect(Op_Dot).is_err() {
        return Err(Error::new("Expect '.' after 'haha'.", self.current().span));
      }
      let method = self.ident()?;
      let id = self.node_id();
      return Ok(ast::expr_get_super(span.join(method.span), id, method));
    }

    if self.current().is(Lit_Ident) {
      let name = self.ident()?;
      let id = self.node_id();
      return Ok(ast::expr_get_var(id, name));
    }

    if self.bump_if(Brk_ParenL) {
      let start = self.previous().span;
      let inner = self.expr()?;
      if self.expect(Brk_ParenR).is_err() {
        return Err(Error::new(
          "Expect ')' after expression.",
          self.current().span,
        ));
      }
      return Ok(ast::expr_grouping(start.join(self.previous().span), inner));
    }

    Err(self.unexpected())
  }
}
