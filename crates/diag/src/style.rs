use std::fmt;
use std::fmt::Display;

use owo_colors::OwoColorize;

pub struct Style {
  pub enabled: bool,
  pub style: owo_colors::Style,
}

impl Style {
  pub fn paint<'a, T: Display + 'a>(&'a self, inner: T) -> Styled<'a, T> {
    Styled {
      inner,
      style: self.enabled.then_some(&self.style),
    }
  }
}

pub struct Styled<'a, T: Display + 'a> {
  inner: T,
  style: Option<&'a owo_colors::Style>,
}

impl<'a, T: Display> Display for Styled<'a, T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Some(style) = self.style {
      write!(f, "{}", self.inner.style(*style))
    } else {
      write!(f, "{}", self.inner)
    }
  }
}
