//! Error reporting
//!
//! The entrypoint to this module is [Report][`crate::Report`]. Reports
//! render in the interpreter's user-visible format, `Line[<n>]: <message>`,
//! without a line anchor for multi-line compound messages (such as the
//! grouped unused-variable warning).

use std::fmt;
use std::fmt::Write;

use beef::lean::Cow;
use thiserror::Error;

use crate::style::Style;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
  Info,
  Warning,
  Error,
}

impl Level {
  fn style(&self) -> owo_colors::Style {
    let style = owo_colors::Style::new();
    match self {
      Level::Info => style.blue(),
      Level::Warning => style.yellow(),
      Level::Error => style.red(),
    }
  }
}

/// A single diagnostic, renderable to anything implementing [`fmt::Write`].
#[derive(Clone, Debug)]
pub struct Report<'a> {
  pub level: Level,
  pub line: Option<u32>,
  pub message: Cow<'a, str>,
  pub color: bool,
}

pub struct ReportBuilder<'a> {
  level: Level,
  line: Option<u32>,
  message: Option<Cow<'a, str>>,
  color: bool,
}

impl<'a> ReportBuilder<'a> {
  pub fn line(mut self, line: u32) -> Self {
    self.line = Some(line);
    self
  }

  pub fn message(mut self, message: impl Into<Cow<'a, str>>) -> Self {
    self.message = Some(message.into());
    self
  }

  pub fn color(mut self, enabled: bool) -> Self {
    self.color = enabled;
    self
  }

  pub fn build(self) -> Report<'a> {
    Report {
      level: self.level,
      line: self.line,
      message: self.message.unwrap_or_else(|| Cow::borrowed("")),
      color: self.color,
    }
  }
}

#[derive(Debug, Error)]
pub enum EmitError {
  #[error("failed to format report: {0}")]
  Fmt(#[from] fmt::Error),
}

impl<'a> Report<'a> {
  fn builder(level: Level) -> ReportBuilder<'a> {
    ReportBuilder {
      level,
      line: None,
      message: None,
      color: false,
    }
  }

  /// An `Info`-level report.
  pub fn info() -> ReportBuilder<'a> {
    Self::builder(Level::Info)
  }

  /// A `Warning`-level report.
  pub fn warning() -> ReportBuilder<'a> {
    Self::builder(Level::Warning)
  }

  /// An `Error`-level report.
  pub fn error() -> ReportBuilder<'a> {
    Self::builder(Level::Error)
  }

  pub fn emit(&self, w: &mut impl Write) -> Result<(), EmitError> {
    let style = Style {
      enabled: self.color,
      style: self.level.style(),
    };
    match self.line {
      Some(line) => write!(w, "{} {}", style.paint(format_args!("Line[{line}]:")), self.message)?,
      None => write!(w, "{}", self.message)?,
    }
    Ok(())
  }

  pub fn emit_to_string(&self) -> Result<String, EmitError> {
    let mut out = String::new();
    self.emit(&mut out)?;
    Ok(out)
  }
}
