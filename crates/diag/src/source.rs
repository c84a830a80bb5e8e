use std::borrow::Cow;

use span::Span;

/// A named piece of source text.
#[derive(Clone, Debug)]
pub struct Source<'a> {
  name: Option<Cow<'a, str>>,
  str: Cow<'a, str>,
}

impl<'a> Source<'a> {
  pub fn string(str: impl Into<Cow<'a, str>>) -> Self {
    Source {
      name: None,
      str: str.into(),
    }
  }

  pub fn file(name: impl Into<Cow<'a, str>>, str: impl Into<Cow<'a, str>>) -> Self {
    Source {
      name: Some(name.into()),
      str: str.into(),
    }
  }

  pub fn name(&self) -> Option<&str> {
    self.name.as_deref()
  }

  pub fn str(&self) -> &str {
    self.str.as_ref()
  }

  pub fn line_index(&self) -> LineIndex {
    LineIndex::new(self.str())
  }
}

impl<'a> From<&'a str> for Source<'a> {
  fn from(value: &'a str) -> Self {
    Source::string(value)
  }
}

impl<'a> From<String> for Source<'a> {
  fn from(value: String) -> Self {
    Source::string(value)
  }
}

/// Maps byte offsets to 1-based line numbers.
///
/// Outlives the text it was built from, so runtime diagnostics can still be
/// attributed to lines after a module's source buffer has been dropped.
#[derive(Clone, Debug)]
pub struct LineIndex {
  // Byte offset of the first character of each line.
  starts: Vec<usize>,
}

impl LineIndex {
  pub fn new(src: &str) -> Self {
    let mut starts = vec![0];
    starts.extend(src.char_indices().filter(|(_, c)| *c == '\n').map(|(i, _)| i + 1));
    Self { starts }
  }

  /// The 1-based line containing `offset`. Offsets past the end of the
  /// source land on the last line.
  pub fn line_of(&self, offset: usize) -> u32 {
    let line = match self.starts.binary_search(&offset) {
      Ok(i) => i,
      Err(i) => i - 1,
    };
    (line + 1) as u32
  }

  pub fn line_of_span(&self, span: Span) -> u32 {
    self.line_of(span.start)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn line_lookup() {
    let index = LineIndex::new("a\nbb\n\nccc\n");
    assert_eq!(index.line_of(0), 1);
    assert_eq!(index.line_of(1), 1);
    assert_eq!(index.line_of(2), 2);
    assert_eq!(index.line_of(4), 2);
    assert_eq!(index.line_of(5), 3);
    assert_eq!(index.line_of(6), 4);
    assert_eq!(index.line_of(9), 4);
    // past the end
    assert_eq!(index.line_of(100), 5);
  }

  #[test]
  fn line_lookup_empty_source() {
    let index = LineIndex::new("");
    assert_eq!(index.line_of(0), 1);
  }
}
