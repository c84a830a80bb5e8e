//! Runs every `.waifu` script under `tests/scripts/` and validates it
//! against the expectations embedded in its comments:
//!
//! - `# expect: <line>` — a line the program must print, in order;
//! - `# Error: <text>` — a substring that must appear on stderr, and the
//!   run must fail;
//! - `# Warning: <text>` — a substring that must appear on stderr, with
//!   no bearing on the exit status.
//!
//! Files under a `modules/` directory are import fixtures, not tests.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use waifu::Waifu;

#[derive(Clone, Default)]
struct Sink(Rc<RefCell<Vec<u8>>>);

impl Sink {
  fn contents(&self) -> String {
    String::from_utf8_lossy(&self.0.borrow()).into_owned()
  }
}

impl io::Write for Sink {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.0.borrow_mut().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

fn collect_scripts(dir: &Path, out: &mut Vec<PathBuf>) {
  let entries = fs::read_dir(dir).unwrap_or_else(|e| panic!("read {}: {e}", dir.display()));
  let mut paths: Vec<_> = entries.map(|e| e.unwrap().path()).collect();
  paths.sort();
  for path in paths {
    if path.is_dir() {
      if path.file_name().map(|n| n == "modules").unwrap_or(false) {
        continue;
      }
      collect_scripts(&path, out);
    } else if path.extension().map(|e| e == "waifu").unwrap_or(false) {
      out.push(path);
    }
  }
}

struct Expectations {
  output: Vec<String>,
  errors: Vec<String>,
  warnings: Vec<String>,
}

fn parse_expectations(source: &str) -> Expectations {
  let mut expectations = Expectations {
    output: vec![],
    errors: vec![],
    warnings: vec![],
  };
  for line in source.lines() {
    if let Some((_, rest)) = line.split_once("# expect: ") {
      expectations.output.push(rest.to_string());
    } else if let Some((_, rest)) = line.split_once("# Error: ") {
      expectations.errors.push(rest.to_string());
    } else if let Some((_, rest)) = line.split_once("# Warning: ") {
      expectations.warnings.push(rest.to_string());
    }
  }
  expectations
}

fn run_script(path: &Path) -> Result<(), String> {
  let source =
    fs::read_to_string(path).map_err(|e| format!("could not read {}: {e}", path.display()))?;
  let expected = parse_expectations(&source);

  let stdout = Sink::default();
  let stderr = Sink::default();
  let mut waifu = Waifu::builder()
    .output(stdout.clone())
    .errors(stderr.clone())
    .input(io::Cursor::new(Vec::new()))
    .finish();
  let result = waifu.run_file(path);

  let stdout = stdout.contents();
  let stderr = stderr.contents();

  let printed: Vec<&str> = stdout.lines().collect();
  if printed != expected.output.iter().map(String::as_str).collect::<Vec<_>>() {
    return Err(format!(
      "output mismatch\nexpected: {:?}\ngot:      {printed:?}\nstderr:\n{stderr}",
      expected.output
    ));
  }

  for needle in expected.errors.iter().chain(&expected.warnings) {
    if !stderr.contains(needle) {
      return Err(format!("stderr does not contain {needle:?}:\n{stderr}"));
    }
  }

  if expected.errors.is_empty() && result.is_err() {
    return Err(format!("unexpected failure\nstderr:\n{stderr}"));
  }
  if !expected.errors.is_empty() && result.is_ok() {
    return Err("expected the run to fail, but it succeeded".to_string());
  }

  Ok(())
}

#[test]
fn example_scripts() {
  let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/scripts");
  let mut scripts = Vec::new();
  collect_scripts(&root, &mut scripts);
  assert!(!scripts.is_empty(), "no scripts found under {}", root.display());

  let mut failures = Vec::new();
  for script in &scripts {
    if let Err(message) = run_script(script) {
      failures.push(format!("--- {} ---\n{message}", script.display()));
    }
  }

  if !failures.is_empty() {
    panic!(
      "{} of {} scripts failed:\n\n{}",
      failures.len(),
      scripts.len(),
      failures.join("\n\n")
    );
  }
}
