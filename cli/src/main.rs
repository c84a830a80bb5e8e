use std::path::PathBuf;

use clap::Parser;

/// Run a Waifu source file.
#[derive(Debug, Parser)]
#[clap(name = "waifu", version, arg_required_else_help = true)]
struct App {
  /// Path to the entry `.waifu` file.
  path: PathBuf,
}

fn main() -> anyhow::Result<()> {
  let app = App::parse();

  let color = supports_color::on(supports_color::Stream::Stderr)
    .map(|c| c.has_basic)
    .unwrap_or(false);

  let mut waifu = waifu::Waifu::builder().color(color).finish();
  if waifu.run_file(&app.path).is_err() {
    // diagnostics are already on stderr
    anyhow::bail!("Failed to run {}", app.path.display());
  }

  Ok(())
}
