pub mod report;
pub mod source;
mod style;

pub use report::{Level, Report};
pub use source::{LineIndex, Source};
