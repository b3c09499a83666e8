pub mod json;
pub mod markdown;
pub mod sarif;
pub mod terminal;

pub use json::JsonReporter;
pub use markdown::MarkdownReporter;
pub use sarif::SarifReporter;
pub use terminal::TerminalReporter;

use crate::types::ScanReport;

pub trait Reporter {
    fn report(&self, report: &ScanReport) -> String;
}
