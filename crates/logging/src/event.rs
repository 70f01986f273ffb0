//! Diagnostic event queue drained by tests and by the CLI surface this crate
//! is embedded in.

use crate::flags::{DebugFlag, InfoFlag};

/// A single logged diagnostic, captured in order of emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// A debug-category event.
    Debug {
        /// Which debug category fired.
        flag: DebugFlag,
        /// The level it fired at.
        level: u8,
        /// Rendered message.
        message: String,
    },
    /// An info-category event.
    Info {
        /// Which info category fired.
        flag: InfoFlag,
        /// The level it fired at.
        level: u8,
        /// Rendered message.
        message: String,
    },
}
