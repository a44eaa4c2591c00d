//! Line-oriented control protocol
//!
//! Input: one `:`-delimited command per line. Output: status lines, the
//! framed device listing, and in-place elapsed-time progress.

pub mod command;
pub mod output;

pub use command::{parse_line, Command, CommandKind, SourceSelection};
pub use output::{write_outputs, Output, OutputReceiver, OutputSender};
