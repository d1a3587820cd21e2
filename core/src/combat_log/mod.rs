mod combat_event;
mod error;
mod parser;
mod reader;

pub use combat_event::*;
pub use error::TokenizeError;
pub use parser::{LineOutcome, LogParser, format_clock};
pub use reader::{Tokenizer, TokenizerStats};
