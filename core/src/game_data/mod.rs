mod calling;
mod effects;

pub use calling::Calling;
pub use effects::{event_code, kind_for_code, marker};
