pub mod assembler;
pub mod color;
pub mod model;
pub mod parser;
pub mod reconciler;

pub use assembler::{assemble, error_result, new_request_id};
pub use color::HexColor;
pub use model::{PaletteSlot, SuggestionResult};
pub use parser::{parse_color_list, ParseStrategy, ParsedColors};
pub use reconciler::reconcile;
