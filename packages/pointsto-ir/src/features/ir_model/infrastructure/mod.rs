pub mod model_adapter;
pub mod parser;

pub use model_adapter::ModuleModel;
pub use parser::{parse_module, ParseError};
