pub mod config;
pub mod directive;
pub mod entity;
pub mod error;
pub mod locator;
pub mod parser;
pub mod source;

pub use config::{CommandDef, Config, ConfigPatch, LangDef};
pub use entity::MarkcheckEntity;
pub use error::{EntityContext, MarkcheckSyntaxError};
pub use parser::{ParsedDocument, Parser};
