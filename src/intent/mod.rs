//! 意图层：schema 定义与抽取适配器

pub mod extractor;
pub mod schema;

pub use extractor::{parse_intent, IntentExtractor};
pub use schema::{intent_schema_json, CreateActivityArgs, Intent, Tool};
