pub mod asset_path;
pub mod catalog;
pub mod matcher;
pub mod rewrite;
pub mod script;
pub mod similarity;
pub mod string_distance;
pub mod tokenizer;
