//! Format handlers

mod json;
mod raw;
mod toml;
mod yaml;

pub use self::json::JsonHandler;
pub use self::raw::RawHandler;
pub use self::toml::TomlHandler;
pub use self::yaml::YamlHandler;
