pub use self::parser::{Config, FetchConfig};
pub use self::validator::ConfigError;

mod parser;
mod validator;
