#![forbid(unsafe_code)]

mod command;
mod reply;

pub use command::{Command, validate_key};
pub use reply::{parse_array, parse_integer, try_parse_array, try_parse_integer};
