mod command;
mod runner;
mod util;

pub use command::Command;
pub use runner::{OutputMode, run, run_with_format};
pub use util::{load_settings, parse_kind_input, parse_time_input, read_arg};
