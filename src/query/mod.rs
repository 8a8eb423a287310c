// Submodules for separation of concerns
mod compile;
mod description;
mod macros;
mod placeholder;
mod target;

// Public API re-exports
pub use compile::{compile, compile_text};
pub use description::{QueryDescription, QueryType};
pub use macros::{QUERY_TOKEN, expand, render_argument, render_template};
pub use placeholder::{FROM_TOKEN, MAX_DATA_POINTS_TOKEN, TO_TOKEN, date_literal, substitute};
pub use target::{Target, parse_target};
