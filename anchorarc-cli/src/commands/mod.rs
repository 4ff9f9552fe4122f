//! Command implementations for the anchorarc CLI.

pub mod list;
pub mod pack;
pub mod unpack;

pub use list::{ListOptions, cmd_list};
pub use pack::cmd_pack;
pub use unpack::cmd_unpack;
