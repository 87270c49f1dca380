mod commands;

pub use commands::{Cli, CollectionCommands, Commands};
