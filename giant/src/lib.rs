//! The `giant` binary's supporting library: config-file loading shared by
//! every subcommand. Kept separate from `main.rs` (which also declares the
//! `clap`-derived CLI surface itself) so config parsing can be exercised
//! without the `cli` feature enabled.

pub mod config;

pub use config::GiantConfig;
