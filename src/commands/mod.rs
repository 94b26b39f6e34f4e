//! Validated entry points shared by the CLI and any embedding host.

pub mod rules;
pub mod trigger;
