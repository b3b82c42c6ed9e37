//
// cli/mod.rs
//
// Subcommands of the `luadoc` binary
//

pub mod analysis_stats;
pub mod goto;
