//! Console output for `woof lint` and `woof run`: a human-readable
//! colorized form and a machine-readable JSON-Lines form, selected by
//! `--format`.

pub mod json_lines;
pub mod text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}
