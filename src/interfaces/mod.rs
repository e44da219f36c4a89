//! Boundary adapters. The engine itself is transport-agnostic; CSV is
//! the demo intake/report format used by the CLI.

pub mod csv;
