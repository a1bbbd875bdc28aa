#![forbid(unsafe_code)]

//! Projections over a resolved [`cf_core::FlowGraph`]: the flat traversal
//! array, the per-language prompt map, and the metadata both share. All
//! projectors are pure functions of the graph (plus the injected policy and
//! heuristic); projecting twice yields byte-identical output.

mod classify;
mod flat;
mod langmap;
mod metadata;

pub use classify::{NodeAnnotations, annotate};
pub use flat::project_flat;
pub use langmap::{SelectionHeuristic, SubstringSelection, project_languages};
pub use metadata::summarize;
