//! Human-readable dumps of the published graphs.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{
    analysis::{CallGraph, Icfg},
    compiler::{context::AnalysisContext, events::EventKind, registry::AnalysisKind},
    Result,
};

/// File name of the call graph dump.
pub const CALLGRAPH_DOT: &str = "callgraph.dot";
/// File name of the ICFG dump.
pub const ICFG_DOT: &str = "icfg.dot";
/// File name of the ICFG edge listing.
pub const ICFG_EDGES: &str = "icfg.txt";

/// Writes a dump of every graph published in `ctx.results` into `dir`.
///
/// Returns the paths written. Graphs that have not been published are skipped.
///
/// # Errors
///
/// Returns [`Error::FileError`](crate::Error::FileError) if `dir` cannot be created or a
/// file cannot be written.
pub fn write_dumps(ctx: &AnalysisContext, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let program = ctx.program();
    let mut written = Vec::new();

    if let Some(call_graph) = ctx.results.get::<CallGraph>(AnalysisKind::CallGraph.id())? {
        written.push(write(ctx, dir, CALLGRAPH_DOT, &call_graph.to_dot(program))?);
    }
    if let Some(icfg) = ctx.results.get::<Icfg>(AnalysisKind::Icfg.id())? {
        written.push(write(ctx, dir, ICFG_DOT, &icfg.to_dot(program))?);
        written.push(write(ctx, dir, ICFG_EDGES, &icfg.edge_listing(program))?);
    }
    Ok(written)
}

fn write(ctx: &AnalysisContext, dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents)?;
    ctx.events
        .record(EventKind::DumpWritten)
        .message(format!("wrote {}", path.display()));
    Ok(path)
}
