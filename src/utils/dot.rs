//! Graphviz DOT rendering shared by the CFG, call graph and ICFG dumps.

use std::fmt::Write;

/// Escapes a label for use inside a double-quoted DOT string.
#[must_use]
pub fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace('<', "\\<")
        .replace('>', "\\>")
}

/// Incremental writer for a `digraph`.
///
/// Node identifiers are emitted verbatim and must already be valid DOT ids; labels and
/// attribute values are escaped.
#[derive(Debug)]
pub struct DotWriter {
    out: String,
}

impl DotWriter {
    /// Starts a digraph named `name` with a title label.
    #[must_use]
    pub fn new(name: &str, title: &str) -> Self {
        let mut out = String::new();
        let _ = writeln!(out, "digraph {name} {{");
        let _ = writeln!(out, "  label=\"{}\";", escape_dot(title));
        let _ = writeln!(out, "  labelloc=t;");
        let _ = writeln!(out, "  node [shape=box, fontname=\"monospace\"];");
        DotWriter { out }
    }

    /// Opens a `subgraph cluster_<id>` with the given label.
    pub fn begin_cluster(&mut self, id: &str, label: &str) {
        let _ = writeln!(self.out, "  subgraph cluster_{id} {{");
        let _ = writeln!(self.out, "    label=\"{}\";", escape_dot(label));
    }

    /// Closes the innermost cluster.
    pub fn end_cluster(&mut self) {
        let _ = writeln!(self.out, "  }}");
    }

    /// Emits a node. `attrs` are extra `key=value` pairs; values are quoted and escaped.
    pub fn node(&mut self, id: &str, label: &str, attrs: &[(&str, &str)]) {
        let _ = write!(self.out, "  {id} [label=\"{}\"", escape_dot(label));
        for (key, value) in attrs {
            let _ = write!(self.out, ", {key}=\"{}\"", escape_dot(value));
        }
        let _ = writeln!(self.out, "];");
    }

    /// Emits an edge `source -> target`.
    pub fn edge(&mut self, source: &str, target: &str, label: &str, attrs: &[(&str, &str)]) {
        let _ = write!(self.out, "  {source} -> {target}");
        let _ = write!(self.out, " [label=\"{}\"", escape_dot(label));
        for (key, value) in attrs {
            let _ = write!(self.out, ", {key}=\"{}\"", escape_dot(value));
        }
        let _ = writeln!(self.out, "];");
    }

    /// Closes the digraph and returns the rendered text.
    #[must_use]
    pub fn finish(mut self) -> String {
        self.out.push_str("}\n");
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_dot() {
        assert_eq!(escape_dot("plain"), "plain");
        assert_eq!(escape_dot("say \"hi\""), "say \\\"hi\\\"");
        assert_eq!(escape_dot("a\r\nb"), "a\\nb");
        assert_eq!(escape_dot("x < y"), "x \\< y");
    }

    #[test]
    fn test_writer_renders_nodes_and_edges() {
        let mut dot = DotWriter::new("G", "main");
        dot.node("n0", "a = 1", &[]);
        dot.node("n1", "return a", &[("shape", "ellipse")]);
        dot.edge("n0", "n1", "", &[("style", "dashed")]);
        let text = dot.finish();

        assert!(text.starts_with("digraph G {"));
        assert!(text.contains("n0 [label=\"a = 1\"];"));
        assert!(text.contains("n1 [label=\"return a\", shape=\"ellipse\"];"));
        assert!(text.contains("n0 -> n1 [label=\"\", style=\"dashed\"];"));
        assert!(text.ends_with("}\n"));
    }
}
