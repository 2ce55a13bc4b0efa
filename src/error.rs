use thiserror::Error;

use crate::analysis::Direction;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which covers every error this library can return.
///
/// Missing CFGs during ICFG construction are deliberately *not* errors: they are
/// recorded as diagnostics in the [`EventLog`](crate::compiler::EventLog) and the
/// builder continues with a partial graph.
///
/// # Error Categories
///
/// ## IR construction
/// - [`Error::Malformed`] - Structurally invalid IR (dangling jump target, arity mismatch, ...)
/// - [`Error::UnknownFunction`] - A function name that the program does not define
///
/// ## Graphs
/// - [`Error::GraphError`] - An edge referencing a node outside its graph
///
/// ## Analysis pipeline
/// - [`Error::UnknownAnalysis`] - No factory registered under an identifier
/// - [`Error::IdentifierMismatch`] - A factory produced an analysis with a different identifier
/// - [`Error::MissingDependency`] - A plan runs an analysis before the results it requires
/// - [`Error::ResultType`] - A cached result requested with the wrong type
///
/// ## Solver
/// - [`Error::UnsupportedDirection`] - Backward analysis handed to the interprocedural solver
/// - [`Error::IterationLimit`] - The configured iteration bound was exceeded
///
/// ## I/O
/// - [`Error::FileError`] - Writing a graph dump failed
///
/// # Examples
///
/// ```rust
/// use midend::{ir::ProgramBuilder, Error};
///
/// let program = ProgramBuilder::new().build()?;
/// match program.function_by_name("main") {
///     Some(_) => println!("has main"),
///     None => println!("{}", Error::UnknownFunction("main".into())),
/// }
/// # Ok::<(), midend::Error>(())
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The IR is structurally invalid.
    ///
    /// Carries the location in this crate that detected the problem.
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// Filesystem I/O failed while writing dumps.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// A graph operation referenced a node or edge that does not exist.
    #[error("Graph error: {0}")]
    GraphError(String),

    /// The program has no function with this name.
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// No analysis factory is registered under this identifier.
    #[error("Unknown analysis: {0}")]
    UnknownAnalysis(String),

    /// A factory registered under `registered` produced an analysis reporting `declared`.
    #[error("Analysis registered as '{registered}' declares identifier '{declared}'")]
    IdentifierMismatch {
        /// Identifier the factory was registered under
        registered: String,
        /// Identifier reported by the created analysis
        declared: String,
    },

    /// An analysis ran before a result it requires was produced.
    #[error("Analysis '{analysis}' requires '{requires}', which has not been run")]
    MissingDependency {
        /// The analysis being run
        analysis: String,
        /// The missing prerequisite
        requires: String,
    },

    /// A cached result exists but has a different type than requested.
    #[error("Result '{0}' has a different type than requested")]
    ResultType(String),

    /// The interprocedural solver only drives forward analyses.
    #[error("Interprocedural solver does not support {0:?} analyses")]
    UnsupportedDirection(Direction),

    /// The solver did not reach a fixpoint within the configured number of node visits.
    #[error("No fixpoint after {0} iterations")]
    IterationLimit(usize),
}
