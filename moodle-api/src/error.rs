use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure kinds surfaced by the extraction and scoring pipeline. The first
/// error encountered aborts the whole invocation; there is no partial-result
/// recovery.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure or non-2xx status from the LMS.
    #[error("GET {url} failed")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// An expected element was absent where one is required, e.g. no course
    /// link matched the requested name.
    #[error("could not find {what}")]
    NotFound { what: String },

    /// A mandatory extraction target is missing from the page.
    #[error("missing mandatory element: {target}")]
    Structure { target: String },

    /// A grading row is missing a sub-element the resolver cannot do without.
    #[error("grading row {row} is missing its {missing}")]
    MalformedRow { row: usize, missing: &'static str },

    /// The scoring service call failed or returned non-conforming output.
    /// Never produced for the "no eligible answer" case, which is a local
    /// fallback branch.
    #[error("scoring service failed: {detail}")]
    Scoring { detail: String },
}
