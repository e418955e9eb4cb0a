use crate::unregex::UnregexError;
use thiserror::Error;

/// Result alias used across the generator crate.
pub type GenResult<T> = Result<T, GenError>;

/// Fatal generation errors. Nothing here is recovered locally: the first
/// error aborts the whole run, because partially-correct generated code is
/// strictly worse than no generated code.
#[derive(Debug, Error)]
pub enum GenError {
    /// A type reference that does not resolve through the registry.
    #[error("unresolved type reference '{name}' in namespace '{namespace}'")]
    UnresolvedTypeRef { namespace: String, name: String },

    /// An optional (nullable) struct payload of a union variant whose struct
    /// has no required fields: tag-without-fields is indistinguishable from
    /// a null payload on the wire.
    #[error("{union}.{variant}: an optional struct with no required fields is ambiguous")]
    AmbiguousOptionalVariant { union: String, variant: String },

    /// A tag-reference default naming a variant the target union lacks.
    #[error("no variant named '{tag}' in union {union}")]
    UnknownTagRefVariant { union: String, tag: String },

    /// A default value the generator has no rendering for.
    #[error("unsupported default value for field '{field}': {detail}")]
    UnsupportedDefault { field: String, detail: String },

    /// A route auth combination the generator does not support.
    #[error("route {namespace}/{route}: unsupported auth type(s): {auth}")]
    UnsupportedAuth {
        namespace: String,
        route: String,
        auth: String,
    },

    /// A data type in a position the wire format cannot express.
    #[error("type '{type_name}': {detail}")]
    UnsupportedType { type_name: String, detail: String },

    /// Regex inversion failed while synthesizing a patterned string.
    #[error("regex inversion failed: {0}")]
    Unregex(#[from] UnregexError),

    /// The reference encoder produced a value `serde_json` refused to render.
    #[error("reference JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}
