use thiserror::Error;

/// Errors produced by the table engine. Every variant names the column or
/// join involved so a failed run points straight at the offending data.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("column `{column}` not found")]
    MissingColumn { column: String },

    #[error("column `{column}`: cannot coerce `{value}` to {ty}")]
    Coerce {
        column: String,
        value: String,
        ty: &'static str,
    },

    #[error("row {row} has {got} fields, expected {want}")]
    RaggedRow { row: usize, got: usize, want: usize },

    #[error("join on [{on}] fans out: dimension has more than one row for ({key})")]
    JoinFanOut { on: String, key: String },

    #[error("cannot assign surrogate keys: {rows} rows exceed the i16 key range")]
    KeyOverflow { rows: usize },

    #[error("column `{column}` contains a null key but is declared non-nullable")]
    NullKey { column: String },

    #[error("column `{column}`: expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
}
