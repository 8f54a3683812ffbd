use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Composite type '{0}' does not exist in the database")]
    SchemaMissing(String),

    #[error("Missing value for field '{field}' of composite type '{type_name}'")]
    MissingField { type_name: String, field: String },

    #[error("Unexpected argument '{argument}' for composite type '{type_name}'")]
    UnexpectedArgument { type_name: String, argument: String },

    #[error("Composite type '{type_name}' takes {expected} positional values, got {given}")]
    TooManyArguments {
        type_name: String,
        expected: usize,
        given: usize,
    },

    #[error(
        "Composite type '{type_name}' redeclared with a different field list: \
         registered ({registered}), declared ({declared})"
    )]
    FieldDrift {
        type_name: String,
        registered: String,
        declared: String,
    },

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("No adapter registered for composite type '{0}'")]
    NotAdaptable(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Type '{0}' already exists")]
    TypeExists(String),

    #[error("Lock error: {0}")]
    LockError(String),
}

impl CompositeError {
    /// True when the driver reported that the named type is absent server-side.
    pub fn is_schema_missing(&self) -> bool {
        matches!(self, Self::SchemaMissing(_))
    }
}

pub type Result<T> = std::result::Result<T, CompositeError>;

impl<T> From<std::sync::PoisonError<T>> for CompositeError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}
