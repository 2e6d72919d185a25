/// Engine-level errors.
///
/// These describe problems with the suite itself (configuration, registry wiring, collaborator
/// set-up). Findings about the system under test are never errors: they are reported as
/// [`crate::check::CheckResult`] values.
#[derive(Debug, thiserror::Error)]
pub enum SuiteError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to read configuration file: {0}")]
    ConfigRead(std::io::Error),

    #[error("invalid message filter pattern '{pattern}': {source}")]
    FilterPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("FHIR error: {0}")]
    Fhir(#[from] fhir::FhirError),

    #[error("invalid value: {0}")]
    Type(#[from] ips_types::TypeError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(reqwest::Error),

    #[error("validator error: {0}")]
    Validator(String),

    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("unknown check '{0}'")]
    UnknownCheck(String),

    #[error("unknown group '{0}'")]
    UnknownGroup(String),

    #[error("group '{0}' contains itself")]
    CyclicGroup(String),

    #[error("group worker for '{0}' panicked")]
    WorkerPanicked(String),
}

pub type SuiteResult<T> = std::result::Result<T, SuiteError>;
