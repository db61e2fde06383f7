use thiserror::Error;

#[derive(Debug, Error)]
pub enum DumpError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("malformed dump line {line}: '{text}'")]
    MalformedLine { line: usize, text: String },
}
