use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {argument:?}")]
    InvalidArgument { argument: String },

    #[error("unknown builder: {0:?}")]
    UnknownBuilder(String),

    #[error("builder build error")]
    Build(#[source] anyhow::Error),
}

impl Error {
    pub(crate) fn invalid_argument(argument: &str) -> Self {
        Self::InvalidArgument {
            argument: argument.to_owned(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
