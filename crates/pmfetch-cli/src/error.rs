use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] pmfetch_core::ValidationError),

    #[error(transparent)]
    Fetch(#[from] pmfetch_core::FetchError),

    #[error(transparent)]
    Core(#[from] pmfetch_core::CoreError),

    #[error("synthetic data used for: {parameters}")]
    LiveRequired { parameters: String },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Fetch(_) => 2,
            Self::Core(pmfetch_core::CoreError::Validation(_)) => 2,
            Self::Core(pmfetch_core::CoreError::Serialization(_)) => 4,
            Self::Core(_) => 10,
            Self::LiveRequired { .. } => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_stable() {
        let validation = CliError::from(pmfetch_core::ValidationError::EmptyStationTable);
        assert_eq!(validation.exit_code(), 2);

        let live = CliError::LiveRequired {
            parameters: String::from("PM2.5"),
        };
        assert_eq!(live.exit_code(), 3);

        let io = CliError::from(std::io::Error::other("disk full"));
        assert_eq!(io.exit_code(), 10);
    }
}
