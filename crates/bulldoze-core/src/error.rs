use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unsupported game version: {actual} (expected {expected})")]
    UnsupportedHostVersion { expected: u16, actual: u16 },

    #[error("Failed to change memory protection at address {address:#x} ({size} bytes): {message}")]
    PatchInstall {
        address: u32,
        size: usize,
        message: String,
    },

    #[error("Invalid patch address: {0:#x}")]
    InvalidPatchAddress(u32),

    #[error(
        "Bulldoze Extensions Tuning Exemplar property {property_id:#010X} must be a 4 item Float32 array."
    )]
    TuningPropertyFormat { property_id: u32 },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    /// Check if this error came from the memory protection change of a patch
    pub fn is_patch_failure(&self) -> bool {
        matches!(
            self,
            Error::PatchInstall { .. } | Error::InvalidPatchAddress(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.is_not_found());

        let other_io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err2 = Error::Io(other_io_err);
        assert!(!err2.is_not_found());
    }

    #[test]
    fn test_tuning_property_message_uses_hex_id() {
        let err = Error::TuningPropertyFormat {
            property_id: 0x8FD94ED2,
        };
        assert_eq!(
            err.to_string(),
            "Bulldoze Extensions Tuning Exemplar property 0x8FD94ED2 must be a 4 item Float32 array."
        );
    }

    #[test]
    fn test_patch_install_message() {
        let err = Error::PatchInstall {
            address: 0x4b9d02,
            size: 5,
            message: "Access is denied.".to_string(),
        };
        assert!(err.is_patch_failure());
        assert_eq!(
            err.to_string(),
            "Failed to change memory protection at address 0x4b9d02 (5 bytes): Access is denied."
        );
    }
}
