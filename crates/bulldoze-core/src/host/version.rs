use tracing::error;

use crate::error::{Error, Result};

/// The only game build whose layout and addresses the hooks match
pub const SUPPORTED_GAME_VERSION: u16 = 641;

/// Fail closed for any game build other than [`SUPPORTED_GAME_VERSION`].
pub fn check_game_version(actual: u16) -> Result<()> {
    if actual == SUPPORTED_GAME_VERSION {
        Ok(())
    } else {
        let err = Error::UnsupportedHostVersion {
            expected: SUPPORTED_GAME_VERSION,
            actual,
        };
        error!("{}", err);
        Err(err)
    }
}

/// Extract the game version from the executable's fixed file version.
///
/// SimCity 4 stores its build number (e.g. `1.1.641.0`) in the third
/// component, the high word of `dwFileVersionLS`.
pub fn game_version_from_file_version(file_version_ls: u32) -> u16 {
    (file_version_ls >> 16) as u16
}
