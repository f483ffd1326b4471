use std::path::PathBuf;

use validator::ValidationError;

/// Return error if file already exists at given path
pub fn validate_file_already_exists(path: &PathBuf) -> Result<(), ValidationError> {
    if path.exists() {
        let mut err = ValidationError::new("exists");
        err.message = Some(format!("file already exists at {path:?}").into());
        return Err(err);
    }
    Ok(())
}

/// Return error if file does not exist at given path
pub fn validate_file_not_exists(path: &PathBuf) -> Result<(), ValidationError> {
    if !path.exists() {
        let mut err = ValidationError::new("not_exists");
        err.message = Some(format!("file does not exist at {path:?}").into());
        return Err(err);
    }
    if !path.is_file() {
        let mut err = ValidationError::new("not_file");
        err.message = Some(format!("path is not a file: {path:?}").into());
        return Err(err);
    }
    Ok(())
}
