use std::fs::File;
use std::path::Path;

use crate::error::{ExperimentError, Result};

pub(crate) fn ensure_not_empty<T>(items: &[T]) -> Result<()> {
    if items.is_empty() {
        return Err(ExperimentError::NoResults);
    }

    Ok(())
}

pub(crate) fn create_output_file(path: impl AsRef<Path>) -> Result<File> {
    Ok(File::create(path)?)
}
