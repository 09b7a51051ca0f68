//! Error Types for Career Persona

use std::path::PathBuf;

use chatloop_core::ChatError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PersonaError>;

#[derive(Error, Debug)]
pub enum PersonaError {
    #[error("Profile file {} could not be read: {source}", path.display())]
    ProfileFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Profile summary at {} is empty", .0.display())]
    EmptySummary(PathBuf),

    #[error("Persona name not given and {} not found", .0.display())]
    MissingName(PathBuf),
}

impl From<PersonaError> for ChatError {
    fn from(err: PersonaError) -> Self {
        Self::Configuration(err.to_string())
    }
}
