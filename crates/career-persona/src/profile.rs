//! Persona Profile
//!
//! The text a persona answers from, read once at startup.

use std::path::Path;

use crate::error::{PersonaError, Result};

pub const SUMMARY_FILE: &str = "summary.txt";
pub const RESUME_FILE: &str = "resume.txt";
pub const NAME_FILE: &str = "name.txt";

/// Who the persona is and what it knows about them
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub summary: String,
    /// Resume or LinkedIn export as plain text; may be empty
    pub resume: String,
}

impl Profile {
    /// Load a profile directory.
    ///
    /// `summary.txt` is required. `resume.txt` is optional. When `name` is
    /// `None` the first line of `name.txt` is used.
    pub fn load(dir: impl AsRef<Path>, name: Option<&str>) -> Result<Self> {
        let dir = dir.as_ref();

        let summary_path = dir.join(SUMMARY_FILE);
        let summary = read(&summary_path)?;
        if summary.trim().is_empty() {
            return Err(PersonaError::EmptySummary(summary_path));
        }

        let resume_path = dir.join(RESUME_FILE);
        let resume = if resume_path.exists() {
            read(&resume_path)?
        } else {
            tracing::warn!(path = %resume_path.display(), "No resume found, continuing with summary only");
            String::new()
        };

        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => name_from_file(&dir.join(NAME_FILE))?,
        };

        tracing::info!(%name, summary_bytes = summary.len(), resume_bytes = resume.len(), "Profile loaded");

        Ok(Self {
            name,
            summary,
            resume,
        })
    }

    /// Instructions that put the model in character
    pub fn system_prompt(&self) -> String {
        let name = &self.name;
        let mut prompt = format!(
            "You are acting as {name}. You are answering questions on {name}'s website, \
particularly questions related to {name}'s career, background, skills and experience. \
Your responsibility is to represent {name} for interactions on the website as faithfully as possible. \
You are given a summary of {name}'s background and LinkedIn profile which you can use to answer questions. \
Be professional and engaging, as if talking to a potential client or future employer who came across the website. \
If you don't know the answer to any question, use your record_unknown_question tool to record the question that you couldn't answer, \
even if it's about something trivial or unrelated to career. \
If the user is engaging in discussion, try to steer them towards getting in touch via email; \
ask for their email and record it using your record_user_details tool."
        );

        prompt.push_str(&format!(
            "\n\n## Summary:\n{}\n\n## LinkedIn Profile:\n{}\n\n",
            self.summary.trim(),
            self.resume.trim()
        ));
        prompt.push_str(&format!(
            "With this context, please chat with the user, always staying in character as {name}."
        ));
        prompt
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|source| PersonaError::ProfileFile {
        path: path.to_path_buf(),
        source,
    })
}

fn name_from_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(PersonaError::MissingName(path.to_path_buf()));
    }
    read(path)?
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PersonaError::MissingName(path.to_path_buf()))
}
