use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::error::PromptError;

const TEMPLATE_EXTENSION: &str = "txt";

lazy_static! {
    // Word characters (any script) and dashes; no separators or dots.
    static ref PROMPT_NAME_REGEX: Regex = Regex::new(r"^[\w-]+$").unwrap();
}

/// Directory of `<name>.txt` prompt templates.
#[derive(Debug, Clone)]
pub struct PromptRegistry {
    dir: PathBuf,
}

impl PromptRegistry {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn template_path(&self, name: &str) -> Result<PathBuf, PromptError> {
        if !PROMPT_NAME_REGEX.is_match(name) {
            return Err(PromptError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{name}.{TEMPLATE_EXTENSION}")))
    }

    /// Path of an existing template, or `NotFound`.
    pub fn require_template(&self, name: &str) -> Result<PathBuf, PromptError> {
        let path = self.template_path(name)?;
        if !path.is_file() {
            return Err(PromptError::NotFound { path });
        }
        Ok(path)
    }

    pub fn load_template(&self, name: &str) -> Result<String, PromptError> {
        let path = self.require_template(name)?;
        Ok(fs::read_to_string(&path)?)
    }

    /// Template text paired with `payload` as compact JSON.
    ///
    /// Non-ASCII text is written as-is, not `\u` escaped.
    pub fn build_prompt<T>(&self, name: &str, payload: &T) -> Result<(String, String), PromptError>
    where
        T: Serialize + ?Sized,
    {
        let base = self.load_template(name)?;
        let data_json = serde_json::to_string(payload)?;
        Ok((base, data_json))
    }

    /// Names of all templates, sorted.
    pub fn list_prompts(&self) -> Result<Vec<String>, PromptError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if PROMPT_NAME_REGEX.is_match(stem) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
