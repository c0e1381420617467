use anyhow::{Context, Result};
use interview_core::PromptSet;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Reads every `*.md` file in `dir_path`, keyed by file stem.
pub fn load_prompts(dir_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();

    for entry in fs::read_dir(dir_path)
        .with_context(|| format!("Failed to read prompts directory: {}", dir_path.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem for prompt file")?
                .to_string();

            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt file: {}", path.display()))?;

            prompts.insert(prompt_key, content);
        }
    }

    Ok(prompts)
}

/// The prompt set for a session: built-in templates, overridden by any
/// `interviewer.md` / `feedback.md` found in `dir_path`.
pub fn load_prompt_set(dir_path: Option<&Path>) -> Result<PromptSet> {
    match dir_path {
        Some(dir) => {
            let prompts = load_prompts(dir)?;
            tracing::info!("Loaded {} prompt file(s) from {}", prompts.len(), dir.display());
            Ok(PromptSet::from_map(prompts))
        }
        None => Ok(PromptSet::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_load_prompts_successfully() -> Result<()> {
        // 1. Arrange: Create a temporary directory and some prompt files.
        let dir = tempdir()?;
        let dir_path = dir.path();

        // The `{{...}}` in `writeln!` escapes the braces, so `{role}` is written to the file.
        let mut file1 = File::create(dir_path.join("interviewer.md"))?;
        writeln!(file1, "Interview for {{role}}.")?;

        let mut file2 = File::create(dir_path.join("feedback.md"))?;
        writeln!(file2, "Grade this.")?;

        // Create a file that should be ignored (not .md).
        let mut ignored_file = File::create(dir_path.join("config.txt"))?;
        writeln!(ignored_file, "some config")?;

        // Create a subdirectory that should be ignored.
        std::fs::create_dir(dir_path.join("subdir"))?;

        // 2. Act
        let prompts = load_prompts(dir_path)?;

        // 3. Assert
        assert_eq!(prompts.len(), 2, "Should only load .md files");
        assert_eq!(prompts.get("interviewer").unwrap(), "Interview for {role}.\n");
        assert_eq!(prompts.get("feedback").unwrap(), "Grade this.\n");
        assert!(prompts.get("config").is_none(), "Should not load .txt files");

        Ok(())
    }

    #[test]
    fn test_load_prompts_from_nonexistent_dir() {
        let dir_path = Path::new("nonexistent_dir_for_testing_prompts");
        assert!(load_prompts(dir_path).is_err());
    }

    #[test]
    fn test_load_prompt_set_overrides_defaults() -> Result<()> {
        let dir = tempdir()?;
        let mut file = File::create(dir.path().join("interviewer.md"))?;
        write!(file, "Custom interviewer for {{company}}.")?;

        let set = load_prompt_set(Some(dir.path()))?;
        assert_eq!(set.interviewer, "Custom interviewer for {company}.");
        assert_eq!(set.feedback, PromptSet::default().feedback);
        Ok(())
    }

    #[test]
    fn test_load_prompt_set_without_dir_uses_defaults() -> Result<()> {
        assert_eq!(load_prompt_set(None)?, PromptSet::default());
        Ok(())
    }

    #[test]
    fn test_shipped_prompts_keep_placeholders() -> Result<()> {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("prompts");
        let set = load_prompt_set(Some(&dir))?;
        assert!(set.interviewer.contains("{role}"));
        assert!(set.interviewer.contains("[INTERVIEW_COMPLETE]"));
        assert!(set.feedback.contains("{transcript}"));
        Ok(())
    }
}
