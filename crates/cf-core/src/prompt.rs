use serde::{Deserialize, Serialize};

/// Filename substring flagging a mandatory spoken announcement, as opposed
/// to an optional touch-tone cue.
pub const VOICE_PROMPT_MARKER: &str = "_VOICEPROMPT";

/// One audio prompt reference collected from a Navigation node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PromptFile {
    pub path: String,
    pub is_voice_prompt: bool,
}

impl PromptFile {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let is_voice_prompt = is_voice_prompt(&path);
        Self {
            path,
            is_voice_prompt,
        }
    }
}

#[must_use]
pub fn is_voice_prompt(path: &str) -> bool {
    path.contains(VOICE_PROMPT_MARKER)
}

/// Strips the numbering prefix exporters prepend to prompt filenames:
/// `3316-outro.wav` → `outro.wav`. Paths not starting with a digit are
/// returned unchanged.
#[must_use]
pub fn normalize_prompt_path(path: &str) -> &str {
    if path.starts_with(|ch: char| ch.is_ascii_digit()) {
        if let Some(dash) = path.find('-') {
            return &path[dash + 1..];
        }
    }
    path
}

#[cfg(test)]
mod tests {
    use super::{PromptFile, is_voice_prompt, normalize_prompt_path};

    #[test]
    fn marker_detection() {
        assert!(is_voice_prompt("1-greeting_VOICEPROMPT.wav"));
        assert!(!is_voice_prompt("2-menu.wav"));
        assert!(!is_voice_prompt(""));
    }

    #[test]
    fn prompt_file_classifies_on_construction() {
        assert!(PromptFile::new("welcome_VOICEPROMPT.wav").is_voice_prompt);
        assert!(!PromptFile::new("menu.wav").is_voice_prompt);
    }

    #[test]
    fn strips_numeric_prefix() {
        assert_eq!(normalize_prompt_path("3316-outro.wav"), "outro.wav");
        assert_eq!(normalize_prompt_path("7-a-b.wav"), "a-b.wav");
    }

    #[test]
    fn leaves_unprefixed_paths_alone() {
        assert_eq!(normalize_prompt_path("intro.wav"), "intro.wav");
        assert_eq!(normalize_prompt_path("audio/3316-x.wav"), "audio/3316-x.wav");
        assert_eq!(normalize_prompt_path("-leading.wav"), "-leading.wav");
        assert_eq!(normalize_prompt_path(""), "");
    }
}
