//! Message template registry.
//!
//! Templates are addressed as `category/kind` (e.g. `daily_updates/morning`)
//! and may contain `{name}` placeholders.

use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::{debug, error};

/// Error type for template operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Errors from template lookup, rendering and persistence.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// No template under this key
    #[error("Template not found: {0}")]
    NotFound(TemplateKey),

    /// A placeholder had no value
    #[error("Template {key} needs parameter '{name}'")]
    MissingParameter {
        /// Template being rendered
        key: TemplateKey,
        /// Placeholder name
        name: String,
    },

    /// Key was not `category/kind`
    #[error("Invalid template key '{0}', expected category/kind")]
    InvalidKey(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Address of a template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateKey {
    /// Group, e.g. `feedback`
    pub category: String,
    /// Variant inside the group, e.g. `positive`
    pub kind: String,
}

impl TemplateKey {
    /// Create a key.
    pub fn new(category: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            kind: kind.into(),
        }
    }
}

impl std::fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.category, self.kind)
    }
}

impl FromStr for TemplateKey {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((category, kind)) if !category.is_empty() && !kind.is_empty() && !kind.contains('/') => {
                Ok(Self::new(category, kind))
            }
            _ => Err(TemplateError::InvalidKey(s.to_string())),
        }
    }
}

const MORNING: &str = "Good morning! 🌅

Here's your daily task checklist:
1️⃣ Update your completed tasks
2️⃣ Share any challenges
3️⃣ List tomorrow's planned tasks

Reply with your updates! 💪";

const REMINDER: &str = "Friendly reminder! ⏰
We're waiting for your daily update.
Takes just 2 minutes to share your progress!";

const POSITIVE: &str = "Great work today! 🌟
Your updates show excellent progress.
Keep up the momentum!

Key highlights:
{highlights}";

const IMPROVEMENT: &str = "Thank you for your update! 📝

A few points to consider:
{improvement_points}

Let me know if you need any support!";

const WEEKLY: &str = "📊 Weekly Performance Summary
Week: {week_range}
───────────────

✅ Completion Rate: {completion_rate}%
⭐ Quality Score: {quality_score}/10

🎯 Top Achievements:
{achievements}

💡 Focus Areas:
{focus_areas}";

/// `{name}` placeholder pattern. The pattern is constant, so building it
/// cannot fail at runtime.
fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid placeholder pattern"))
}

/// Registry of message templates grouped by category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplates {
    templates: BTreeMap<String, BTreeMap<String, String>>,
}

impl Default for MessageTemplates {
    fn default() -> Self {
        let mut templates = Self::empty();
        templates.add(TemplateKey::new("daily_updates", "morning"), MORNING);
        templates.add(TemplateKey::new("daily_updates", "reminder"), REMINDER);
        templates.add(TemplateKey::new("feedback", "positive"), POSITIVE);
        templates.add(TemplateKey::new("feedback", "improvement"), IMPROVEMENT);
        templates.add(TemplateKey::new("reports", "weekly"), WEEKLY);
        templates
    }
}

impl MessageTemplates {
    /// Registry with the built-in templates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with no templates.
    pub fn empty() -> Self {
        Self {
            templates: BTreeMap::new(),
        }
    }

    /// Add or replace a template. Surrounding whitespace is trimmed.
    pub fn add(&mut self, key: TemplateKey, template: impl AsRef<str>) {
        self.templates
            .entry(key.category)
            .or_default()
            .insert(key.kind, template.as_ref().trim().to_string());
    }

    /// Raw template text.
    pub fn get(&self, key: &TemplateKey) -> Option<&str> {
        self.templates
            .get(&key.category)
            .and_then(|kinds| kinds.get(&key.kind))
            .map(String::as_str)
    }

    /// All registered keys.
    pub fn keys(&self) -> Vec<TemplateKey> {
        self.templates
            .iter()
            .flat_map(|(category, kinds)| kinds.keys().map(move |kind| TemplateKey::new(category, kind)))
            .collect()
    }

    /// Placeholder names a template uses, in order of appearance.
    pub fn parameters(&self, key: &TemplateKey) -> Result<Vec<String>> {
        let template = self.get(key).ok_or_else(|| TemplateError::NotFound(key.clone()))?;
        let mut names: Vec<String> = Vec::new();
        for caps in placeholder().captures_iter(template) {
            let name = caps[1].to_string();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Render a template, substituting every `{name}` placeholder.
    ///
    /// Extra parameters are ignored. A placeholder without a value is an
    /// error.
    pub fn render(&self, key: &TemplateKey, params: &HashMap<String, String>) -> Result<String> {
        let template = self.get(key).ok_or_else(|| TemplateError::NotFound(key.clone()))?;

        if let Some(missing) = placeholder()
            .captures_iter(template)
            .map(|caps| caps[1].to_string())
            .find(|name| !params.contains_key(name))
        {
            return Err(TemplateError::MissingParameter {
                key: key.clone(),
                name: missing,
            });
        }

        let rendered = placeholder().replace_all(template, |caps: &regex::Captures<'_>| {
            params.get(&caps[1]).cloned().unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }

    /// Save all templates as nested JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.templates)?;
        std::fs::write(path, json).map_err(|e| {
            error!(path = %path.display(), error = %e, "Failed to save templates");
            TemplateError::Io(e)
        })
    }

    /// Replace all templates with those stored in `path`.
    pub fn load_from_file(&mut self, path: &Path) -> Result<()> {
        let json = std::fs::read_to_string(path)?;
        self.templates = serde_json::from_str(&json)?;
        debug!(path = %path.display(), count = self.keys().len(), "Templates loaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> TemplateKey {
        s.parse().unwrap()
    }

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_defaults_present() {
        let templates = MessageTemplates::new();
        assert_eq!(templates.keys().len(), 5);
        assert!(templates.get(&key("daily_updates/morning")).unwrap().starts_with("Good morning!"));
        assert!(templates.get(&key("feedback/performance")).is_none());
    }

    #[test]
    fn test_placeholder_pattern() {
        let names: Vec<_> = placeholder()
            .captures_iter("{name} {_x1} {9bad} {}")
            .map(|c| c[1].to_string())
            .collect();
        assert_eq!(names, vec!["name", "_x1"]);
    }

    #[test]
    fn test_key_parsing() {
        assert_eq!(key("reports/weekly"), TemplateKey::new("reports", "weekly"));
        assert_eq!(key("reports/weekly").to_string(), "reports/weekly");
        assert!("reports".parse::<TemplateKey>().is_err());
        assert!("a/b/c".parse::<TemplateKey>().is_err());
        assert!("/b".parse::<TemplateKey>().is_err());
    }

    #[test]
    fn test_render_without_placeholders() {
        let templates = MessageTemplates::new();
        let text = templates.render(&key("daily_updates/reminder"), &HashMap::new()).unwrap();
        assert!(text.starts_with("Friendly reminder!"));
    }

    #[test]
    fn test_render_substitutes() {
        let templates = MessageTemplates::new();
        let text = templates
            .render(&key("feedback/positive"), &params(&[("highlights", "- Shipped login"), ("unused", "x")]))
            .unwrap();
        assert!(text.ends_with("Key highlights:\n- Shipped login"));
    }

    #[test]
    fn test_render_missing_parameter() {
        let templates = MessageTemplates::new();
        let err = templates
            .render(&key("reports/weekly"), &params(&[("week_range", "Mar 1 - Mar 7")]))
            .unwrap_err();
        match err {
            TemplateError::MissingParameter { name, .. } => assert_eq!(name, "completion_rate"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parameters_in_order() {
        let templates = MessageTemplates::new();
        assert_eq!(
            templates.parameters(&key("reports/weekly")).unwrap(),
            vec!["week_range", "completion_rate", "quality_score", "achievements", "focus_areas"]
        );
    }

    #[test]
    fn test_unknown_template() {
        let templates = MessageTemplates::new();
        let err = templates.render(&key("x/y"), &HashMap::new()).unwrap_err();
        assert!(matches!(err, TemplateError::NotFound(_)));
    }

    #[test]
    fn test_add_trims_and_replaces() {
        let mut templates = MessageTemplates::empty();
        templates.add(key("custom/hello"), "  Hi {name}!  \n");
        templates.add(key("custom/hello"), "Hello {name}!");
        let text = templates.render(&key("custom/hello"), &params(&[("name", "Asha")])).unwrap();
        assert_eq!(text, "Hello Asha!");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("templates.json");

        let mut templates = MessageTemplates::new();
        templates.add(key("custom/hello"), "Hello!");
        templates.save_to_file(&path).unwrap();

        let mut loaded = MessageTemplates::empty();
        loaded.load_from_file(&path).unwrap();
        assert_eq!(loaded, templates);

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["custom"]["hello"], "Hello!");
    }

    #[test]
    fn test_load_missing_file() {
        let mut templates = MessageTemplates::new();
        let err = templates.load_from_file(Path::new("/nonexistent/templates.json")).unwrap_err();
        assert!(matches!(err, TemplateError::Io(_)));
        assert_eq!(templates.keys().len(), 5);
    }
}
