//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use geoaudit_core::AuditError;
use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_suggestions(
        mut self,
        suggestions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// Manifest path does not exist
    pub fn manifest_not_found(path: &Path) -> Self {
        Self::new(format!("Manifest not found: {}", path.display()))
            .with_context("The groups manifest must be a readable JSON file")
            .with_suggestions([
                format!("TRY: Check that the file exists: ls -la {}", path.display()),
                "TRY: In http mode the manifest is fetched from --base-url; add --mode http"
                    .to_string(),
            ])
    }

    /// Filesystem root is missing or not a directory
    pub fn root_not_found(path: &Path) -> Self {
        Self::new(format!("Root directory not found: {}", path.display()))
            .with_context("Relative file references are resolved against --root")
            .with_suggestions([
                format!("TRY: Check the directory: ls -la {}", path.display()),
                "TRY: Omit --root to use the manifest's directory".to_string(),
            ])
    }

    /// HTTP mode without a base URL
    pub fn missing_base_url() -> Self {
        Self::new("HTTP mode requires a base URL")
            .with_context("Relative references and the manifest are joined onto the base URL")
            .with_suggestions([
                "TRY: geoaudit audit --mode http --base-url http://127.0.0.1:5500 --groups capas/groups.json",
                "TRY: export GEOAUDIT_BASE_URL=http://127.0.0.1:5500",
            ])
    }

    /// Configuration file does not exist
    pub fn config_not_found(path: &Path) -> Self {
        Self::new(format!("Config file not found: {}", path.display()))
            .with_context("--config expects a TOML file")
            .with_suggestion("TRY: Print the effective configuration as TOML: geoaudit config")
    }

    /// Invalid settings
    pub fn invalid_config(details: &str) -> Self {
        Self::new(format!("Invalid configuration: {}", details))
            .with_suggestions([
                "TRY: Inspect the effective configuration: geoaudit config".to_string(),
                "TRY: Base URLs need a scheme, e.g. http://localhost:5500".to_string(),
            ])
    }

    /// Fatal failure while reading or normalizing the manifest
    pub fn manifest_error(location: &str, err: &AuditError) -> Self {
        match err {
            AuditError::InvalidManifestShape { .. } | AuditError::EmptyManifest => {
                Self::new(err.to_string())
                    .with_context(format!("While normalizing manifest: {}", location))
                    .with_suggestions([
                        "TRY: Use a list of groups: [{\"id\": \"...\", \"files\": [...]}]",
                        "TRY: Or wrap the list: {\"groups\": [...]}",
                    ])
            }
            AuditError::Json(details) => Self::new(format!("Manifest is not valid JSON: {}", details))
                .with_context(format!("While parsing manifest: {}", location))
                .with_suggestion(format!(
                    "TRY: Validate the JSON: python -m json.tool {}",
                    location
                )),
            AuditError::ManifestUnavailable { target, message } => {
                Self::new(format!("Manifest unavailable: {}", target))
                    .with_context(message.clone())
                    .with_suggestions([
                        "TRY: Check the manifest path or URL".to_string(),
                        "TRY: In http mode, confirm the server is running and serves JSON"
                            .to_string(),
                    ])
            }
            other => Self::new(other.to_string())
                .with_context(format!("While loading manifest: {}", location)),
        }
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}

/// JSON error envelope for `--json` callers.
pub fn json_error(err: &anyhow::Error) -> serde_json::Value {
    match err.downcast_ref::<HelpfulError>() {
        Some(helpful) => serde_json::json!({
            "error": {
                "message": helpful.message,
                "context": helpful.context,
                "suggestions": helpful.suggestions,
            }
        }),
        None => serde_json::json!({
            "error": {
                "message": format!("{:#}", err),
                "context": null,
                "suggestions": [],
            }
        }),
    }
}

/// Print the JSON error envelope on stdout.
pub fn print_json_error(err: &anyhow::Error) {
    match serde_json::to_string_pretty(&json_error(err)) {
        Ok(text) => println!("{}", text),
        Err(_) => eprintln!("{:?}", err),
    }
}
