//! Deterministic placeholder content used when every provider fails.

/// Provider name recorded on results that carry synthetic content
pub const FALLBACK_PROVIDER: &str = "fallback-synthetic";

const FILLER_LINE: &str = "- To be completed by the facilitator.";

/// Shape of the placeholder document for one phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackTemplate {
    /// Top-level heading
    pub title: String,
    /// Section headings in order, e.g. `## Premise`
    pub sections: Vec<String>,
    /// Sub-entries rendered under the first section, e.g. `### Suspect 1`
    pub entries: Vec<String>,
    /// One-line summary of the generation parameters
    pub context: String,
    /// Render at least this many characters
    pub min_length: usize,
}

impl FallbackTemplate {
    #[must_use]
    pub fn new(title: impl Into<String>, sections: Vec<String>) -> Self {
        Self {
            title: title.into(),
            sections,
            entries: Vec::new(),
            context: String::new(),
            min_length: 0,
        }
    }

    #[must_use]
    pub fn with_entries(mut self, entries: Vec<String>) -> Self {
        self.entries = entries;
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    #[must_use]
    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = min_length;
        self
    }
}

/// Renders [`FallbackTemplate`]s. Output is a pure function of the template.
pub struct SyntheticFallback;

impl SyntheticFallback {
    #[must_use]
    pub fn render(template: &FallbackTemplate) -> String {
        let mut out = String::new();
        let title = if template.title.trim().is_empty() {
            "Untitled"
        } else {
            template.title.trim()
        };
        out.push_str("# ");
        out.push_str(title);
        out.push_str("\n\n");

        if !template.context.is_empty() {
            out.push_str("> ");
            out.push_str(&template.context);
            out.push_str("\n\n");
        }

        for (index, section) in template.sections.iter().enumerate() {
            out.push_str(section);
            out.push('\n');
            if index == 0 {
                for entry in &template.entries {
                    out.push_str(entry);
                    out.push('\n');
                    out.push_str(FILLER_LINE);
                    out.push('\n');
                }
            }
            out.push_str(FILLER_LINE);
            out.push_str("\n\n");
        }

        while out.chars().count() < template.min_length {
            out.push_str(FILLER_LINE);
            out.push('\n');
        }

        out
    }
}
