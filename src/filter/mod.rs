//! Include/exclude filtering of attachment filenames.
//!
//! Exclusions always win. An include list that is absent (or contains `*`)
//! admits everything; a present but empty include list admits nothing.

pub mod pattern;
pub mod presets;

use self::pattern::Pattern;

/// Outcome of classifying one filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Accepted,
    /// Carries the exclude pattern that matched first, as written.
    RejectedByExclude(String),
    RejectedByInclude,
}

impl FilterDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FilterDecision::Accepted)
    }

    /// Short reason for logs and the `check` command.
    pub fn reason(&self) -> String {
        match self {
            FilterDecision::Accepted => "accepted".to_string(),
            FilterDecision::RejectedByExclude(p) => format!("matches exclusion pattern '{p}'"),
            FilterDecision::RejectedByInclude => "doesn't match allowed patterns".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum IncludeRule {
    AllowAll,
    Patterns(Vec<Pattern>),
}

/// Compiled include/exclude configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFilter {
    include: IncludeRule,
    exclude: Vec<Pattern>,
}

impl Default for AttachmentFilter {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl AttachmentFilter {
    /// Compile the pattern lists. Blank entries are ignored; `@preset`
    /// entries must be expanded beforehand (see [`presets::expand`]).
    pub fn new(include: Option<&[String]>, exclude: Option<&[String]>) -> Self {
        let include = match include {
            None => IncludeRule::AllowAll,
            Some(list) => {
                let patterns = compile_list(list);
                if patterns.iter().any(Pattern::matches_everything) {
                    IncludeRule::AllowAll
                } else {
                    IncludeRule::Patterns(patterns)
                }
            }
        };
        Self {
            include,
            exclude: exclude.map(compile_list).unwrap_or_default(),
        }
    }

    pub fn classify(&self, filename: &str) -> FilterDecision {
        if let Some(hit) = self.exclude.iter().find(|p| p.matches(filename)) {
            return FilterDecision::RejectedByExclude(hit.as_str().to_string());
        }
        match &self.include {
            IncludeRule::AllowAll => FilterDecision::Accepted,
            IncludeRule::Patterns(list) if list.iter().any(|p| p.matches(filename)) => {
                FilterDecision::Accepted
            }
            IncludeRule::Patterns(_) => FilterDecision::RejectedByInclude,
        }
    }
}

fn compile_list(list: &[String]) -> Vec<Pattern> {
    list.iter()
        .filter(|p| !p.trim().is_empty())
        .map(|p| Pattern::new(p))
        .collect()
}

/// Classify `filename` against raw pattern lists.
///
/// Convenience over [`AttachmentFilter`] for one-off checks; the folder
/// processor compiles the lists once per run instead.
pub fn classify(
    filename: &str,
    include: Option<&[String]>,
    exclude: Option<&[String]>,
) -> FilterDecision {
    AttachmentFilter::new(include, exclude).classify(filename)
}
