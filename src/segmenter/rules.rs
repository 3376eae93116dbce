use anyhow::{Context, Result};
use regex::{Captures, Regex};

/// Regex sources for one family of documents. Structural patterns use the
/// named groups `id`, `title` and optionally `sub`; metadata patterns use
/// `value`, falling back to the whole match.
pub(crate) struct RuleSpec {
    pub category: &'static str,
    pub guideline: &'static str,
    pub part: &'static str,
    pub title: &'static [&'static str],
    pub version: &'static [&'static str],
    pub author: &'static [&'static str],
    pub publication: &'static [&'static str],
    pub objective_keywords: &'static [&'static str],
    pub recommendation_keywords: &'static [&'static str],
}

const PUBLICATION_PATTERNS: &[&str] = &[
    r"(?i)(?:published|publication\s+date):\s*(?P<value>.+)",
    r"(?i)(?:January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},?\s+\d{4}",
];

pub(crate) const GENERIC_RULES: RuleSpec = RuleSpec {
    category: r"^(?P<id>[0-9]+)\.\s+(?P<title>[A-Z].*)",
    guideline: r"^(?P<id>[0-9]+\.[0-9]+)\s+(?P<title>[A-Z].*)",
    part: r"^(?P<id>[0-9]+\.[0-9]+\.[0-9]+)\s+(?P<title>.*)",
    title: &[
        r"(?i)^title:\s*(?P<value>.+)",
        r"(?i)^(?P<value>.+?(?:Standard|Framework|Guidelines?|Requirements?))(?:\s+Version|\s+v\.|$)",
    ],
    version: &[
        r"(?i)version\s*:?\s*(?P<value>[0-9]+\.[0-9]+(?:\.[0-9]+)?)",
        r"(?i)v\.?\s*(?P<value>[0-9]+\.[0-9]+(?:\.[0-9]+)?)",
    ],
    author: &[r"(?i)^author:\s*(?P<value>.+)", r"(?i)^by\s+(?P<value>.+)"],
    publication: PUBLICATION_PATTERNS,
    objective_keywords: &["objective", "purpose", "goal", "intent"],
    recommendation_keywords: &["recommendation", "guidance", "implementation", "should", "must"],
};

pub(crate) const PCI_DSS_RULES: RuleSpec = RuleSpec {
    category: r"^(?:Requirement\s+)?(?P<id>[0-9]+)[:.]?\s+(?P<title>[A-Z].*)",
    guideline: r"^(?P<id>[0-9]+\.[0-9]+)\s+(?P<title>[A-Z].*)",
    part: r"^(?P<id>[0-9]+\.[0-9]+\.[0-9]+)\s+(?P<title>.*)",
    title: &[
        r"(?i)payment\s+card\s+industry.*security\s+standard",
        r"(?i)PCI\s+DSS",
    ],
    version: &[
        r"(?i)version\s+(?P<value>[0-9]+\.[0-9]+(?:\.[0-9]+)?)",
        r"(?i)v\.?\s*(?P<value>[0-9]+\.[0-9]+(?:\.[0-9]+)?)",
    ],
    author: &[r"(?i)PCI\s+Security\s+Standards\s+Council"],
    publication: PUBLICATION_PATTERNS,
    objective_keywords: &["objective", "intent", "purpose"],
    recommendation_keywords: &["guidance", "examples", "testing procedures"],
};

pub(crate) const NIST_800_53_RULES: RuleSpec = RuleSpec {
    category: r"^(?P<id>[A-Z]{2,3})\s*[-–]\s*(?P<title>[A-Z\s]+)",
    guideline: r"^(?P<id>[A-Z]{2,3}-[0-9]+)\s+(?P<title>[A-Z].*)",
    part: r"^(?P<id>[A-Z]{2,3}-[0-9]+)\((?P<sub>[0-9]+)\)\s+(?P<title>.*)",
    title: &[
        r"(?i)NIST.*800-53",
        r"(?i)Security\s+and\s+Privacy\s+Controls",
    ],
    version: &[r"(?i)revision\s+(?P<value>[0-9]+)", r"(?i)rev\.?\s*(?P<value>[0-9]+)"],
    author: &[
        r"(?i)National\s+Institute\s+of\s+Standards\s+and\s+Technology",
        r"(?i)NIST",
    ],
    publication: PUBLICATION_PATTERNS,
    objective_keywords: &["control", "objective", "purpose"],
    recommendation_keywords: &["guidance", "supplemental guidance", "discussion"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MarkerKind {
    Category,
    Guideline,
    Part,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Marker {
    pub kind: MarkerKind,
    pub id: String,
    pub title: String,
}

#[derive(Debug)]
pub(crate) struct CompiledRules {
    matchers: Vec<(MarkerKind, Regex)>,
    pub title: Vec<Regex>,
    pub version: Vec<Regex>,
    pub author: Vec<Regex>,
    pub publication: Vec<Regex>,
    objective: Regex,
    recommendation_keywords: Vec<String>,
}

impl CompiledRules {
    pub(crate) fn compile(spec: &RuleSpec) -> Result<Self> {
        let objective_source = format!(
            r"(?i)(?:{}):\s*([^\n]+)",
            spec.objective_keywords
                .iter()
                .map(|keyword| regex::escape(keyword))
                .collect::<Vec<_>>()
                .join("|")
        );

        Ok(Self {
            matchers: vec![
                (
                    MarkerKind::Category,
                    Regex::new(spec.category).context("failed to compile category regex")?,
                ),
                (
                    MarkerKind::Guideline,
                    Regex::new(spec.guideline).context("failed to compile guideline regex")?,
                ),
                (
                    MarkerKind::Part,
                    Regex::new(spec.part).context("failed to compile part regex")?,
                ),
            ],
            title: compile_all(spec.title, "title")?,
            version: compile_all(spec.version, "version")?,
            author: compile_all(spec.author, "author")?,
            publication: compile_all(spec.publication, "publication date")?,
            objective: Regex::new(&objective_source).context("failed to compile objective regex")?,
            recommendation_keywords: spec
                .recommendation_keywords
                .iter()
                .map(|keyword| keyword.to_lowercase())
                .collect(),
        })
    }

    /// First structural marker matching `text`, in category, guideline, part
    /// order.
    pub(crate) fn classify(&self, text: &str) -> Option<Marker> {
        self.matchers.iter().find_map(|(kind, pattern)| {
            let captures = pattern.captures(text)?;
            Some(Marker {
                kind: *kind,
                id: marker_id(&captures),
                title: captures
                    .name("title")
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default(),
            })
        })
    }

    pub(crate) fn is_category(&self, text: &str) -> bool {
        self.matchers
            .iter()
            .any(|(kind, pattern)| *kind == MarkerKind::Category && pattern.is_match(text))
    }

    pub(crate) fn objective(&self, text: &str) -> Option<String> {
        self.objective
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|value| !value.is_empty())
    }

    pub(crate) fn is_recommendation(&self, line: &str) -> bool {
        let lowered = line.to_lowercase();
        self.recommendation_keywords
            .iter()
            .any(|keyword| lowered.contains(keyword.as_str()))
    }
}

fn marker_id(captures: &Captures<'_>) -> String {
    let id = captures.name("id").map(|m| m.as_str()).unwrap_or_default();
    match captures.name("sub") {
        Some(sub) => format!("{id}({})", sub.as_str()),
        None => id.to_string(),
    }
}

fn compile_all(sources: &[&str], field: &str) -> Result<Vec<Regex>> {
    sources
        .iter()
        .map(|source| {
            Regex::new(source).with_context(|| format!("failed to compile {field} regex: {source}"))
        })
        .collect()
}

/// Value of the first pattern that matches: its `value` group when present,
/// else the whole match.
pub(crate) fn first_capture(patterns: &[Regex], text: &str) -> Option<String> {
    patterns.iter().find_map(|pattern| {
        let captures = pattern.captures(text)?;
        let value = captures
            .name("value")
            .or_else(|| captures.get(0))?
            .as_str()
            .trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}
