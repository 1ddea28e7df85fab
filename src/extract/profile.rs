use crate::config::ProfileConfig;
use crate::ConfigError;
use scraper::Selector;
use std::collections::HashMap;
use std::sync::Arc;

/// Subtrees that never contribute article text
pub const DEFAULT_DENYLIST: &[&str] = &[
    "nav",
    "header",
    "footer",
    "#header",
    "#footer",
    "#nav",
    ".header",
    ".footer",
    ".nav",
    ".navigation",
    ".sidebar",
    "#sidebar",
    "script",
    "style",
    "noscript",
    "template",
    "iframe",
    "button",
    ".ad",
    ".ads",
    ".advertisement",
    ".cookie-notice",
    ".popup",
    ".modal",
    "#hub-sidebar",
    ".hub-header",
    ".hub-footer",
];

const GENERIC_SELECTORS: &[&str] = &[
    "article",
    "main",
    ".content",
    "#content",
    ".post-content",
    ".article-content",
    ".entry-content",
    ".fatitem",
    ".comment-tree",
    ".post",
    ".blog-post",
    "#readme",
    ".markdown-body",
    "[role=\"main\"]",
    "[role=\"article\"]",
];

const HUGGINGFACE_SELECTORS: &[&str] = &[
    ".prose",
    ".article-content",
    ".markdown-body",
    "article",
    "main",
];

const DISCUSSION_SELECTORS: &[&str] = &[".comment-tree", ".fatitem", "#hnmain"];

const NEXT_APP_SELECTORS: &[&str] = &["#__next", ".article-content", "article", ".markdown-body"];

/// Name of the profile used when nothing more specific applies
pub const GENERIC_PROFILE: &str = "generic";

/// Name of the profile used for discussion-thread pages
pub const DISCUSSION_PROFILE: &str = "discussion";

/// Per-site-class extraction parameters
#[derive(Debug, Clone)]
pub struct ExtractionProfile {
    name: String,
    selectors: Vec<(String, Selector)>,
    denylist: Vec<Selector>,
    body_fallback: bool,
}

impl ExtractionProfile {
    /// Compiles a profile; every selector must parse
    pub fn new<S: AsRef<str>, D: AsRef<str>>(
        name: &str,
        selectors: &[S],
        denylist: &[D],
        body_fallback: bool,
    ) -> Result<Self, ConfigError> {
        let selectors = selectors
            .iter()
            .map(|s| {
                let raw = s.as_ref();
                compile_selector(raw).map(|compiled| (raw.to_string(), compiled))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let denylist = denylist
            .iter()
            .map(|s| compile_selector(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.to_string(),
            selectors,
            denylist,
            body_fallback,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selectors(&self) -> &[(String, Selector)] {
        &self.selectors
    }

    pub fn denylist(&self) -> &[Selector] {
        &self.denylist
    }

    pub fn body_fallback(&self) -> bool {
        self.body_fallback
    }

    pub fn generic() -> Self {
        builtin(GENERIC_PROFILE, GENERIC_SELECTORS)
    }

    pub fn discussion() -> Self {
        builtin(DISCUSSION_PROFILE, DISCUSSION_SELECTORS)
    }
}

fn builtin(name: &str, selectors: &[&str]) -> ExtractionProfile {
    let compile_all = |list: &[&str]| -> Vec<Selector> {
        list.iter().filter_map(|s| Selector::parse(s).ok()).collect()
    };
    ExtractionProfile {
        name: name.to_string(),
        selectors: selectors
            .iter()
            .filter_map(|s| Selector::parse(s).ok().map(|c| (s.to_string(), c)))
            .collect(),
        denylist: compile_all(DEFAULT_DENYLIST),
        body_fallback: true,
    }
}

pub(crate) fn compile_selector(raw: &str) -> Result<Selector, ConfigError> {
    Selector::parse(raw).map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", raw, e)))
}

/// Named extraction profiles: built-ins plus any defined in the config
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: HashMap<String, Arc<ExtractionProfile>>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProfileRegistry {
    pub fn builtin() -> Self {
        let profiles = [
            ExtractionProfile::generic(),
            ExtractionProfile::discussion(),
            builtin("huggingface_blog", HUGGINGFACE_SELECTORS),
            builtin("next_app", NEXT_APP_SELECTORS),
        ]
        .into_iter()
        .map(|p| (p.name.clone(), Arc::new(p)))
        .collect();

        Self { profiles }
    }

    /// Built-ins overlaid with config-defined profiles (same name replaces)
    pub fn with_custom(custom: &HashMap<String, ProfileConfig>) -> Result<Self, ConfigError> {
        let mut registry = Self::builtin();
        for (name, profile) in custom {
            let compiled = match &profile.denylist {
                Some(denylist) => {
                    ExtractionProfile::new(name, &profile.selectors, denylist, profile.body_fallback)?
                }
                None => ExtractionProfile::new(
                    name,
                    &profile.selectors,
                    DEFAULT_DENYLIST,
                    profile.body_fallback,
                )?,
            };
            registry.profiles.insert(name.clone(), Arc::new(compiled));
        }
        Ok(registry)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    /// Looks up a profile, falling back to `generic` for unknown names
    pub fn get(&self, name: &str) -> Arc<ExtractionProfile> {
        if let Some(profile) = self.profiles.get(name) {
            return Arc::clone(profile);
        }
        tracing::warn!("Unknown extraction profile '{}', using generic", name);
        self.generic()
    }

    pub fn generic(&self) -> Arc<ExtractionProfile> {
        self.profiles
            .get(GENERIC_PROFILE)
            .cloned()
            .unwrap_or_else(|| Arc::new(ExtractionProfile::generic()))
    }

    pub fn discussion(&self) -> Arc<ExtractionProfile> {
        self.profiles
            .get(DISCUSSION_PROFILE)
            .cloned()
            .unwrap_or_else(|| Arc::new(ExtractionProfile::discussion()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
