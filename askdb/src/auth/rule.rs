//! Access rules and the specificity ranking that picks one rule per resource.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which resources a rule covers.
///
/// Written form: `"*"` is [`ResourceMatcher::Any`], `"<prefix>*"` is a prefix
/// family (e.g. `"7*"` covers `"7001"` and `"72"`), anything else is exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ResourceMatcher {
    Exact(String),
    PrefixFamily(String),
    Any,
}

/// Rank of a matcher; higher wins. Derived order: `Any < PrefixFamily(len) < Exact`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Specificity {
    Any,
    Prefix(usize),
    Exact,
}

impl ResourceMatcher {
    pub fn parse(written: &str) -> Self {
        let written = written.trim();
        if written == "*" {
            return ResourceMatcher::Any;
        }
        match written.strip_suffix('*') {
            Some(prefix) => ResourceMatcher::PrefixFamily(prefix.to_string()),
            None => ResourceMatcher::Exact(written.to_string()),
        }
    }

    pub fn matches(&self, resource: &str) -> bool {
        match self {
            ResourceMatcher::Exact(r) => r == resource,
            ResourceMatcher::PrefixFamily(p) => resource.starts_with(p.as_str()),
            ResourceMatcher::Any => true,
        }
    }

    pub fn specificity(&self) -> Specificity {
        match self {
            ResourceMatcher::Exact(_) => Specificity::Exact,
            ResourceMatcher::PrefixFamily(p) => Specificity::Prefix(p.chars().count()),
            ResourceMatcher::Any => Specificity::Any,
        }
    }
}

impl fmt::Display for ResourceMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceMatcher::Exact(r) => write!(f, "{}", r),
            ResourceMatcher::PrefixFamily(p) => write!(f, "{}*", p),
            ResourceMatcher::Any => write!(f, "*"),
        }
    }
}

impl From<String> for ResourceMatcher {
    fn from(s: String) -> Self {
        ResourceMatcher::parse(&s)
    }
}

impl From<ResourceMatcher> for String {
    fn from(m: ResourceMatcher) -> Self {
        m.to_string()
    }
}

/// One row of the rule store: `subject` may see rows of `resource` matching `predicate`.
///
/// An empty predicate is an explicit unrestricted grant. The predicate is
/// configured by administrators and never derived from user input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRule {
    pub subject: String,
    pub resource: ResourceMatcher,
    pub predicate: String,
}

impl AccessRule {
    pub fn new(
        subject: impl Into<String>,
        resource: &str,
        predicate: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            resource: ResourceMatcher::parse(resource),
            predicate: predicate.into(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.predicate.trim().is_empty()
    }
}

/// Picks the most specific rule matching `resource`; `None` means deny-all.
///
/// Equal ranks keep the first rule in store order.
pub fn select_rule<'a>(rules: &'a [AccessRule], resource: &str) -> Option<&'a AccessRule> {
    let mut best: Option<&AccessRule> = None;
    for rule in rules.iter().filter(|r| r.resource.matches(resource)) {
        match best {
            Some(b) if b.resource.specificity() >= rule.resource.specificity() => {}
            _ => best = Some(rule),
        }
    }
    best
}
