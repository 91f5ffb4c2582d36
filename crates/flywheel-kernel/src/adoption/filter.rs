//! Name predicates selecting which objects of a kind to adopt.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Which objects of a kind should be adopted.
///
/// `Exact` is the normal form: an explicit, declared list of object names.
/// `Fragments` matches any name containing one of the fragments; it exists
/// for clusters where leftover object names are not known in advance and
/// should be used with narrow fragments only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "match", content = "values")]
pub enum NameFilter {
    Exact(BTreeSet<String>),
    Fragments(Vec<String>),
}

impl NameFilter {
    /// Explicit name list.
    pub fn exact<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NameFilter::Exact(names.into_iter().map(Into::into).collect())
    }

    /// Substring fragments.
    pub fn fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NameFilter::Fragments(fragments.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            NameFilter::Exact(names) => names.contains(name),
            NameFilter::Fragments(fragments) => fragments
                .iter()
                .any(|f| !f.is_empty() && name.contains(f.as_str())),
        }
    }

    /// True when the filter can never match anything.
    pub fn is_empty(&self) -> bool {
        match self {
            NameFilter::Exact(names) => names.is_empty(),
            NameFilter::Fragments(fragments) => fragments.iter().all(String::is_empty),
        }
    }
}
