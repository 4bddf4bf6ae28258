use crate::CollectionState;
use aprando_game::{PlayerId, Requirement};
use std::fmt;
use std::ops::Not;
use std::sync::Arc;

type RuleFn = dyn Fn(&CollectionState) -> bool + Send + Sync;

fn wrap<F>(f: F) -> Arc<RuleFn>
where
    F: Fn(&CollectionState) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A shareable access predicate. A missing predicate is the always-true rule, kept distinct so that
/// combining with it never adds a layer of indirection.
///
/// A rule is monotone when collecting more items can never turn it from true to false. The
/// reachability memo relies on this; negation clears the flag.
#[derive(Clone)]
pub struct Rule {
    f: Option<Arc<RuleFn>>,
    monotone: bool,
}

impl Default for Rule {
    fn default() -> Self {
        Rule::always()
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_always(), self.monotone) {
            (true, _) => write!(f, "Rule(always)"),
            (false, true) => write!(f, "Rule(..)"),
            (false, false) => write!(f, "Rule(non-monotone)"),
        }
    }
}

impl Rule {
    /// Wraps a predicate that only ever goes from false to true as items are collected.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&CollectionState) -> bool + Send + Sync + 'static,
    {
        Rule {
            f: Some(wrap(f)),
            monotone: true,
        }
    }

    /// Wraps a predicate that may turn false when an item is collected.
    pub fn non_monotone<F>(f: F) -> Self
    where
        F: Fn(&CollectionState) -> bool + Send + Sync + 'static,
    {
        Rule {
            f: Some(wrap(f)),
            monotone: false,
        }
    }

    pub fn always() -> Self {
        Rule {
            f: None,
            monotone: true,
        }
    }

    pub fn never() -> Self {
        Rule::new(|_| false)
    }

    pub fn is_always(&self) -> bool {
        self.f.is_none()
    }

    pub fn is_monotone(&self) -> bool {
        self.monotone
    }

    pub fn eval(&self, state: &CollectionState) -> bool {
        match &self.f {
            None => true,
            Some(f) => f(state),
        }
    }

    pub fn and(self, other: Rule) -> Rule {
        let monotone = self.monotone && other.monotone;
        match (self.f, other.f) {
            (None, f) | (f, None) => Rule { f, monotone },
            (Some(a), Some(b)) => Rule {
                f: Some(wrap(move |s| a(s) && b(s))),
                monotone,
            },
        }
    }

    pub fn or(self, other: Rule) -> Rule {
        let monotone = self.monotone && other.monotone;
        match (self.f, other.f) {
            (None, _) | (_, None) => Rule::always(),
            (Some(a), Some(b)) => Rule {
                f: Some(wrap(move |s| a(s) || b(s))),
                monotone,
            },
        }
    }

    pub fn all<I: IntoIterator<Item = Rule>>(rules: I) -> Rule {
        let mut monotone = true;
        let mut fs: Vec<Arc<RuleFn>> = vec![];
        for r in rules {
            monotone &= r.monotone;
            fs.extend(r.f);
        }
        let f: Option<Arc<RuleFn>> = match fs.len() {
            0 => None,
            1 => fs.pop(),
            _ => Some(wrap(move |s| fs.iter().all(|f| f(s)))),
        };
        Rule { f, monotone }
    }

    pub fn any<I: IntoIterator<Item = Rule>>(rules: I) -> Rule {
        let mut monotone = true;
        let mut fs: Vec<Arc<RuleFn>> = vec![];
        for r in rules {
            match r.f {
                None => return Rule::always(),
                Some(f) => fs.push(f),
            }
            monotone &= r.monotone;
        }
        if fs.is_empty() {
            return Rule::never();
        }
        Rule {
            f: Some(wrap(move |s| fs.iter().any(|f| f(s)))),
            monotone,
        }
    }

    pub fn from_requirement(req: &Requirement, player: PlayerId) -> Rule {
        match req {
            Requirement::Free => Rule::always(),
            Requirement::Never => Rule::never(),
            Requirement::Item { name, count } => has_count(name, player, *count),
            Requirement::Any(items) => has_any(items, player),
            Requirement::All(items) => has_all(items, player),
            Requirement::Total { items, count } => has_from_list(items, player, *count),
            Requirement::Unique { items, count } => has_from_list_unique(items, player, *count),
            Requirement::Not(r) => !Rule::from_requirement(r, player),
            Requirement::And(reqs) => {
                Rule::all(reqs.iter().map(|r| Rule::from_requirement(r, player)))
            }
            Requirement::Or(reqs) => {
                Rule::any(reqs.iter().map(|r| Rule::from_requirement(r, player)))
            }
        }
    }
}

impl Not for Rule {
    type Output = Rule;

    fn not(self) -> Rule {
        match self.f {
            None => Rule::never(),
            Some(f) => Rule::non_monotone(move |s| !f(s)),
        }
    }
}

fn owned(names: &[impl AsRef<str>]) -> Vec<String> {
    names.iter().map(|x| x.as_ref().to_string()).collect()
}

pub fn has(name: &str, player: PlayerId) -> Rule {
    let name = name.to_string();
    Rule::new(move |s| s.has(&name, player))
}

pub fn has_count(name: &str, player: PlayerId, count: u32) -> Rule {
    if count == 0 {
        return Rule::always();
    }
    let name = name.to_string();
    Rule::new(move |s| s.has_count(&name, player, count))
}

pub fn has_any(names: &[impl AsRef<str>], player: PlayerId) -> Rule {
    let names = owned(names);
    Rule::new(move |s| s.has_any(&names, player))
}

pub fn has_all(names: &[impl AsRef<str>], player: PlayerId) -> Rule {
    if names.is_empty() {
        return Rule::always();
    }
    let names = owned(names);
    Rule::new(move |s| s.has_all(&names, player))
}

pub fn has_from_list(names: &[impl AsRef<str>], player: PlayerId, count: u32) -> Rule {
    if count == 0 {
        return Rule::always();
    }
    let names = owned(names);
    Rule::new(move |s| s.has_from_list(&names, player, count))
}

pub fn has_from_list_unique(names: &[impl AsRef<str>], player: PlayerId, count: u32) -> Rule {
    if count == 0 {
        return Rule::always();
    }
    let names = owned(names);
    Rule::new(move |s| s.has_from_list_unique(&names, player, count))
}

/// Compares a derived quantity against a threshold.
pub fn count_at_least<F>(f: F, count: u32) -> Rule
where
    F: Fn(&CollectionState) -> u32 + Send + Sync + 'static,
{
    if count == 0 {
        return Rule::always();
    }
    Rule::new(move |s| f(s) >= count)
}
