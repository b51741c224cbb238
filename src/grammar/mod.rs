//! Command grammar
//!
//! A grammar is a finite tree built by the application and shared read-only by
//! every session:
//!
//! ```text
//! Branch
//! ├── "show"      -> Branch
//! │   ├── "version"  -> Action
//! │   └── "$name"    -> Action      (parameter, binds one token as `name`)
//! └── "set"       -> Branch
//!     ├── "$value"   -> Action
//!     └── ""         -> Action      (end of input, optional trailing clause)
//! ```
//!
//! Keys are written as strings when building: a leading `$` marks a parameter,
//! the empty string marks "no more input".

pub mod parser;

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::core::session::Session;

pub use parser::{parse_line, ParseError, ParseMode, ParseOutcome};

/// Marks a parameter key
pub const PARAMETER_SIGIL: char = '$';

/// Application callback attached to a grammar leaf
///
/// Receives the shared command handler, the session the command was typed
/// into, and the parameters bound while parsing.
pub type ActionFn<H> = Rc<dyn Fn(&mut H, &mut Session<H>, &Parameters) -> anyhow::Result<()>>;

/// Key of a branch entry
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchKey {
    /// Taken when no tokens are left
    End,
    /// Literal keyword, may be abbreviated by any unambiguous prefix
    Keyword(String),
    /// Matches any single token and binds it under this name
    Parameter(String),
}

impl MatchKey {
    /// Parse a key written as `keyword`, `$parameter` or `""`
    pub fn parse(key: &str) -> Self {
        if key.is_empty() {
            return MatchKey::End;
        }
        match key.strip_prefix(PARAMETER_SIGIL) {
            Some(name) if !name.is_empty() => MatchKey::Parameter(name.to_string()),
            _ => MatchKey::Keyword(key.to_string()),
        }
    }

    /// Text used to order help output (parameters sort by name)
    pub fn sort_text(&self) -> &str {
        match self {
            MatchKey::End => "",
            MatchKey::Keyword(keyword) => keyword,
            MatchKey::Parameter(name) => name,
        }
    }

    /// Rendering of the key inside a help line, including the trailing space
    pub fn help_text(&self) -> String {
        match self {
            MatchKey::End => String::new(),
            MatchKey::Keyword(keyword) => format!("{} ", keyword),
            MatchKey::Parameter(name) => format!("{0} <{0}> ", name),
        }
    }

    /// Whether `token` abbreviates this key
    fn is_prefixed_by(&self, token: &str) -> bool {
        match self {
            MatchKey::End => false,
            MatchKey::Keyword(text) | MatchKey::Parameter(text) => text.starts_with(token),
        }
    }
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKey::End => Ok(()),
            MatchKey::Keyword(keyword) => write!(f, "{}", keyword),
            MatchKey::Parameter(name) => write!(f, "{}{}", PARAMETER_SIGIL, name),
        }
    }
}

/// Grammar tree node
pub enum GrammarNode<H> {
    Action(ActionFn<H>),
    Branch(Branch<H>),
}

impl<H> GrammarNode<H> {
    /// Leaf invoking `action`
    pub fn action<F>(action: F) -> Self
    where
        F: Fn(&mut H, &mut Session<H>, &Parameters) -> anyhow::Result<()> + 'static,
    {
        GrammarNode::Action(Rc::new(action))
    }

    /// Branch from `(key, child)` pairs, keys written as in [`MatchKey::parse`]
    pub fn branch<I, K>(children: I) -> Self
    where
        I: IntoIterator<Item = (K, GrammarNode<H>)>,
        K: AsRef<str>,
    {
        GrammarNode::Branch(
            children
                .into_iter()
                .map(|(key, child)| (MatchKey::parse(key.as_ref()), child))
                .collect(),
        )
    }
}

impl<H> fmt::Debug for GrammarNode<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarNode::Action(_) => f.write_str("Action"),
            GrammarNode::Branch(branch) => f.debug_map().entries(branch.children.iter()).finish(),
        }
    }
}

/// Internal decision point of the grammar
pub struct Branch<H> {
    children: BTreeMap<MatchKey, GrammarNode<H>>,
}

impl<H> Default for Branch<H> {
    fn default() -> Self {
        Self {
            children: BTreeMap::new(),
        }
    }
}

impl<H> Branch<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a child
    pub fn insert(&mut self, key: MatchKey, child: GrammarNode<H>) -> &mut Self {
        self.children.insert(key, child);
        self
    }

    pub fn get(&self, key: &MatchKey) -> Option<&GrammarNode<H>> {
        self.children.get(key)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Children ordered for help output
    pub fn sorted_children(&self) -> Vec<(&MatchKey, &GrammarNode<H>)> {
        let mut children: Vec<_> = self.children.iter().collect();
        children.sort_by(|a, b| a.0.sort_text().cmp(b.0.sort_text()));
        children
    }

    /// Candidates for `token`, strongest rule first
    ///
    /// An exact keyword wins outright, then an exact parameter name; otherwise
    /// every keyword and parameter the token abbreviates is a candidate.
    pub fn candidates(&self, token: &str) -> Vec<(&MatchKey, &GrammarNode<H>)> {
        let exact = [
            MatchKey::Keyword(token.to_string()),
            MatchKey::Parameter(token.to_string()),
        ];
        for key in &exact {
            if let Some(entry) = self.children.get_key_value(key) {
                return vec![entry];
            }
        }
        self.children
            .iter()
            .filter(|(key, _)| key.is_prefixed_by(token))
            .collect()
    }

    /// The parameter of a branch that has exactly one
    pub fn sole_parameter(&self) -> Option<(&str, &GrammarNode<H>)> {
        let mut parameters = self.children.iter().filter_map(|(key, child)| match key {
            MatchKey::Parameter(name) => Some((name.as_str(), child)),
            _ => None,
        });
        match (parameters.next(), parameters.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

impl<H> FromIterator<(MatchKey, GrammarNode<H>)> for Branch<H> {
    fn from_iter<I: IntoIterator<Item = (MatchKey, GrammarNode<H>)>>(iter: I) -> Self {
        Self {
            children: iter.into_iter().collect(),
        }
    }
}

/// Parameter values bound while parsing one command
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Parameters(BTreeMap<String, String>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, name: &str, value: &str) {
        self.0.insert(name.to_string(), value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_key_parse() {
        assert_eq!(MatchKey::parse(""), MatchKey::End);
        assert_eq!(MatchKey::parse("show"), MatchKey::Keyword("show".into()));
        assert_eq!(MatchKey::parse("$value"), MatchKey::Parameter("value".into()));
        // A lone sigil is an ordinary keyword
        assert_eq!(MatchKey::parse("$"), MatchKey::Keyword("$".into()));
        assert_eq!(MatchKey::Parameter("value".into()).to_string(), "$value");
    }

    #[test]
    fn test_help_text() {
        assert_eq!(MatchKey::parse("show").help_text(), "show ");
        assert_eq!(MatchKey::parse("$name").help_text(), "name <name> ");
        assert_eq!(MatchKey::End.help_text(), "");
    }

    #[test]
    fn test_candidates() {
        let node: GrammarNode<()> = GrammarNode::branch([
            ("show", GrammarNode::action(|_, _, _| Ok(()))),
            ("shutdown", GrammarNode::action(|_, _, _| Ok(()))),
            ("$shape", GrammarNode::action(|_, _, _| Ok(()))),
        ]);
        let GrammarNode::Branch(branch) = node else {
            panic!("expected a branch");
        };
        assert_eq!(branch.candidates("sh").len(), 3);
        assert_eq!(branch.candidates("show").len(), 1);
        assert_eq!(branch.candidates("shape").len(), 1);
        assert_eq!(branch.candidates("shu").len(), 1);
        assert!(branch.candidates("x").is_empty());

        let order: Vec<&str> = branch
            .sorted_children()
            .iter()
            .map(|(k, _)| k.sort_text())
            .collect();
        assert_eq!(order, vec!["shape", "show", "shutdown"]);
    }
}
