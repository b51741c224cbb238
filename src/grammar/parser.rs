//! Command line parser
//!
//! Splits a completed line on whitespace and walks the grammar one token at a
//! time. Keywords may be abbreviated to any prefix that selects a single
//! candidate; parameters bind the token that follows their (possibly
//! abbreviated) name. When nothing else matches, a branch's only parameter
//! binds the token itself.
//!
//! The parser never performs I/O and never invokes actions: it returns the
//! action to run, the help lines to print, or a [`ParseError`] carrying the
//! lines to print under its message.

use std::fmt;

use thiserror::Error;

use super::{ActionFn, GrammarNode, MatchKey, Parameters};

/// Header printed above context help completions
pub const COMPLETIONS_HEADER: &str = "Possible completions:";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParseMode {
    /// Resolve the line to an action
    Execute,
    /// Context help: only ever produces text
    Help,
}

/// Successful parse
pub enum ParseOutcome<'g, H> {
    /// Blank line, nothing to do
    Empty,
    /// Run `action` with the bound parameters
    Execute {
        action: &'g ActionFn<H>,
        parameters: Parameters,
        /// The command with every keyword spelled out
        normalized: String,
    },
    /// Help text to print
    Help(Vec<String>),
}

impl<H> fmt::Debug for ParseOutcome<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseOutcome::Empty => f.write_str("Empty"),
            ParseOutcome::Execute {
                parameters,
                normalized,
                ..
            } => f
                .debug_struct("Execute")
                .field("parameters", parameters)
                .field("normalized", normalized)
                .finish(),
            ParseOutcome::Help(lines) => f.debug_tuple("Help").field(lines).finish(),
        }
    }
}

/// Why a command could not be parsed; never fatal to the session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Missing input, possible completions:")]
    MissingInput { completions: Vec<String> },

    #[error("Unexpected extra input: {token}")]
    ExtraInput { token: String },

    #[error("Ambiguous input \"{token}\", candidates:")]
    Ambiguous { token: String, candidates: Vec<String> },

    #[error("Unrecognized input \"{token}\", expected:")]
    Unrecognized { token: String, completions: Vec<String> },

    #[error("Missing value for parameter <{name}>")]
    MissingValue { name: String, usage: Vec<String> },
}

impl ParseError {
    /// Lines printed below the error message
    pub fn details(&self) -> &[String] {
        match self {
            ParseError::MissingInput { completions } => completions,
            ParseError::ExtraInput { .. } => &[],
            ParseError::Ambiguous { candidates, .. } => candidates,
            ParseError::Unrecognized { completions, .. } => completions,
            ParseError::MissingValue { usage, .. } => usage,
        }
    }
}

/// Parse `line` against `root`
pub fn parse_line<'g, H>(
    root: &'g GrammarNode<H>,
    line: &str,
    mode: ParseMode,
) -> Result<ParseOutcome<'g, H>, ParseError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() && mode == ParseMode::Execute {
        return Ok(ParseOutcome::Empty);
    }
    parse_tokens(&tokens, root, String::new(), Parameters::new(), mode)
}

fn parse_tokens<'g, H>(
    tokens: &[&str],
    node: &'g GrammarNode<H>,
    mut normalized: String,
    parameters: Parameters,
    mode: ParseMode,
) -> Result<ParseOutcome<'g, H>, ParseError> {
    let Some((&token, rest)) = tokens.split_first() else {
        return end_of_input(node, normalized, parameters, mode);
    };

    let GrammarNode::Branch(branch) = node else {
        return Err(ParseError::ExtraInput {
            token: token.to_string(),
        });
    };

    let candidates = branch.candidates(token);
    if candidates.len() > 1 {
        let mut lines = Vec::new();
        for (key, child) in &candidates {
            let prefix = format!("{}{}", normalized, key.help_text());
            collect_help(child, &prefix, "", &mut lines);
        }
        return Err(ParseError::Ambiguous {
            token: token.to_string(),
            candidates: lines,
        });
    }

    match candidates.first().copied() {
        Some((MatchKey::Keyword(keyword), child)) => {
            normalized.push_str(keyword);
            normalized.push(' ');
            parse_tokens(rest, child, normalized, parameters, mode)
        }
        Some((MatchKey::Parameter(name), child)) => {
            let Some((&value, rest)) = rest.split_first() else {
                let usage = match mode {
                    ParseMode::Help => vec![format!("{0}{1} <{1}>", normalized, name)],
                    ParseMode::Execute => Vec::new(),
                };
                return Err(ParseError::MissingValue {
                    name: name.clone(),
                    usage,
                });
            };
            bind(name, value, rest, child, normalized, parameters, mode)
        }
        Some((MatchKey::End, _)) | None => match branch.sole_parameter() {
            // A lone parameter takes any token as its value
            Some((name, child)) => bind(name, token, rest, child, normalized, parameters, mode),
            None => Err(ParseError::Unrecognized {
                token: token.to_string(),
                completions: completions(node, &normalized),
            }),
        },
    }
}

fn bind<'g, H>(
    name: &str,
    value: &str,
    rest: &[&str],
    child: &'g GrammarNode<H>,
    mut normalized: String,
    mut parameters: Parameters,
    mode: ParseMode,
) -> Result<ParseOutcome<'g, H>, ParseError> {
    normalized.push_str(value);
    normalized.push(' ');
    parameters.insert(name, value);
    parse_tokens(rest, child, normalized, parameters, mode)
}

/// All tokens consumed at `node`
fn end_of_input<'g, H>(
    node: &'g GrammarNode<H>,
    normalized: String,
    parameters: Parameters,
    mode: ParseMode,
) -> Result<ParseOutcome<'g, H>, ParseError> {
    match (node, mode) {
        (GrammarNode::Action(action), ParseMode::Execute) => Ok(ParseOutcome::Execute {
            action,
            parameters,
            normalized: normalized.trim_end().to_string(),
        }),
        (GrammarNode::Action(_), ParseMode::Help) => {
            Ok(ParseOutcome::Help(vec![normalized.trim_end().to_string()]))
        }
        (GrammarNode::Branch(branch), _) => match (branch.get(&MatchKey::End), mode) {
            (Some(_), ParseMode::Help) => {
                let mut lines = vec![COMPLETIONS_HEADER.to_string()];
                lines.extend(completions(node, &normalized));
                Ok(ParseOutcome::Help(lines))
            }
            (Some(child), ParseMode::Execute) => end_of_input(child, normalized, parameters, mode),
            (None, _) => Err(ParseError::MissingInput {
                completions: completions(node, &normalized),
            }),
        },
    }
}

/// Every command reachable from `node`, each prefixed with `prefix`
pub fn completions<H>(node: &GrammarNode<H>, prefix: &str) -> Vec<String> {
    let mut lines = Vec::new();
    collect_help(node, prefix, "", &mut lines);
    lines
}

fn collect_help<H>(node: &GrammarNode<H>, prefix: &str, command: &str, lines: &mut Vec<String>) {
    match node {
        GrammarNode::Action(_) => {
            let line = format!("{}{}", prefix, command);
            lines.push(line.trim_end().to_string());
        }
        GrammarNode::Branch(branch) => {
            for (key, child) in branch.sorted_children() {
                let command = format!("{}{}", command, key.help_text());
                collect_help(child, prefix, &command, lines);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Handler recording which action ran
    type Calls = Vec<String>;

    fn leaf(name: &'static str) -> GrammarNode<Calls> {
        GrammarNode::action(move |calls: &mut Calls, _, _| {
            calls.push(name.to_string());
            Ok(())
        })
    }

    fn grammar() -> GrammarNode<Calls> {
        GrammarNode::branch([
            (
                "show",
                GrammarNode::branch([
                    ("version", leaf("show version")),
                    ("interface", GrammarNode::branch([("$interface", leaf("show interface"))])),
                ]),
            ),
            ("shutdown", leaf("shutdown")),
            ("set", GrammarNode::branch([("$value", leaf("set"))])),
            (
                "clear",
                GrammarNode::branch([
                    ("", leaf("clear all")),
                    ("counters", leaf("clear counters")),
                ]),
            ),
        ])
    }

    fn normalized(outcome: ParseOutcome<'_, Calls>) -> String {
        match outcome {
            ParseOutcome::Execute { normalized, .. } => normalized,
            other => panic!("expected an action, got {:?}", other),
        }
    }

    #[test]
    fn test_ambiguous_prefix() {
        let root = grammar();
        let err = parse_line(&root, "sh", ParseMode::Execute).unwrap_err();
        let ParseError::Ambiguous { token, candidates } = &err else {
            panic!("expected ambiguity, got {:?}", err);
        };
        assert_eq!(token, "sh");
        assert_eq!(
            candidates,
            &vec![
                "show interface interface <interface>".to_string(),
                "show version".to_string(),
                "shutdown".to_string(),
            ]
        );
        assert_eq!(err.to_string(), "Ambiguous input \"sh\", candidates:");

        // "sho" only abbreviates "show", which then needs more input
        let err = parse_line(&root, "sho", ParseMode::Execute).unwrap_err();
        assert!(matches!(err, ParseError::MissingInput { .. }));
    }

    #[test]
    fn test_exact_keyword_wins() {
        let root = grammar();
        let outcome = parse_line(&root, "show version", ParseMode::Execute).unwrap();
        assert_eq!(normalized(outcome), "show version");
    }

    #[test]
    fn test_exact_match_short_circuits() {
        // "ip" also prefixes "ipv6"
        let root = GrammarNode::branch([("ip", leaf("ip")), ("ipv6", leaf("ipv6"))]);
        let outcome = parse_line(&root, "ip", ParseMode::Execute).unwrap();
        assert_eq!(normalized(outcome), "ip");

        let root = GrammarNode::branch([("$ip", leaf("ip")), ("ipv6", leaf("ipv6"))]);
        let ParseOutcome::Execute { parameters, .. } =
            parse_line(&root, "ip 1", ParseMode::Execute).unwrap()
        else {
            panic!("expected an action");
        };
        assert_eq!(parameters.get("ip"), Some("1"));

        let err = parse_line(&root, "i", ParseMode::Execute).unwrap_err();
        assert_eq!(
            err,
            ParseError::Ambiguous {
                token: "i".to_string(),
                candidates: vec!["ipv6".to_string(), "ip <ip>".to_string()],
            }
        );
    }

    #[test]
    fn test_unique_prefix() {
        let root = grammar();
        let outcome = parse_line(&root, "shu", ParseMode::Execute).unwrap();
        assert_eq!(normalized(outcome), "shutdown");

        let outcome = parse_line(&root, "  sh   v ", ParseMode::Execute);
        assert!(outcome.is_err());
        let outcome = parse_line(&root, "show v", ParseMode::Execute).unwrap();
        assert_eq!(normalized(outcome), "show version");
    }

    #[test]
    fn test_parameter_binding() {
        let root = grammar();
        match parse_line(&root, "set 42", ParseMode::Execute).unwrap() {
            ParseOutcome::Execute {
                parameters,
                normalized,
                ..
            } => {
                assert_eq!(parameters.get("value"), Some("42"));
                assert_eq!(parameters.len(), 1);
                assert_eq!(normalized, "set 42");
            }
            other => panic!("expected an action, got {:?}", other),
        }
    }

    #[test]
    fn test_parameter_named_by_prefix() {
        let root = grammar();
        match parse_line(&root, "show int int eth0", ParseMode::Execute).unwrap() {
            ParseOutcome::Execute { parameters, .. } => {
                assert_eq!(parameters.get("interface"), Some("eth0"));
            }
            other => panic!("expected an action, got {:?}", other),
        }
    }

    #[test]
    fn test_lone_parameter_takes_any_token() {
        let root = grammar();
        match parse_line(&root, "show interface eth0", ParseMode::Execute).unwrap() {
            ParseOutcome::Execute {
                parameters,
                normalized,
                ..
            } => {
                assert_eq!(parameters.get("interface"), Some("eth0"));
                assert_eq!(normalized, "show interface eth0");
            }
            other => panic!("expected an action, got {:?}", other),
        }

        // Alongside keywords the token must still name the parameter
        let root: GrammarNode<Calls> = GrammarNode::branch([
            ("all", leaf("all")),
            ("$peer", leaf("peer")),
            ("$port", leaf("port")),
        ]);
        let err = parse_line(&root, "x", ParseMode::Execute).unwrap_err();
        assert!(matches!(err, ParseError::Unrecognized { .. }));
    }

    #[test]
    fn test_missing_parameter() {
        let root = grammar();
        let err = parse_line(&root, "set", ParseMode::Execute).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingInput {
                completions: vec!["set value <value>".to_string()]
            }
        );

        let err = parse_line(&root, "show interface interface", ParseMode::Execute).unwrap_err();
        assert_eq!(err.to_string(), "Missing value for parameter <interface>");
        assert!(err.details().is_empty());
    }

    #[test]
    fn test_extra_input() {
        let root = grammar();
        let err = parse_line(&root, "set 42 extra", ParseMode::Execute).unwrap_err();
        assert_eq!(
            err,
            ParseError::ExtraInput {
                token: "extra".to_string()
            }
        );
        assert_eq!(err.to_string(), "Unexpected extra input: extra");
    }

    #[test]
    fn test_unrecognized_input() {
        let root = grammar();
        let err = parse_line(&root, "show bogus", ParseMode::Execute).unwrap_err();
        assert_eq!(err.to_string(), "Unrecognized input \"bogus\", expected:");
        assert_eq!(
            err.details(),
            &[
                "show interface interface <interface>".to_string(),
                "show version".to_string(),
            ]
        );
    }

    #[test]
    fn test_optional_trailing_clause() {
        let root = grammar();
        let outcome = parse_line(&root, "clear", ParseMode::Execute).unwrap();
        assert_eq!(normalized(outcome), "clear");
        let outcome = parse_line(&root, "cl co", ParseMode::Execute).unwrap();
        assert_eq!(normalized(outcome), "clear counters");
    }

    #[test]
    fn test_blank_line() {
        let root = grammar();
        assert!(matches!(
            parse_line(&root, "   ", ParseMode::Execute),
            Ok(ParseOutcome::Empty)
        ));
    }

    #[test]
    fn test_help_on_empty_line() {
        let root = grammar();
        let err = parse_line(&root, "", ParseMode::Help).unwrap_err();
        assert_eq!(err.to_string(), "Missing input, possible completions:");
        assert_eq!(
            err.details(),
            &[
                "clear",
                "clear counters",
                "set value <value>",
                "show interface interface <interface>",
                "show version",
                "shutdown",
            ]
        );
    }

    #[test]
    fn test_help_where_input_may_end() {
        let root = grammar();
        let ParseOutcome::Help(lines) = parse_line(&root, "cl", ParseMode::Help).unwrap() else {
            panic!("expected help");
        };
        assert_eq!(lines, vec![COMPLETIONS_HEADER, "clear", "clear counters"]);
    }

    #[test]
    fn test_help_sorts_parameters_by_name() {
        let root: GrammarNode<Calls> = GrammarNode::branch([
            ("zone", leaf("zone")),
            ("$address", leaf("address")),
            ("metric", leaf("metric")),
        ]);
        let err = parse_line(&root, "", ParseMode::Help).unwrap_err();
        assert_eq!(err.details(), &["address <address>", "metric", "zone"]);
    }

    #[test]
    fn test_help_at_action_prints_path() {
        let root = grammar();
        let outcome = parse_line(&root, "sho ver", ParseMode::Help).unwrap();
        let ParseOutcome::Help(lines) = outcome else {
            panic!("expected help");
        };
        assert_eq!(lines, vec!["show version"]);
    }

    #[test]
    fn test_help_on_missing_value() {
        let root = grammar();
        let err = parse_line(&root, "show interface int", ParseMode::Help).unwrap_err();
        assert_eq!(
            err.details(),
            &["show interface interface <interface>".to_string()]
        );
    }
}
