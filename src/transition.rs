//! Picks a workflow transition from the set an issue currently offers.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use trackerkit_api::Transition;

/// One available edge out of an issue's current workflow state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDescriptor {
    pub id: String,
    pub name: String,
}

impl TransitionDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Decodes a remote transition. Entries without an id cannot be executed
    /// and yield `None`; a missing name falls back to the destination status.
    pub fn from_remote(transition: &Transition) -> Option<Self> {
        let id = transition.id.clone()?;
        let name = transition
            .display_name()
            .or_else(|| transition.destination_name())
            .unwrap_or_default();
        Some(Self { id, name })
    }

    /// Decodes a whole remote list, dropping unusable entries.
    pub fn from_remote_list(transitions: &[Transition]) -> Vec<Self> {
        transitions.iter().filter_map(Self::from_remote).collect()
    }
}

fn fold(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Selects the transition that best matches an intent.
///
/// An exact (trimmed, case-insensitive) name match on `prefer_exact` wins
/// outright. Otherwise keywords are tried in order and, for each, the first
/// transition whose name contains it is returned, so keyword order takes
/// priority over list order. Keywords are matched case-insensitively but
/// untrimmed, so `" do"` needs a space before "do". Empty keywords are ignored.
pub fn find_transition<'a, S>(
    transitions: &'a [TransitionDescriptor],
    keywords: &[S],
    prefer_exact: Option<&str>,
) -> Option<&'a TransitionDescriptor>
where
    S: AsRef<str>,
{
    if let Some(preferred) = prefer_exact.map(fold).filter(|p| !p.is_empty()) {
        if let Some(found) = transitions.iter().find(|t| fold(&t.name) == preferred) {
            return Some(found);
        }
    }

    let names: Vec<String> = transitions.iter().map(|t| t.name.to_lowercase()).collect();
    keywords
        .iter()
        .map(|keyword| keyword.as_ref().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .find_map(|keyword| {
            names
                .iter()
                .position(|name| name.contains(&keyword))
                .map(|position| &transitions[position])
        })
}

/// One resolver call within a layered intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverPass {
    pub prefer_exact: Option<String>,
    pub keywords: Vec<String>,
}

impl ResolverPass {
    fn new(prefer_exact: Option<&str>, keywords: &[&str]) -> Self {
        Self {
            prefer_exact: prefer_exact.map(str::to_string),
            keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
        }
    }

    pub fn resolve<'a>(
        &self,
        transitions: &'a [TransitionDescriptor],
    ) -> Option<&'a TransitionDescriptor> {
        find_transition(transitions, &self.keywords, self.prefer_exact.as_deref())
    }
}

/// What the caller wants to do with an issue, independent of workflow naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Reopen,
    StartProgress,
    Resolve,
    Close,
    /// Caller-supplied wording: tried literally first, then as keywords.
    Custom {
        prefer_exact: Option<String>,
        keywords: Vec<String>,
    },
}

impl Intent {
    pub fn custom<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keywords: Vec<String> = keywords.into_iter().map(Into::into).collect();
        Intent::Custom {
            prefer_exact: keywords.first().cloned(),
            keywords,
        }
    }

    /// Resolver passes in the order they are tried.
    pub fn passes(&self) -> Vec<ResolverPass> {
        match self {
            Intent::Reopen => vec![
                ResolverPass::new(Some("Reopen"), &["reopen"]),
                ResolverPass::new(None, &["to do", "open", "backlog"]),
            ],
            Intent::StartProgress => vec![
                ResolverPass::new(Some("Start Progress"), &["start progress", "in progress"]),
                ResolverPass::new(None, &["start", "progress"]),
            ],
            Intent::Resolve => vec![
                ResolverPass::new(Some("Resolve Issue"), &["resolve"]),
                ResolverPass::new(None, &["done", "complete", "fixed"]),
            ],
            Intent::Close => vec![
                ResolverPass::new(Some("Close Issue"), &["close"]),
                ResolverPass::new(None, &["done", "resolve"]),
            ],
            Intent::Custom {
                prefer_exact,
                keywords,
            } => vec![ResolverPass {
                prefer_exact: prefer_exact.clone(),
                keywords: keywords.clone(),
            }],
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Reopen => f.write_str("reopen"),
            Intent::StartProgress => f.write_str("start progress"),
            Intent::Resolve => f.write_str("resolve"),
            Intent::Close => f.write_str("close"),
            Intent::Custom {
                prefer_exact,
                keywords,
            } => match prefer_exact {
                Some(exact) if keywords.is_empty() => f.write_str(exact),
                _ => f.write_str(&keywords.join("/")),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIntentError;

impl fmt::Display for ParseIntentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("intent must not be empty")
    }
}

impl std::error::Error for ParseIntentError {}

impl FromStr for Intent {
    type Err = ParseIntentError;

    /// Known names and aliases map to presets; anything else becomes a
    /// custom intent matching that wording.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let folded = fold(value);
        let intent = match folded.replace(['-', '_'], " ").as_str() {
            "" => return Err(ParseIntentError),
            "reopen" | "re open" | "to do" | "todo" => Intent::Reopen,
            "start" | "start progress" | "in progress" | "progress" => Intent::StartProgress,
            "resolve" | "resolved" | "done" | "fix" | "fixed" => Intent::Resolve,
            "close" | "closed" => Intent::Close,
            _ => Intent::custom([value.trim()]),
        };
        Ok(intent)
    }
}

/// Runs the intent's passes in order and returns the first match.
pub fn resolve_intent<'a>(
    transitions: &'a [TransitionDescriptor],
    intent: &Intent,
) -> Option<&'a TransitionDescriptor> {
    for (index, pass) in intent.passes().iter().enumerate() {
        if let Some(found) = pass.resolve(transitions) {
            debug!(
                "intent {} resolved to transition {} ({}) on pass {}",
                intent,
                found.id,
                found.name,
                index + 1
            );
            return Some(found);
        }
    }
    debug!(
        "intent {} matched none of {} transitions",
        intent,
        transitions.len()
    );
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn transitions(names: &[(&str, &str)]) -> Vec<TransitionDescriptor> {
        names
            .iter()
            .map(|(id, name)| TransitionDescriptor::new(*id, *name))
            .collect()
    }

    #[test]
    fn exact_preference_short_circuits() {
        let list = transitions(&[("1", "Reopen"), ("2", "To Do")]);
        let found = find_transition(&list, &["reopen", "to do"], Some("reopen"));
        assert_eq!(found.map(|t| t.id.as_str()), Some("1"));

        let list = transitions(&[("1", "Reopen and assign"), ("2", "  REOPEN ")]);
        let found = find_transition(&list, &["reopen"], Some("Reopen"));
        assert_eq!(found.map(|t| t.id.as_str()), Some("2"));
    }

    #[test]
    fn keyword_priority_beats_list_order() {
        let list = transitions(&[("1", "Mark as To Do"), ("2", "Reopen Issue")]);
        let found = find_transition(&list, &["reopen", "to do"], None);
        assert_eq!(found.map(|t| t.id.as_str()), Some("2"));
    }

    #[test]
    fn first_transition_wins_within_a_keyword() {
        let list = transitions(&[("1", "Close"), ("2", "Close Issue")]);
        let found = find_transition(&list, &["close"], None);
        assert_eq!(found.map(|t| t.id.as_str()), Some("1"));
    }

    #[test]
    fn missing_exact_falls_through_to_keywords() {
        let list = transitions(&[("5", "Back to backlog")]);
        let found = find_transition(&list, &["backlog"], Some("Reopen"));
        assert_eq!(found.map(|t| t.id.as_str()), Some("5"));
    }

    #[test]
    fn keywords_keep_their_surrounding_spaces() {
        let list = transitions(&[("1", "Undo"), ("2", "Do it")]);
        assert_eq!(find_transition(&list, &[" do"], None), None);

        let list = transitions(&[("1", "Undo"), ("2", "Then do it")]);
        let found = find_transition(&list, &[" DO"], None);
        assert_eq!(found.map(|t| t.id.as_str()), Some("2"));
    }

    #[test]
    fn no_match_is_absent() {
        let list = transitions(&[("1", "Start Progress"), ("2", "Resolve")]);
        assert_eq!(find_transition(&list, &["reopen", "to do"], None), None);
        assert_eq!(find_transition(&list, &["", "  "], None), None);
        assert_eq!(find_transition::<&str>(&[], &["x"], Some("x")), None);
    }

    #[test]
    fn results_are_stable_across_calls() {
        let list = transitions(&[("1", "Open"), ("2", "Reopen"), ("3", "Open again")]);
        let first = find_transition(&list, &["open"], None);
        for _ in 0..10 {
            assert_eq!(find_transition(&list, &["open"], None), first);
        }
        assert_eq!(first.map(|t| t.id.as_str()), Some("1"));
    }

    #[test]
    fn reopen_intent_layers_exact_then_fallbacks() {
        let with_reopen = transitions(&[("1", "To Do"), ("2", "Reopen")]);
        assert_eq!(
            resolve_intent(&with_reopen, &Intent::Reopen).map(|t| t.id.as_str()),
            Some("2")
        );

        let without_reopen = transitions(&[("7", "Resolve"), ("8", "Move to Backlog"), ("9", "To Do")]);
        assert_eq!(
            resolve_intent(&without_reopen, &Intent::Reopen).map(|t| t.id.as_str()),
            Some("9")
        );
    }

    #[test]
    fn resolve_and_close_presets() {
        let list = transitions(&[("11", "Start Progress"), ("21", "Done"), ("31", "Close Issue")]);
        assert_eq!(
            resolve_intent(&list, &Intent::Resolve).map(|t| t.id.as_str()),
            Some("21")
        );
        assert_eq!(
            resolve_intent(&list, &Intent::Close).map(|t| t.id.as_str()),
            Some("31")
        );
        assert_eq!(
            resolve_intent(&list, &Intent::StartProgress).map(|t| t.id.as_str()),
            Some("11")
        );
    }

    #[test]
    fn intents_parse_with_aliases() {
        assert_eq!("Done".parse::<Intent>(), Ok(Intent::Resolve));
        assert_eq!("re-open".parse::<Intent>(), Ok(Intent::Reopen));
        assert_eq!("in_progress".parse::<Intent>(), Ok(Intent::StartProgress));
        assert_eq!("CLOSED".parse::<Intent>(), Ok(Intent::Close));
        assert_eq!("  ".parse::<Intent>(), Err(ParseIntentError));
        assert_eq!(
            " Waiting for customer ".parse::<Intent>(),
            Ok(Intent::Custom {
                prefer_exact: Some("Waiting for customer".to_string()),
                keywords: vec!["Waiting for customer".to_string()],
            })
        );
    }

    #[test]
    fn custom_intent_matches_caller_wording() {
        let list = transitions(&[("1", "Escalate to L2"), ("2", "Escalate")]);
        let intent = Intent::custom(["escalate"]);
        assert_eq!(
            resolve_intent(&list, &intent).map(|t| t.id.as_str()),
            Some("2")
        );
        assert_eq!(intent.to_string(), "escalate");
    }

    #[test]
    fn remote_transitions_are_decoded_and_filtered() {
        let remote: Vec<Transition> = serde_json::from_value(json!([
            {"id": "11", "name": "Start Progress"},
            {"id": 21, "name": {"en": "Done"}},
            {"name": "No id"},
            {"id": "31", "to": {"id": "6", "name": "Closed"}}
        ]))
        .unwrap();

        assert_eq!(
            TransitionDescriptor::from_remote_list(&remote),
            vec![
                TransitionDescriptor::new("11", "Start Progress"),
                TransitionDescriptor::new("21", "Done"),
                TransitionDescriptor::new("31", "Closed"),
            ]
        );
    }
}
