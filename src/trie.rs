//! Prefix tree of space-separated command words.

use crate::error::RegistrationError;
use std::collections::HashMap;

/// A prefix tree keyed by lowercase command words.
///
/// Every node may carry a value, so a path can be both a command and the
/// namespace of longer commands (`object` and `object list`). The tree is
/// generic over what a leaf stores; the console keeps its command entries here.
#[derive(Debug)]
pub struct CommandTrie<T> {
    root: Node<T>,
}

#[derive(Debug)]
struct Node<T> {
    children: HashMap<String, Node<T>>,
    value: Option<T>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        Self {
            children: HashMap::new(),
            value: None,
        }
    }
}

impl<T> Default for CommandTrie<T> {
    fn default() -> Self {
        Self {
            root: Node::default(),
        }
    }
}

/// Result of walking a token sequence down the tree.
#[derive(Debug, PartialEq, Eq)]
pub struct Lookup<'a, T> {
    /// Value attached to the deepest node reached that has one.
    pub value: &'a T,
    /// Tokens left after that node, in their original case.
    pub args: Vec<String>,
}

/// Outcome of a completion query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Completion {
    /// Text to put back in the operator's input line.
    pub text: String,
    /// Set when several continuations exist and should be shown.
    pub listing: Option<Listing>,
}

/// Candidate continuations for an ambiguous completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// The input as it stood when the candidates were gathered.
    pub echo: String,
    /// Full candidate lines, lexicographically sorted.
    pub candidates: Vec<String>,
}

impl Completion {
    fn text(text: String) -> Self {
        Self {
            text,
            listing: None,
        }
    }
}

impl<T> CommandTrie<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `value` to the node addressed by `path`.
    ///
    /// Words are case-folded. Re-adding an existing path replaces its value and
    /// hands the previous one back.
    pub fn add(&mut self, path: &str, value: T) -> Result<Option<T>, RegistrationError> {
        let lowered = path.to_lowercase();
        let mut words = lowered.split_whitespace().peekable();
        if words.peek().is_none() {
            return Err(RegistrationError::EmptyCommand);
        }

        let mut node = &mut self.root;
        for word in words {
            node = node.children.entry(word.to_string()).or_default();
        }
        Ok(node.value.replace(value))
    }

    /// Number of nodes carrying a value.
    pub fn len(&self) -> usize {
        self.root.count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Walks `tokens` as far as the tree allows and returns the deepest value
    /// passed on the way, with the tokens after it as arguments.
    pub fn lookup(&self, tokens: &[String]) -> Option<Lookup<'_, T>> {
        let mut node = &self.root;
        let mut best = node.value.as_ref().map(|value| (value, 0));

        for (depth, token) in tokens.iter().enumerate() {
            let Some(child) = node.children.get(&token.to_lowercase()) else {
                break;
            };
            node = child;
            if let Some(value) = node.value.as_ref() {
                best = Some((value, depth + 1));
            }
        }

        best.map(|(value, consumed)| Lookup {
            value,
            args: tokens[consumed..].to_vec(),
        })
    }

    /// Completes a partially typed command line.
    ///
    /// The input is split on single spaces, so a trailing space asks for the
    /// children of the words before it.
    pub fn complete(&self, partial: &str) -> Completion {
        let words: Vec<&str> = partial.split(' ').collect();
        self.root.complete(&words, String::new())
    }
}

impl<T> Node<T> {
    fn count(&self) -> usize {
        let own = usize::from(self.value.is_some());
        own + self.children.values().map(Node::count).sum::<usize>()
    }

    fn sorted_keys(&self) -> Vec<&String> {
        let mut keys: Vec<&String> = self.children.keys().collect();
        keys.sort();
        keys
    }

    fn complete(&self, words: &[&str], mut result: String) -> Completion {
        match words {
            [] if self.value.is_some() => Completion::text(result),
            [] => {
                let candidates = self
                    .sorted_keys()
                    .into_iter()
                    .map(|key| format!("{result} {key}"))
                    .collect();
                Completion {
                    listing: Some(Listing {
                        echo: result.clone(),
                        candidates,
                    }),
                    text: result + " ",
                }
            }
            [last] => {
                let key = last.to_lowercase();
                if let Some(child) = self.children.get(&key) {
                    result.push_str(last);
                    return child.complete(&[], result);
                }

                let matches: Vec<&String> = self
                    .sorted_keys()
                    .into_iter()
                    .filter(|candidate| candidate.starts_with(&key))
                    .collect();

                match matches.as_slice() {
                    [] => Completion::text(result + *last),
                    [only] => Completion::text(format!("{result}{only} ")),
                    _ => {
                        let candidates = matches
                            .iter()
                            .map(|candidate| format!("{result}{candidate}"))
                            .collect();
                        let echo = format!("{result}{last}");
                        Completion {
                            text: echo.clone(),
                            listing: Some(Listing { echo, candidates }),
                        }
                    }
                }
            }
            [first, rest @ ..] => match self.children.get(&first.to_lowercase()) {
                Some(child) => {
                    result.push_str(first);
                    result.push(' ');
                    child.complete(rest, result)
                }
                None => Completion::text(result),
            },
        }
    }
}
