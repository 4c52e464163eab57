//! Alias table (§3) and the alias-resolution / variable-expansion pass
//! (§4.2) that runs between tokenizing and parsing.

use crate::env::Environment;
use crate::lexer::{tokenize, Quoting, Token};
use indexmap::IndexMap;

/// Name -> replacement text, insertion-ordered for the `alias` listing.
#[derive(Debug, Default)]
pub struct AliasTable {
    entries: IndexMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self { entries: IndexMap::new() }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Expand the first word of the token stream if it names an alias, and then
/// expand `$VAR` words against `env`.
///
/// Alias expansion happens at most once (the replacement text is tokenized
/// and spliced in, but not itself re-checked against the alias table) so
/// that `alias a="a b"` cannot recurse (§8).
pub fn expand(tokens: Vec<Token>, aliases: &AliasTable, env: &Environment) -> Vec<Token> {
    let tokens = expand_alias(tokens, aliases);
    expand_variables(tokens, env)
}

fn expand_alias(tokens: Vec<Token>, aliases: &AliasTable) -> Vec<Token> {
    let mut iter = tokens.into_iter();
    match iter.next() {
        Some(Token::Word(name, Quoting::Unquoted)) if aliases.get(&name).is_some() => {
            let replacement = aliases.get(&name).unwrap();
            let mut expanded = tokenize(replacement);
            expanded.extend(iter);
            expanded
        }
        Some(first) => {
            let mut rest: Vec<Token> = vec![first];
            rest.extend(iter);
            rest
        }
        None => Vec::new(),
    }
}

fn expand_variables(tokens: Vec<Token>, env: &Environment) -> Vec<Token> {
    tokens
        .into_iter()
        .map(|tok| match tok {
            Token::Word(text, Quoting::Unquoted) if text.starts_with('$') && text.len() > 1 => {
                let value = env.get_var(&text[1..]).unwrap_or_default();
                Token::Word(value, Quoting::Unquoted)
            }
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(s: &str) -> Token {
        Token::Word(s.to_string(), Quoting::Unquoted)
    }

    #[test]
    fn alias_is_spliced_in_once() {
        let mut aliases = AliasTable::new();
        aliases.set("a", "a b");
        let tokens = vec![word("a")];
        let expanded = expand_alias(tokens, &aliases);
        assert_eq!(expanded, vec![word("a"), word("b")]);
    }

    #[test]
    fn alias_with_trailing_args() {
        let mut aliases = AliasTable::new();
        aliases.set("ll", "ls -l");
        let tokens = vec![word("ll"), word("/tmp")];
        let expanded = expand_alias(tokens, &aliases);
        assert_eq!(expanded, vec![word("ls"), word("-l"), word("/tmp")]);
    }

    #[test]
    fn variable_expands_to_env_value_or_empty() {
        let mut env = Environment::new();
        env.set_var("DIR", "/tmp");
        let tokens = vec![word("echo"), word("$DIR"), word("$NOT_SET_XYZ")];
        let expanded = expand_variables(tokens, &env);
        assert_eq!(
            expanded,
            vec![word("echo"), word("/tmp"), word("")]
        );
    }

    #[test]
    fn quoted_dollar_word_is_not_expanded() {
        let env = Environment::new();
        let tokens = vec![Token::Word("$HOME".to_string(), Quoting::Quoted)];
        let expanded = expand_variables(tokens, &env);
        assert_eq!(expanded, vec![Token::Word("$HOME".to_string(), Quoting::Quoted)]);
    }
}
