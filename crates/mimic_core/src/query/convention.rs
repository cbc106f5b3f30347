//! Method-name convention parser.
//!
//! Grammar:
//!
//! ```text
//! methodIdentifier := queryPrefix attributeChain
//! queryPrefix      := "findBy" | "find" | "countBy" | "deleteBy"
//! attributeChain   := Attribute ("And" Attribute)*
//! Attribute        := UpperCaseLetter (Letter | Digit)*
//! ```
//!
//! # Invariants
//! - The longest matching prefix wins (`findBy` before `find`).
//! - `And` only separates attributes when an upper-case letter follows it.
//! - Attribute order is preserved; it drives positional argument binding.

use crate::query::builder::QueryForm;
use crate::repo::error::{DerivationReason, RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;

const CONJUNCTION: &str = "And";

const PREFIXES: &[(&str, QueryForm)] = &[
    ("findBy", QueryForm::SelectFiltered),
    ("find", QueryForm::SelectFiltered),
    ("countBy", QueryForm::CountFiltered),
    ("deleteBy", QueryForm::DeleteFiltered),
];

static ATTRIBUTE_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Za-z0-9]*$").expect("valid attribute token regex"));

/// Result of parsing one method identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMethod {
    pub form: QueryForm,
    /// lowerCamelCase attribute names in declaration order.
    pub attributes: Vec<String>,
}

/// Parses `method` into its query form and filter attributes.
pub fn parse(method: &str) -> RepoResult<ParsedMethod> {
    let fail = |reason| RepoError::derivation(method, reason);

    let (prefix, form) = PREFIXES
        .iter()
        .filter(|(prefix, _)| method.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .copied()
        .ok_or_else(|| fail(DerivationReason::MissingPrefix))?;

    let chain = &method[prefix.len()..];
    if chain.is_empty() {
        return Err(fail(DerivationReason::EmptyAttributeChain));
    }

    let mut attributes = Vec::new();
    for token in split_conjunctions(chain) {
        if !ATTRIBUTE_TOKEN_RE.is_match(token) {
            return Err(fail(DerivationReason::MalformedAttribute(token.to_string())));
        }
        attributes.push(lower_first(token));
    }

    Ok(ParsedMethod { form, attributes })
}

/// Parses `method` and returns only its filter attribute names.
pub fn parse_attributes(method: &str) -> RepoResult<Vec<String>> {
    parse(method).map(|parsed| parsed.attributes)
}

fn split_conjunctions(chain: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut token_start = 0;
    let mut cursor = 0;

    while let Some(offset) = chain[cursor..].find(CONJUNCTION) {
        let at = cursor + offset;
        let after = at + CONJUNCTION.len();
        let next_is_upper = chain[after..]
            .chars()
            .next()
            .is_some_and(|ch| ch.is_ascii_uppercase());

        if at > token_start && next_is_upper {
            tokens.push(&chain[token_start..at]);
            token_start = after;
        }
        cursor = after;
    }

    tokens.push(&chain[token_start..]);
    tokens
}

fn lower_first(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, parse_attributes};
    use crate::query::builder::QueryForm;
    use crate::repo::error::{DerivationReason, RepoError};

    fn reason(method: &str) -> DerivationReason {
        match parse(method) {
            Err(RepoError::QueryDerivation { reason, .. }) => reason,
            other => panic!("expected derivation error for {method}, got {other:?}"),
        }
    }

    #[test]
    fn single_attribute() {
        assert_eq!(parse_attributes("findByName").unwrap(), vec!["name"]);
    }

    #[test]
    fn conjunction_preserves_order() {
        assert_eq!(
            parse_attributes("findByNameAndBirthYear").unwrap(),
            vec!["name", "birthYear"]
        );
    }

    #[test]
    fn short_prefix_is_accepted() {
        assert_eq!(parse_attributes("findBirthYear").unwrap(), vec!["birthYear"]);
    }

    #[test]
    fn longer_prefix_wins() {
        // `find` would leave "ByName" behind.
        let parsed = parse("findByName").unwrap();
        assert_eq!(parsed.attributes, vec!["name"]);
        assert_eq!(parsed.form, QueryForm::SelectFiltered);
    }

    #[test]
    fn count_and_delete_prefixes() {
        assert_eq!(parse("countByName").unwrap().form, QueryForm::CountFiltered);
        assert_eq!(
            parse("deleteByBirthYear").unwrap().form,
            QueryForm::DeleteFiltered
        );
    }

    #[test]
    fn and_inside_attribute_is_not_a_separator() {
        assert_eq!(
            parse_attributes("findByBrandAndAndroidVersion").unwrap(),
            vec!["brand", "androidVersion"]
        );
        assert_eq!(
            parse_attributes("findByAndroidVersion").unwrap(),
            vec!["androidVersion"]
        );
    }

    #[test]
    fn empty_chain_is_rejected() {
        assert_eq!(reason("findBy"), DerivationReason::EmptyAttributeChain);
        assert_eq!(reason("find"), DerivationReason::EmptyAttributeChain);
    }

    #[test]
    fn missing_prefix_is_rejected() {
        assert_eq!(reason("byName"), DerivationReason::MissingPrefix);
        assert_eq!(reason("listAll"), DerivationReason::MissingPrefix);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(
            reason("findByname"),
            DerivationReason::MalformedAttribute("name".to_string())
        );
        assert_eq!(
            reason("findByName_Age"),
            DerivationReason::MalformedAttribute("Name_Age".to_string())
        );
    }
}
