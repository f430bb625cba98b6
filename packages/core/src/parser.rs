//! Call-site keyword binding.
//!
//! A template invocation such as
//!
//! ```text
//! {% fedit block page.body admin block_id=block.id "extra" %}
//! ```
//!
//! reaches the core as a flat token list (`admin`, `block_id=block.id`, ...).
//! [`parse_kwargs`] binds those tokens against an [`AdapterSchema`]:
//!
//! - a bare token naming a flag sets it to `true`
//! - any other bare token fills the next unbound required name
//! - `name=value` binds explicitly; flags never take a value
//! - positional tokens after the first `name=value` are rejected
//! - undeclared names pass through untouched
//!
//! The result is deterministic for a given token list and context.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value as JsonValue;

use crate::context::TemplateContext;
use crate::schema::AdapterSchema;
use crate::Kwargs;

/// Call-site validation failures. These map to a "bad request" outcome.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Missing required keyword argument {name}")]
    MissingRequired { name: String },

    #[error("Positional argument '{token}' follows a keyword argument")]
    PositionalAfterKeyword { token: String },

    #[error("Keyword '{name}' is a flag and does not accept a value")]
    FlagWithValue { name: String },

    #[error("Too many positional arguments: '{token}' has no keyword to bind to")]
    TooManyPositional { token: String },

    #[error("Malformed token: {token}")]
    MalformedToken { token: String },
}

lazy_static! {
    static ref KWARG: Regex = Regex::new(r"^(?P<name>[\p{XID_Start}_]\p{XID_Continue}*)=(?P<value>.+)$")
        .expect("static regex");
    static ref INTEGER: Regex = Regex::new(r"^-?[0-9]+$").expect("static regex");
    static ref FLOAT: Regex = Regex::new(r"^-?[0-9]+\.[0-9]+$").expect("static regex");
    static ref SPLIT: Regex = Regex::new(
        r#"(?x)
            (?:[^\s'"]*(?:"(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*')[^\s'"]*)+
            | \S+
        "#
    )
    .expect("static regex");
}

/// Split a tag body into tokens, keeping quoted strings intact.
///
/// `test='hello world' id=1` becomes `["test='hello world'", "id=1"]`.
pub fn split_contents(input: &str) -> Vec<String> {
    SPLIT
        .find_iter(input)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Whether `token` has an `=` outside of any quoted string.
fn has_unquoted_eq(token: &str) -> bool {
    let mut quote = None;
    let mut escaped = false;
    for c in token.chars() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c == '=' => return true,
            None => {}
        }
    }
    false
}

/// Bind call-site tokens against a schema.
pub fn parse_kwargs<S: AsRef<str>>(
    schema: &AdapterSchema,
    tokens: &[S],
    context: &TemplateContext,
) -> Result<Kwargs, ParseError> {
    let mut kwargs = Kwargs::new();
    let mut seen_keyword = false;

    for token in tokens {
        let token = token.as_ref().trim();
        if token.is_empty() {
            continue;
        }

        if let Some(caps) = KWARG.captures(token) {
            let name = &caps["name"];
            let raw = &caps["value"];

            if schema.is_absolute(name) {
                return Err(ParseError::FlagWithValue {
                    name: name.to_string(),
                });
            }

            kwargs.insert(name.to_string(), resolve_literal(raw, context));
            seen_keyword = true;
            continue;
        }

        if schema.is_absolute(token) {
            kwargs.insert(token.to_string(), JsonValue::Bool(true));
            continue;
        }

        if has_unquoted_eq(token) {
            return Err(ParseError::MalformedToken {
                token: token.to_string(),
            });
        }

        if seen_keyword {
            return Err(ParseError::PositionalAfterKeyword {
                token: token.to_string(),
            });
        }

        let slot = schema
            .required_kwargs()
            .iter()
            .find(|name| !kwargs.contains_key(name.as_str()))
            .ok_or_else(|| ParseError::TooManyPositional {
                token: token.to_string(),
            })?;

        kwargs.insert(slot.clone(), resolve_literal(token, context));
    }

    if let Some(missing) = schema
        .required_kwargs()
        .iter()
        .find(|name| !kwargs.contains_key(name.as_str()))
    {
        return Err(ParseError::MissingRequired {
            name: missing.clone(),
        });
    }

    Ok(kwargs)
}

/// Turn one raw value into JSON.
///
/// Quoted strings, integers, floats and `True`/`False`/`None` are literals;
/// anything else is a variable looked up in `context`. Unknown variables
/// resolve to `null`.
pub fn resolve_literal(raw: &str, context: &TemplateContext) -> JsonValue {
    if let Some(s) = unquote(raw) {
        return JsonValue::String(s);
    }

    match raw {
        "True" | "true" => return JsonValue::Bool(true),
        "False" | "false" => return JsonValue::Bool(false),
        "None" | "null" => return JsonValue::Null,
        _ => {}
    }

    if INTEGER.is_match(raw) {
        if let Ok(i) = raw.parse::<i64>() {
            return JsonValue::from(i);
        }
    }

    if FLOAT.is_match(raw) {
        if let Some(n) = raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64) {
            return JsonValue::Number(n);
        }
    }

    context.resolve(raw).cloned().unwrap_or(JsonValue::Null)
}

fn unquote(raw: &str) -> Option<String> {
    let quote = raw.chars().next()?;
    if (quote != '\'' && quote != '"') || raw.len() < 2 || !raw.ends_with(quote) {
        return None;
    }

    let inner = &raw[1..raw.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(escaped) => out.push(escaped),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyword::Keyword;
    use serde_json::json;

    fn test_schema() -> AdapterSchema {
        AdapterSchema::describe(vec![
            Keyword::builder("test").build().unwrap(),
            Keyword::builder("absolute").absolute().build().unwrap(),
        ])
    }

    #[test]
    fn binds_required_and_extra_kwargs() {
        let kwargs = parse_kwargs(&test_schema(), &["test='v'", "id=1"], &TemplateContext::new())
            .unwrap();
        assert_eq!(JsonValue::Object(kwargs), json!({"test": "v", "id": 1}));
    }

    #[test]
    fn missing_required_names_the_key() {
        let err = parse_kwargs(&test_schema(), &["id=2"], &TemplateContext::new()).unwrap_err();
        assert_eq!(err, ParseError::MissingRequired { name: "test".into() });
        assert_eq!(err.to_string(), "Missing required keyword argument test");
    }

    #[test]
    fn missing_required_reports_first_in_declaration_order() {
        let schema = AdapterSchema::describe(vec![
            Keyword::builder("second").build().unwrap(),
            Keyword::builder("first").build().unwrap(),
        ]);
        let err = parse_kwargs::<&str>(&schema, &[], &TemplateContext::new()).unwrap_err();
        assert_eq!(err, ParseError::MissingRequired { name: "second".into() });
    }

    #[test]
    fn bare_flag_sets_true() {
        let kwargs = parse_kwargs(
            &test_schema(),
            &["test='test'", "absolute", "id=4"],
            &TemplateContext::new(),
        )
        .unwrap();
        assert_eq!(kwargs.get("absolute"), Some(&json!(true)));
    }

    #[test]
    fn omitted_flag_is_absent() {
        let kwargs =
            parse_kwargs(&test_schema(), &["test='test'", "id=4"], &TemplateContext::new())
                .unwrap();
        assert!(!kwargs.contains_key("absolute"));
    }

    #[test]
    fn flag_with_value_is_rejected() {
        let err = parse_kwargs(
            &test_schema(),
            &["test='t'", "absolute=True"],
            &TemplateContext::new(),
        )
        .unwrap_err();
        assert_eq!(err, ParseError::FlagWithValue { name: "absolute".into() });
    }

    #[test]
    fn keyword_with_invalid_name_is_rejected() {
        for token in ["te-st='v'", "block-id=1", "foo.bar=1", "=1", "test="] {
            let err = parse_kwargs(&test_schema(), &[token], &TemplateContext::new()).unwrap_err();
            assert_eq!(err, ParseError::MalformedToken { token: token.into() }, "{}", token);
        }
    }

    #[test]
    fn equals_inside_quotes_is_a_positional_value() {
        let kwargs = parse_kwargs(&test_schema(), &["'a=b'"], &TemplateContext::new()).unwrap();
        assert_eq!(kwargs["test"], json!("a=b"));
    }

    #[test]
    fn positional_fills_required_slots() {
        let kwargs = parse_kwargs(&test_schema(), &["'positional'"], &TemplateContext::new())
            .unwrap();
        assert_eq!(kwargs.get("test"), Some(&json!("positional")));
    }

    #[test]
    fn positional_after_keyword_is_rejected() {
        let err = parse_kwargs(&test_schema(), &["id=1", "'late'"], &TemplateContext::new())
            .unwrap_err();
        assert!(matches!(err, ParseError::PositionalAfterKeyword { .. }));
    }

    #[test]
    fn surplus_positional_is_rejected() {
        let err = parse_kwargs(&test_schema(), &["'a'", "'b'"], &TemplateContext::new())
            .unwrap_err();
        assert!(matches!(err, ParseError::TooManyPositional { .. }));
    }

    #[test]
    fn flags_do_not_end_positional_section() {
        let kwargs = parse_kwargs(&test_schema(), &["absolute", "'p'"], &TemplateContext::new())
            .unwrap();
        assert_eq!(kwargs.get("test"), Some(&json!("p")));
    }

    #[test]
    fn literals_and_variables() {
        let ctx = TemplateContext::from_json(json!({"block": {"id": "b-1"}}));
        assert_eq!(resolve_literal("'a b'", &ctx), json!("a b"));
        assert_eq!(resolve_literal("\"x\\\"y\"", &ctx), json!("x\"y"));
        assert_eq!(resolve_literal("42", &ctx), json!(42));
        assert_eq!(resolve_literal("-1.5", &ctx), json!(-1.5));
        assert_eq!(resolve_literal("True", &ctx), json!(true));
        assert_eq!(resolve_literal("None", &ctx), JsonValue::Null);
        assert_eq!(resolve_literal("block.id", &ctx), json!("b-1"));
        assert_eq!(resolve_literal("missing", &ctx), JsonValue::Null);
    }

    #[test]
    fn split_keeps_quoted_strings() {
        assert_eq!(
            split_contents(r#"test='hello world' id=1 admin name="a b""#),
            vec!["test='hello world'", "id=1", "admin", "name=\"a b\""]
        );
    }

    #[test]
    fn parsing_is_deterministic() {
        let tokens = ["test='t'", "absolute", "id=1", "z=2"];
        let a = parse_kwargs(&test_schema(), &tokens, &TemplateContext::new());
        let b = parse_kwargs(&test_schema(), &tokens, &TemplateContext::new());
        assert_eq!(a, b);
    }
}
