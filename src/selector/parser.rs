//! Selector compiler.
//!
//! Turns selector text into a [`Selector`]. Compilation fails only when the
//! text cannot be tokenized; a group built from tokens the matcher does not
//! understand compiles to a group that matches nothing.

use tracing::trace;

use crate::dom::xpath::{self, Path};
use crate::error::{Error, Result};
use crate::guard;

/// A compiled selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    pub(crate) source: String,
    pub(crate) kind: SelectorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SelectorKind {
    /// Raw `//` path query; `None` when the path is outside the supported subset.
    Path(Option<Path>),
    /// Comma-separated groups.
    Groups(Vec<SelectorGroup>),
}

/// One comma-separated alternative. No parts means "matches nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectorGroup {
    pub parts: Vec<SelectorPart>,
}

/// A compound selector together with the combinator joining it to the
/// previous part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorPart {
    pub combinator: Combinator,
    pub simple: SimpleSelector,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    /// First part of a group.
    None,
    /// Whitespace.
    Descendant,
    /// `>`
    Child,
}

/// Node kinds selectable by name instead of tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoKind {
    Text,
    Comment,
}

/// Tag, id, class and attribute predicates of one step.
///
/// Id, class and attribute names and values are stored guard-encoded so they
/// compare directly against tree values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleSelector {
    pub tag: Option<String>,
    pub universal: bool,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeSelector>,
    pub pseudo: Option<PseudoKind>,
}

impl SimpleSelector {
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeSelector {
    pub name: String,
    pub op: AttributeOp,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeOp {
    /// `[attr]`
    Exists,
    /// `[attr=value]`
    Equals,
    /// `[attr~=value]`, whitespace-separated word
    Includes,
    /// `[attr^=value]`
    StartsWith,
    /// `[attr$=value]`
    EndsWith,
    /// `[attr*=value]`
    Substring,
}

/// Compile selector text.
///
/// # Errors
///
/// Returns [`Error::SelectorSyntax`] for empty input, an unterminated string
/// or an unterminated `[`.
pub fn compile(text: &str) -> Result<Selector> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(syntax_error(text, "empty selector"));
    }

    if trimmed.starts_with("//") {
        let path = xpath::parse(trimmed);
        if path.is_none() {
            trace!(selector = text, "unsupported path query, matching nothing");
        }
        return Ok(Selector {
            source: text.to_string(),
            kind: SelectorKind::Path(path),
        });
    }

    let tokens = tokenize(trimmed).map_err(|reason| syntax_error(text, reason))?;

    let groups = tokens
        .split(|t| *t == Token::Comma)
        .map(|tokens| {
            build_group(tokens).unwrap_or_else(|| {
                trace!(selector = text, "selector group matches nothing");
                SelectorGroup::default()
            })
        })
        .collect();

    Ok(Selector {
        source: text.to_string(),
        kind: SelectorKind::Groups(groups),
    })
}

fn syntax_error(selector: &str, reason: &str) -> Error {
    Error::SelectorSyntax {
        selector: selector.to_string(),
        reason: reason.to_string(),
    }
}

// === Tokenizer ===

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Hash(String),
    Dot,
    Star,
    Comma,
    Gt,
    Whitespace,
    Attr(AttributeSelector),
    /// Well-formed brackets with an operator or shape the matcher lacks.
    BadAttr,
    Delim(char),
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_') || !c.is_ascii()
}

fn tokenize(text: &str) -> std::result::Result<Vec<Token>, &'static str> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => {
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
                tokens.push(Token::Whitespace);
                continue;
            }
            '.' => tokens.push(Token::Dot),
            '*' => tokens.push(Token::Star),
            ',' => tokens.push(Token::Comma),
            '>' => tokens.push(Token::Gt),
            '#' => {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && is_ident_char(chars[end]) {
                    end += 1;
                }
                if end == start {
                    tokens.push(Token::Delim('#'));
                } else {
                    tokens.push(Token::Hash(chars[start..end].iter().collect()));
                    i = end;
                    continue;
                }
            }
            '[' => {
                let (token, next) = attribute(&chars, i + 1)?;
                tokens.push(token);
                i = next;
                continue;
            }
            '"' | '\'' => {
                let close = chars[i + 1..]
                    .iter()
                    .position(|&q| q == c)
                    .ok_or("unterminated string")?;
                tokens.push(Token::Delim(c));
                i += close + 2;
                continue;
            }
            c if is_ident_char(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
                continue;
            }
            other => tokens.push(Token::Delim(other)),
        }
        i += 1;
    }

    // whitespace around `,` and `>` is not a combinator
    let mut cleaned: Vec<Token> = Vec::with_capacity(tokens.len());
    for token in tokens {
        let joins = matches!(token, Token::Comma | Token::Gt);
        if joins && cleaned.last() == Some(&Token::Whitespace) {
            cleaned.pop();
        }
        if token == Token::Whitespace && matches!(cleaned.last(), Some(Token::Comma | Token::Gt)) {
            continue;
        }
        cleaned.push(token);
    }
    Ok(cleaned)
}

/// Tokenizes the body of `[...]`, starting after the `[`.
fn attribute(chars: &[char], mut i: usize) -> std::result::Result<(Token, usize), &'static str> {
    let skip_ws = |mut i: usize| {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        i
    };

    i = skip_ws(i);
    let name_start = i;
    while i < chars.len() && !chars[i].is_whitespace() && !matches!(chars[i], '=' | '~' | '^' | '$' | '*' | '|' | ']' | '[') {
        i += 1;
    }
    let name: String = chars[name_start..i].iter().collect();
    i = skip_ws(i);

    let Some(&c) = chars.get(i) else {
        return Err("unterminated attribute selector");
    };

    if c == ']' {
        let token = if name.is_empty() {
            Token::BadAttr
        } else {
            Token::Attr(AttributeSelector {
                name: guard::encode(&name.to_ascii_lowercase()),
                op: AttributeOp::Exists,
                value: String::new(),
            })
        };
        return Ok((token, i + 1));
    }

    let op = match c {
        '=' => Some(AttributeOp::Equals),
        '~' | '^' | '$' | '*' | '|' if chars.get(i + 1) == Some(&'=') => {
            i += 1;
            match c {
                '~' => Some(AttributeOp::Includes),
                '^' => Some(AttributeOp::StartsWith),
                '$' => Some(AttributeOp::EndsWith),
                '*' => Some(AttributeOp::Substring),
                _ => None,
            }
        }
        _ => None,
    };
    i = skip_ws(i + 1);

    let value: String = match chars.get(i) {
        None => return Err("unterminated attribute selector"),
        Some(&q @ ('"' | '\'')) => {
            let close = chars[i + 1..]
                .iter()
                .position(|&c| c == q)
                .ok_or("unterminated string")?;
            let value = chars[i + 1..i + 1 + close].iter().collect();
            i += close + 2;
            value
        }
        Some(_) => {
            let start = i;
            while i < chars.len() && !chars[i].is_whitespace() && chars[i] != ']' {
                i += 1;
            }
            chars[start..i].iter().collect()
        }
    };
    i = skip_ws(i);

    match chars.get(i) {
        None => Err("unterminated attribute selector"),
        Some(']') => {
            let token = match op {
                Some(op) if !name.is_empty() => Token::Attr(AttributeSelector {
                    name: guard::encode(&name.to_ascii_lowercase()),
                    op,
                    value: guard::encode(&value),
                }),
                _ => Token::BadAttr,
            };
            Ok((token, i + 1))
        }
        Some(_) => {
            let close = chars[i..]
                .iter()
                .position(|&c| c == ']')
                .ok_or("unterminated attribute selector")?;
            Ok((Token::BadAttr, i + close + 1))
        }
    }
}

// === Group Builder ===

/// Builds one group, or `None` when its tokens do not form a selector.
fn build_group(tokens: &[Token]) -> Option<SelectorGroup> {
    let mut parts: Vec<SelectorPart> = Vec::new();
    let mut current = SimpleSelector::default();
    let mut combinator = Combinator::None;
    let mut iter = tokens.iter().peekable();

    while let Some(token) = iter.next() {
        match token {
            Token::Whitespace | Token::Gt => {
                if !current.is_empty() {
                    parts.push(SelectorPart {
                        combinator,
                        simple: std::mem::take(&mut current),
                    });
                    combinator = Combinator::Descendant;
                } else if parts.is_empty() {
                    // leading whitespace is trimmed, so only a leading `>` lands here
                    return None;
                }
                if *token == Token::Gt {
                    if combinator == Combinator::Child {
                        return None;
                    }
                    combinator = Combinator::Child;
                }
            }
            Token::Ident(name) => {
                if !current.is_empty() {
                    return None;
                }
                let lower = name.to_ascii_lowercase();
                match lower.as_str() {
                    "text" => current.pseudo = Some(PseudoKind::Text),
                    "comment" => current.pseudo = Some(PseudoKind::Comment),
                    _ => current.tag = Some(lower),
                }
            }
            Token::Star => {
                if !current.is_empty() {
                    return None;
                }
                current.universal = true;
            }
            Token::Dot => match iter.next() {
                Some(Token::Ident(class)) => current.classes.push(guard::encode(class)),
                _ => return None,
            },
            Token::Hash(id) => {
                if current.id.is_some() {
                    return None;
                }
                current.id = Some(guard::encode(id));
            }
            Token::Attr(attr) => current.attributes.push(attr.clone()),
            Token::BadAttr | Token::Delim(_) | Token::Comma => return None,
        }

        if current.pseudo.is_some() && iter.peek().is_some_and(|t| !matches!(t, Token::Whitespace | Token::Gt)) {
            return None;
        }
    }

    if current.is_empty() {
        // trailing combinator or empty group
        return None;
    }
    parts.push(SelectorPart {
        combinator,
        simple: current,
    });

    Some(SelectorGroup { parts })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(text: &str) -> Vec<SelectorGroup> {
        match compile(text).unwrap().kind {
            SelectorKind::Groups(groups) => groups,
            SelectorKind::Path(_) => panic!("expected groups"),
        }
    }

    #[test]
    fn test_compound_selector() {
        let g = groups("div.a.b#main[data-x]");
        assert_eq!(g.len(), 1);
        let simple = &g[0].parts[0].simple;
        assert_eq!(simple.tag.as_deref(), Some("div"));
        assert_eq!(simple.classes, vec!["a", "b"]);
        assert_eq!(simple.id.as_deref(), Some("main"));
        assert_eq!(simple.attributes[0].op, AttributeOp::Exists);
    }

    #[test]
    fn test_combinators() {
        let g = groups("ul  li > a span");
        let combinators: Vec<Combinator> = g[0].parts.iter().map(|p| p.combinator).collect();
        assert_eq!(
            combinators,
            vec![
                Combinator::None,
                Combinator::Descendant,
                Combinator::Child,
                Combinator::Descendant
            ]
        );
    }

    #[test]
    fn test_child_without_spaces() {
        let g = groups("div>p");
        assert_eq!(g[0].parts.len(), 2);
        assert_eq!(g[0].parts[1].combinator, Combinator::Child);
    }

    #[test]
    fn test_attribute_values() {
        let g = groups(r#"input[id=in], a[href="x y"], a[title~='t']"#);
        assert_eq!(g.len(), 3);
        assert_eq!(g[0].parts[0].simple.attributes[0].value, "in");
        assert_eq!(g[1].parts[0].simple.attributes[0].value, "x y");
        assert_eq!(g[2].parts[0].simple.attributes[0].op, AttributeOp::Includes);
    }

    #[test]
    fn test_attribute_values_are_guarded() {
        let g = groups("a[href='?a=1&b=2']");
        let value = &g[0].parts[0].simple.attributes[0].value;
        assert_eq!(*value, guard::encode("?a=1&b=2"));
    }

    #[test]
    fn test_pseudo_kinds() {
        assert_eq!(groups("text")[0].parts[0].simple.pseudo, Some(PseudoKind::Text));
        assert_eq!(groups("div comment")[0].parts[1].simple.pseudo, Some(PseudoKind::Comment));
    }

    #[test]
    fn test_malformed_group_matches_nothing() {
        let g = groups("p:first-child, div");
        assert_eq!(g.len(), 2);
        assert!(g[0].parts.is_empty());
        assert_eq!(g[1].parts.len(), 1);

        assert!(groups("div >")[0].parts.is_empty());
        assert!(groups("> div")[0].parts.is_empty());
        assert!(groups("a[href|=en]")[0].parts.is_empty());
    }

    #[test]
    fn test_untokenizable_input_fails() {
        assert!(compile("").is_err());
        assert!(compile("   ").is_err());
        assert!(compile("a[href").is_err());
        assert!(compile("a[href='x]").is_err());
        assert!(compile("div 'open").is_err());
    }

    #[test]
    fn test_path_selector_bypasses_groups() {
        let selector = compile("//div[@id='x']").unwrap();
        assert!(matches!(selector.kind, SelectorKind::Path(Some(_))));

        let unsupported = compile("//div[contains(., 'x')]").unwrap();
        assert!(matches!(unsupported.kind, SelectorKind::Path(None)));
    }
}
