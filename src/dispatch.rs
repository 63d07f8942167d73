//! Named operation dispatch.
//!
//! A fixed table maps operation names (snake_case or camelCase) to document
//! methods. Unknown names fail with [`Error::NoSuchOperation`]; arguments of
//! the wrong shape fail with [`Error::InvalidArgument`].

use crate::document::Document;
use crate::error::{Error, Result};
use crate::node::{Node, Nodes};

/// An argument to [`Document::call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg<'s> {
    Str(&'s str),
    Int(isize),
    Bool(bool),
}

/// The result of [`Document::call`].
#[derive(Debug)]
pub enum Value<'a> {
    Node(Node<'a>),
    Nodes(Nodes<'a>),
    Text(String),
    Bool(bool),
    Document(Box<Document>),
    None,
}

impl Value<'_> {
    /// Text content, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Load,
    LoadFile,
    Clear,
    SetKeepBrokenHtml,
    Find,
    FindOne,
    FindMulti,
    GetElementById,
    GetElementByTagName,
    GetElementsByTagName,
    Html,
    InnerHtml,
    Xml,
    Text,
    Save,
}

impl Operation {
    fn from_name(name: &str) -> Option<Self> {
        let op = match fold(name).as_str() {
            "load" | "loadhtml" => Self::Load,
            "loadfile" | "loadhtmlfile" => Self::LoadFile,
            "clear" => Self::Clear,
            "setkeepbrokenhtml" | "usekeepbrokenhtml" => Self::SetKeepBrokenHtml,
            "find" => Self::Find,
            "findone" => Self::FindOne,
            "findmulti" => Self::FindMulti,
            "getelementbyid" => Self::GetElementById,
            "getelementbytagname" => Self::GetElementByTagName,
            "getelementsbytagname" => Self::GetElementsByTagName,
            "html" | "outertext" | "outerhtml" => Self::Html,
            "innerhtml" | "innertext" => Self::InnerHtml,
            "xml" => Self::Xml,
            "text" | "plaintext" => Self::Text,
            "save" => Self::Save,
            _ => return None,
        };
        Some(op)
    }

    fn name(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::LoadFile => "load_file",
            Self::Clear => "clear",
            Self::SetKeepBrokenHtml => "set_keep_broken_html",
            Self::Find => "find",
            Self::FindOne => "find_one",
            Self::FindMulti => "find_multi",
            Self::GetElementById => "get_element_by_id",
            Self::GetElementByTagName => "get_element_by_tag_name",
            Self::GetElementsByTagName => "get_elements_by_tag_name",
            Self::Html => "html",
            Self::InnerHtml => "inner_html",
            Self::Xml => "xml",
            Self::Text => "text",
            Self::Save => "save",
        }
    }
}

fn fold(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// === Argument access ===

fn arity(op: Operation, args: &[Arg], min: usize, max: usize) -> Result<()> {
    if (min..=max).contains(&args.len()) {
        Ok(())
    } else {
        Err(Error::InvalidArgument {
            operation: op.name(),
            reason: format!("expected {min}..={max} arguments, got {}", args.len()),
        })
    }
}

fn str_arg<'s>(op: Operation, args: &[Arg<'s>], i: usize) -> Result<&'s str> {
    match args.get(i) {
        Some(Arg::Str(s)) => Ok(s),
        other => Err(Error::InvalidArgument {
            operation: op.name(),
            reason: format!("argument {i} must be a string, got {other:?}"),
        }),
    }
}

fn int_arg(op: Operation, args: &[Arg], i: usize) -> Result<Option<isize>> {
    match args.get(i) {
        None => Ok(None),
        Some(Arg::Int(n)) => Ok(Some(*n)),
        Some(other) => Err(Error::InvalidArgument {
            operation: op.name(),
            reason: format!("argument {i} must be an integer, got {other:?}"),
        }),
    }
}

fn bool_arg(op: Operation, args: &[Arg], i: usize) -> Result<bool> {
    match args.get(i) {
        Some(Arg::Bool(b)) => Ok(*b),
        other => Err(Error::InvalidArgument {
            operation: op.name(),
            reason: format!("argument {i} must be a boolean, got {other:?}"),
        }),
    }
}

impl Document {
    /// Call an operation by name.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchOperation`] for a name outside the table,
    /// [`Error::InvalidArgument`] for arguments of the wrong shape and
    /// [`Error::Io`] when `load_file` cannot read its path.
    ///
    /// # Example
    ///
    /// ```rust
    /// use domwright::dispatch::{Arg, Value};
    /// use domwright::{Document, Error};
    ///
    /// let mut doc = Document::new();
    /// doc.call("load", &[Arg::Str("<p>a</p><p>b</p>")]).unwrap();
    ///
    /// match doc.call("find", &[Arg::Str("p"), Arg::Int(-1)]).unwrap() {
    ///     Value::Node(node) => assert_eq!(node.plain_text(), "b"),
    ///     other => panic!("unexpected {other:?}"),
    /// }
    /// assert!(matches!(doc.call("nope", &[]), Err(Error::NoSuchOperation(_))));
    /// ```
    pub fn call(&mut self, name: &str, args: &[Arg]) -> Result<Value<'_>> {
        let op = Operation::from_name(name).ok_or_else(|| Error::NoSuchOperation(name.to_string()))?;

        match op {
            Operation::Load => {
                arity(op, args, 1, 1)?;
                self.load(str_arg(op, args, 0)?);
                return Ok(Value::None);
            }
            Operation::LoadFile => {
                arity(op, args, 1, 1)?;
                self.load_file(str_arg(op, args, 0)?)?;
                return Ok(Value::None);
            }
            Operation::Clear => {
                arity(op, args, 0, 0)?;
                self.clear();
                return Ok(Value::None);
            }
            Operation::SetKeepBrokenHtml => {
                arity(op, args, 1, 1)?;
                self.set_keep_broken_html(bool_arg(op, args, 0)?);
                return Ok(Value::None);
            }
            _ => {}
        }

        let this: &Document = self;
        let value = match op {
            Operation::Find | Operation::GetElementsByTagName => {
                arity(op, args, 1, 2)?;
                let needle = str_arg(op, args, 0)?;
                let nodes = if op == Operation::Find {
                    this.find(needle)
                } else {
                    this.get_elements_by_tag_name(needle)
                };
                match int_arg(op, args, 1)? {
                    Some(index) => Value::Node(nodes.at(index)),
                    None => Value::Nodes(nodes),
                }
            }
            Operation::FindOne => {
                arity(op, args, 1, 1)?;
                Value::Node(this.find_one(str_arg(op, args, 0)?))
            }
            Operation::FindMulti => {
                arity(op, args, 1, 1)?;
                Value::Nodes(this.find_multi(str_arg(op, args, 0)?))
            }
            Operation::GetElementById => {
                arity(op, args, 1, 1)?;
                Value::Node(this.get_element_by_id(str_arg(op, args, 0)?))
            }
            Operation::GetElementByTagName => {
                arity(op, args, 1, 1)?;
                Value::Node(this.get_element_by_tag_name(str_arg(op, args, 0)?))
            }
            Operation::Html | Operation::InnerHtml | Operation::Xml | Operation::Text | Operation::Save => {
                arity(op, args, 0, 0)?;
                Value::Text(match op {
                    Operation::InnerHtml => this.inner_html(),
                    Operation::Xml => this.xml(),
                    Operation::Text => this.text(),
                    _ => this.html(),
                })
            }
            Operation::Load | Operation::LoadFile | Operation::Clear | Operation::SetKeepBrokenHtml => {
                Value::None
            }
        };
        Ok(value)
    }

    /// Call a type-level operation by name: `str_get_html` / `strGetHtml`
    /// and `file_get_html` / `fileGetHtml`.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchOperation`] for any other name,
    /// [`Error::InvalidArgument`] for a missing or non-string argument and
    /// [`Error::Io`] when the file cannot be read.
    pub fn call_static(name: &str, args: &[Arg]) -> Result<Value<'static>> {
        let operation = match fold(name).as_str() {
            "strgethtml" => "str_get_html",
            "filegethtml" => "file_get_html",
            _ => return Err(Error::NoSuchOperation(name.to_string())),
        };

        let source = match args {
            [Arg::Str(s)] => *s,
            _ => {
                return Err(Error::InvalidArgument {
                    operation,
                    reason: format!("expected one string argument, got {args:?}"),
                })
            }
        };

        let doc = if operation == "str_get_html" {
            Document::parse(source)
        } else {
            Document::parse_file(source)?
        };
        Ok(Value::Document(Box::new(doc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_fold_case_and_underscores() {
        assert_eq!(Operation::from_name("findOne"), Some(Operation::FindOne));
        assert_eq!(Operation::from_name("find_one"), Some(Operation::FindOne));
        assert_eq!(Operation::from_name("getElementsByTagName"), Some(Operation::GetElementsByTagName));
        assert_eq!(Operation::from_name("frobnicate"), None);
    }

    #[test]
    fn test_unknown_operation() {
        let mut doc = Document::new();
        let err = doc.call("frobnicate", &[]).unwrap_err();
        assert!(matches!(err, Error::NoSuchOperation(name) if name == "frobnicate"));
    }

    #[test]
    fn test_wrong_argument_shape() {
        let mut doc = Document::new();
        assert!(matches!(
            doc.call("load", &[Arg::Int(1)]),
            Err(Error::InvalidArgument { operation: "load", .. })
        ));
        assert!(matches!(
            doc.call("find", &[]),
            Err(Error::InvalidArgument { operation: "find", .. })
        ));
        assert!(matches!(
            doc.call("find", &[Arg::Str("p"), Arg::Str("x")]),
            Err(Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_find_with_and_without_index() {
        let mut doc = Document::new();
        doc.call("load", &[Arg::Str("<p>1</p><p>2</p><p>3</p>")]).unwrap();

        match doc.call("find", &[Arg::Str("p")]).unwrap() {
            Value::Nodes(nodes) => assert_eq!(nodes.len(), 3),
            other => panic!("unexpected {other:?}"),
        }
        match doc.call("find", &[Arg::Str("p"), Arg::Int(99)]).unwrap() {
            Value::Node(node) => assert!(node.is_not_found()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_text_operations() {
        let mut doc = Document::new();
        doc.call("load", &[Arg::Str("<b>x</b>")]).unwrap();
        assert_eq!(doc.call("html", &[]).unwrap().as_text(), Some("<b>x</b>"));
        assert_eq!(doc.call("plaintext", &[]).unwrap().as_text(), Some("x"));

        doc.call("clear", &[]).unwrap();
        assert_eq!(doc.call("save", &[]).unwrap().as_text(), Some(""));
    }

    #[test]
    fn test_static_calls() {
        match Document::call_static("str_get_html", &[Arg::Str("<i>x</i>")]).unwrap() {
            Value::Document(doc) => assert_eq!(doc.html(), "<i>x</i>"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            Document::call_static("nope", &[]),
            Err(Error::NoSuchOperation(_))
        ));
        assert!(matches!(
            Document::call_static("fileGetHtml", &[Arg::Str("/no/such/file.html")]),
            Err(Error::Io { .. })
        ));
    }
}
