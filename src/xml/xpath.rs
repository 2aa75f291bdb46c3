//! A small XPath 1.0 subset evaluated over [`Element`] trees.
//!
//! Supported: absolute (`/a/b`), descendant (`//a`, `a//b`) and relative
//! location paths, `.`, `*`, `@attr`, `text()`, positional `[n]` and
//! attribute-equality `[@attr='v']` predicates, and an optional
//! `string(...)` wrapper.
//!
//! `//` is `/descendant-or-self::node()/`, so `//a[1]` selects the first
//! `a` child of every parent, as in XPath 1.0. Results of a step are
//! returned in document order.
//!
//! Unprefixed name tests and names with the `ns` prefix are bound to the
//! namespace registered for the document; any other prefix is rejected.

use super::document::Element;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Query prefix under which the detected namespace is registered.
pub const NS_PREFIX: &str = "ns";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Child,
    Descendant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeTest {
    Name(String),
    AnyElement,
    SelfNode,
    Attribute(String),
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Position(usize),
    AttributeEquals(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    axis: Axis,
    test: NodeTest,
    predicates: Vec<Predicate>,
}

/// A compiled location path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPath {
    absolute: bool,
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Copy)]
enum Context<'a> {
    Document(&'a Element),
    Element(&'a Element),
}

/// A node selected by a query.
#[derive(Debug, Clone)]
pub enum Item<'a> {
    Element(&'a Element),
    Attribute(&'a str),
    Text(String),
}

impl<'a> Item<'a> {
    /// XPath string-value of the item.
    pub fn string_value(&self) -> String {
        match self {
            Item::Element(el) => el.text(),
            Item::Attribute(value) => value.to_string(),
            Item::Text(text) => text.clone(),
        }
    }
}

/// Strip a surrounding `string(...)` call if present.
pub fn unwrap_string_call(expr: &str) -> &str {
    let trimmed = expr.trim();
    match trimmed.strip_prefix("string(").and_then(|rest| rest.strip_suffix(')')) {
        Some(inner) => inner.trim(),
        None => trimmed,
    }
}

/// Wrap an expression in `string(...)` unless it already is.
pub fn wrap_string_call(expr: &str) -> String {
    let trimmed = expr.trim();
    if trimmed.starts_with("string(") {
        trimmed.to_string()
    } else {
        format!("string({})", trimmed)
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in path.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'') | (None, '"') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '/') if depth == 0 => {
                segments.push(&path[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&path[start..]);
    segments
}

impl XPath {
    /// Compile an expression of the supported subset.
    pub fn compile(expr: &str) -> Result<Self> {
        let path = unwrap_string_call(expr);
        if path.is_empty() {
            return Err(Error::XPathError("empty expression".to_string()));
        }

        let absolute = path.starts_with('/');
        let segments = split_segments(path);
        let mut steps = Vec::new();
        let mut axis = Axis::Child;
        for (i, segment) in segments.iter().enumerate() {
            let segment = segment.trim();
            if segment.is_empty() {
                // Leading "/" yields one empty segment; "//" yields another.
                if i > 0 || !absolute {
                    axis = Axis::Descendant;
                }
                continue;
            }
            steps.push(Self::compile_step(segment, axis, expr)?);
            axis = Axis::Child;
        }

        if steps.is_empty() {
            return Err(Error::XPathError(format!("no location steps in '{}'", expr)));
        }
        Ok(Self { absolute, steps })
    }

    fn compile_step(segment: &str, axis: Axis, expr: &str) -> Result<Step> {
        let (test_part, mut rest) = match segment.find('[') {
            Some(pos) => (&segment[..pos], &segment[pos..]),
            None => (segment, ""),
        };

        let mut predicates = Vec::new();
        while !rest.is_empty() {
            let close = rest
                .find(']')
                .ok_or_else(|| Error::XPathError(format!("unclosed predicate in '{}'", expr)))?;
            predicates.push(Self::compile_predicate(&rest[1..close], expr)?);
            rest = rest[close + 1..].trim_start();
            if !rest.is_empty() && !rest.starts_with('[') {
                return Err(Error::XPathError(format!("unexpected '{}' in '{}'", rest, expr)));
            }
        }

        let test = match test_part.trim() {
            "." => NodeTest::SelfNode,
            "*" => NodeTest::AnyElement,
            "text()" => NodeTest::Text,
            t if t.starts_with('@') => NodeTest::Attribute(t[1..].to_string()),
            t => NodeTest::Name(Self::local_name(t, expr)?),
        };
        Ok(Step { axis, test, predicates })
    }

    fn local_name(name: &str, expr: &str) -> Result<String> {
        match name.split_once(':') {
            Some((prefix, local)) if prefix == NS_PREFIX && !local.is_empty() => Ok(local.to_string()),
            Some((prefix, _)) => Err(Error::XPathError(format!(
                "unknown prefix '{}' in '{}'",
                prefix, expr
            ))),
            None if name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.') => {
                Ok(name.to_string())
            }
            None => Err(Error::XPathError(format!("invalid name test '{}' in '{}'", name, expr))),
        }
    }

    fn compile_predicate(body: &str, expr: &str) -> Result<Predicate> {
        let body = body.trim();
        if let Ok(position) = body.parse::<usize>() {
            if position == 0 {
                return Err(Error::XPathError(format!("positions start at 1 in '{}'", expr)));
            }
            return Ok(Predicate::Position(position));
        }
        if let Some(attr) = body.strip_prefix('@') {
            if let Some((name, value)) = attr.split_once('=') {
                let value = value.trim();
                let unquoted = value
                    .strip_prefix('\'')
                    .and_then(|v| v.strip_suffix('\''))
                    .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')));
                if let Some(unquoted) = unquoted {
                    return Ok(Predicate::AttributeEquals(name.trim().to_string(), unquoted.to_string()));
                }
            }
        }
        Err(Error::XPathError(format!("unsupported predicate '[{}]' in '{}'", body, expr)))
    }

    /// Evaluate from `context`, or from the document node when `context` is
    /// `None` or the path is absolute. `namespace` is the registered `ns` URI.
    pub fn evaluate<'a>(
        &self,
        root: &'a Element,
        context: Option<&'a Element>,
        namespace: Option<&str>,
    ) -> Vec<Item<'a>> {
        let start = match (self.absolute, context) {
            (false, Some(el)) => Context::Element(el),
            _ => Context::Document(root),
        };
        let mut current = vec![start];

        let last = self.steps.len() - 1;
        for (i, step) in self.steps.iter().enumerate() {
            let mut items: Vec<Item<'a>> = Vec::new();
            for ctx in &current {
                for parent in Self::step_contexts(step.axis, *ctx) {
                    let mut matched = Self::apply_step(&step.test, parent, namespace);
                    for predicate in &step.predicates {
                        matched = Self::filter(matched, predicate);
                    }
                    for item in matched {
                        let duplicate = match &item {
                            Item::Element(el) => items
                                .iter()
                                .any(|seen| matches!(seen, Item::Element(s) if std::ptr::eq(*s, *el))),
                            _ => false,
                        };
                        if !duplicate {
                            items.push(item);
                        }
                    }
                }
            }
            if step.axis == Axis::Descendant || current.len() > 1 {
                Self::sort_document_order(root, &mut items);
            }

            if i == last {
                return items;
            }
            current = items
                .into_iter()
                .filter_map(|item| match item {
                    Item::Element(el) => Some(Context::Element(el)),
                    _ => None,
                })
                .collect();
        }
        Vec::new()
    }

    /// Nodes a step is applied to: the context itself, or for `//` the
    /// context and all of its descendants.
    fn step_contexts<'a>(axis: Axis, ctx: Context<'a>) -> Vec<Context<'a>> {
        match (axis, ctx) {
            (Axis::Child, ctx) => vec![ctx],
            (Axis::Descendant, Context::Document(root)) => {
                let mut all = vec![root];
                root.collect_descendants(&mut all);
                std::iter::once(ctx)
                    .chain(all.into_iter().map(Context::Element))
                    .collect()
            }
            (Axis::Descendant, Context::Element(el)) => {
                let mut all = vec![el];
                el.collect_descendants(&mut all);
                all.into_iter().map(Context::Element).collect()
            }
        }
    }

    fn sort_document_order(root: &Element, items: &mut [Item<'_>]) {
        if items.len() < 2 || !items.iter().all(|item| matches!(item, Item::Element(_))) {
            return;
        }
        let mut all = vec![root];
        root.collect_descendants(&mut all);
        let position: HashMap<*const Element, usize> = all
            .into_iter()
            .enumerate()
            .map(|(i, el)| (el as *const Element, i))
            .collect();
        items.sort_by_key(|item| match item {
            Item::Element(el) => position.get(&(*el as *const Element)).copied(),
            _ => None,
        });
    }

    fn children<'a>(ctx: Context<'a>) -> Vec<&'a Element> {
        match ctx {
            Context::Document(root) => vec![root],
            Context::Element(el) => el.children().collect(),
        }
    }

    fn apply_step<'a>(test: &NodeTest, ctx: Context<'a>, namespace: Option<&str>) -> Vec<Item<'a>> {
        match test {
            NodeTest::SelfNode => match ctx {
                Context::Element(el) => vec![Item::Element(el)],
                Context::Document(_) => Vec::new(),
            },
            NodeTest::Attribute(name) => match ctx {
                Context::Element(el) => el.attribute(name).map(Item::Attribute).into_iter().collect(),
                Context::Document(_) => Vec::new(),
            },
            NodeTest::Text => match ctx {
                Context::Element(el) => el.own_text().map(Item::Text).into_iter().collect(),
                Context::Document(_) => Vec::new(),
            },
            NodeTest::AnyElement => Self::children(ctx).into_iter().map(Item::Element).collect(),
            NodeTest::Name(local) => Self::children(ctx)
                .into_iter()
                .filter(|el| el.local_name() == local.as_str() && el.namespace() == namespace)
                .map(Item::Element)
                .collect(),
        }
    }

    fn filter<'a>(items: Vec<Item<'a>>, predicate: &Predicate) -> Vec<Item<'a>> {
        match predicate {
            Predicate::Position(n) => items.into_iter().nth(n - 1).into_iter().collect(),
            Predicate::AttributeEquals(name, value) => items
                .into_iter()
                .filter(|item| match item {
                    Item::Element(el) => el.attribute(name) == Some(value.as_str()),
                    _ => false,
                })
                .collect(),
        }
    }
}
