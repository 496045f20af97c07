use core::fmt;

/// A value produced by a matcher.
///
/// Literals and character matchers produce text. Transforms may turn a
/// sequence of values into anything else representable here, typically a
/// named node (an AST fragment) or an integer.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Value {
    /// Matched (or synthesized) text.
    Text(String),
    /// An integer, usually computed by a transform.
    Int(i64),
    /// A named node with child values.
    Node {
        /// The node's name.
        name: String,
        /// The node's children, in order.
        children: Vec<Value>,
    },
}

impl Value {
    /// Create a text value.
    pub fn text<T: Into<String>>(text: T) -> Value {
        Value::Text(text.into())
    }

    /// Create a node value.
    pub fn node<N: Into<String>>(name: N, children: Vec<Value>) -> Value {
        Value::Node { name: name.into(), children }
    }

    /// If this is a text value, return its text.
    pub fn as_text(&self) -> Option<&str> {
        match *self {
            Value::Text(ref text) => Some(text),
            _ => None,
        }
    }

    /// If this is an integer value, return it.
    pub fn as_int(&self) -> Option<i64> {
        match *self {
            Value::Int(n) => Some(n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Value::Text(ref text) => write!(f, "{:?}", text),
            Value::Int(n) => write!(f, "{}", n),
            Value::Node { ref name, ref children } => {
                write!(f, "{}(", name)?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// One alternative produced by invoking a matcher: the values it produced
/// and the stream left over after what it consumed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Match<S> {
    /// The values produced, in order.
    pub values: Vec<Value>,
    /// The stream following the consumed input.
    pub rest: S,
}

impl<S> Match<S> {
    /// Create a new match result.
    pub fn new(values: Vec<Value>, rest: S) -> Match<S> {
        Match { values, rest }
    }

    /// Returns the values concatenated as text, skipping non-text values.
    pub fn text(&self) -> String {
        self.values.iter().filter_map(Value::as_text).collect()
    }
}
