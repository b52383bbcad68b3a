//! Cheap, comparable names for attributes, roles and representations.
//!
//! A [`Token`] is either a `&'static str` (so well-known names can be
//! `const`) or a shared `Arc<str>` for names that arrive at runtime from a
//! scene delegate. Equality and hashing only look at the string content, so a
//! static token and a runtime token with the same text are interchangeable.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An immutable, cheaply clonable name.
#[derive(Clone)]
pub struct Token(Repr);

#[derive(Clone)]
enum Repr {
    Static(&'static str),
    Shared(Arc<str>),
}

impl Token {
    /// The empty token.
    pub const EMPTY: Self = Self::from_static("");

    /// Create a token from a string known at compile time.
    pub const fn from_static(s: &'static str) -> Self {
        Self(Repr::Static(s))
    }

    /// Create a token from a runtime string.
    pub fn new(s: &str) -> Self {
        Self(Repr::Shared(Arc::from(s)))
    }

    /// The token text.
    pub fn as_str(&self) -> &str {
        match &self.0 {
            Repr::Static(s) => s,
            Repr::Shared(s) => s,
        }
    }

    /// Whether this is the empty token.
    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }
}

impl Default for Token {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Token {}

impl PartialEq<str> for Token {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Token {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self(Repr::Shared(Arc::from(s)))
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?})", self.as_str())
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Well-known tokens shared by delegates, drivers and the resource registry.
pub mod tokens {
    use super::Token;

    // Primvar names with dedicated dirty bits or computations.
    pub const POINTS: Token = Token::from_static("points");
    pub const NORMALS: Token = Token::from_static("normals");
    pub const WIDTHS: Token = Token::from_static("widths");
    pub const TRANSFORM: Token = Token::from_static("transform");
    pub const EXTENT: Token = Token::from_static("extent");
    pub const PRIM_ID: Token = Token::from_static("primId");

    // Index buffers.
    pub const INDICES: Token = Token::from_static("indices");
    pub const HULL_INDICES: Token = Token::from_static("hullIndices");

    // Buffer array range roles.
    pub const TOPOLOGY: Token = Token::from_static("topology");
    pub const PRIMVAR: Token = Token::from_static("primvar");
    pub const CONSTANT_PRIMVAR: Token = Token::from_static("constantPrimvar");
    pub const INSTANCE_PRIMVAR: Token = Token::from_static("instancePrimvar");

    // Repr names.
    pub const HULL: Token = Token::from_static("hull");
    pub const SMOOTH_HULL: Token = Token::from_static("smoothHull");
    pub const REFINED: Token = Token::from_static("refined");
    pub const WIRE: Token = Token::from_static("wire");
}
