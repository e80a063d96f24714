//! Key templates: how call-site arguments become a cache key string

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::KeyArgsError;
use crate::params::Params;

static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}")
        .expect("PLACEHOLDER_REGEX should compile - this is a bug")
});

/// Signature of a hand-written key function
pub type KeyFn = dyn Fn(&Params) -> Result<String, KeyArgsError> + Send + Sync;

/// Parsed piece of a `{placeholder}` template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Placeholder(String),
}

/// Rule turning [`Params`] into a key string
///
/// Rendering is pure: the same arguments always give the same key.
#[derive(Clone)]
pub enum KeyTemplate {
    /// A constant key that takes no arguments
    Fixed(String),
    /// A `{placeholder}` pattern such as `"session:{phone}"`
    ///
    /// `reserved` holds the punctuation used by the literal segments.
    /// Argument values have those characters (and `%`) percent-escaped, so
    /// placeholders separated by punctuation render injectively. Values
    /// around alphanumeric separators (`"{a}x{b}"`) can still collide.
    Template { source: String, segments: Vec<Segment>, reserved: Vec<char> },
    /// Arbitrary key function for keys a template cannot express
    Custom(Arc<KeyFn>),
}

impl KeyTemplate {
    pub fn fixed(key: impl Into<String>) -> Self {
        Self::Fixed(key.into())
    }

    /// Parse a `{placeholder}` template
    ///
    /// Placeholder names follow identifier rules; braces that do not enclose
    /// an identifier are kept literally.
    pub fn template(source: impl Into<String>) -> Self {
        let source = source.into();
        let mut segments = Vec::new();
        let mut cursor = 0;

        for captures in PLACEHOLDER_REGEX.captures_iter(&source) {
            let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            if whole.start() > cursor {
                segments.push(Segment::Literal(source[cursor..whole.start()].to_string()));
            }
            segments.push(Segment::Placeholder(name.as_str().to_string()));
            cursor = whole.end();
        }
        if cursor < source.len() {
            segments.push(Segment::Literal(source[cursor..].to_string()));
        }

        let mut reserved = vec!['%'];
        for segment in &segments {
            if let Segment::Literal(text) = segment {
                for ch in text.chars().filter(|ch| !ch.is_alphanumeric()) {
                    if !reserved.contains(&ch) {
                        reserved.push(ch);
                    }
                }
            }
        }

        Self::Template { source, segments, reserved }
    }

    pub fn custom<F>(render: F) -> Self
    where
        F: Fn(&Params) -> Result<String, KeyArgsError> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(render))
    }

    /// Placeholder names in order of appearance (empty for fixed and custom
    /// keys)
    pub fn placeholders(&self) -> Vec<&str> {
        match self {
            Self::Template { segments, .. } => segments
                .iter()
                .filter_map(|segment| match segment {
                    Segment::Placeholder(name) => Some(name.as_str()),
                    Segment::Literal(_) => None,
                })
                .collect(),
            Self::Fixed(_) | Self::Custom(_) => Vec::new(),
        }
    }

    /// Render the key for `args`
    ///
    /// # Errors
    /// - [`KeyArgsError::Missing`] when a placeholder has no argument
    /// - [`KeyArgsError::Unexpected`] when an argument is not used by the key
    /// - whatever a custom key function reports
    /// - [`KeyArgsError::EmptyKey`] when the result is empty
    pub fn render(&self, args: &Params) -> Result<String, KeyArgsError> {
        let key = match self {
            Self::Fixed(key) => {
                args.only(&[])?;
                key.clone()
            }
            Self::Template { segments, reserved, .. } => {
                args.only(&self.placeholders())?;
                let mut key = String::new();
                for segment in segments {
                    match segment {
                        Segment::Literal(text) => key.push_str(text),
                        Segment::Placeholder(name) => {
                            push_escaped(&mut key, &args.value(name)?.to_string(), reserved);
                        }
                    }
                }
                key
            }
            Self::Custom(render) => render(args)?,
        };

        if key.is_empty() {
            return Err(KeyArgsError::EmptyKey);
        }
        Ok(key)
    }
}

fn push_escaped(key: &mut String, value: &str, reserved: &[char]) {
    for ch in value.chars() {
        if reserved.contains(&ch) {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).bytes() {
                key.push_str(&format!("%{byte:02X}"));
            }
        } else {
            key.push(ch);
        }
    }
}

impl fmt::Debug for KeyTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(key) => f.debug_tuple("Fixed").field(key).finish(),
            Self::Template { source, .. } => f.debug_tuple("Template").field(source).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
