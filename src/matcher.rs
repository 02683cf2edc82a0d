//! Hierarchical classification of remote API errors
//!
//! Remote services answer failed calls with a numeric status and a dotted
//! error code such as `InvalidGroup.Duplicate`. An [`ErrorTree`] holds one
//! [`MatcherNode`] per known code, addressed by dotted path:
//!
//! ```text
//! (root)                     status [45]\d\d   code .*
//! └─ client                  status 4\d\d      code .*
//!    └─ InvalidGroup         status 4\d\d      code InvalidGroup[.].*
//!       └─ Duplicate         status 400        code InvalidGroup[.]Duplicate
//! ```
//!
//! The first path segment names a family (`client`, `server`) that fixes the
//! status range; the remaining segments are the error code. Intermediate
//! nodes match every code below them, leaves match exactly one. A leaf that
//! later gains children keeps matching its own code as well.
//!
//! # Example
//!
//! ```
//! use stratus::matcher::{ErrorTree, ServiceError};
//!
//! let mut tree = ErrorTree::standard();
//! tree.register("client.InvalidGroup.Duplicate", Some("400")).unwrap();
//!
//! let err = ServiceError::new(400, "InvalidGroup.Duplicate");
//! let duplicate = tree.get("client.InvalidGroup.Duplicate").unwrap();
//! assert!(duplicate.match_service_error(&err).is_none());
//!
//! // Any InvalidGroup error is a client.InvalidGroup error
//! let any_group = tree.get("client.InvalidGroup").unwrap();
//! assert!(any_group.matches(&ServiceError::new(400, "InvalidGroup.InUse")));
//! ```

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Status pattern of the tree root: any client or server error
pub const ANY_ERROR_STATUS: &str = r"[45]\d\d";

/// Status pattern of the `client` family
pub const CLIENT_ERROR_STATUS: &str = r"4\d\d";

/// Status pattern of the `server` family
pub const SERVER_ERROR_STATUS: &str = r"5\d\d";

const ANY_CODE: &str = ".*";

/// Error returned by a remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceError {
    /// HTTP or API status, e.g. 404
    pub status: u16,
    /// Dotted error code, e.g. `InvalidKeyPair.NotFound`
    pub code: String,
    /// Human-readable message from the response body
    pub message: String,
}

impl ServiceError {
    pub fn new(status: u16, code: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: String::new(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.code)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ServiceError {}

/// Error type for building matcher trees
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("tries to redefine error code {path:?}")]
    DuplicateRegistration { path: String },

    #[error("malformed error code path {0:?}")]
    InvalidCode(String),

    #[error("invalid status pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// One failed predicate of a match attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mismatch {
    /// The observed error is not a [`ServiceError`]
    NotServiceError { observed: String },
    Status { expected: String, observed: u16 },
    Code { expected: String, observed: String },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::NotServiceError { observed } => {
                write!(f, "{:?} is not a service error", observed)
            }
            Mismatch::Status { expected, observed } => write!(
                f,
                "status code ({}) does not match the expected pattern \"{}\"",
                observed, expected
            ),
            Mismatch::Code { expected, observed } => write!(
                f,
                "error code ({}) does not match the expected pattern \"{}\"",
                observed, expected
            ),
        }
    }
}

/// Description of why an error did not match a node
///
/// Returned, not raised: callers that need an assertion turn it into one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchFailure {
    /// Path of the node that was matched against
    pub path: String,
    pub mismatches: Vec<Mismatch>,
}

impl fmt::Display for MatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = if self.path.is_empty() {
            "(root)"
        } else {
            &self.path
        };
        write!(f, "error does not match {}: ", path)?;
        for (i, mismatch) in self.mismatches.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", mismatch)?;
        }
        Ok(())
    }
}

impl std::error::Error for MatchFailure {}

/// Fully anchored regex that remembers its source
#[derive(Debug, Clone)]
struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    fn new(source: impl Into<String>) -> Result<Self, regex::Error> {
        let source = source.into();
        let regex = Regex::new(&format!("^(?:{})$", source))?;
        Ok(Self { source, regex })
    }

    fn status(source: &str) -> Result<Self, RegistrationError> {
        Self::new(source).map_err(|e| RegistrationError::InvalidPattern {
            pattern: source.to_string(),
            source: e,
        })
    }

    /// For the crate's own constant patterns
    fn fixed(source: &str) -> Self {
        Self::new(source).expect("built-in matcher patterns are valid regexes")
    }

    fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// A node of the matcher tree
#[derive(Debug, Clone)]
pub struct MatcherNode {
    path: String,
    /// Escaped code prefix handed down to children, e.g. `InvalidGroup[.]`
    child_prefix: String,
    code: Pattern,
    status: Pattern,
    /// Code pattern is the bare literal and must be widened before gaining children
    exact: bool,
    children: BTreeMap<String, MatcherNode>,
}

impl MatcherNode {
    fn root() -> Self {
        Self {
            path: String::new(),
            child_prefix: String::new(),
            code: Pattern::fixed(ANY_CODE),
            status: Pattern::fixed(ANY_ERROR_STATUS),
            exact: false,
            children: BTreeMap::new(),
        }
    }

    /// Family nodes match any code and contribute nothing to their children's codes
    fn family(&self, name: &str, status: Option<Pattern>) -> Self {
        Self {
            path: self.child_path(name),
            child_prefix: String::new(),
            code: self.code.clone(),
            status: status.unwrap_or_else(|| self.status.clone()),
            exact: false,
            children: BTreeMap::new(),
        }
    }

    fn code_child(
        &self,
        segment: &str,
        leaf: bool,
        status: Option<Pattern>,
    ) -> Result<Self, RegistrationError> {
        let literal = format!("{}{}", self.child_prefix, regex::escape(segment));
        let code = if leaf {
            literal.clone()
        } else {
            format!("{}[.].*", literal)
        };
        let code = Pattern::new(&code).map_err(|e| RegistrationError::InvalidPattern {
            pattern: code.clone(),
            source: e,
        })?;

        Ok(Self {
            path: self.child_path(segment),
            child_prefix: format!("{}[.]", literal),
            code,
            status: status.unwrap_or_else(|| self.status.clone()),
            exact: leaf,
            children: BTreeMap::new(),
        })
    }

    fn child_path(&self, segment: &str) -> String {
        if self.path.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", self.path, segment)
        }
    }

    /// Dotted path from the tree root, empty for the root itself
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Regex source matched against the error code
    pub fn code_pattern(&self) -> &str {
        &self.code.source
    }

    /// Regex source matched against the status
    pub fn status_pattern(&self) -> &str {
        &self.status.source
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child(&self, name: &str) -> Option<&MatcherNode> {
        self.children.get(name)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &MatcherNode)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Walk down by path segments
    pub fn lookup<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Option<&MatcherNode> {
        segments
            .into_iter()
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// Register a dotted error code below this node
    ///
    /// Missing intermediate nodes are created with this node's status
    /// pattern. The leaf gets `status` if given. Registering a code that is
    /// already present fails, whatever its status.
    pub fn register(
        &mut self,
        code: &str,
        status: Option<&str>,
    ) -> Result<&MatcherNode, RegistrationError> {
        let segments = split_path(code)?;
        let status = status.map(Pattern::status).transpose()?;
        let (leaf, parents) = segments
            .split_last()
            .ok_or_else(|| RegistrationError::InvalidCode(code.to_string()))?;

        let mut node = self;
        for segment in parents {
            node = node.intermediate(segment)?;
        }
        node.insert_leaf(leaf, |parent| parent.code_child(leaf, true, status))
    }

    fn intermediate(&mut self, segment: &str) -> Result<&mut MatcherNode, RegistrationError> {
        if !self.children.contains_key(segment) {
            let child = self.code_child(segment, false, None)?;
            self.children.insert(segment.to_string(), child);
        }
        let child = self
            .children
            .get_mut(segment)
            .ok_or_else(|| RegistrationError::InvalidCode(segment.to_string()))?;
        if child.exact {
            child.widen()?;
        }
        Ok(child)
    }

    /// Turn a leaf into a node matching its own code or anything below it
    fn widen(&mut self) -> Result<(), RegistrationError> {
        let widened = format!("{}(?:[.].*)?", self.code.source);
        self.code = Pattern::new(&widened).map_err(|e| RegistrationError::InvalidPattern {
            pattern: widened.clone(),
            source: e,
        })?;
        self.exact = false;
        debug!(path = %self.path, code = %self.code.source, "Widened leaf matcher");
        Ok(())
    }

    fn insert_leaf<B>(&mut self, segment: &str, build: B) -> Result<&MatcherNode, RegistrationError>
    where
        B: FnOnce(&MatcherNode) -> Result<MatcherNode, RegistrationError>,
    {
        if self.children.contains_key(segment) {
            return Err(RegistrationError::DuplicateRegistration {
                path: self.child_path(segment),
            });
        }
        let child = build(self)?;
        debug!(
            path = %child.path,
            code = %child.code.source,
            status = %child.status.source,
            "Registered error matcher"
        );
        Ok(self.children.entry(segment.to_string()).or_insert(child))
    }

    /// Check an arbitrary error against this node
    ///
    /// Anything that is not a [`ServiceError`] fails the type check.
    pub fn match_error(&self, error: &(dyn std::error::Error + 'static)) -> Option<MatchFailure> {
        match error.downcast_ref::<ServiceError>() {
            Some(service_error) => self.match_service_error(service_error),
            None => Some(MatchFailure {
                path: self.path.clone(),
                mismatches: vec![Mismatch::NotServiceError {
                    observed: error.to_string(),
                }],
            }),
        }
    }

    /// Check status and code; `None` means the error matches
    pub fn match_service_error(&self, error: &ServiceError) -> Option<MatchFailure> {
        debug!(status = error.status, code = %error.code, node = %self.path, "Matching service error");

        let mut mismatches = Vec::new();
        if !self.status.is_match(&error.status.to_string()) {
            mismatches.push(Mismatch::Status {
                expected: self.status.source.clone(),
                observed: error.status,
            });
        }
        if !self.code.is_match(&error.code) {
            mismatches.push(Mismatch::Code {
                expected: self.code.source.clone(),
                observed: error.code.clone(),
            });
        }

        if mismatches.is_empty() {
            None
        } else {
            Some(MatchFailure {
                path: self.path.clone(),
                mismatches,
            })
        }
    }

    pub fn matches(&self, error: &ServiceError) -> bool {
        self.match_service_error(error).is_none()
    }
}

fn split_path(path: &str) -> Result<Vec<&str>, RegistrationError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(RegistrationError::InvalidCode(path.to_string()));
    }
    Ok(segments)
}

/// Rooted tree of error matchers for one remote API
#[derive(Debug, Clone)]
pub struct ErrorTree {
    root: MatcherNode,
}

impl Default for ErrorTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorTree {
    /// Empty tree whose root matches any 4xx/5xx error
    pub fn new() -> Self {
        Self {
            root: MatcherNode::root(),
        }
    }

    /// Tree with the `client` (4xx) and `server` (5xx) families
    pub fn standard() -> Self {
        let mut tree = Self::new();
        for (name, status) in [("client", CLIENT_ERROR_STATUS), ("server", SERVER_ERROR_STATUS)] {
            let family = tree.root.family(name, Some(Pattern::fixed(status)));
            tree.root.children.insert(name.to_string(), family);
        }
        tree
    }

    pub fn root(&self) -> &MatcherNode {
        &self.root
    }

    /// Register `family.Code.SubCode`
    ///
    /// The family is created with the root's status range if it does not
    /// exist yet. A single-segment path registers the family itself.
    pub fn register(
        &mut self,
        path: &str,
        status: Option<&str>,
    ) -> Result<&MatcherNode, RegistrationError> {
        let segments = split_path(path)?;
        let status = status.map(Pattern::status).transpose()?;

        match segments.as_slice() {
            [family] => self
                .root
                .insert_leaf(family, |root| Ok(root.family(family, status))),
            [family, ..] => {
                if !self.root.children.contains_key(*family) {
                    let node = self.root.family(family, None);
                    self.root.children.insert(family.to_string(), node);
                }
                let code = &path[family.len() + 1..];
                match self.root.children.get_mut(*family) {
                    Some(node) => {
                        node.register(code, status.as_ref().map(|p| p.source.as_str()))
                    }
                    None => Err(RegistrationError::InvalidCode(path.to_string())),
                }
            }
            [] => Err(RegistrationError::InvalidCode(path.to_string())),
        }
    }

    /// Register several codes below one family
    pub fn register_all<'a>(
        &mut self,
        family: &str,
        codes: impl IntoIterator<Item = (&'a str, Option<&'a str>)>,
    ) -> Result<(), RegistrationError> {
        for (code, status) in codes {
            self.register(&format!("{}.{}", family, code), status)?;
        }
        Ok(())
    }

    /// Look up a node by dotted path; the empty path is the root
    pub fn get(&self, path: &str) -> Option<&MatcherNode> {
        if path.is_empty() {
            return Some(&self.root);
        }
        self.root.lookup(path.split('.'))
    }
}
