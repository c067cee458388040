//! Parsing of `uses:` reference strings.
//!
//! A workflow step or job points at external content through a reference:
//!
//! | Form                                         | Kind                                   |
//! |----------------------------------------------|----------------------------------------|
//! | `actions/checkout@v4`                        | [`ReferenceKind::Action`]              |
//! | `github/codeql-action/init@v3`               | [`ReferenceKind::Action`] with subpath |
//! | `org/repo/.github/workflows/ci.yml@main`     | [`ReferenceKind::ReusableWorkflow`]    |
//! | `./.github/actions/build`                    | [`ReferenceKind::LocalPath`]           |
//! | anything else (`docker://alpine`, `oops`)    | [`ReferenceKind::Unparsable`]          |
//!
//! [`Reference::parse`] never fails: malformed input yields an
//! [`Unparsable`](ReferenceKind::Unparsable) descriptor that the resolver
//! skips forever. Local references never produce a network location.
//!
//! # Examples
//!
//! ```rust
//! use wflens::reference::{Reference, ReferenceKind};
//!
//! let reference = Reference::parse("actions/checkout@v4");
//! assert_eq!(reference.kind(), ReferenceKind::Action);
//! assert_eq!(reference.slug(), "actions/checkout");
//! assert_eq!(
//!     reference.download_location(),
//!     Some("https://raw.githubusercontent.com/actions/checkout/v4/action.yml")
//! );
//! ```

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::constants::{ACTION_MANIFESTS, CONTROL_DIR, GITHUB_HOST, RAW_CONTENT_HOST, WORKFLOWS_DIR};

/// What a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// A composite, JavaScript or Docker action with an `action.yml`
    Action,
    /// A workflow file invoked through `workflow_call`
    ReusableWorkflow,
    /// An action or workflow inside the current repository
    LocalPath,
    /// A string that could not be understood; never resolved
    Unparsable,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Action => "action",
            Self::ReusableWorkflow => "reusable workflow",
            Self::LocalPath => "local",
            Self::Unparsable => "unparsable",
        };
        f.write_str(label)
    }
}

/// Immutable descriptor derived from one reference string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Reference {
    raw: String,
    kind: ReferenceKind,
    slug: String,
    #[serde(rename = "ref")]
    git_ref: String,
    subpath: String,
    name: String,
    is_local: bool,
    is_workflow: bool,
    download_location: Option<String>,
}

impl Reference {
    /// Parse a reference string. Never fails; see the module docs.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim();
        if is_local_path(text) {
            return Self::local(raw, text);
        }

        let Some(at) = text.find('@') else {
            return Self::unparsable(raw);
        };
        let Some(first_slash) = text.find('/') else {
            return Self::unparsable(raw);
        };
        if at < first_slash {
            return Self::unparsable(raw);
        }
        let second_slash = text[first_slash + 1..at].find('/').map(|i| first_slash + 1 + i);

        let git_ref = &text[at + 1..];
        let slug = &text[..second_slash.unwrap_or(at)];
        let owner = &text[..first_slash];
        let repository = &text[first_slash + 1..second_slash.unwrap_or(at)];
        if git_ref.is_empty() || owner.is_empty() || repository.is_empty() || git_ref.contains('@') {
            return Self::unparsable(raw);
        }

        if is_workflow_path(text) {
            let path = &text[..at];
            let name = path.rsplit('/').next().unwrap_or_default();
            if name.is_empty() {
                return Self::unparsable(raw);
            }
            return Self {
                raw: raw.to_string(),
                kind: ReferenceKind::ReusableWorkflow,
                slug: slug.to_string(),
                git_ref: git_ref.to_string(),
                subpath: String::new(),
                name: name.to_string(),
                is_local: false,
                is_workflow: true,
                download_location: Some(format!(
                    "{RAW_CONTENT_HOST}/{slug}/{git_ref}/{WORKFLOWS_DIR}/{name}"
                )),
            };
        }

        let subpath = second_slash
            .map(|second| format!("/{}", text[second + 1..at].trim_end_matches('/')))
            .filter(|s| s.len() > 1)
            .unwrap_or_default();
        Self {
            raw: raw.to_string(),
            kind: ReferenceKind::Action,
            slug: slug.to_string(),
            git_ref: git_ref.to_string(),
            download_location: Some(format!(
                "{RAW_CONTENT_HOST}/{slug}/{git_ref}{subpath}/{}",
                ACTION_MANIFESTS[0]
            )),
            subpath,
            name: repository.to_string(),
            is_local: false,
            is_workflow: false,
        }
    }

    fn local(raw: &str, text: &str) -> Self {
        let path = text.split('@').next().unwrap_or(text).trim_end_matches('/');
        let name = path.rsplit('/').next().unwrap_or_default();
        Self {
            raw: raw.to_string(),
            kind: ReferenceKind::LocalPath,
            slug: String::new(),
            git_ref: String::new(),
            subpath: String::new(),
            name: name.to_string(),
            is_local: true,
            is_workflow: is_workflow_path(text),
            download_location: Some(text.to_string()),
        }
    }

    fn unparsable(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            kind: ReferenceKind::Unparsable,
            slug: String::new(),
            git_ref: String::new(),
            subpath: String::new(),
            name: String::new(),
            is_local: false,
            is_workflow: false,
            download_location: None,
        }
    }

    /// The string exactly as given to [`Reference::parse`].
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub const fn kind(&self) -> ReferenceKind {
        self.kind
    }

    /// `owner/repo`, empty for local and unparsable references.
    #[must_use]
    pub fn slug(&self) -> &str {
        &self.slug
    }

    /// The tag, branch or commit after `@`.
    #[must_use]
    pub fn git_ref(&self) -> &str {
        &self.git_ref
    }

    /// Path of an action inside its repository, `/`-prefixed, or empty.
    #[must_use]
    pub fn subpath(&self) -> &str {
        &self.subpath
    }

    /// Repository name for actions, file name for workflows, last path
    /// segment for local references.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn is_local(&self) -> bool {
        self.is_local
    }

    /// Whether the reference names a workflow file rather than an action.
    #[must_use]
    pub const fn is_workflow(&self) -> bool {
        self.is_workflow
    }

    /// Whether the reference can ever be resolved.
    #[must_use]
    pub fn is_resolvable(&self) -> bool {
        self.kind != ReferenceKind::Unparsable
    }

    /// Raw content URL for remote references, the literal path for local ones.
    #[must_use]
    pub fn download_location(&self) -> Option<&str> {
        self.download_location.as_deref()
    }

    /// Raw content URL; `None` unless the reference is remote.
    #[must_use]
    pub fn raw_url(&self) -> Option<&str> {
        if self.is_local {
            None
        } else {
            self.download_location()
        }
    }

    /// URL showing the manifest or workflow file on github.com.
    #[must_use]
    pub fn browse_url(&self) -> Option<String> {
        match self.kind {
            ReferenceKind::Action => Some(format!(
                "{GITHUB_HOST}/{}/blob/{}{}/{}",
                self.slug, self.git_ref, self.subpath, ACTION_MANIFESTS[0]
            )),
            ReferenceKind::ReusableWorkflow => Some(format!(
                "{GITHUB_HOST}/{}/blob/{}/{WORKFLOWS_DIR}/{}",
                self.slug, self.git_ref, self.name
            )),
            ReferenceKind::LocalPath | ReferenceKind::Unparsable => None,
        }
    }

    /// Marketplace listing of a remote action.
    #[must_use]
    pub fn marketplace_url(&self) -> Option<String> {
        (self.kind == ReferenceKind::Action).then(|| format!("{GITHUB_HOST}/marketplace/{}", self.slug))
    }

    /// Repository tree at the referenced ref.
    #[must_use]
    pub fn repository_url(&self) -> Option<String> {
        matches!(self.kind, ReferenceKind::Action | ReferenceKind::ReusableWorkflow)
            .then(|| format!("{GITHUB_HOST}/{}/tree/{}", self.slug, self.git_ref))
    }

    /// Composite identity `{name}{subpath}_{ref}` with path separators
    /// flattened. Not unique across owners; see [`content_key`](Self::content_key).
    ///
    /// Local and unparsable references use their flattened path instead.
    #[must_use]
    pub fn cache_id(&self) -> String {
        let id = match self.kind {
            ReferenceKind::Action | ReferenceKind::ReusableWorkflow => {
                format!("{}{}_{}", self.name, self.subpath, self.git_ref)
            }
            ReferenceKind::LocalPath | ReferenceKind::Unparsable => {
                self.raw.trim().trim_start_matches("./").to_string()
            }
        };
        id.chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect()
    }

    /// Stable short hash of the raw reference string.
    ///
    /// Two references with the same [`cache_id`](Self::cache_id) (for example
    /// `a/checkout@v4` and `b/checkout@v4`) still get distinct storage keys.
    #[must_use]
    pub fn storage_key(&self) -> String {
        let digest = Sha256::digest(self.raw.trim().as_bytes());
        hex::encode(&digest[..8])
    }

    /// `{cache_id}-{storage_key}`, unique per raw reference string.
    ///
    /// Keys parsed contexts and names content files.
    #[must_use]
    pub fn content_key(&self) -> String {
        format!("{}-{}", self.cache_id(), self.storage_key())
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn is_local_path(text: &str) -> bool {
    text.starts_with("./") && text.contains(CONTROL_DIR)
}

fn is_workflow_path(text: &str) -> bool {
    text.contains(".yml") || text.contains(".yaml")
}
