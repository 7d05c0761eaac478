//! Atoms: immutable, content-addressed hypergraph vertices and edges.
//!
//! An [`Atom`] is either a node (a named leaf) or a link (an ordered
//! outgoing set of child atoms). Identity is by content: two atoms with the
//! same type and content hash alike and compare equal no matter when they
//! were built or whether a space has admitted them.
//!
//! - [`link`]: canonical form, equality, ordering, hashing, rendering of links
//! - [`node`]: the same for nodes
//! - [`value`]: truth/attention values and the value-map payloads
//!
//! Type, content and hash are fixed at construction. The identity, owning
//! space, truth value, attention value and value map are interior-mutable
//! metadata that never take part in equality, ordering or hashing.

pub mod link;
pub mod node;
pub mod value;

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::DashMap;

use crate::ident::{AtomId, SpaceId};
use crate::types::{AtomType, TypeOracle};

pub use value::{AttentionValue, TruthValue, Value};

/// Shared reference to an atom.
pub type Handle = Arc<Atom>;

/// Fixed-width content hash.
pub type ContentHash = u64;

/// Sentinel meaning "no hash computed"; never produced for a live atom.
pub const INVALID_HASH: ContentHash = u64::MAX;

/// Most-significant bit: set for links, clear for nodes.
pub const LINK_HASH_BIT: ContentHash = 1 << (ContentHash::BITS - 1);

/// Seed of the djb accumulator.
pub(crate) const HASH_SEED: ContentHash = 5381;

/// One djb step: `acc + (acc << 5) + value`, wrapping.
#[inline]
pub(crate) fn djb_fold(acc: ContentHash, value: ContentHash) -> ContentHash {
    acc.wrapping_add(acc << 5).wrapping_add(value)
}

/// Backslash-escape `"` and `\` in a node name.
pub(crate) fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Structural content of an atom.
#[derive(Debug)]
pub enum Content {
    Node(String),
    Link(Vec<Handle>),
}

/// A hypergraph atom. See the module docs.
pub struct Atom {
    ty: AtomType,
    content: Content,
    /// Cached from the type oracle at construction.
    unordered: bool,
    hash: ContentHash,
    /// Raw [`AtomId`], 0 while unassigned.
    id: AtomicU64,
    /// Raw [`SpaceId`] of the owning space, 0 while detached.
    space: AtomicU64,
    truth: RwLock<TruthValue>,
    attention: RwLock<AttentionValue>,
    values: DashMap<Handle, Value>,
}

impl Atom {
    fn from_parts(ty: AtomType, content: Content, unordered: bool, hash: ContentHash) -> Self {
        Self {
            ty,
            content,
            unordered,
            hash,
            id: AtomicU64::new(0),
            space: AtomicU64::new(0),
            truth: RwLock::new(TruthValue::DEFAULT),
            attention: RwLock::new(AttentionValue::default()),
            values: DashMap::new(),
        }
    }

    /// Type tag.
    pub fn atom_type(&self) -> AtomType {
        self.ty
    }

    /// Name or outgoing set.
    pub fn content(&self) -> &Content {
        &self.content
    }

    /// Cached content hash.
    pub fn content_hash(&self) -> ContentHash {
        self.hash
    }

    /// Whether this atom is a named leaf.
    pub fn is_node(&self) -> bool {
        matches!(self.content, Content::Node(_))
    }

    /// Whether this atom has an outgoing set.
    pub fn is_link(&self) -> bool {
        matches!(self.content, Content::Link(_))
    }

    /// Whether this link was built from an unordered link type.
    pub fn is_unordered(&self) -> bool {
        self.unordered
    }

    /// Node name, `None` for links.
    pub fn name(&self) -> Option<&str> {
        match &self.content {
            Content::Node(name) => Some(name),
            Content::Link(_) => None,
        }
    }

    /// Outgoing set; empty for nodes.
    pub fn outgoing(&self) -> &[Handle] {
        match &self.content {
            Content::Node(_) => &[],
            Content::Link(outgoing) => outgoing,
        }
    }

    /// Number of children; 0 for nodes.
    pub fn arity(&self) -> usize {
        self.outgoing().len()
    }

    /// Identity assigned by the owning space, if admitted.
    pub fn id(&self) -> Option<AtomId> {
        AtomId::new(self.id.load(Ordering::Acquire))
    }

    /// Owning space, if attached.
    pub fn space_id(&self) -> Option<SpaceId> {
        SpaceId::new(self.space.load(Ordering::Acquire))
    }

    pub(crate) fn attach(&self, id: AtomId, space: SpaceId) {
        self.space.store(space.get(), Ordering::Release);
        self.id.store(id.get(), Ordering::Release);
    }

    /// Drop the owner back-reference. The identity is kept so that handles
    /// still held elsewhere keep rendering the same.
    pub(crate) fn detach(&self) {
        self.space.store(0, Ordering::Release);
    }

    /// Current truth value.
    pub fn truth_value(&self) -> TruthValue {
        *self.truth.read().expect("truth value lock poisoned")
    }

    pub(crate) fn set_truth_value(&self, tv: TruthValue) {
        *self.truth.write().expect("truth value lock poisoned") = tv;
    }

    /// Current attention value.
    pub fn attention_value(&self) -> AttentionValue {
        *self.attention.read().expect("attention value lock poisoned")
    }

    pub(crate) fn set_attention_value(&self, av: AttentionValue) {
        *self.attention.write().expect("attention value lock poisoned") = av;
    }

    /// Value stored under `key`.
    pub fn value(&self, key: &Handle) -> Option<Value> {
        self.values.get(key).map(|v| v.value().clone())
    }

    /// Store or (with `None`) remove the value under `key`.
    pub(crate) fn set_value(&self, key: Handle, value: Option<Value>) {
        match value {
            Some(v) => {
                self.values.insert(key, v);
            }
            None => {
                self.values.remove(&key);
            }
        }
    }

    /// Keys of the value map in atom order.
    pub fn keys(&self) -> Vec<Handle> {
        let mut keys: Vec<Handle> = self.values.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Copy truth value, attention value and value map from `other`.
    pub(crate) fn copy_metadata(&self, other: &Atom) {
        self.set_truth_value(other.truth_value());
        self.set_attention_value(other.attention_value());
        for entry in other.values.iter() {
            self.values.insert(entry.key().clone(), entry.value().clone());
        }
    }

    /// Strict "sorts before".
    pub fn less_than(&self, other: &Atom) -> bool {
        self.cmp(other) == CmpOrdering::Less
    }

    /// Compact identifier used in diagnostics: `[hash][space]`.
    pub fn id_string(&self) -> String {
        match self.space_id() {
            Some(space) => format!("[{}][{}]", self.hash, space),
            None => format!("[{}][-1]", self.hash),
        }
    }

    /// Short rendering: children recursively, truth value only when
    /// non-default.
    pub fn to_short_string(&self, types: &dyn TypeOracle, indent: &str) -> String {
        match &self.content {
            Content::Node(_) => node::render(self, types, indent, false),
            Content::Link(_) => link::render(self, types, indent, false),
        }
    }

    /// Full rendering: like the short form, plus non-default attention values.
    pub fn to_full_string(&self, types: &dyn TypeOracle, indent: &str) -> String {
        match &self.content {
            Content::Node(_) => node::render(self, types, indent, true),
            Content::Link(_) => link::render(self, types, indent, true),
        }
    }

    /// Trailer shared by every rendered atom: `; [id][space]`.
    pub(crate) fn render_trailer(&self, full: bool) -> String {
        let id = self
            .id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "undefined".to_owned());
        let space = match (self.space_id(), full) {
            (Some(space), _) => space.to_string(),
            (None, false) => "NULL".to_owned(),
            (None, true) => "-1".to_owned(),
        };
        format!("; [{id}][{space}]")
    }

    /// Header annotations shared by nodes and links: ` (av ...)` and ` (stv ...)`.
    pub(crate) fn render_annotations(&self, full: bool) -> String {
        let mut out = String::new();
        let av = self.attention_value();
        if full && !av.is_default() {
            out.push(' ');
            out.push_str(&av.to_string());
        }
        let tv = self.truth_value();
        if !tv.is_default() {
            out.push(' ');
            out.push_str(&tv.to_string());
        }
        out
    }
}

impl std::fmt::Debug for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("Atom");
        s.field("ty", &self.ty);
        match &self.content {
            Content::Node(name) => s.field("name", name),
            Content::Link(outgoing) => s.field("outgoing", outgoing),
        };
        s.field("hash", &format_args!("{:#018x}", self.hash))
            .field("id", &self.id())
            .finish()
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.hash != other.hash || self.ty != other.ty {
            return false;
        }
        match (&self.content, &other.content) {
            (Content::Node(a), Content::Node(b)) => a == b,
            (Content::Link(_), Content::Link(_)) => link::outgoing_equal(self, other),
            _ => false,
        }
    }
}

impl Eq for Atom {}

impl std::hash::Hash for Atom {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl Ord for Atom {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        if std::ptr::eq(self, other) {
            return CmpOrdering::Equal;
        }
        self.ty.cmp(&other.ty).then_with(|| match (&self.content, &other.content) {
            (Content::Node(a), Content::Node(b)) => a.cmp(b),
            (Content::Link(_), Content::Link(_)) => link::cmp_same_type(self, other),
            (Content::Node(_), Content::Link(_)) => CmpOrdering::Less,
            (Content::Link(_), Content::Node(_)) => CmpOrdering::Greater,
        })
    }
}

impl PartialOrd for Atom {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}
