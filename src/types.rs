//! Atom type tags and the type hierarchy.
//!
//! The structural core never hard-codes "is this a link?" checks; it asks a
//! [`TypeOracle`]. [`TypeRegistry`] is the in-process oracle: a fixed builtin
//! hierarchy (see [`builtin`]) that callers can extend with their own types.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AtomError, AtomResult};

/// Numeric tag naming an atom type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct AtomType(u16);

impl AtomType {
    /// Wrap a raw tag.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Get the underlying tag.
    pub const fn get(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for AtomType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "type:{}", self.0)
    }
}

/// Capability interface answering type classification queries.
///
/// Injected into link construction, pattern-term building and the command
/// interpreter. Implementations must be consistent: `is_a` is reflexive and
/// transitive, and `type_by_name(type_name(t)) == Some(t)`.
pub trait TypeOracle: Send + Sync {
    /// Whether `candidate` is `ancestor` or one of its (transitive) subtypes.
    fn is_a(&self, candidate: AtomType, ancestor: AtomType) -> bool;

    /// Full name of a type, e.g. `ConceptNode`.
    fn type_name(&self, ty: AtomType) -> Option<&str>;

    /// Resolve a full (`ConceptNode`) or short (`Concept`) type name.
    fn type_by_name(&self, name: &str) -> Option<AtomType>;

    fn is_node(&self, ty: AtomType) -> bool {
        self.is_a(ty, builtin::NODE)
    }

    fn is_link(&self, ty: AtomType) -> bool {
        self.is_a(ty, builtin::LINK)
    }

    fn is_unordered(&self, ty: AtomType) -> bool {
        self.is_a(ty, builtin::UNORDERED_LINK)
    }

    /// Full name, falling back to `type:<tag>` for unregistered tags.
    fn name_of(&self, ty: AtomType) -> String {
        self.type_name(ty)
            .map(str::to_owned)
            .unwrap_or_else(|| ty.to_string())
    }

    /// Wire name: the full name with a trailing `Node`/`Link` dropped.
    fn short_name(&self, ty: AtomType) -> String {
        short_form(&self.name_of(ty)).to_owned()
    }
}

/// Strip a `Node` or `Link` suffix, keeping bare `Node`/`Link` intact.
fn short_form(name: &str) -> &str {
    for suffix in ["Node", "Link"] {
        if let Some(stem) = name.strip_suffix(suffix) {
            if !stem.is_empty() {
                return stem;
            }
        }
    }
    name
}

/// Builtin type tags.
///
/// Tags below 256 are reserved for these; [`TypeRegistry::add_type`]
/// allocates from 256 upward.
pub mod builtin {
    use super::AtomType;

    pub const ATOM: AtomType = AtomType::new(1);
    pub const NODE: AtomType = AtomType::new(2);
    pub const LINK: AtomType = AtomType::new(3);

    pub const CONCEPT_NODE: AtomType = AtomType::new(10);
    pub const PREDICATE_NODE: AtomType = AtomType::new(11);
    pub const VARIABLE_NODE: AtomType = AtomType::new(12);
    pub const GLOB_NODE: AtomType = AtomType::new(13);
    pub const NUMBER_NODE: AtomType = AtomType::new(14);
    pub const SCHEMA_NODE: AtomType = AtomType::new(15);
    pub const GROUNDED_PREDICATE_NODE: AtomType = AtomType::new(16);
    pub const TYPE_NODE: AtomType = AtomType::new(17);
    pub const ANCHOR_NODE: AtomType = AtomType::new(18);

    pub const ORDERED_LINK: AtomType = AtomType::new(30);
    pub const UNORDERED_LINK: AtomType = AtomType::new(31);
    pub const EVALUATABLE_LINK: AtomType = AtomType::new(32);

    pub const LIST_LINK: AtomType = AtomType::new(40);
    pub const EVALUATION_LINK: AtomType = AtomType::new(41);
    pub const INHERITANCE_LINK: AtomType = AtomType::new(42);
    pub const MEMBER_LINK: AtomType = AtomType::new(43);
    pub const EXECUTION_LINK: AtomType = AtomType::new(44);
    pub const EXECUTION_OUTPUT_LINK: AtomType = AtomType::new(45);
    pub const VARIABLE_LIST: AtomType = AtomType::new(46);
    pub const TYPED_VARIABLE_LINK: AtomType = AtomType::new(47);
    pub const GREATER_THAN_LINK: AtomType = AtomType::new(48);

    pub const SET_LINK: AtomType = AtomType::new(60);
    pub const AND_LINK: AtomType = AtomType::new(61);
    pub const OR_LINK: AtomType = AtomType::new(62);
    pub const SIMILARITY_LINK: AtomType = AtomType::new(63);
    pub const PRESENT_LINK: AtomType = AtomType::new(64);
    pub const EQUAL_LINK: AtomType = AtomType::new(65);

    pub const NOT_LINK: AtomType = AtomType::new(70);
    pub const ABSENT_LINK: AtomType = AtomType::new(71);

    pub const QUOTE_LINK: AtomType = AtomType::new(80);
    pub const UNQUOTE_LINK: AtomType = AtomType::new(81);
    pub const LOCAL_QUOTE_LINK: AtomType = AtomType::new(82);

    pub const PATTERN_LINK: AtomType = AtomType::new(90);
    pub const GET_LINK: AtomType = AtomType::new(91);
    pub const BIND_LINK: AtomType = AtomType::new(92);
    pub const MEET_LINK: AtomType = AtomType::new(93);
    pub const QUERY_LINK: AtomType = AtomType::new(94);
    pub const DUAL_LINK: AtomType = AtomType::new(95);

    pub const JOIN_LINK: AtomType = AtomType::new(100);
    pub const MAXIMAL_JOIN_LINK: AtomType = AtomType::new(101);

    /// `(tag, full name, parents)` for every builtin type.
    pub(super) const TABLE: &[(AtomType, &str, &[AtomType])] = &[
        (ATOM, "Atom", &[]),
        (NODE, "Node", &[ATOM]),
        (LINK, "Link", &[ATOM]),
        (CONCEPT_NODE, "ConceptNode", &[NODE]),
        (PREDICATE_NODE, "PredicateNode", &[NODE]),
        (VARIABLE_NODE, "VariableNode", &[NODE]),
        (GLOB_NODE, "GlobNode", &[NODE]),
        (NUMBER_NODE, "NumberNode", &[NODE]),
        (SCHEMA_NODE, "SchemaNode", &[NODE]),
        (GROUNDED_PREDICATE_NODE, "GroundedPredicateNode", &[NODE]),
        (TYPE_NODE, "TypeNode", &[NODE]),
        (ANCHOR_NODE, "AnchorNode", &[NODE]),
        (ORDERED_LINK, "OrderedLink", &[LINK]),
        (UNORDERED_LINK, "UnorderedLink", &[LINK]),
        (EVALUATABLE_LINK, "EvaluatableLink", &[LINK]),
        (LIST_LINK, "ListLink", &[ORDERED_LINK]),
        (EVALUATION_LINK, "EvaluationLink", &[ORDERED_LINK, EVALUATABLE_LINK]),
        (INHERITANCE_LINK, "InheritanceLink", &[ORDERED_LINK]),
        (MEMBER_LINK, "MemberLink", &[ORDERED_LINK]),
        (EXECUTION_LINK, "ExecutionLink", &[ORDERED_LINK]),
        (EXECUTION_OUTPUT_LINK, "ExecutionOutputLink", &[ORDERED_LINK]),
        (VARIABLE_LIST, "VariableList", &[ORDERED_LINK]),
        (TYPED_VARIABLE_LINK, "TypedVariableLink", &[ORDERED_LINK]),
        (GREATER_THAN_LINK, "GreaterThanLink", &[ORDERED_LINK, EVALUATABLE_LINK]),
        (SET_LINK, "SetLink", &[UNORDERED_LINK]),
        (AND_LINK, "AndLink", &[UNORDERED_LINK, EVALUATABLE_LINK]),
        (OR_LINK, "OrLink", &[UNORDERED_LINK, EVALUATABLE_LINK]),
        (SIMILARITY_LINK, "SimilarityLink", &[UNORDERED_LINK]),
        (PRESENT_LINK, "PresentLink", &[UNORDERED_LINK, EVALUATABLE_LINK]),
        (EQUAL_LINK, "EqualLink", &[UNORDERED_LINK, EVALUATABLE_LINK]),
        (NOT_LINK, "NotLink", &[EVALUATABLE_LINK]),
        (ABSENT_LINK, "AbsentLink", &[EVALUATABLE_LINK]),
        (QUOTE_LINK, "QuoteLink", &[LINK]),
        (UNQUOTE_LINK, "UnquoteLink", &[LINK]),
        (LOCAL_QUOTE_LINK, "LocalQuoteLink", &[LINK]),
        (PATTERN_LINK, "PatternLink", &[LINK]),
        (GET_LINK, "GetLink", &[PATTERN_LINK]),
        (BIND_LINK, "BindLink", &[PATTERN_LINK]),
        (MEET_LINK, "MeetLink", &[PATTERN_LINK]),
        (QUERY_LINK, "QueryLink", &[PATTERN_LINK]),
        (DUAL_LINK, "DualLink", &[PATTERN_LINK]),
        (JOIN_LINK, "JoinLink", &[LINK]),
        (MAXIMAL_JOIN_LINK, "MaximalJoinLink", &[JOIN_LINK]),
    ];
}

/// First tag handed out to user-registered types.
const FIRST_CUSTOM_TAG: u16 = 256;

/// One registered type, as listed by [`TypeRegistry::entries`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeEntry {
    pub tag: u16,
    pub name: String,
    pub short_name: String,
    pub parents: Vec<String>,
}

#[derive(Debug, Clone)]
struct TypeInfo {
    name: String,
    parents: Vec<AtomType>,
}

/// In-process type oracle with a builtin hierarchy.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    types: HashMap<AtomType, TypeInfo>,
    /// Full and short names → tag.
    by_name: HashMap<String, AtomType>,
    next_tag: u16,
}

impl TypeRegistry {
    /// Registry holding only the builtin types.
    pub fn new() -> Self {
        let mut registry = Self {
            types: HashMap::new(),
            by_name: HashMap::new(),
            next_tag: FIRST_CUSTOM_TAG,
        };
        for &(tag, name, parents) in builtin::TABLE {
            registry.insert(tag, name, parents.to_vec());
        }
        registry
    }

    fn insert(&mut self, tag: AtomType, name: &str, parents: Vec<AtomType>) {
        self.by_name.insert(name.to_owned(), tag);
        // A short name never shadows an existing full name.
        self.by_name
            .entry(short_form(name).to_owned())
            .or_insert(tag);
        self.types.insert(
            tag,
            TypeInfo {
                name: name.to_owned(),
                parents,
            },
        );
    }

    /// Register a new type under an existing parent.
    pub fn add_type(&mut self, name: &str, parent: &str) -> AtomResult<AtomType> {
        if self.types.values().any(|info| info.name == name) {
            return Err(AtomError::DuplicateType {
                name: name.to_owned(),
            });
        }
        let parent = self
            .type_by_name(parent)
            .ok_or_else(|| AtomError::UnknownType {
                name: parent.to_owned(),
            })?;
        let tag = AtomType::new(self.next_tag);
        self.next_tag += 1;
        self.insert(tag, name, vec![parent]);
        Ok(tag)
    }

    /// All registered types ordered by tag.
    pub fn entries(&self) -> Vec<TypeEntry> {
        let mut entries: Vec<TypeEntry> = self
            .types
            .iter()
            .map(|(tag, info)| TypeEntry {
                tag: tag.get(),
                name: info.name.clone(),
                short_name: short_form(&info.name).to_owned(),
                parents: info.parents.iter().map(|p| self.name_of(*p)).collect(),
            })
            .collect();
        entries.sort_by_key(|e| e.tag);
        entries
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty (never true for a builtin registry).
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeOracle for TypeRegistry {
    fn is_a(&self, candidate: AtomType, ancestor: AtomType) -> bool {
        if candidate == ancestor {
            return true;
        }
        let mut pending = vec![candidate];
        while let Some(ty) = pending.pop() {
            let Some(info) = self.types.get(&ty) else {
                continue;
            };
            for &parent in &info.parents {
                if parent == ancestor {
                    return true;
                }
                pending.push(parent);
            }
        }
        false
    }

    fn type_name(&self, ty: AtomType) -> Option<&str> {
        self.types.get(&ty).map(|info| info.name.as_str())
    }

    fn type_by_name(&self, name: &str) -> Option<AtomType> {
        self.by_name.get(name).copied()
    }
}
