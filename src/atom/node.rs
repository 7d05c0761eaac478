//! Nodes: named leaves of the hypergraph.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::{djb_fold, escape_name, Atom, Content, ContentHash, Handle, LINK_HASH_BIT};
use crate::error::{AtomError, AtomResult};
use crate::types::{AtomType, TypeOracle};

impl Atom {
    /// Build a transient node. Fails with `TypeMismatch` for non-node types.
    pub fn node(types: &dyn TypeOracle, ty: AtomType, name: impl Into<String>) -> AtomResult<Handle> {
        if !types.is_node(ty) {
            return Err(AtomError::TypeMismatch {
                type_name: types.name_of(ty),
                expected: "node",
            });
        }
        let name = name.into();
        let hash = compute_node_hash(ty, &name);
        Ok(Arc::new(Atom::from_parts(ty, Content::Node(name), false, hash)))
    }
}

/// Hash the name with the standard string hasher, then fold in the type tag.
/// The MSB is always clear.
pub fn compute_node_hash(ty: AtomType, name: &str) -> ContentHash {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    djb_fold(hasher.finish(), u64::from(ty.get())) & !LINK_HASH_BIT
}

pub(super) fn render(atom: &Atom, types: &dyn TypeOracle, indent: &str, full: bool) -> String {
    format!(
        "{indent}({} \"{}\"{}) {}\n",
        types.name_of(atom.atom_type()),
        escape_name(atom.name().unwrap_or_default()),
        atom.render_annotations(full),
        atom.render_trailer(full),
    )
}
