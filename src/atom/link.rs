//! Links: typed, ordered outgoing sets over other atoms.
//!
//! Everything here agrees on one canonical form. Unordered link types sort
//! their children with [`canonical_cmp`] at construction; the identity table
//! uses the same comparator, so two spaces never disagree about the stored
//! order of a set. The content hash is computed on the canonical form.
//!
//! Equality re-sorts both outgoing sets with [`content_cmp`] when either
//! side lacks an identity, so identities never take part in comparing an
//! admitted set with a transient one.

use std::cmp::Ordering;
use std::sync::Arc;

use super::{djb_fold, Atom, Content, ContentHash, Handle, HASH_SEED, INVALID_HASH, LINK_HASH_BIT};
use crate::error::{AtomError, AtomResult};
use crate::types::{AtomType, TypeOracle};

impl Atom {
    /// Build a transient link. Fails with `TypeMismatch` for non-link types.
    pub fn link(types: &dyn TypeOracle, ty: AtomType, outgoing: Vec<Handle>) -> AtomResult<Handle> {
        if !types.is_link(ty) {
            return Err(AtomError::TypeMismatch {
                type_name: types.name_of(ty),
                expected: "link",
            });
        }
        let unordered = types.is_unordered(ty);
        let mut outgoing = outgoing;
        if unordered {
            outgoing.sort_by(|a, b| canonical_cmp(a, b));
        }
        let hash = compute_link_hash(ty, &outgoing);
        Ok(Arc::new(Atom::from_parts(
            ty,
            Content::Link(outgoing),
            unordered,
            hash,
        )))
    }
}

/// Fold the type tag and every child hash in stored order, then move the
/// result into link hash space.
pub fn compute_link_hash(ty: AtomType, outgoing: &[Handle]) -> ContentHash {
    let acc = outgoing
        .iter()
        .fold(djb_fold(HASH_SEED, u64::from(ty.get())), |acc, child| {
            djb_fold(acc, child.content_hash())
        });
    let hash = acc | LINK_HASH_BIT;
    if hash == INVALID_HASH { hash - 1 } else { hash }
}

/// The canonical comparator: type, content hash, structure, then identity
/// (unassigned sorts first).
///
/// Structure decides before identity, so colliding child hashes still give
/// one stored order regardless of which children have been admitted.
/// Identity only separates content-equal duplicates.
pub fn canonical_cmp(a: &Atom, b: &Atom) -> Ordering {
    content_cmp(a, b).then_with(|| raw_id(a).cmp(&raw_id(b)))
}

/// Identity-free comparator: type, content hash, then structural order.
pub fn content_cmp(a: &Atom, b: &Atom) -> Ordering {
    a.atom_type()
        .cmp(&b.atom_type())
        .then_with(|| a.content_hash().cmp(&b.content_hash()))
        .then_with(|| a.cmp(b))
}

fn raw_id(atom: &Atom) -> u64 {
    atom.id().map_or(0, |id| id.get())
}

/// Outgoing-set equality for two links already known to share type and hash.
pub(super) fn outgoing_equal(a: &Atom, b: &Atom) -> bool {
    let (left, right) = (a.outgoing(), b.outgoing());
    if left.len() != right.len() {
        return false;
    }
    if a.is_unordered() && (a.id().is_none() || b.id().is_none()) {
        let mut left = left.to_vec();
        let mut right = right.to_vec();
        left.sort_by(|x, y| content_cmp(x, y));
        right.sort_by(|x, y| content_cmp(x, y));
        return left.iter().zip(&right).all(|(x, y)| x == y);
    }
    left.iter().zip(right).all(|(x, y)| x == y)
}

/// Order two links of the same type: lexicographic over children when the
/// arities match, otherwise the shorter link first.
pub(super) fn cmp_same_type(a: &Atom, b: &Atom) -> Ordering {
    let (left, right) = (a.outgoing(), b.outgoing());
    if left.len() != right.len() {
        return left.len().cmp(&right.len());
    }
    left.iter()
        .zip(right)
        .map(|(x, y)| x.cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

pub(super) fn render(atom: &Atom, types: &dyn TypeOracle, indent: &str, full: bool) -> String {
    let mut out = format!(
        "{indent}({}{}\n",
        types.name_of(atom.atom_type()),
        atom.render_annotations(full)
    );
    let child_indent = format!("{indent}  ");
    for child in atom.outgoing() {
        if full {
            out.push_str(&child.to_full_string(types, &child_indent));
        } else {
            out.push_str(&child.to_short_string(types, &child_indent));
        }
    }
    out.push_str(&format!("{indent}) {}\n", atom.render_trailer(full)));
    out
}
