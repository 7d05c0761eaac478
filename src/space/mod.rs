//! In-memory atom space: the identity table.
//!
//! An [`AtomSpace`] holds at most one instance per distinct atom content and
//! assigns each admitted atom an [`AtomId`]. Admission is the synchronization
//! boundary: two threads admitting content-identical atoms converge on one
//! stored instance, and the identity is assigned inside the same map entry
//! that inserts it.
//!
//! A space may be layered over base spaces (a "frame"). Lookups fall through
//! to the bases; mutations only ever touch the space they are called on.
//! Frames share their first base's identity allocator and type oracle.
//!
//! [`AtomId`]: crate::ident::AtomId

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::atom::{Atom, Content, Handle, TruthValue, Value};
use crate::error::AtomResult;
use crate::ident::{AtomId, IdAllocator, SpaceId};
use crate::types::{AtomType, TypeOracle};

/// A set of admitted atoms plus their incoming-set index.
pub struct AtomSpace {
    id: SpaceId,
    name: String,
    bases: Vec<Arc<AtomSpace>>,
    ids: Arc<IdAllocator>,
    types: Arc<dyn TypeOracle>,
    /// Stored atom → its identity.
    atoms: DashMap<Handle, AtomId>,
    /// Stored atom → links in this space that contain it.
    incoming: DashMap<Handle, Vec<Handle>>,
    read_only: AtomicBool,
}

impl AtomSpace {
    /// Create a root space with its own identity allocator.
    pub fn new(name: impl Into<String>, types: Arc<dyn TypeOracle>) -> AtomResult<Self> {
        Self::frame(name, types, Vec::new())
    }

    /// Create a space layered over `bases`.
    ///
    /// The first base (if any) provides the identity allocator, so identities
    /// stay unique across the whole hierarchy.
    pub fn frame(
        name: impl Into<String>,
        types: Arc<dyn TypeOracle>,
        bases: Vec<Arc<AtomSpace>>,
    ) -> AtomResult<Self> {
        let ids = bases
            .first()
            .map(|base| Arc::clone(&base.ids))
            .unwrap_or_default();
        let id = ids.next_space_id()?;
        let name = name.into();
        tracing::debug!(space = %name, id = %id, bases = bases.len(), "created atom space");
        Ok(Self {
            id,
            name,
            bases,
            ids,
            types,
            atoms: DashMap::new(),
            incoming: DashMap::new(),
            read_only: AtomicBool::new(false),
        })
    }

    /// Identity of this space, drawn from the shared allocator.
    pub fn id(&self) -> SpaceId {
        self.id
    }

    /// Name used in `(AtomSpace "name")` frames.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spaces this one is layered over, searched in order.
    pub fn bases(&self) -> &[Arc<AtomSpace>] {
        &self.bases
    }

    /// Type oracle shared with every frame on top.
    pub fn types(&self) -> &dyn TypeOracle {
        &*self.types
    }

    /// Shared handle to the type oracle, for building frames on top.
    pub fn types_arc(&self) -> Arc<dyn TypeOracle> {
        Arc::clone(&self.types)
    }

    /// Switch refusal of admissions and mutations on or off.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Release);
    }

    /// Whether admissions and mutations are refused.
    pub fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::Acquire)
    }

    /// Number of atoms stored directly in this space.
    pub fn size(&self) -> usize {
        self.atoms.len()
    }

    /// Whether no atom is stored directly here.
    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    // ----- admission and lookup -----

    /// Admit `atom`, returning the stored instance.
    ///
    /// Children are admitted first and links are rebuilt over the stored
    /// children. An atom already present here or in a base is returned as
    /// is. Returns `Ok(None)` when the space is read-only and the atom is
    /// absent.
    pub fn add_atom(&self, atom: &Handle) -> AtomResult<Option<Handle>> {
        if let Some(found) = self.get_atom(atom) {
            return Ok(Some(found));
        }
        if self.is_read_only() {
            tracing::warn!(space = %self.name, atom = %atom.id_string(), "read-only space refused admission");
            return Ok(None);
        }

        let fresh = match atom.content() {
            Content::Node(name) => Atom::node(self.types(), atom.atom_type(), name.clone())?,
            Content::Link(outgoing) => {
                let mut children = Vec::with_capacity(outgoing.len());
                for child in outgoing {
                    match self.add_atom(child)? {
                        Some(stored) => children.push(stored),
                        None => return Ok(None),
                    }
                }
                Atom::link(self.types(), atom.atom_type(), children)?
            }
        };
        fresh.copy_metadata(atom);

        let stored = match self.atoms.entry(Arc::clone(&fresh)) {
            Entry::Occupied(existing) => return Ok(Some(Arc::clone(existing.key()))),
            Entry::Vacant(slot) => {
                let id = self.ids.next_atom_id()?;
                fresh.attach(id, self.id);
                slot.insert(id);
                fresh
            }
        };

        for child in stored.outgoing() {
            self.incoming
                .entry(Arc::clone(child))
                .or_default()
                .push(Arc::clone(&stored));
        }
        tracing::debug!(space = %self.name, atom = %stored.id_string(), "admitted atom");
        Ok(Some(stored))
    }

    /// Stored instance equal to `atom`, searching bases after this space.
    pub fn get_atom(&self, atom: &Handle) -> Option<Handle> {
        self.atoms
            .get(atom)
            .map(|entry| Arc::clone(entry.key()))
            .or_else(|| self.bases.iter().find_map(|base| base.get_atom(atom)))
    }

    /// Look up a node without admitting it.
    pub fn get_node(&self, ty: AtomType, name: &str) -> AtomResult<Option<Handle>> {
        let needle = Atom::node(self.types(), ty, name)?;
        Ok(self.get_atom(&needle))
    }

    /// Look up a link without admitting it.
    pub fn get_link(&self, ty: AtomType, outgoing: Vec<Handle>) -> AtomResult<Option<Handle>> {
        let needle = Atom::link(self.types(), ty, outgoing)?;
        Ok(self.get_atom(&needle))
    }

    /// Whether `atom` is stored directly in this space.
    pub fn contains(&self, atom: &Handle) -> bool {
        self.atoms.contains_key(atom)
    }

    // ----- removal -----

    /// Remove `atom` from this space.
    ///
    /// Without `recursive`, atoms that still have an incoming set are kept.
    /// With it, every link containing the atom is removed first. Returns
    /// false when the atom is not stored here, the space is read-only, or
    /// the atom is still referenced.
    pub fn extract_atom(&self, atom: &Handle, recursive: bool) -> bool {
        if self.is_read_only() {
            tracing::warn!(space = %self.name, atom = %atom.id_string(), "read-only space refused extraction");
            return false;
        }
        let Some(stored) = self.atoms.get(atom).map(|entry| Arc::clone(entry.key())) else {
            return false;
        };

        let parents = self
            .incoming
            .get(&stored)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        if !parents.is_empty() {
            if !recursive {
                tracing::debug!(space = %self.name, atom = %stored.id_string(), "extraction refused, atom has incoming links");
                return false;
            }
            for parent in &parents {
                if self.contains(parent) && !self.extract_atom(parent, true) {
                    return false;
                }
            }
        }

        self.atoms.remove(&stored);
        self.incoming.remove(&stored);
        for child in stored.outgoing() {
            if let Some(mut entry) = self.incoming.get_mut(child) {
                entry.retain(|parent| !Arc::ptr_eq(parent, &stored));
            }
        }
        stored.detach();
        tracing::debug!(space = %self.name, atom = %stored.id_string(), "extracted atom");
        true
    }

    /// Remove every atom stored directly in this space.
    pub fn clear(&self) -> bool {
        if self.is_read_only() {
            tracing::warn!(space = %self.name, "read-only space refused clear");
            return false;
        }
        for entry in self.atoms.iter() {
            entry.key().detach();
        }
        self.atoms.clear();
        self.incoming.clear();
        tracing::debug!(space = %self.name, "cleared atom space");
        true
    }

    // ----- queries -----

    /// Atoms of type `ty` (and its subtypes when `subtypes` is set), in link
    /// engine order. Includes base spaces.
    pub fn get_handles_by_type(&self, ty: AtomType, subtypes: bool) -> Vec<Handle> {
        let mut out = Vec::new();
        self.collect_by_type(ty, subtypes, &mut out);
        out.sort();
        out.dedup();
        out
    }

    fn collect_by_type(&self, ty: AtomType, subtypes: bool, out: &mut Vec<Handle>) {
        let types = self.types();
        out.extend(
            self.atoms
                .iter()
                .map(|entry| Arc::clone(entry.key()))
                .filter(|atom| {
                    atom.atom_type() == ty || (subtypes && types.is_a(atom.atom_type(), ty))
                }),
        );
        for base in &self.bases {
            base.collect_by_type(ty, subtypes, out);
        }
    }

    /// Links containing `atom`, from this space and its bases.
    pub fn incoming_set(&self, atom: &Handle) -> Vec<Handle> {
        let mut out = Vec::new();
        self.collect_incoming(atom, &mut out);
        out.sort();
        out.dedup();
        out
    }

    fn collect_incoming(&self, atom: &Handle, out: &mut Vec<Handle>) {
        if let Some(entry) = self.incoming.get(atom) {
            out.extend(entry.value().iter().cloned());
        }
        for base in &self.bases {
            base.collect_incoming(atom, out);
        }
    }

    /// Links of exactly type `ty` containing `atom`.
    pub fn incoming_by_type(&self, atom: &Handle, ty: AtomType) -> Vec<Handle> {
        let mut out = self.incoming_set(atom);
        out.retain(|link| link.atom_type() == ty);
        out
    }

    // ----- values -----

    /// Set (or with `None`, remove) the value of `key` on `atom`.
    pub fn set_value(&self, atom: &Handle, key: &Handle, value: Option<Value>) -> bool {
        if self.is_read_only() {
            tracing::warn!(space = %self.name, atom = %atom.id_string(), "read-only space refused value update");
            return false;
        }
        atom.set_value(Arc::clone(key), value);
        true
    }

    /// Set the truth value of `atom`; false when read-only.
    pub fn set_truth_value(&self, atom: &Handle, tv: TruthValue) -> bool {
        if self.is_read_only() {
            tracing::warn!(space = %self.name, atom = %atom.id_string(), "read-only space refused truth value update");
            return false;
        }
        atom.set_truth_value(tv);
        true
    }

    /// Admit every atom referenced by `value`, returning the value rebuilt
    /// over the stored instances.
    pub fn add_value_atoms(&self, value: &Value) -> AtomResult<Option<Value>> {
        value.try_map_atoms(&mut |atom| self.add_atom(atom))
    }

    // ----- rendering -----

    /// Full rendering of every atom stored here, in link engine order.
    pub fn render(&self) -> String {
        let mut atoms: Vec<Handle> = self.atoms.iter().map(|entry| Arc::clone(entry.key())).collect();
        atoms.sort();
        atoms
            .iter()
            .map(|atom| atom.to_full_string(self.types(), ""))
            .collect()
    }
}

impl std::fmt::Debug for AtomSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomSpace")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("bases", &self.bases.iter().map(|b| b.name()).collect::<Vec<_>>())
            .field("size", &self.atoms.len())
            .field("read_only", &self.is_read_only())
            .finish()
    }
}
