//! Positional shadow tree over a pattern expression.
//!
//! One [`PatternTerm`] exists per *occurrence* of an atom inside a pattern,
//! so the same variable appearing twice gets two terms. Terms live in an
//! arena owned by [`PatternTree`]; parents and children refer to each other
//! by [`TermId`], and the tree is the single owner of every term.
//!
//! Flags only ever go from unset to set. Variable and evaluatable marks set
//! a local flag on the term and its parent, then an "any" flag on every
//! ancestor up to the root, stopping early at the first ancestor that
//! already carries it. Literal marks travel the other way, down the subtree.

use crate::atom::Handle;
use crate::error::{TermError, TermResult};
use crate::types::builtin::{EVALUATABLE_LINK, GLOB_NODE, QUOTE_LINK};
use crate::types::TypeOracle;

use super::quotation::Quotation;

/// Index of a term inside its [`PatternTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TermId(u32);

impl TermId {
    /// The sentinel root every tree starts with.
    pub const ROOT: TermId = TermId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for TermId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "term:{}", self.0)
    }
}

/// Structural flags of one term.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermFlags {
    pub has_any_bound_variable: bool,
    pub has_bound_variable: bool,
    pub has_any_globby_variable: bool,
    pub has_globby_variable: bool,
    pub has_any_evaluatable: bool,
    pub has_evaluatable: bool,
    pub has_any_unordered_link: bool,
    pub is_literal: bool,
}

/// One occurrence of an atom in a pattern.
#[derive(Debug, Clone)]
pub struct PatternTerm {
    /// Resolved atom, after stripping a consumed quote wrapper. `None` for
    /// the root.
    atom: Option<Handle>,
    /// The consumed wrapper, if any.
    quote: Option<Handle>,
    parent: Option<TermId>,
    children: Vec<TermId>,
    quotation: Quotation,
    flags: TermFlags,
}

impl PatternTerm {
    fn root() -> Self {
        Self {
            atom: None,
            quote: None,
            parent: None,
            children: Vec::new(),
            quotation: Quotation::new(),
            flags: TermFlags::default(),
        }
    }

    pub fn atom(&self) -> Option<&Handle> {
        self.atom.as_ref()
    }

    pub fn quote(&self) -> Option<&Handle> {
        self.quote.as_ref()
    }

    pub fn parent(&self) -> Option<TermId> {
        self.parent
    }

    pub fn quotation(&self) -> Quotation {
        self.quotation
    }

    pub fn flags(&self) -> TermFlags {
        self.flags
    }

    pub fn is_quoted(&self) -> bool {
        self.quotation.is_quoted()
    }
}

/// Arena of pattern terms rooted at [`TermId::ROOT`].
#[derive(Debug, Clone)]
pub struct PatternTree {
    terms: Vec<PatternTerm>,
}

impl PatternTree {
    /// A tree holding only the root sentinel.
    pub fn new() -> Self {
        Self {
            terms: vec![PatternTerm::root()],
        }
    }

    /// Walk `pattern` top-down and build one term per occurrence.
    ///
    /// Unquoted occurrences of the declared `variables` are marked as bound
    /// (or glob) variables, unordered links mark their ancestors, unquoted
    /// evaluatable links are marked after their children, and the body of a
    /// consumed `QuoteLink` is marked literal.
    pub fn build(
        types: &dyn TypeOracle,
        pattern: &Handle,
        variables: &[Handle],
    ) -> TermResult<Self> {
        let mut tree = Self::new();
        tree.walk(types, TermId::ROOT, pattern.clone(), variables)?;
        Ok(tree)
    }

    fn walk(
        &mut self,
        types: &dyn TypeOracle,
        parent: TermId,
        atom: Handle,
        variables: &[Handle],
    ) -> TermResult<TermId> {
        let id = self.add_child(types, parent, atom)?;
        let term = self.term(id);
        let resolved = term.atom.clone().expect("non-root term without an atom");
        let unquoted = !term.is_quoted();
        let quoted_body = term
            .quote
            .as_ref()
            .is_some_and(|q| q.atom_type() == QUOTE_LINK);
        let ty = resolved.atom_type();

        if resolved.is_node() {
            if unquoted && variables.contains(&resolved) {
                if types.is_a(ty, GLOB_NODE) {
                    self.mark_glob_variable(id);
                } else {
                    self.mark_bound_variable(id);
                }
            }
        } else {
            if types.is_unordered(ty) {
                self.mark_unordered_link(id);
            }
            for child in resolved.outgoing() {
                self.walk(types, id, child.clone(), variables)?;
            }
            if unquoted && types.is_a(ty, EVALUATABLE_LINK) {
                self.mark_evaluatable(id);
            }
        }

        if quoted_body {
            self.mark_literal(id);
        }
        Ok(id)
    }

    pub fn root(&self) -> TermId {
        TermId::ROOT
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Never true: the root is always present.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Term behind `id`.
    ///
    /// # Panics
    ///
    /// If `id` was not issued by this tree.
    pub fn term(&self, id: TermId) -> &PatternTerm {
        self.terms
            .get(id.index())
            .expect("pattern term arena lost a term")
    }

    fn term_mut(&mut self, id: TermId) -> &mut PatternTerm {
        self.terms
            .get_mut(id.index())
            .expect("pattern term arena lost a term")
    }

    /// Create the term for one occurrence of `atom` under `parent`.
    ///
    /// The child starts from the parent's quotation with the local flag
    /// cleared. A quote wrapper that the state allows to be consumed is
    /// stripped and kept as the term's quote; it must wrap exactly one atom.
    pub fn add_child(
        &mut self,
        types: &dyn TypeOracle,
        parent: TermId,
        atom: Handle,
    ) -> TermResult<TermId> {
        let mut quotation = self.term(parent).quotation.descend();
        let ty = atom.atom_type();

        let (resolved, quote) = if quotation.consumable(ty) {
            if atom.arity() != 1 {
                return Err(TermError::Arity {
                    type_name: types.name_of(ty),
                    arity: atom.arity(),
                });
            }
            (atom.outgoing()[0].clone(), Some(atom))
        } else {
            (atom, None)
        };
        quotation.update(ty);

        let raw = u32::try_from(self.terms.len()).expect("pattern tree outgrew u32 term ids");
        let id = TermId(raw);
        self.terms.push(PatternTerm {
            atom: Some(resolved),
            quote,
            parent: Some(parent),
            children: Vec::new(),
            quotation,
            flags: TermFlags::default(),
        });
        self.term_mut(parent).children.push(id);
        Ok(id)
    }

    pub fn children(&self, id: TermId) -> &[TermId] {
        &self.term(id).children
    }

    /// The `position`-th child of `id`.
    pub fn child(&self, id: TermId, position: usize) -> TermResult<TermId> {
        let children = self.children(id);
        children.get(position).copied().ok_or(TermError::Index {
            position,
            arity: children.len(),
        })
    }

    pub fn arity(&self, id: TermId) -> usize {
        self.children(id).len()
    }

    /// Whether `ancestor` lies on the parent chain of `id`.
    ///
    /// Terms are compared structurally (same resolved atom and same parent
    /// chain), so a term from an equally-shaped position counts as well.
    pub fn is_descendant(&self, id: TermId, ancestor: TermId) -> bool {
        let mut current = self.term(id).parent;
        while let Some(p) = current {
            if self.terms_equal(p, ancestor) {
                return true;
            }
            current = self.term(p).parent;
        }
        false
    }

    fn terms_equal(&self, a: TermId, b: TermId) -> bool {
        if a == b {
            return true;
        }
        let (ta, tb) = (self.term(a), self.term(b));
        if ta.atom != tb.atom {
            return false;
        }
        match (ta.parent, tb.parent) {
            (None, None) => true,
            (Some(pa), Some(pb)) => self.terms_equal(pa, pb),
            _ => false,
        }
    }

    // ----- flag marking -----

    pub fn mark_bound_variable(&mut self, id: TermId) {
        self.mark_local(id, |f| &mut f.has_bound_variable);
        self.propagate_up(id, |f| &mut f.has_any_bound_variable);
    }

    pub fn mark_glob_variable(&mut self, id: TermId) {
        self.mark_local(id, |f| &mut f.has_globby_variable);
        self.propagate_up(id, |f| &mut f.has_any_globby_variable);
    }

    pub fn mark_evaluatable(&mut self, id: TermId) {
        self.mark_local(id, |f| &mut f.has_evaluatable);
        self.propagate_up(id, |f| &mut f.has_any_evaluatable);
    }

    pub fn mark_unordered_link(&mut self, id: TermId) {
        self.propagate_up(id, |f| &mut f.has_any_unordered_link);
    }

    /// Mark `id` and its whole subtree as literal.
    pub fn mark_literal(&mut self, id: TermId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            let term = self.term_mut(current);
            if term.flags.is_literal {
                continue;
            }
            term.flags.is_literal = true;
            pending.extend(term.children.iter().copied());
        }
    }

    /// Set a flag on `id` and its immediate parent.
    fn mark_local(&mut self, id: TermId, flag: fn(&mut TermFlags) -> &mut bool) {
        *flag(&mut self.term_mut(id).flags) = true;
        if let Some(parent) = self.term(id).parent {
            *flag(&mut self.term_mut(parent).flags) = true;
        }
    }

    /// Set a flag from `id` up to the root, stopping at the first term that
    /// already has it.
    fn propagate_up(&mut self, id: TermId, flag: fn(&mut TermFlags) -> &mut bool) {
        let mut current = Some(id);
        while let Some(c) = current {
            let term = self.term_mut(c);
            let slot = flag(&mut term.flags);
            if *slot {
                break;
            }
            *slot = true;
            current = term.parent;
        }
    }

    // ----- rendering -----

    /// Path from the root (`-`) to `id`, one atom id string per level.
    pub fn render(&self, id: TermId) -> String {
        let term = self.term(id);
        match (&term.atom, term.parent) {
            (Some(atom), Some(parent)) => format!("{}: {}", self.render(parent), atom.id_string()),
            _ => "-".to_owned(),
        }
    }
}

impl Default for PatternTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;
    use crate::types::builtin::*;
    use crate::types::TypeRegistry;

    fn node(types: &TypeRegistry, ty: crate::types::AtomType, name: &str) -> Handle {
        Atom::node(types, ty, name).unwrap()
    }

    fn link(types: &TypeRegistry, ty: crate::types::AtomType, out: Vec<Handle>) -> Handle {
        Atom::link(types, ty, out).unwrap()
    }

    /// (Evaluation (Predicate "p") (List (Variable "$x") (Concept "a")))
    ///
    /// Term ids: root 0, Evaluation 1, Predicate 2, List 3, $x 4, a 5.
    fn evaluation_tree(types: &TypeRegistry) -> (PatternTree, Handle) {
        let x = node(types, VARIABLE_NODE, "$x");
        let pattern = link(
            types,
            EVALUATION_LINK,
            vec![
                node(types, PREDICATE_NODE, "p"),
                link(types, LIST_LINK, vec![x.clone(), node(types, CONCEPT_NODE, "a")]),
            ],
        );
        (PatternTree::build(types, &pattern, &[x.clone()]).unwrap(), x)
    }

    #[test]
    fn root_is_a_bare_sentinel() {
        let tree = PatternTree::new();
        let root = tree.term(tree.root());
        assert!(root.atom().is_none());
        assert!(root.parent().is_none());
        assert_eq!(root.flags(), TermFlags::default());
        assert_eq!(tree.render(tree.root()), "-");
        assert!(!tree.is_descendant(tree.root(), tree.root()));
    }

    #[test]
    fn build_creates_one_term_per_occurrence() {
        let types = TypeRegistry::new();
        let x = node(&types, VARIABLE_NODE, "$x");
        let pattern = link(&types, LIST_LINK, vec![x.clone(), x.clone()]);
        let tree = PatternTree::build(&types, &pattern, &[x]).unwrap();
        assert_eq!(tree.len(), 4);
        let list = tree.child(tree.root(), 0).unwrap();
        assert_eq!(tree.arity(list), 2);
        let first = tree.child(list, 0).unwrap();
        let second = tree.child(list, 1).unwrap();
        assert_ne!(first, second);
        assert_eq!(tree.term(first).atom(), tree.term(second).atom());
    }

    #[test]
    fn bound_variable_marks_local_and_ancestors() {
        let types = TypeRegistry::new();
        let (tree, _) = evaluation_tree(&types);
        let ids: Vec<TermId> = (0..6).map(TermId).collect();

        let var = tree.term(ids[4]).flags();
        assert!(var.has_bound_variable && var.has_any_bound_variable);

        let list = tree.term(ids[3]).flags();
        assert!(list.has_bound_variable && list.has_any_bound_variable);

        let eval = tree.term(ids[1]).flags();
        assert!(!eval.has_bound_variable);
        assert!(eval.has_any_bound_variable);
        assert!(tree.term(ids[0]).flags().has_any_bound_variable);

        let pred = tree.term(ids[2]).flags();
        assert!(!pred.has_bound_variable && !pred.has_any_bound_variable);
        assert!(!tree.term(ids[5]).flags().has_any_bound_variable);
    }

    #[test]
    fn repeated_marking_is_a_no_op() {
        let types = TypeRegistry::new();
        let (mut tree, _) = evaluation_tree(&types);
        let before: Vec<TermFlags> = (0..6).map(|i| tree.term(TermId(i)).flags()).collect();
        tree.mark_bound_variable(TermId(4));
        tree.mark_evaluatable(TermId(1));
        let after: Vec<TermFlags> = (0..6).map(|i| tree.term(TermId(i)).flags()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn evaluatable_links_are_marked() {
        let types = TypeRegistry::new();
        let (tree, _) = evaluation_tree(&types);
        assert!(tree.term(TermId(1)).flags().has_evaluatable);
        assert!(tree.term(TermId(0)).flags().has_any_evaluatable);
        assert!(!tree.term(TermId(3)).flags().has_any_evaluatable);
    }

    #[test]
    fn glob_and_unordered_marks() {
        let types = TypeRegistry::new();
        let glob = node(&types, GLOB_NODE, "$g");
        let pattern = link(
            &types,
            SET_LINK,
            vec![link(&types, LIST_LINK, vec![glob.clone()])],
        );
        let tree = PatternTree::build(&types, &pattern, &[glob]).unwrap();
        let set = tree.child(tree.root(), 0).unwrap();
        let list = tree.child(set, 0).unwrap();
        let g = tree.child(list, 0).unwrap();

        assert!(tree.term(g).flags().has_globby_variable);
        assert!(!tree.term(g).flags().has_bound_variable);
        assert!(tree.term(set).flags().has_any_globby_variable);
        assert!(tree.term(set).flags().has_any_unordered_link);
        assert!(tree.term(tree.root()).flags().has_any_unordered_link);
        assert!(!tree.term(list).flags().has_any_unordered_link);
    }

    #[test]
    fn quoted_variables_are_literal() {
        let types = TypeRegistry::new();
        let x = node(&types, VARIABLE_NODE, "$x");
        let quoted = link(&types, QUOTE_LINK, vec![link(&types, LIST_LINK, vec![x.clone()])]);
        let pattern = link(&types, LIST_LINK, vec![quoted.clone(), x.clone()]);
        let tree = PatternTree::build(&types, &pattern, &[x]).unwrap();

        let outer = tree.child(tree.root(), 0).unwrap();
        let inner = tree.child(outer, 0).unwrap();
        let term = tree.term(inner);
        assert_eq!(term.quote(), Some(&quoted));
        assert_eq!(term.atom().map(|a| a.atom_type()), Some(LIST_LINK));
        assert!(term.flags().is_literal);
        assert!(term.is_quoted());

        let inner_x = tree.child(inner, 0).unwrap();
        assert!(tree.term(inner_x).flags().is_literal);
        assert!(!tree.term(inner_x).flags().has_bound_variable);

        let free_x = tree.child(outer, 1).unwrap();
        assert!(tree.term(free_x).flags().has_bound_variable);
        assert!(!tree.term(outer).flags().is_literal);
    }

    #[test]
    fn unquote_reenters_matching() {
        let types = TypeRegistry::new();
        let x = node(&types, VARIABLE_NODE, "$x");
        let pattern = link(
            &types,
            QUOTE_LINK,
            vec![link(
                &types,
                LIST_LINK,
                vec![link(&types, UNQUOTE_LINK, vec![x.clone()])],
            )],
        );
        let tree = PatternTree::build(&types, &pattern, &[x.clone()]).unwrap();
        let list = tree.child(tree.root(), 0).unwrap();
        let var = tree.child(list, 0).unwrap();
        assert_eq!(tree.term(var).atom(), Some(&x));
        assert!(tree.term(var).quote().is_some());
        assert_eq!(tree.term(var).quotation().level(), 0);
        assert!(tree.term(var).flags().has_bound_variable);
    }

    #[test]
    fn local_quote_suppresses_evaluation_one_level() {
        let types = TypeRegistry::new();
        let and = link(&types, AND_LINK, vec![node(&types, CONCEPT_NODE, "a")]);
        let pattern = link(&types, LOCAL_QUOTE_LINK, vec![and.clone()]);
        let tree = PatternTree::build(&types, &pattern, &[]).unwrap();
        let and_term = tree.child(tree.root(), 0).unwrap();
        let a_term = tree.child(and_term, 0).unwrap();
        assert_eq!(tree.term(and_term).atom(), Some(&and));
        assert!(tree.term(and_term).quotation().is_locally_quoted());
        assert!(!tree.term(and_term).flags().has_evaluatable);
        assert!(!tree.term(tree.root()).flags().has_any_evaluatable);
        assert!(!tree.term(a_term).quotation().is_locally_quoted());
        assert!(!tree.term(a_term).is_quoted());
    }

    #[test]
    fn consumed_wrapper_must_have_one_child() {
        let types = TypeRegistry::new();
        let bad = link(
            &types,
            QUOTE_LINK,
            vec![node(&types, CONCEPT_NODE, "a"), node(&types, CONCEPT_NODE, "b")],
        );
        let mut tree = PatternTree::new();
        let err = tree.add_child(&types, TermId::ROOT, bad).unwrap_err();
        assert!(matches!(err, TermError::Arity { arity: 2, .. }));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn child_out_of_range() {
        let tree = PatternTree::new();
        assert!(matches!(
            tree.child(tree.root(), 0),
            Err(TermError::Index {
                position: 0,
                arity: 0
            })
        ));
    }

    #[test]
    fn literal_marks_go_down_only() {
        let types = TypeRegistry::new();
        let (mut tree, _) = evaluation_tree(&types);
        tree.mark_literal(TermId(3));
        assert!(tree.term(TermId(3)).flags().is_literal);
        assert!(tree.term(TermId(4)).flags().is_literal);
        assert!(tree.term(TermId(5)).flags().is_literal);
        assert!(!tree.term(TermId(1)).flags().is_literal);
        assert!(!tree.term(TermId(2)).flags().is_literal);
    }

    #[test]
    fn descendant_relation_is_transitive() {
        let types = TypeRegistry::new();
        let (tree, _) = evaluation_tree(&types);
        let (eval, list, var) = (TermId(1), TermId(3), TermId(4));
        assert!(tree.is_descendant(var, list));
        assert!(tree.is_descendant(list, eval));
        assert!(tree.is_descendant(var, eval));
        assert!(tree.is_descendant(var, tree.root()));
        assert!(!tree.is_descendant(eval, var));
        assert!(!tree.is_descendant(TermId(2), list));
    }

    #[test]
    fn descendant_matches_equal_positions_structurally() {
        let types = TypeRegistry::new();
        let inner = link(&types, LIST_LINK, vec![node(&types, CONCEPT_NODE, "a")]);
        let pattern = link(&types, LIST_LINK, vec![inner.clone(), inner]);
        let tree = PatternTree::build(&types, &pattern, &[]).unwrap();

        let outer = tree.child(tree.root(), 0).unwrap();
        let first = tree.child(outer, 0).unwrap();
        let second = tree.child(outer, 1).unwrap();
        let first_a = tree.child(first, 0).unwrap();
        let second_a = tree.child(second, 0).unwrap();
        assert_ne!(first, second);

        assert!(tree.is_descendant(first_a, second));
        assert!(tree.is_descendant(second_a, first));
        assert!(!tree.is_descendant(first, second));
        assert!(!tree.is_descendant(outer, first));
    }

    #[test]
    fn render_walks_from_root() {
        let types = TypeRegistry::new();
        let (tree, x) = evaluation_tree(&types);
        let text = tree.render(TermId(4));
        assert!(text.starts_with("-: "));
        assert!(text.ends_with(&x.id_string()));
        assert_eq!(text.matches(": ").count(), 3);
    }
}
