//! Multi-space addressing state owned by one interpreter.
//!
//! Starts empty. The first `define` switches on multi-space addressing and
//! fixes the top-level space; both stay that way for the life of the
//! interpreter.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AtomResult;
use crate::ident::SpaceId;
use crate::space::AtomSpace;

use super::sexpr::FrameSpec;

#[derive(Debug, Default)]
pub struct SpaceContext {
    /// Frames decoded so far, by name.
    spaces: HashMap<String, Arc<AtomSpace>>,
    /// `define`d symbols.
    symbols: HashMap<String, Arc<AtomSpace>>,
    multi_space: bool,
    top_space: Option<Arc<AtomSpace>>,
}

impl SpaceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_multi_space(&self) -> bool {
        self.multi_space
    }

    pub fn top_space(&self) -> Option<&Arc<AtomSpace>> {
        self.top_space.as_ref()
    }

    pub fn symbol(&self, name: &str) -> Option<&Arc<AtomSpace>> {
        self.symbols.get(name)
    }

    /// Turn a frame expression into a space.
    ///
    /// Frames are cached by name. A frame without bases sits directly on
    /// `base`, and a leaf naming `base` itself resolves to `base`.
    pub fn resolve(&mut self, base: &Arc<AtomSpace>, spec: &FrameSpec) -> AtomResult<Arc<AtomSpace>> {
        if let Some(space) = self.spaces.get(&spec.name) {
            return Ok(Arc::clone(space));
        }
        if spec.bases.is_empty() && spec.name == base.name() {
            return Ok(Arc::clone(base));
        }

        let bases = if spec.bases.is_empty() {
            vec![Arc::clone(base)]
        } else {
            spec.bases
                .iter()
                .map(|b| self.resolve(base, b))
                .collect::<AtomResult<Vec<_>>>()?
        };
        let space = Arc::new(AtomSpace::frame(&spec.name, base.types_arc(), bases)?);
        tracing::info!(frame = %spec.name, id = %space.id(), "decoded atom space frame");
        self.spaces.insert(spec.name.clone(), Arc::clone(&space));
        Ok(space)
    }

    /// Bind `symbol` to the frame `spec` layered over `base`.
    pub fn define(
        &mut self,
        symbol: &str,
        base: &Arc<AtomSpace>,
        spec: &FrameSpec,
    ) -> AtomResult<Arc<AtomSpace>> {
        self.multi_space = true;
        let space = self.resolve(base, spec)?;
        if self.top_space.is_none() {
            tracing::info!(symbol, top = %space.name(), "multi-space addressing enabled");
            self.top_space = Some(Arc::clone(&space));
        }
        self.symbols.insert(symbol.to_owned(), Arc::clone(&space));
        Ok(space)
    }

    /// Name of the space with identity `id`, searching `caller`, every
    /// known frame and their bases.
    pub fn space_name(&self, id: SpaceId, caller: &AtomSpace) -> Option<String> {
        fn find(space: &AtomSpace, id: SpaceId) -> Option<String> {
            if space.id() == id {
                return Some(space.name().to_owned());
            }
            space.bases().iter().find_map(|b| find(b, id))
        }
        find(caller, id).or_else(|| self.spaces.values().find_map(|s| find(s, id)))
    }
}
