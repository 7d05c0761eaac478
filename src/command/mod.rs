//! Wire-level command interpreter.
//!
//! Translates a small set of textual commands into atom space operations
//! and renders the results back as s-expressions. One command per call; the
//! interpreter keeps its multi-space state ([`SpaceContext`]) between calls
//! and so takes `&mut self`.
//!
//! ```text
//! (cog-set-value! (Concept "foo") (Predicate "key") (FloatValue 1 2 3))  =>  ()
//! (cog-value (Concept "foo") (Predicate "key"))                          =>  (FloatValue 1 2 3)
//! ```
//!
//! Dispatch hashes the head token with a compile-time djb2 and looks it up
//! in a fixed table; the matched entry's name is compared as well, so a hash
//! collision can never run the wrong command.

pub mod frame;
pub mod sexpr;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use miette::Diagnostic;
use thiserror::Error;

use crate::atom::{Atom, Handle, Value};
use crate::error::AtomError;
use crate::space::AtomSpace;
use crate::types::TypeOracle;
use crate::types::builtin::{JOIN_LINK, PATTERN_LINK};

pub use frame::SpaceContext;
use sexpr::{
    Cursor, FrameSpec, decode_alist, decode_atom, decode_atom_framed, decode_frame, decode_type,
    decode_value, encode_atom, encode_value,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CommandError {
    #[error("syntax error: {message}")]
    #[diagnostic(
        code(hyperatom::command::syntax),
        help(
            "Commands look like `(cog-node 'Concept \"foo\")`: an open paren, a \
             known command name, then its arguments."
        )
    )]
    Syntax { message: String },

    #[error("cannot decode argument at byte {position}: {message}")]
    #[diagnostic(
        code(hyperatom::command::decode),
        help("Check the parenthesization and quoting of the command's arguments.")
    )]
    Decode { position: usize, message: String },

    #[error("unknown atom type in command: {name}")]
    #[diagnostic(
        code(hyperatom::command::unknown_type),
        help("Use a registered type name, e.g. 'Concept or 'ListLink.")
    )]
    UnknownType { name: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Atom(#[from] AtomError),
}

/// Result type for command interpretation.
pub type CommandResult<T> = std::result::Result<T, CommandError>;

// ---------------------------------------------------------------------------
// Query evaluation seam
// ---------------------------------------------------------------------------

/// Runs pattern and join queries for `cog-execute-cache!`.
pub trait QueryEvaluator: Send + Sync {
    /// Evaluate `query` against `space`; `None` declines.
    fn evaluate(&self, space: &AtomSpace, query: &Handle) -> Option<Value>;
}

/// Declines every query.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvaluator;

impl QueryEvaluator for NoEvaluator {
    fn evaluate(&self, _space: &AtomSpace, _query: &Handle) -> Option<Value> {
        None
    }
}

// ---------------------------------------------------------------------------
// Dispatch table
// ---------------------------------------------------------------------------

/// Every command the interpreter understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Atomspace,
    AtomspaceClear,
    ExecuteCache,
    Extract,
    ExtractRecursive,
    GetAtoms,
    IncomingByType,
    IncomingSet,
    KeysAlist,
    Link,
    Node,
    SetValue,
    SetValues,
    SetTv,
    Value,
    Define,
}

impl Command {
    pub const ALL: [Command; 16] = [
        Command::Atomspace,
        Command::AtomspaceClear,
        Command::ExecuteCache,
        Command::Extract,
        Command::ExtractRecursive,
        Command::GetAtoms,
        Command::IncomingByType,
        Command::IncomingSet,
        Command::KeysAlist,
        Command::Link,
        Command::Node,
        Command::SetValue,
        Command::SetValues,
        Command::SetTv,
        Command::Value,
        Command::Define,
    ];

    /// Head token on the wire.
    pub const fn head(self) -> &'static str {
        match self {
            Command::Atomspace => "cog-atomspace",
            Command::AtomspaceClear => "cog-atomspace-clear",
            Command::ExecuteCache => "cog-execute-cache!",
            Command::Extract => "cog-extract!",
            Command::ExtractRecursive => "cog-extract-recursive!",
            Command::GetAtoms => "cog-get-atoms",
            Command::IncomingByType => "cog-incoming-by-type",
            Command::IncomingSet => "cog-incoming-set",
            Command::KeysAlist => "cog-keys->alist",
            Command::Link => "cog-link",
            Command::Node => "cog-node",
            Command::SetValue => "cog-set-value!",
            Command::SetValues => "cog-set-values!",
            Command::SetTv => "cog-set-tv!",
            Command::Value => "cog-value",
            Command::Define => "define",
        }
    }

    /// Look up a head token.
    pub fn from_head(head: &str) -> Option<Command> {
        let hash = head_hash(head);
        DISPATCH
            .iter()
            .find(|(h, _)| *h == hash)
            .map(|&(_, command)| command)
            .filter(|command| command.head() == head)
    }
}

/// djb2 over the head bytes, usable in constants.
pub const fn head_hash(head: &str) -> u64 {
    let bytes = head.as_bytes();
    let mut acc: u64 = 5381;
    let mut i = 0;
    while i < bytes.len() {
        acc = acc.wrapping_add(acc << 5).wrapping_add(bytes[i] as u64);
        i += 1;
    }
    acc
}

static DISPATCH: [(u64, Command); 16] = {
    let mut table = [(0u64, Command::Atomspace); 16];
    let mut i = 0;
    while i < Command::ALL.len() {
        table[i] = (head_hash(Command::ALL[i].head()), Command::ALL[i]);
        i += 1;
    }
    table
};

// ---------------------------------------------------------------------------
// Interpreter
// ---------------------------------------------------------------------------

/// Stateful command interpreter. See the module docs.
pub struct Interpreter {
    context: SpaceContext,
    evaluator: Box<dyn QueryEvaluator>,
}

impl Interpreter {
    /// Interpreter that declines query execution.
    pub fn new() -> Self {
        Self::with_evaluator(Box::new(NoEvaluator))
    }

    pub fn with_evaluator(evaluator: Box<dyn QueryEvaluator>) -> Self {
        tracing::info!(commands = Command::ALL.len(), "command interpreter ready");
        Self {
            context: SpaceContext::new(),
            evaluator,
        }
    }

    pub fn context(&self) -> &SpaceContext {
        &self.context
    }

    /// Interpret one command against `space` and return the wire reply.
    ///
    /// Blank input and `;` comments produce an empty reply.
    pub fn interpret(&mut self, space: &Arc<AtomSpace>, cmd: &str) -> CommandResult<String> {
        let text = cmd.trim_start();
        if text.is_empty() || text.starts_with(';') {
            return Ok(String::new());
        }
        if !text.starts_with('(') {
            return Err(CommandError::Syntax {
                message: format!("badly formed command: {}", cmd.trim()),
            });
        }

        let body = &text[1..];
        let end = body
            .find(|c: char| c.is_whitespace() || c == ')')
            .unwrap_or(body.len());
        let head = &body[..end];
        if head.is_empty() {
            return Err(CommandError::Syntax {
                message: format!("not a command: {}", cmd.trim()),
            });
        }
        let command = Command::from_head(head).ok_or_else(|| CommandError::Syntax {
            message: format!("command not supported: >>{head}<<"),
        })?;
        tracing::debug!(command = head, "interpreting command");

        let mut cur = Cursor::new(text);
        cur.advance(1 + end);

        match command {
            Command::Atomspace => Ok(self.atomspace()),
            Command::AtomspaceClear => Ok(flag(space.clear()).to_owned()),
            Command::ExecuteCache => self.execute_cache(space, &mut cur),
            Command::Extract => self.extract(space, &mut cur, false),
            Command::ExtractRecursive => self.extract(space, &mut cur, true),
            Command::GetAtoms => self.get_atoms(space, &mut cur),
            Command::IncomingByType => self.incoming(space, &mut cur, true),
            Command::IncomingSet => self.incoming(space, &mut cur, false),
            Command::KeysAlist => self.keys_alist(space, &mut cur),
            Command::Link => self.link(space, &mut cur),
            Command::Node => self.node(space, &mut cur),
            Command::SetValue => self.set_value(space, &mut cur),
            Command::SetValues => self.set_values(space, &mut cur),
            Command::SetTv => self.set_tv(space, &mut cur),
            Command::Value => self.value(space, &mut cur),
            Command::Define => self.define(space, &mut cur),
        }
    }

    // ----- helpers -----

    /// Space a frame expression names, layered over the top space (or
    /// `space` before any `define`).
    fn resolve_frame(&mut self, space: &Arc<AtomSpace>, spec: &FrameSpec) -> CommandResult<Arc<AtomSpace>> {
        let base = self.context.top_space().cloned().unwrap_or_else(|| Arc::clone(space));
        Ok(self.context.resolve(&base, spec)?)
    }

    /// Optional trailing `(AtomSpace ...)`; only honoured once multi-space
    /// addressing is on.
    fn opt_space(&mut self, space: &Arc<AtomSpace>, cur: &mut Cursor<'_>) -> CommandResult<Arc<AtomSpace>> {
        if !self.context.is_multi_space() || !cur.looking_at("(AtomSpace") {
            return Ok(Arc::clone(space));
        }
        let spec = decode_frame(cur)?;
        self.resolve_frame(space, &spec)
    }

    /// Decode an atom argument together with the space its own
    /// `(AtomSpace ...)` annotation names, when multi-space addressing is on.
    fn framed_atom(
        &mut self,
        space: &Arc<AtomSpace>,
        cur: &mut Cursor<'_>,
    ) -> CommandResult<(Handle, Option<Arc<AtomSpace>>)> {
        let (atom, spec) = decode_atom_framed(cur, space.types())?;
        let frame = match spec {
            Some(spec) if self.context.is_multi_space() => Some(self.resolve_frame(space, &spec)?),
            _ => None,
        };
        Ok((atom, frame))
    }

    /// Encode an atom, naming its owner when multi-space addressing is on.
    fn encode(&self, atom: &Atom, caller: &AtomSpace) -> String {
        let frame = if self.context.is_multi_space() {
            atom.space_id().and_then(|id| self.context.space_name(id, caller))
        } else {
            None
        };
        encode_atom(atom, caller.types(), frame.as_deref())
    }

    fn encode_list(&self, atoms: &[Handle], caller: &AtomSpace) -> String {
        let mut out = String::from("(");
        for atom in atoms {
            out.push_str(&encode_atom(atom, caller.types(), None));
        }
        out.push(')');
        out
    }

    // ----- commands -----

    fn atomspace(&self) -> String {
        match self.context.top_space() {
            Some(top) => top.render(),
            None => "()\n".to_owned(),
        }
    }

    fn execute_cache(&mut self, space: &Arc<AtomSpace>, cur: &mut Cursor<'_>) -> CommandResult<String> {
        let types = space.types_arc();
        let (query, frame) = self.framed_atom(space, cur)?;
        let space = frame.unwrap_or_else(|| Arc::clone(space));
        let query = admit(&space, &query)?;
        let key = admit(&space, &decode_atom(cur, &*types)?)?;

        let mut force = false;
        if cur.looking_at("(") {
            let meta = admit(&space, &decode_atom(cur, &*types)?)?;
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as f64)
                .unwrap_or_default();
            space.set_value(&query, &meta, Some(Value::Float(vec![now])));
            force = cur.rest().contains("#t");
        }

        if !force {
            if let Some(cached) = query.value(&key) {
                return Ok(encode_value(Some(&cached), &*types));
            }
        }

        let qt = query.atom_type();
        if !types.is_a(qt, PATTERN_LINK) && !types.is_a(qt, JOIN_LINK) {
            return Ok("#f\n".to_owned());
        }
        let Some(result) = self.evaluator.evaluate(&space, &query) else {
            tracing::debug!(query = %query.id_string(), "query evaluator declined");
            return Ok("#f\n".to_owned());
        };
        space.set_value(&query, &key, Some(result.clone()));
        Ok(encode_value(Some(&result), &*types))
    }

    fn extract(&mut self, space: &Arc<AtomSpace>, cur: &mut Cursor<'_>, recursive: bool) -> CommandResult<String> {
        let (atom, frame) = self.framed_atom(space, cur)?;
        let space = frame.unwrap_or_else(|| Arc::clone(space));
        let reply = match space.get_atom(&atom) {
            None => "#t\n",
            Some(stored) => flag(space.extract_atom(&stored, recursive)),
        };
        Ok(reply.to_owned())
    }

    fn get_atoms(&mut self, space: &Arc<AtomSpace>, cur: &mut Cursor<'_>) -> CommandResult<String> {
        let ty = decode_type(cur, space.types())?;
        let rest = cur
            .rest()
            .trim_start_matches(|c: char| c == ')' || c.is_whitespace());
        let subtypes = !rest.is_empty() && !rest.starts_with("#f");

        let source = match self.context.top_space() {
            Some(top) if self.context.is_multi_space() => Arc::clone(top),
            _ => Arc::clone(space),
        };
        let mut out = String::from("(");
        for atom in source.get_handles_by_type(ty, subtypes) {
            out.push_str(&self.encode(&atom, &source));
        }
        out.push(')');
        Ok(out)
    }

    fn incoming(&mut self, space: &Arc<AtomSpace>, cur: &mut Cursor<'_>, by_type: bool) -> CommandResult<String> {
        let (atom, frame) = self.framed_atom(space, cur)?;
        let ty = if by_type {
            Some(decode_type(cur, space.types())?)
        } else {
            None
        };
        let space = match frame {
            Some(frame) => frame,
            None => self.opt_space(space, cur)?,
        };
        let atom = admit(&space, &atom)?;
        let links = match ty {
            Some(ty) => space.incoming_by_type(&atom, ty),
            None => space.incoming_set(&atom),
        };
        Ok(self.encode_list(&links, &space) + "\n")
    }

    fn keys_alist(&mut self, space: &Arc<AtomSpace>, cur: &mut Cursor<'_>) -> CommandResult<String> {
        let (atom, frame) = self.framed_atom(space, cur)?;
        let space = match frame {
            Some(frame) => frame,
            None => self.opt_space(space, cur)?,
        };
        let atom = admit(&space, &atom)?;

        let mut out = String::from("(");
        for key in atom.keys() {
            out.push('(');
            out.push_str(&encode_atom(&key, space.types(), None));
            out.push_str(" . ");
            out.push_str(&encode_value(atom.value(&key).as_ref(), space.types()));
            out.push(')');
        }
        out.push_str(")\n");
        Ok(out)
    }

    fn node(&mut self, space: &Arc<AtomSpace>, cur: &mut Cursor<'_>) -> CommandResult<String> {
        let ty = decode_type(cur, space.types())?;
        let name = cur.string()?;
        let space = self.opt_space(space, cur)?;
        Ok(match space.get_node(ty, &name)? {
            Some(atom) => self.encode(&atom, &space),
            None => "()\n".to_owned(),
        })
    }

    fn link(&mut self, space: &Arc<AtomSpace>, cur: &mut Cursor<'_>) -> CommandResult<String> {
        let ty = decode_type(cur, space.types())?;
        let mut outgoing = Vec::new();
        while cur.looking_at("(") && cur.peek_head() != "AtomSpace" {
            outgoing.push(decode_atom(cur, space.types())?);
        }
        let space = self.opt_space(space, cur)?;
        Ok(match space.get_link(ty, outgoing)? {
            Some(atom) => self.encode(&atom, &space),
            None => "()\n".to_owned(),
        })
    }

    fn set_value(&mut self, space: &Arc<AtomSpace>, cur: &mut Cursor<'_>) -> CommandResult<String> {
        let (atom, atom_frame) = self.framed_atom(space, cur)?;
        let (key, key_frame) = self.framed_atom(space, cur)?;
        let value = decode_value(cur, space.types())?;

        let space = self.opt_space(space, cur)?;
        let target = atom_frame.unwrap_or_else(|| Arc::clone(&space));
        let atom = admit(&target, &atom)?;
        let key = admit(key_frame.as_ref().unwrap_or(&space), &key)?;
        let value = admit_value(&target, value)?;
        Ok(done(target.set_value(&atom, &key, value)).to_owned())
    }

    fn set_values(&mut self, space: &Arc<AtomSpace>, cur: &mut Cursor<'_>) -> CommandResult<String> {
        let (atom, frame) = self.framed_atom(space, cur)?;
        let space = match frame {
            Some(frame) => frame,
            None => self.opt_space(space, cur)?,
        };
        let atom = admit(&space, &atom)?;
        let mut stored = true;
        for (key, value) in decode_alist(cur, space.types())? {
            let key = admit(&space, &key)?;
            let value = admit_value(&space, value)?;
            stored &= space.set_value(&atom, &key, value);
        }
        Ok(done(stored).to_owned())
    }

    fn set_tv(&mut self, space: &Arc<AtomSpace>, cur: &mut Cursor<'_>) -> CommandResult<String> {
        let (atom, frame) = self.framed_atom(space, cur)?;
        let position = cur.position();
        let tv = match decode_value(cur, space.types())? {
            Some(Value::Truth(tv)) => tv,
            _ => {
                return Err(CommandError::Decode {
                    position,
                    message: "expected a truth value".to_owned(),
                });
            }
        };

        let space = match frame {
            Some(frame) => frame,
            None => self.opt_space(space, cur)?,
        };
        let Some(atom) = space.add_atom(&atom)? else {
            return Ok("#f\n".to_owned());
        };
        Ok(done(space.set_truth_value(&atom, tv)).to_owned())
    }

    fn value(&mut self, space: &Arc<AtomSpace>, cur: &mut Cursor<'_>) -> CommandResult<String> {
        let (atom, atom_frame) = self.framed_atom(space, cur)?;
        let (key, key_frame) = self.framed_atom(space, cur)?;
        let atom = admit(atom_frame.as_ref().unwrap_or(space), &atom)?;
        let key = admit(key_frame.as_ref().unwrap_or(space), &key)?;
        Ok(encode_value(atom.value(&key).as_ref(), space.types()))
    }

    fn define(&mut self, space: &Arc<AtomSpace>, cur: &mut Cursor<'_>) -> CommandResult<String> {
        let symbol = cur.symbol();
        if symbol.is_empty() {
            return Err(cur.error("expected a symbol to define"));
        }
        let spec = decode_frame(cur)?;
        self.context.define(symbol, space, &spec)?;
        Ok("()\n".to_owned())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

/// `#t`/`#f` reply for a yes-no outcome.
fn flag(ok: bool) -> &'static str {
    if ok { "#t\n" } else { "#f\n" }
}

/// `()` when a mutation went through, `#f` when the space refused it.
fn done(ok: bool) -> &'static str {
    if ok { "()\n" } else { "#f\n" }
}

/// Admit `atom`; a read-only space hands back the transient atom instead.
fn admit(space: &AtomSpace, atom: &Handle) -> CommandResult<Handle> {
    Ok(space.add_atom(atom)?.unwrap_or_else(|| Arc::clone(atom)))
}

fn admit_value(space: &AtomSpace, value: Option<Value>) -> CommandResult<Option<Value>> {
    match value {
        Some(value) => Ok(space.add_value_atoms(&value)?.or(Some(value))),
        None => Ok(None),
    }
}
