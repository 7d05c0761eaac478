//! S-expression codec for atoms, values and frames.
//!
//! Decoding works on a [`Cursor`] so the interpreter can pull arguments off
//! a command one at a time. Encoding uses short type names (`Concept`,
//! `List`) and escapes `"` and `\` inside node names.
//!
//! ```text
//! (Concept "cat")
//! (List (Concept "a") (Concept "b") (stv 0.9 0.8))
//! (FloatValue 1 2 3)   (StringValue "a" "b")   (LinkValue (FloatValue 1) (Concept "x"))
//! (AtomSpace "top" (AtomSpace "base"))
//! ```

use crate::atom::{escape_name, Atom, Handle, TruthValue, Value};
use crate::types::{AtomType, TypeOracle};

use super::{CommandError, CommandResult};

/// Read position inside one command string.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    /// Unread remainder.
    pub fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    pub fn skip_whitespace(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn at_end(&self) -> bool {
        self.rest().trim_start().is_empty()
    }

    /// Whether the next non-blank text starts with `prefix`.
    pub fn looking_at(&mut self, prefix: &str) -> bool {
        self.skip_whitespace();
        self.rest().starts_with(prefix)
    }

    pub fn advance(&mut self, bytes: usize) {
        self.pos = (self.pos + bytes).min(self.text.len());
    }

    pub fn error(&self, message: impl Into<String>) -> CommandError {
        CommandError::Decode {
            position: self.pos,
            message: message.into(),
        }
    }

    pub fn expect(&mut self, c: char) -> CommandResult<()> {
        self.skip_whitespace();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            Ok(())
        } else {
            Err(self.error(format!("expected '{c}'")))
        }
    }

    /// Run of characters up to whitespace or a parenthesis.
    pub fn symbol(&mut self) -> &'a str {
        self.skip_whitespace();
        let rest = self.rest();
        let len = rest
            .find(|c: char| c.is_whitespace() || c == '(' || c == ')')
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// The symbol that follows the next `(`, without consuming anything.
    pub fn peek_head(&self) -> &'a str {
        let mut ahead = self.clone();
        ahead.skip_whitespace();
        if ahead.peek() != Some('(') {
            return "";
        }
        ahead.pos += 1;
        ahead.symbol()
    }

    /// A double-quoted string with `\` escapes.
    pub fn string(&mut self) -> CommandResult<String> {
        self.expect('"')?;
        let mut out = String::new();
        let mut escaped = false;
        for (offset, c) in self.rest().char_indices() {
            if escaped {
                out.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                self.pos += offset + 1;
                return Ok(out);
            } else {
                out.push(c);
            }
        }
        Err(self.error("unterminated string"))
    }

    pub fn number(&mut self) -> CommandResult<f64> {
        let start = self.pos;
        let sym = self.symbol();
        sym.parse::<f64>().map_err(|_| CommandError::Decode {
            position: start,
            message: format!("expected a number, found `{sym}`"),
        })
    }
}

/// A decoded `(AtomSpace "name" base...)` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSpec {
    pub name: String,
    pub bases: Vec<FrameSpec>,
}

// ----- decoding -----

/// `'Concept` or `'ConceptNode`.
pub fn decode_type(cur: &mut Cursor<'_>, types: &dyn TypeOracle) -> CommandResult<AtomType> {
    cur.expect('\'')?;
    let name = cur.symbol();
    types
        .type_by_name(name)
        .ok_or_else(|| CommandError::UnknownType {
            name: name.to_owned(),
        })
}

fn lookup_type(cur: &Cursor<'_>, types: &dyn TypeOracle, name: &str) -> CommandResult<AtomType> {
    if name.is_empty() {
        return Err(cur.error("expected a type name"));
    }
    types
        .type_by_name(name)
        .ok_or_else(|| CommandError::UnknownType {
            name: name.to_owned(),
        })
}

/// One atom expression. A trailing `(stv s c)` sets the truth value of the
/// decoded atom; a trailing `(AtomSpace ...)` is dropped. Use
/// [`decode_atom_framed`] to keep it.
pub fn decode_atom(cur: &mut Cursor<'_>, types: &dyn TypeOracle) -> CommandResult<Handle> {
    decode_atom_framed(cur, types).map(|(atom, _)| atom)
}

/// One atom expression plus the `(AtomSpace ...)` frame it names, if any.
/// Frames on nested children are ignored.
pub fn decode_atom_framed(
    cur: &mut Cursor<'_>,
    types: &dyn TypeOracle,
) -> CommandResult<(Handle, Option<FrameSpec>)> {
    cur.expect('(')?;
    let name = cur.symbol();
    let ty = lookup_type(cur, types, name)?;

    let mut tv = None;
    let mut frame = None;
    let atom = if types.is_node(ty) {
        let name = cur.string()?;
        decode_annotations(cur, types, &mut tv, &mut frame)?;
        Atom::node(types, ty, name)?
    } else {
        let mut outgoing = Vec::new();
        loop {
            cur.skip_whitespace();
            match cur.peek() {
                Some(')') => break,
                Some('(') => match cur.peek_head() {
                    "stv" | "SimpleTruthValue" | "AtomSpace" => {
                        decode_annotations(cur, types, &mut tv, &mut frame)?;
                    }
                    _ => outgoing.push(decode_atom(cur, types)?),
                },
                _ => return Err(cur.error("expected an atom or ')'")),
            }
        }
        Atom::link(types, ty, outgoing)?
    };
    cur.expect(')')?;

    if let Some(tv) = tv {
        atom.set_truth_value(tv);
    }
    Ok((atom, frame))
}

fn decode_annotations(
    cur: &mut Cursor<'_>,
    types: &dyn TypeOracle,
    tv: &mut Option<TruthValue>,
    frame: &mut Option<FrameSpec>,
) -> CommandResult<()> {
    loop {
        match cur.peek_head() {
            "stv" | "SimpleTruthValue" => {
                if let Some(Value::Truth(t)) = decode_value(cur, types)? {
                    *tv = Some(t);
                }
            }
            "AtomSpace" => {
                *frame = Some(decode_frame(cur)?);
            }
            _ => return Ok(()),
        }
    }
}

/// One value expression. `#f` and `()` decode to `None`.
pub fn decode_value(cur: &mut Cursor<'_>, types: &dyn TypeOracle) -> CommandResult<Option<Value>> {
    if cur.looking_at("#f") {
        cur.advance(2);
        return Ok(None);
    }
    let value = match cur.peek_head() {
        "FloatValue" => {
            open(cur)?;
            let mut numbers = Vec::new();
            while !cur.looking_at(")") && !cur.at_end() {
                numbers.push(cur.number()?);
            }
            Value::Float(numbers)
        }
        "StringValue" => {
            open(cur)?;
            let mut strings = Vec::new();
            while cur.looking_at("\"") {
                strings.push(cur.string()?);
            }
            Value::String(strings)
        }
        "LinkValue" => {
            open(cur)?;
            let mut items = Vec::new();
            while cur.looking_at("(") {
                match decode_value(cur, types)? {
                    Some(v) => items.push(v),
                    None => return Err(cur.error("empty value inside LinkValue")),
                }
            }
            Value::Link(items)
        }
        "stv" | "SimpleTruthValue" => {
            open(cur)?;
            let strength = cur.number()?;
            let confidence = cur.number()?;
            Value::Truth(TruthValue::new(strength, confidence))
        }
        "" => {
            cur.expect('(')?;
            cur.expect(')')?;
            return Ok(None);
        }
        _ => return decode_atom(cur, types).map(|atom| Some(Value::Atom(atom))),
    };
    cur.expect(')')?;
    Ok(Some(value))
}

/// Consume `(` and the head symbol.
fn open(cur: &mut Cursor<'_>) -> CommandResult<()> {
    cur.expect('(')?;
    cur.symbol();
    Ok(())
}

/// `(AtomSpace "name" (AtomSpace "base") ...)`.
pub fn decode_frame(cur: &mut Cursor<'_>) -> CommandResult<FrameSpec> {
    if cur.peek_head() != "AtomSpace" {
        return Err(cur.error("expected (AtomSpace ...)"));
    }
    open(cur)?;
    let name = cur.string()?;
    let mut bases = Vec::new();
    while cur.looking_at("(") {
        bases.push(decode_frame(cur)?);
    }
    cur.expect(')')?;
    Ok(FrameSpec { name, bases })
}

/// An association list of key atoms to values, either dotted
/// (`((key . value) ...)`) or spelled out (`(alist (cons key value) ...)`).
pub fn decode_alist(
    cur: &mut Cursor<'_>,
    types: &dyn TypeOracle,
) -> CommandResult<Vec<(Handle, Option<Value>)>> {
    let mut pairs = Vec::new();
    if cur.peek_head() == "alist" {
        open(cur)?;
        while cur.looking_at("(") {
            if cur.peek_head() != "cons" {
                return Err(cur.error("expected (cons key value)"));
            }
            open(cur)?;
            let key = decode_atom(cur, types)?;
            let value = decode_value(cur, types)?;
            cur.expect(')')?;
            pairs.push((key, value));
        }
    } else {
        cur.expect('(')?;
        while cur.looking_at("(") {
            cur.expect('(')?;
            let key = decode_atom(cur, types)?;
            cur.expect('.')?;
            let value = decode_value(cur, types)?;
            cur.expect(')')?;
            pairs.push((key, value));
        }
    }
    cur.expect(')')?;
    Ok(pairs)
}

// ----- encoding -----

/// Encode an atom. With `frame`, the owning space is appended as
/// `(AtomSpace "name")` inside the outermost expression.
pub fn encode_atom(atom: &Atom, types: &dyn TypeOracle, frame: Option<&str>) -> String {
    let mut out = String::new();
    write_atom(&mut out, atom, types);
    if let Some(name) = frame {
        out.pop();
        out.push_str(&format!(" (AtomSpace \"{}\"))", escape_name(name)));
    }
    out
}

fn write_atom(out: &mut String, atom: &Atom, types: &dyn TypeOracle) {
    out.push('(');
    out.push_str(&types.short_name(atom.atom_type()));
    match atom.name() {
        Some(name) => {
            out.push_str(" \"");
            out.push_str(&escape_name(name));
            out.push('"');
        }
        None => {
            for child in atom.outgoing() {
                out.push(' ');
                write_atom(out, child, types);
            }
        }
    }
    out.push(')');
}

/// Encode a value; `None` encodes as `()`.
pub fn encode_value(value: Option<&Value>, types: &dyn TypeOracle) -> String {
    match value {
        None => "()".to_owned(),
        Some(Value::Float(numbers)) => {
            let mut out = String::from("(FloatValue");
            for n in numbers {
                out.push_str(&format!(" {n}"));
            }
            out.push(')');
            out
        }
        Some(Value::String(strings)) => {
            let mut out = String::from("(StringValue");
            for s in strings {
                out.push_str(&format!(" \"{}\"", escape_name(s)));
            }
            out.push(')');
            out
        }
        Some(Value::Link(items)) => {
            let mut out = String::from("(LinkValue");
            for item in items {
                out.push(' ');
                out.push_str(&encode_value(Some(item), types));
            }
            out.push(')');
            out
        }
        Some(Value::Truth(tv)) => {
            format!("(SimpleTruthValue {} {})", tv.strength, tv.confidence)
        }
        Some(Value::Atom(atom)) => encode_atom(atom, types, None),
    }
}
