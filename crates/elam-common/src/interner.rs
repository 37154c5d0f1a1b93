//! String interning for identifier deduplication.
//!
//! Every identifier the lexer produces is interned once; downstream stages
//! compare `Atom`s by value equality (a `u32` compare) instead of re-hashing
//! or re-comparing the underlying text.

use rustc_hash::FxHashMap;

/// An interned string. Cheap to copy and compare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(u32);

impl Atom {
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    lookup: FxHashMap<Box<str>, Atom>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, text: &str) -> Atom {
        if let Some(&atom) = self.lookup.get(text) {
            return atom;
        }
        let atom = Atom(self.strings.len() as u32);
        let boxed: Box<str> = text.into();
        self.strings.push(boxed.clone());
        self.lookup.insert(boxed, atom);
        atom
    }

    pub fn resolve(&self, atom: Atom) -> &str {
        &self.strings[atom.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_the_same_text_returns_the_same_atom() {
        let mut interner = Interner::new();
        let a = interner.intern("foo");
        let b = interner.intern("foo");
        assert_eq!(a, b);
        let c = interner.intern("bar");
        assert_ne!(a, c);
    }

    #[test]
    fn resolve_roundtrips_the_original_text() {
        let mut interner = Interner::new();
        let atom = interner.intern("hello");
        assert_eq!(interner.resolve(atom), "hello");
    }
}
