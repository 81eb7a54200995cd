//! Identifier interning.
//!
//! Variable names and attribute names are interned once by the frontend.
//! Comparing two [`Symbol`]s compares *names*; variable identity is carried
//! separately by `VarId`.

use string_interner::{StringInterner, DefaultSymbol, backend::StringBackend, Symbol as SymbolTrait};
use std::fmt;
use std::sync::RwLock;
use serde::{Serialize, Serializer};
use once_cell::sync::Lazy;

type Backend = StringBackend<DefaultSymbol>;

/// An interned identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u32);

impl Symbol {
    /// Intern `s` in the global interner.
    pub fn intern(s: &str) -> Self {
        intern(s)
    }

    /// Resolve to an owned string. Unknown symbols resolve to `"<?>"`.
    pub fn as_string(&self) -> String {
        resolve(*self).unwrap_or_else(|| "<?>".to_string())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({}:{})", self.0, self.as_string())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_string())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        intern(s)
    }
}

static GLOBAL_INTERNER: Lazy<RwLock<StringInterner<Backend>>> =
    Lazy::new(|| RwLock::new(StringInterner::new()));

/// Intern a string in the global interner.
pub fn intern(s: &str) -> Symbol {
    // A poisoned lock still holds a consistent interner: insertion either
    // happened or it did not.
    let mut interner = GLOBAL_INTERNER.write().unwrap_or_else(|e| e.into_inner());
    let sym = interner.get_or_intern(s);
    Symbol(sym.to_usize() as u32)
}

/// Resolve a symbol from the global interner.
pub fn resolve(sym: Symbol) -> Option<String> {
    let interner = GLOBAL_INTERNER.read().unwrap_or_else(|e| e.into_inner());
    let internal_sym = DefaultSymbol::try_from_usize(sym.0 as usize)?;
    interner.resolve(internal_sym).map(|s| s.to_string())
}

/// Attribute names understood by the loop classifier.
pub mod attrs {
    use super::Symbol;
    use once_cell::sync::Lazy;

    pub static KERNEL: Lazy<Symbol> = Lazy::new(|| super::intern("kernel"));
    pub static OUTER: Lazy<Symbol> = Lazy::new(|| super::intern("outer"));
    pub static INNER: Lazy<Symbol> = Lazy::new(|| super::intern("inner"));
}
