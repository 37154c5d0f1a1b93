//! Symbol flags, controlling which mutable fields a `Symbol` is allowed to
//! acquire over its lifetime.

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SymbolFlags: u8 {
        /// Symbol's `type` may be declared (an explicit `SymbolType` HIR
        /// register targeting it is legal).
        const ALLOW_DEF_TYPE = 1 << 0;
        /// Symbol's `value` may be set once (an explicit `SymbolAssign` is
        /// legal).
        const ALLOW_ASSIGNMENT = 1 << 1;
        /// Rewrite rules keyed by this symbol as the head of a call
        /// (`downValues`) may be installed.
        const ALLOW_DOWN_VALUE = 1 << 2;
        /// Rewrite rules where this symbol appears as an argument head
        /// (`upValues`) may be installed.
        const ALLOW_UP_VALUE = 1 << 3;
        /// Prunable if unreferenced. Not acted on by this implementation
        /// (see the orphan-Unknown open question in DESIGN.md) but carried
        /// so a future mark-and-sweep pass has somewhere to look.
        const AUTO_REMOVE = 1 << 4;
        /// Do not unfold `value` during evaluation even if `ownValue` is
        /// requested.
        const HOLD = 1 << 5;
    }
}

impl SymbolFlags {
    /// Flags for a user-declared top-level symbol (`name : T = v;`):
    /// everything but `Hold`/`AutoRemove`.
    pub const USER_DECLARATION: SymbolFlags = SymbolFlags::ALLOW_DEF_TYPE
        .union(SymbolFlags::ALLOW_ASSIGNMENT)
        .union(SymbolFlags::ALLOW_DOWN_VALUE)
        .union(SymbolFlags::ALLOW_UP_VALUE);

    /// A rigid built-in with no further assignment allowed (e.g. `Type`,
    /// `number`).
    pub const RIGID_BUILTIN: SymbolFlags = SymbolFlags::empty();
}
