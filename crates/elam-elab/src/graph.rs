//! The expression graph: a closed sum type for expressions (`Expr`), plus
//! arenas for the two kinds of node whose identity must be mutable and
//! observable through every reference to them (`Symbol`, `Unknown`). Per
//! the arena+index design note, identity equality on those two kinds
//! becomes index equality; everything else is an ordinary owned tree.

use elam_common::{Atom, Span};
use fixedbitset::FixedBitSet;
use indexmap::IndexMap;

use crate::flags::SymbolFlags;

macro_rules! arena_index {
    ($name:ident) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

arena_index!(SymbolId);
arena_index!(VariableId);
arena_index!(UnknownId);

/// One reduction rule `(lhs, rhs)` installed on a symbol's `downValues` or
/// `upValues`.
#[derive(Clone, Debug)]
pub struct RewriteRule {
    pub lhs: Expr,
    pub rhs: Expr,
}

/// A built-in primitive evaluator. Only `Level.succ` and `Level.max` carry
/// one; both are fully applied (saturated) before the evaluator fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Primitive {
    LevelSucc,
    LevelMax,
}

impl Primitive {
    pub fn arity(self) -> usize {
        match self {
            Primitive::LevelSucc => 1,
            Primitive::LevelMax => 2,
        }
    }
}

pub struct SymbolData {
    pub name: Option<Atom>,
    pub parent: Option<SymbolId>,
    pub flags: SymbolFlags,
    pub span: Span,
    pub r#type: Option<Expr>,
    pub value: Option<Expr>,
    pub sub_symbols: IndexMap<Atom, SymbolId>,
    pub down_values: Vec<RewriteRule>,
    pub up_values: Vec<RewriteRule>,
    pub primitive: Option<Primitive>,
}

pub struct VariableData {
    pub name: Option<Atom>,
    pub default_type: Expr,
}

pub struct UnknownData {
    pub r#type: Option<Expr>,
    pub value: Option<Expr>,
    pub is_pattern: bool,
    pub excluded_variables: FixedBitSet,
}

/// The typed expression sum type. `Symbol`/`Unknown`/`Variable` are
/// indices into [`Graph`]'s arenas; everything else is an owned recursive
/// tree, since only those three kinds need identity that survives
/// mutation.
#[derive(Clone, Debug)]
pub enum Expr {
    Symbol(SymbolId),
    Variable(VariableId),
    Unknown(UnknownId),
    Number { value: i64, is_level: bool },
    String(Atom),
    Call { func: Box<Expr>, arg: Box<Expr>, color: u8 },
    FnType { input_type: Box<Expr>, arg: Option<VariableId>, output_type: Box<Expr>, color: u8 },
    Lambda { arg: Option<VariableId>, arg_type: Box<Expr>, body: Box<Expr>, color: u8 },
}

impl Expr {
    pub fn call(func: Expr, arg: Expr, color: u8) -> Expr {
        Expr::Call { func: Box::new(func), arg: Box::new(arg), color }
    }

    pub fn fn_type(input_type: Expr, arg: Option<VariableId>, output_type: Expr, color: u8) -> Expr {
        Expr::FnType {
            input_type: Box::new(input_type),
            arg,
            output_type: Box::new(output_type),
            color,
        }
    }

    pub fn lambda(arg: Option<VariableId>, arg_type: Expr, body: Expr, color: u8) -> Expr {
        Expr::Lambda { arg, arg_type: Box::new(arg_type), body: Box::new(body), color }
    }

    pub fn level(n: i64) -> Expr {
        Expr::Number { value: n, is_level: true }
    }

    pub fn number(n: i64) -> Expr {
        Expr::Number { value: n, is_level: false }
    }
}

/// The symbol ids of the built-in tree (`Type`, `builtin.{Level,number,
/// string,untyped,error-type,void}`, `Level.{succ,max}`, `unit`, `root`),
/// installed once by `builtins::install` before elaboration begins. Held on
/// `Graph` so the type solver and evaluator can reach them without a
/// separate parameter threaded through every call.
#[derive(Default, Clone, Copy)]
pub struct Builtins {
    pub type_: Option<SymbolId>,
    pub builtin: Option<SymbolId>,
    pub level: Option<SymbolId>,
    pub succ: Option<SymbolId>,
    pub max: Option<SymbolId>,
    pub number: Option<SymbolId>,
    pub string: Option<SymbolId>,
    pub untyped: Option<SymbolId>,
    pub error_type: Option<SymbolId>,
    pub void: Option<SymbolId>,
    pub unit: Option<SymbolId>,
    pub root: Option<SymbolId>,
}

macro_rules! builtin_accessor {
    ($field:ident) => {
        pub fn $field(&self) -> SymbolId {
            self.$field.expect("builtins::install must run before elaboration")
        }
    };
}

impl Builtins {
    builtin_accessor!(type_);
    builtin_accessor!(builtin);
    builtin_accessor!(level);
    builtin_accessor!(succ);
    builtin_accessor!(max);
    builtin_accessor!(number);
    builtin_accessor!(string);
    builtin_accessor!(untyped);
    builtin_accessor!(error_type);
    builtin_accessor!(void);
    builtin_accessor!(unit);
    builtin_accessor!(root);
}

/// The whole mutable elaboration state: symbol/variable/unknown arenas.
/// Single-threaded, owned by the HIR solver for the duration of one
/// elaboration run.
#[derive(Default)]
pub struct Graph {
    pub symbols: Vec<SymbolData>,
    pub variables: Vec<VariableData>,
    pub unknowns: Vec<UnknownData>,
    pub builtins: Builtins,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_symbol(
        &mut self,
        name: Option<Atom>,
        parent: Option<SymbolId>,
        flags: SymbolFlags,
        span: Span,
    ) -> SymbolId {
        let id = SymbolId(self.symbols.len() as u32);
        self.symbols.push(SymbolData {
            name,
            parent,
            flags,
            span,
            r#type: None,
            value: None,
            sub_symbols: IndexMap::new(),
            down_values: Vec::new(),
            up_values: Vec::new(),
            primitive: None,
        });
        id
    }

    pub fn symbol(&self, id: SymbolId) -> &SymbolData {
        &self.symbols[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut SymbolData {
        &mut self.symbols[id.index()]
    }

    /// Sets `symbol.value`. Per the invariant in `spec.md` §3, a value may
    /// be set at most once; the HIR solver must only call this after
    /// confirming the slot is empty.
    pub fn set_symbol_value(&mut self, id: SymbolId, value: Expr) {
        let data = self.symbol_mut(id);
        debug_assert!(data.value.is_none(), "Symbol.value written twice");
        data.value = Some(value);
    }

    pub fn set_symbol_type(&mut self, id: SymbolId, ty: Expr) {
        self.symbol_mut(id).r#type = Some(ty);
    }

    /// Registers `child` under `parent.sub_symbols[name]`. First writer
    /// wins on a name collision (two distinct built-ins may legitimately
    /// share a display name, per the `void`/`void` open question).
    pub fn register_sub_symbol(&mut self, parent: SymbolId, name: Atom, child: SymbolId) {
        self.symbol_mut(parent).sub_symbols.entry(name).or_insert(child);
    }

    pub fn new_variable(&mut self, name: Option<Atom>, default_type: Expr) -> VariableId {
        let id = VariableId(self.variables.len() as u32);
        self.variables.push(VariableData { name, default_type });
        id
    }

    pub fn variable(&self, id: VariableId) -> &VariableData {
        &self.variables[id.index()]
    }

    pub fn new_unknown(&mut self, r#type: Option<Expr>, is_pattern: bool) -> UnknownId {
        let id = UnknownId(self.unknowns.len() as u32);
        self.unknowns.push(UnknownData {
            r#type,
            value: None,
            is_pattern,
            excluded_variables: FixedBitSet::with_capacity(self.variables.len().max(1)),
        });
        id
    }

    pub fn unknown(&self, id: UnknownId) -> &UnknownData {
        &self.unknowns[id.index()]
    }

    pub fn unknown_mut(&mut self, id: UnknownId) -> &mut UnknownData {
        &mut self.unknowns[id.index()]
    }

    /// Resolves an Unknown's `.value` transitively, stopping at the first
    /// node that isn't itself a resolved Unknown.
    pub fn follow(&self, expr: &Expr) -> Expr {
        let mut current = expr.clone();
        loop {
            match current {
                Expr::Unknown(id) => match &self.unknown(id).value {
                    Some(v) => current = v.clone(),
                    None => return Expr::Unknown(id),
                },
                other => return other,
            }
        }
    }

    pub fn exclude_variable(&mut self, unknown: UnknownId, var: VariableId) {
        let bitset = &mut self.unknown_mut(unknown).excluded_variables;
        if bitset.len() <= var.index() {
            bitset.grow(var.index() + 1);
        }
        bitset.insert(var.index());
    }

    pub fn excludes(&self, unknown: UnknownId, var: VariableId) -> bool {
        self.unknown(unknown).excluded_variables.contains(var.index())
    }
}
