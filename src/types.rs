//! Type system for ASL
//!
//! Interns value types into a small arena so that equality between two
//! `TypeId`s is a plain integer comparison. Mirrors the structural shape of
//! the original `TypesMgr`: primitives, fixed-length one-dimensional arrays
//! of a primitive element, positional-parameter function signatures, a
//! `Void` return marker, and an `Error` sentinel that suppresses cascading
//! diagnostics once a subtree is already ill-typed.

use std::collections::HashMap;

/// Interned handle for a value type. Two `TypeId`s compare equal iff they
/// were interned from structurally equal `TypeKind`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(u32);

/// A basic (primitive) type, also used as the element type of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Int,
    Float,
    Bool,
    Char,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TypeKind {
    Basic(BasicType),
    Array { size: u32, elem: TypeId },
    Function { params: Vec<TypeId>, ret: TypeId },
    Void,
    Error,
}

/// Arena of interned types. Owns the mapping from `TypeId` back to its
/// structural description; all predicates and relations in this module take
/// a `&TypeInterner` alongside the `TypeId`s they inspect.
#[derive(Debug)]
pub struct TypeInterner {
    kinds: Vec<TypeKind>,
    index: HashMap<TypeKind, TypeId>,
    void: TypeId,
    error: TypeId,
    int: TypeId,
    float: TypeId,
    bool_: TypeId,
    char_: TypeId,
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeInterner {
    pub fn new() -> Self {
        let mut kinds = Vec::new();
        let mut index = HashMap::new();

        let mut intern = |kind: TypeKind, kinds: &mut Vec<TypeKind>, index: &mut HashMap<TypeKind, TypeId>| -> TypeId {
            let id = TypeId(kinds.len() as u32);
            kinds.push(kind.clone());
            index.insert(kind, id);
            id
        };

        let void = intern(TypeKind::Void, &mut kinds, &mut index);
        let error = intern(TypeKind::Error, &mut kinds, &mut index);
        let int = intern(TypeKind::Basic(BasicType::Int), &mut kinds, &mut index);
        let float = intern(TypeKind::Basic(BasicType::Float), &mut kinds, &mut index);
        let bool_ = intern(TypeKind::Basic(BasicType::Bool), &mut kinds, &mut index);
        let char_ = intern(TypeKind::Basic(BasicType::Char), &mut kinds, &mut index);

        TypeInterner {
            kinds,
            index,
            void,
            error,
            int,
            float,
            bool_,
            char_,
        }
    }

    fn intern(&mut self, kind: TypeKind) -> TypeId {
        if let Some(id) = self.index.get(&kind) {
            return *id;
        }
        let id = TypeId(self.kinds.len() as u32);
        self.kinds.push(kind.clone());
        self.index.insert(kind, id);
        id
    }

    fn kind(&self, ty: TypeId) -> &TypeKind {
        &self.kinds[ty.0 as usize]
    }

    pub fn void(&self) -> TypeId {
        self.void
    }

    pub fn error(&self) -> TypeId {
        self.error
    }

    pub fn basic(&self, b: BasicType) -> TypeId {
        match b {
            BasicType::Int => self.int,
            BasicType::Float => self.float,
            BasicType::Bool => self.bool_,
            BasicType::Char => self.char_,
        }
    }

    pub fn array(&mut self, size: u32, elem: BasicType) -> TypeId {
        let elem_ty = self.basic(elem);
        self.intern(TypeKind::Array { size, elem: elem_ty })
    }

    pub fn function(&mut self, params: Vec<TypeId>, ret: TypeId) -> TypeId {
        self.intern(TypeKind::Function { params, ret })
    }

    // --- predicates ---

    pub fn is_int(&self, t: TypeId) -> bool {
        matches!(self.kind(t), TypeKind::Basic(BasicType::Int))
    }

    pub fn is_float(&self, t: TypeId) -> bool {
        matches!(self.kind(t), TypeKind::Basic(BasicType::Float))
    }

    pub fn is_bool(&self, t: TypeId) -> bool {
        matches!(self.kind(t), TypeKind::Basic(BasicType::Bool))
    }

    pub fn is_char(&self, t: TypeId) -> bool {
        matches!(self.kind(t), TypeKind::Basic(BasicType::Char))
    }

    pub fn is_numeric(&self, t: TypeId) -> bool {
        self.is_int(t) || self.is_float(t)
    }

    pub fn is_primitive(&self, t: TypeId) -> bool {
        matches!(self.kind(t), TypeKind::Basic(_))
    }

    pub fn is_array(&self, t: TypeId) -> bool {
        matches!(self.kind(t), TypeKind::Array { .. })
    }

    pub fn is_function(&self, t: TypeId) -> bool {
        matches!(self.kind(t), TypeKind::Function { .. })
    }

    pub fn is_void(&self, t: TypeId) -> bool {
        matches!(self.kind(t), TypeKind::Void)
    }

    pub fn is_error(&self, t: TypeId) -> bool {
        matches!(self.kind(t), TypeKind::Error)
    }

    pub fn size_of(&self, t: TypeId) -> u32 {
        match self.kind(t) {
            TypeKind::Array { size, .. } => *size,
            _ => 1,
        }
    }

    pub fn array_elem(&self, t: TypeId) -> Option<TypeId> {
        match self.kind(t) {
            TypeKind::Array { elem, .. } => Some(*elem),
            _ => None,
        }
    }

    pub fn array_len(&self, t: TypeId) -> Option<u32> {
        match self.kind(t) {
            TypeKind::Array { size, .. } => Some(*size),
            _ => None,
        }
    }

    pub fn func_param(&self, t: TypeId, i: usize) -> Option<TypeId> {
        match self.kind(t) {
            TypeKind::Function { params, .. } => params.get(i).copied(),
            _ => None,
        }
    }

    pub fn func_arity(&self, t: TypeId) -> Option<usize> {
        match self.kind(t) {
            TypeKind::Function { params, .. } => Some(params.len()),
            _ => None,
        }
    }

    pub fn func_return(&self, t: TypeId) -> Option<TypeId> {
        match self.kind(t) {
            TypeKind::Function { ret, .. } => Some(*ret),
            _ => None,
        }
    }

    /// Assignability: true iff `rhs` can be stored into a location of type
    /// `lhs`. Same primitive, Int widening to Float, or structurally equal
    /// arrays (neither side `Error`).
    pub fn copyable(&self, lhs: TypeId, rhs: TypeId) -> bool {
        if lhs == rhs && !self.is_error(lhs) {
            return true;
        }
        if self.is_float(lhs) && self.is_int(rhs) {
            return true;
        }
        if self.is_error(lhs) || self.is_error(rhs) {
            return false;
        }
        if let (TypeKind::Array { size: s1, elem: e1 }, TypeKind::Array { size: s2, elem: e2 }) =
            (self.kind(lhs), self.kind(rhs))
        {
            return s1 == s2 && e1 == e2;
        }
        false
    }

    /// Comparability for relational/equality operators. `op` distinguishes
    /// `==`/`!=` (any same-kind primitive, Int<->Float allowed) from
    /// ordering operators (numeric, or both `Char`).
    pub fn comparable(&self, lhs: TypeId, rhs: TypeId, op: CompareOp) -> bool {
        match op {
            CompareOp::Equality => {
                if self.is_numeric(lhs) && self.is_numeric(rhs) {
                    return true;
                }
                self.is_bool(lhs) && self.is_bool(rhs) || self.is_char(lhs) && self.is_char(rhs)
            }
            CompareOp::Ordering => {
                (self.is_numeric(lhs) && self.is_numeric(rhs))
                    || (self.is_char(lhs) && self.is_char(rhs))
            }
        }
    }
}

/// Which comparability rule applies: equality and ordering are checked
/// differently, since `==`/`!=` allow crossing Int and Float but the
/// four ordering operators only accept numeric-with-numeric or char-with-char.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equality,
    Ordering,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_interned_once() {
        let types = TypeInterner::new();
        assert_eq!(types.basic(BasicType::Int), types.basic(BasicType::Int));
        assert_ne!(types.basic(BasicType::Int), types.basic(BasicType::Float));
    }

    #[test]
    fn arrays_intern_structurally() {
        let mut types = TypeInterner::new();
        let a1 = types.array(10, BasicType::Int);
        let a2 = types.array(10, BasicType::Int);
        let a3 = types.array(5, BasicType::Int);
        assert_eq!(a1, a2);
        assert_ne!(a1, a3);
        assert_eq!(types.size_of(a1), 10);
        assert_eq!(types.array_elem(a1), Some(types.basic(BasicType::Int)));
    }

    #[test]
    fn copyable_allows_int_to_float_widening() {
        let types = TypeInterner::new();
        let int = types.basic(BasicType::Int);
        let float = types.basic(BasicType::Float);
        assert!(types.copyable(float, int));
        assert!(!types.copyable(int, float));
        assert!(types.copyable(int, int));
    }

    #[test]
    fn copyable_rejects_error_on_either_side_for_arrays() {
        let mut types = TypeInterner::new();
        let arr = types.array(4, BasicType::Int);
        let err = types.error();
        assert!(!types.copyable(arr, err));
        assert!(!types.copyable(err, arr));
    }

    #[test]
    fn comparable_equality_allows_int_float_crossing() {
        let types = TypeInterner::new();
        let int = types.basic(BasicType::Int);
        let float = types.basic(BasicType::Float);
        let bool_ = types.basic(BasicType::Bool);
        assert!(types.comparable(int, float, CompareOp::Equality));
        assert!(!types.comparable(int, bool_, CompareOp::Equality));
    }

    #[test]
    fn comparable_ordering_allows_char_char_not_char_int() {
        let types = TypeInterner::new();
        let char_ = types.basic(BasicType::Char);
        let int = types.basic(BasicType::Int);
        assert!(types.comparable(char_, char_, CompareOp::Ordering));
        assert!(!types.comparable(char_, int, CompareOp::Ordering));
    }

    #[test]
    fn function_type_exposes_params_and_return() {
        let mut types = TypeInterner::new();
        let int = types.basic(BasicType::Int);
        let void = types.void();
        let f = types.function(vec![int, int], void);
        assert_eq!(types.func_arity(f), Some(2));
        assert_eq!(types.func_param(f, 0), Some(int));
        assert_eq!(types.func_param(f, 2), None);
        assert_eq!(types.func_return(f), Some(void));
        assert!(types.is_function(f));
    }
}
