//! The arena-allocated derived type nodes and the top-level [`Type`] enum.

use cc_arena::IdentHandle;

use crate::tag::{qual, PrimitiveTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTagKind {
    Struct,
    Union,
}

#[derive(Debug, Clone, Copy)]
pub struct Field<'a> {
    pub name: Option<IdentHandle>,
    pub ty: &'a Type<'a>,
    /// Width in bits, for a bit-field member.
    pub bit_width: Option<u32>,
}

#[derive(Debug)]
pub struct RecordDef<'a> {
    pub fields: Vec<Field<'a>>,
}

#[derive(Debug)]
pub struct RecordType<'a> {
    pub tag_kind: RecordTagKind,
    pub name: Option<IdentHandle>,
    pub def: Option<&'a RecordDef<'a>>,
}

#[derive(Debug)]
pub struct EnumType<'a> {
    pub name: Option<IdentHandle>,
    pub variants: Option<&'a [(IdentHandle, i64)]>,
}

#[derive(Debug, Clone, Copy)]
pub struct Param<'a> {
    pub name: Option<IdentHandle>,
    pub ty: &'a Type<'a>,
}

#[derive(Debug)]
pub struct FunctionType<'a> {
    pub return_type: &'a Type<'a>,
    pub params: &'a [Param<'a>],
    pub variadic: bool,
}

#[derive(Debug)]
pub struct PointerType<'a> {
    pub pointee: &'a Type<'a>,
    pub qualifiers: u64,
}

/// An array's size: a known constant extent, an unsized `[]` (only legal as
/// an incomplete type or a flexible array member), or a variable-length
/// size bound by a run-time expression. The expression itself lives in
/// `cc_ir`'s arena; `cc_types` only needs a stable id for it (`cc_ir`
/// depends on `cc_types`, not the other way around, so the id is opaque
/// here and resolved by whoever holds both the type and the IR arena).
#[derive(Debug)]
pub enum ArraySize {
    Unsized,
    Constant(u64),
    VariableLength(u32),
}

#[derive(Debug)]
pub struct ArrayType<'a> {
    pub element: &'a Type<'a>,
    pub size: ArraySize,
}

#[derive(Debug)]
pub struct BitFieldType<'a> {
    pub underlying: &'a Type<'a>,
    pub width: u32,
}

#[derive(Debug)]
pub struct BitIntType<'a> {
    pub underlying: &'a Type<'a>,
    pub width: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorKind {
    Generic,
    AltiVec,
    Neon,
    SveFixedLength,
}

#[derive(Debug)]
pub struct VectorType<'a> {
    pub element: &'a Type<'a>,
    pub count: u32,
    pub kind: VectorKind,
}

/// The tagged discriminated type record (§3 "Type"). Every variant except
/// [`Type::Primitive`] borrows its payload from the translation unit's
/// arena, so cyclic shapes (a struct containing a pointer to itself) are
/// expressed through the arena reference, never through ownership.
#[derive(Debug)]
pub enum Type<'a> {
    Primitive(PrimitiveTag),
    Pointer(PointerType<'a>),
    Array(ArrayType<'a>),
    Function(FunctionType<'a>),
    Record(RecordType<'a>),
    Enum(EnumType<'a>),
    BitField(BitFieldType<'a>),
    BitInt(BitIntType<'a>),
    Vector(VectorType<'a>),
}

impl<'a> Type<'a> {
    pub fn is_scalar(&self) -> bool {
        match self {
            Type::Pointer(_) => true,
            Type::Primitive(p) => !p.has_qual(qual::VOID),
            Type::Enum(_) => true,
            _ => false,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Primitive(p) if p.has_qual(qual::VOID))
    }

    pub fn is_nullptr_t(&self) -> bool {
        matches!(self, Type::Primitive(p) if p.has_qual(qual::NULLPTR))
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Type::Function(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }
}
