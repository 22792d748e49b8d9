//! The C type system: a packed 64-bit tag for primitive types plus
//! arena-allocated nodes for derived types (pointer, array, function,
//! record, enum, bit-field, `_BitInt`, vector).
//!
//! - [`tag`]: [`PrimitiveTag`] and its bit layout.
//! - [`types`]: the [`Type`] enum and its derived-type payload structs.
//! - [`table`]: canonicalizing constructors plus `type_equal`/`compatible`.

pub mod tag;
pub mod table;
pub mod types;

pub use tag::{FloatKind, IntegerKind, PrimitiveKind, PrimitiveTag};
pub use table::{compatible, type_equal, TypeTable};
pub use types::{
    ArraySize, ArrayType, BitFieldType, BitIntType, EnumType, Field, FunctionType, Param,
    PointerType, RecordDef, RecordTagKind, RecordType, Type, VectorKind, VectorType,
};
