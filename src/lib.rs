//! Reflection of SPIR-V shader module interfaces.
//!
//! Decodes a module's binary form and extracts the external interface a
//! renderer binds against: entry points with their per-stage inputs and
//! outputs, and uniform/sampler descriptors grouped by descriptor set.
//!
//! The whole crate is a pure function from a word slice to a [`ModuleInfo`]:
//! no I/O, no shared state, and the result borrows nothing from the input.

use thiserror::Error;

mod print;
mod reflect;
pub mod spv;

pub use reflect::reflect;

/// Everything that can go wrong while decoding or reflecting a module.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    /// Bad magic number, or shorter than a module header.
    #[error("not a SPIR-V module")]
    NotSpirV,
    /// Truncated instruction, operand overshoot, or trailing operand words.
    #[error("malformed SPIR-V ({0})")]
    MalformedBinary(&'static str),
    #[error("string literal is missing its null terminator")]
    MissingNullTerminator,
    /// A reference to a result id no instruction defines.
    #[error("%{0} is not defined in the module")]
    UnknownId(u32),
    #[error("decoration does not carry the expected parameter size")]
    DecorationSizeMismatch,
    /// Structural type mismatch, e.g. a vector over a non-numeric element.
    #[error("type mismatch ({0})")]
    BadType(&'static str),
    #[error("array length is not an integer constant")]
    BadArrayLength,
    /// `Rect`, `Buffer` and `SubpassData` images have no sampler view.
    #[error("unsupported image dimensionality {0}")]
    UnsupportedImageDim(u32),
    /// A uniform variable without a `DescriptorSet` or `Binding` decoration.
    #[error("variable is missing its {0} decoration")]
    MissingDecoration(&'static str),
    /// An execution model outside the six canonical graphics stages.
    #[error("unsupported execution model {0}")]
    UnsupportedStage(u32),
    #[error("interface variable has storage class {0}, expected Input or Output")]
    BadStorageClass(u32),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Element category of a numeric or sampled type.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScalarKind {
    Float,
    Int,
    Uint,
}

/// Scalar, vector, or matrix type.
///
/// A scalar has `rows == cols == 1`; a vector has `cols == 1`; a matrix has
/// both greater than one. Strides are in bytes; `col_stride` is only
/// meaningful where a `MatrixStride` decoration reached the type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumericType {
    pub kind: ScalarKind,
    /// Element width in bits.
    pub width: u32,
    pub rows: u32,
    pub cols: u32,
    pub row_stride: u32,
    pub col_stride: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayType {
    pub elem: Box<Type>,
    pub count: u64,
    /// `ArrayStride` decoration, absent on types without a physical layout.
    pub stride: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructMember {
    pub name: String,
    pub ty: Type,
    /// `Offset` decoration, absent on types without a physical layout.
    pub offset: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructType {
    pub name: String,
    pub members: Vec<StructMember>,
}

/// Geometric arity of a sampled image, with its arrayness folded in.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ViewType {
    D1,
    D1Array,
    D2,
    D2Array,
    D3,
    Cube,
    CubeArray,
}

/// A combined image/sampler descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplerType {
    pub channel: ScalarKind,
    pub view: ViewType,
    pub multisampled: bool,
    pub shadow: bool,
}

/// A resolved shader type, fully detached from the decoded module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Numeric(NumericType),
    Array(ArrayType),
    Struct(StructType),
    Sampler(SamplerType),
}

/// The six canonical graphics stages, in pipeline order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Vertex,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
    Fragment,
    Compute,
}

/// One descriptor, or one stage input/output.
///
/// `index` is the binding index for descriptors and the location for stage
/// interface variables.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariableInfo {
    pub index: u32,
    pub name: String,
    pub ty: Type,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescriptorSetInfo {
    pub set: u32,
    /// Sorted by `index`.
    pub descriptors: Vec<VariableInfo>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryPointInfo {
    pub stage: Stage,
    pub name: String,
    /// Sorted by location.
    pub inputs: Vec<VariableInfo>,
    /// Sorted by location.
    pub outputs: Vec<VariableInfo>,
}

/// The reflected external interface of a module.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Sorted by `set`.
    pub descriptor_sets: Vec<DescriptorSetInfo>,
    /// Sorted by `(stage, name)`.
    pub entry_points: Vec<EntryPointInfo>,
}
