//! SPIR-V instruction schema: declarative operand-role tables.
//!
//! One table maps each supported opcode to the ordered list of operand roles
//! the decoder consumes, so extending coverage is a data change here rather
//! than a control-flow change in [`read`](super::read).

use arrayvec::ArrayVec;
use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

/// Word count of the module header (magic, version, generator, bound, schema).
pub const HEADER_LEN: usize = 5;

/// First word of every SPIR-V module.
pub const MAGIC: u32 = 0x0723_0203;

/// A SPIR-V opcode, the low 16 bits of an instruction's first word.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Opcode(pub u16);

impl Opcode {
    /// Schema lookup; `None` for opcodes outside the supported set.
    pub fn def(self) -> Option<&'static InstructionDef> {
        Spec::get().instructions.get(&self)
    }

    pub fn name(self) -> &'static str {
        self.def().map_or("(unknown opcode)", |def| def.name)
    }
}

/// How the decoder consumes one operand of an instruction.
///
/// Fixed slots (`Id`, `Num`) carry the index of the positional
/// `ids[_]`/`nums[_]` entry they populate on [`Inst`](super::Inst).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum OperandRole {
    /// The SSA id this instruction defines.
    ResultId,
    /// One id operand, stored at the given fixed slot.
    Id(usize),
    /// Zero or one trailing id (the `OpVariable` initializer).
    OptionalId,
    /// All remaining words, as ids.
    IdList,
    /// One integer literal, stored at the given fixed slot.
    Num(usize),
    /// A NUL-terminated string packed little-endian four bytes per word.
    String,
    /// All remaining words, raw (decoration parameters, constant bit patterns).
    WordList,

    // Single-word enum literals, stored raw on the instruction.
    ExecutionModel,
    StorageClass,
    Dim,
    AccessQualifier,
    Decoration,
    ImageFormat,
    FunctionControl,

    /// `AccessQualifier`, present only if operand words remain.
    OptAccessQualifier,
}

/// Schema entry for one opcode: its name and ordered operand roles.
pub struct InstructionDef {
    pub name: &'static str,
    pub roles: ArrayVec<OperandRole, 9>,
}

pub struct Spec {
    pub instructions: FxHashMap<Opcode, InstructionDef>,
}

impl Spec {
    /// The lazily-built schema (significant work only on the first call).
    #[must_use]
    pub fn get() -> &'static Spec {
        lazy_static! {
            static ref SPEC: Spec = Spec::build();
        }
        &SPEC
    }
}

macro_rules! def_schema {
    ($($name:ident = $word:literal => [$($role:expr),* $(,)?]),+ $(,)?) => {
        /// Named opcode constants for every instruction in the schema.
        #[allow(non_upper_case_globals)]
        pub mod op {
            use super::Opcode;
            $(pub const $name: Opcode = Opcode($word);)+
        }

        impl Spec {
            fn build() -> Spec {
                use OperandRole::*;
                let mut instructions = FxHashMap::default();
                $({
                    let roles: &[OperandRole] = &[$($role),*];
                    instructions.insert(op::$name, InstructionDef {
                        name: stringify!($name),
                        roles: roles.iter().copied().collect(),
                    });
                })+
                Spec { instructions }
            }
        }
    };
}

def_schema! {
    OpNop = 0 => [],
    OpUndef = 1 => [Id(0), ResultId],
    OpSourceContinued = 2 => [String],
    OpSourceExtension = 4 => [String],
    OpName = 5 => [Id(0), String],
    OpMemberName = 6 => [Id(0), Num(0), String],
    OpString = 7 => [ResultId, String],
    OpLine = 8 => [Id(0), Num(0), Num(1)],
    OpEntryPoint = 15 => [ExecutionModel, Id(0), String, IdList],
    OpTypeVoid = 19 => [ResultId],
    OpTypeBool = 20 => [ResultId],
    OpTypeInt = 21 => [ResultId, Num(0), Num(1)],
    OpTypeFloat = 22 => [ResultId, Num(0)],
    OpTypeVector = 23 => [ResultId, Id(0), Num(0)],
    OpTypeMatrix = 24 => [ResultId, Id(0), Num(0)],
    OpTypeImage = 25 => [
        ResultId, Id(0), Dim, Num(0), Num(1), Num(2), Num(3), ImageFormat, OptAccessQualifier,
    ],
    OpTypeSampler = 26 => [ResultId],
    OpTypeSampledImage = 27 => [ResultId, Id(0)],
    OpTypeArray = 28 => [ResultId, Id(0), Id(1)],
    OpTypeRuntimeArray = 29 => [ResultId, Id(0)],
    OpTypeStruct = 30 => [ResultId, IdList],
    OpTypeOpaque = 31 => [ResultId, String],
    OpTypePointer = 32 => [ResultId, StorageClass, Id(0)],
    OpTypeFunction = 33 => [ResultId, Id(0), IdList],
    OpTypeEvent = 34 => [ResultId],
    OpTypeDeviceEvent = 35 => [ResultId],
    OpTypeReserveId = 36 => [ResultId],
    OpTypeQueue = 37 => [ResultId],
    OpTypeForwardPointer = 39 => [Id(0), StorageClass],
    OpConstantTrue = 41 => [Id(0), ResultId],
    OpConstantFalse = 42 => [Id(0), ResultId],
    OpConstant = 43 => [Id(0), ResultId, WordList],
    OpConstantComposite = 44 => [Id(0), ResultId, IdList],
    OpFunction = 54 => [Id(0), ResultId, FunctionControl, Id(1)],
    OpVariable = 59 => [Id(0), ResultId, StorageClass, OptionalId],
    OpDecorate = 71 => [Id(0), Decoration, WordList],
    OpMemberDecorate = 72 => [Id(0), Num(0), Decoration, WordList],
}

// Well-known values of the enum-typed operands reflection inspects.
// Enum operands are stored raw on `Inst`; nothing forces a decoded module's
// words into these sets.

#[allow(non_upper_case_globals)]
pub mod execution_model {
    pub const Vertex: u32 = 0;
    pub const TessellationControl: u32 = 1;
    pub const TessellationEvaluation: u32 = 2;
    pub const Geometry: u32 = 3;
    pub const Fragment: u32 = 4;
    pub const GLCompute: u32 = 5;
}

#[allow(non_upper_case_globals)]
pub mod storage_class {
    pub const UniformConstant: u32 = 0;
    pub const Input: u32 = 1;
    pub const Uniform: u32 = 2;
    pub const Output: u32 = 3;
}

#[allow(non_upper_case_globals)]
pub mod dim {
    pub const Dim1D: u32 = 0;
    pub const Dim2D: u32 = 1;
    pub const Dim3D: u32 = 2;
    pub const Cube: u32 = 3;
    pub const Rect: u32 = 4;
    pub const Buffer: u32 = 5;
    pub const SubpassData: u32 = 6;
}

#[allow(non_upper_case_globals)]
pub mod decoration {
    pub const ArrayStride: u32 = 6;
    pub const MatrixStride: u32 = 7;
    pub const BuiltIn: u32 = 11;
    pub const Location: u32 = 30;
    pub const Binding: u32 = 33;
    pub const DescriptorSet: u32 = 34;
    pub const Offset: u32 = 35;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_coherent() {
        for def in Spec::get().instructions.values() {
            assert!(def.name.starts_with("Op"), "{}", def.name);

            let mut result_ids = 0;
            let mut tail_seen = false;
            for &role in &def.roles {
                assert!(!tail_seen, "{}: roles after a variadic tail", def.name);
                match role {
                    OperandRole::ResultId => result_ids += 1,
                    OperandRole::Id(slot) | OperandRole::Num(slot) => {
                        assert!(slot < 4, "{}: fixed slot out of range", def.name);
                    }
                    OperandRole::IdList
                    | OperandRole::WordList
                    | OperandRole::OptionalId
                    | OperandRole::OptAccessQualifier => tail_seen = true,
                    _ => {}
                }
            }
            assert!(result_ids <= 1, "{}: multiple result ids", def.name);
        }
    }

    #[test]
    fn opcode_names_round_trip() {
        assert_eq!(op::OpTypeStruct.name(), "OpTypeStruct");
        assert_eq!(Opcode(0xffff).name(), "(unknown opcode)");
        assert!(Opcode(0xffff).def().is_none());
    }
}
