//! Decoded SPIR-V modules and the lookups reflection performs over them.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{Error, Result};

pub mod read;
pub mod spec;

use spec::Opcode;

/// One decoded instruction.
///
/// Which fields are meaningful is dictated by the opcode's schema
/// ([`spec::InstructionDef`]); everything the schema does not name is left
/// at its default.
#[derive(Clone, Debug)]
pub struct Inst {
    pub op: Opcode,
    /// The SSA id this instruction defines, if any.
    pub result_id: Option<u32>,
    /// Fixed positional id operands.
    pub ids: [u32; 4],
    /// Variadic id tail (also the lone optional initializer id of `OpVariable`).
    pub var_ids: SmallVec<[u32; 4]>,
    /// Fixed positional integer literals.
    pub nums: [u32; 4],
    /// String payload, when the schema carries one.
    pub string: String,
    /// Raw word payload (decoration parameters, constant bit patterns).
    pub words: SmallVec<[u32; 2]>,

    // Single-word enum operands, stored raw; `spec` has well-known values
    // for the ones reflection inspects.
    pub execution_model: u32,
    pub storage_class: u32,
    pub dim: u32,
    pub decoration: u32,
    pub image_format: u32,
    pub function_control: u32,
    pub access_qualifier: Option<u32>,
}

impl Inst {
    pub(crate) fn new(op: Opcode) -> Inst {
        Inst {
            op,
            result_id: None,
            ids: [0; 4],
            var_ids: SmallVec::new(),
            nums: [0; 4],
            string: String::new(),
            words: SmallVec::new(),
            execution_model: 0,
            storage_class: 0,
            dim: 0,
            decoration: 0,
            image_format: 0,
            function_control: 0,
            access_qualifier: None,
        }
    }
}

/// A decoded module: the header fields plus instructions in file order.
///
/// Instructions are never reordered, deduplicated, or rewritten, so indices
/// and iteration order match the binary.
#[derive(Debug)]
pub struct Module {
    pub version: u32,
    pub generator_id: u32,
    pub schema_id: u32,
    pub insts: Vec<Inst>,

    /// First defining instruction per result id.
    by_result_id: FxHashMap<u32, usize>,
}

impl Module {
    pub(crate) fn assemble(
        version: u32,
        generator_id: u32,
        schema_id: u32,
        insts: Vec<Inst>,
    ) -> Module {
        let mut by_result_id = FxHashMap::default();
        for (i, inst) in insts.iter().enumerate() {
            if let Some(id) = inst.result_id {
                by_result_id.entry(id).or_insert(i);
            }
        }
        Module { version, generator_id, schema_id, insts, by_result_id }
    }

    /// The instruction defining `id`.
    pub fn instruction(&self, id: u32) -> Result<&Inst> {
        self.by_result_id.get(&id).map(|&i| &self.insts[i]).ok_or(Error::UnknownId(id))
    }

    /// The `OpName` payload for `id`, or `""`; the first match wins.
    pub fn name(&self, id: u32) -> &str {
        self.insts
            .iter()
            .find(|i| i.op == spec::op::OpName && i.ids[0] == id)
            .map_or("", |i| &i.string)
    }

    /// The `OpMemberName` payload for member `index` of `id`, or `""`.
    pub fn member_name(&self, id: u32, index: u32) -> &str {
        self.insts
            .iter()
            .find(|i| i.op == spec::op::OpMemberName && i.ids[0] == id && i.nums[0] == index)
            .map_or("", |i| &i.string)
    }

    /// Raw parameter words of an `OpDecorate` of kind `decoration` on `id`.
    pub fn decoration(&self, id: u32, decoration: u32) -> Option<&[u32]> {
        self.insts
            .iter()
            .find(|i| i.op == spec::op::OpDecorate && i.ids[0] == id && i.decoration == decoration)
            .map(|i| &i.words[..])
    }

    /// Raw parameter words of an `OpMemberDecorate` on member `index` of `id`.
    pub fn member_decoration(&self, id: u32, index: u32, decoration: u32) -> Option<&[u32]> {
        self.insts
            .iter()
            .find(|i| {
                i.op == spec::op::OpMemberDecorate
                    && i.ids[0] == id
                    && i.nums[0] == index
                    && i.decoration == decoration
            })
            .map(|i| &i.words[..])
    }

    /// A decoration expected to carry exactly one parameter word.
    pub fn decoration_u32(&self, id: u32, decoration: u32) -> Result<Option<u32>> {
        self.decoration(id, decoration).map(one_word).transpose()
    }

    /// A member decoration expected to carry exactly one parameter word.
    pub fn member_decoration_u32(
        &self,
        id: u32,
        index: u32,
        decoration: u32,
    ) -> Result<Option<u32>> {
        self.member_decoration(id, index, decoration).map(one_word).transpose()
    }
}

fn one_word(words: &[u32]) -> Result<u32> {
    match *words {
        [word] => Ok(word),
        _ => Err(Error::DecorationSizeMismatch),
    }
}
