//! Low-level decoding of SPIR-V binary form.

use log::debug;

use super::spec::{self, OperandRole};
use super::{Inst, Module};
use crate::{Error, Result};

/// Cursor over the operand words of a single instruction.
///
/// Every read is bounded by the instruction's end, which is how truncated
/// operands and overshooting schemas are caught.
struct WordReader<'a> {
    words: &'a [u32],
    cur: usize,
}

impl<'a> WordReader<'a> {
    fn new(words: &'a [u32]) -> Self {
        WordReader { words, cur: 0 }
    }

    fn is_exhausted(&self) -> bool {
        self.cur == self.words.len()
    }

    fn word(&mut self) -> Result<u32> {
        let word = *self
            .words
            .get(self.cur)
            .ok_or(Error::MalformedBinary("truncated instruction"))?;
        self.cur += 1;
        Ok(word)
    }

    /// All remaining words of the instruction, as a raw tail.
    fn rest(&mut self) -> &'a [u32] {
        let rest = &self.words[self.cur..];
        self.cur = self.words.len();
        rest
    }

    /// A NUL-terminated string packed little-endian four bytes per word,
    /// consuming the terminator and its padding through the word boundary.
    fn string(&mut self) -> Result<String> {
        let bytes: Vec<u8> =
            self.words[self.cur..].iter().flat_map(|w| w.to_le_bytes()).collect();
        let len = bytes.iter().position(|&b| b == 0).ok_or(Error::MissingNullTerminator)?;
        self.cur += len / 4 + 1;
        Ok(String::from_utf8_lossy(&bytes[..len]).into_owned())
    }
}

/// Decode one instruction's operand words, driven by its schema entry.
fn decode_inst(op: spec::Opcode, def: &spec::InstructionDef, operands: &[u32]) -> Result<Inst> {
    let mut r = WordReader::new(operands);
    let mut inst = Inst::new(op);
    for &role in &def.roles {
        match role {
            OperandRole::ResultId => inst.result_id = Some(r.word()?),
            OperandRole::Id(slot) => inst.ids[slot] = r.word()?,
            OperandRole::OptionalId => {
                if !r.is_exhausted() {
                    inst.var_ids.push(r.word()?);
                }
            }
            OperandRole::IdList => inst.var_ids.extend_from_slice(r.rest()),
            OperandRole::Num(slot) => inst.nums[slot] = r.word()?,
            OperandRole::String => inst.string = r.string()?,
            OperandRole::WordList => inst.words.extend_from_slice(r.rest()),
            OperandRole::ExecutionModel => inst.execution_model = r.word()?,
            OperandRole::StorageClass => inst.storage_class = r.word()?,
            OperandRole::Dim => inst.dim = r.word()?,
            OperandRole::AccessQualifier => inst.access_qualifier = Some(r.word()?),
            OperandRole::OptAccessQualifier => {
                if !r.is_exhausted() {
                    inst.access_qualifier = Some(r.word()?);
                }
            }
            OperandRole::Decoration => inst.decoration = r.word()?,
            OperandRole::ImageFormat => inst.image_format = r.word()?,
            OperandRole::FunctionControl => inst.function_control = r.word()?,
        }
    }

    // The schema must consume the instruction's entire word count.
    if !r.is_exhausted() {
        return Err(Error::MalformedBinary("instruction contains extra operands"));
    }
    Ok(inst)
}

impl Module {
    /// Decode a module from its raw words.
    ///
    /// Instructions with opcodes outside the schema are retained with only
    /// their opcode populated; their claimed word length is still respected.
    pub fn read_from_words(words: &[u32]) -> Result<Module> {
        if words.len() < spec::HEADER_LEN || words[0] != spec::MAGIC {
            return Err(Error::NotSpirV);
        }
        let (version, generator_id, schema_id) = (words[1], words[2], words[4]);
        debug!("SPIR-V module: version {version:#x}, generator {generator_id:#x}");

        let mut insts = Vec::new();
        let mut rest = &words[spec::HEADER_LEN..];
        while let [header, ..] = rest {
            let (len, op) = ((header >> 16) as usize, spec::Opcode(*header as u16));
            if len == 0 {
                return Err(Error::MalformedBinary("zero-length instruction"));
            }
            if len > rest.len() {
                return Err(Error::MalformedBinary("incomplete instruction"));
            }
            let (inst_words, tail) = rest.split_at(len);
            rest = tail;

            insts.push(match op.def() {
                Some(def) => decode_inst(op, def, &inst_words[1..])?,
                None => Inst::new(op),
            });
        }

        debug!("decoded {} instructions", insts.len());
        Ok(Module::assemble(version, generator_id, schema_id, insts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spv::spec::op;

    fn inst(op: spec::Opcode, operands: &[u32]) -> Vec<u32> {
        let mut words = vec![u32::from(op.0) | ((operands.len() as u32 + 1) << 16)];
        words.extend_from_slice(operands);
        words
    }

    fn module_words(insts: Vec<Vec<u32>>) -> Vec<u32> {
        let mut words = vec![spec::MAGIC, 0x0001_0300, 0x0002_0001, 100, 7];
        words.extend(insts.into_iter().flatten());
        words
    }

    #[test]
    fn header_fields_are_recorded() {
        let module = Module::read_from_words(&module_words(vec![])).unwrap();
        assert_eq!(module.version, 0x0001_0300);
        assert_eq!(module.generator_id, 0x0002_0001);
        assert_eq!(module.schema_id, 7);
        assert!(module.insts.is_empty());
    }

    #[test]
    fn short_or_unmagical_input_is_not_spirv() {
        assert_eq!(Module::read_from_words(&[]).unwrap_err(), Error::NotSpirV);
        assert_eq!(
            Module::read_from_words(&[spec::MAGIC, 0, 0, 0]).unwrap_err(),
            Error::NotSpirV,
        );
        assert_eq!(
            Module::read_from_words(&[0xdead_beef, 0, 0, 0, 0]).unwrap_err(),
            Error::NotSpirV,
        );
    }

    #[test]
    fn unknown_opcodes_are_skipped_by_length() {
        let module = Module::read_from_words(&module_words(vec![
            inst(spec::Opcode(999), &[1, 2, 3]),
            inst(op::OpTypeFloat, &[1, 32]),
        ]))
        .unwrap();
        assert_eq!(module.insts.len(), 2);
        assert_eq!(module.insts[0].op, spec::Opcode(999));
        assert_eq!(module.insts[0].result_id, None);
        assert_eq!(module.insts[1].op, op::OpTypeFloat);
        assert_eq!(module.insts[1].result_id, Some(1));
        assert_eq!(module.insts[1].nums[0], 32);
    }

    #[test]
    fn overshooting_instruction_length_is_malformed() {
        let mut words = module_words(vec![]);
        words.push(u32::from(op::OpTypeVoid.0) | (3 << 16));
        words.push(1);
        assert!(matches!(
            Module::read_from_words(&words).unwrap_err(),
            Error::MalformedBinary(_),
        ));
    }

    #[test]
    fn zero_length_instruction_is_malformed() {
        let mut words = module_words(vec![]);
        words.push(u32::from(op::OpNop.0));
        assert!(matches!(
            Module::read_from_words(&words).unwrap_err(),
            Error::MalformedBinary(_),
        ));
    }

    #[test]
    fn trailing_operands_are_malformed() {
        let words = module_words(vec![inst(op::OpTypeFloat, &[1, 32, 99])]);
        assert!(matches!(
            Module::read_from_words(&words).unwrap_err(),
            Error::MalformedBinary(_),
        ));
    }

    #[test]
    fn truncated_operands_are_malformed() {
        // `OpTypeFloat` wants a result id and a width; give it only the id.
        let words = module_words(vec![inst(op::OpTypeFloat, &[1])]);
        assert!(matches!(
            Module::read_from_words(&words).unwrap_err(),
            Error::MalformedBinary(_),
        ));
    }

    #[test]
    fn strings_unpack_with_padding() {
        // "abcd" occupies a full word, so the terminator needs one more.
        let words = module_words(vec![inst(
            op::OpName,
            &[6, u32::from_le_bytes(*b"abcd"), 0],
        )]);
        let module = Module::read_from_words(&words).unwrap();
        assert_eq!(module.insts[0].string, "abcd");
        assert_eq!(module.name(6), "abcd");
    }

    #[test]
    fn unterminated_string_is_rejected() {
        let words = module_words(vec![inst(
            op::OpName,
            &[6, u32::from_le_bytes(*b"abcd")],
        )]);
        assert_eq!(
            Module::read_from_words(&words).unwrap_err(),
            Error::MissingNullTerminator,
        );
    }

    #[test]
    fn variable_initializer_is_optional() {
        let module = Module::read_from_words(&module_words(vec![
            inst(op::OpVariable, &[1, 2, spec::storage_class::Uniform]),
            inst(op::OpVariable, &[1, 3, spec::storage_class::Uniform, 9]),
        ]))
        .unwrap();
        assert!(module.insts[0].var_ids.is_empty());
        assert_eq!(module.insts[1].var_ids[..], [9]);
    }

    #[test]
    fn constant_payload_words_are_captured() {
        let module = Module::read_from_words(&module_words(vec![inst(
            op::OpConstant,
            &[1, 2, 0xdead_beef, 0x1234_5678],
        )]))
        .unwrap();
        assert_eq!(module.insts[0].words[..], [0xdead_beef, 0x1234_5678]);
    }

    #[test]
    fn first_name_and_decoration_win() {
        let module = Module::read_from_words(&module_words(vec![
            inst(op::OpName, &[6, u32::from_le_bytes(*b"a\0\0\0")]),
            inst(op::OpName, &[6, u32::from_le_bytes(*b"b\0\0\0")]),
            inst(op::OpDecorate, &[6, spec::decoration::Binding, 1]),
            inst(op::OpDecorate, &[6, spec::decoration::Binding, 2]),
        ]))
        .unwrap();
        assert_eq!(module.name(6), "a");
        assert_eq!(module.name(7), "");
        assert_eq!(module.decoration_u32(6, spec::decoration::Binding).unwrap(), Some(1));
    }

    #[test]
    fn oversized_decoration_payload_is_a_size_mismatch() {
        let module = Module::read_from_words(&module_words(vec![inst(
            op::OpDecorate,
            &[6, spec::decoration::Binding, 1, 2],
        )]))
        .unwrap();
        assert_eq!(
            module.decoration_u32(6, spec::decoration::Binding).unwrap_err(),
            Error::DecorationSizeMismatch,
        );
    }
}
