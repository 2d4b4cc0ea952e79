//! Reflection over a decoded module: folds type definitions into the public
//! type tree and extracts the per-stage interface.

use itertools::Itertools;
use log::debug;

use crate::spv::spec::{decoration, dim, execution_model, op, storage_class};
use crate::spv::{Inst, Module};
use crate::{
    ArrayType, DescriptorSetInfo, EntryPointInfo, Error, ModuleInfo, NumericType, Result,
    SamplerType, ScalarKind, Stage, StructMember, StructType, Type, VariableInfo, ViewType,
};

/// Reflect the external interface of a module given its raw words.
///
/// This is the crate's entry point; see [`ModuleInfo`] for the shape of the
/// result. Parsing is all-or-nothing: any error yields no partial output.
pub fn reflect(words: &[u32]) -> Result<ModuleInfo> {
    ModuleInfo::reflect(&Module::read_from_words(words)?)
}

fn stage_of(model: u32) -> Result<Stage> {
    Ok(match model {
        execution_model::Vertex => Stage::Vertex,
        execution_model::TessellationControl => Stage::TessellationControl,
        execution_model::TessellationEvaluation => Stage::TessellationEvaluation,
        execution_model::Geometry => Stage::Geometry,
        execution_model::Fragment => Stage::Fragment,
        execution_model::GLCompute => Stage::Compute,
        other => return Err(Error::UnsupportedStage(other)),
    })
}

fn view_type(dim_word: u32, arrayed: bool) -> Result<ViewType> {
    Ok(match (dim_word, arrayed) {
        (dim::Dim1D, false) => ViewType::D1,
        (dim::Dim1D, true) => ViewType::D1Array,
        (dim::Dim2D, false) => ViewType::D2,
        (dim::Dim2D, true) => ViewType::D2Array,
        // No 3D-array views exist; the array bit is ignored there.
        (dim::Dim3D, _) => ViewType::D3,
        (dim::Cube, false) => ViewType::Cube,
        (dim::Cube, true) => ViewType::CubeArray,
        (other, _) => return Err(Error::UnsupportedImageDim(other)),
    })
}

/// Fold `OpTypeFloat`/`OpTypeInt`/`OpTypeVector`/`OpTypeMatrix` into a
/// [`NumericType`], recursing through element types.
fn resolve_numeric(module: &Module, inst: &Inst, matrix_stride: u32) -> Result<NumericType> {
    match inst.op {
        op::OpTypeFloat => Ok(NumericType {
            kind: ScalarKind::Float,
            width: inst.nums[0],
            rows: 1,
            cols: 1,
            row_stride: 0,
            col_stride: 0,
        }),
        op::OpTypeInt => Ok(NumericType {
            kind: if inst.nums[1] != 0 { ScalarKind::Int } else { ScalarKind::Uint },
            width: inst.nums[0],
            rows: 1,
            cols: 1,
            row_stride: 0,
            col_stride: 0,
        }),
        op::OpTypeVector => {
            let elem = resolve_numeric(module, module.instruction(inst.ids[0])?, matrix_stride)?;
            Ok(NumericType { rows: inst.nums[0], row_stride: elem.width / 8, ..elem })
        }
        op::OpTypeMatrix => {
            let column = resolve_numeric(module, module.instruction(inst.ids[0])?, matrix_stride)?;
            Ok(NumericType { cols: inst.nums[0], col_stride: matrix_stride, ..column })
        }
        _ => Err(Error::BadType("expected a numeric type")),
    }
}

/// An array length is an `OpConstant` of integer type; its bit pattern is
/// read per the type's width and signedness.
fn decode_array_length(module: &Module, inst: &Inst) -> Result<u64> {
    if inst.op != op::OpConstant {
        return Err(Error::BadArrayLength);
    }
    let ty = module.instruction(inst.ids[0])?;
    if ty.op != op::OpTypeInt {
        return Err(Error::BadArrayLength);
    }
    let signed = ty.nums[1] != 0;
    match (ty.nums[0], &inst.words[..]) {
        (32, &[w]) => Ok(if signed { w as i32 as i64 as u64 } else { w.into() }),
        (64, &[lo, hi]) => Ok((u64::from(hi) << 32) | u64::from(lo)),
        _ => Err(Error::BadArrayLength),
    }
}

/// Fold the type-defining instruction for `id` into a [`Type`].
///
/// `matrix_stride` is threaded from the closest enclosing struct member's
/// `MatrixStride` decoration; it propagates unchanged through non-matrix
/// children, and a later member without its own decoration inherits the
/// value left by an earlier one.
fn resolve_type(module: &Module, id: u32, matrix_stride: u32) -> Result<Type> {
    let inst = module.instruction(id)?;
    match inst.op {
        op::OpTypeStruct => {
            let mut matrix_stride = matrix_stride;
            let mut members = Vec::with_capacity(inst.var_ids.len());
            for (i, &member_ty) in inst.var_ids.iter().enumerate() {
                let i = i as u32;
                // Interface structs may have no physical layout, so Offset
                // is not required here.
                let offset = module.member_decoration_u32(id, i, decoration::Offset)?;
                if let Some(stride) =
                    module.member_decoration_u32(id, i, decoration::MatrixStride)?
                {
                    matrix_stride = stride;
                }
                members.push(StructMember {
                    name: module.member_name(id, i).to_owned(),
                    ty: resolve_type(module, member_ty, matrix_stride)?,
                    offset,
                });
            }
            Ok(Type::Struct(StructType { name: module.name(id).to_owned(), members }))
        }
        op::OpTypeArray => {
            let stride = module.decoration_u32(id, decoration::ArrayStride)?;
            let elem = resolve_type(module, inst.ids[0], matrix_stride)?;
            let count = decode_array_length(module, module.instruction(inst.ids[1])?)?;
            Ok(Type::Array(ArrayType { elem: Box::new(elem), count, stride }))
        }
        op::OpTypeSampledImage => {
            let image = module.instruction(inst.ids[0])?;
            if image.op != op::OpTypeImage {
                return Err(Error::BadType("sampled image over a non-image type"));
            }
            let channel = resolve_numeric(module, module.instruction(image.ids[0])?, 0)?.kind;
            Ok(Type::Sampler(SamplerType {
                channel,
                view: view_type(image.dim, image.nums[1] == 1)?,
                multisampled: image.nums[2] == 1,
                shadow: image.nums[0] == 1,
            }))
        }
        _ => resolve_numeric(module, inst, matrix_stride).map(Type::Numeric),
    }
}

impl ModuleInfo {
    /// Walk a decoded module and extract its external interface.
    pub fn reflect(module: &Module) -> Result<ModuleInfo> {
        let mut uniforms: Vec<(u32, VariableInfo)> = Vec::new();
        let mut entry_points = Vec::new();
        let mut unnamed = 0u32;

        for inst in &module.insts {
            // Uniform blocks have storage class Uniform; samplers have
            // storage class UniformConstant.
            if inst.op == op::OpVariable
                && (inst.storage_class == storage_class::Uniform
                    || inst.storage_class == storage_class::UniformConstant)
            {
                let Some(id) = inst.result_id else { continue };
                let pointer = module.instruction(inst.ids[0])?;
                if pointer.op != op::OpTypePointer {
                    return Err(Error::BadType("uniform variable type is not a pointer"));
                }
                let mut name = module.name(id).to_owned();
                if name.is_empty() {
                    name = format!("${unnamed}");
                    unnamed += 1;
                }
                let set = module
                    .decoration_u32(id, decoration::DescriptorSet)?
                    .ok_or(Error::MissingDecoration("DescriptorSet"))?;
                let binding = module
                    .decoration_u32(id, decoration::Binding)?
                    .ok_or(Error::MissingDecoration("Binding"))?;
                let ty = resolve_type(module, pointer.ids[0], 0)?;
                uniforms.push((set, VariableInfo { index: binding, name, ty }));
            }

            if inst.op == op::OpEntryPoint {
                let stage = stage_of(inst.execution_model)?;
                let mut inputs = Vec::new();
                let mut outputs = Vec::new();
                for &var_id in &inst.var_ids {
                    let var = module.instruction(var_id)?;
                    // Interface variables without an explicit location are
                    // built-in blocks (gl_PerVertex and friends); they are
                    // not part of the app-visible interface.
                    let Some(location) =
                        module.decoration_u32(var_id, decoration::Location)?
                    else {
                        continue;
                    };
                    let pointer = module.instruction(var.ids[0])?;
                    if pointer.op != op::OpTypePointer {
                        return Err(Error::BadType("interface variable type is not a pointer"));
                    }
                    let info = VariableInfo {
                        index: location,
                        name: module.name(var_id).to_owned(),
                        ty: resolve_type(module, pointer.ids[0], 0)?,
                    };
                    match var.storage_class {
                        storage_class::Input => inputs.push(info),
                        storage_class::Output => outputs.push(info),
                        other => return Err(Error::BadStorageClass(other)),
                    }
                }
                inputs.sort_by_key(|v| v.index);
                outputs.sort_by_key(|v| v.index);
                entry_points.push(EntryPointInfo {
                    stage,
                    name: inst.string.clone(),
                    inputs,
                    outputs,
                });
            }
        }

        debug!(
            "reflected {} descriptors across {} entry points",
            uniforms.len(),
            entry_points.len(),
        );

        uniforms.sort_by_key(|(set, v)| (*set, v.index));
        let mut descriptor_sets = Vec::new();
        for (set, group) in &uniforms.into_iter().group_by(|&(set, _)| set) {
            descriptor_sets.push(DescriptorSetInfo {
                set,
                descriptors: group.map(|(_, v)| v).collect(),
            });
        }

        entry_points.sort_by(|a, b| {
            (a.stage, a.name.as_str()).cmp(&(b.stage, b.name.as_str()))
        });

        Ok(ModuleInfo { descriptor_sets, entry_points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_type_joins_dim_and_arrayness() {
        assert_eq!(view_type(dim::Dim1D, true).unwrap(), ViewType::D1Array);
        assert_eq!(view_type(dim::Dim2D, false).unwrap(), ViewType::D2);
        assert_eq!(view_type(dim::Cube, true).unwrap(), ViewType::CubeArray);
        assert_eq!(view_type(dim::Dim3D, true).unwrap(), ViewType::D3);
        assert_eq!(view_type(dim::Rect, false).unwrap_err(), Error::UnsupportedImageDim(dim::Rect));
        assert_eq!(
            view_type(dim::SubpassData, false).unwrap_err(),
            Error::UnsupportedImageDim(dim::SubpassData),
        );
    }

    #[test]
    fn stages_cover_exactly_the_graphics_models() {
        assert_eq!(stage_of(execution_model::Vertex).unwrap(), Stage::Vertex);
        assert_eq!(stage_of(execution_model::GLCompute).unwrap(), Stage::Compute);
        // 6 is OpenCL's Kernel model.
        assert_eq!(stage_of(6).unwrap_err(), Error::UnsupportedStage(6));
    }
}
