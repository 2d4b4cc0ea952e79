//! GLSL-flavoured display of reflected types, for diagnostics and the dump
//! front-end.

use std::fmt;

use crate::{ArrayType, NumericType, SamplerType, ScalarKind, StructType, Type, ViewType};

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Numeric(t) => t.fmt(f),
            Type::Array(t) => t.fmt(f),
            Type::Struct(t) => t.fmt(f),
            Type::Sampler(t) => t.fmt(f),
        }
    }
}

impl fmt::Display for NumericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.rows == 1 && self.cols == 1 {
            return f.write_str(match (self.kind, self.width) {
                (ScalarKind::Float, 64) => "double",
                (ScalarKind::Float, _) => "float",
                (ScalarKind::Int, _) => "int",
                (ScalarKind::Uint, _) => "uint",
            });
        }
        let prefix = match (self.kind, self.width) {
            (ScalarKind::Float, 64) => "d",
            (ScalarKind::Float, _) => "",
            (ScalarKind::Int, _) => "i",
            (ScalarKind::Uint, _) => "u",
        };
        if self.cols == 1 {
            write!(f, "{prefix}vec{}", self.rows)
        } else if self.cols == self.rows {
            write!(f, "{prefix}mat{}", self.rows)
        } else {
            write!(f, "{prefix}mat{}x{}", self.cols, self.rows)
        }
    }
}

impl fmt::Display for ArrayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(stride) = self.stride {
            write!(f, "layout(stride={stride}) ")?;
        }
        write!(f, "{}[{}]", self.elem, self.count)
    }
}

impl fmt::Display for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "struct {} {{", self.name)?;
        for member in &self.members {
            f.write_str("  ")?;
            if let Some(offset) = member.offset {
                write!(f, "layout(offset={offset}) ")?;
            }
            writeln!(f, "{} : {}", member.name, member.ty)?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for SamplerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self.channel {
            ScalarKind::Float => "",
            ScalarKind::Int => "i",
            ScalarKind::Uint => "u",
        })?;
        let (base, arrayed) = match self.view {
            ViewType::D1 => ("sampler1D", false),
            ViewType::D1Array => ("sampler1D", true),
            ViewType::D2 => ("sampler2D", false),
            ViewType::D2Array => ("sampler2D", true),
            ViewType::D3 => ("sampler3D", false),
            ViewType::Cube => ("samplerCube", false),
            ViewType::CubeArray => ("samplerCube", true),
        };
        f.write_str(base)?;
        if self.multisampled {
            f.write_str("MS")?;
        }
        if arrayed {
            f.write_str("Array")?;
        }
        if self.shadow {
            f.write_str("Shadow")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(kind: ScalarKind, width: u32) -> NumericType {
        NumericType { kind, width, rows: 1, cols: 1, row_stride: 0, col_stride: 0 }
    }

    #[test]
    fn numeric_types_print_glsl_names() {
        assert_eq!(scalar(ScalarKind::Float, 32).to_string(), "float");
        assert_eq!(scalar(ScalarKind::Float, 64).to_string(), "double");
        assert_eq!(scalar(ScalarKind::Uint, 32).to_string(), "uint");
        assert_eq!(
            NumericType { rows: 3, row_stride: 4, ..scalar(ScalarKind::Int, 32) }.to_string(),
            "ivec3",
        );
        assert_eq!(
            NumericType { rows: 4, cols: 4, row_stride: 4, col_stride: 16, ..scalar(ScalarKind::Float, 32) }
                .to_string(),
            "mat4",
        );
        assert_eq!(
            NumericType { rows: 3, cols: 2, row_stride: 4, col_stride: 16, ..scalar(ScalarKind::Float, 32) }
                .to_string(),
            "mat2x3",
        );
    }

    #[test]
    fn sampler_types_print_glsl_names() {
        let sampler = SamplerType {
            channel: ScalarKind::Uint,
            view: ViewType::CubeArray,
            multisampled: false,
            shadow: true,
        };
        assert_eq!(sampler.to_string(), "usamplerCubeArrayShadow");
    }
}
