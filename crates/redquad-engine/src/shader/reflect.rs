//! WGSL front end: parse, validate and reflect a vertex/fragment pair into a
//! `ProgramInterface`.

use std::collections::HashMap;
use std::fmt;

use naga::{
    AddressSpace, Binding, Function, Handle, Module, ScalarKind, ShaderStage, Type, TypeInner,
};

use super::error::{ShaderError, Stage};

/// Per-vertex input format of an attribute.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AttributeFormat {
    Float32,
    Float32x2,
    Float32x3,
    Float32x4,
}

impl AttributeFormat {
    fn from_components(n: u32) -> Option<Self> {
        match n {
            1 => Some(Self::Float32),
            2 => Some(Self::Float32x2),
            3 => Some(Self::Float32x3),
            4 => Some(Self::Float32x4),
            _ => None,
        }
    }

    pub fn components(self) -> u32 {
        match self {
            Self::Float32 => 1,
            Self::Float32x2 => 2,
            Self::Float32x3 => 3,
            Self::Float32x4 => 4,
        }
    }

    /// Size of one element in bytes.
    pub fn size(self) -> u64 {
        u64::from(self.components()) * 4
    }

    pub fn to_wgpu(self) -> wgpu::VertexFormat {
        match self {
            Self::Float32 => wgpu::VertexFormat::Float32,
            Self::Float32x2 => wgpu::VertexFormat::Float32x2,
            Self::Float32x3 => wgpu::VertexFormat::Float32x3,
            Self::Float32x4 => wgpu::VertexFormat::Float32x4,
        }
    }
}

impl fmt::Display for AttributeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(wgsl_float_name(self.components()))
    }
}

/// Type of a uniform slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
}

impl UniformKind {
    fn from_components(n: u32) -> Option<Self> {
        match n {
            1 => Some(Self::Float),
            2 => Some(Self::Vec2),
            3 => Some(Self::Vec3),
            4 => Some(Self::Vec4),
            _ => None,
        }
    }

    pub fn components(self) -> u32 {
        match self {
            Self::Float => 1,
            Self::Vec2 => 2,
            Self::Vec3 => 3,
            Self::Vec4 => 4,
        }
    }

    /// Size of the value in bytes (without padding).
    pub fn size(self) -> u64 {
        u64::from(self.components()) * 4
    }
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(wgsl_float_name(self.components()))
    }
}

fn wgsl_float_name(components: u32) -> &'static str {
    match components {
        1 => "f32",
        2 => "vec2<f32>",
        3 => "vec3<f32>",
        _ => "vec4<f32>",
    }
}

/// A vertex-stage input.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeInfo {
    pub name: String,
    pub location: u32,
    pub format: AttributeFormat,
}

/// A `var<uniform>` global, possibly shared by both stages.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformInfo {
    pub name: String,
    pub group: u32,
    pub binding: u32,
    pub kind: UniformKind,
    pub stages: wgpu::ShaderStages,
}

/// Everything a device needs to know about a linked program.
///
/// Attributes are sorted by location; an attribute's index in the list is the
/// vertex buffer slot it is fed from. Uniforms are sorted by binding.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramInterface {
    pub vertex_entry: String,
    pub fragment_entry: String,
    pub attributes: Vec<AttributeInfo>,
    pub uniforms: Vec<UniformInfo>,
}

impl ProgramInterface {
    /// Looks up an attribute by name, returning its buffer slot and info.
    pub fn attribute(&self, name: &str) -> Option<(u32, &AttributeInfo)> {
        self.attributes
            .iter()
            .enumerate()
            .find(|(_, a)| a.name == name)
            .map(|(slot, a)| (slot as u32, a))
    }

    pub fn uniform(&self, name: &str) -> Option<&UniformInfo> {
        self.uniforms.iter().find(|u| u.name == name)
    }
}

/// One parsed and validated stage.
pub(crate) struct StageModule<'a> {
    pub stage: Stage,
    pub file: &'a str,
    pub module: Module,
}

impl<'a> StageModule<'a> {
    /// Parses and validates `source` as WGSL.
    pub fn compile(stage: Stage, file: &'a str, source: &str) -> Result<Self, ShaderError> {
        let module = naga::front::wgsl::parse_str(source).map_err(|e| {
            let (line, col) = e
                .location(source)
                .map(|loc| (loc.line_number, loc.line_position))
                .unwrap_or((0, 0));
            ShaderError::Parse {
                stage,
                file: file.to_string(),
                line,
                col,
                message: e.to_string(),
            }
        })?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::default(),
        );
        validator.validate(&module).map_err(|e| ShaderError::Validation {
            stage,
            file: file.to_string(),
            message: error_chain(e.as_inner()),
        })?;

        Ok(Self { stage, file, module })
    }

    fn unsupported(&self, message: impl Into<String>) -> ShaderError {
        ShaderError::Unsupported {
            stage: self.stage,
            file: self.file.to_string(),
            message: message.into(),
        }
    }

    fn entry_point(&self, kind: ShaderStage) -> Result<(&str, &Function), ShaderError> {
        let mut found = self.module.entry_points.iter().filter(|ep| ep.stage == kind);
        match (found.next(), found.next()) {
            (Some(ep), None) => Ok((ep.name.as_str(), &ep.function)),
            _ => Err(ShaderError::EntryPoint {
                stage: self.stage,
                file: self.file.to_string(),
                found: self.module.entry_points.iter().filter(|ep| ep.stage == kind).count(),
            }),
        }
    }

    fn inner(&self, ty: Handle<Type>) -> &TypeInner {
        &self.module.types[ty].inner
    }

    fn type_name(&self, ty: Handle<Type>) -> String {
        match float_components(self.inner(ty)) {
            Some(n) => wgsl_float_name(n).to_string(),
            None => self.module.types[ty]
                .name
                .clone()
                .unwrap_or_else(|| format!("{:?}", self.inner(ty))),
        }
    }

    /// `@location` inputs of `function`, flattening struct arguments.
    fn located_inputs(&self, function: &Function) -> Vec<Located> {
        let mut out = Vec::new();
        for arg in &function.arguments {
            match &arg.binding {
                Some(Binding::Location { location, .. }) => out.push(Located {
                    name: arg.name.clone(),
                    location: *location,
                    ty: arg.ty,
                }),
                Some(Binding::BuiltIn(_)) => {}
                None => self.push_struct_members(arg.ty, &mut out),
            }
        }
        out.sort_by_key(|l| l.location);
        out
    }

    /// `@location` outputs of `function`, flattening a struct result.
    fn located_outputs(&self, function: &Function) -> Vec<Located> {
        let mut out = Vec::new();
        if let Some(result) = &function.result {
            match &result.binding {
                Some(Binding::Location { location, .. }) => out.push(Located {
                    name: None,
                    location: *location,
                    ty: result.ty,
                }),
                Some(Binding::BuiltIn(_)) => {}
                None => self.push_struct_members(result.ty, &mut out),
            }
        }
        out
    }

    fn push_struct_members(&self, ty: Handle<Type>, out: &mut Vec<Located>) {
        if let TypeInner::Struct { members, .. } = self.inner(ty) {
            for m in members {
                if let Some(Binding::Location { location, .. }) = &m.binding {
                    out.push(Located {
                        name: m.name.clone(),
                        location: *location,
                        ty: m.ty,
                    });
                }
            }
        }
    }

    fn attributes(&self, function: &Function) -> Result<Vec<AttributeInfo>, ShaderError> {
        self.located_inputs(function)
            .into_iter()
            .map(|l| {
                let name = l.name.unwrap_or_else(|| format!("location{}", l.location));
                let format = float_components(self.inner(l.ty))
                    .and_then(AttributeFormat::from_components)
                    .ok_or_else(|| {
                        self.unsupported(format!(
                            "attribute `{name}` has type {}; only f32 and vecN<f32> are supported",
                            self.type_name(l.ty)
                        ))
                    })?;
                Ok(AttributeInfo { name, location: l.location, format })
            })
            .collect()
    }

    fn uniforms(&self) -> Result<Vec<UniformInfo>, ShaderError> {
        let visibility = match self.stage {
            Stage::Vertex => wgpu::ShaderStages::VERTEX,
            Stage::Fragment => wgpu::ShaderStages::FRAGMENT,
        };

        let mut out = Vec::new();
        for (_, var) in self.module.global_variables.iter() {
            let name = var.name.clone().unwrap_or_default();
            match var.space {
                AddressSpace::Uniform => {}
                AddressSpace::Handle | AddressSpace::Storage { .. } => {
                    return Err(self.unsupported(format!(
                        "resource `{name}`; only var<uniform> globals are supported"
                    )));
                }
                _ => continue,
            }

            let Some(rb) = &var.binding else {
                return Err(self.unsupported(format!("uniform `{name}` has no @binding")));
            };
            if rb.group != 0 {
                return Err(self.unsupported(format!(
                    "uniform `{name}` is in @group({}); only group 0 is supported",
                    rb.group
                )));
            }

            let kind = float_components(self.inner(var.ty))
                .and_then(UniformKind::from_components)
                .ok_or_else(|| {
                    self.unsupported(format!(
                        "uniform `{name}` has type {}; only f32 and vecN<f32> are supported",
                        self.type_name(var.ty)
                    ))
                })?;

            out.push(UniformInfo {
                name,
                group: rb.group,
                binding: rb.binding,
                kind,
                stages: visibility,
            });
        }
        Ok(out)
    }
}

struct Located {
    name: Option<String>,
    location: u32,
    ty: Handle<Type>,
}

/// Reflects and links a vertex/fragment pair.
pub(crate) fn link(
    vertex: &StageModule<'_>,
    fragment: &StageModule<'_>,
) -> Result<ProgramInterface, ShaderError> {
    let (vs_name, vs) = vertex.entry_point(ShaderStage::Vertex)?;
    let (fs_name, fs) = fragment.entry_point(ShaderStage::Fragment)?;

    let attributes = vertex.attributes(vs)?;
    let uniforms = merge_uniforms(vertex.uniforms()?, fragment.uniforms()?)?;

    let outputs = vertex.located_outputs(vs);
    for input in fragment.located_inputs(fs) {
        let label = input.name.as_deref().unwrap_or("<unnamed>");
        let Some(output) = outputs.iter().find(|o| o.location == input.location) else {
            return Err(ShaderError::link(format!(
                "fragment input `{label}` at @location({}) is not written by the vertex stage",
                input.location
            )));
        };
        if vertex.inner(output.ty) != fragment.inner(input.ty) {
            return Err(ShaderError::link(format!(
                "@location({}) is {} in the vertex stage but {} in the fragment stage",
                input.location,
                vertex.type_name(output.ty),
                fragment.type_name(input.ty)
            )));
        }
    }

    // The colour target is a float (UNORM or sRGB) surface format.
    let colour = fragment.located_outputs(fs).into_iter().find(|o| o.location == 0);
    match colour {
        Some(out) if float_components(fragment.inner(out.ty)).is_some() => {}
        Some(out) => {
            return Err(ShaderError::link(format!(
                "fragment output @location(0) is {}, expected a float colour",
                fragment.type_name(out.ty)
            )));
        }
        None => {
            return Err(ShaderError::link("fragment stage does not write @location(0)"));
        }
    }

    Ok(ProgramInterface {
        vertex_entry: vs_name.to_string(),
        fragment_entry: fs_name.to_string(),
        attributes,
        uniforms,
    })
}

fn merge_uniforms(
    vertex: Vec<UniformInfo>,
    fragment: Vec<UniformInfo>,
) -> Result<Vec<UniformInfo>, ShaderError> {
    let mut by_name: HashMap<String, UniformInfo> = HashMap::new();

    for u in vertex.into_iter().chain(fragment) {
        match by_name.get_mut(&u.name) {
            Some(existing) => {
                if existing.binding != u.binding || existing.kind != u.kind {
                    return Err(ShaderError::link(format!(
                        "uniform `{}` is declared differently in the two stages",
                        u.name
                    )));
                }
                existing.stages |= u.stages;
            }
            None => {
                by_name.insert(u.name.clone(), u);
            }
        }
    }

    let mut merged: Vec<UniformInfo> = by_name.into_values().collect();
    merged.sort_by_key(|u| u.binding);

    for pair in merged.windows(2) {
        if pair[0].binding == pair[1].binding {
            return Err(ShaderError::link(format!(
                "uniforms `{}` and `{}` share @binding({})",
                pair[0].name, pair[1].name, pair[0].binding
            )));
        }
    }

    Ok(merged)
}

/// Number of components if `inner` is `f32` or `vecN<f32>`.
fn float_components(inner: &TypeInner) -> Option<u32> {
    let is_f32 = |s: naga::Scalar| s.kind == ScalarKind::Float && s.width == 4;
    match *inner {
        TypeInner::Scalar(s) if is_f32(s) => Some(1),
        TypeInner::Vector { size, scalar } if is_f32(scalar) => Some(size as u32),
        _ => None,
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut cur = err.source();
    while let Some(e) = cur {
        msg.push_str(": ");
        msg.push_str(&e.to_string());
        cur = e.source();
    }
    msg
}
