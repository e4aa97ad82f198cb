//! WGSL front end for [`super::WgpuDevice`]: parse, validate, and reflect the
//! sprite program interface.
//!
//! wgpu has no notion of "uniform locations". The backend emulates them with a
//! fixed resource layout:
//!
//!  @group(0) @binding(0)  uniform struct   u_projection @ 0, u_view @ 48, u_alpha @ 96
//!  @group(1) @binding(0)  texture_2d<f32>  (the sampled texture uniform)
//!  @group(1) @binding(1)  sampler
//!
//! A program whose stages disagree with this layout fails to link.

use std::collections::HashMap;

use naga::{AddressSpace, Binding, Module, TypeInner};

use crate::device::{DeviceError, ShaderStage};

pub(super) const VERTEX_ENTRY: &str = "vs_main";
pub(super) const FRAGMENT_ENTRY: &str = "fs_main";

/// Expected byte offset of each uniform-block member.
const UNIFORM_MEMBERS: [(&str, u32); 3] = [("u_projection", 0), ("u_view", 48), ("u_alpha", 96)];

const UNIFORM_SLOT: (u32, u32) = (0, 0);
const TEXTURE_SLOT: (u32, u32) = (1, 0);
const SAMPLER_SLOT: (u32, u32) = (1, 1);

/// What a uniform location refers to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(super) enum UniformSlot {
    Projection,
    View,
    Alpha,
    Texture,
}

/// Reflected interface of a linked program.
#[derive(Debug, Clone, Default)]
pub(super) struct Interface {
    /// Vertex input name → shader location.
    pub attributes: HashMap<String, u32>,
    /// Uniform name, in location order.
    pub uniforms: Vec<(String, UniformSlot)>,
}

impl Interface {
    pub fn uniform_index(&self, name: &str) -> Option<u32> {
        self.uniforms.iter().position(|(n, _)| n == name).map(|i| i as u32)
    }

    pub fn uniform_slot(&self, index: u32) -> Option<UniformSlot> {
        self.uniforms.get(index as usize).map(|(_, slot)| *slot)
    }
}

/// Parses and validates one stage.
pub(super) fn compile(stage: ShaderStage, source: &str) -> Result<Module, DeviceError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|err| DeviceError::Compile {
        stage,
        log: err.emit_to_string(source),
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|err| DeviceError::Compile { stage, log: format!("{err:?}") })?;

    Ok(module)
}

/// Checks that the stages fit together and fit the fixed resource layout.
pub(super) fn link(vertex: &Module, fragment: &Module) -> Result<Interface, DeviceError> {
    let vs = entry_point(vertex, naga::ShaderStage::Vertex, VERTEX_ENTRY)?;
    let fs = entry_point(fragment, naga::ShaderStage::Fragment, FRAGMENT_ENTRY)?;

    let mut interface = Interface::default();
    for (name, location) in inputs(vertex, &vs.function) {
        interface.attributes.insert(name, location);
    }

    // Every fragment input must be written by the vertex stage.
    let outputs = outputs(vertex, &vs.function);
    for (name, location) in inputs(fragment, &fs.function) {
        if !outputs.contains(&location) {
            return Err(DeviceError::Link(format!(
                "fragment input `{name}` at location {location} is not written by the vertex stage"
            )));
        }
    }

    for module in [vertex, fragment] {
        collect_resources(module, &mut interface)?;
    }
    Ok(interface)
}

fn entry_point<'m>(
    module: &'m Module,
    stage: naga::ShaderStage,
    name: &str,
) -> Result<&'m naga::EntryPoint, DeviceError> {
    module
        .entry_points
        .iter()
        .find(|ep| ep.stage == stage && ep.name == name)
        .ok_or_else(|| DeviceError::Link(format!("missing {stage:?} entry point `{name}`")))
}

/// Location-bound arguments, flattening struct arguments.
fn inputs(module: &Module, function: &naga::Function) -> Vec<(String, u32)> {
    let mut out = Vec::new();
    for arg in &function.arguments {
        match (&arg.binding, &module.types[arg.ty].inner) {
            (Some(Binding::Location { location, .. }), _) => {
                out.push((arg.name.clone().unwrap_or_default(), *location));
            }
            (None, TypeInner::Struct { members, .. }) => {
                for member in members {
                    if let Some(Binding::Location { location, .. }) = member.binding {
                        out.push((member.name.clone().unwrap_or_default(), location));
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn outputs(module: &Module, function: &naga::Function) -> Vec<u32> {
    let Some(result) = &function.result else {
        return Vec::new();
    };
    match (&result.binding, &module.types[result.ty].inner) {
        (Some(Binding::Location { location, .. }), _) => vec![*location],
        (None, TypeInner::Struct { members, .. }) => members
            .iter()
            .filter_map(|m| match m.binding {
                Some(Binding::Location { location, .. }) => Some(location),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn collect_resources(module: &Module, interface: &mut Interface) -> Result<(), DeviceError> {
    for (_, var) in module.global_variables.iter() {
        let Some(rb) = &var.binding else { continue };
        let slot = (rb.group, rb.binding);
        let name = var.name.as_deref().unwrap_or("<unnamed>");

        match (var.space, &module.types[var.ty].inner) {
            (AddressSpace::Uniform, TypeInner::Struct { members, .. }) => {
                expect_slot(name, slot, UNIFORM_SLOT)?;
                for member in members {
                    let member_name = member.name.as_deref().unwrap_or_default();
                    let Some((_, offset)) = UNIFORM_MEMBERS.iter().find(|(n, _)| *n == member_name)
                    else {
                        return Err(DeviceError::Link(format!(
                            "unknown uniform `{member_name}` in `{name}`"
                        )));
                    };
                    if member.offset != *offset {
                        return Err(DeviceError::Link(format!(
                            "uniform `{member_name}` at offset {}, expected {offset}",
                            member.offset
                        )));
                    }
                    let slot = match member_name {
                        "u_projection" => UniformSlot::Projection,
                        "u_view" => UniformSlot::View,
                        _ => UniformSlot::Alpha,
                    };
                    add_uniform(interface, member_name, slot);
                }
            }
            (AddressSpace::Handle, TypeInner::Image { .. }) => {
                expect_slot(name, slot, TEXTURE_SLOT)?;
                add_uniform(interface, name, UniformSlot::Texture);
            }
            (AddressSpace::Handle, TypeInner::Sampler { .. }) => {
                expect_slot(name, slot, SAMPLER_SLOT)?;
            }
            _ => {
                return Err(DeviceError::Link(format!("unsupported resource `{name}`")));
            }
        }
    }
    Ok(())
}

fn expect_slot(name: &str, got: (u32, u32), want: (u32, u32)) -> Result<(), DeviceError> {
    if got != want {
        return Err(DeviceError::Link(format!(
            "`{name}` bound at @group({}) @binding({}), expected @group({}) @binding({})",
            got.0, got.1, want.0, want.1
        )));
    }
    Ok(())
}

fn add_uniform(interface: &mut Interface, name: &str, slot: UniformSlot) {
    if interface.uniform_index(name).is_none() {
        interface.uniforms.push((name.to_owned(), slot));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::program::{FRAGMENT_SHADER, VERTEX_SHADER};

    fn sprite() -> Result<Interface, DeviceError> {
        let vs = compile(ShaderStage::Vertex, VERTEX_SHADER)?;
        let fs = compile(ShaderStage::Fragment, FRAGMENT_SHADER)?;
        link(&vs, &fs)
    }

    // ── sprite program ────────────────────────────────────────────────────

    #[test]
    fn sprite_program_links() {
        let iface = sprite().unwrap();

        assert_eq!(iface.attributes.get("a_position"), Some(&0));
        assert_eq!(iface.attributes.get("a_uv"), Some(&1));

        for name in ["u_projection", "u_view", "u_alpha", "u_texture"] {
            assert!(iface.uniform_index(name).is_some(), "{name} not reflected");
        }
        let tex = iface.uniform_index("u_texture").unwrap();
        assert_eq!(iface.uniform_slot(tex), Some(UniformSlot::Texture));
    }

    #[test]
    fn uniforms_are_not_duplicated_across_stages() {
        let iface = sprite().unwrap();
        assert_eq!(iface.uniforms.len(), 4);
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn syntax_error_is_a_compile_error() {
        let err = compile(ShaderStage::Fragment, "fn fs_main( {").unwrap_err();
        assert!(matches!(err, DeviceError::Compile { stage: ShaderStage::Fragment, .. }));
    }

    #[test]
    fn missing_entry_point_fails_to_link() {
        let vs = compile(ShaderStage::Vertex, &VERTEX_SHADER.replace("vs_main", "main")).unwrap();
        let fs = compile(ShaderStage::Fragment, FRAGMENT_SHADER).unwrap();
        assert!(matches!(link(&vs, &fs), Err(DeviceError::Link(_))));
    }

    #[test]
    fn unmatched_varying_fails_to_link() {
        let fragment = FRAGMENT_SHADER.replace("@location(0) v_uv", "@location(3) v_uv");
        let vs = compile(ShaderStage::Vertex, VERTEX_SHADER).unwrap();
        let fs = compile(ShaderStage::Fragment, &fragment).unwrap();
        assert!(matches!(link(&vs, &fs), Err(DeviceError::Link(_))));
    }

    #[test]
    fn misplaced_texture_fails_to_link() {
        let fragment = FRAGMENT_SHADER.replace("@group(1) @binding(0)", "@group(2) @binding(0)");
        let vs = compile(ShaderStage::Vertex, VERTEX_SHADER).unwrap();
        let fs = compile(ShaderStage::Fragment, &fragment).unwrap();
        assert!(matches!(link(&vs, &fs), Err(DeviceError::Link(_))));
    }
}
