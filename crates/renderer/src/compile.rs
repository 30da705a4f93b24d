use crate::backend::{ShaderStage, RESOLUTION_UNIFORM, TIME_UNIFORM};

/// Rewrites a shader into the dialect the GPU front-end accepts and checks it.
///
/// Fragment sources are wrapped with [`HEADER`] and [`FOOTER`]; vertex sources
/// are already written against that dialect. On failure the returned string
/// is the front-end's human-readable diagnostic.
pub(crate) fn prepare_source(stage: ShaderStage, source: &str) -> Result<String, String> {
    let prepared = match stage {
        ShaderStage::Vertex => source.to_string(),
        ShaderStage::Fragment => wrap_fragment(source),
    };
    validate_glsl(stage, &prepared)?;
    Ok(prepared)
}

/// Produces a self-contained `#version 450` fragment shader from WebGL-style code.
///
/// Steps performed:
///
/// 1. Strip the first `#version` directive, default-precision statements, and
///    declarations of the two uniforms we inject ourselves.
/// 2. Prepend [`HEADER`], which declares the uniform block and aliases
///    `gl_FragColor`, `u_time` and `u_resolution` onto it.
/// 3. Append [`FOOTER`], which flips `gl_FragCoord` to a bottom-left origin
///    and calls the user's `main`.
pub(crate) fn wrap_fragment(source: &str) -> String {
    let mut sanitized = String::with_capacity(source.len());
    let mut skipped_version = false;
    for line in source.lines() {
        let trimmed = line.trim_start();
        if !skipped_version && trimmed.starts_with("#version") {
            skipped_version = true;
            continue;
        }
        if trimmed.starts_with("precision ") {
            continue;
        }
        let kept = strip_injected_declarations(line);
        if kept.len() != line.len() && kept.trim().is_empty() {
            continue;
        }
        sanitized.push_str(&kept);
        sanitized.push('\n');
    }

    format!("{HEADER}\n#line 1\n{sanitized}{FOOTER}")
}

/// Removes `uniform float u_time;` and `uniform vec2 u_resolution;` statements
/// from a line, leaving every other statement on it untouched.
fn strip_injected_declarations(line: &str) -> String {
    if !line.contains("uniform") {
        return line.to_string();
    }
    line.split_inclusive(';')
        .filter(|statement| {
            !statement
                .strip_suffix(';')
                .is_some_and(is_injected_declaration)
        })
        .collect()
}

fn is_injected_declaration(statement: &str) -> bool {
    let tokens: Vec<&str> = statement.split_whitespace().collect();
    let (ty, name) = match tokens.as_slice() {
        ["uniform", ty, name] => (*ty, *name),
        ["uniform", "lowp" | "mediump" | "highp", ty, name] => (*ty, *name),
        _ => return false,
    };
    matches!((ty, name), ("float", TIME_UNIFORM) | ("vec2", RESOLUTION_UNIFORM))
}

fn validate_glsl(stage: ShaderStage, source: &str) -> Result<(), String> {
    let naga_stage = match stage {
        ShaderStage::Vertex => naga::ShaderStage::Vertex,
        ShaderStage::Fragment => naga::ShaderStage::Fragment,
    };
    let options = naga::front::glsl::Options::from(naga_stage);
    let module = naga::front::glsl::Frontend::default()
        .parse(&options, source)
        .map_err(|errors| errors.emit_to_string(source))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    )
    .validate(&module)
    .map_err(|error| error.emit_to_string(source))?;
    Ok(())
}

/// GLSL prologue injected ahead of every fragment shader.
///
/// The block layout must match `FrameUniforms` in `gpu/uniforms.rs`.
const HEADER: &str = r"#version 450
layout(location = 0) out vec4 promptshade_FragColor;

layout(std140, set = 0, binding = 0) uniform PromptshadeFrame {
    float _u_time;
    float _padding;
    vec2 _u_resolution;
} promptshade_frame;

#define u_time promptshade_frame._u_time
#define u_resolution promptshade_frame._u_resolution
#define gl_FragColor promptshade_FragColor

vec4 promptshade_FragCoord;
#define gl_FragCoord promptshade_FragCoord

#define main promptshade_user_main
";

/// GLSL epilogue: the real entry point.
const FOOTER: &str = r"
#undef main
void main() {
    #undef gl_FragCoord
    vec4 builtinFC = gl_FragCoord;
    #define gl_FragCoord promptshade_FragCoord

    promptshade_FragCoord = vec4(builtinFC.x, u_resolution.y - builtinFC.y, builtinFC.z, builtinFC.w);
    promptshade_FragColor = vec4(0.0, 0.0, 0.0, 1.0);
    promptshade_user_main();
}
";
