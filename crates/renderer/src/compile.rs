/// Compiled fragment program for one pass.
#[derive(Debug)]
pub struct CompiledProgram {
    pub wrapped_source: String,
    pub module: naga::Module,
}

/// Wraps a ShaderToy pass (plus the optional `common` source) and runs it
/// through naga's GLSL frontend and validator.
///
/// The error string is what users see, so it carries the parser's own
/// diagnostics rather than a generic message.
pub fn compile_fragment(common: Option<&str>, source: &str) -> Result<CompiledProgram, String> {
    let wrapped = wrap_shadertoy_fragment(common, source);

    let mut frontend = naga::front::glsl::Frontend::default();
    let options = naga::front::glsl::Options {
        stage: naga::ShaderStage::Fragment,
        defines: Default::default(),
    };
    let module = frontend
        .parse(&options, &wrapped)
        .map_err(|err| format!("GLSL parse failed: {err:?}"))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|err| format!("GLSL validation failed: {err:?}"))?;

    Ok(CompiledProgram {
        wrapped_source: wrapped,
        module,
    })
}

/// Produces a self-contained GLSL fragment shader from raw ShaderToy code.
///
/// 1. Strip `#version` directives and ShaderToy uniform declarations so our
///    own definitions win.
/// 2. Prepend [`HEADER`], then the `common` source, then the pass itself.
/// 3. Append [`FOOTER`] which remaps `gl_FragCoord` and calls `mainImage`.
pub fn wrap_shadertoy_fragment(common: Option<&str>, source: &str) -> String {
    let mut wrapped = String::with_capacity(HEADER.len() + source.len() + FOOTER.len());
    wrapped.push_str(HEADER);
    if let Some(common) = common {
        wrapped.push_str("#line 1\n");
        push_sanitized(&mut wrapped, common);
    }
    wrapped.push_str("#line 1\n");
    push_sanitized(&mut wrapped, source);
    wrapped.push_str(FOOTER);
    wrapped
}

fn push_sanitized(output: &mut String, source: &str) {
    let mut skipped_version = false;
    for line in source.lines() {
        let trimmed = line.trim_start();
        if !skipped_version && trimmed.starts_with("#version") {
            skipped_version = true;
            continue;
        }
        if is_shadertoy_uniform(trimmed) {
            continue;
        }
        output.push_str(line);
        output.push('\n');
    }
}

fn is_shadertoy_uniform(trimmed: &str) -> bool {
    const BUILTINS: [&str; 13] = [
        "iResolution",
        "iTimeDelta",
        "iTime",
        "iFrame",
        "iMouse",
        "iDate",
        "iSampleRate",
        "iChannelTime",
        "iChannelResolution",
        "iChannel0",
        "iChannel1",
        "iChannel2",
        "iChannel3",
    ];
    trimmed.starts_with("uniform ") && BUILTINS.iter().any(|name| trimmed.contains(name))
}

/// GLSL prologue injected ahead of every pass.
const HEADER: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform ShaderParams {
    vec3 _iResolution;
    float _iTime;
    float _iTimeDelta;
    int _iFrame;
    vec2 _padding0;
    vec4 _iMouse;
    vec4 _iDate;
    float _iSampleRate;
    vec3 _padding1;
    float _iChannelTime[4];
    vec3 _iChannelResolution[4];
} ubo;

#define iResolution ubo._iResolution
#define iTime ubo._iTime
#define iTimeDelta ubo._iTimeDelta
#define iFrame ubo._iFrame
#define iMouse ubo._iMouse
#define iDate ubo._iDate
#define iSampleRate ubo._iSampleRate
#define iChannelTime ubo._iChannelTime
#define iChannelResolution ubo._iChannelResolution

layout(set = 1, binding = 0) uniform texture2D shadewatch_channel0_texture;
layout(set = 1, binding = 1) uniform sampler shadewatch_channel0_sampler;
layout(set = 1, binding = 2) uniform texture2D shadewatch_channel1_texture;
layout(set = 1, binding = 3) uniform sampler shadewatch_channel1_sampler;
layout(set = 1, binding = 4) uniform texture2D shadewatch_channel2_texture;
layout(set = 1, binding = 5) uniform sampler shadewatch_channel2_sampler;
layout(set = 1, binding = 6) uniform texture2D shadewatch_channel3_texture;
layout(set = 1, binding = 7) uniform sampler shadewatch_channel3_sampler;

#define iChannel0 sampler2D(shadewatch_channel0_texture, shadewatch_channel0_sampler)
#define iChannel1 sampler2D(shadewatch_channel1_texture, shadewatch_channel1_sampler)
#define iChannel2 sampler2D(shadewatch_channel2_texture, shadewatch_channel2_sampler)
#define iChannel3 sampler2D(shadewatch_channel3_texture, shadewatch_channel3_sampler)

vec4 shadewatch_gl_FragCoord;
#define gl_FragCoord shadewatch_gl_FragCoord
";

/// GLSL epilogue that remaps coordinates and delegates to `mainImage`.
const FOOTER: &str = r"void main() {
    #undef gl_FragCoord
    vec2 builtinFC = vec2(gl_FragCoord.x, gl_FragCoord.y);
    #define gl_FragCoord shadewatch_gl_FragCoord

    vec2 fragCoord = vec2(builtinFC.x, iResolution.y - builtinFC.y);
    shadewatch_gl_FragCoord = vec4(fragCoord, 0.0, 1.0);

    vec4 color = vec4(0.0);
    mainImage(color, fragCoord);
    outColor = color;
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_strips_shadertoy_uniforms_and_prepends_common() {
        let source = r#"
            #version 300 es
            uniform float iTime;
            uniform vec3 iResolution;
            void mainImage(out vec4 fragColor, in vec2 fragCoord) {
                fragColor = vec4(shared_tint(), 1.0);
            }
        "#;
        let common = "vec3 shared_tint() { return vec3(0.5); }";

        let wrapped = wrap_shadertoy_fragment(Some(common), source);
        assert!(!wrapped.contains("uniform float iTime"));
        assert!(!wrapped.contains("uniform vec3 iResolution"));
        assert!(!wrapped.contains("#version 300 es"));
        let common_at = wrapped.find("shared_tint() {").unwrap();
        let main_at = wrapped.find("void mainImage").unwrap();
        assert!(common_at < main_at);
    }

    #[test]
    fn accepts_a_plain_shadertoy_pass() {
        let source = r#"
void mainImage(out vec4 fragColor, in vec2 fragCoord) {
    vec2 uv = fragCoord / iResolution.xy;
    fragColor = vec4(uv, 0.5 + 0.5 * sin(iTime), 1.0);
}
"#;
        let program = compile_fragment(None, source).unwrap();
        assert!(program.wrapped_source.contains("mainImage(color, fragCoord)"));
    }

    #[test]
    fn rejects_undefined_identifiers() {
        let source = r#"
void mainImage(out vec4 fragColor, in vec2 fragCoord) {
    fragColor = vec4(not_declared_anywhere, 1.0);
}
"#;
        let error = compile_fragment(None, source).unwrap_err();
        assert!(error.starts_with("GLSL"));
    }
}
