use std::fmt;
use std::sync::OnceLock;

use regex::{Captures, NoExpand, Regex};
use shaderdoc::ParameterSpec;

/// Fixed uniforms every preview program receives, in declaration order.
pub const BUILTIN_UNIFORMS: [(&str, &str); 4] = [
    ("float", "time"),
    ("vec2", "resolution"),
    ("vec4", "color"),
    ("float", "alpha"),
];

/// Identifier the implicit-uniform dialect writes its output to.
const SOURCE_OUTPUT: &str = "fragColor";

/// First line of the injected uniform block.
const BLOCK_BANNER: &str = "// declarations implied by the Visual Synth dialect";

/// Full-screen quad drawn as a 4-vertex triangle strip.
pub const FULLSCREEN_QUAD: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

/// Pass-through vertex stage feeding `texCoord` to the fragment stage.
pub const VERTEX_SHADER: &str = r"#version 100
attribute vec2 position;
varying vec2 texCoord;
void main() {
    texCoord = position * 0.5 + 0.5;
    gl_Position = vec4(position, 0.0, 1.0);
}
";

/// Float precision injected when a shader does not pick one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    Low,
    Medium,
    #[default]
    High,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::Low => f.write_str("lowp"),
            Precision::Medium => f.write_str("mediump"),
            Precision::High => f.write_str("highp"),
        }
    }
}

/// Knobs for the explicit-uniform target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileOptions {
    /// Directive prepended when the shader has none.
    pub version_directive: String,
    /// Float precision inserted when the shader declares none.
    pub default_precision: Precision,
    /// Legacy output identifier that replaces `fragColor`.
    pub output_identifier: String,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            version_directive: "#version 100".to_string(),
            default_precision: Precision::default(),
            output_identifier: "gl_FragColor".to_string(),
        }
    }
}

/// Where an output line of a transpiled shader came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLine {
    /// 1-based line of the shader body.
    Body(usize),
    Injected,
}

/// Output line → body line table built while transpiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMap {
    origins: Vec<Option<usize>>,
}

impl LineMap {
    fn identity(lines: usize) -> Self {
        Self {
            origins: (0..lines).map(Some).collect(),
        }
    }

    fn insert(&mut self, at: usize, count: usize) {
        let at = at.min(self.origins.len());
        self.origins
            .splice(at..at, std::iter::repeat(None).take(count));
    }

    /// Records `count` lines inserted in the middle of `line`; the rest of
    /// that line moves below them.
    fn split(&mut self, line: usize, count: usize) {
        let at = (line + 1).min(self.origins.len());
        let tail = self.origins.get(line).copied().flatten();
        self.origins.splice(
            at..at,
            std::iter::repeat(None)
                .take(count)
                .chain(std::iter::once(tail)),
        );
    }

    /// Resolves a 1-based output line. `None` when the line does not exist.
    pub fn source_line(&self, output_line: usize) -> Option<SourceLine> {
        let origin = self.origins.get(output_line.checked_sub(1)?)?;
        Some(match origin {
            Some(index) => SourceLine::Body(index + 1),
            None => SourceLine::Injected,
        })
    }

    pub fn injected_lines(&self) -> usize {
        self.origins.iter().filter(|origin| origin.is_none()).count()
    }
}

/// Fragment source ready for the explicit-uniform backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspiledShader {
    pub source: String,
    pub line_map: LineMap,
}

fn output_identifier() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(r"\b{SOURCE_OUTPUT}\b")).expect("output identifier regex is valid")
    })
}

fn precision_statement() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"precision\s+\w+\s+float;").expect("precision statement regex is valid")
    })
}

fn float_precision() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"precision\s+\w+\s+float\b").expect("float precision regex is valid")
    })
}

fn diagnostic_location() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?m)^(ERROR|WARNING): (\d+):(\d+):").expect("diagnostic regex is valid")
    })
}

/// Lines of the uniform block injected ahead of the shader body.
pub fn uniform_block(params: &[ParameterSpec]) -> Vec<String> {
    let mut lines = Vec::with_capacity(BUILTIN_UNIFORMS.len() + params.len() + 2);
    lines.push(BLOCK_BANNER.to_string());
    for (ty, name) in BUILTIN_UNIFORMS {
        lines.push(format!("uniform {ty} {name};"));
    }
    lines.push("varying vec2 texCoord;".to_string());
    for param in params {
        lines.push(format!("uniform float {};", param.name));
    }
    lines
}

/// Returns true for lines that must stay above the uniform block.
fn is_preamble_line(line: &str) -> bool {
    const PREFIXES: [&str; 6] = ["#version", "#ifdef", "#endif", "#define", "precision", "//"];
    let trimmed = line.trim();
    trimmed.is_empty() || PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix))
}

/// Index of the first line that is not part of the directive/comment preamble.
fn injection_line(lines: &[&str]) -> usize {
    lines
        .iter()
        .position(|line| !is_preamble_line(line))
        .unwrap_or(lines.len())
}

/// Rewrites an implicit-uniform shader body with the default target options.
pub fn transpile_fragment(body: &str, params: &[ParameterSpec]) -> TranspiledShader {
    transpile_fragment_with(body, params, &TranspileOptions::default())
}

/// Rewrites an implicit-uniform shader body into explicit-uniform source.
///
/// 1. Whole-word `fragColor` becomes the legacy output identifier.
/// 2. The uniform block goes right after the first `precision <q> float;`
///    statement, or, without one, above the first line that is not blank, a
///    `#version`/`#ifdef`/`#endif`/`#define` directive, a precision statement,
///    or a `//` comment.
/// 3. A missing version directive is prepended, and a missing float precision
///    is inserted directly below the version directive.
///
/// The function is pure; identical inputs give identical output.
pub fn transpile_fragment_with(
    body: &str,
    params: &[ParameterSpec],
    options: &TranspileOptions,
) -> TranspiledShader {
    let renamed =
        output_identifier().replace_all(body, NoExpand(options.output_identifier.as_str()));
    let block = uniform_block(params);
    let mut line_map = LineMap::identity(renamed.split('\n').count());

    let injected = match precision_statement().find(&renamed) {
        Some(statement) => {
            let end = statement.end();
            line_map.split(renamed[..end].matches('\n').count(), block.len());

            let block_len: usize = block.iter().map(|line| line.len() + 1).sum();
            let mut out = String::with_capacity(renamed.len() + block_len + 1);
            out.push_str(&renamed[..end]);
            out.push('\n');
            for line in &block {
                out.push_str(line);
                out.push('\n');
            }
            out.push_str(&renamed[end..]);
            out
        }
        None => {
            let mut lines: Vec<&str> = renamed.split('\n').collect();
            let at = injection_line(&lines);
            line_map.insert(at, block.len());
            lines.splice(at..at, block.iter().map(String::as_str));
            lines.join("\n")
        }
    };

    let mut lines: Vec<String> = injected.split('\n').map(str::to_string).collect();

    if !injected.contains("#version") {
        lines.insert(0, options.version_directive.clone());
        line_map.insert(0, 1);
    }

    if !float_precision().is_match(&injected) {
        let at = lines
            .iter()
            .position(|line| line.trim_start().starts_with("#version"))
            .map(|index| index + 1)
            .unwrap_or(0);
        lines.insert(
            at,
            format!("precision {} float;", options.default_precision),
        );
        line_map.insert(at, 1);
    }

    TranspiledShader {
        source: lines.join("\n"),
        line_map,
    }
}

/// Rewrites `ERROR: 0:<line>:` locations in a driver log.
///
/// `resolve` maps an output line to a document line; `None` marks the line as
/// injected by the previewer. Lines without a recognised location pass through
/// untouched.
pub fn remap_diagnostic<F>(log: &str, resolve: F) -> String
where
    F: Fn(usize) -> Option<usize>,
{
    diagnostic_location()
        .replace_all(log, |caps: &Captures<'_>| {
            let level = &caps[1];
            let file = &caps[2];
            let raw = &caps[3];
            match raw.parse::<usize>().ok().map(|line| (line, resolve(line))) {
                Some((_, Some(line))) => format!("{level}: {file}:{line}:"),
                Some((line, None)) => format!("{level}: {file}:{line}: (injected)"),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speed() -> ParameterSpec {
        ParameterSpec::new("speed", 0.0, 2.0, Some(1.0))
    }

    fn block_text(params: &[ParameterSpec]) -> String {
        let mut text = String::new();
        for line in uniform_block(params) {
            text.push_str(&line);
            text.push('\n');
        }
        text
    }

    #[test]
    fn injects_after_precision_statement() {
        let body = "precision mediump float;\nvoid main(){fragColor=vec4(1.0);}";
        let out = transpile_fragment(body, &[speed()]);

        let statement = "precision mediump float;";
        let at = out.source.find(statement).unwrap() + statement.len();
        let expected_block = format!("\n{}", block_text(&[speed()]));
        assert_eq!(&out.source[at..at + expected_block.len()], expected_block);
        assert!(out.source.contains("uniform float speed;"));
        assert!(out.source.contains("gl_FragColor=vec4(1.0);"));
        assert!(!out.source.contains("fragColor"));
        assert!(out.source.starts_with("#version 100\nprecision mediump float;\n"));
    }

    #[test]
    fn precision_statement_mid_file_keeps_directives_above() {
        let body = "#version 100\n#define PI 3.14159\nprecision highp float;\nfloat f(){return PI;}\nvoid main(){}";
        let out = transpile_fragment(body, &[]);
        let expected = format!(
            "#version 100\n#define PI 3.14159\nprecision highp float;\n{}\nfloat f(){{return PI;}}\nvoid main(){{}}",
            block_text(&[])
        );
        assert_eq!(out.source, expected);
    }

    #[test]
    fn line_scan_inserts_at_first_code_line() {
        let body = "#ifdef GL_ES\n#endif\n// a note\n\nfloat wave(float x){return sin(x);}\nvoid main(){}";
        let out = transpile_fragment(body, &[speed()]);
        let lines: Vec<&str> = out.source.split('\n').collect();
        let block = uniform_block(&[speed()]);

        assert_eq!(lines[0], "#version 100");
        assert_eq!(lines[1], "precision highp float;");
        assert_eq!(&lines[2..6], &["#ifdef GL_ES", "#endif", "// a note", ""]);
        assert_eq!(&lines[6..6 + block.len()], block.as_slice());
        assert_eq!(lines[6 + block.len()], "float wave(float x){return sin(x);}");
        assert_eq!(lines[7 + block.len()], "void main(){}");
    }

    #[test]
    fn body_without_preamble_gets_block_at_top() {
        let out = transpile_fragment("void main(){fragColor=color;}", &[]);
        let block = uniform_block(&[]);
        let lines: Vec<&str> = out.source.split('\n').collect();
        assert_eq!(lines[0], "#version 100");
        assert_eq!(lines[1], "precision highp float;");
        assert_eq!(&lines[2..2 + block.len()], block.as_slice());
        assert_eq!(lines[2 + block.len()], "void main(){gl_FragColor=color;}");
    }

    #[test]
    fn comment_only_body_appends_block() {
        let out = transpile_fragment("// nothing here\n// yet", &[]);
        let lines: Vec<&str> = out.source.split('\n').collect();
        assert_eq!(&lines[2..4], &["// nothing here", "// yet"]);
        assert_eq!(lines[4], BLOCK_BANNER);
        assert_eq!(*lines.last().unwrap(), "varying vec2 texCoord;");
    }

    #[test]
    fn existing_version_directive_is_kept() {
        let out = transpile_fragment("#version 100\nvoid main(){}", &[]);
        assert_eq!(out.source.matches("#version").count(), 1);
        assert!(out.source.starts_with("#version 100\nprecision highp float;\n"));
    }

    #[test]
    fn output_rename_respects_word_boundaries() {
        let body = "vec4 myFragColorX; float fragColorator; void main(){ fragColor = vec4(0.0); }";
        let out = transpile_fragment(body, &[]);
        assert!(out.source.contains("myFragColorX"));
        assert!(out.source.contains("fragColorator"));
        assert!(out.source.contains("gl_FragColor = vec4(0.0);"));
    }

    #[test]
    fn parameters_are_declared_in_order() {
        let params = vec![
            ParameterSpec::new("zoom", 1.0, 4.0, None),
            ParameterSpec::new("warp", 0.0, 1.0, None),
        ];
        let out = transpile_fragment("void main(){}", &params);
        let zoom = out.source.find("uniform float zoom;").unwrap();
        let warp = out.source.find("uniform float warp;").unwrap();
        let alpha = out.source.find("uniform float alpha;").unwrap();
        assert!(alpha < zoom && zoom < warp);
    }

    #[test]
    fn transpile_is_deterministic() {
        let body = "precision lowp float;\nvoid main(){fragColor=vec4(time);}";
        assert_eq!(
            transpile_fragment(body, &[speed()]),
            transpile_fragment(body, &[speed()])
        );
    }

    #[test]
    fn options_change_target_conventions() {
        let options = TranspileOptions {
            version_directive: "#version 100".into(),
            default_precision: Precision::Medium,
            output_identifier: "out$Color".into(),
        };
        let out = transpile_fragment_with("void main(){fragColor=vec4(1.0);}", &[], &options);
        assert!(out.source.contains("precision mediump float;"));
        assert!(out.source.contains("out$Color=vec4(1.0);"));
    }

    #[test]
    fn line_map_tracks_line_scan_injection() {
        let out = transpile_fragment("// header\nvoid main(){\n}", &[]);
        let block = uniform_block(&[]).len();
        // version + precision + header comment
        assert_eq!(out.line_map.source_line(1), Some(SourceLine::Injected));
        assert_eq!(out.line_map.source_line(2), Some(SourceLine::Injected));
        assert_eq!(out.line_map.source_line(3), Some(SourceLine::Body(1)));
        assert_eq!(out.line_map.source_line(4), Some(SourceLine::Injected));
        assert_eq!(out.line_map.source_line(4 + block), Some(SourceLine::Body(2)));
        assert_eq!(out.line_map.source_line(5 + block), Some(SourceLine::Body(3)));
        assert_eq!(out.line_map.source_line(6 + block), None);
        assert_eq!(out.line_map.injected_lines(), block + 2);
    }

    #[test]
    fn line_map_tracks_precision_split() {
        let out = transpile_fragment("precision mediump float; float a;\nvoid main(){}", &[]);
        let block = uniform_block(&[]).len();
        let lines: Vec<&str> = out.source.split('\n').collect();
        assert_eq!(lines[1], "precision mediump float;");
        assert_eq!(lines[2 + block], " float a;");
        assert_eq!(out.line_map.source_line(1), Some(SourceLine::Injected));
        assert_eq!(out.line_map.source_line(2), Some(SourceLine::Body(1)));
        assert_eq!(out.line_map.source_line(3), Some(SourceLine::Injected));
        assert_eq!(out.line_map.source_line(3 + block), Some(SourceLine::Body(1)));
        assert_eq!(out.line_map.source_line(4 + block), Some(SourceLine::Body(2)));
        assert_eq!(lines.len(), 4 + block);
    }

    #[test]
    fn remap_rewrites_known_locations() {
        let log = "ERROR: 0:12: 'foo' : undeclared identifier\nERROR: 0:3: 'x' : syntax error\nnote: 2 compilation errors";
        let remapped = remap_diagnostic(log, |line| (line > 5).then(|| line - 5));
        assert_eq!(
            remapped,
            "ERROR: 0:7: 'foo' : undeclared identifier\nERROR: 0:3: (injected) 'x' : syntax error\nnote: 2 compilation errors"
        );
    }
}
