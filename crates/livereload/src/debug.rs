//! "Inspect this line" support.
//!
//! The rewrite keeps `mainImage` up to the target statement, flattens every
//! enclosing `for` loop into its initializer so the body runs exactly once,
//! and writes the assigned value into the output color. Everything after the
//! target statement inside `mainImage` is dropped. Any input the scanner does
//! not understand yields `None` and callers compile the original source.
use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

const LOOP_INIT_COMMENT: &str = "// Loop init (first iteration only)";
const ENTRY_POINT: &str = "mainImage";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaderDebugManager {
    enabled: bool,
    current_line: Option<usize>,
    line_content: Option<String>,
    file_path: Option<String>,
    iteration_index: usize,
}

impl ShaderDebugManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enabled and pointing at a line.
    pub fn is_active(&self) -> bool {
        self.enabled && self.current_line.is_some()
    }

    pub fn current_line(&self) -> Option<usize> {
        self.current_line
    }

    pub fn line_content(&self) -> Option<&str> {
        self.line_content.as_deref()
    }

    pub fn file_path(&self) -> Option<&str> {
        self.file_path.as_deref()
    }

    pub fn iteration_index(&self) -> usize {
        self.iteration_index
    }

    pub fn set_iteration_index(&mut self, iteration_index: usize) {
        self.iteration_index = iteration_index;
    }

    /// Flips debug mode. Turning it off forgets the inspected line.
    pub fn toggle_enabled(&mut self) -> bool {
        self.enabled = !self.enabled;
        if !self.enabled {
            self.current_line = None;
        }
        self.enabled
    }

    /// Callers filter by lock before calling.
    pub fn update_debug_line(
        &mut self,
        line: usize,
        line_content: impl Into<String>,
        file_path: impl Into<String>,
    ) {
        self.current_line = Some(line);
        self.line_content = Some(line_content.into());
        self.file_path = Some(file_path.into());
    }

    /// True when the cursor's file is unknown or is the shader being compiled.
    pub fn applies_to(&self, shader_path: &str) -> bool {
        match self.file_path.as_deref() {
            None | Some("") => true,
            Some(file) => file == shader_path,
        }
    }

    /// The source to compile in place of `code` while debugging, if any.
    pub fn debug_source(&self, code: &str, shader_path: &str) -> Option<String> {
        if !self.is_active() || !self.applies_to(shader_path) {
            return None;
        }
        let line = self.current_line?;
        modify_shader_for_debugging(code, line, self.iteration_index)
    }
}

/// Rewrites `source` so `mainImage` outputs the value assigned on
/// `target_line` (0-based). `iteration_index` advances the innermost
/// enclosing loop by repeating its step expression.
pub fn modify_shader_for_debugging(
    source: &str,
    target_line: usize,
    iteration_index: usize,
) -> Option<String> {
    let lines: Vec<&str> = source.lines().collect();
    if target_line >= lines.len() {
        return None;
    }

    let mut scanner = Scanner::default();
    let mut code = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate().take(target_line + 1) {
        code.push(scanner.feed_line(index, line));
    }

    let function = match scanner.stack.first() {
        Some(Block {
            kind: BlockKind::Function { name, out_color },
            ..
        }) if name == ENTRY_POINT => out_color.clone(),
        _ => return None,
    };
    let target_code = code[target_line].trim();
    if !scanner.pending.trim().is_empty() || !target_code.ends_with(';') {
        return None;
    }

    let target = parse_target(target_code)?;
    let ty = match (target.declared, target.selector) {
        (Some(ty), _) => ty,
        (None, selector) => {
            let base = lookup_declaration(&code[..target_line], &target.base);
            match selector {
                Selector::None => base?,
                Selector::Swizzle(len) => {
                    GlslType::new(base.map_or(Scalar::Float, |ty| ty.scalar), len)
                }
                Selector::Index => {
                    let base = base?;
                    GlslType::new(base.scalar, 1)
                }
            }
        }
    };
    let color = function.unwrap_or_else(|| "fragColor".to_string());
    let assignment = format!("{color} = {};", ty.visualize(&target.expr)?);

    let enclosing: Vec<&Block> = scanner.stack.iter().skip(1).collect();
    let innermost_loop = enclosing
        .iter()
        .rposition(|block| matches!(block.kind, BlockKind::Loop { .. }));

    let mut skipped = BTreeSet::new();
    let mut inserted: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for (position, block) in enclosing.iter().enumerate() {
        let BlockKind::Loop {
            header,
            header_lines,
            ..
        } = &block.kind
        else {
            continue;
        };
        let clauses = loop_clauses(header)?;
        let indent = indentation(lines[*header_lines.start()]);
        let replacement = inserted.entry(*header_lines.start()).or_default();
        if !clauses.init.is_empty() {
            replacement.push(format!("{indent}{}; {LOOP_INIT_COMMENT}", clauses.init));
        }
        if Some(position) == innermost_loop && !clauses.step.is_empty() {
            for step in 1..=iteration_index {
                replacement.push(format!("{indent}{}; // iteration {step}", clauses.step));
            }
        }
        skipped.extend(header_lines.clone());
    }

    let mut output: Vec<String> = Vec::with_capacity(lines.len());
    for (index, line) in lines.iter().enumerate().take(target_line + 1) {
        if let Some(replacement) = inserted.remove(&index) {
            output.extend(replacement);
        }
        if !skipped.contains(&index) {
            output.push((*line).to_string());
        }
    }
    output.push(format!("{}{assignment}", indentation(lines[target_line])));

    for block in enclosing.iter().rev() {
        if matches!(
            block.kind,
            BlockKind::Loop {
                brace_on_header: true,
                ..
            }
        ) {
            continue;
        }
        output.push(format!("{}}}", indentation(lines[block.open_line])));
    }
    output.push("}".to_string());

    // Find where mainImage ends and keep whatever follows it.
    let mut end = None;
    for (index, line) in lines.iter().enumerate().skip(target_line + 1) {
        scanner.feed_line(index, line);
        if scanner.stack.is_empty() {
            end = Some(index);
            break;
        }
    }
    let end = end?;
    output.extend(lines[end + 1..].iter().map(|line| (*line).to_string()));

    let mut rewritten = output.join("\n");
    rewritten.push('\n');
    Some(rewritten)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BlockKind {
    Function {
        name: String,
        out_color: Option<String>,
    },
    Loop {
        header: String,
        header_lines: RangeInclusive<usize>,
        brace_on_header: bool,
    },
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Block {
    kind: BlockKind,
    open_line: usize,
}

/// Line-at-a-time brace tracker. `pending` holds the code seen since the last
/// `;`, `{` or `}` at paren depth zero, which is the header of the next block.
#[derive(Debug, Default)]
struct Scanner {
    stack: Vec<Block>,
    pending: String,
    pending_start: Option<usize>,
    paren_depth: usize,
    in_block_comment: bool,
}

impl Scanner {
    /// Consumes one line and returns it with comments removed.
    fn feed_line(&mut self, index: usize, line: &str) -> String {
        if !self.in_block_comment && line.trim_start().starts_with('#') {
            return String::new();
        }
        let code = self.strip_comments(line);
        let mut seen_on_line = false;
        for ch in code.chars() {
            match ch {
                '{' => {
                    self.open_block(index, seen_on_line);
                    seen_on_line = true;
                    continue;
                }
                '}' => {
                    self.stack.pop();
                    self.reset_pending();
                }
                ';' if self.paren_depth == 0 => self.reset_pending(),
                '(' => {
                    self.paren_depth += 1;
                    self.push_pending(index, ch);
                }
                ')' => {
                    self.paren_depth = self.paren_depth.saturating_sub(1);
                    self.push_pending(index, ch);
                }
                _ => self.push_pending(index, ch),
            }
            if !ch.is_whitespace() {
                seen_on_line = true;
            }
        }
        if !self.pending.is_empty() {
            self.pending.push(' ');
        }
        code
    }

    fn push_pending(&mut self, index: usize, ch: char) {
        if self.pending.is_empty() {
            if ch.is_whitespace() {
                return;
            }
            self.pending_start = Some(index);
        }
        self.pending.push(ch);
    }

    fn reset_pending(&mut self) {
        self.pending.clear();
        self.pending_start = None;
        self.paren_depth = 0;
    }

    fn open_block(&mut self, index: usize, brace_on_header: bool) {
        let header = self.pending.trim().to_string();
        let start = self.pending_start.unwrap_or(index);
        let kind = if self.stack.is_empty() {
            function_signature(&header).unwrap_or(BlockKind::Other)
        } else if is_for_header(&header) {
            let end = if brace_on_header {
                index
            } else {
                index.saturating_sub(1).max(start)
            };
            BlockKind::Loop {
                header,
                header_lines: start..=end,
                brace_on_header,
            }
        } else {
            BlockKind::Other
        };
        self.stack.push(Block {
            kind,
            open_line: index,
        });
        self.reset_pending();
    }

    fn strip_comments(&mut self, line: &str) -> String {
        let mut code = String::with_capacity(line.len());
        let mut chars = line.chars().peekable();
        while let Some(ch) = chars.next() {
            if self.in_block_comment {
                if ch == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    self.in_block_comment = false;
                    code.push(' ');
                }
                continue;
            }
            if ch == '/' {
                match chars.peek() {
                    Some('/') => break,
                    Some('*') => {
                        chars.next();
                        self.in_block_comment = true;
                        continue;
                    }
                    _ => {}
                }
            }
            code.push(ch);
        }
        code
    }
}

fn function_signature(header: &str) -> Option<BlockKind> {
    let open = header.find('(')?;
    let tokens = tokenize(&header[..open]);
    let name = tokens.last().filter(|token| is_identifier(token))?;
    if tokens.len() < 2 || is_keyword(name) {
        return None;
    }
    let params = tokenize(&header[open..]);
    let out_color = params.windows(3).find_map(|window| {
        (matches!(window[0], "out" | "inout") && window[1] == "vec4" && is_identifier(window[2]))
            .then(|| window[2].to_string())
    });
    Some(BlockKind::Function {
        name: (*name).to_string(),
        out_color,
    })
}

fn is_for_header(header: &str) -> bool {
    header
        .strip_prefix("for")
        .and_then(|rest| rest.chars().next())
        .is_some_and(|next| next == '(' || next.is_whitespace())
}

#[derive(Debug, PartialEq, Eq)]
struct LoopClauses {
    init: String,
    step: String,
}

fn loop_clauses(header: &str) -> Option<LoopClauses> {
    let open = header.find('(')?;
    let mut depth = 1usize;
    let mut clauses = vec![String::new()];
    for ch in header[open + 1..].chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            ';' if depth == 1 => {
                clauses.push(String::new());
                continue;
            }
            _ => {}
        }
        clauses.last_mut()?.push(ch);
    }
    if depth != 0 || clauses.len() != 3 {
        return None;
    }
    Some(LoopClauses {
        init: clauses[0].trim().to_string(),
        step: clauses[2].trim().to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    Float,
    Int,
    Uint,
    Bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct GlslType {
    scalar: Scalar,
    len: u8,
}

impl GlslType {
    fn new(scalar: Scalar, len: u8) -> Self {
        Self { scalar, len }
    }

    fn parse(token: &str) -> Option<Self> {
        let (scalar, len) = match token {
            "float" => return Some(Self::new(Scalar::Float, 1)),
            "int" => return Some(Self::new(Scalar::Int, 1)),
            "uint" => return Some(Self::new(Scalar::Uint, 1)),
            "bool" => return Some(Self::new(Scalar::Bool, 1)),
            _ if token.starts_with("vec") => (Scalar::Float, &token[3..]),
            _ if token.starts_with("ivec") => (Scalar::Int, &token[4..]),
            _ if token.starts_with("uvec") => (Scalar::Uint, &token[4..]),
            _ if token.starts_with("bvec") => (Scalar::Bool, &token[4..]),
            _ => return None,
        };
        match len {
            "2" => Some(Self::new(scalar, 2)),
            "3" => Some(Self::new(scalar, 3)),
            "4" => Some(Self::new(scalar, 4)),
            _ => None,
        }
    }

    /// Expression turning a value of this type into an RGBA color.
    fn visualize(self, expr: &str) -> Option<String> {
        let float = self.scalar == Scalar::Float;
        let rendered = match (self.len, float) {
            (1, true) => format!("vec4(vec3({expr}),1.0)"),
            (1, false) => format!("vec4(vec3(float({expr})),1.0)"),
            (2, true) => format!("vec4({expr},0.0,1.0)"),
            (2, false) => format!("vec4(vec2({expr}),0.0,1.0)"),
            (3, true) => format!("vec4({expr},1.0)"),
            (3, false) => format!("vec4(vec3({expr}),1.0)"),
            (4, true) => expr.to_string(),
            (4, false) => format!("vec4({expr})"),
            _ => return None,
        };
        Some(rendered)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selector {
    None,
    Swizzle(u8),
    Index,
}

#[derive(Debug, PartialEq, Eq)]
struct Target {
    /// Expression to visualize, e.g. `col` or `col.rg`.
    expr: String,
    base: String,
    declared: Option<GlslType>,
    selector: Selector,
}

/// Recognizes `T name = ...;`, `name = ...;`, `name.xy += ...;`,
/// `name[i] = ...;` and `name++;`.
fn parse_target(statement: &str) -> Option<Target> {
    let tokens = tokenize(statement);
    let mut index = tokens
        .iter()
        .position(|token| !matches!(*token, "const" | "highp" | "mediump" | "lowp" | "precise"))?;

    if let Some(ty) = GlslType::parse(tokens[index]) {
        let name = *tokens.get(index + 1)?;
        if !is_identifier(name) || !matches!(tokens.get(index + 2).copied(), Some("=" | ";")) {
            return None;
        }
        return Some(Target {
            expr: name.to_string(),
            base: name.to_string(),
            declared: Some(ty),
            selector: Selector::None,
        });
    }

    let base = tokens[index];
    if !is_identifier(base) || is_keyword(base) {
        return None;
    }
    index += 1;
    let mut expr = base.to_string();
    let mut selector = Selector::None;
    match tokens.get(index).copied() {
        Some(".") => {
            let swizzle = *tokens.get(index + 1)?;
            if swizzle.is_empty()
                || swizzle.len() > 4
                || !swizzle.chars().all(|c| "xyzwrgbastpq".contains(c))
            {
                return None;
            }
            expr.push('.');
            expr.push_str(swizzle);
            selector = Selector::Swizzle(swizzle.len() as u8);
            index += 2;
        }
        Some("[") => {
            let mut depth = 0usize;
            loop {
                let token = *tokens.get(index)?;
                expr.push_str(token);
                index += 1;
                match token {
                    "[" => depth += 1,
                    "]" => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
            selector = Selector::Index;
        }
        _ => {}
    }

    let assigns = match (tokens.get(index).copied(), tokens.get(index + 1).copied()) {
        (Some("="), _) => true,
        (Some("+" | "-" | "*" | "/" | "%" | "&" | "|" | "^"), Some("=")) => true,
        (Some("+"), Some("+")) | (Some("-"), Some("-")) => true,
        _ => false,
    };
    assigns.then_some(Target {
        expr,
        base: base.to_string(),
        declared: None,
        selector,
    })
}

/// Type of the closest declaration of `name` in `code`, parameters included.
fn lookup_declaration(code: &[String], name: &str) -> Option<GlslType> {
    let joined = code.join("\n");
    let tokens = tokenize(&joined);
    let mut found = None;
    let mut depth = 0usize;
    let mut declaring: Option<(GlslType, usize)> = None;
    for (index, token) in tokens.iter().enumerate() {
        match *token {
            "(" => depth += 1,
            ")" => {
                depth = depth.saturating_sub(1);
                if declaring.is_some_and(|(_, at)| depth < at) {
                    declaring = None;
                }
            }
            ";" | "{" | "}" => declaring = None,
            _ => {}
        }
        if let Some(ty) = GlslType::parse(token) {
            if tokens.get(index + 1).is_some_and(|next| is_identifier(next)) {
                declaring = Some((ty, depth));
            }
            continue;
        }
        if *token != name || index == 0 {
            continue;
        }
        let previous = tokens[index - 1];
        if let Some(ty) = GlslType::parse(previous) {
            found = Some(ty);
        } else if previous == "," {
            if let Some((ty, at)) = declaring {
                if at == depth {
                    found = Some(ty);
                }
            }
        }
    }
    found
}

fn tokenize(code: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut chars = code.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        if ch.is_whitespace() {
            continue;
        }
        let leading_dot = ch == '.' && chars.peek().is_some_and(|(_, next)| next.is_ascii_digit());
        if ch.is_alphanumeric() || ch == '_' || leading_dot {
            let numeric = ch.is_ascii_digit() || leading_dot;
            let mut end = start + ch.len_utf8();
            while let Some(&(at, next)) = chars.peek() {
                let continues = next.is_alphanumeric() || next == '_' || (numeric && next == '.');
                if !continues {
                    break;
                }
                end = at + next.len_utf8();
                chars.next();
            }
            tokens.push(&code[start..end]);
        } else {
            tokens.push(&code[start..start + ch.len_utf8()]);
        }
    }
    tokens
}

fn is_identifier(token: &str) -> bool {
    token
        .chars()
        .next()
        .is_some_and(|first| first.is_alphabetic() || first == '_')
}

fn is_keyword(token: &str) -> bool {
    matches!(
        token,
        "if" | "else"
            | "for"
            | "while"
            | "do"
            | "switch"
            | "case"
            | "return"
            | "break"
            | "continue"
            | "discard"
            | "struct"
    )
}

fn indentation(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOOP_SHADER: &str = "\
uniform float unused;
void mainImage(out vec4 fragColor, in vec2 fragCoord) {
    vec2 uv = fragCoord / iResolution.xy;
    float acc = 0.0;
    for (int i = 0; i < 4; i++) {
        float wave = sin(uv.x * float(i));
        acc += wave;
    }
    fragColor = vec4(vec3(acc), 1.0);
}
float helper(float x) { return x; }
";

    fn line_of(source: &str, needle: &str) -> usize {
        source
            .lines()
            .position(|line| line.contains(needle))
            .unwrap()
    }

    #[test]
    fn manager_state_transitions() {
        let mut manager = ShaderDebugManager::new();
        manager.update_debug_line(4, "x;", "/a.glsl");
        assert!(!manager.is_active());
        assert!(manager.toggle_enabled());
        assert!(manager.is_active());
        assert!(manager.applies_to("/a.glsl"));
        assert!(!manager.applies_to("/b.glsl"));

        assert!(!manager.toggle_enabled());
        assert_eq!(manager.current_line(), None);
        assert!(!manager.is_active());
        manager.toggle_enabled();
        assert!(!manager.is_active());
    }

    #[test]
    fn flattens_loop_and_visualizes_float() {
        let target = line_of(LOOP_SHADER, "float wave");
        let rewritten = modify_shader_for_debugging(LOOP_SHADER, target, 0).unwrap();

        assert!(rewritten.contains("    int i = 0; // Loop init (first iteration only)"));
        assert!(!rewritten.contains("for ("));
        assert!(rewritten.contains("fragColor = vec4(vec3(wave),1.0);"));
        assert!(!rewritten.contains("acc += wave"));
        assert!(rewritten.contains("float helper(float x) { return x; }"));
        assert_eq!(rewritten.matches('{').count(), rewritten.matches('}').count());
    }

    #[test]
    fn compound_assignment_looks_up_declared_type() {
        let target = line_of(LOOP_SHADER, "acc += wave");
        let rewritten = modify_shader_for_debugging(LOOP_SHADER, target, 0).unwrap();
        assert!(rewritten.contains("fragColor = vec4(vec3(acc),1.0);"));
    }

    #[test]
    fn vec3_and_swizzle_targets() {
        let source = "\
void mainImage(out vec4 color, in vec2 fragCoord)
{
    vec3 col = vec3(0.2);
    col.rg = fragCoord / 100.0;
    color = vec4(col, 1.0);
}
";
        let rewritten = modify_shader_for_debugging(source, 2, 0).unwrap();
        assert!(rewritten.contains("color = vec4(col,1.0);"));

        let rewritten = modify_shader_for_debugging(source, 3, 0).unwrap();
        assert!(rewritten.contains("color = vec4(col.rg,0.0,1.0);"));
        assert!(!rewritten.contains("color = vec4(col, 1.0);"));
    }

    #[test]
    fn nested_loops_emit_every_initializer_outermost_first() {
        let source = "\
void mainImage(out vec4 fragColor, in vec2 fragCoord) {
    int i;
    for (i = 0; i < 3; i++) {
        for (int j = 0;
             j < 3; j++)
        {
            int k = i * j;
        }
    }
}
";
        let rewritten = modify_shader_for_debugging(source, 6, 0).unwrap();
        let outer = rewritten.find("i = 0; // Loop init").unwrap();
        let inner = rewritten.find("int j = 0; // Loop init").unwrap();
        assert!(outer < inner);
        assert!(!rewritten.contains("int i = 0"));
        assert!(!rewritten.contains("for"));
        assert!(!rewritten.contains("j < 3"));
        assert!(rewritten.contains("fragColor = vec4(vec3(float(k)),1.0);"));
        assert_eq!(rewritten.matches('{').count(), rewritten.matches('}').count());
    }

    #[test]
    fn iteration_index_repeats_the_innermost_step() {
        let target = line_of(LOOP_SHADER, "float wave");
        let rewritten = modify_shader_for_debugging(LOOP_SHADER, target, 2).unwrap();
        assert_eq!(rewritten.matches("    i++;").count(), 2);
        let init = rewritten.find("int i = 0;").unwrap();
        let step = rewritten.find("i++;").unwrap();
        assert!(init < step);
    }

    #[test]
    fn declared_vec4_passes_through() {
        let source = "\
void mainImage(out vec4 fragColor, in vec2 fragCoord) {
    vec4 tex = texture(iChannel0, fragCoord); // sample
    fragColor = tex;
}
";
        let rewritten = modify_shader_for_debugging(source, 1, 0).unwrap();
        assert_eq!(rewritten.matches("fragColor = tex;").count(), 1);
    }

    #[test]
    fn unrecognizable_targets_return_none() {
        // Outside mainImage.
        let helper = line_of(LOOP_SHADER, "float helper");
        assert_eq!(modify_shader_for_debugging(LOOP_SHADER, helper, 0), None);
        // Before any function.
        assert_eq!(modify_shader_for_debugging(LOOP_SHADER, 0, 0), None);
        // A loop header is not a statement.
        let header = line_of(LOOP_SHADER, "for (");
        assert_eq!(modify_shader_for_debugging(LOOP_SHADER, header, 0), None);
        // Past the end.
        assert_eq!(modify_shader_for_debugging(LOOP_SHADER, 500, 0), None);
        // Not an assignment.
        let source = "void mainImage(out vec4 c, in vec2 p) {\n    return;\n}\n";
        assert_eq!(modify_shader_for_debugging(source, 1, 0), None);
        // Unknown variable.
        let source = "void mainImage(out vec4 c, in vec2 p) {\n    mystery = 1.0;\n}\n";
        assert_eq!(modify_shader_for_debugging(source, 1, 0), None);
    }

    #[test]
    fn comments_do_not_confuse_the_scanner() {
        let source = "\
/* mainImage { */
void mainImage(out vec4 fragColor, in vec2 fragCoord) {
    // for (int z = 0; z < 1; z++) {
    float v = 0.5; /* } */
}
";
        let rewritten = modify_shader_for_debugging(source, 3, 0).unwrap();
        assert!(rewritten.contains("fragColor = vec4(vec3(v),1.0);"));
        assert!(!rewritten.contains("Loop init"));
    }

    #[test]
    fn debug_source_respects_the_cursor_file() {
        let mut manager = ShaderDebugManager::new();
        manager.toggle_enabled();
        let target = line_of(LOOP_SHADER, "float wave");
        manager.update_debug_line(target, "float wave", "/proj/other.glsl");
        assert_eq!(manager.debug_source(LOOP_SHADER, "/proj/main.glsl"), None);

        manager.update_debug_line(target, "float wave", "/proj/main.glsl");
        assert!(manager
            .debug_source(LOOP_SHADER, "/proj/main.glsl")
            .unwrap()
            .contains("vec4(vec3(wave),1.0)"));
    }
}
