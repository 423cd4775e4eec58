//! Key template compiler.
//!
//! Turns a parsed template into a [`CompiledTemplate`]: reserved identifiers
//! are folded into literal text, every other reference is checked against
//! the method's parameters and the builtin table. A compiled template can be
//! evaluated in-process or emitted as a Rust expression; both renderings
//! go through the runtime's `keys` functions and agree for equal inputs.

pub mod builtins;

pub use builtins::{Arity, Builtin, BuiltinTable, EmitStrategy};

use crate::parser::{parse, CallExpr, Expr, Part, PathExpr, TemplateAst};
use lacquer_core::{ContractSpec, MethodSpec, ParamKind, StaticIdent, TemplateError};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// ============================================================================
// COMPILED FORM
// ============================================================================

/// A parameter followed by a chain of field accesses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    pub param: String,
    pub fields: Vec<String>,
}

impl FieldPath {
    pub fn param(name: impl Into<String>) -> Self {
        Self {
            param: name.into(),
            fields: Vec::new(),
        }
    }

    /// Rust place expression, e.g. `req.user.id`.
    pub fn rust_expr(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.param)?;
        for field in &self.fields {
            write!(f, ".{}", field)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Field(FieldPath),
    Builtin {
        name: String,
        strategy: EmitStrategy,
        args: Vec<FieldPath>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    source: String,
    segments: Vec<Segment>,
    dependencies: BTreeSet<String>,
}

impl CompiledTemplate {
    /// Template text this was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of the parameters the rendered key depends on.
    pub fn dependencies(&self) -> &BTreeSet<String> {
        &self.dependencies
    }

    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Render the key for concrete argument values. Missing parameters and
    /// fields render as empty.
    pub fn evaluate(&self, args: &TemplateArgs) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(path) => {
                    out.push_str(&lacquer_runtime::keys::render_value(&args.resolve(path)))
                }
                Segment::Builtin { strategy, args: operands, .. } => {
                    let operand = match operands.as_slice() {
                        [] => Value::Array(Vec::new()),
                        [single] => args.resolve(single),
                        many => Value::Array(many.iter().map(|p| args.resolve(p)).collect()),
                    };
                    out.push_str(&strategy.apply(&operand));
                }
            }
        }
        out
    }

    /// Rust expression of type `String` that renders this key, with
    /// parameters referenced by name and builtins called through
    /// `<runtime_path>::keys`.
    pub fn to_rust_expr(&self, runtime_path: &str) -> String {
        let rt = runtime_path.trim_end_matches("::");

        if self.is_literal() {
            let text: String = self
                .segments
                .iter()
                .filter_map(|s| match s {
                    Segment::Literal(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect();
            return format!("String::from({:?})", text);
        }

        let mut format_str = String::new();
        let mut format_args = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => {
                    format_str.push_str(&text.replace('{', "{{").replace('}', "}}"))
                }
                Segment::Field(path) => {
                    format_str.push_str("{}");
                    format_args.push(format!("{}::keys::segment(&{})", rt, path.rust_expr()));
                }
                Segment::Builtin { strategy, args, .. } => {
                    format_str.push_str("{}");
                    format_args.push(format!(
                        "{}::keys::{}({})",
                        rt,
                        strategy.runtime_fn(),
                        operand_expr(args)
                    ));
                }
            }
        }

        format!("format!({:?}, {})", format_str, format_args.join(", "))
    }
}

impl fmt::Display for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn operand_expr(args: &[FieldPath]) -> String {
    match args {
        [] => "&[(); 0]".to_string(),
        [single] => format!("&{}", single.rust_expr()),
        many => {
            let parts: Vec<String> = many.iter().map(|p| format!("&{}", p.rust_expr())).collect();
            format!("&({})", parts.join(", "))
        }
    }
}

// ============================================================================
// EVALUATION INPUT
// ============================================================================

/// Argument values keyed by parameter name, in their JSON form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateArgs {
    values: BTreeMap<String, Value>,
}

impl TemplateArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument. A value that fails to serialize is stored as `null`.
    pub fn with<T: Serialize + ?Sized>(mut self, name: impl Into<String>, value: &T) -> Self {
        self.insert(name, serde_json::to_value(value).unwrap_or(Value::Null));
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Follow a field path through nested objects.
    pub fn resolve(&self, path: &FieldPath) -> Value {
        let mut current = match self.values.get(&path.param) {
            Some(v) => v,
            None => return Value::Null,
        };
        for field in &path.fields {
            match current.get(field) {
                Some(v) => current = v,
                None => return Value::Null,
            }
        }
        current.clone()
    }
}

// ============================================================================
// COMPILER
// ============================================================================

/// Compiles templates against one method's signature.
#[derive(Debug, Clone, Copy)]
pub struct TemplateCompiler<'b> {
    builtins: &'b BuiltinTable,
}

impl<'b> TemplateCompiler<'b> {
    pub fn new(builtins: &'b BuiltinTable) -> Self {
        Self { builtins }
    }

    pub fn builtins(&self) -> &'b BuiltinTable {
        self.builtins
    }

    /// Parse and compile `template` for `method` of `contract`.
    pub fn compile(
        &self,
        template: &str,
        contract: &ContractSpec,
        method: &MethodSpec,
    ) -> Result<CompiledTemplate, TemplateError> {
        let ast = parse(template)?;
        let compiled = self.compile_ast(template, &ast, contract, method)?;
        tracing::debug!(
            contract = %contract.name,
            method = %method.name,
            template,
            segments = compiled.segments.len(),
            "compiled key template"
        );
        Ok(compiled)
    }

    /// Compile an already-parsed template.
    pub fn compile_ast(
        &self,
        source: &str,
        ast: &TemplateAst,
        contract: &ContractSpec,
        method: &MethodSpec,
    ) -> Result<CompiledTemplate, TemplateError> {
        let mut builder = SegmentBuilder::default();

        for part in &ast.parts {
            match part {
                Part::Text(text) => builder.literal(text),
                Part::Placeholder(placeholder) => match &placeholder.expr {
                    Expr::Call(call) => {
                        let segment = self.compile_call(call, method)?;
                        builder.push(segment);
                    }
                    Expr::Path(path) => {
                        self.compile_bare(path, contract, method, &mut builder)?;
                    }
                },
            }
        }

        Ok(builder.finish(source))
    }

    fn compile_bare(
        &self,
        path: &PathExpr,
        contract: &ContractSpec,
        method: &MethodSpec,
        builder: &mut SegmentBuilder,
    ) -> Result<(), TemplateError> {
        if let Some(ident) = StaticIdent::from_ident(&path.root) {
            if let Some(field) = path.fields.first() {
                return Err(TemplateError::UnknownField {
                    param: path.root.clone(),
                    field: field.clone(),
                    position: path.span.start,
                });
            }
            builder.literal(ident.resolve(contract, method));
            return Ok(());
        }

        if method.param(&path.root).is_some() {
            let field = resolve_operand(path, method)?;
            builder.push(Segment::Field(field));
            return Ok(());
        }

        if path.fields.is_empty() && self.builtins.contains(&path.root) {
            let call = CallExpr {
                name: path.root.clone(),
                args: Vec::new(),
                span: path.span,
            };
            let segment = self.compile_call(&call, method)?;
            builder.push(segment);
            return Ok(());
        }

        Err(TemplateError::UnknownParameter {
            name: path.root.clone(),
            position: path.span.start,
        })
    }

    fn compile_call(&self, call: &CallExpr, method: &MethodSpec) -> Result<Segment, TemplateError> {
        let builtin = self
            .builtins
            .get(&call.name)
            .ok_or_else(|| TemplateError::UnknownBuiltin {
                name: call.name.clone(),
                position: call.span.start,
            })?;

        if !builtin.arity.accepts(call.args.len()) {
            return Err(TemplateError::WrongArity {
                name: call.name.clone(),
                expected: builtin.arity.to_string(),
                got: call.args.len(),
                position: call.span.start,
            });
        }

        let args = if call.args.is_empty() && builtin.arity.is_variadic() {
            method
                .value_params()
                .map(|p| FieldPath::param(p.name.clone()))
                .collect()
        } else {
            call.args
                .iter()
                .map(|arg| resolve_operand(arg, method))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Segment::Builtin {
            name: call.name.clone(),
            strategy: builtin.strategy,
            args,
        })
    }
}

/// Check a path against the method signature.
fn resolve_operand(path: &PathExpr, method: &MethodSpec) -> Result<FieldPath, TemplateError> {
    let param = method
        .param(&path.root)
        .ok_or_else(|| TemplateError::UnknownParameter {
            name: path.root.clone(),
            position: path.span.start,
        })?;

    if param.kind == ParamKind::Context {
        return Err(TemplateError::ContextOperand {
            name: param.name.clone(),
            position: path.span.start,
        });
    }

    if let (Some(known), Some(first)) = (&param.fields, path.fields.first()) {
        if !known.iter().any(|f| f == first) {
            return Err(TemplateError::UnknownField {
                param: param.name.clone(),
                field: first.clone(),
                position: path.span.start,
            });
        }
    }

    Ok(FieldPath {
        param: param.name.clone(),
        fields: path.fields.clone(),
    })
}

/// Accumulates segments, merging adjacent literals.
#[derive(Default)]
struct SegmentBuilder {
    segments: Vec<Segment>,
    dependencies: BTreeSet<String>,
}

impl SegmentBuilder {
    fn literal(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Literal(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Literal(text.to_string()));
        }
    }

    fn push(&mut self, segment: Segment) {
        match &segment {
            Segment::Literal(text) => {
                let text = text.clone();
                self.literal(&text);
                return;
            }
            Segment::Field(path) => {
                self.dependencies.insert(path.param.clone());
            }
            Segment::Builtin { args, .. } => {
                self.dependencies
                    .extend(args.iter().map(|p| p.param.clone()));
            }
        }
        self.segments.push(segment);
    }

    fn finish(self, source: &str) -> CompiledTemplate {
        CompiledTemplate {
            source: source.to_string(),
            segments: self.segments,
            dependencies: self.dependencies,
        }
    }
}

/// Compile with the standard builtin table.
pub fn compile_template(
    template: &str,
    contract: &ContractSpec,
    method: &MethodSpec,
) -> Result<CompiledTemplate, TemplateError> {
    TemplateCompiler::new(&BuiltinTable::standard()).compile(template, contract, method)
}
