use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;
use swc_common::sync::Lrc;
use swc_common::{BytePos, FileName, SourceMap, Span, Spanned};
use swc_ecma_ast::{
    BinaryOp, CallExpr, Callee, ExportAll, Expr, ExprStmt, ImportDecl, JSXAttr, JSXAttrName,
    JSXAttrValue, JSXElement, JSXElementName, JSXText, Lit, MemberExpr, MemberProp, Module,
    NamedExport, NewExpr, PropName, Str, SwitchCase, ThrowStmt, TsEnumMemberId,
    TsExternalModuleRef, TsModuleName, TsType,
};
use swc_ecma_parser::{lexer::Lexer, Parser, StringInput, Syntax, TsSyntax};
use swc_ecma_visit::{Visit, VisitWith};
use unicode_normalization::{is_nfc_quick, IsNormalized, UnicodeNormalization};

use crate::config::Config;
use crate::error::LiftError;
use crate::patch::LineIndex;

/// How a candidate must be re-emitted by the rewriter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SyntacticContext {
    StringLiteral,
    MarkupText,
    MarkupAttribute,
}

/// A discovered piece of text that might need translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Unescaped, NFC-normalized, whitespace-collapsed content
    pub text: String,
    /// The token exactly as it appears in the file (quotes included for literals)
    pub raw: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub syntactic_context: SyntacticContext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub surrounding_context: String,
}

/// One item yielded by the traversal, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Occurrence {
    Candidate(Candidate),
    /// An existing translation-lookup call
    Translated {
        line: usize,
        column: usize,
        key: Option<String>,
    },
}

impl Occurrence {
    fn position(&self) -> (usize, usize) {
        match self {
            Occurrence::Candidate(c) => (c.line, c.column),
            Occurrence::Translated { line, column, .. } => (*line, *column),
        }
    }
}

/// Matching rules derived from the configuration.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub attributes: HashSet<String>,
    pub excluded_attributes: HashSet<String>,
    pub translation_functions: Vec<String>,
    pub binding_functions: HashSet<String>,
}

impl ScanOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            attributes: config.attributes.iter().cloned().collect(),
            excluded_attributes: config.excluded_attributes.iter().cloned().collect(),
            translation_functions: config.translation_functions.clone(),
            binding_functions: [config.binding.hook.clone(), config.binding.server.clone()]
                .into_iter()
                .collect(),
        }
    }

    fn is_translation_call(&self, name: &str) -> bool {
        if self.translation_functions.iter().any(|f| f == name) {
            return true;
        }
        if name.ends_with(".t") {
            return true;
        }
        is_accessor_name(name)
    }
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// `tCommon`, `tDelivererWallet`: a per-namespace lookup accessor.
pub fn is_accessor_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('t')
        && chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A parsed module plus the offset that maps its spans back to byte
/// offsets in the source string.
pub struct ParsedModule {
    pub module: Module,
    base: u32,
}

impl ParsedModule {
    pub fn offset(&self, pos: BytePos) -> usize {
        pos.0.saturating_sub(self.base) as usize
    }

    pub fn range(&self, span: Span) -> (usize, usize) {
        (self.offset(span.lo), self.offset(span.hi))
    }
}

/// Parse a source file. Recoverable syntax errors are tolerated; a fatal
/// one becomes `RecoverableParse` so the caller can skip the file.
pub fn parse_source(source: &str, file: &str) -> Result<ParsedModule, LiftError> {
    let path = Path::new(file);
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(
        FileName::Real(path.to_path_buf()).into(),
        source.to_string(),
    );
    let base = fm.start_pos.0;

    let is_tsx = path
        .extension()
        .map(|ext| ext == "tsx" || ext == "jsx" || ext == "js")
        .unwrap_or(false);

    let syntax = Syntax::Typescript(TsSyntax {
        tsx: is_tsx,
        decorators: true,
        ..Default::default()
    });

    let lexer = Lexer::new(syntax, Default::default(), StringInput::from(&*fm), None);
    let mut parser = Parser::new_from(lexer);

    let module = match parser.parse_module() {
        Ok(module) => module,
        Err(e) => {
            let offset = e.span().lo.0.saturating_sub(base) as usize;
            let (line, column) = LineIndex::new(source).position(offset.min(source.len()));
            return Err(LiftError::RecoverableParse {
                file: file.to_string(),
                line,
                column,
                message: format!("{:?}", e.kind()),
            });
        }
    };

    let recovered = parser.take_errors();
    if !recovered.is_empty() {
        crate::logging::debug(&format!(
            "{}: recovered from {} syntax error(s)",
            file,
            recovered.len()
        ));
    }

    Ok(ParsedModule { module, base })
}

/// Scan one file's content and return its occurrences ordered by position.
pub fn scan_source(
    source: &str,
    file: &str,
    options: &ScanOptions,
) -> Result<Vec<Occurrence>, LiftError> {
    let parsed = parse_source(source, file)?;
    Ok(scan_parsed(&parsed, source, file, options))
}

/// Same as [`scan_source`] over a module that is already parsed.
pub fn scan_parsed(
    parsed: &ParsedModule,
    source: &str,
    file: &str,
    options: &ScanOptions,
) -> Vec<Occurrence> {
    let mut visitor = CandidateVisitor {
        source,
        parsed,
        index: LineIndex::new(source),
        file,
        options,
        suppressed: 0,
        occurrences: Vec::new(),
    };
    parsed.module.visit_with(&mut visitor);

    let mut occurrences = visitor.occurrences;
    occurrences.sort_by_key(|o| o.position());
    occurrences
}

const IGNORED_TAGS: [&str; 4] = ["style", "script", "code", "pre"];
const CONTEXT_RADIUS: usize = 2;

/// Collects candidates. `suppressed` counts enclosing structural contexts
/// (excluded attributes, equality tests, error constructors, ...) whose
/// strings are never UI text.
struct CandidateVisitor<'a> {
    source: &'a str,
    parsed: &'a ParsedModule,
    index: LineIndex<'a>,
    file: &'a str,
    options: &'a ScanOptions,
    suppressed: usize,
    occurrences: Vec<Occurrence>,
}

impl<'a> CandidateVisitor<'a> {
    fn suppress(&mut self, f: impl FnOnce(&mut Self)) {
        self.suppressed += 1;
        f(self);
        self.suppressed -= 1;
    }

    fn slice(&self, span: Span) -> Option<(usize, &'a str)> {
        let (start, end) = self.parsed.range(span);
        self.source.get(start..end).map(|s| (start, s))
    }

    fn push_candidate(
        &mut self,
        start: usize,
        raw: &str,
        text: String,
        context: SyntacticContext,
        attribute: Option<String>,
    ) {
        if text.is_empty() {
            return;
        }
        let (line, column) = self.index.position(start);
        self.occurrences.push(Occurrence::Candidate(Candidate {
            text,
            raw: raw.to_string(),
            file: self.file.to_string(),
            line,
            column,
            syntactic_context: context,
            attribute,
            surrounding_context: self.index.window(line, CONTEXT_RADIUS),
        }));
    }

    fn record_translated(&mut self, call: &CallExpr) {
        let key = call.args.first().and_then(|arg| match arg.expr.as_ref() {
            Expr::Lit(Lit::Str(s)) => s.value.as_str().map(|v| v.to_string()),
            _ => None,
        });
        let (line, column) = self.index.position(self.parsed.offset(call.span.lo));
        self.occurrences
            .push(Occurrence::Translated { line, column, key });
    }
}

fn callee_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Ident(ident) => Some(ident.sym.to_string()),
        Expr::Member(member) => {
            let object = callee_name(&member.obj)?;
            match &member.prop {
                MemberProp::Ident(prop) => Some(format!("{}.{}", object, prop.sym)),
                _ => None,
            }
        }
        Expr::Paren(paren) => callee_name(&paren.expr),
        _ => None,
    }
}

fn attr_name(name: &JSXAttrName) -> String {
    match name {
        JSXAttrName::Ident(ident) => ident.sym.to_string(),
        JSXAttrName::JSXNamespacedName(ns) => format!("{}:{}", ns.ns.sym, ns.name.sym),
    }
}

impl<'a> Visit for CandidateVisitor<'a> {
    fn visit_import_decl(&mut self, _: &ImportDecl) {}

    fn visit_named_export(&mut self, _: &NamedExport) {}

    fn visit_export_all(&mut self, _: &ExportAll) {}

    fn visit_ts_external_module_ref(&mut self, _: &TsExternalModuleRef) {}

    fn visit_ts_module_name(&mut self, _: &TsModuleName) {}

    fn visit_ts_enum_member_id(&mut self, _: &TsEnumMemberId) {}

    fn visit_ts_type(&mut self, _: &TsType) {}

    fn visit_prop_name(&mut self, _: &PropName) {}

    fn visit_throw_stmt(&mut self, _: &ThrowStmt) {}

    fn visit_expr_stmt(&mut self, stmt: &ExprStmt) {
        // "use client", "use strict" and other directives
        if matches!(stmt.expr.as_ref(), Expr::Lit(Lit::Str(_))) {
            return;
        }
        stmt.visit_children_with(self);
    }

    fn visit_call_expr(&mut self, call: &CallExpr) {
        let callee = match &call.callee {
            Callee::Import(_) => return,
            Callee::Expr(expr) => expr,
            Callee::Super(_) => {
                call.visit_children_with(self);
                return;
            }
        };

        if let Some(name) = callee_name(callee) {
            if name == "require"
                || name.starts_with("console.")
                || self.options.binding_functions.contains(&name)
            {
                return;
            }
            if self.options.is_translation_call(&name) {
                self.record_translated(call);
                return;
            }
        }

        call.visit_children_with(self);
    }

    fn visit_new_expr(&mut self, expr: &NewExpr) {
        if let Expr::Ident(ident) = expr.callee.as_ref() {
            if ident.sym.ends_with("Error") {
                return;
            }
        }
        expr.visit_children_with(self);
    }

    fn visit_bin_expr(&mut self, expr: &swc_ecma_ast::BinExpr) {
        match expr.op {
            BinaryOp::EqEq | BinaryOp::NotEq | BinaryOp::EqEqEq | BinaryOp::NotEqEq
            | BinaryOp::In | BinaryOp::InstanceOf => {
                self.suppress(|v| expr.visit_children_with(v))
            }
            _ => expr.visit_children_with(self),
        }
    }

    fn visit_switch_case(&mut self, case: &SwitchCase) {
        if let Some(test) = &case.test {
            self.suppress(|v| test.visit_with(v));
        }
        for stmt in &case.cons {
            stmt.visit_with(self);
        }
    }

    fn visit_member_expr(&mut self, expr: &MemberExpr) {
        expr.obj.visit_with(self);
        if let MemberProp::Computed(prop) = &expr.prop {
            self.suppress(|v| prop.visit_with(v));
        }
    }

    fn visit_str(&mut self, s: &Str) {
        if self.suppressed > 0 {
            return;
        }
        let Some(value) = s.value.as_str() else {
            return;
        };
        let Some((start, raw)) = self.slice(s.span) else {
            return;
        };
        if !(raw.starts_with('"') || raw.starts_with('\'')) {
            return;
        }
        let text = normalize_text(value);
        self.push_candidate(start, raw, text, SyntacticContext::StringLiteral, None);
    }

    fn visit_jsx_element(&mut self, elem: &JSXElement) {
        let ignored = match &elem.opening.name {
            JSXElementName::Ident(ident) => {
                IGNORED_TAGS.contains(&ident.sym.to_lowercase().as_str())
            }
            _ => false,
        };

        if ignored {
            elem.opening.visit_with(self);
            return;
        }

        elem.visit_children_with(self);
    }

    fn visit_jsx_attr(&mut self, attr: &JSXAttr) {
        let name = attr_name(&attr.name);
        if self.options.excluded_attributes.contains(&name) {
            return;
        }

        match &attr.value {
            Some(JSXAttrValue::Str(s)) => {
                if self.suppressed > 0 || !self.options.attributes.contains(&name) {
                    return;
                }
                let Some((start, raw)) = self.slice(s.span) else {
                    return;
                };
                let inner = raw
                    .get(1..raw.len().saturating_sub(1))
                    .unwrap_or_default();
                let text = normalize_text(&decode_entities(inner));
                self.push_candidate(
                    start,
                    raw,
                    text,
                    SyntacticContext::MarkupAttribute,
                    Some(name),
                );
            }
            Some(value) => value.visit_with(self),
            None => {}
        }
    }

    fn visit_jsx_text(&mut self, node: &JSXText) {
        if self.suppressed > 0 {
            return;
        }
        let Some((start, raw_value)) = self.slice(node.span) else {
            return;
        };
        let trimmed = raw_value.trim();
        if trimmed.is_empty() {
            return;
        }
        let leading = raw_value.len() - raw_value.trim_start().len();
        let text = normalize_text(&decode_entities(trimmed));
        self.push_candidate(
            start + leading,
            trimmed,
            text,
            SyntacticContext::MarkupText,
            None,
        );
    }
}

/// NFC-normalize and collapse runs of whitespace to single spaces.
pub fn normalize_text(text: &str) -> String {
    let nfc: Cow<'_, str> = if is_nfc_quick(text.chars()) == IsNormalized::Yes {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.nfc().collect())
    };
    nfc.split_whitespace().collect::<Vec<_>>().join(" ")
}

const NAMED_ENTITIES: [(&str, char); 16] = [
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
    ("copy", '©'),
    ("reg", '®'),
    ("trade", '™'),
    ("hellip", '…'),
    ("mdash", '—'),
    ("ndash", '–'),
    ("lsquo", '‘'),
    ("rsquo", '’'),
    ("ldquo", '“'),
    ("rdquo", '”'),
];

/// Decode the HTML character references JSX text and attribute strings allow.
/// Unknown references are left as written.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').filter(|end| *end <= 10).and_then(|end| {
            let name = &tail[1..end];
            let ch = if let Some(num) = name.strip_prefix('#') {
                let code = match num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num.parse::<u32>().ok(),
                };
                code.and_then(char::from_u32)
            } else {
                NAMED_ENTITIES
                    .iter()
                    .find(|(entity, _)| *entity == name)
                    .map(|(_, ch)| *ch)
            };
            ch.map(|c| (c, end))
        });

        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Cow::Owned(out)
}
