use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use swc_ecma_ast::{
    BlockStmt, BlockStmtOrExpr, Decl, DefaultDecl, Expr, ImportSpecifier, Lit, ModuleDecl,
    ModuleItem, Pat, Stmt,
};

use crate::config::{BindingConfig, Config};
use crate::error::LiftError;
use crate::keys::{pascal_case, KeyedCandidate};
use crate::patch::{self, LineIndex, Replacement};
use crate::scanner::{
    parse_source, scan_parsed, Candidate, Occurrence, ParsedModule, ScanOptions,
    SyntacticContext,
};
use crate::store::KeyStore;

/// Why a planned replacement was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// The recorded token is no longer at its recorded position
    Drift,
    /// The token is gone and the lookup call that replaces it is present
    AlreadyApplied,
    /// The token is outside the component body the accessor is injected into
    OutOfScope,
    /// The key is not in the source locale any more
    MissingKey,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Drift => "drift",
            SkipReason::AlreadyApplied => "already-applied",
            SkipReason::OutOfScope => "out-of-scope",
            SkipReason::MissingKey => "missing-key",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedCandidate {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub key: String,
    pub text: String,
    pub reason: SkipReason,
}

impl SkippedCandidate {
    /// The error a drift skip stands for; other skips are not errors.
    pub fn drift_error(&self) -> Option<LiftError> {
        match self.reason {
            SkipReason::Drift => Some(LiftError::CandidateDrift {
                file: self.file.clone(),
                line: self.line,
                expected: self.text.clone(),
            }),
            _ => None,
        }
    }
}

/// Outcome of rewriting one file. `content` equals the input when nothing
/// was applied.
#[derive(Debug, Clone)]
pub struct FileRewrite {
    pub file: String,
    pub content: String,
    /// Every splice made, insertions included
    pub replacements: Vec<Replacement>,
    /// Candidates replaced by a lookup call
    pub applied: usize,
    pub skipped: Vec<SkippedCandidate>,
    pub import_added: bool,
    pub accessors_added: Vec<String>,
}

impl FileRewrite {
    pub fn changed(&self) -> bool {
        !self.replacements.is_empty()
    }
}

/// The component that receives the accessor declarations: the first
/// exported function, or exported `const` bound to an arrow / function
/// expression with a block body, whose name starts with an uppercase letter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionTarget {
    pub name: String,
    pub is_async: bool,
    /// Offset of the body's `{`
    pub body_start: usize,
    /// Offset just past the body's `}`
    pub body_end: usize,
    first_statement: Option<usize>,
    declared: BTreeSet<String>,
}

fn is_component_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

fn target_from_block(
    parsed: &ParsedModule,
    name: &str,
    is_async: bool,
    body: &BlockStmt,
) -> Option<InjectionTarget> {
    if !is_component_name(name) {
        return None;
    }
    let (body_start, body_end) = parsed.range(body.span);
    let first_statement = body
        .stmts
        .first()
        .map(|stmt| parsed.offset(swc_common::Spanned::span(stmt).lo));

    let mut declared = BTreeSet::new();
    for stmt in &body.stmts {
        if let Stmt::Decl(Decl::Var(var)) = stmt {
            for decl in &var.decls {
                if let Pat::Ident(binding) = &decl.name {
                    declared.insert(binding.id.sym.to_string());
                }
            }
        }
    }

    Some(InjectionTarget {
        name: name.to_string(),
        is_async,
        body_start,
        body_end,
        first_statement,
        declared,
    })
}

/// Find the injection target. Items that do not fit the rule are passed
/// over; `None` when no item does.
pub fn find_injection_target(parsed: &ParsedModule) -> Option<InjectionTarget> {
    for item in &parsed.module.body {
        let ModuleItem::ModuleDecl(decl) = item else {
            continue;
        };
        let found = match decl {
            ModuleDecl::ExportDecl(export) => match &export.decl {
                Decl::Fn(f) => f.function.body.as_ref().and_then(|body| {
                    target_from_block(parsed, &f.ident.sym, f.function.is_async, body)
                }),
                Decl::Var(var) => var.decls.iter().find_map(|declarator| {
                    let Pat::Ident(binding) = &declarator.name else {
                        return None;
                    };
                    let name = binding.id.sym.to_string();
                    match declarator.init.as_deref()? {
                        Expr::Arrow(arrow) => match arrow.body.as_ref() {
                            BlockStmtOrExpr::BlockStmt(body) => {
                                target_from_block(parsed, &name, arrow.is_async, body)
                            }
                            _ => None,
                        },
                        Expr::Fn(f) => f.function.body.as_ref().and_then(|body| {
                            target_from_block(parsed, &name, f.function.is_async, body)
                        }),
                        _ => None,
                    }
                }),
                _ => None,
            },
            ModuleDecl::ExportDefaultDecl(export) => match &export.decl {
                DefaultDecl::Fn(f) => match (&f.ident, f.function.body.as_ref()) {
                    (Some(ident), Some(body)) => {
                        target_from_block(parsed, &ident.sym, f.function.is_async, body)
                    }
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Where the module's imports and directive prologue end.
#[derive(Debug, Clone, Default)]
struct ModuleHead {
    last_import_end: Option<usize>,
    directives_end: Option<usize>,
    imported_names: BTreeSet<String>,
}

fn module_head(parsed: &ParsedModule) -> ModuleHead {
    let mut head = ModuleHead::default();
    let mut in_prologue = true;

    for item in &parsed.module.body {
        match item {
            ModuleItem::Stmt(Stmt::Expr(stmt))
                if in_prologue && matches!(stmt.expr.as_ref(), Expr::Lit(Lit::Str(_))) =>
            {
                head.directives_end = Some(parsed.offset(stmt.span.hi));
            }
            ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
                in_prologue = false;
                head.last_import_end = Some(parsed.offset(import.span.hi));
                for specifier in &import.specifiers {
                    let local = match specifier {
                        ImportSpecifier::Named(named) => &named.local,
                        ImportSpecifier::Default(default) => &default.local,
                        ImportSpecifier::Namespace(ns) => &ns.local,
                    };
                    head.imported_names.insert(local.sym.to_string());
                }
            }
            _ => in_prologue = false,
        }
    }

    head
}

/// `t` + PascalCase(namespace), e.g. `tDelivererWallet`.
pub fn accessor_name(namespace: &str) -> String {
    let pascal = pascal_case(namespace);
    if pascal.is_empty() {
        "tMessages".to_string()
    } else {
        format!("t{}", pascal)
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

pub struct Rewriter<'a> {
    binding: &'a BindingConfig,
    source_locale: &'a str,
    options: ScanOptions,
}

impl<'a> Rewriter<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            binding: &config.binding,
            source_locale: &config.source_locale,
            options: ScanOptions::from_config(config),
        }
    }

    /// The call that replaces a candidate, without context wrapping.
    pub fn lookup_call(entry: &KeyedCandidate) -> String {
        format!(
            "{}({})",
            accessor_name(&entry.namespace),
            quote(entry.relative_key())
        )
    }

    fn replacement_code(entry: &KeyedCandidate) -> String {
        let call = Self::lookup_call(entry);
        match entry.candidate.syntactic_context {
            SyntacticContext::StringLiteral => call,
            SyntacticContext::MarkupAttribute | SyntacticContext::MarkupText => {
                format!("{{{}}}", call)
            }
        }
    }

    /// Plan and apply every replacement for one file against `content`.
    /// Per-candidate problems become skips; a parse or splice failure fails
    /// the whole file and nothing is returned to write.
    pub fn rewrite_source(
        &self,
        file: &str,
        content: &str,
        entries: &[&KeyedCandidate],
        store: &KeyStore,
    ) -> Result<FileRewrite, LiftError> {
        let parsed = parse_source(content, file)?;
        let index = LineIndex::new(content);
        let target = find_injection_target(&parsed);
        let tokens = current_tokens(&parsed, content, file, &index, &self.options);

        let mut ordered: Vec<&KeyedCandidate> = entries.to_vec();
        ordered.sort_by_key(|e| std::cmp::Reverse((e.candidate.line, e.candidate.column)));

        let mut planned: BTreeMap<usize, Replacement> = BTreeMap::new();
        let mut namespaces: BTreeSet<&str> = BTreeSet::new();
        let mut skipped = Vec::new();

        for entry in ordered {
            match self.plan_one(content, &tokens, target.as_ref(), entry, store) {
                Ok(replacement) => {
                    if planned.contains_key(&replacement.start) {
                        continue;
                    }
                    namespaces.insert(entry.namespace.as_str());
                    planned.insert(replacement.start, replacement);
                }
                Err(reason) => skipped.push(SkippedCandidate {
                    file: file.to_string(),
                    line: entry.candidate.line,
                    column: entry.candidate.column,
                    key: entry.suggested_key.clone(),
                    text: entry.candidate.text.clone(),
                    reason,
                }),
            }
        }

        let applied = planned.len();
        let mut replacements: Vec<Replacement> = planned.into_values().collect();
        let mut import_added = false;
        let mut accessors_added = Vec::new();

        if let (Some(target), true) = (target.as_ref(), applied > 0) {
            let head = module_head(&parsed);
            let (binding_name, binding_source) = if target.is_async {
                (&self.binding.server, &self.binding.server_source)
            } else {
                (&self.binding.hook, &self.binding.hook_source)
            };

            if !head.imported_names.contains(binding_name.as_str()) {
                let statement = format!(
                    "import {{ {} }} from {};",
                    binding_name,
                    quote(binding_source)
                );
                let insertion = match head.last_import_end.or(head.directives_end) {
                    Some(at) => Replacement::insert(at, format!("\n{}", statement)),
                    None => Replacement::insert(0, format!("{}\n", statement)),
                };
                replacements.push(insertion);
                import_added = true;
            }

            let indent = body_indent(&index, target);
            for namespace in namespaces {
                let accessor = accessor_name(namespace);
                if target.declared.contains(&accessor) {
                    continue;
                }
                let declaration = if target.is_async {
                    format!(
                        "const {} = await {}({});",
                        accessor,
                        binding_name,
                        quote(namespace)
                    )
                } else {
                    format!("const {} = {}({});", accessor, binding_name, quote(namespace))
                };
                replacements.push(Replacement::insert(
                    target.body_start + 1,
                    format!("\n{}{}", indent, declaration),
                ));
                accessors_added.push(accessor);
            }
        }

        let new_content = if replacements.is_empty() {
            content.to_string()
        } else {
            let patched = patch::apply(content, &replacements)
                .map_err(|e| LiftError::persistence(file, format!("could not apply edits: {}", e)))?;
            // Never hand back content that no longer parses.
            parse_source(&patched, file)?;
            patched
        };

        Ok(FileRewrite {
            file: file.to_string(),
            content: new_content,
            replacements,
            applied,
            skipped,
            import_added,
            accessors_added,
        })
    }

    fn plan_one(
        &self,
        content: &str,
        tokens: &[Token],
        target: Option<&InjectionTarget>,
        entry: &KeyedCandidate,
        store: &KeyStore,
    ) -> Result<Replacement, SkipReason> {
        if !store.has_leaf(self.source_locale, &entry.suggested_key) {
            return Err(SkipReason::MissingKey);
        }

        let raw = entry.candidate.raw.as_str();
        let start = match locate(tokens, &entry.candidate) {
            Located::Exact(at) => at,
            Located::Moved(at) if !content.contains(&Self::lookup_call(entry)) => at,
            Located::Moved(_) | Located::Missing => {
                return Err(if content.contains(&Self::lookup_call(entry)) {
                    SkipReason::AlreadyApplied
                } else {
                    SkipReason::Drift
                });
            }
        };

        let Some(target) = target else {
            return Err(SkipReason::OutOfScope);
        };
        if start <= target.body_start || start >= target.body_end {
            return Err(SkipReason::OutOfScope);
        }

        Ok(Replacement::replace(
            start,
            start + raw.len(),
            Self::replacement_code(entry),
        ))
    }
}

/// Indentation of the body's first statement, or the declaring line's
/// indentation plus two spaces for an empty body.
fn body_indent(index: &LineIndex<'_>, target: &InjectionTarget) -> String {
    let leading = |offset: usize| -> String {
        let (line, _) = index.position(offset);
        index
            .line_text(line)
            .map(|text| {
                text.chars()
                    .take_while(|c| *c == ' ' || *c == '\t')
                    .collect::<String>()
            })
            .unwrap_or_default()
    };

    match target.first_statement {
        Some(offset) if index.position(offset).0 != index.position(target.body_start).0 => {
            leading(offset)
        }
        _ => format!("{}  ", leading(target.body_start)),
    }
}

/// A candidate token as it stands in the content being rewritten.
struct Token {
    offset: usize,
    line: usize,
    column: usize,
    raw: String,
    context: SyntacticContext,
}

fn current_tokens(
    parsed: &ParsedModule,
    content: &str,
    file: &str,
    index: &LineIndex<'_>,
    options: &ScanOptions,
) -> Vec<Token> {
    scan_parsed(parsed, content, file, options)
        .into_iter()
        .filter_map(|occurrence| match occurrence {
            Occurrence::Candidate(c) => Some(Token {
                offset: index.offset(c.line, c.column)?,
                line: c.line,
                column: c.column,
                raw: c.raw,
                context: c.syntactic_context,
            }),
            Occurrence::Translated { .. } => None,
        })
        .collect()
}

enum Located {
    /// At the recorded line and column
    Exact(usize),
    /// Elsewhere on the recorded line
    Moved(usize),
    Missing,
}

/// Find the recorded token among the tokens of the current content. A match
/// must be a whole token of the same syntactic context with identical raw
/// text, on the recorded line.
fn locate(tokens: &[Token], candidate: &Candidate) -> Located {
    let same_line = tokens.iter().filter(|t| {
        t.line == candidate.line
            && t.context == candidate.syntactic_context
            && t.raw == candidate.raw
    });
    let mut moved = None;
    for token in same_line {
        if token.column == candidate.column {
            return Located::Exact(token.offset);
        }
        moved.get_or_insert(token.offset);
    }
    match moved {
        Some(at) => Located::Moved(at),
        None => Located::Missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyStatus;

    fn entry(
        file: &str,
        namespace: &str,
        key: &str,
        text: &str,
        raw: &str,
        pos: (usize, usize),
        context: SyntacticContext,
    ) -> KeyedCandidate {
        KeyedCandidate {
            candidate: Candidate {
                text: text.to_string(),
                raw: raw.to_string(),
                file: file.to_string(),
                line: pos.0,
                column: pos.1,
                syntactic_context: context,
                attribute: None,
                surrounding_context: String::new(),
            },
            suggested_key: key.to_string(),
            namespace: namespace.to_string(),
            status: KeyStatus::New,
        }
    }

    fn store_with(keys: &[(&str, &str)]) -> KeyStore {
        let config = Config::default();
        let mut store = KeyStore::empty(&config);
        for (key, value) in keys {
            store.set_leaf("en", key, value, false).unwrap();
        }
        store
    }

    const PAGE: &str = "\"use client\";\nimport { Button } from \"@/components/ui/button\";\n\nexport function Toolbar() {\n  return (\n    <div>\n      <Button>Rafraîchir</Button>\n      <input placeholder=\"Search\" />\n    </div>\n  );\n}\n";

    #[test]
    fn test_rewrite_markup_and_binding() {
        let config = Config::default();
        let rewriter = Rewriter::new(&config);
        let store = store_with(&[
            ("wallet.toolbar.rafraichir", "Rafraîchir"),
            ("wallet.toolbar.search", "Search"),
        ]);
        let refresh = entry(
            "src/app/wallet/toolbar.tsx",
            "wallet",
            "wallet.toolbar.rafraichir",
            "Rafraîchir",
            "Rafraîchir",
            (7, 15),
            SyntacticContext::MarkupText,
        );
        let search = entry(
            "src/app/wallet/toolbar.tsx",
            "wallet",
            "wallet.toolbar.search",
            "Search",
            "\"Search\"",
            (8, 26),
            SyntacticContext::MarkupAttribute,
        );

        let result = rewriter
            .rewrite_source("src/app/wallet/toolbar.tsx", PAGE, &[&refresh, &search], &store)
            .unwrap();

        assert_eq!(result.applied, 2);
        assert!(result.skipped.is_empty());
        assert!(result.import_added);
        assert_eq!(result.accessors_added, vec!["tWallet"]);
        assert_eq!(
            result.content,
            "\"use client\";\nimport { Button } from \"@/components/ui/button\";\nimport { useTranslations } from 'next-intl';\n\nexport function Toolbar() {\n  const tWallet = useTranslations('wallet');\n  return (\n    <div>\n      <Button>{tWallet('toolbar.rafraichir')}</Button>\n      <input placeholder={tWallet('toolbar.search')} />\n    </div>\n  );\n}\n"
        );

        // A second pass over the rewritten content is a no-op.
        let again = rewriter
            .rewrite_source(
                "src/app/wallet/toolbar.tsx",
                &result.content,
                &[&refresh, &search],
                &store,
            )
            .unwrap();
        assert!(!again.changed());
        assert_eq!(again.content, result.content);
        assert!(again
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::AlreadyApplied));
    }

    #[test]
    fn test_drift_skips_single_candidate() {
        let config = Config::default();
        let rewriter = Rewriter::new(&config);
        let store = store_with(&[
            ("wallet.toolbar.rafraichir", "Rafraîchir"),
            ("wallet.toolbar.search", "Search"),
        ]);
        let drifted = PAGE.replace("Rafraîchir", "Actualiser");
        let refresh = entry(
            "t.tsx",
            "wallet",
            "wallet.toolbar.rafraichir",
            "Rafraîchir",
            "Rafraîchir",
            (7, 15),
            SyntacticContext::MarkupText,
        );
        let search = entry(
            "t.tsx",
            "wallet",
            "wallet.toolbar.search",
            "Search",
            "\"Search\"",
            (8, 26),
            SyntacticContext::MarkupAttribute,
        );

        let result = rewriter
            .rewrite_source("t.tsx", &drifted, &[&refresh, &search], &store)
            .unwrap();
        assert_eq!(result.applied, 1);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].reason, SkipReason::Drift);
        assert!(result.content.contains("<Button>Actualiser</Button>"));
        assert!(result.content.contains("placeholder={tWallet('toolbar.search')}"));
    }

    #[test]
    fn test_extended_markup_text_is_drift() {
        let config = Config::default();
        let rewriter = Rewriter::new(&config);
        let store = store_with(&[
            ("wallet.toolbar.rafraichir", "Rafraîchir"),
            ("wallet.toolbar.search", "Search"),
        ]);
        let edited = PAGE.replace("Rafraîchir", "Rafraîchir tout");
        let refresh = entry(
            "t.tsx",
            "wallet",
            "wallet.toolbar.rafraichir",
            "Rafraîchir",
            "Rafraîchir",
            (7, 15),
            SyntacticContext::MarkupText,
        );
        let search = entry(
            "t.tsx",
            "wallet",
            "wallet.toolbar.search",
            "Search",
            "\"Search\"",
            (8, 26),
            SyntacticContext::MarkupAttribute,
        );

        let result = rewriter
            .rewrite_source("t.tsx", &edited, &[&refresh, &search], &store)
            .unwrap();
        assert_eq!(result.applied, 1);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].reason, SkipReason::Drift);
        assert!(result.content.contains("<Button>Rafraîchir tout</Button>"));
        assert!(!result.content.contains("toolbar.rafraichir"));

        let err = result.skipped[0].drift_error().unwrap();
        assert_eq!(err.kind(), "drift");
        assert_eq!(err.subject(), "t.tsx");
    }

    #[test]
    fn test_text_inside_other_token_is_drift() {
        let config = Config::default();
        let rewriter = Rewriter::new(&config);
        let store = store_with(&[("common.toolbar.save", "Save")]);
        // Recorded from `  return <Button title="Unrelated">Save</Button>;`
        let source = "export function Toolbar() {\n  return <Button title=\"Saved state\">Store</Button>;\n}\n";
        let save = entry(
            "toolbar.tsx",
            "common",
            "common.toolbar.save",
            "Save",
            "Save",
            (2, 36),
            SyntacticContext::MarkupText,
        );

        let result = rewriter
            .rewrite_source("toolbar.tsx", source, &[&save], &store)
            .unwrap();
        assert!(!result.changed());
        assert_eq!(result.content, source);
        assert_eq!(result.skipped[0].reason, SkipReason::Drift);
    }

    #[test]
    fn test_token_moved_on_its_line_is_replaced() {
        let config = Config::default();
        let rewriter = Rewriter::new(&config);
        let store = store_with(&[("common.card.save", "Save")]);
        // Recorded from `  return <p>Save</p>;`
        let source = "export function Card() {\n  return <p className=\"note\">Save</p>;\n}\n";
        let save = entry(
            "card.tsx",
            "common",
            "common.card.save",
            "Save",
            "Save",
            (2, 13),
            SyntacticContext::MarkupText,
        );

        let result = rewriter
            .rewrite_source("card.tsx", source, &[&save], &store)
            .unwrap();
        assert_eq!(result.applied, 1);
        assert!(result
            .content
            .contains("<p className=\"note\">{tCommon('card.save')}</p>"));
    }

    #[test]
    fn test_shifted_line_is_drift() {
        let config = Config::default();
        let rewriter = Rewriter::new(&config);
        let store = store_with(&[
            ("wallet.toolbar.rafraichir", "Rafraîchir"),
            ("wallet.toolbar.search", "Search"),
        ]);
        let shifted = PAGE.replace("    <div>\n", "    <div>\n      <hr />\n");
        let refresh = entry(
            "t.tsx",
            "wallet",
            "wallet.toolbar.rafraichir",
            "Rafraîchir",
            "Rafraîchir",
            (7, 15),
            SyntacticContext::MarkupText,
        );
        let search = entry(
            "t.tsx",
            "wallet",
            "wallet.toolbar.search",
            "Search",
            "\"Search\"",
            (8, 26),
            SyntacticContext::MarkupAttribute,
        );

        let result = rewriter
            .rewrite_source("t.tsx", &shifted, &[&refresh, &search], &store)
            .unwrap();
        assert!(!result.changed());
        assert_eq!(result.content, shifted);
        assert_eq!(result.skipped.len(), 2);
        assert!(result.skipped.iter().all(|s| s.reason == SkipReason::Drift));
    }

    #[test]
    fn test_async_component_uses_server_binding() {
        let config = Config::default();
        let rewriter = Rewriter::new(&config);
        let store = store_with(&[("billing.page.invoices", "Invoices")]);
        let source = "export default async function Page() {\n  const data = await load();\n  return <h1>Invoices</h1>;\n}\n";
        let heading = entry(
            "page.tsx",
            "billing",
            "billing.page.invoices",
            "Invoices",
            "Invoices",
            (3, 14),
            SyntacticContext::MarkupText,
        );

        let result = rewriter
            .rewrite_source("page.tsx", source, &[&heading], &store)
            .unwrap();
        assert_eq!(
            result.content,
            "import { getTranslations } from 'next-intl/server';\nexport default async function Page() {\n  const tBilling = await getTranslations('billing');\n  const data = await load();\n  return <h1>{tBilling('page.invoices')}</h1>;\n}\n"
        );
    }

    #[test]
    fn test_out_of_scope_and_missing_key() {
        let config = Config::default();
        let rewriter = Rewriter::new(&config);
        let store = store_with(&[("common.page.greeting", "Good morning")]);
        let source = "const GREETING = 'Good morning';\nexport const Page = () => {\n  return <p>{GREETING}</p>;\n};\n";
        let module_level = entry(
            "page.tsx",
            "common",
            "common.page.greeting",
            "Good morning",
            "'Good morning'",
            (1, 18),
            SyntacticContext::StringLiteral,
        );
        let missing = entry(
            "page.tsx",
            "common",
            "common.page.gone",
            "Gone",
            "'Gone'",
            (1, 1),
            SyntacticContext::StringLiteral,
        );

        let result = rewriter
            .rewrite_source("page.tsx", source, &[&module_level, &missing], &store)
            .unwrap();
        assert!(!result.changed());
        assert_eq!(result.content, source);
        let reasons: Vec<_> = result.skipped.iter().map(|s| s.reason).collect();
        assert!(reasons.contains(&SkipReason::OutOfScope));
        assert!(reasons.contains(&SkipReason::MissingKey));
    }

    #[test]
    fn test_existing_binding_not_duplicated() {
        let config = Config::default();
        let rewriter = Rewriter::new(&config);
        let store = store_with(&[("common.card.save", "Save"), ("common.card.cancel", "Cancel")]);
        let source = "import { useTranslations } from 'next-intl';\n\nexport const Card = () => {\n  const tCommon = useTranslations('common');\n  return <button title={tCommon('card.cancel')}>Save</button>;\n};\n";
        let save = entry(
            "card.tsx",
            "common",
            "common.card.save",
            "Save",
            "Save",
            (5, 49),
            SyntacticContext::MarkupText,
        );

        let result = rewriter
            .rewrite_source("card.tsx", source, &[&save], &store)
            .unwrap();
        assert_eq!(result.applied, 1);
        assert!(!result.import_added);
        assert!(result.accessors_added.is_empty());
        assert_eq!(result.content.matches("useTranslations").count(), 2);
        assert!(result.content.contains(">{tCommon('card.save')}</button>"));
    }

    #[test]
    fn test_no_target_means_out_of_scope() {
        let config = Config::default();
        let rewriter = Rewriter::new(&config);
        let store = store_with(&[("common.util.hello", "Hello there")]);
        let source = "export const message = 'Hello there';\n";
        let hello = entry(
            "util.ts",
            "common",
            "common.util.hello",
            "Hello there",
            "'Hello there'",
            (1, 24),
            SyntacticContext::StringLiteral,
        );
        let result = rewriter
            .rewrite_source("util.ts", source, &[&hello], &store)
            .unwrap();
        assert_eq!(result.skipped[0].reason, SkipReason::OutOfScope);
        assert!(!result.changed());
    }

    #[test]
    fn test_accessor_name() {
        assert_eq!(accessor_name("deliverer-wallet"), "tDelivererWallet");
        assert_eq!(accessor_name("common"), "tCommon");
    }

    #[test]
    fn test_find_injection_target_skips_lowercase() {
        let source = "export function helper() { return 1; }\nexport const Panel = function () {\n  return null;\n};\n";
        let parsed = parse_source(source, "panel.tsx").unwrap();
        let target = find_injection_target(&parsed).unwrap();
        assert_eq!(target.name, "Panel");
        assert!(!target.is_async);
    }
}
