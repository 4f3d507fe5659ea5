//! Story file parsing.
//!
//! A story file is an ES module. Every named export is a story; the default
//! export may carry a `title` and shared `meta`. Assignments of the form
//! `Export.storyName = "…"` and `Export.meta = {…}` refine single stories.

use std::collections::HashMap;
use std::path::{Component, Path};

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    AssignmentTarget, BindingPatternKind, Declaration, ExportNamedDeclaration, Expression,
    ObjectExpression, ObjectPropertyKind, Program, PropertyKey, Statement,
};
use oxc_parser::Parser;
use oxc_span::{SourceType, Span};
use serde_json::{Map, Value};

use super::entry::StoryEntry;
use super::naming::{story_id, title_case, title_levels, LEVEL_SEPARATOR};
use crate::error::ParseError;

/// A named export and the span of the statement declaring it.
struct ExportedStory {
    export_name: String,
    span: Span,
}

/// Everything a story file declares, before ids are assigned.
#[derive(Default)]
struct FileDeclarations {
    exports: Vec<ExportedStory>,
    title: Option<String>,
    default_meta: Option<Map<String, Value>>,
    story_names: HashMap<String, String>,
    story_meta: HashMap<String, Map<String, Value>>,
}

/// Project-relative, `/`-separated form of `path`.
///
/// Paths outside `root` keep their full form.
#[must_use]
pub fn relative_file_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::RootDir => Some(String::new()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Read and parse a story file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid syntax.
pub async fn parse_story_file(root: &Path, path: &Path) -> Result<Vec<StoryEntry>, ParseError> {
    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ParseError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    parse_story_source(path, &relative_file_path(root, path), &source)
}

/// Parse story source text.
///
/// `path` selects the source type by extension; `file_path` is recorded on
/// each entry.
///
/// # Errors
///
/// Returns [`ParseError::Syntax`] if the source does not parse.
pub fn parse_story_source(
    path: &Path,
    file_path: &str,
    source: &str,
) -> Result<Vec<StoryEntry>, ParseError> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).unwrap_or_else(|_| SourceType::jsx());
    let parsed = Parser::new(&allocator, source, source_type).parse();

    if parsed.panicked || !parsed.errors.is_empty() {
        let message = parsed
            .errors
            .first()
            .map_or_else(|| "parser gave up".to_string(), ToString::to_string);
        return Err(ParseError::Syntax {
            path: path.to_path_buf(),
            message,
        });
    }

    let declarations = collect_declarations(&parsed.program);
    let lines = LineIndex::new(source);

    Ok(build_entries(declarations, file_path, &lines))
}

fn build_entries(
    declarations: FileDeclarations,
    file_path: &str,
    lines: &LineIndex,
) -> Vec<StoryEntry> {
    let levels = title_levels(declarations.title.as_deref(), file_path);
    let title = levels.join(LEVEL_SEPARATOR);

    declarations
        .exports
        .into_iter()
        .map(|export| {
            let name = declarations
                .story_names
                .get(&export.export_name)
                .cloned()
                .unwrap_or_else(|| title_case(&export.export_name));

            let meta = merge_meta(
                declarations.default_meta.as_ref(),
                declarations.story_meta.get(&export.export_name),
            );

            StoryEntry {
                id: story_id(&levels, &name),
                name,
                levels: levels.clone(),
                title: title.clone(),
                export_name: export.export_name,
                file_path: file_path.to_string(),
                loc_start: lines.line(export.span.start),
                loc_end: lines.line(export.span.end.saturating_sub(1).max(export.span.start)),
                meta,
            }
        })
        .collect()
}

/// Shallow merge: story keys override file-level keys.
fn merge_meta(
    file_meta: Option<&Map<String, Value>>,
    story_meta: Option<&Map<String, Value>>,
) -> Option<Value> {
    match (file_meta, story_meta) {
        (None, None) => None,
        (base, overrides) => {
            let mut merged = base.cloned().unwrap_or_default();
            if let Some(overrides) = overrides {
                for (key, value) in overrides {
                    merged.insert(key.clone(), value.clone());
                }
            }
            Some(Value::Object(merged))
        }
    }
}

fn collect_declarations(program: &Program<'_>) -> FileDeclarations {
    let mut declarations = FileDeclarations::default();
    let mut local_objects: HashMap<String, Map<String, Value>> = HashMap::new();
    let mut default_object = None;

    for statement in program.body.iter() {
        match statement {
            Statement::ExportNamedDeclaration(export) => {
                collect_named_export(export, &mut declarations.exports);
            }
            Statement::ExportDefaultDeclaration(export) => {
                default_object = export.declaration.as_expression().and_then(|expr| {
                    match strip_wrappers(expr) {
                        Expression::ObjectExpression(object) => Some(object_json(object)),
                        Expression::Identifier(ident) => {
                            local_objects.get(ident.name.as_str()).cloned()
                        }
                        _ => None,
                    }
                });
            }
            Statement::VariableDeclaration(variable) => {
                for declarator in variable.declarations.iter() {
                    let BindingPatternKind::BindingIdentifier(ident) = &declarator.id.kind else {
                        continue;
                    };
                    if let Some(Expression::ObjectExpression(object)) =
                        declarator.init.as_ref().map(strip_wrappers)
                    {
                        local_objects.insert(ident.name.to_string(), object_json(object));
                    }
                }
            }
            Statement::ExpressionStatement(statement) => {
                collect_story_assignment(&statement.expression, &mut declarations);
            }
            _ => {}
        }
    }

    if let Some(object) = default_object {
        declarations.title = object
            .get("title")
            .and_then(Value::as_str)
            .map(String::from);
        declarations.default_meta = object
            .get("meta")
            .and_then(Value::as_object)
            .cloned();
    }

    declarations
}

fn collect_named_export(export: &ExportNamedDeclaration<'_>, out: &mut Vec<ExportedStory>) {
    if export.export_kind.is_type() || export.source.is_some() {
        return;
    }

    let mut push = |name: &str| {
        if name != "default" {
            out.push(ExportedStory {
                export_name: name.to_string(),
                span: export.span,
            });
        }
    };

    match &export.declaration {
        Some(Declaration::VariableDeclaration(variable)) => {
            for declarator in variable.declarations.iter() {
                if let BindingPatternKind::BindingIdentifier(ident) = &declarator.id.kind {
                    push(ident.name.as_str());
                }
            }
        }
        Some(Declaration::FunctionDeclaration(function)) => {
            if let Some(id) = &function.id {
                push(id.name.as_str());
            }
        }
        Some(Declaration::ClassDeclaration(class)) => {
            if let Some(id) = &class.id {
                push(id.name.as_str());
            }
        }
        Some(_) => {}
        None => {
            for specifier in export.specifiers.iter() {
                if !specifier.export_kind.is_type() {
                    push(specifier.exported.name().as_str());
                }
            }
        }
    }
}

/// Record `Story.storyName = "…"` and `Story.meta = {…}`.
fn collect_story_assignment(expression: &Expression<'_>, out: &mut FileDeclarations) {
    let Expression::AssignmentExpression(assignment) = expression else {
        return;
    };
    let AssignmentTarget::StaticMemberExpression(member) = &assignment.left else {
        return;
    };
    let Expression::Identifier(object) = &member.object else {
        return;
    };

    let story = object.name.to_string();
    match (member.property.name.as_str(), strip_wrappers(&assignment.right)) {
        ("storyName", Expression::StringLiteral(name)) => {
            out.story_names.insert(story, name.value.to_string());
        }
        ("meta", Expression::ObjectExpression(meta)) => {
            out.story_meta.insert(story, object_json(meta));
        }
        _ => {}
    }
}

fn strip_wrappers<'b, 'a>(expression: &'b Expression<'a>) -> &'b Expression<'a> {
    match expression {
        Expression::TSSatisfiesExpression(inner) => strip_wrappers(&inner.expression),
        Expression::TSAsExpression(inner) => strip_wrappers(&inner.expression),
        Expression::ParenthesizedExpression(inner) => strip_wrappers(&inner.expression),
        _ => expression,
    }
}

/// Literal properties of an object expression; anything dynamic is skipped.
fn object_json(object: &ObjectExpression<'_>) -> Map<String, Value> {
    let mut map = Map::new();
    for property in object.properties.iter() {
        let ObjectPropertyKind::ObjectProperty(property) = property else {
            continue;
        };
        let key = match &property.key {
            PropertyKey::StaticIdentifier(ident) => ident.name.to_string(),
            PropertyKey::StringLiteral(literal) => literal.value.to_string(),
            _ => continue,
        };
        if let Some(value) = literal_json(&property.value) {
            map.insert(key, value);
        }
    }
    map
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn literal_json(expression: &Expression<'_>) -> Option<Value> {
    match strip_wrappers(expression) {
        Expression::StringLiteral(literal) => Some(Value::String(literal.value.to_string())),
        Expression::BooleanLiteral(literal) => Some(Value::Bool(literal.value)),
        Expression::NullLiteral(_) => Some(Value::Null),
        Expression::NumericLiteral(literal) => {
            let value = literal.value;
            if value.fract() == 0.0 && value.abs() < 9.0e15 {
                Some(Value::from(value as i64))
            } else {
                serde_json::Number::from_f64(value).map(Value::Number)
            }
        }
        Expression::ObjectExpression(object) => Some(Value::Object(object_json(object))),
        Expression::ArrayExpression(array) => Some(Value::Array(
            array
                .elements
                .iter()
                .filter_map(|element| element.as_expression().and_then(literal_json))
                .collect(),
        )),
        _ => None,
    }
}

/// Byte offset → 1-based line lookup.
struct LineIndex {
    line_starts: Vec<u32>,
}

impl LineIndex {
    #[allow(clippy::cast_possible_truncation)]
    fn new(source: &str) -> Self {
        let mut line_starts = Vec::with_capacity(128);
        line_starts.push(0);
        for (idx, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((idx + 1) as u32);
            }
        }
        Self { line_starts }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn line(&self, offset: u32) -> u32 {
        let idx = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        };
        idx as u32 + 1
    }
}
