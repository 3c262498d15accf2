//! Source extraction for a single file
//!
//! Parses one Java source file with tree-sitter and mines the model
//! entities out of it: the class with its role, fields, methods and
//! imports, the endpoints derived from mapping annotations, and the rest
//! calls derived from the REST-client template catalog.
//!
//! Extraction is best-effort and lexical/syntactic: a rest call's URL is
//! normalized from the literal forms found in source (bare literal,
//! `new String(...)`, `String.valueOf(...)`, `+`-concatenation); anything
//! depending on a runtime value beyond that keeps a partial URL with `{?}`
//! markers and is retained rather than dropped.

use std::collections::HashMap;

use regex_lite::Regex;
use thiserror::Error;
use tree_sitter::{Language, Node, Parser};

use crate::catalog::{self, REST_CLIENT_TYPES};
use crate::model::{
    Annotation, AnnotationAttribute, ClassRole, Endpoint, Field, HttpMethod, JClass, Method,
    MethodCall, MethodCallDeclaration, MethodDeclaration, RestCall,
};

/// Placeholder for URL fragments that cannot be resolved statically.
pub const UNKNOWN_SEGMENT: &str = "{?}";

/// Errors raised while extracting a single source file. Per-file errors
/// are recoverable: callers skip the file and keep a diagnostic.
#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("failed to load Java grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("failed to parse {0}")]
    Parse(String),

    #[error("no type declaration found in {0}")]
    NoTypeDeclaration(String),
}

/// Parse one source file into a [`JClass`].
///
/// `path` is the repository-relative path recorded as the file's identity;
/// `microservice` is the owning service name stamped onto endpoints.
pub fn extract_class(
    path: &str,
    source: &str,
    microservice: &str,
) -> Result<JClass, ExtractorError> {
    let language: Language = tree_sitter_java::LANGUAGE.into();
    let mut parser = Parser::new();
    parser.set_language(&language)?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ExtractorError::Parse(path.to_string()))?;
    let root = tree.root_node();

    let package = find_package(root, source);
    let imports = find_imports(root, source);

    let class_node = find_type_declaration(root)
        .ok_or_else(|| ExtractorError::NoTypeDeclaration(path.to_string()))?;
    let class_name = child_text(class_node, "name", source);
    let class_fqn = if package.is_empty() {
        class_name.clone()
    } else {
        format!("{package}.{class_name}")
    };

    let class_annotations = declared_annotations(class_node, source);
    let supertypes = declared_supertypes(class_node, source);
    let role = classify_role(&class_annotations, &supertypes, &class_fqn, path);

    let fields = parse_fields(class_node, source);
    let constants = string_constants(class_node, source);
    let class_prefix = class_annotations
        .iter()
        .find(|a| a.name == "RequestMapping")
        .and_then(annotation_path)
        .unwrap_or_default();

    let mut methods = Vec::new();
    let mut method_calls = Vec::new();

    for method_node in collect_kinds(class_node, &["method_declaration"]) {
        let declaration = parse_method(method_node, source, &class_fqn);

        // One method may expose several endpoints, one per mapping
        // annotation; the bare declaration is kept when it exposes none.
        let endpoints = derive_endpoints(&declaration, &class_prefix, microservice);
        if endpoints.is_empty() {
            methods.push(Method::Declaration(declaration.clone()));
        } else {
            methods.extend(endpoints.into_iter().map(Method::Endpoint));
        }

        let scope = ReceiverScope::for_method(method_node, source, &fields, &declaration);
        for invocation in collect_kinds(method_node, &["method_invocation"]) {
            if let Some(call) =
                parse_invocation(invocation, source, &class_fqn, &declaration.name, &scope, &constants)
            {
                method_calls.push(call);
            }
        }
    }

    Ok(JClass {
        path: path.to_string(),
        class_fqn,
        role,
        fields,
        methods,
        method_calls,
        imports,
    })
}

/// Role classification, annotation/name-driven, in priority order. The
/// first matching rule wins and exactly one role is assigned.
fn classify_role(
    annotations: &[Annotation],
    supertypes: &[String],
    class_fqn: &str,
    path: &str,
) -> ClassRole {
    let has = |name: &str| annotations.iter().any(|a| a.name == name);

    if has("RestController") || has("Controller") {
        return ClassRole::Controller;
    }
    if has("Service") {
        return ClassRole::Service;
    }
    if has("Repository") || supertypes.iter().any(|t| t.contains("Repository")) {
        return ClassRole::Repository;
    }
    if has("FeignClient") {
        return ClassRole::Communicator;
    }

    let lowered_fqn = class_fqn.to_lowercase();
    let lowered_path = path.to_lowercase();
    if has("Entity")
        || has("Table")
        || has("Document")
        || lowered_fqn.contains("entity")
        || lowered_path.contains("/entity/")
    {
        return ClassRole::Entity;
    }
    if lowered_fqn.contains("dto") || lowered_path.contains("/dto/") {
        return ClassRole::Dto;
    }

    ClassRole::Other
}

// ---------------------------------------------------------------------------
// Endpoint derivation
// ---------------------------------------------------------------------------

fn derive_endpoints(
    declaration: &MethodDeclaration,
    class_prefix: &str,
    microservice: &str,
) -> Vec<Endpoint> {
    let mut endpoints = Vec::new();

    for annotation in &declaration.annotations {
        let Some(verb) = catalog::endpoint_verb(annotation) else {
            continue;
        };

        // URL template from the path/value attribute; annotations that
        // carry no path default to "/" + annotation name.
        let own_path = annotation_path(annotation)
            .unwrap_or_else(|| format!("/{}", annotation.name));
        let url = simplify_url(&merge_paths(class_prefix, &own_path));

        endpoints.push(Endpoint {
            method: declaration.clone(),
            url,
            http_method: verb,
            microservice: microservice.to_string(),
        });
    }

    endpoints
}

fn annotation_path(annotation: &Annotation) -> Option<String> {
    annotation
        .attribute("path")
        .or_else(|| annotation.attribute("value"))
        .map(str::to_string)
}

/// Join a class-level mapping prefix with a method-level path.
fn merge_paths(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        return path.to_string();
    }
    if path.is_empty() || path == "/" {
        return prefix.to_string();
    }

    let prefix = prefix.strip_suffix('/').unwrap_or(prefix);
    if path.starts_with('/') {
        format!("{prefix}{path}")
    } else {
        format!("{prefix}/{path}")
    }
}

/// Rewrite `{pathParam}` segments to the unknown marker so endpoint and
/// rest-call URLs compare structurally.
fn simplify_url(url: &str) -> String {
    let re = Regex::new(r"\{[^}]*\}").unwrap();
    re.replace_all(url, UNKNOWN_SEGMENT).into_owned()
}

// ---------------------------------------------------------------------------
// Method-call and rest-call extraction
// ---------------------------------------------------------------------------

/// Declared types of every name visible as a call receiver inside one
/// method: class fields, parameters, then locals (innermost wins).
struct ReceiverScope {
    types: HashMap<String, String>,
}

impl ReceiverScope {
    fn for_method(
        method_node: Node,
        source: &str,
        fields: &[Field],
        declaration: &MethodDeclaration,
    ) -> Self {
        let mut types = HashMap::new();

        for field in fields {
            types.insert(field.name.clone(), field.type_name.clone());
        }
        for parameter in &declaration.parameters {
            types.insert(parameter.name.clone(), parameter.type_name.clone());
        }
        for local in collect_kinds(method_node, &["local_variable_declaration"]) {
            let type_name = child_text(local, "type", source);
            for declarator in collect_kinds(local, &["variable_declarator"]) {
                let name = child_text(declarator, "name", source);
                if !name.is_empty() {
                    types.insert(name, type_name.clone());
                }
            }
        }

        ReceiverScope { types }
    }

    fn type_of(&self, name: &str) -> &str {
        self.types.get(name).map(String::as_str).unwrap_or("")
    }
}

fn parse_invocation(
    invocation: Node,
    source: &str,
    class_fqn: &str,
    called_from: &str,
    scope: &ReceiverScope,
    constants: &HashMap<String, String>,
) -> Option<MethodCall> {
    let name = child_text(invocation, "name", source);
    if name.is_empty() {
        return None;
    }

    let object_name = receiver_name(invocation, source);
    // Unqualified calls (helper methods on the same class) are not part
    // of the model.
    if object_name.is_empty() {
        return None;
    }

    let object_type = scope.type_of(&object_name).to_string();
    let parameter_contents = argument_text(invocation, source);

    let declaration = MethodCallDeclaration {
        name: name.clone(),
        called_from: called_from.to_string(),
        object_name,
        object_type: object_type.clone(),
        parameter_contents: parameter_contents.clone(),
        class_fqn: class_fqn.to_string(),
    };

    if !REST_CLIENT_TYPES.contains(&object_type.as_str()) {
        return Some(MethodCall::Plain(declaration));
    }

    let verb = catalog::rest_call_verb(&name, &parameter_contents);
    if verb == HttpMethod::None && name != "exchange" {
        // Recognized client, unrecognized template: keep the generic
        // call so downstream consumers can still see it.
        return Some(MethodCall::Plain(declaration));
    }

    let resolved = invocation
        .child_by_field_name("arguments")
        .and_then(|args| args.named_child(0))
        .map(|arg| resolve_url(arg, source, constants))
        .unwrap_or_default();

    Some(MethodCall::Rest(RestCall {
        call: declaration,
        url: resolved.url,
        http_method: verb,
        target: resolved.host,
    }))
}

/// Receiver variable of an invocation: `receiver.method(...)` or
/// `this.receiver.method(...)`.
fn receiver_name(invocation: Node, source: &str) -> String {
    let Some(object) = invocation.child_by_field_name("object") else {
        return String::new();
    };

    match object.kind() {
        "identifier" => node_text(object, source).to_string(),
        "field_access" => child_text(object, "field", source),
        _ => String::new(),
    }
}

fn argument_text(invocation: Node, source: &str) -> String {
    let Some(arguments) = invocation.child_by_field_name("arguments") else {
        return String::new();
    };
    node_text(arguments, source)
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim()
        .to_string()
}

// ---------------------------------------------------------------------------
// URL literal normalization
// ---------------------------------------------------------------------------

/// Best-effort resolution of a URL argument. `resolved` is false whenever
/// an unknown marker had to be inserted; such calls are still retained.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolvedUrl {
    /// Normalized path, scheme and host stripped.
    pub url: String,
    /// Host token found before the first path segment, empty when the
    /// literal carried no host. Candidate target microservice name.
    pub host: String,
    pub resolved: bool,
}

/// Normalize the four literal forms found in source to one URL string:
/// a bare literal, `new String(literal)`, `String.valueOf(...)` (possibly
/// nested) and `+`-concatenation of literals and known constants.
fn resolve_url(node: Node, source: &str, constants: &HashMap<String, String>) -> ResolvedUrl {
    let mut partial = false;
    let raw = resolve_text(node, source, constants, &mut partial);
    let (url, host) = clean_url(&raw);
    ResolvedUrl {
        resolved: !partial && !url.contains(UNKNOWN_SEGMENT),
        url,
        host,
    }
}

fn resolve_text(
    node: Node,
    source: &str,
    constants: &HashMap<String, String>,
    partial: &mut bool,
) -> String {
    match node.kind() {
        "string_literal" => strip_quotes(node_text(node, source)).to_string(),
        "parenthesized_expression" => node
            .named_child(0)
            .map(|inner| resolve_text(inner, source, constants, partial))
            .unwrap_or_default(),
        "binary_expression" => {
            let left = node
                .child_by_field_name("left")
                .map(|n| resolve_text(n, source, constants, partial))
                .unwrap_or_default();
            let right = node
                .child_by_field_name("right")
                .map(|n| resolve_text(n, source, constants, partial))
                .unwrap_or_default();
            format!("{left}{right}")
        }
        "object_creation_expression" => {
            // new String("...") wrapper
            if child_text(node, "type", source) == "String" {
                if let Some(arg) = node
                    .child_by_field_name("arguments")
                    .and_then(|args| args.named_child(0))
                {
                    return resolve_text(arg, source, constants, partial);
                }
            }
            scrape_literal(node, source, partial)
        }
        "method_invocation" => {
            // String.valueOf(...) wrapper, possibly nested
            let object = node
                .child_by_field_name("object")
                .map(|o| node_text(o, source))
                .unwrap_or_default();
            if object == "String" && child_text(node, "name", source) == "valueOf" {
                if let Some(arg) = node
                    .child_by_field_name("arguments")
                    .and_then(|args| args.named_child(0))
                {
                    return resolve_text(arg, source, constants, partial);
                }
            }
            scrape_literal(node, source, partial)
        }
        "identifier" => resolve_name(node_text(node, source), constants, partial),
        "field_access" => {
            let field = child_text(node, "field", source);
            resolve_name(&field, constants, partial)
        }
        _ => scrape_literal(node, source, partial),
    }
}

/// A bare name in URL position: resolved against the class's String
/// constants; names that merely rebind the url itself contribute nothing,
/// anything else is an unknown segment.
fn resolve_name(name: &str, constants: &HashMap<String, String>, partial: &mut bool) -> String {
    if let Some(value) = constants.get(name) {
        return value.clone();
    }
    let lowered = name.to_lowercase();
    if lowered.contains("url") || lowered.contains("uri") {
        return String::new();
    }
    *partial = true;
    UNKNOWN_SEGMENT.to_string()
}

/// Last-resort scrape: find the first quoted path-looking literal in the
/// expression text.
fn scrape_literal(node: Node, source: &str, partial: &mut bool) -> String {
    let re = Regex::new(r#""([^"]*/[^"]*)""#).unwrap();
    if let Some(captures) = re.captures(node_text(node, source)) {
        let found = captures.get(1).map(|m| m.as_str()).unwrap_or("");
        // String.format placeholders become unknown segments.
        let fmt = Regex::new(r"%[sdif]").unwrap();
        let replaced = fmt.replace_all(found, UNKNOWN_SEGMENT).into_owned();
        if replaced.contains(UNKNOWN_SEGMENT) {
            *partial = true;
        }
        return replaced;
    }
    *partial = true;
    UNKNOWN_SEGMENT.to_string()
}

/// Strip scheme and host, drop trailing slash, rewrite path parameters.
/// The host token, when present, is the candidate target microservice.
fn clean_url(raw: &str) -> (String, String) {
    let stripped = raw
        .trim_start_matches("http://")
        .trim_start_matches("https://");
    let had_scheme = stripped.len() != raw.len();

    let (host, mut path) = match stripped.find('/') {
        Some(0) => (String::new(), stripped.to_string()),
        Some(idx) => (stripped[..idx].to_string(), stripped[idx..].to_string()),
        None if had_scheme => (stripped.to_string(), String::new()),
        None => (String::new(), stripped.to_string()),
    };

    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    (simplify_url(&path), host)
}

// ---------------------------------------------------------------------------
// Declaration parsing
// ---------------------------------------------------------------------------

fn parse_method(node: Node, source: &str, class_fqn: &str) -> MethodDeclaration {
    let mut parameters = Vec::new();
    if let Some(params) = node.child_by_field_name("parameters") {
        for param in collect_kinds(params, &["formal_parameter", "spread_parameter"]) {
            let name = child_text(param, "name", source);
            let type_name = child_text(param, "type", source);
            if !name.is_empty() {
                parameters.push(Field::new(name, type_name));
            }
        }
    }

    MethodDeclaration {
        name: child_text(node, "name", source),
        return_type: child_text(node, "type", source),
        class_fqn: class_fqn.to_string(),
        annotations: declared_annotations(node, source),
        parameters,
    }
}

fn parse_fields(class_node: Node, source: &str) -> Vec<Field> {
    let Some(body) = class_node.child_by_field_name("body") else {
        return Vec::new();
    };

    let mut fields = Vec::new();
    for declaration in collect_kinds(body, &["field_declaration"]) {
        let type_name = child_text(declaration, "type", source);
        let annotation_names: Vec<String> = declared_annotations(declaration, source)
            .into_iter()
            .map(|a| a.name)
            .collect();

        for declarator in collect_kinds(declaration, &["variable_declarator"]) {
            let name = child_text(declarator, "name", source);
            if name.is_empty() {
                continue;
            }
            fields.push(Field {
                name,
                type_name: type_name.clone(),
                annotations: annotation_names.clone(),
            });
        }
    }
    fields
}

/// `String` fields with a literal initializer, used to resolve constant
/// references in URL position.
fn string_constants(class_node: Node, source: &str) -> HashMap<String, String> {
    let mut constants = HashMap::new();

    for declaration in collect_kinds(class_node, &["field_declaration"]) {
        if child_text(declaration, "type", source) != "String" {
            continue;
        }
        for declarator in collect_kinds(declaration, &["variable_declarator"]) {
            let name = child_text(declarator, "name", source);
            let Some(value) = declarator.child_by_field_name("value") else {
                continue;
            };
            if value.kind() == "string_literal" && !name.is_empty() {
                constants.insert(name, strip_quotes(node_text(value, source)).to_string());
            }
        }
    }

    constants
}

/// Annotations hanging off a declaration's modifier list.
fn declared_annotations(node: Node, source: &str) -> Vec<Annotation> {
    let mut annotations = Vec::new();

    for i in 0..node.child_count() {
        let Some(child) = node.child(i) else { continue };
        if child.kind() != "modifiers" {
            continue;
        }
        for j in 0..child.child_count() {
            let Some(modifier) = child.child(j) else { continue };
            match modifier.kind() {
                "marker_annotation" | "annotation" => {
                    annotations.push(parse_annotation(modifier, source));
                }
                _ => {}
            }
        }
    }

    annotations
}

fn parse_annotation(node: Node, source: &str) -> Annotation {
    let name = child_text(node, "name", source);
    let mut attributes = Vec::new();

    if let Some(arguments) = node.child_by_field_name("arguments") {
        for i in 0..arguments.named_child_count() {
            let Some(argument) = arguments.named_child(i) else {
                continue;
            };
            if argument.kind() == "element_value_pair" {
                attributes.push(AnnotationAttribute {
                    key: child_text(argument, "key", source),
                    value: strip_quotes(&child_text(argument, "value", source)).to_string(),
                });
            } else {
                // Single-member form: @GetMapping("/x")
                attributes.push(AnnotationAttribute {
                    key: "value".to_string(),
                    value: strip_quotes(node_text(argument, source)).to_string(),
                });
            }
        }
    }

    Annotation { name, attributes }
}

fn declared_supertypes(class_node: Node, source: &str) -> Vec<String> {
    let mut supertypes = Vec::new();

    if let Some(superclass) = class_node.child_by_field_name("superclass") {
        supertypes.push(
            node_text(superclass, source)
                .trim_start_matches("extends")
                .trim()
                .to_string(),
        );
    }
    if let Some(interfaces) = class_node.child_by_field_name("interfaces") {
        for type_node in collect_kinds(interfaces, &["type_identifier", "generic_type"]) {
            supertypes.push(node_text(type_node, source).to_string());
        }
    }
    // Interface declarations use `extends` for their supertypes too.
    for extends in collect_kinds(class_node, &["extends_interfaces"]) {
        for type_node in collect_kinds(extends, &["type_identifier", "generic_type"]) {
            supertypes.push(node_text(type_node, source).to_string());
        }
    }

    supertypes
}

fn find_package(root: Node, source: &str) -> String {
    for node in collect_kinds(root, &["package_declaration"]) {
        return node_text(node, source)
            .trim_start_matches("package")
            .trim()
            .trim_end_matches(';')
            .trim()
            .to_string();
    }
    String::new()
}

fn find_imports(root: Node, source: &str) -> Vec<String> {
    collect_kinds(root, &["import_declaration"])
        .into_iter()
        .map(|node| {
            node_text(node, source)
                .trim_start_matches("import")
                .trim()
                .trim_start_matches("static")
                .trim()
                .trim_end_matches(';')
                .trim()
                .to_string()
        })
        .collect()
}

fn find_type_declaration(root: Node) -> Option<Node> {
    let kinds = [
        "class_declaration",
        "interface_declaration",
        "enum_declaration",
        "record_declaration",
    ];
    for i in 0..root.named_child_count() {
        let child = root.named_child(i)?;
        if kinds.contains(&child.kind()) {
            return Some(child);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Node helpers
// ---------------------------------------------------------------------------

/// Depth-first collection of all descendant nodes of the given kinds.
fn collect_kinds<'t>(node: Node<'t>, kinds: &[&str]) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        for i in (0..current.child_count()).rev() {
            if let Some(child) = current.child(i) {
                stack.push(child);
            }
        }
        if current.id() != node.id() && kinds.contains(&current.kind()) {
            out.push(current);
        }
    }
    // Stack order already yields document order for a preorder walk.
    out
}

fn node_text<'s>(node: Node, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

fn child_text(node: Node, field: &str, source: &str) -> String {
    node.child_by_field_name(field)
        .map(|n| node_text(n, source).to_string())
        .unwrap_or_default()
}

fn strip_quotes(text: &str) -> &str {
    text.trim_start_matches('"').trim_end_matches('"')
}
