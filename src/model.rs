//! Intermediate representation of a microservice system
//!
//! Every downstream component (extraction, delta, graph, analysis) shares
//! these entity types. All of them are immutable value records: they are
//! constructed once during extraction or diffing and compared by value
//! afterwards. The only long-lived aggregates are [`MicroserviceSystem`]
//! and [`SystemChange`], which serialize to/from JSON at the tool boundary.
//!
//! Serialization notes: a plain [`Method`] is distinguished from an
//! [`Endpoint`] by the presence of a `url` key, and a plain [`MethodCall`]
//! from a [`RestCall`] the same way. The untagged enums below apply that
//! discriminator in both directions.

use serde::{Deserialize, Serialize};

/// HTTP verb attached to an endpoint or rest call.
///
/// `All` is produced by a bare `@RequestMapping` with no `method` attribute;
/// `None` marks calls whose verb could not be determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    All,
    None,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::All => "ALL",
            HttpMethod::None => "NONE",
        };
        f.write_str(s)
    }
}

/// Architectural role of a class within its microservice.
///
/// Exactly one role per class, decided by annotation/name heuristics in
/// priority order (see `extractor::classify_role`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ClassRole {
    Controller,
    Service,
    Repository,
    Dto,
    Entity,
    Communicator,
    Other,
}

/// One `key = value` attribute inside an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationAttribute {
    pub key: String,
    pub value: String,
}

/// A source-level annotation with its ordered attribute pairs.
///
/// Single-member annotations (`@GetMapping("/x")`) are stored as one
/// attribute with the conventional key `value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<AnnotationAttribute>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Annotation {
            name: name.into(),
            attributes: Vec::new(),
        }
    }

    /// Look up an attribute value by key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.key == key)
            .map(|a| a.value.as_str())
    }
}

/// A class field or method parameter. Identity is `(name, type)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub annotations: Vec<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Field {
            name: name.into(),
            type_name: type_name.into(),
            annotations: Vec::new(),
        }
    }
}

/// A method declaration, without endpoint semantics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDeclaration {
    pub name: String,
    pub return_type: String,
    /// Fully-qualified name of the class declaring this method.
    pub class_fqn: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub parameters: Vec<Field>,
}

/// A server-side HTTP mapping derived from an endpoint annotation.
///
/// One method may yield several endpoints, one per matching annotation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    #[serde(flatten)]
    pub method: MethodDeclaration,
    /// URL template, path parameters rewritten to `{?}`.
    pub url: String,
    pub http_method: HttpMethod,
    /// Name of the microservice exposing this endpoint.
    pub microservice: String,
}

/// Either a plain method declaration or an endpoint.
///
/// Untagged: an object carrying a `url` key deserializes as an endpoint,
/// anything else as a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Method {
    Endpoint(Endpoint),
    Declaration(MethodDeclaration),
}

impl Method {
    /// The underlying declaration, endpoint or not.
    pub fn declaration(&self) -> &MethodDeclaration {
        match self {
            Method::Endpoint(e) => &e.method,
            Method::Declaration(d) => d,
        }
    }

    pub fn as_endpoint(&self) -> Option<&Endpoint> {
        match self {
            Method::Endpoint(e) => Some(e),
            Method::Declaration(_) => None,
        }
    }
}

/// A method invocation found inside a method body:
/// `objectName.name(parameterContents)` inside `calledFrom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodCallDeclaration {
    /// Name of the called method.
    pub name: String,
    /// Name of the method containing this call.
    pub called_from: String,
    /// Receiver variable name, empty for unqualified calls.
    pub object_name: String,
    /// Declared type of the receiver, empty when unresolved.
    pub object_type: String,
    /// Raw textual rendering of the argument list.
    pub parameter_contents: String,
    /// Fully-qualified name of the class making the call.
    pub class_fqn: String,
}

/// A client-side invocation inferred to issue an outbound HTTP request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestCall {
    #[serde(flatten)]
    pub call: MethodCallDeclaration,
    /// Resolved or partially-resolved URL; unresolved fragments appear
    /// as `{?}`.
    pub url: String,
    pub http_method: HttpMethod,
    /// Inferred target microservice, empty when unresolved. An empty
    /// target means "no edge", never an error.
    #[serde(default)]
    pub target: String,
}

/// Either a plain method call or a rest call, discriminated by `url`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodCall {
    Rest(RestCall),
    Plain(MethodCallDeclaration),
}

impl MethodCall {
    pub fn declaration(&self) -> &MethodCallDeclaration {
        match self {
            MethodCall::Rest(r) => &r.call,
            MethodCall::Plain(c) => c,
        }
    }

    pub fn as_rest_call(&self) -> Option<&RestCall> {
        match self {
            MethodCall::Rest(r) => Some(r),
            MethodCall::Plain(_) => None,
        }
    }
}

/// A parsed source file. Identity within a microservice is `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JClass {
    /// Repository-relative path of the file.
    pub path: String,
    /// Fully-qualified class name (`package.ClassName`).
    pub class_fqn: String,
    pub role: ClassRole,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(default)]
    pub method_calls: Vec<MethodCall>,
    #[serde(default)]
    pub imports: Vec<String>,
}

impl JClass {
    /// All endpoints declared by this class, in method order.
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.methods.iter().filter_map(Method::as_endpoint)
    }

    /// All rest calls issued by this class, in call order.
    pub fn rest_calls(&self) -> impl Iterator<Item = &RestCall> {
        self.method_calls.iter().filter_map(MethodCall::as_rest_call)
    }
}

/// One service of the analyzed system. File paths are unique within it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Microservice {
    pub name: String,
    /// Repository-relative root of the service.
    pub path: String,
    pub files: Vec<JClass>,
}

impl Microservice {
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.files.iter().flat_map(JClass::endpoints)
    }

    pub fn rest_calls(&self) -> impl Iterator<Item = &RestCall> {
        self.files.iter().flat_map(JClass::rest_calls)
    }
}

/// Snapshot of a whole system at one commit. Service names are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicroserviceSystem {
    pub name: String,
    pub commit_id: String,
    pub microservices: Vec<Microservice>,
}

impl MicroserviceSystem {
    /// Find a service by name.
    pub fn microservice(&self, name: &str) -> Option<&Microservice> {
        self.microservices.iter().find(|m| m.name == name)
    }

    /// Find a file anywhere in the system by repository-relative path.
    pub fn find_class(&self, path: &str) -> Option<&JClass> {
        self.microservices
            .iter()
            .flat_map(|m| m.files.iter())
            .find(|c| c.path == path)
    }
}

/// Kind of a file-level change between two commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Add,
    Modify,
    Delete,
}

/// One changed file. A rename is a single delta with both paths set.
///
/// `changed_file` holds the re-extracted class for ADD/MODIFY; it is absent
/// for DELETE, where consumers look up the prior shape in the old snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delta {
    pub old_path: Option<String>,
    pub new_path: Option<String>,
    pub kind: ChangeKind,
    pub changed_file: Option<JClass>,
}

impl Delta {
    /// The path identifying this delta: the new path when present,
    /// otherwise the old one.
    pub fn path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or("")
    }
}

/// Typed change set between two commits: exactly one delta per changed
/// file under the configured service roots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemChange {
    pub old_commit: String,
    pub new_commit: String,
    pub deltas: Vec<Delta>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_endpoint() -> Endpoint {
        Endpoint {
            method: MethodDeclaration {
                name: "getUser".into(),
                return_type: "User".into(),
                class_fqn: "com.acme.user.UserController".into(),
                annotations: vec![Annotation::new("GetMapping")],
                parameters: vec![Field::new("id", "String")],
            },
            url: "/api/users/{?}".into(),
            http_method: HttpMethod::Get,
            microservice: "user-service".into(),
        }
    }

    fn sample_rest_call() -> RestCall {
        RestCall {
            call: MethodCallDeclaration {
                name: "getForObject".into(),
                called_from: "fetchUser".into(),
                object_name: "restTemplate".into(),
                object_type: "RestTemplate".into(),
                parameter_contents: "\"http://user-service/api/users/1\", User.class".into(),
                class_fqn: "com.acme.order.OrderService".into(),
            },
            url: "/api/users/1".into(),
            http_method: HttpMethod::Get,
            target: "user-service".into(),
        }
    }

    #[test]
    fn method_discriminated_by_url_key() {
        let endpoint = Method::Endpoint(sample_endpoint());
        let plain = Method::Declaration(MethodDeclaration {
            name: "helper".into(),
            return_type: "void".into(),
            class_fqn: "com.acme.user.UserController".into(),
            annotations: vec![],
            parameters: vec![],
        });

        let endpoint_json = serde_json::to_value(&endpoint).unwrap();
        let plain_json = serde_json::to_value(&plain).unwrap();
        assert!(endpoint_json.get("url").is_some());
        assert!(plain_json.get("url").is_none());

        let endpoint_back: Method = serde_json::from_value(endpoint_json).unwrap();
        let plain_back: Method = serde_json::from_value(plain_json).unwrap();
        assert_eq!(endpoint_back, endpoint);
        assert_eq!(plain_back, plain);
    }

    #[test]
    fn method_call_discriminated_by_url_key() {
        let rest = MethodCall::Rest(sample_rest_call());
        let json = serde_json::to_string(&rest).unwrap();
        let back: MethodCall = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rest);
        assert!(back.as_rest_call().is_some());

        let plain = MethodCall::Plain(MethodCallDeclaration {
            name: "save".into(),
            called_from: "createUser".into(),
            object_name: "repository".into(),
            object_type: "UserRepository".into(),
            parameter_contents: "user".into(),
            class_fqn: "com.acme.user.UserService".into(),
        });
        let json = serde_json::to_string(&plain).unwrap();
        let back: MethodCall = serde_json::from_str(&json).unwrap();
        assert_eq!(back, plain);
        assert!(back.as_rest_call().is_none());
    }

    #[test]
    fn system_round_trips() {
        let system = MicroserviceSystem {
            name: "acme".into(),
            commit_id: "abc123".into(),
            microservices: vec![Microservice {
                name: "user-service".into(),
                path: "user-service".into(),
                files: vec![JClass {
                    path: "user-service/src/UserController.java".into(),
                    class_fqn: "com.acme.user.UserController".into(),
                    role: ClassRole::Controller,
                    fields: vec![Field::new("userService", "UserService")],
                    methods: vec![Method::Endpoint(sample_endpoint())],
                    method_calls: vec![MethodCall::Rest(sample_rest_call())],
                    imports: vec!["org.springframework.web.client.RestTemplate".into()],
                }],
            }],
        };

        let json = serde_json::to_string_pretty(&system).unwrap();
        let back: MicroserviceSystem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, system);
    }

    #[test]
    fn system_change_round_trips() {
        let change = SystemChange {
            old_commit: "abc".into(),
            new_commit: "def".into(),
            deltas: vec![
                Delta {
                    old_path: None,
                    new_path: Some("user-service/src/New.java".into()),
                    kind: ChangeKind::Add,
                    changed_file: None,
                },
                Delta {
                    old_path: Some("user-service/src/Old.java".into()),
                    new_path: None,
                    kind: ChangeKind::Delete,
                    changed_file: None,
                },
            ],
        };

        let json = serde_json::to_string(&change).unwrap();
        let back: SystemChange = serde_json::from_str(&json).unwrap();
        assert_eq!(back, change);
        assert_eq!(back.deltas[0].path(), "user-service/src/New.java");
        assert_eq!(back.deltas[1].path(), "user-service/src/Old.java");
    }

    #[test]
    fn http_method_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&HttpMethod::Get).unwrap(), "\"GET\"");
        assert_eq!(serde_json::to_string(&HttpMethod::All).unwrap(), "\"ALL\"");
        assert_eq!(HttpMethod::None.to_string(), "NONE");
    }

    #[test]
    fn annotation_attribute_lookup() {
        let ann = Annotation {
            name: "RequestMapping".into(),
            attributes: vec![
                AnnotationAttribute {
                    key: "value".into(),
                    value: "/api".into(),
                },
                AnnotationAttribute {
                    key: "method".into(),
                    value: "RequestMethod.POST".into(),
                },
            ],
        };
        assert_eq!(ann.attribute("value"), Some("/api"));
        assert_eq!(ann.attribute("method"), Some("RequestMethod.POST"));
        assert_eq!(ann.attribute("missing"), None);
    }
}
