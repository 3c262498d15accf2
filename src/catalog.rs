//! Framework idiom catalogs
//!
//! Closed, table-driven catalogs of the Spring idioms the extractor
//! recognizes: endpoint-mapping annotations, REST-client call templates
//! and the file classifications used by the delta contract. New idioms are
//! added as table rows, not as new code paths.

use std::path::Path;

use crate::model::{Annotation, HttpMethod};

/// Endpoint-mapping annotation names and the verb each one implies.
/// `RequestMapping` is special-cased: its verb comes from the `method`
/// attribute when present.
pub const ENDPOINT_ANNOTATIONS: &[(&str, HttpMethod)] = &[
    ("GetMapping", HttpMethod::Get),
    ("PostMapping", HttpMethod::Post),
    ("PutMapping", HttpMethod::Put),
    ("DeleteMapping", HttpMethod::Delete),
    ("PatchMapping", HttpMethod::Patch),
    ("RequestMapping", HttpMethod::All),
];

/// Receiver types recognized as HTTP-client abstractions.
pub const REST_CLIENT_TYPES: &[&str] =
    &["RestTemplate", "OAuth2RestTemplate", "OAuth2RestOperations"];

/// RestTemplate method names and the verb each one implies. `exchange` is
/// special-cased: its verb is read from the call's argument text.
pub const REST_CALL_TEMPLATES: &[(&str, HttpMethod)] = &[
    ("getForObject", HttpMethod::Get),
    ("getForEntity", HttpMethod::Get),
    ("postForObject", HttpMethod::Post),
    ("postForEntity", HttpMethod::Post),
    ("patchForObject", HttpMethod::Patch),
    ("put", HttpMethod::Put),
    ("delete", HttpMethod::Delete),
];

/// Derive the HTTP verb of an endpoint annotation, or `None` if the
/// annotation is not an endpoint mapping at all.
///
/// A `RequestMapping` without a `method` attribute maps every verb
/// (`HttpMethod::All`); one with an unrecognized `method` value yields
/// `HttpMethod::None`.
pub fn endpoint_verb(annotation: &Annotation) -> Option<HttpMethod> {
    let (_, verb) = ENDPOINT_ANNOTATIONS
        .iter()
        .find(|(name, _)| *name == annotation.name)?;

    if annotation.name != "RequestMapping" {
        return Some(*verb);
    }

    match annotation.attribute("method") {
        None => Some(HttpMethod::All),
        Some(value) => Some(request_method_verb(value)),
    }
}

/// Map a `RequestMethod.X` attribute value to a verb, `NONE` when
/// unrecognized.
fn request_method_verb(value: &str) -> HttpMethod {
    if value.contains("RequestMethod.GET") {
        HttpMethod::Get
    } else if value.contains("RequestMethod.POST") {
        HttpMethod::Post
    } else if value.contains("RequestMethod.PUT") {
        HttpMethod::Put
    } else if value.contains("RequestMethod.DELETE") {
        HttpMethod::Delete
    } else if value.contains("RequestMethod.PATCH") {
        HttpMethod::Patch
    } else {
        HttpMethod::None
    }
}

/// Derive the HTTP verb of a rest call from the invoked method name and
/// the raw argument text. Unmatched names yield `NONE`; callers record
/// those as generic method calls rather than discarding them.
pub fn rest_call_verb(method_name: &str, argument_text: &str) -> HttpMethod {
    if method_name == "exchange" {
        return exchange_verb(argument_text);
    }

    REST_CALL_TEMPLATES
        .iter()
        .find(|(name, _)| *name == method_name)
        .map(|(_, verb)| *verb)
        .unwrap_or(HttpMethod::None)
}

/// `exchange(...)` names its verb as an `HttpMethod.X` argument; GET is
/// the default when none is found.
fn exchange_verb(argument_text: &str) -> HttpMethod {
    if argument_text.contains("HttpMethod.POST") {
        HttpMethod::Post
    } else if argument_text.contains("HttpMethod.PUT") {
        HttpMethod::Put
    } else if argument_text.contains("HttpMethod.DELETE") {
        HttpMethod::Delete
    } else if argument_text.contains("HttpMethod.PATCH") {
        HttpMethod::Patch
    } else {
        HttpMethod::Get
    }
}

/// Whether the path names a source file the extractor understands.
pub fn is_source_file(path: &str) -> bool {
    Path::new(path)
        .extension()
        .is_some_and(|ext| ext == "java")
}

/// Whether the path denotes a build descriptor. Such files may appear as
/// deltas, but rule-checking consumers must skip them when evaluating
/// source-structural rules.
pub fn is_build_descriptor(path: &str) -> bool {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name == "pom.xml" || name == "build.gradle" || name == "build.gradle.kts")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnnotationAttribute;

    fn request_mapping(attrs: Vec<(&str, &str)>) -> Annotation {
        Annotation {
            name: "RequestMapping".into(),
            attributes: attrs
                .into_iter()
                .map(|(k, v)| AnnotationAttribute {
                    key: k.into(),
                    value: v.into(),
                })
                .collect(),
        }
    }

    #[test]
    fn mapping_annotations_resolve_verbs() {
        assert_eq!(
            endpoint_verb(&Annotation::new("GetMapping")),
            Some(HttpMethod::Get)
        );
        assert_eq!(
            endpoint_verb(&Annotation::new("PatchMapping")),
            Some(HttpMethod::Patch)
        );
        assert_eq!(endpoint_verb(&Annotation::new("Autowired")), None);
    }

    #[test]
    fn request_mapping_without_method_maps_all_verbs() {
        let ann = request_mapping(vec![("value", "/api")]);
        assert_eq!(endpoint_verb(&ann), Some(HttpMethod::All));
    }

    #[test]
    fn request_mapping_reads_method_attribute() {
        let ann = request_mapping(vec![("method", "RequestMethod.DELETE")]);
        assert_eq!(endpoint_verb(&ann), Some(HttpMethod::Delete));

        let odd = request_mapping(vec![("method", "RequestMethod.TRACE")]);
        assert_eq!(endpoint_verb(&odd), Some(HttpMethod::None));
    }

    #[test]
    fn rest_templates_resolve_verbs() {
        assert_eq!(rest_call_verb("getForObject", ""), HttpMethod::Get);
        assert_eq!(rest_call_verb("postForEntity", ""), HttpMethod::Post);
        assert_eq!(rest_call_verb("put", ""), HttpMethod::Put);
        assert_eq!(rest_call_verb("delete", ""), HttpMethod::Delete);
        assert_eq!(rest_call_verb("headForHeaders", ""), HttpMethod::None);
    }

    #[test]
    fn exchange_reads_verb_from_arguments() {
        assert_eq!(
            rest_call_verb("exchange", "url, HttpMethod.POST, entity, Void.class"),
            HttpMethod::Post
        );
        assert_eq!(
            rest_call_verb("exchange", "url, HttpMethod.DELETE, entity, Void.class"),
            HttpMethod::Delete
        );
        // GET is the documented default
        assert_eq!(rest_call_verb("exchange", "url, entity"), HttpMethod::Get);
    }

    #[test]
    fn file_classification() {
        assert!(is_source_file("svc/src/main/java/App.java"));
        assert!(!is_source_file("svc/src/main/resources/app.yml"));
        assert!(is_build_descriptor("user-service/pom.xml"));
        assert!(is_build_descriptor("user-service/build.gradle"));
        assert!(!is_build_descriptor("user-service/src/Pom.java"));
    }
}
