//! # topomine - Microservice Topology Miner
//!
//! Reverse-engineers the service-level topology of a microservice system
//! from its Java/Spring source tree.
//!
//! ## Overview
//!
//! The pipeline runs in dependency order, leaves first:
//!
//! 1. **Extraction** - parse each source file, classify its role and mine
//!    REST endpoints and outbound REST calls into a typed snapshot
//! 2. **Delta** - turn version-control change lists into typed change sets
//!    between two snapshots
//! 3. **Graph** - project a snapshot onto a service-to-service call graph
//! 4. **Analysis** - flag architectural smells on that graph: greedy and
//!    hub-like services, wrong-cut clusters and dependency cycles
//!
//! ## Usage
//!
//! ```bash
//! # Snapshot a checked-out repository
//! topomine extract -c config.json -r ./repo --commit abc123 -o system.json
//!
//! # Project and analyze the call graph
//! topomine graph -s system.json -o graph.json
//! topomine analyze -s system.json
//! ```
//!
//! Snapshots and change sets round-trip through JSON; a method or call
//! carrying a `url` key is an endpoint or rest call, one without is plain.

pub mod analysis;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod delta;
pub mod extractor;
pub mod graph;
pub mod model;

pub use analysis::{
    AnalysisReport, CyclicDependencies, GreedyMicroservices, HubLikeMicroservices, WrongCuts,
    analyze, detect_cycles, detect_greedy, detect_hub_like, detect_wrong_cuts,
};
pub use builder::{Diagnostic, SystemBuild, build_system};
pub use config::{Config, ConfigError, load_config};
pub use delta::{DeltaBuild, DeltaError, FileChange, extract_system_change};
pub use extractor::{ExtractorError, extract_class};
pub use graph::{CallGraph, Edge, build_call_graph};
pub use model::{
    Annotation, AnnotationAttribute, ChangeKind, ClassRole, Delta, Endpoint, Field, HttpMethod,
    JClass, Method, MethodCall, MethodCallDeclaration, MethodDeclaration, Microservice,
    MicroserviceSystem, RestCall, SystemChange,
};
