//! Shared test support utilities for integration tests
//!
//! A cut-down workflow schema built from generic records, plus helpers for
//! contexts backed by in-memory documents.

#![allow(dead_code)]

use salad_core::{
    FieldSpec, GenericRecord, Loaded, Loader, LoaderRef, LoadingContext, MemoryFetcher,
    RecordSchema, RootLoader, UriScope,
};
use std::sync::Arc;

/// Workflow input parameter
pub fn parameter() -> LoaderRef {
    RecordSchema::new("Parameter")
        .with_id_field("id", true)
        .with_field(FieldSpec::required("type", Loader::type_dsl(Loader::any(), None)))
        .with_field(FieldSpec::optional("label", Loader::string()))
        .with_field(FieldSpec::optional(
            "secondaryFiles",
            Loader::secondary_dsl(Loader::array(Loader::any())),
        ))
        .with_field(FieldSpec::optional("default", Loader::any()))
        .into_loader()
}

/// Connection of a step input to a workflow value
pub fn step_input() -> LoaderRef {
    RecordSchema::new("StepInput")
        .with_id_field("id", true)
        .with_field(
            FieldSpec::optional("source", Loader::uri(Loader::string(), UriScope::plain()))
                .as_uri(None),
        )
        .into_loader()
}

pub fn step() -> LoaderRef {
    RecordSchema::new("Step")
        .with_id_field("id", true)
        .with_field(
            FieldSpec::required("run", Loader::uri(Loader::string(), UriScope::plain()))
                .as_uri(None),
        )
        .with_field(FieldSpec::optional(
            "in",
            Loader::id_map(Loader::array(step_input()), "id", Some("source")),
        ))
        .into_loader()
}

pub fn workflow() -> LoaderRef {
    RecordSchema::new("Workflow")
        .with_class_check()
        .with_id_field("id", false)
        .with_field(FieldSpec::required(
            "inputs",
            Loader::id_map(Loader::array(parameter()), "id", Some("type")),
        ))
        .with_field(FieldSpec::optional(
            "steps",
            Loader::id_map(Loader::array(step()), "id", None),
        ))
        .with_field(FieldSpec::optional("doc", Loader::string()))
        .with_field(FieldSpec::optional(
            "requirements",
            Loader::array(Loader::any()),
        ))
        .into_loader()
}

/// A single workflow, or a sequence of them (as produced by `$graph`)
pub fn workflow_root() -> RootLoader {
    let workflow = workflow();
    RootLoader::new(Loader::union(vec![
        workflow.clone(),
        Loader::array(workflow),
    ]))
}

/// A root context whose fetcher serves `documents`
pub fn memory_context(documents: &[(&str, &str)]) -> (LoadingContext, Arc<MemoryFetcher>) {
    let fetcher = MemoryFetcher::new();
    for (url, text) in documents {
        fetcher.insert(*url, *text);
    }
    let fetcher = Arc::new(fetcher);
    let ctx = LoadingContext::builder().fetcher(fetcher.clone()).build();
    (ctx, fetcher)
}

/// Borrow a loaded value as a generic record, panicking otherwise
pub fn record(loaded: &Loaded) -> &GenericRecord {
    loaded
        .downcast_record::<GenericRecord>()
        .unwrap_or_else(|| panic!("expected a record, got {:?}", loaded))
}

/// The records of a list-valued record field
pub fn records<'a>(parent: &'a GenericRecord, field: &str) -> Vec<&'a GenericRecord> {
    parent
        .get(field)
        .and_then(Loaded::as_list)
        .unwrap_or_else(|| panic!("field `{}` is not a list", field))
        .iter()
        .map(record)
        .collect()
}
