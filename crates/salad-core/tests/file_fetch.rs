//! Integration tests for loading documents from disk
//!
//! These go through the default fetcher against temporary directories.

mod test_support;

use salad_core::error::FetchError;
use salad_core::uri::file_uri;
use salad_core::{FetcherConfig, LoadError, LoaderConfig, RootLoader};
use std::fs;
use tempfile::TempDir;
use test_support::{record, records, workflow};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write_project(dir: &TempDir) {
    fs::write(
        dir.path().join("wf.yml"),
        "class: Workflow\ninputs: {$import: inputs.yml}\ndoc: {$include: README.md}\n",
    )
    .unwrap();
    fs::write(dir.path().join("inputs.yml"), "threads: int\nreads: string\n").unwrap();
    fs::write(dir.path().join("README.md"), "Aligns reads.\n").unwrap();
}

#[test]
fn test_load_path_resolves_relative_references() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    write_project(&dir);

    let path = dir.path().join("wf.yml");
    let loaded = RootLoader::new(workflow()).load_path(&path, None).unwrap();

    let workflow = record(&loaded);
    let document = file_uri(&path.to_string_lossy(), false);
    assert_eq!(workflow.id(), Some(document.as_str()));
    assert_eq!(
        workflow.get("doc").and_then(|doc| doc.as_str()),
        Some("Aligns reads.\n")
    );

    let inputs = records(workflow, "inputs");
    assert_eq!(inputs.len(), 2);
    assert!(inputs[0].id().unwrap().ends_with("/inputs.yml#reads"));
    assert!(inputs[1].id().unwrap().ends_with("/inputs.yml#threads"));
}

#[test]
fn test_document_size_limit() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    write_project(&dir);

    let config = LoaderConfig::default()
        .with_fetcher(FetcherConfig::default().with_max_document_bytes(16));
    let err = RootLoader::new(workflow())
        .with_config(config)
        .load_path(&dir.path().join("wf.yml"), None)
        .unwrap_err();

    assert!(matches!(
        err,
        LoadError::Fetch(FetchError::TooLarge { limit: 16, .. })
    ));
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = RootLoader::new(workflow())
        .load_path(&dir.path().join("absent.yml"), None)
        .unwrap_err();

    match err {
        LoadError::Fetch(FetchError::Io { url, .. }) => assert!(url.ends_with("/absent.yml")),
        other => panic!("unexpected error: {other}"),
    }
}
