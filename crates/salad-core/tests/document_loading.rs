//! Integration tests for the document protocol
//!
//! Covers `$import`, `$include`, `$graph`, `$base` and `$namespaces` handling
//! through the public entry points, using in-memory documents.

mod test_support;

use indexmap::IndexMap;
use salad_core::{LoadError, Loaded, Loader, LoadingContext, MemoryFetcher, RootLoader, UriScope};
use std::sync::Arc;
use serde_json::json;
use test_support::{memory_context, record, records, workflow_root};

const WORKFLOW: &str = r##"
class: Workflow
id: main
inputs:
  threads: int
  reads:
    type: string
    secondaryFiles: [".bai", ".crai?"]
steps:
  align:
    run: tools/align.yml
    in:
      reads: "#main/reads"
"##;

#[test]
fn test_load_workflow_from_text() {
    let (ctx, fetcher) = memory_context(&[]);
    let loaded = workflow_root()
        .load_document_from_text(WORKFLOW, Some("file:///work/wf.yml"), Some(ctx))
        .unwrap();

    let workflow = record(&loaded);
    assert_eq!(workflow.class(), "Workflow");
    assert_eq!(workflow.id(), Some("file:///work/wf.yml#main"));

    let inputs = records(workflow, "inputs");
    let ids: Vec<_> = inputs.iter().filter_map(|input| input.id()).collect();
    assert_eq!(
        ids,
        vec!["file:///work/wf.yml#main/reads", "file:///work/wf.yml#main/threads"]
    );
    assert_eq!(
        inputs[0].get("secondaryFiles").map(|v| v.save(false, "", false)),
        Some(json!([{"pattern": ".bai"}, {"pattern": ".crai", "required": false}]))
    );

    let steps = records(workflow, "steps");
    assert_eq!(steps[0].id(), Some("file:///work/wf.yml#main/align"));
    assert_eq!(
        steps[0].get("run").and_then(Loaded::as_str),
        Some("file:///work/tools/align.yml")
    );
    let step_inputs = records(steps[0], "in");
    assert_eq!(step_inputs[0].id(), Some("file:///work/wf.yml#main/align/reads"));
    assert_eq!(
        step_inputs[0].get("source").and_then(Loaded::as_str),
        Some("file:///work/wf.yml#main/reads")
    );

    // loading from text never touches the fetcher
    assert_eq!(fetcher.fetch_count(), 0);
}

#[test]
fn test_save_restores_relative_identifiers() {
    let (ctx, _) = memory_context(&[]);
    let loaded = workflow_root()
        .load_document_from_text(WORKFLOW, Some("file:///work/wf.yml"), Some(ctx))
        .unwrap();

    let saved = loaded.save(true, "file:///work/wf.yml", true);
    assert_eq!(saved["id"], json!("main"));
    assert_eq!(saved["class"], json!("Workflow"));
    assert_eq!(saved["inputs"][0]["id"], json!("reads"));
    assert_eq!(saved["inputs"][1], json!({"id": "threads", "type": "int"}));
    assert_eq!(saved["steps"][0]["id"], json!("align"));
    assert_eq!(saved["steps"][0]["run"], json!("tools/align.yml"));
}

#[test]
fn test_graph_with_shared_import() {
    let (ctx, fetcher) = memory_context(&[
        (
            "file:///work/graph.yml",
            "$graph:\n  - class: Workflow\n    id: first\n    inputs: {$import: inputs.yml}\n  - class: Workflow\n    id: second\n    inputs: {$import: inputs.yml}\n",
        ),
        ("file:///work/inputs.yml", "threads: int\nname: string\n"),
    ]);

    let loaded = workflow_root()
        .load_document_by_url("file:///work/graph.yml", Some(ctx.clone()))
        .unwrap();

    let workflows = loaded.as_list().unwrap();
    assert_eq!(workflows.len(), 2);
    assert_eq!(record(&workflows[0]).id(), Some("file:///work/graph.yml#first"));
    assert_eq!(record(&workflows[1]).id(), Some("file:///work/graph.yml#second"));

    // imported records are identified relative to the imported document
    let inputs = records(record(&workflows[1]), "inputs");
    assert_eq!(inputs[0].id(), Some("file:///work/inputs.yml#name"));

    assert_eq!(fetcher.fetch_count_for("file:///work/inputs.yml"), 1);
    assert_eq!(
        ctx.imports(),
        vec!["file:///work/inputs.yml", "file:///work/inputs.yml"]
    );
    assert_eq!(ctx.cache().len(), 2);
}

#[test]
fn test_include_loads_raw_text() {
    let (ctx, _) = memory_context(&[
        (
            "file:///work/wf.yml",
            "class: Workflow\ninputs: {}\ndoc: {$include: README.md}\n",
        ),
        ("file:///work/README.md", "# Aligner\n\nAligns reads.\n"),
    ]);

    let loaded = workflow_root()
        .load_document_by_url("file:///work/wf.yml", Some(ctx.clone()))
        .unwrap();

    assert_eq!(
        record(&loaded).get("doc").and_then(Loaded::as_str),
        Some("# Aligner\n\nAligns reads.\n")
    );
    assert_eq!(ctx.includes(), vec!["file:///work/README.md"]);
    assert!(ctx.imports().is_empty());
}

#[test]
fn test_base_and_namespaces() {
    let text = r#"
$base: "http://example.org/wf/"
$namespaces:
  edam: "http://edamontology.org/"
class: Workflow
id: main
inputs:
  reads:
    type: string
    edam:format: edam:format_2572
"#;
    let (ctx, _) = memory_context(&[]);
    let loaded = workflow_root()
        .load_document_from_text(text, Some("file:///work/wf.yml"), Some(ctx))
        .unwrap();

    let workflow = record(&loaded);
    assert_eq!(workflow.id(), Some("http://example.org/wf/#main"));
    let inputs = records(workflow, "inputs");
    assert_eq!(inputs[0].id(), Some("http://example.org/wf/#main/reads"));
    assert_eq!(
        inputs[0].extension_fields()["http://edamontology.org/format"],
        json!("edam:format_2572")
    );

    let saved = loaded.save(true, "http://example.org/wf/", true);
    assert_eq!(saved["$namespaces"], json!({"edam": "http://edamontology.org/"}));
    assert_eq!(saved["inputs"][0]["edam:format"], json!("edam:format_2572"));
    assert!(saved.get("$base").is_none());
}

#[test]
fn test_fragment_is_stripped_before_fetching() {
    let (ctx, fetcher) = memory_context(&[("file:///work/wf.yml", WORKFLOW)]);
    let root = workflow_root();

    root.load_document_by_url("file:///work/wf.yml#main", Some(ctx.clone()))
        .unwrap();
    root.load_document_by_url("file:///work/wf.yml", Some(ctx.clone()))
        .unwrap();

    assert_eq!(fetcher.fetch_count_for("file:///work/wf.yml"), 1);
    assert_eq!(fetcher.fetch_count_for("file:///work/wf.yml#main"), 0);
    assert_eq!(ctx.cache().stats().hits, 1);
}

#[test]
fn test_reloading_from_cache_is_idempotent() {
    let (ctx, fetcher) = memory_context(&[("file:///work/wf.yml", WORKFLOW)]);
    let root = workflow_root();

    let first = root
        .load_document_by_url("file:///work/wf.yml", Some(ctx.clone()))
        .unwrap();
    let second = root
        .load_document_by_url("file:///work/wf.yml", Some(ctx.clone()))
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first.save(true, "file:///work/wf.yml", true),
        second.save(true, "file:///work/wf.yml", true)
    );
    assert_eq!(fetcher.fetch_count(), 1);
    assert_eq!(ctx.cache().stats().hits, 1);
}

#[test]
fn test_imported_namespaces_overlay_inherited_ones() {
    let fetcher = Arc::new(MemoryFetcher::new().with_document(
        "file:///work/child.yml",
        "$namespaces:\n  b: \"http://b.org/\"\nx: a:Thing\ny: b:Other\n",
    ));
    let mut namespaces = IndexMap::new();
    namespaces.insert("a".to_string(), "http://a.org/".to_string());
    let ctx = LoadingContext::builder()
        .fetcher(fetcher)
        .namespaces(namespaces)
        .build();

    let loaded = RootLoader::new(Loader::map(
        Loader::uri(Loader::string(), UriScope::plain()),
        None,
    ))
    .load_document_by_url("file:///work/child.yml", Some(ctx))
    .unwrap();

    assert_eq!(
        loaded.save(false, "", false),
        json!({"x": "http://a.org/Thing", "y": "http://b.org/Other"})
    );
}

#[test]
fn test_remote_import_with_obfuscated_file_scheme_is_refused() {
    let (ctx, fetcher) = memory_context(&[
        ("http://example.com/doc.yml", "- 1\n- {$import: \"fi\\tle:///etc/passwd\"}\n"),
        ("file:///etc/passwd", "- 0\n"),
    ]);

    let err = RootLoader::new(Loader::array(Loader::int()))
        .load_document_by_url("http://example.com/doc.yml", Some(ctx))
        .unwrap_err();

    let error = err.as_validation().unwrap();
    assert!(error
        .leaf_messages()
        .iter()
        .any(|message| message.starts_with("Not resolving potential remote exploit")));
    assert_eq!(fetcher.fetch_count_for("file:///etc/passwd"), 0);
}

#[test]
fn test_circular_import_is_rejected() {
    let (ctx, _) = memory_context(&[
        ("file:///work/a.yml", "- 1\n- {$import: b.yml}\n"),
        ("file:///work/b.yml", "- 2\n- {$import: a.yml}\n"),
    ]);

    let err = RootLoader::new(Loader::array(Loader::int()))
        .load_document_by_url("file:///work/a.yml", Some(ctx))
        .unwrap_err();

    let error = err.as_validation().unwrap();
    assert!(error
        .leaf_messages()
        .iter()
        .any(|message| message.contains("circular $import of file:///work/a.yml")));
}

#[test]
fn test_import_of_sequence_is_spliced() {
    let (ctx, _) = memory_context(&[
        ("file:///work/a.yml", "- 1\n- {$import: more.yml}\n- 4\n"),
        ("file:///work/more.yml", "- 2\n- 3\n"),
    ]);

    let loaded = RootLoader::new(Loader::array(Loader::int()))
        .load_document_by_url("file:///work/a.yml", Some(ctx))
        .unwrap();
    assert_eq!(loaded.save(true, "", false), json!([1, 2, 3, 4]));
}

#[test]
fn test_remote_document_cannot_include_local_files() {
    let (ctx, fetcher) = memory_context(&[
        ("http://example.org/wf.yml", "secret: {$include: \"file:///etc/passwd\"}\n"),
        ("file:///etc/passwd", "root:x:0:0\n"),
    ]);

    let err = RootLoader::new(Loader::map(Loader::string(), None))
        .load_document_by_url("http://example.org/wf.yml", Some(ctx))
        .unwrap_err();

    let error = err.as_validation().unwrap();
    assert_eq!(
        error.leaf_messages(),
        vec!["Not resolving potential remote exploit file:///etc/passwd from base http://example.org/wf.yml"]
    );
    assert_eq!(fetcher.fetch_count_for("file:///etc/passwd"), 0);
}

#[test]
fn test_collaborator_errors_are_not_validation_errors() {
    let (ctx, _) = memory_context(&[("file:///work/broken.yml", "a: [1, 2\n")]);
    let root = RootLoader::new(Loader::any());

    let err = root
        .load_document_by_url("file:///work/broken.yml", Some(ctx.clone()))
        .unwrap_err();
    assert!(matches!(err, LoadError::Parse(_)));

    let err = root
        .load_document_by_url("file:///work/missing.yml", Some(ctx))
        .unwrap_err();
    assert!(matches!(err, LoadError::Fetch(_)));
    assert!(err.to_string().contains("file:///work/missing.yml"));
}

#[test]
fn test_import_without_file_context() {
    let (ctx, _) = memory_context(&[]);
    let err = workflow_root()
        .load_document(
            &json!({"class": "Workflow", "inputs": {"$import": "inputs.yml"}}),
            Some("file:///work/"),
            Some(ctx),
        )
        .unwrap_err();

    let error = err.as_validation().unwrap();
    assert!(error
        .leaf_messages()
        .contains(&"cannot resolve $import without a file context"));
}
