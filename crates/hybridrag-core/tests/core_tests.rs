use std::fs;
use tempfile::TempDir;

use hybridrag_core::config::{resolve_with_base, Config, EngineConfig};
use hybridrag_core::types::{DocumentInput, MetaValue};

#[test]
fn engine_config_defaults_without_files() {
    let tmp = TempDir::new().unwrap();
    let config = Config::load_from_dir(tmp.path()).expect("load");
    let engine = config.engine().expect("engine");
    assert_eq!(engine, EngineConfig::default());
    assert_eq!(engine.chunking.max_size, 1200);
    assert_eq!(engine.chunking.min_size, 300);
    assert_eq!(engine.retrieval.n_results, 3);
    assert_eq!(engine.retrieval.hybrid_n_results, 5);
    assert_eq!(engine.retrieval.iterative_steps, 2);
}

#[test]
fn engine_config_partial_table_keeps_other_defaults() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[engine.chunking]\nmax_size = 800\n\n[data]\nraw_txt_dir = \"docs\"\n").unwrap();
    let config = Config::load_from_dir(tmp.path()).expect("load");
    let engine = config.engine().expect("engine");
    assert_eq!(engine.chunking.max_size, 800);
    assert_eq!(engine.chunking.min_size, 300);
    assert_eq!(engine.retrieval.hybrid_n_results, 5);
    let dir: String = config.get("data.raw_txt_dir").expect("data dir");
    assert_eq!(resolve_with_base(tmp.path(), dir), tmp.path().join("docs"));
}

#[test]
fn invalid_chunk_bounds_are_rejected() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("config.toml"), "[engine.chunking]\nmax_size = 100\nmin_size = 200\n").unwrap();
    let err = Config::load_from_dir(tmp.path()).err().expect("should fail");
    assert!(err.to_string().contains("min_size"), "got: {err}");
}

#[test]
fn document_input_sanitizes_on_conversion() {
    let input = DocumentInput::new("d1", "body")
        .with_metadata("title", "Guide")
        .with_metadata("pages", serde_json::json!([1, 2]));
    let doc = input.sanitize();
    assert_eq!(doc.metadata["title"], MetaValue::Text("Guide".into()));
    assert_eq!(doc.metadata["pages"], MetaValue::Text("[1,2]".into()));
}

#[test]
fn non_finite_rrf_k_is_rejected() {
    let mut config = EngineConfig::default();
    config.retrieval.rrf_k = f32::NAN;
    assert!(config.validate().is_err());
    config.retrieval.rrf_k = f32::INFINITY;
    assert!(config.validate().is_err());
    config.retrieval.rrf_k = 60.0;
    assert!(config.validate().is_ok());
}
