//! Workspace-level scenarios exercising the full `embr` command surface
//! across crate boundaries, one test per literal scenario.

use std::time::{Duration, SystemTime};

use embr::commands;
use embr_core::payload;
use embr_core::resolve;
use tempfile::tempdir;

#[test]
fn init_creates_the_documented_layout() {
    let dir = tempdir().unwrap();
    commands::init(dir.path(), false, false, None).unwrap();

    let embr_dir = dir.path().join(".embr");
    for sub in [
        "objects",
        "objects/temp",
        "metadata",
        "metadata/files",
        "metadata/models",
        "metadata/versions",
        "sets",
        "refs/models",
    ] {
        assert!(embr_dir.join(sub).is_dir(), "missing {sub}");
    }
    let config = std::fs::read_to_string(embr_dir.join("config")).unwrap();
    assert!(config.starts_with("# EmbeddingBridge config file"));
    assert_eq!(std::fs::read_to_string(embr_dir.join("HEAD")).unwrap(), "main");
    assert!(embr_dir.join("sets/main/config").is_file());
}

#[test]
fn storing_a_three_float_vector_yields_the_literal_hash() {
    let dir = tempdir().unwrap();
    commands::init(dir.path(), false, false, None).unwrap();

    let values = vec![1.0f32, 2.0, 3.0];
    let bytes = payload::encode_raw(&values);
    assert_eq!(
        bytes,
        vec![
            0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80, 0x3f, 0x00, 0x00, 0x00, 0x40, 0x00, 0x00,
            0x40, 0x40
        ]
    );

    let file = dir.path().join("vec.bin");
    std::fs::write(&file, &bytes).unwrap();
    let outcome = commands::store_file(dir.path(), &file, "openai", false).unwrap();
    assert!(outcome.created);

    let raw_path = dir
        .path()
        .join(".embr/objects")
        .join(format!("{}.raw", outcome.hash));
    assert!(raw_path.is_file());
}

#[test]
fn parquet_round_trip_preserves_literal_float_bytes() {
    use embr_parquet::{transform, inverse_transform, TransformOptions, TransformOutput};

    let values = vec![0.5f32, -0.5];
    let npy = payload::encode_npy(&values);
    let parsed = payload::parse(&npy).unwrap();
    assert_eq!(parsed.values, values);

    let output = transform(&npy, None, &TransformOptions::default()).unwrap();
    let TransformOutput::Row(row) = output else {
        panic!("expected a row transform for a fresh npy payload");
    };

    let (restored, sidecar) = inverse_transform(&row.parquet_bytes).unwrap();
    assert_eq!(sidecar.dimensions(), Some("2"));
    assert_eq!(sidecar.file_type(), Some("npy"));

    let restored_parsed = payload::parse(&restored).unwrap();
    let header_len = u16::from_le_bytes([restored[8], restored[9]]) as usize;
    let data = &restored[10 + header_len..];
    assert_eq!(data, &[0x00, 0x00, 0x00, 0x3f, 0x00, 0x00, 0x00, 0xbf]);
    assert_eq!(restored_parsed.values, values);
}

#[test]
fn ambiguous_partial_hash_resolves_once_disambiguated() {
    let dir = tempdir().unwrap();
    commands::init(dir.path(), false, false, None).unwrap();

    let objects_dir = dir.path().join(".embr/objects");
    std::fs::create_dir_all(&objects_dir).unwrap();
    let a = "abcd1234".to_string() + &"0".repeat(56);
    let b = "abcdef00".to_string() + &"0".repeat(56);
    std::fs::write(objects_dir.join(format!("{a}.raw")), b"x").unwrap();
    std::fs::write(objects_dir.join(format!("{b}.raw")), b"y").unwrap();

    let err = embr_core::store::resolve_hash(dir.path(), "abcd").unwrap_err();
    assert!(matches!(err, embr_core::EmbrError::HashAmbiguous { .. }));

    std::fs::remove_file(objects_dir.join(format!("{b}.raw"))).unwrap();
    let resolved = embr_core::store::resolve_hash(dir.path(), "abcd").unwrap();
    assert_eq!(resolved.to_hex(), a);
}

#[test]
fn gc_removes_only_the_unreferenced_stale_object() {
    let dir = tempdir().unwrap();
    commands::init(dir.path(), false, false, None).unwrap();

    let doc = dir.path().join("doc.txt");
    std::fs::write(&doc, payload::encode_raw(&[1.0])).unwrap();
    let h1 = commands::store_file(dir.path(), &doc, "openai", false).unwrap().hash;

    let stray = dir.path().join("stray.bin");
    std::fs::write(&stray, payload::encode_raw(&[2.0, 2.0])).unwrap();
    let bytes = std::fs::read(&stray).unwrap();
    let h2 = embr_core::store::write_object(
        dir.path(),
        &bytes,
        embr_core::header::ObjectType::Vector,
        embr_core::header::ObjectFlags::empty(),
    )
    .unwrap();

    let raw_h2 = dir.path().join(".embr/objects").join(format!("{h2}.raw"));
    let old = SystemTime::now() - Duration::from_secs(30 * 24 * 3600);
    filetime::set_file_mtime(&raw_h2, filetime::FileTime::from_system_time(old)).unwrap();

    let result = commands::gc(dir.path(), Some("2.weeks.ago"), false).unwrap();
    assert_eq!(result.objects_removed, 1);
    assert!(embr_core::store::object_exists(dir.path(), &h1));
    assert!(!embr_core::store::object_exists(dir.path(), &h2));
}

#[tokio::test]
async fn push_then_pull_reproduces_the_same_index_entries() {
    let push_dir = tempdir().unwrap();
    let pull_dir = tempdir().unwrap();
    let remote_dir = tempdir().unwrap();
    let remote_url = format!("file://{}", remote_dir.path().display());

    commands::init(push_dir.path(), false, false, None).unwrap();
    let doc = push_dir.path().join("doc.txt");
    std::fs::write(&doc, payload::encode_raw(&[1.0, 2.0])).unwrap();
    commands::store_file(push_dir.path(), &doc, "openai", false).unwrap();

    commands::push_to_url(push_dir.path(), &remote_url, None, false)
        .await
        .unwrap();

    commands::init(pull_dir.path(), false, false, None).unwrap();
    commands::pull_from_url(pull_dir.path(), &remote_url, Some("main"), false)
        .await
        .unwrap();

    let push_index = embr_core::workingtree::read_index(push_dir.path()).unwrap();
    let pull_index = embr_core::workingtree::read_index(pull_dir.path()).unwrap();

    let push_set: std::collections::HashSet<_> = push_index
        .iter()
        .map(|e| (e.hash, e.source.clone()))
        .collect();
    let pull_set: std::collections::HashSet<_> = pull_index
        .iter()
        .map(|e| (e.hash, e.source.clone()))
        .collect();
    assert_eq!(push_set, pull_set);

    let source = doc.to_string_lossy().into_owned();
    let push_hash = resolve::current_hash(push_dir.path(), &source).unwrap();
    let pull_hash = resolve::current_hash(pull_dir.path(), &source).unwrap();
    assert_eq!(push_hash, pull_hash);
}
