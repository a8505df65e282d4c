// tests/workflow.rs

//! End-to-end request flow: configuration, authorization, documents.

mod common;

use common::*;
use crest::config::CrestConfig;
use crest::model::element::{ElementBuilder, Schema};
use crest::model::Resource;
use crest::{Error, Session, TroveQuery};
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_empty_roles_forbidden_before_database() {
    let urls = urls();
    let missing = std::env::temp_dir().join("crest-no-such-dir").join("sqldb");

    let result = Session::open(&missing, Vec::<i64>::new(), &urls);
    assert!(matches!(result, Err(Error::Forbidden)));

    // With roles, the missing database is what fails
    let result = Session::open(&missing, [ROLE_A], &urls);
    assert!(matches!(result, Err(Error::Database(_))));
}

#[test]
fn test_session_from_config_file() {
    let repo = setup_standard_repo();

    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[database]
path = "{}"
roles = [{ROLE_A}]

[content]
root = "{}"
chunk_size = 16

[urls]
base = "https://repo.example.com/conary/api/"
"#,
        repo.db_path().display(),
        repo.contents.display(),
    )
    .unwrap();

    let config = CrestConfig::load(file.path()).unwrap();
    assert_eq!(config.database.roles, vec![ROLE_A]);
    assert_eq!(config.content.chunk_size, 16);

    let urls = config.url_builder().unwrap();
    let session = Session::open(&config.database.path, config.database.roles.clone(), &urls).unwrap();

    let query = TroveQuery::from_pairs([("name", "baz")]).unwrap();
    let list = session.search_troves(&query).unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(
        list.troves[0].id.as_deref(),
        Some("https://other/conary/api/trove/baz%3D%2Fother%40ns%3A2%2F1.0-1-1%5B%5D")
    );
}

#[test]
fn test_documents_lower_to_element_tree() {
    let repo = setup_standard_repo();
    let urls = urls();
    let session = Session::open(repo.db_path(), [ROLE_A], &urls).unwrap();

    let list = session.search_troves(&TroveQuery::default()).unwrap();
    let tree = list.to_element(&urls).unwrap();
    assert_eq!(tree.tag, "troveList");
    assert_eq!(tree.fields("trove").count(), list.len());

    let labels = session.list_labels().unwrap().to_element(&urls).unwrap();
    assert_eq!(labels.fields("label").count(), 2);

    let root = session.get_repository().unwrap().to_element(&urls).unwrap();
    assert_eq!(root.attribute("id"), Some("http://localhost:9000/api/"));

    // The tree serializes like any other document
    let json = serde_json::to_value(&tree).unwrap();
    assert_eq!(json["tag"], "troveList");
}

#[test]
fn test_unknown_element_field_rejected() {
    static NARROW: Schema = Schema {
        tag: "narrow",
        attributes: &["id"],
        fields: &["name"],
    };

    let ok = ElementBuilder::new(&NARROW)
        .attr("id", "x")
        .and_then(|b| b.text("name", "foo"));
    assert!(ok.is_ok());

    let err = ElementBuilder::new(&NARROW).text("bogus", "value").unwrap_err();
    match err {
        Error::UnknownField { resource, field } => {
            assert_eq!(resource, "narrow");
            assert_eq!(field, "bogus");
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(matches!(
        ElementBuilder::new(&NARROW).attr("href", "x"),
        Err(Error::UnknownField { .. })
    ));
}
