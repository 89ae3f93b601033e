// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn files_get_sequential_slots_in_order() {
    let mut vars = BuildVariables::new();
    vars.put("device", VarValue::Value("enchilada".into()));
    vars.put("key", VarValue::FilePath("/home/me/key.pem".into()));
    vars.put("token", VarValue::Secret("s3cret".into()));
    vars.put("cert", VarValue::FilePath("/home/me/cert.pem".into()));

    let (doc, uploads) = vars.to_document();

    assert_eq!(doc.get("device"), Some("enchilada"));
    assert_eq!(doc.get("token"), Some("s3cret"));
    assert_eq!(doc.get("key"), Some("/ham-files/1"));
    assert_eq!(doc.get("cert"), Some("/ham-files/2"));
    assert_eq!(
        uploads,
        vec![
            FileUpload { local: "/home/me/key.pem".into(), remote: "/ham-files/1".into() },
            FileUpload { local: "/home/me/cert.pem".into(), remote: "/ham-files/2".into() },
        ]
    );
}

#[test]
fn empty_values_are_omitted() {
    let mut vars = BuildVariables::new();
    vars.put("optional", VarValue::Value(String::new()));
    vars.put("hidden", VarValue::Secret(String::new()));

    let (doc, uploads) = vars.to_document();
    assert!(doc.is_empty());
    assert!(uploads.is_empty());
}

#[test]
fn document_serializes_as_flat_object() {
    let mut vars = BuildVariables::new();
    vars.put("a", VarValue::Value("1".into()));
    vars.put("b", VarValue::FilePath("/x".into()));
    let (doc, _) = vars.to_document();
    let json = serde_json::to_string(&doc).unwrap();
    assert_eq!(json, r#"{"a":"1","b":"/ham-files/1"}"#);
}

#[test]
fn secrets_are_redacted_in_debug() {
    let debug = format!("{:?}", VarValue::Secret("hunter2".into()));
    assert!(!debug.contains("hunter2"));
}
