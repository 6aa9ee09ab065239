//! Integration tests for the prem CLI.
//!
//! The generated PDFs carry no identifiers and the interactive fallback is disabled, so no test
//! reaches the network.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use lopdf::{
  content::{Content, Operation},
  dictionary, Dictionary, Document, Object, Stream,
};
use predicates::prelude::*;
use serial_test::serial;
use tempfile::{tempdir, TempDir};

// Helper function to create a command isolated from the user's configuration, cache and logs
fn prem(dir: &TempDir) -> Command {
  let config = dir.path().join("config.toml");
  if !config.exists() {
    std::fs::write(&config, "").unwrap();
  }
  let mut cmd = Command::cargo_bin("prem").unwrap();
  cmd
    .arg("--config")
    .arg(config)
    .arg("--cache-dir")
    .arg(dir.path().join("cache"))
    .arg("--log-dir")
    .arg(dir.path().join("logs"));
  cmd
}

// Helper to write a one-page PDF without any identifier
fn write_pdf(path: &Path, text: &str) {
  let mut doc = Document::with_version("1.5");
  let pages_id = doc.new_object_id();
  let font_id = doc.add_object(dictionary! {
    "Type" => "Font",
    "Subtype" => "Type1",
    "BaseFont" => "Courier",
  });
  let content = Content {
    operations: vec![
      Operation::new("BT", vec![]),
      Operation::new("Tf", vec!["F1".into(), 12.into()]),
      Operation::new("Td", vec![72.into(), 720.into()]),
      Operation::new("Tj", vec![Object::string_literal(text)]),
      Operation::new("ET", vec![]),
    ],
  };
  let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
  let page_id = doc.add_object(dictionary! {
    "Type" => "Page",
    "Parent" => pages_id,
    "Contents" => content_id,
    "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
    "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
  });
  doc.objects.insert(
    pages_id,
    Object::Dictionary(dictionary! { "Type" => "Pages", "Kids" => vec![page_id.into()], "Count" => 1 }),
  );
  let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
  doc.trailer.set("Root", catalog_id);
  doc.save(path).unwrap();
}

fn notes(dir: &TempDir, name: &str) -> PathBuf {
  let path = dir.path().join(name);
  write_pdf(&path, "Meeting notes, nothing to resolve here");
  path
}

#[test]
fn test_help() {
  Command::cargo_bin("prem")
    .unwrap()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("--dry-run"))
    .stdout(predicate::str::contains("--template"));
}

#[test]
fn test_files_are_required() {
  Command::cargo_bin("prem").unwrap().assert().failure();
}

#[test]
#[serial]
fn test_unresolved_file_is_left_alone() {
  let dir = tempdir().unwrap();
  let path = notes(&dir, "notes.pdf");
  let before = std::fs::read(&path).unwrap();

  prem(&dir)
    .arg("--no-interactive")
    .arg(&path)
    .assert()
    .success()
    .stdout(predicate::str::contains("no action taken"));

  assert_eq!(std::fs::read(&path).unwrap(), before);
  assert!(dir.path().join("cache").join("registry.db").exists());
  assert!(dir.path().join("logs").join("prem.log").exists());
}

#[test]
#[serial]
fn test_glob_arguments_are_expanded() {
  let dir = tempdir().unwrap();
  notes(&dir, "a.pdf");
  notes(&dir, "b.pdf");
  let pattern = format!("{}/*.pdf", dir.path().display());

  prem(&dir)
    .arg("--no-interactive")
    .arg("--dry-run")
    .arg(pattern)
    .assert()
    .success()
    .stdout(predicate::str::contains("a.pdf"))
    .stdout(predicate::str::contains("b.pdf"))
    .stdout(predicate::str::contains("no action taken").count(2));
}

#[test]
#[serial]
fn test_missing_file_does_not_fail_the_run() {
  let dir = tempdir().unwrap();

  prem(&dir)
    .arg("--no-interactive")
    .arg(dir.path().join("absent.pdf"))
    .arg(notes(&dir, "present.pdf"))
    .assert()
    .success()
    .stdout(predicate::str::contains("✖"))
    .stdout(predicate::str::contains("no action taken"));
}

#[test]
#[serial]
fn test_invalid_template_is_rejected_up_front() {
  let dir = tempdir().unwrap();
  let path = notes(&dir, "notes.pdf");

  prem(&dir)
    .arg("--no-interactive")
    .arg("--template")
    .arg("{year} - {isbn}")
    .arg(&path)
    .assert()
    .failure()
    .stdout(predicate::str::contains("no action taken").not());
  assert!(path.exists());
}

#[test]
#[serial]
fn test_invalid_pattern_is_rejected_up_front() {
  let dir = tempdir().unwrap();
  std::fs::write(dir.path().join("config.toml"), "[patterns]\ndoi = '10\\.(['\n").unwrap();

  prem(&dir).arg("--no-interactive").arg(notes(&dir, "notes.pdf")).assert().failure();
}
