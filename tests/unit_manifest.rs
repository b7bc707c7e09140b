// Tests for the analyzer's requirements manifest.
//
// Runs against the checked-in fixture: every entry parses, the tiers come
// out of the section comments, the networkx range keeps 3.x out, the model
// wheel URL is a well-formed artifact, and resolution is repeatable.

use std::path::PathBuf;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use topical::manifest::resolve::{check_artifact_url, verify_direct_urls};
use topical::manifest::version::Version;
use topical::manifest::{Manifest, PackageIndex, Tier};

const INDEX: &str = "\
# pip freeze from the analyzer image
textacy==0.12.0
textacy==0.13.0
networkx==2.8.8
networkx==3.0
networkx==3.1
langdetect==1.0.9
trafilatura==1.6.3
lxml==5.2.1
spacy==3.7.4
sentence-transformers==2.7.0
";

fn fixture() -> Manifest {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/analyzer.txt");
    Manifest::load(&path).unwrap()
}

fn names(requirements: &[&topical::manifest::Requirement]) -> Vec<String> {
    requirements.iter().map(|r| r.name.clone()).collect()
}

fn v(s: &str) -> Version {
    s.parse().unwrap()
}

// ============================================================
// Parsing
// ============================================================

#[test]
fn every_entry_parses() {
    let manifest = fixture();
    assert_eq!(manifest.requirements().len(), 8);
    assert_eq!(manifest.directives(), vec!["-r base.txt"]);
}

#[test]
fn sections_split_into_two_tiers() {
    let manifest = fixture();
    let tiers: Vec<Tier> = manifest.sections.iter().map(|s| s.tier).collect();
    assert_eq!(tiers, vec![Tier::Base, Tier::Base, Tier::MachineLearning]);

    assert_eq!(
        names(&manifest.tier(Tier::Base)),
        vec!["textacy", "networkx", "langdetect", "trafilatura", "lxml"]
    );
    assert_eq!(
        names(&manifest.tier(Tier::MachineLearning)),
        vec!["spacy", "sentence-transformers", "en_core_web_md"]
    );
}

#[test]
fn extras_and_notes_are_kept() {
    let manifest = fixture();

    let lxml = manifest.get("LXML").unwrap();
    assert_eq!(lxml.extras, vec!["html_clean"]);
    assert_eq!(lxml.note.as_deref(), Some("html cleaner split out in lxml 5.2"));
    assert_eq!(lxml.to_string(), "lxml[html_clean]==5.2.1");

    let networkx = manifest.get("networkx").unwrap();
    assert!(networkx.note.as_deref().unwrap().contains("incompatible"));
}

// ============================================================
// The networkx range
// ============================================================

#[test]
fn networkx_range_excludes_the_breaking_major() {
    let manifest = fixture();
    let spec = &manifest.get("networkx").unwrap().spec;

    assert!(spec.excludes_major_and_above(3));
    assert!(spec.excludes_major_and_above(4));
    assert!(!spec.excludes_major_and_above(2));

    assert!(spec.contains(&v("2.8.8")));
    assert!(spec.contains(&v("2.0")));
    for rejected in ["3.0", "3.0rc1", "3.0.dev0", "3.1", "3.0.post1", "10.0"] {
        assert!(!spec.contains(&v(rejected)), "{rejected} should be excluded");
    }
}

#[test]
fn exact_pins_do_not_claim_an_upper_bound_they_lack() {
    let manifest = fixture();
    let spec = &manifest.get("textacy").unwrap().spec;
    assert_eq!(spec.pinned(), Some(&v("0.13.0")));
    assert!(spec.excludes_major_and_above(1));
    assert!(!spec.excludes_major_and_above(0));
}

// ============================================================
// The model wheel
// ============================================================

#[test]
fn model_wheel_is_a_wellformed_artifact_url() {
    let manifest = fixture();
    let direct = manifest.direct_urls();
    assert_eq!(direct.len(), 1);

    let model = direct[0];
    assert_eq!(model.name, "en_core_web_md");
    assert_eq!(model.url_version, Some(v("3.7.1")));
    assert!(model.note.as_deref().unwrap().contains("30MB"));

    let url = model.direct_url().unwrap();
    assert!(url.starts_with("https://"));
    assert!(check_artifact_url(url).is_ok());
}

#[tokio::test]
async fn direct_urls_are_checked_with_head_requests() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let n = socket.read(&mut buf).await.unwrap();
        let request = String::from_utf8_lossy(&buf[..n]).to_string();
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
        request
    });

    let manifest = Manifest::parse(&format!(
        "# Models\nhttp://127.0.0.1:{port}/models/tiny_model-1.0-py3-none-any.whl\n"
    ))
    .unwrap();
    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let checks = verify_direct_urls(&manifest, &client, 2).await.unwrap();
    assert_eq!(checks.len(), 1);
    assert_eq!(checks[0].name, "tiny_model");
    assert_eq!(checks[0].status, Some(200));
    assert!(checks[0].is_fetchable());

    let request = server.await.unwrap();
    assert!(request.starts_with("HEAD /models/tiny_model-1.0-py3-none-any.whl"));
}

#[tokio::test]
async fn unreachable_direct_url_is_not_fetchable() {
    let manifest =
        Manifest::parse("http://127.0.0.1:9/models/tiny_model-1.0-py3-none-any.whl\n").unwrap();
    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let checks = verify_direct_urls(&manifest, &client, 1).await.unwrap();
    assert_eq!(checks[0].status, None);
    assert!(!checks[0].is_fetchable());
}

// ============================================================
// Resolution
// ============================================================

#[test]
fn resolution_is_repeatable() {
    let manifest = fixture();
    let index = PackageIndex::parse(INDEX).unwrap();

    let first = manifest.resolve(&index).unwrap();
    let second = manifest.resolve(&index).unwrap();
    assert_eq!(first, second);

    // Re-reading the manifest from disk changes nothing either
    assert_eq!(fixture().resolve(&index).unwrap(), first);
}

#[test]
fn resolution_pins_every_package() {
    let manifest = fixture();
    let index = PackageIndex::parse(INDEX).unwrap();
    let resolution = manifest.resolve(&index).unwrap();

    assert_eq!(
        resolution.to_lines(),
        vec![
            "en_core_web_md @ https://github.com/explosion/spacy-models/releases/download/en_core_web_md-3.7.1/en_core_web_md-3.7.1-py3-none-any.whl",
            "langdetect==1.0.9",
            "lxml[html_clean]==5.2.1",
            "networkx==2.8.8",
            "sentence-transformers==2.7.0",
            "spacy==3.7.4",
            "textacy==0.13.0",
            "trafilatura==1.6.3",
        ]
    );
}

#[test]
fn resolution_fails_when_a_pin_is_missing() {
    let manifest = fixture();
    let index = PackageIndex::parse(&INDEX.replace("spacy==3.7.4\n", "spacy==3.7.5\n")).unwrap();
    let err = manifest.resolve(&index).unwrap_err();
    assert!(err.to_string().contains("spacy==3.7.4"));
}

#[test]
fn resolution_fails_when_only_incompatible_versions_exist() {
    let manifest = fixture();
    let index = PackageIndex::parse(&INDEX.replace("networkx==2.8.8\n", "")).unwrap();
    let err = manifest.resolve(&index).unwrap_err();
    assert!(err.to_string().contains("networkx"));
}

// ============================================================
// Malformed manifests
// ============================================================

#[test]
fn malformed_lines_name_their_line_number() {
    let err = Manifest::parse("textacy==0.13.0\n\nnetworkx<<3.0\n").unwrap_err();
    assert!(format!("{err:#}").contains("line 3"));

    let err = Manifest::parse("# Models\nhttps://example.com/download\n").unwrap_err();
    assert!(format!("{err:#}").contains("line 2"));
}
