use super::*;
use burrow_core::types::{Category, Constraint, RootDependency, RootRequest, SourceSpec, Version};

fn v(text: &str) -> Version {
    Version::parse(text).unwrap()
}

fn sample_request() -> RootRequest {
    RootRequest::new(
        vec![
            SourceSpec::new("cran", "https://cloud.r-project.org"),
            SourceSpec::new("internal", "https://pkgs.example.com").with_priority(5),
        ],
        vec![
            RootDependency::registry("dplyr", Constraint::parse(">= 1.0").unwrap()),
            RootDependency::vcs("mine", "https://git.example.com/mine.git", VcsReference::Tag("v0.3".into()))
                .in_categories([Category::Dev]),
        ],
    )
}

fn sample_lock() -> Lock {
    let packages = vec![
        LockedPackage::from_source("dplyr", v("1.1.4"), "cran", "src/contrib/dplyr_1.1.4.tar.gz")
            .with_dependencies(["R", "cli"])
            .with_categories([Category::Main])
            .with_fingerprint("sha256:00ff")
            .with_runtime(Some(Constraint::parse(">= 3.5.0").unwrap())),
        LockedPackage::from_source("cli", v("3.6.2"), "cran", "src/contrib/cli_3.6.2.tar.gz")
            .with_categories([Category::Main]),
        LockedPackage::core("R", None).with_categories([Category::Main]),
        LockedPackage::from_vcs(
            "mine",
            "https://git.example.com/mine.git",
            VcsReference::Tag("v0.3".into()),
            "9fceb02d0ae598e95dc970b74767f19372d61af8",
        )
        .with_categories([Category::Dev]),
    ];
    Lock::new(&sample_request(), packages, false).with_content_hash("sha256:abcd")
}

#[test]
fn test_lock_round_trip() {
    let lock = sample_lock();
    let text = lock.to_toml_string().unwrap();
    let parsed = Lock::from_toml_str(&text).unwrap();
    assert_eq!(parsed, lock);
}

#[test]
fn test_serialization_is_deterministic() {
    let first = sample_lock().to_toml_string().unwrap();

    let mut packages = sample_lock().packages().to_vec();
    packages.reverse();
    let mut request = sample_request();
    request.dependencies.reverse();
    let second = Lock::new(&request, packages, false)
        .with_content_hash("sha256:abcd")
        .to_toml_string()
        .unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_packages_sorted_and_lookup() {
    let lock = sample_lock();
    let names: Vec<_> = lock.packages().iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["R", "cli", "dplyr", "mine"]);
    assert_eq!(lock.package("cli").unwrap().version, Some(v("3.6.2")));
    assert!(lock.package("ggplot2").is_none());
    assert!(lock.package("R").unwrap().is_core());
    assert_eq!(lock.package("dplyr").unwrap().source(), Some("cran"));
}

#[test]
fn test_rendered_shape() {
    let text = sample_lock().to_toml_string().unwrap();
    assert!(text.contains("[metadata]"));
    assert!(text.contains("version = 2"));
    assert!(text.contains("[[source]]"));
    assert!(text.contains("[[package]]"));
    assert!(text.contains("origin = \"core\""));
    assert!(text.contains("tag = \"v0.3\""));
    assert!(text.contains("runtime = \">= 3.5.0\""));
}

#[test]
fn test_unsupported_version() {
    let text = "[metadata]\nversion = 1\n";
    match Lock::from_toml_str(text) {
        Err(LockError::UnsupportedVersion { found, expected }) => {
            assert_eq!(found, 1);
            assert_eq!(expected, LOCK_FORMAT_VERSION);
        },
        other => panic!("expected unsupported version, got {other:?}"),
    }
}

#[test]
fn test_malformed_inputs() {
    let cases = [
        "not toml at all [",
        "[metadata]\nversion = 2\n[[package]]\nname = \"a\"\norigin = \"elsewhere\"\n",
        "[metadata]\nversion = 2\n[[package]]\nname = \"a\"\norigin = \"source\"\nversion = \"1.0\"\n",
        "[metadata]\nversion = 2\n[[package]]\nname = \"a\"\norigin = \"source\"\nsource = \"cran\"\npath = \"p\"\n",
        "[metadata]\nversion = 2\n[[root]]\nname = \"a\"\n",
        "[metadata]\nversion = 2\n[[root]]\nname = \"a\"\ngit = \"u\"\nbranch = \"x\"\ntag = \"y\"\n",
        "[metadata]\nversion = 2\n[[package]]\nname = \"a\"\norigin = \"core\"\n[[package]]\nname = \"a\"\norigin = \"core\"\n",
        "[metadata]\nversion = 2\n[[package]]\nname = \"a\"\norigin = \"source\"\nsource = \"cran\"\npath = \"p\"\nversion = \"x.y\"\n",
    ];
    for case in cases {
        assert!(
            matches!(Lock::from_toml_str(case), Err(LockError::Malformed { .. })),
            "accepted: {case}"
        );
    }
}

#[test]
fn test_default_branch_reference_round_trip() {
    let request = RootRequest::new(
        vec![SourceSpec::new("cran", "https://cloud.r-project.org")],
        vec![RootDependency::vcs("mine", "https://git.example.com/mine.git", VcsReference::DefaultBranch)],
    );
    let lock = Lock::new(
        &request,
        vec![LockedPackage::from_vcs(
            "mine",
            "https://git.example.com/mine.git",
            VcsReference::DefaultBranch,
            "abc123",
        )],
        true,
    );
    let text = lock.to_toml_string().unwrap();
    assert!(!text.contains("branch"));
    let parsed = Lock::from_toml_str(&text).unwrap();
    assert_eq!(parsed, lock);
    assert!(parsed.metadata.conservative);
}

#[test]
fn test_repository_package_pinned_by_commit() {
    let text = r#"
[metadata]
version = 2

[[package]]
name = "mine"
origin = "vcs"
git = "https://git.example.com/mine.git"
tag = "v0.3"
commit = "9fceb02"
"#;
    let lock = Lock::from_toml_str(text).unwrap();
    let mine = lock.package("mine").unwrap();
    assert_eq!(mine.version, None);
    assert_eq!(
        mine.origin,
        PackageOrigin::Vcs {
            url: "https://git.example.com/mine.git".to_string(),
            reference: VcsReference::Tag("v0.3".into()),
            commit: "9fceb02".to_string(),
        }
    );

    let rendered = lock.to_toml_string().unwrap();
    assert_eq!(Lock::from_toml_str(&rendered).unwrap(), lock);

    let sample = sample_lock().to_toml_string().unwrap();
    let mine_entry = sample.split("[[package]]").find(|entry| entry.contains("name = \"mine\"")).unwrap();
    assert!(!mine_entry.contains("version"), "{mine_entry}");
}
