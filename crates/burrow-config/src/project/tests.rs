use super::*;
use camino::Utf8PathBuf;
use tempfile::TempDir;

const ANALYSIS: &str = r#"
[project]
name = "analysis"

[[source]]
name = "internal"
url = "https://cran.internal/"
priority = 1
proxy = false

[[source]]
name = "CRAN"
url = "https://cloud.r-project.org/"
layout = "segregated"

[dependencies]
dplyr = ">= 1.0"
mypkg = { git = "https://git.example.com/mypkg.git", branch = "main" }
ggplot2 = { version = "3.4" }

[dev-dependencies]
testthat = "*"
dplyr = ">= 1.0"

[doc-dependencies]
knitr = "< 2"
"#;

fn temp_path(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap()
}

#[test]
fn test_parse_minimal_project() {
    let project = ProjectFile::parse("[project]\nname = \"demo\"\n").unwrap();
    assert_eq!(project.project.name, "demo");
    assert!(project.sources.is_empty());
    assert!(project.dependencies.is_empty());

    let specs = project.source_specs();
    assert_eq!(specs.len(), 1);
    assert_eq!(specs[0].name, DEFAULT_SOURCE_NAME);
    assert_eq!(specs[0].url, DEFAULT_SOURCE_URL);
}

#[test]
fn test_parse_sources() {
    let project = ProjectFile::parse(ANALYSIS).unwrap();
    let specs = project.source_specs();

    assert_eq!(specs.len(), 2);
    assert_eq!(specs[0].name, "internal");
    assert_eq!(specs[0].priority, 1);
    assert_eq!(specs[0].proxy, ProxySetting::Disabled);
    assert_eq!(specs[0].layout, None);
    assert_eq!(specs[1].priority, 0);
    assert_eq!(specs[1].proxy, ProxySetting::Inherit);
    assert_eq!(specs[1].layout, Some(LayoutKind::Segregated));
}

#[test]
fn test_proxy_url() {
    let content = r#"
[project]
name = "demo"

[[source]]
name = "corp"
url = "https://cran.corp/"
proxy = "http://proxy.corp:3128"
"#;
    let project = ProjectFile::parse(content).unwrap();
    assert_eq!(
        project.source_specs()[0].proxy,
        ProxySetting::Url("http://proxy.corp:3128".to_string())
    );
}

#[test]
fn test_root_request_keeps_declaration_order() {
    let request = ProjectFile::parse(ANALYSIS).unwrap().root_request().unwrap();
    let names: Vec<_> = request.dependencies.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["dplyr", "mypkg", "ggplot2", "testthat", "knitr"]);
}

#[test]
fn test_root_request_merges_categories() {
    let request = ProjectFile::parse(ANALYSIS).unwrap().root_request().unwrap();

    let dplyr = request.dependency("dplyr").unwrap();
    assert_eq!(dplyr.categories, BTreeSet::from([Category::Main, Category::Dev]));

    let knitr = request.dependency("knitr").unwrap();
    assert_eq!(knitr.categories, BTreeSet::from([Category::Doc]));
}

#[test]
fn test_root_request_requirements() {
    let request = ProjectFile::parse(ANALYSIS).unwrap().root_request().unwrap();

    let mypkg = request.dependency("mypkg").unwrap();
    assert_eq!(
        mypkg.requirement,
        Requirement::Vcs {
            url: "https://git.example.com/mypkg.git".to_string(),
            reference: VcsReference::Branch("main".to_string()),
        }
    );

    let ggplot2 = request.dependency("ggplot2").unwrap();
    assert_eq!(
        ggplot2.constraint().unwrap(),
        &Constraint::parse("3.4").unwrap()
    );

    assert!(request.dependency("testthat").unwrap().constraint().unwrap().is_any());
}

#[test]
fn test_git_references() {
    let spec = DependencySpec::Detailed {
        version: None,
        git: Some("https://git.example.com/a.git".to_string()),
        branch: None,
        tag: Some("v1.0".to_string()),
        rev: None,
    };
    assert!(spec.is_git());
    assert!(matches!(
        spec.requirement("dependencies.a").unwrap(),
        Requirement::Vcs { reference: VcsReference::Tag(tag), .. } if tag == "v1.0"
    ));

    let spec = DependencySpec::Detailed {
        version: None,
        git: Some("https://git.example.com/a.git".to_string()),
        branch: None,
        tag: None,
        rev: None,
    };
    assert!(matches!(
        spec.requirement("dependencies.a").unwrap(),
        Requirement::Vcs { reference: VcsReference::DefaultBranch, .. }
    ));
}

#[test]
fn test_conflicting_declarations_rejected() {
    let content = r#"
[project]
name = "demo"

[dependencies]
dplyr = ">= 1.0"

[dev-dependencies]
dplyr = ">= 1.1"
"#;
    let err = ProjectFile::parse(content).unwrap_err();
    match err {
        BurrowError::ConfigValidation { field, reason } => {
            assert_eq!(field, "dev-dependencies.dplyr");
            assert!(reason.contains("dependencies"));
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_invalid_projects() {
    let cases = [
        // Empty project name
        "[project]\nname = \"\"\n",
        // Malformed constraint
        "[project]\nname = \"p\"\n[dependencies]\ndplyr = \">= x\"\n",
        // Both version and git
        "[project]\nname = \"p\"\n[dependencies]\na = { version = \"1.0\", git = \"https://g/a.git\" }\n",
        // Neither version nor git
        "[project]\nname = \"p\"\n[dependencies]\na = { branch = \"main\" }\n",
        // Two references
        "[project]\nname = \"p\"\n[dependencies]\na = { git = \"https://g/a.git\", branch = \"main\", tag = \"v1\" }\n",
        // Invalid package name
        "[project]\nname = \"p\"\n[dependencies]\n\"2fast\" = \"*\"\n",
        // Duplicate source name
        "[project]\nname = \"p\"\n[[source]]\nname = \"a\"\nurl = \"https://a/\"\n[[source]]\nname = \"a\"\nurl = \"https://b/\"\n",
        // Relative URL
        "[project]\nname = \"p\"\n[[source]]\nname = \"a\"\nurl = \"cran.internal\"\n",
    ];

    for content in cases {
        assert!(
            matches!(
                ProjectFile::parse(content),
                Err(BurrowError::ConfigValidation { .. })
            ),
            "expected validation error for:\n{content}"
        );
    }
}

#[test]
fn test_syntax_error() {
    assert!(matches!(
        ProjectFile::parse("[project\nname = "),
        Err(BurrowError::ProjectParse { .. })
    ));
    // Missing [project] section
    assert!(matches!(
        ProjectFile::parse("[dependencies]\ndplyr = \"*\"\n"),
        Err(BurrowError::ProjectParse { .. })
    ));
}

#[test]
fn test_round_trip_serialization() {
    let project = ProjectFile::parse(ANALYSIS).unwrap();
    let serialized = project.to_toml_string().unwrap();
    let reparsed = ProjectFile::parse(&serialized).unwrap();
    assert_eq!(project, reparsed);
}

#[test]
fn test_content_hash_ignores_declaration_order() {
    let a = ProjectFile::parse(
        "[project]\nname = \"p\"\n[dependencies]\ndplyr = \">= 1.0\"\nknitr = \"*\"\n",
    )
    .unwrap();
    let b = ProjectFile::parse(
        "[project]\nname = \"p\"\n[dependencies]\nknitr = \"*\"\ndplyr = \">= 1.0\"\n",
    )
    .unwrap();
    let hash = a.content_hash().unwrap();
    assert_eq!(hash.len(), 64);
    assert_eq!(hash, b.content_hash().unwrap());
}

#[test]
fn test_content_hash_tracks_constraints_and_sources() {
    let base = ProjectFile::parse("[project]\nname = \"p\"\n[dependencies]\ndplyr = \">= 1.0\"\n").unwrap();
    let edited =
        ProjectFile::parse("[project]\nname = \"p\"\n[dependencies]\ndplyr = \">= 1.1\"\n").unwrap();
    let moved = ProjectFile::parse(
        "[project]\nname = \"p\"\n[dev-dependencies]\ndplyr = \">= 1.0\"\n",
    )
    .unwrap();
    let with_source = ProjectFile::parse(
        "[project]\nname = \"p\"\n[[source]]\nname = \"x\"\nurl = \"https://x/\"\n[dependencies]\ndplyr = \">= 1.0\"\n",
    )
    .unwrap();

    let hash = base.content_hash().unwrap();
    assert_ne!(hash, edited.content_hash().unwrap());
    assert_ne!(hash, moved.content_hash().unwrap());
    assert_ne!(hash, with_source.content_hash().unwrap());
}

#[test]
fn test_package_names() {
    assert!(is_valid_package_name("data.table"));
    assert!(is_valid_package_name("R6"));
    assert!(is_valid_package_name("x"));
    assert!(!is_valid_package_name(""));
    assert!(!is_valid_package_name("2fast"));
    assert!(!is_valid_package_name("my-pkg"));
    assert!(!is_valid_package_name("trailing."));
}

#[tokio::test]
async fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir).join(PROJECT_FILE_NAME);
    tokio::fs::write(&path, ANALYSIS).await.unwrap();

    let project = load_from_file(&path).await.unwrap();
    assert_eq!(project.project.name, "analysis");
}

#[tokio::test]
async fn test_load_reports_path() {
    let dir = TempDir::new().unwrap();
    let path = temp_path(&dir).join(PROJECT_FILE_NAME);
    tokio::fs::write(&path, "not toml at all [").await.unwrap();

    match load_from_file(&path).await.unwrap_err() {
        BurrowError::ProjectParse { message } => assert!(message.contains(path.as_str())),
        other => panic!("unexpected error: {other}"),
    }

    let missing = temp_path(&dir).join("missing.toml");
    assert!(matches!(
        load_from_file(&missing).await,
        Err(BurrowError::Io { .. })
    ));
}

#[test]
fn test_find_project_file_walks_up() {
    let dir = TempDir::new().unwrap();
    let root = temp_path(&dir);
    let nested = root.join("analysis").join("scripts");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(root.join("analysis").join(PROJECT_FILE_NAME), ANALYSIS).unwrap();

    assert_eq!(
        find_project_file(&nested),
        Some(root.join("analysis").join(PROJECT_FILE_NAME))
    );
    assert_eq!(find_project_file(&root), None);
}
