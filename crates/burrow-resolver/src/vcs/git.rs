use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

use burrow_cache::DESCRIPTOR_FILE;
use burrow_core::descriptor::Descriptor;
use burrow_core::types::VcsReference;

use super::{Checkout, VcsError, VcsProvider};

/// Checks out repositories with the `git` command line
#[derive(Debug, Clone)]
pub struct GitCommand {
    program: String,
    /// Parent of the scratch checkouts; the system temp dir when unset
    work_dir: Option<Utf8PathBuf>,
}

impl Default for GitCommand {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
            work_dir: None,
        }
    }
}

impl GitCommand {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place scratch checkouts under `dir`
    pub fn in_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Use another executable than `git`
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn run(&self, url: &str, dir: &Utf8Path, args: &[&str]) -> Result<String, VcsError> {
        debug!("{} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .args(args)
            .current_dir(dir)
            .output()
            .await
            .map_err(|e| VcsError::Io {
                message: format!("Failed to run {}", self.program),
                source: e,
            })?;

        if !output.status.success() {
            return Err(VcsError::Command {
                url: url.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn fetch(&self, url: &str, reference: &VcsReference, dir: &Utf8Path) -> Result<(), VcsError> {
        match reference {
            VcsReference::DefaultBranch => {
                self.run(url, dir, &["clone", "--depth", "1", url, "."]).await?;
            },
            VcsReference::Branch(name) | VcsReference::Tag(name) => {
                self.run(url, dir, &["clone", "--depth", "1", "--branch", name, url, "."])
                    .await?;
            },
            // Branch-less clones cannot name a commit, so fetch it directly
            VcsReference::Rev(rev) => {
                self.run(url, dir, &["init", "--quiet"]).await?;
                self.run(url, dir, &["fetch", "--depth", "1", url, rev]).await?;
                self.run(url, dir, &["checkout", "--quiet", "FETCH_HEAD"]).await?;
            },
        }
        Ok(())
    }
}

#[async_trait]
impl VcsProvider for GitCommand {
    async fn checkout(&self, url: &str, reference: &VcsReference) -> Result<Checkout, VcsError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("burrow-vcs-");
        let scratch = match &self.work_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
        .map_err(|e| VcsError::Io {
            message: "Failed to create checkout directory".to_string(),
            source: e,
        })?;
        let dir = Utf8Path::from_path(scratch.path()).ok_or_else(|| VcsError::Command {
            url: url.to_string(),
            message: "checkout directory is not valid UTF-8".to_string(),
        })?;

        info!("Checking out {} ({})", url, reference);
        self.fetch(url, reference, dir).await?;
        let commit = self.run(url, dir, &["rev-parse", "HEAD"]).await?;

        let descriptor_path = dir.join(DESCRIPTOR_FILE);
        let text = match tokio::fs::read_to_string(&descriptor_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VcsError::MissingDescriptor {
                    url: url.to_string(),
                })
            },
            Err(e) => {
                return Err(VcsError::Io {
                    message: format!("Failed to read {descriptor_path}"),
                    source: e,
                })
            },
        };
        let descriptor = Descriptor::parse(&text).map_err(|error| VcsError::Descriptor {
            url: url.to_string(),
            error,
        })?;

        debug!("{} is at {}", url, commit);
        Ok(Checkout { commit, descriptor })
    }
}
