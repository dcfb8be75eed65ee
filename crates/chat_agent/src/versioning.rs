use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{Commit, IndexAddOption, Repository, Signature};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum VersioningError {
    #[error("git {operation} failed: {source}")]
    Git {
        operation: &'static str,
        #[source]
        source: git2::Error,
    },
}

impl VersioningError {
    fn git(operation: &'static str, source: git2::Error) -> Self {
        Self::Git { operation, source }
    }
}

/// Contract for committing working-tree state.
///
/// `create_new_version` must either fully succeed (working tree staged and
/// committed) or return an error; a half-staged state is never observable
/// to the dispatcher.
pub trait VersionRecorder {
    fn create_new_version(
        &mut self,
        message: &str,
        branch: Option<&str>,
    ) -> Result<String, VersioningError>;

    fn create_branch(
        &mut self,
        name: &str,
        start_point: Option<&str>,
    ) -> Result<(), VersioningError>;
}

/// git2-backed recorder. Initializes a repository (with an initial commit)
/// when the working directory is not already inside one.
pub struct GitVersionControl {
    repo: Repository,
}

impl GitVersionControl {
    pub fn open_or_init(root: &Path) -> Result<Self, VersioningError> {
        match Repository::discover(root) {
            Ok(repo) => Ok(Self { repo }),
            Err(_) => {
                let repo = Repository::init(root)
                    .map_err(|source| VersioningError::git("init", source))?;
                info!(path = %root.display(), "initialized a new git repository");
                let mut recorder = Self { repo };
                recorder.commit_all("Initial commit")?;
                Ok(recorder)
            }
        }
    }

    pub fn current_branch(&self) -> Result<String, VersioningError> {
        let head = self
            .repo
            .head()
            .map_err(|source| VersioningError::git("head", source))?;
        Ok(head.shorthand().unwrap_or("HEAD").to_string())
    }

    fn signature(&self) -> Result<Signature<'static>, VersioningError> {
        self.repo
            .signature()
            .or_else(|_| Signature::now("tandem", "tandem@localhost"))
            .map_err(|source| VersioningError::git("signature", source))
    }

    fn checkout_branch(&self, name: &str) -> Result<(), VersioningError> {
        let refname = format!("refs/heads/{name}");
        self.repo
            .set_head(&refname)
            .map_err(|source| VersioningError::git("set_head", source))?;
        self.repo
            .checkout_head(Some(CheckoutBuilder::new().safe()))
            .map_err(|source| VersioningError::git("checkout", source))
    }

    fn commit_all(&mut self, message: &str) -> Result<String, VersioningError> {
        let mut index = self
            .repo
            .index()
            .map_err(|source| VersioningError::git("index", source))?;
        index
            .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
            .map_err(|source| VersioningError::git("stage additions", source))?;
        index
            .update_all(["*"].iter(), None)
            .map_err(|source| VersioningError::git("stage removals", source))?;
        index
            .write()
            .map_err(|source| VersioningError::git("write index", source))?;

        let tree_id = index
            .write_tree()
            .map_err(|source| VersioningError::git("write tree", source))?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(|source| VersioningError::git("find tree", source))?;

        let signature = self.signature()?;
        let parent = self
            .repo
            .head()
            .ok()
            .and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(|source| VersioningError::git("commit", source))?;

        Ok(oid.to_string())
    }
}

impl VersionRecorder for GitVersionControl {
    fn create_new_version(
        &mut self,
        message: &str,
        branch: Option<&str>,
    ) -> Result<String, VersioningError> {
        if let Some(branch) = branch {
            if self.current_branch()? != branch {
                self.checkout_branch(branch)?;
            }
        }

        self.commit_all(message)
    }

    fn create_branch(
        &mut self,
        name: &str,
        start_point: Option<&str>,
    ) -> Result<(), VersioningError> {
        let target = match start_point {
            Some(spec) => self
                .repo
                .revparse_single(spec)
                .map_err(|source| VersioningError::git("revparse", source))?
                .peel_to_commit()
                .map_err(|source| VersioningError::git("peel start point", source))?,
            None => self
                .repo
                .head()
                .map_err(|source| VersioningError::git("head", source))?
                .peel_to_commit()
                .map_err(|source| VersioningError::git("peel head", source))?,
        };

        self.repo
            .branch(name, &target, false)
            .map_err(|source| VersioningError::git("branch", source))?;
        self.checkout_branch(name)
    }
}
