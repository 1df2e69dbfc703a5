//! CI identity: who publishes, on which channel, and where to.
//!
//! On AppVeyor or Travis the identity comes from the repository slug
//! (`user/repo`) and branch (`channel/version`). Elsewhere it falls back to
//! `CONAN_USERNAME` / `CONAN_CHANNEL` and the recipe version.

use glob::Pattern;

use crate::core::recipe::Recipe;

pub const DEFAULT_USERNAME: &str = "bincrafters";
pub const DEFAULT_CHANNEL: &str = "testing";

/// Branches whose builds may be uploaded.
pub const STABLE_BRANCH_PATTERN: &str = "stable/*";

const BINCRAFTERS_REMOTE: &str = "https://api.bintray.com/conan/bincrafters/public-conan";

/// Publishing identity of a matrix run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiIdentity {
    pub username: String,
    pub channel: String,
    pub version: String,
    /// Branch being built, when running on CI
    pub branch: Option<String>,
    /// Package remotes in priority order
    pub remotes: Vec<String>,
}

impl CiIdentity {
    /// Resolve the identity from the process environment.
    pub fn from_env(recipe: &Recipe) -> Self {
        Self::resolve(recipe, |key| std::env::var(key).ok())
    }

    /// Resolve the identity through an environment lookup.
    pub fn resolve(recipe: &Recipe, env: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| env(key).filter(|v| !v.is_empty());

        let username = var("CONAN_USERNAME").unwrap_or_else(|| DEFAULT_USERNAME.to_string());
        let channel = var("CONAN_CHANNEL").unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
        let mut identity = CiIdentity {
            username,
            channel,
            version: recipe.version.to_string(),
            branch: None,
            remotes: Vec::new(),
        };
        let conan_remotes = var("CONAN_REMOTES");

        let ci = var("APPVEYOR_REPO_NAME")
            .map(|name| (name, var("APPVEYOR_REPO_BRANCH")))
            .or_else(|| var("TRAVIS_REPO_SLUG").map(|slug| (slug, var("TRAVIS_BRANCH"))));
        let Some((repo, branch)) = ci else {
            identity.remotes = remotes(&identity.username, conan_remotes.as_deref());
            return identity;
        };

        if let Some((user, _)) = repo.split_once('/') {
            identity.username = user.to_string();
        }
        if let Some(branch) = branch {
            match branch.split_once('/') {
                Some((channel, version)) => {
                    identity.channel = channel.to_string();
                    identity.version = version.to_string();
                }
                None => tracing::debug!(
                    "branch `{}` is not channel/version, keeping {}/{}",
                    branch,
                    identity.channel,
                    identity.version
                ),
            }
            identity.branch = Some(branch);
        }
        identity.remotes = remotes(&identity.username, conan_remotes.as_deref());
        identity
    }

    /// `name/version@user/channel`
    pub fn reference(&self, name: &str) -> String {
        format!("{}/{}@{}/{}", name, self.version, self.username, self.channel)
    }

    /// Remote that packages are uploaded to: the highest-priority remote,
    /// so a `CONAN_REMOTES` entry overrides the user's remote.
    pub fn upload_remote(&self) -> String {
        self.remotes
            .first()
            .cloned()
            .unwrap_or_else(|| user_remote(&self.username))
    }

    /// Uploads only happen for builds of a stable branch.
    pub fn should_upload(&self) -> bool {
        self.branch.as_deref().is_some_and(is_stable_branch)
    }
}

fn user_remote(username: &str) -> String {
    format!("https://api.bintray.com/conan/{}/public-conan", username)
}

pub fn is_stable_branch(branch: &str) -> bool {
    Pattern::new(STABLE_BRANCH_PATTERN)
        .map(|p| p.matches(branch))
        .unwrap_or(false)
}

/// Remotes in priority order: `CONAN_REMOTES` entries first, then the
/// user's remote, then the bincrafters remote.
pub fn remotes(username: &str, conan_remotes: Option<&str>) -> Vec<String> {
    let mut remotes = conan_remotes.map(split_remotes).unwrap_or_default();
    remotes.push(user_remote(username));
    remotes.push(BINCRAFTERS_REMOTE.to_string());
    remotes
}

/// Split a list on `,` or `:`, rejoining URL schemes (`https` + `//host`).
pub fn split_remotes(value: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for segment in value.split([',', ':']) {
        let segment = segment.trim();
        if segment.starts_with("//") {
            if let Some(last) = out.last_mut() {
                last.push(':');
                last.push_str(segment);
                continue;
            }
        }
        if !segment.is_empty() {
            out.push(segment.to_string());
        }
    }
    out
}
