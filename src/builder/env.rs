//! Scoped environment overrides for external build steps.
//!
//! A `BuildEnv` is an overlay applied to each child process of a build
//! strategy. The parent process environment is never touched, so nothing
//! has to be restored when a step fails or the invocation ends.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::util::process::ProcessBuilder;

/// Variables set or removed for the external tool invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildEnv {
    vars: BTreeMap<String, String>,
    removed: Vec<String>,
}

impl BuildEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.removed.retain(|k| *k != key);
        self.vars.insert(key, value.into());
    }

    /// Append to a space-separated flag variable.
    pub fn append(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            return;
        }
        match self.vars.get_mut(key) {
            Some(existing) if !existing.is_empty() => {
                existing.push(' ');
                existing.push_str(value);
            }
            _ => self.set(key, value),
        }
    }

    /// Remove a variable from the child environment.
    pub fn remove(&mut self, key: &str) {
        self.vars.remove(key);
        if !self.removed.iter().any(|k| k == key) {
            self.removed.push(key.to_string());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn removed(&self) -> &[String] {
        &self.removed
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.removed.is_empty()
    }

    /// Apply the overlay to a child process.
    pub fn apply(&self, mut cmd: ProcessBuilder) -> ProcessBuilder {
        for (key, value) in &self.vars {
            cmd = cmd.env(key, value);
        }
        for key in &self.removed {
            cmd = cmd.env_remove(key);
        }
        cmd
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_space_separates() {
        let mut env = BuildEnv::new();
        env.append("CPPFLAGS", "-I/deps/zlib/include");
        env.append("CPPFLAGS", "-DCURL_STATICLIB=1");
        env.append("CPPFLAGS", "");
        assert_eq!(
            env.get("CPPFLAGS"),
            Some("-I/deps/zlib/include -DCURL_STATICLIB=1")
        );
    }

    #[test]
    fn test_remove_then_set() {
        let mut env = BuildEnv::new();
        env.set("LIBS", "-lz");
        env.remove("LIBS");
        assert_eq!(env.get("LIBS"), None);
        assert_eq!(env.removed(), ["LIBS"]);

        env.set("LIBS", "-lzlib");
        assert!(env.removed().is_empty());
    }

    #[test]
    fn test_apply_to_process() {
        let mut env = BuildEnv::new();
        env.set("RCFLAGS", "-O COFF");
        env.remove("LIBS");

        let cmd = env.apply(ProcessBuilder::new("make"));
        assert_eq!(cmd.get_env().get("RCFLAGS").map(String::as_str), Some("-O COFF"));
        assert_eq!(cmd.get_env_remove(), ["LIBS"]);
    }
}
