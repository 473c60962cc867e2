use std::{collections::BTreeMap, env};

use anyhow::{Context, Result};

/// Somewhere to look up named secrets. Production reads the process environment;
/// tests hand in a map.
pub trait SecretSource {
    fn secret(&self, name: &str) -> Option<String>;

    fn require(&self, name: &str) -> Result<String> {
        self.secret(name).with_context(|| {
            format!("Please define the environment variable {name} to contain the secret")
        })
    }
}

pub struct Environment;

impl SecretSource for Environment {
    fn secret(&self, name: &str) -> Option<String> {
        env::var(name).ok().filter(|value| !value.is_empty())
    }
}

impl SecretSource for BTreeMap<String, String> {
    fn secret(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}
