use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-record access control. Subjects are `"*"` (public), an object id, or
/// `"role:<name>"`. The client carries this opaquely; enforcement is entirely
/// server-side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Acl(BTreeMap<String, AclEntry>);

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AclEntry {
    #[serde(default, skip_serializing_if = "is_false")]
    pub read: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub write: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Acl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_public_read(&mut self, allowed: bool) {
        self.entry("*").read = allowed;
    }

    pub fn set_public_write(&mut self, allowed: bool) {
        self.entry("*").write = allowed;
    }

    pub fn set_read_access(&mut self, subject: &str, allowed: bool) {
        self.entry(subject).read = allowed;
    }

    pub fn set_write_access(&mut self, subject: &str, allowed: bool) {
        self.entry(subject).write = allowed;
    }

    pub fn set_role_read_access(&mut self, role: &str, allowed: bool) {
        self.entry(&format!("role:{}", role)).read = allowed;
    }

    pub fn set_role_write_access(&mut self, role: &str, allowed: bool) {
        self.entry(&format!("role:{}", role)).write = allowed;
    }

    pub fn get_read_access(&self, subject: &str) -> bool {
        self.0.get(subject).map(|e| e.read).unwrap_or(false)
    }

    pub fn get_write_access(&self, subject: &str) -> bool {
        self.0.get(subject).map(|e| e.write).unwrap_or(false)
    }

    fn entry(&mut self, subject: &str) -> &mut AclEntry {
        self.0.entry(subject.to_string()).or_default()
    }
}
