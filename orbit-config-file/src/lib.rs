use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum ConfigFileError {
    IO(Box<std::io::Error>),
    Parse(Box<toml::de::Error>),
    Serialize(Box<toml::ser::Error>),
}

impl std::fmt::Display for ConfigFileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigFileError::IO(e) => write!(f, "cannot access config file: {e}"),
            ConfigFileError::Parse(e) => write!(f, "invalid config file: {e}"),
            ConfigFileError::Serialize(e) => write!(f, "cannot encode config file: {e}"),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8512
}

fn default_admin_role() -> String {
    "admin".to_string()
}

fn default_true() -> bool {
    true
}

fn default_timeout_secs() -> u64 {
    10
}

/// `orbit.toml`, read by `orbit-server`.
#[derive(Debug, Clone, Deserialize)]
pub struct OrbitServerConfigToml {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins of the web front end allowed to call the API with credentials.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// Workspace picked when the session does not name one.
    pub default_org_code: Option<String>,
    /// Role granted to the creator of a new workspace.
    #[serde(default = "default_admin_role")]
    pub admin_role: String,
    #[serde(default = "default_true")]
    pub secure_cookies: bool,
    pub identity: IdentityConfigToml,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentityConfigToml {
    Kinde(KindeConfigToml),
    Memory(MemoryIdentityConfigToml),
}

#[derive(Debug, Clone, Deserialize)]
pub struct KindeConfigToml {
    /// e.g. `https://acme.kinde.com`
    pub issuer_url: String,
    pub client_id: String,
    /// Inline secret. Prefer `client_secret_env`.
    pub client_secret: Option<String>,
    /// Name of the environment variable holding the client secret.
    pub client_secret_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl KindeConfigToml {
    /// Resolves the client secret, preferring the inline value.
    pub fn client_secret(&self) -> Option<String> {
        if let Some(secret) = &self.client_secret {
            return Some(secret.clone());
        }
        let var = self.client_secret_env.as_ref()?;
        std::env::var(var).ok()
    }
}

/// Seed data for the in-memory identity provider used in local development.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemoryIdentityConfigToml {
    #[serde(default)]
    pub users: Vec<MemoryUserToml>,
    #[serde(default)]
    pub organizations: Vec<MemoryOrganizationToml>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryUserToml {
    pub id: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub email: Option<String>,
    /// Fixed access token accepted for this user.
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemoryOrganizationToml {
    pub code: String,
    pub name: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
}

/// Session file used by the `orbit` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrbitClientConfigToml {
    pub server_url: String,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub org_code: Option<String>,
}

pub fn load_server_config<P: AsRef<Path>>(
    path: P,
) -> Result<OrbitServerConfigToml, ConfigFileError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigFileError::IO(Box::new(e)))?;
    toml::from_str(&text).map_err(|e| ConfigFileError::Parse(Box::new(e)))
}

pub fn load_client_config<P: AsRef<Path>>(
    path: P,
) -> Result<OrbitClientConfigToml, ConfigFileError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigFileError::IO(Box::new(e)))?;
    toml::from_str(&text).map_err(|e| ConfigFileError::Parse(Box::new(e)))
}

pub fn save_client_config<P: AsRef<Path>>(
    path: P,
    config: &OrbitClientConfigToml,
) -> Result<(), ConfigFileError> {
    let text = toml::to_string(config).map_err(|e| ConfigFileError::Serialize(Box::new(e)))?;
    std::fs::write(path, text).map_err(|e| ConfigFileError::IO(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_kinde_server_config() {
        let toml = r#"
port = 9000
allowed_origins = ["http://localhost:8080"]

[identity]
kind = "kinde"
issuer_url = "https://acme.kinde.com"
client_id = "abc"
client_secret_env = "ORBIT_TEST_UNSET_SECRET"
"#;
        let config: OrbitServerConfigToml = toml::from_str(toml).unwrap();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.admin_role, "admin");
        assert!(config.secure_cookies);
        assert_eq!(config.default_org_code, None);
        let IdentityConfigToml::Kinde(kinde) = config.identity else {
            panic!("expected kinde identity config");
        };
        assert_eq!(kinde.issuer_url, "https://acme.kinde.com");
        assert_eq!(kinde.timeout_secs, 10);
        assert_eq!(kinde.client_secret(), None);
    }

    #[test]
    fn test_deserialize_memory_server_config() {
        let toml = r#"
secure_cookies = false
default_org_code = "org_default"

[identity]
kind = "memory"

[[identity.users]]
id = "kp_ada"
given_name = "Ada"
access_token = "dev-token"

[[identity.organizations]]
code = "org_default"
name = "Personal"
members = ["kp_ada"]
"#;
        let config: OrbitServerConfigToml = toml::from_str(toml).unwrap();
        assert_eq!(config.port, 8512);
        assert!(!config.secure_cookies);
        let IdentityConfigToml::Memory(memory) = config.identity else {
            panic!("expected memory identity config");
        };
        assert_eq!(memory.users.len(), 1);
        assert_eq!(memory.users[0].access_token, "dev-token");
        assert_eq!(memory.organizations[0].members, vec!["kp_ada"]);
    }

    #[test]
    fn test_inline_secret_wins() {
        let kinde = KindeConfigToml {
            issuer_url: "https://acme.kinde.com".to_string(),
            client_id: "abc".to_string(),
            client_secret: Some("inline".to_string()),
            client_secret_env: Some("PATH".to_string()),
            timeout_secs: 10,
        };
        assert_eq!(kinde.client_secret().as_deref(), Some("inline"));
    }

    #[test]
    fn test_client_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orbit-client.toml");
        let config = OrbitClientConfigToml {
            server_url: "http://localhost:8512".to_string(),
            access_token: Some("a".to_string()),
            refresh_token: None,
            org_code: Some("org_1".to_string()),
        };
        save_client_config(&path, &config).unwrap();
        assert_eq!(load_client_config(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let res = load_server_config(dir.path().join("missing.toml"));
        assert!(matches!(res, Err(ConfigFileError::IO(_))));
    }
}
