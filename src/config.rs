use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use configparser::ini::Ini;

use crate::error::Error;

const DEFAULT_SECTION: &str = "DEFAULT";

type Props = HashMap<String, Option<String>>;

#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub user: String,
    pub fingerprint: String,
    pub tenancy: String,
    pub region: String,
    pub key_file: PathBuf,
}

#[derive(Debug)]
pub struct OciConfig {
    pub path: PathBuf,
    sections: HashMap<String, Props>,
}

impl OciConfig {
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let path = path.unwrap_or_else(default_config_path);
        let mut ini = Ini::new_cs();
        ini.set_default_section(DEFAULT_SECTION);
        let map = ini
            .load(path.to_string_lossy().as_ref())
            .map_err(|reason| Error::ConfigUnreadable {
                path: path.clone(),
                reason,
            })?;

        let defaults = map.get(DEFAULT_SECTION).cloned().unwrap_or_default();
        let mut sections = HashMap::new();
        for (name, props) in map {
            // [DEFAULT] keys are inherited by every profile
            let mut merged = props;
            for (key, value) in &defaults {
                merged.entry(key.clone()).or_insert_with(|| value.clone());
            }
            sections.insert(name, merged);
        }
        tracing::debug!(path = %path.display(), sections = sections.len(), "config loaded");
        Ok(Self { path, sections })
    }

    /// Looks the profile up by exact name first, then case-insensitively.
    pub fn profile(&self, name: &str) -> Result<Profile> {
        let found = self.sections.get_key_value(name).or_else(|| {
            self.sections
                .iter()
                .find(|(section, _)| section.eq_ignore_ascii_case(name))
        });
        let Some((section, props)) = found else {
            return Err(Error::ProfileNotFound {
                profile: name.to_string(),
                path: self.path.clone(),
            }
            .into());
        };
        let config_dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Profile::from_props(section, props, &config_dir)
            .with_context(|| format!("Invalid profile '{}' in {}", section, self.path.display()))
    }
}

impl Profile {
    fn from_props(name: &str, props: &Props, config_dir: &Path) -> Result<Self> {
        let key_file_raw = required(props, "key_file")?;
        Ok(Self {
            name: name.to_string(),
            user: required(props, "user")?,
            fingerprint: required(props, "fingerprint")?,
            tenancy: required(props, "tenancy")?,
            region: required(props, "region")?,
            key_file: resolve_path(config_dir, &key_file_raw),
        })
    }

    /// Same credentials, pointed at another region.
    pub fn with_region(&self, region: &str) -> Self {
        Self {
            region: region.to_string(),
            ..self.clone()
        }
    }
}

fn default_config_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".oci").join("config"),
        None => PathBuf::from("config"),
    }
}

fn required(props: &Props, key: &str) -> Result<String> {
    find_value(props, key)
        .map(|value| normalize_value(&value))
        .filter(|value| !value.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing required key: {}", key))
}

fn find_value(props: &Props, key: &str) -> Option<String> {
    if let Some(value) = props.get(key) {
        return value.clone();
    }
    props
        .iter()
        .find(|(prop_key, _)| prop_key.eq_ignore_ascii_case(key))
        .and_then(|(_, value)| value.clone())
}

fn normalize_value(value: &str) -> String {
    let trimmed = value.trim();
    trimmed
        .split(" #")
        .next()
        .unwrap_or(trimmed)
        .split(" ;")
        .next()
        .unwrap_or(trimmed)
        .trim()
        .to_string()
}

fn resolve_path(config_dir: &Path, value: &str) -> PathBuf {
    let path = PathBuf::from(expand_tilde(value));
    if path.is_relative() {
        config_dir.join(path)
    } else {
        path
    }
}

fn expand_tilde(value: &str) -> String {
    if let Some(stripped) = value
        .strip_prefix("~/")
        .or_else(|| value.strip_prefix("~\\"))
    {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped).to_string_lossy().to_string();
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::exit_code_for;
    use std::fs;

    const SAMPLE: &str = r#"
[DEFAULT]
region=eu-frankfurt-1
key_file=oci_api_key.pem

[EMEAOSCf]
tenancy=ocid1.tenancy.oc1..example
user=ocid1.user.oc1..example
fingerprint=19:1d:7b:3a:17:aa
key_file=~/.oci/api_key.pem

[phoenix]
tenancy=ocid1.tenancy.oc1..other
user=ocid1.user.oc1..other
fingerprint=aa:bb:cc
region=us-phoenix-1
"#;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config");
        fs::write(&path, content).expect("write config");
        (dir, path)
    }

    #[test]
    fn profile_inherits_default_section() {
        let (_dir, path) = write_config(SAMPLE);
        let cfg = OciConfig::load(Some(path)).expect("load");
        let profile = cfg.profile("EMEAOSCf").expect("profile");
        assert_eq!(profile.name, "EMEAOSCf");
        assert_eq!(profile.user, "ocid1.user.oc1..example");
        assert_eq!(profile.region, "eu-frankfurt-1");
        assert!(profile.key_file.ends_with("api_key.pem"));
    }

    #[test]
    fn relative_key_file_resolves_against_config_dir() {
        let (dir, path) = write_config(SAMPLE);
        let cfg = OciConfig::load(Some(path)).expect("load");
        let profile = cfg.profile("phoenix").expect("profile");
        assert_eq!(profile.region, "us-phoenix-1");
        assert_eq!(profile.key_file, dir.path().join("oci_api_key.pem"));
    }

    #[test]
    fn profile_lookup_falls_back_to_case_insensitive() {
        let (_dir, path) = write_config(SAMPLE);
        let cfg = OciConfig::load(Some(path)).expect("load");
        let profile = cfg.profile("PHOENIX").expect("profile");
        assert_eq!(profile.name, "phoenix");
    }

    #[test]
    fn missing_profile_exits_with_config_code() {
        let (_dir, path) = write_config(SAMPLE);
        let cfg = OciConfig::load(Some(path)).expect("load");
        let err = cfg.profile("nope").unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
        assert!(err.to_string().contains("'nope'"));
    }

    #[test]
    fn unreadable_config_exits_with_config_code() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = OciConfig::load(Some(dir.path().join("absent"))).unwrap_err();
        assert_eq!(exit_code_for(&err), 2);
    }

    #[test]
    fn with_region_keeps_credentials() {
        let (_dir, path) = write_config(SAMPLE);
        let cfg = OciConfig::load(Some(path)).expect("load");
        let profile = cfg.profile("EMEAOSCf").expect("profile");
        let moved = profile.with_region("us-ashburn-1");
        assert_eq!(moved.region, "us-ashburn-1");
        assert_eq!(moved.fingerprint, profile.fingerprint);
    }

    #[test]
    fn normalize_value_strips_inline_comments() {
        assert_eq!(normalize_value(" eu-frankfurt-1 # home "), "eu-frankfurt-1");
        assert_eq!(normalize_value("19:1d:7b"), "19:1d:7b");
    }
}
