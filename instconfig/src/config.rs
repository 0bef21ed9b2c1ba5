use std::fmt;

use serde::{Deserialize, Serialize};

use crate::timezone::{SystemZones, ZoneLookup};
use crate::types::{self, BridgeMode, ClosedSet, RaidLevel};
use crate::validate::{
    validate_bridge_mode, validate_cidr, validate_email, validate_hostname, validate_password,
    validate_raid_level, validate_ssh_key, validate_timezone, ErrorKind, Field, FieldError,
    ValidationError,
};

pub const DEFAULT_HOSTNAME: &str = "pve";
pub const DEFAULT_DOMAIN_SUFFIX: &str = "local";
pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_EMAIL: &str = "admin@example.com";
pub const DEFAULT_PRIVATE_SUBNET: &str = "10.10.10.0/24";

const REDACTED: &str = "<redacted>";

/// The effective installer configuration.
///
/// Built from [`Config::default`], then overlaid by a file and the process
/// environment. Credentials and `verbose` are never written to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub system: SystemIdentity,
    pub network: NetworkSettings,
    pub storage: StorageSettings,
    pub tailscale: TailscaleSettings,

    /// Set by the command line for the logger only.
    #[serde(skip)]
    pub verbose: bool,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemIdentity {
    pub hostname: String,
    pub domain_suffix: String,
    pub timezone: String,
    pub email: String,
    #[serde(skip)]
    pub root_password: String,
    #[serde(skip)]
    pub ssh_public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Empty means the uplink is detected during installation.
    pub interface_name: String,
    #[serde(with = "types::optional")]
    pub bridge_mode: Option<BridgeMode>,
    pub private_subnet: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    #[serde(rename = "zfs_raid", with = "types::optional")]
    pub raid_level: Option<RaidLevel>,
    /// Device paths in the order they are handed to the pool layout.
    pub disks: Vec<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TailscaleSettings {
    pub enabled: bool,
    #[serde(skip)]
    pub auth_key: String,
    pub advertise_ssh: bool,
    pub expose_webui: bool,
}

impl Default for SystemIdentity {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            domain_suffix: DEFAULT_DOMAIN_SUFFIX.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            email: DEFAULT_EMAIL.to_string(),
            root_password: String::new(),
            ssh_public_key: String::new(),
        }
    }
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            interface_name: String::new(),
            bridge_mode: Some(BridgeMode::Internal),
            private_subnet: DEFAULT_PRIVATE_SUBNET.to_string(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            raid_level: Some(RaidLevel::Raid1),
            disks: Vec::new(),
        }
    }
}

impl Default for TailscaleSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            auth_key: String::new(),
            advertise_ssh: true,
            expose_webui: false,
        }
    }
}

fn mask(secret: &str) -> &str {
    if secret.is_empty() {
        ""
    } else {
        REDACTED
    }
}

impl fmt::Debug for SystemIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemIdentity")
            .field("hostname", &self.hostname)
            .field("domain_suffix", &self.domain_suffix)
            .field("timezone", &self.timezone)
            .field("email", &self.email)
            .field("root_password", &mask(&self.root_password))
            .field("ssh_public_key", &mask(&self.ssh_public_key))
            .finish()
    }
}

impl fmt::Debug for TailscaleSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TailscaleSettings")
            .field("enabled", &self.enabled)
            .field("auth_key", &mask(&self.auth_key))
            .field("advertise_ssh", &self.advertise_ssh)
            .field("expose_webui", &self.expose_webui)
            .finish()
    }
}

impl SystemIdentity {
    /// Hostname joined with the domain suffix by a single dot.
    ///
    /// An empty suffix yields the bare hostname; an empty hostname still keeps
    /// the leading dot so the gap stays visible.
    pub fn fqdn(&self) -> String {
        match (self.hostname.is_empty(), self.domain_suffix.is_empty()) {
            (_, true) => self.hostname.clone(),
            (true, false) => format!(".{}", self.domain_suffix),
            (false, false) => format!("{}.{}", self.hostname, self.domain_suffix),
        }
    }
}

impl Config {
    pub fn fqdn(&self) -> String {
        self.system.fqdn()
    }

    /// Blanks every credential in place.
    pub fn redact(&mut self) {
        self.system.root_password.clear();
        self.system.ssh_public_key.clear();
        self.tailscale.auth_key.clear();
    }

    /// A copy with every credential blanked, leaving `self` untouched.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.redact();
        copy
    }

    /// Validates every field against the host's zone database.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.validate_with(&SystemZones::new())
    }

    /// Runs every field check and reports all failures together.
    ///
    /// Credentials are only checked when present, so a configuration reloaded
    /// from disk (where they are never stored) still passes.
    pub fn validate_with(&self, zones: &dyn ZoneLookup) -> Result<(), ValidationError> {
        let mut errs = ValidationError::new();
        self.check_fields(zones, &mut errs);
        errs.into_result()
    }

    /// Stricter check run right before anything is written to the machine:
    /// credentials are required and the disk list must fit the raid layout.
    pub fn validate_for_install(&self, zones: &dyn ZoneLookup) -> Result<(), ValidationError> {
        let mut errs = ValidationError::new();
        self.check_fields(zones, &mut errs);

        if self.system.root_password.is_empty() {
            errs.add(validate_password(""));
        }
        if self.network.private_subnet.is_empty() {
            errs.add(validate_cidr(""));
        }
        if self.tailscale.enabled && self.tailscale.auth_key.is_empty() {
            errs.push(FieldError::new(Field::TailscaleAuthKey, ErrorKind::Empty, ""));
        }
        if let Some(level) = self.storage.raid_level {
            if self.storage.disks.len() < level.min_disks() {
                errs.push(FieldError::new(
                    Field::Disks,
                    ErrorKind::TooFew,
                    self.storage.disks.join(","),
                ));
            }
        }
        errs.into_result()
    }

    fn check_fields(&self, zones: &dyn ZoneLookup, errs: &mut ValidationError) {
        let system = &self.system;
        errs.add(validate_hostname(&system.hostname));
        errs.add(validate_email(&system.email));
        errs.add(validate_timezone(&system.timezone, zones));
        if !system.root_password.is_empty() {
            errs.add(validate_password(&system.root_password));
        }
        if !system.ssh_public_key.is_empty() {
            errs.add(validate_ssh_key(&system.ssh_public_key));
        }

        errs.add(validate_bridge_mode(
            self.network.bridge_mode.as_ref().map_or("", |m| m.as_str()),
        ));
        if !self.network.private_subnet.is_empty() {
            errs.add(validate_cidr(&self.network.private_subnet));
        }

        errs.add(validate_raid_level(
            self.storage.raid_level.as_ref().map_or("", |r| r.as_str()),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_zones(_: &str) -> bool {
        false
    }

    #[test]
    fn defaults_are_independent_and_valid() {
        let mut a = Config::default();
        let b = Config::default();
        a.system.hostname = "changed".into();
        a.storage.disks.push("/dev/sda".into());

        assert_eq!(b.system.hostname, DEFAULT_HOSTNAME);
        assert!(b.storage.disks.is_empty());
        assert!(a.validate_with(&no_zones).is_ok());
        assert!(b.validate_with(&no_zones).is_ok());
    }

    #[test]
    fn defaults_match_product_baseline() {
        let cfg = Config::default();
        assert_eq!(cfg.network.bridge_mode, Some(BridgeMode::Internal));
        assert_eq!(cfg.storage.raid_level, Some(RaidLevel::Raid1));
        assert!(!cfg.tailscale.enabled);
        assert!(cfg.tailscale.advertise_ssh);
        assert!(!cfg.tailscale.expose_webui);
        assert_eq!(cfg.fqdn(), "pve.local");
    }

    #[test]
    fn fqdn_fallbacks() {
        let mut id = SystemIdentity::default();
        id.hostname = "node".into();
        id.domain_suffix = "example.org".into();
        assert_eq!(id.fqdn(), "node.example.org");

        id.domain_suffix.clear();
        assert_eq!(id.fqdn(), "node");

        id.hostname.clear();
        assert_eq!(id.fqdn(), "");

        id.domain_suffix = "example.org".into();
        assert_eq!(id.fqdn(), ".example.org");
    }

    #[test]
    fn validation_reports_every_failure() {
        let mut cfg = Config::default();
        cfg.system.hostname = "-bad".into();
        cfg.system.email = "nobody".into();
        cfg.system.timezone = "Mars/Base".into();
        cfg.system.root_password = "short".into();
        cfg.system.ssh_public_key = "ssh-rsaAAAA".into();
        cfg.network.bridge_mode = None;
        cfg.network.private_subnet = "10.0.0.1".into();
        cfg.storage.raid_level = None;

        let errs = cfg.validate_with(&no_zones).unwrap_err();
        assert_eq!(errs.len(), 8);
        assert!(errs.contains(Field::Hostname, ErrorKind::StartsWithHyphen));
        assert!(errs.contains(Field::Email, ErrorKind::Invalid));
        assert!(errs.contains(Field::Timezone, ErrorKind::Invalid));
        assert!(errs.contains(Field::RootPassword, ErrorKind::TooShort));
        assert!(errs.contains(Field::SshPublicKey, ErrorKind::InvalidPrefix));
        assert!(errs.contains(Field::BridgeMode, ErrorKind::Empty));
        assert!(errs.contains(Field::PrivateSubnet, ErrorKind::Invalid));
        assert!(errs.contains(Field::RaidLevel, ErrorKind::Empty));
        assert!(errs.cause().unwrap().is(Field::Hostname, ErrorKind::StartsWithHyphen));
    }

    #[test]
    fn install_readiness_requires_credentials_and_disks() {
        let mut cfg = Config::default();
        cfg.tailscale.enabled = true;
        cfg.storage.disks = vec!["/dev/sda".into()];

        let errs = cfg.validate_for_install(&no_zones).unwrap_err();
        assert_eq!(errs.len(), 3);
        assert!(errs.contains(Field::RootPassword, ErrorKind::Empty));
        assert!(errs.contains(Field::TailscaleAuthKey, ErrorKind::Empty));
        assert!(errs.contains(Field::Disks, ErrorKind::TooFew));

        cfg.system.root_password = "correct horse battery".into();
        cfg.tailscale.auth_key = "tskey-auth-abc".into();
        cfg.storage.disks.push("/dev/sdb".into());
        assert!(cfg.validate_for_install(&no_zones).is_ok());

        cfg.storage.raid_level = Some(RaidLevel::Single);
        cfg.storage.disks.truncate(1);
        assert!(cfg.validate_for_install(&no_zones).is_ok());
    }

    #[test]
    fn redacted_copy_leaves_original_alone() {
        let mut cfg = Config::default();
        cfg.system.root_password = "hunter2hunter2".into();
        cfg.system.ssh_public_key = "ssh-ed25519 AAAA".into();
        cfg.tailscale.auth_key = "tskey".into();

        let copy = cfg.redacted();
        assert!(copy.system.root_password.is_empty());
        assert!(copy.system.ssh_public_key.is_empty());
        assert!(copy.tailscale.auth_key.is_empty());
        assert_eq!(cfg.system.root_password, "hunter2hunter2");
        assert_eq!(cfg.tailscale.auth_key, "tskey");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let mut cfg = Config::default();
        cfg.system.root_password = "hunter2hunter2".into();
        cfg.tailscale.auth_key = "tskey-secret".into();

        let dump = format!("{cfg:?}");
        assert!(!dump.contains("hunter2"));
        assert!(!dump.contains("tskey-secret"));
        assert!(dump.contains("<redacted>"));
    }
}
