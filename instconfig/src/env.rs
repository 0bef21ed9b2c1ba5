//! Environment variable overrides.
//!
//! Each variable is applied only when it carries a meaningful value, so an
//! exported-but-empty variable never wipes a value from the file. Enumerated
//! values that are not in their set are dropped here and left for validation
//! to catch.

use tracing::{debug, warn};

use crate::config::Config;
use crate::types::ClosedSet;

pub const HOSTNAME: &str = "INSTALL_HOSTNAME";
pub const DOMAIN_SUFFIX: &str = "INSTALL_DOMAIN_SUFFIX";
pub const TIMEZONE: &str = "INSTALL_TIMEZONE";
pub const EMAIL: &str = "INSTALL_EMAIL";
pub const ROOT_PASSWORD: &str = "INSTALL_ROOT_PASSWORD";
pub const SSH_PUBLIC_KEY: &str = "INSTALL_SSH_PUBLIC_KEY";

pub const INTERFACE_NAME: &str = "INTERFACE_NAME";
pub const BRIDGE_MODE: &str = "BRIDGE_MODE";
pub const PRIVATE_SUBNET: &str = "PRIVATE_SUBNET";

pub const ZFS_RAID: &str = "ZFS_RAID";
pub const ZFS_DISKS: &str = "ZFS_DISKS";

pub const TAILSCALE_ENABLED: &str = "TAILSCALE_ENABLED";
pub const TAILSCALE_AUTH_KEY: &str = "TAILSCALE_AUTH_KEY";
pub const TAILSCALE_ADVERTISE_SSH: &str = "TAILSCALE_ADVERTISE_SSH";
pub const TAILSCALE_EXPOSE_WEBUI: &str = "TAILSCALE_EXPOSE_WEBUI";

/// How a variable's value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Text,
    Secret,
    Choice,
    Flag,
    List,
}

#[derive(Debug, Clone, Copy)]
pub struct EnvVar {
    pub name: &'static str,
    pub key: &'static str,
    pub kind: VarKind,
}

const fn var(name: &'static str, key: &'static str, kind: VarKind) -> EnvVar {
    EnvVar { name, key, kind }
}

/// Every variable [`Config::apply_env`] reads, in the order they are applied.
pub const VARIABLES: &[EnvVar] = &[
    var(HOSTNAME, "system.hostname", VarKind::Text),
    var(DOMAIN_SUFFIX, "system.domain_suffix", VarKind::Text),
    var(TIMEZONE, "system.timezone", VarKind::Text),
    var(EMAIL, "system.email", VarKind::Text),
    var(ROOT_PASSWORD, "system.root_password", VarKind::Secret),
    var(SSH_PUBLIC_KEY, "system.ssh_public_key", VarKind::Secret),
    var(INTERFACE_NAME, "network.interface_name", VarKind::Text),
    var(BRIDGE_MODE, "network.bridge_mode", VarKind::Choice),
    var(PRIVATE_SUBNET, "network.private_subnet", VarKind::Text),
    var(ZFS_RAID, "storage.zfs_raid", VarKind::Choice),
    var(ZFS_DISKS, "storage.disks", VarKind::List),
    var(TAILSCALE_ENABLED, "tailscale.enabled", VarKind::Flag),
    var(TAILSCALE_AUTH_KEY, "tailscale.auth_key", VarKind::Secret),
    var(TAILSCALE_ADVERTISE_SSH, "tailscale.advertise_ssh", VarKind::Flag),
    var(TAILSCALE_EXPOSE_WEBUI, "tailscale.expose_webui", VarKind::Flag),
];

/// `true`, `yes` and `1` in any case are true. Anything else is false.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "1"
    )
}

/// Splits a comma separated list, trimming items and dropping empty ones.
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
}

impl Config {
    /// Overlays variables from the process environment.
    ///
    /// A value that is not valid UTF-8 still counts as present and is read
    /// lossily.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| {
            std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
        });
    }

    /// Overlays variables resolved through `lookup`, which returns `None` for
    /// an unset variable.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Overlay { lookup };

        let system = &mut self.system;
        env.text(HOSTNAME, &mut system.hostname);
        env.text(DOMAIN_SUFFIX, &mut system.domain_suffix);
        env.text(TIMEZONE, &mut system.timezone);
        env.text(EMAIL, &mut system.email);
        env.text(ROOT_PASSWORD, &mut system.root_password);
        env.text(SSH_PUBLIC_KEY, &mut system.ssh_public_key);

        let network = &mut self.network;
        env.text(INTERFACE_NAME, &mut network.interface_name);
        env.choice(BRIDGE_MODE, &mut network.bridge_mode);
        env.text(PRIVATE_SUBNET, &mut network.private_subnet);

        let storage = &mut self.storage;
        env.choice(ZFS_RAID, &mut storage.raid_level);
        env.list(ZFS_DISKS, &mut storage.disks);

        let tailscale = &mut self.tailscale;
        env.flag(TAILSCALE_ENABLED, &mut tailscale.enabled);
        env.text(TAILSCALE_AUTH_KEY, &mut tailscale.auth_key);
        env.flag(TAILSCALE_ADVERTISE_SSH, &mut tailscale.advertise_ssh);
        env.flag(TAILSCALE_EXPOSE_WEBUI, &mut tailscale.expose_webui);
    }
}

struct Overlay<F> {
    lookup: F,
}

impl<F> Overlay<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn non_empty(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    // Values are never logged, some of these variables hold credentials.
    fn text(&self, name: &str, target: &mut String) {
        if let Some(value) = self.non_empty(name) {
            debug!("{name} overrides configuration");
            *target = value;
        }
    }

    fn flag(&self, name: &str, target: &mut bool) {
        if let Some(value) = (self.lookup)(name) {
            *target = parse_bool(&value);
            debug!("{name} overrides configuration with {}", *target);
        }
    }

    fn choice<T: ClosedSet>(&self, name: &str, target: &mut Option<T>) {
        let Some(value) = self.non_empty(name) else {
            return;
        };
        match T::parse_literal(&value) {
            Ok(parsed) => {
                debug!("{name} overrides configuration with {value}");
                *target = Some(parsed);
            }
            Err(err) => warn!("ignoring {name}: {err}"),
        }
    }

    fn list(&self, name: &str, target: &mut Vec<String>) {
        let Some(value) = self.non_empty(name) else {
            return;
        };
        let items = parse_list(&value);
        if items.is_empty() {
            return;
        }
        debug!("{name} overrides configuration with {} entries", items.len());
        *target = items;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BridgeMode, RaidLevel};
    use std::collections::HashMap;

    fn apply(cfg: &mut Config, vars: &[(&str, &str)]) {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        cfg.apply_env_with(|name| vars.get(name).cloned());
    }

    #[test]
    fn empty_string_never_erases() {
        let mut cfg = Config::default();
        cfg.system.hostname = "original".into();

        apply(&mut cfg, &[(HOSTNAME, "")]);
        assert_eq!(cfg.system.hostname, "original");

        apply(&mut cfg, &[(HOSTNAME, "new-host")]);
        assert_eq!(cfg.system.hostname, "new-host");
    }

    #[test]
    fn unset_variables_leave_everything_alone() {
        let mut cfg = Config::default();
        cfg.storage.disks = vec!["/dev/sda".into()];
        let before = cfg.clone();
        apply(&mut cfg, &[]);
        assert_eq!(cfg, before);
    }

    #[test]
    fn flags_overlay_whenever_present() {
        let mut cfg = Config::default();
        cfg.tailscale.enabled = true;

        apply(&mut cfg, &[]);
        assert!(cfg.tailscale.enabled);

        apply(&mut cfg, &[(TAILSCALE_ENABLED, "maybe")]);
        assert!(!cfg.tailscale.enabled);

        apply(&mut cfg, &[(TAILSCALE_ENABLED, "YES")]);
        assert!(cfg.tailscale.enabled);

        apply(&mut cfg, &[(TAILSCALE_ENABLED, "")]);
        assert!(!cfg.tailscale.enabled);
    }

    #[test]
    fn bool_parsing_is_tolerant_but_narrow() {
        for truthy in ["true", "TRUE", " yes ", "Yes", "1", "\t1\n"] {
            assert!(parse_bool(truthy), "{truthy:?}");
        }
        for falsy in ["", "false", "no", "0", "on", "y", "enabled", "11", "garbage"] {
            assert!(!parse_bool(falsy), "{falsy:?}");
        }
    }

    #[test]
    fn invalid_choices_are_dropped() {
        let mut cfg = Config::default();
        apply(&mut cfg, &[(BRIDGE_MODE, "nat"), (ZFS_RAID, "RAID1"), (HOSTNAME, "still-applied")]);
        assert_eq!(cfg.network.bridge_mode, Some(BridgeMode::Internal));
        assert_eq!(cfg.storage.raid_level, Some(RaidLevel::Raid1));
        assert_eq!(cfg.system.hostname, "still-applied");

        apply(&mut cfg, &[(BRIDGE_MODE, "both"), (ZFS_RAID, "single")]);
        assert_eq!(cfg.network.bridge_mode, Some(BridgeMode::Both));
        assert_eq!(cfg.storage.raid_level, Some(RaidLevel::Single));
    }

    #[test]
    fn empty_choice_does_not_clear() {
        let mut cfg = Config::default();
        apply(&mut cfg, &[(BRIDGE_MODE, "")]);
        assert_eq!(cfg.network.bridge_mode, Some(BridgeMode::Internal));
    }

    #[test]
    fn disk_lists_are_split_and_trimmed() {
        let mut cfg = Config::default();
        cfg.storage.disks = vec!["/dev/old".into()];

        apply(&mut cfg, &[(ZFS_DISKS, " , ,, ")]);
        assert_eq!(cfg.storage.disks, vec!["/dev/old".to_string()]);

        apply(&mut cfg, &[(ZFS_DISKS, " /dev/sdb, /dev/sda ,,/dev/sdb ")]);
        assert_eq!(cfg.storage.disks, vec!["/dev/sdb", "/dev/sda", "/dev/sdb"]);
    }

    #[test]
    fn every_group_is_applied() {
        let mut cfg = Config::default();
        apply(
            &mut cfg,
            &[
                (HOSTNAME, "node7"),
                (DOMAIN_SUFFIX, "lab.example"),
                (TIMEZONE, "Asia/Tokyo"),
                (EMAIL, "root@lab.example"),
                (ROOT_PASSWORD, "s3cret-pass"),
                (SSH_PUBLIC_KEY, "ssh-ed25519 AAAA"),
                (INTERFACE_NAME, "eno1"),
                (BRIDGE_MODE, "external"),
                (PRIVATE_SUBNET, "172.16.0.0/16"),
                (ZFS_RAID, "raid0"),
                (ZFS_DISKS, "/dev/sda,/dev/sdb"),
                (TAILSCALE_ENABLED, "1"),
                (TAILSCALE_AUTH_KEY, "tskey-auth"),
                (TAILSCALE_ADVERTISE_SSH, "no"),
                (TAILSCALE_EXPOSE_WEBUI, "true"),
            ],
        );

        assert_eq!(cfg.fqdn(), "node7.lab.example");
        assert_eq!(cfg.system.timezone, "Asia/Tokyo");
        assert_eq!(cfg.system.email, "root@lab.example");
        assert_eq!(cfg.system.root_password, "s3cret-pass");
        assert_eq!(cfg.system.ssh_public_key, "ssh-ed25519 AAAA");
        assert_eq!(cfg.network.interface_name, "eno1");
        assert_eq!(cfg.network.bridge_mode, Some(BridgeMode::External));
        assert_eq!(cfg.network.private_subnet, "172.16.0.0/16");
        assert_eq!(cfg.storage.raid_level, Some(RaidLevel::Raid0));
        assert_eq!(cfg.storage.disks, vec!["/dev/sda", "/dev/sdb"]);
        assert!(cfg.tailscale.enabled);
        assert_eq!(cfg.tailscale.auth_key, "tskey-auth");
        assert!(!cfg.tailscale.advertise_ssh);
        assert!(cfg.tailscale.expose_webui);
    }

    #[test]
    fn variable_table_covers_every_override() {
        assert_eq!(VARIABLES.len(), 15);
        let secrets: Vec<_> = VARIABLES
            .iter()
            .filter(|v| v.kind == VarKind::Secret)
            .map(|v| v.name)
            .collect();
        assert_eq!(secrets, [ROOT_PASSWORD, SSH_PUBLIC_KEY, TAILSCALE_AUTH_KEY]);
    }
}
