//! Field validators and the aggregate error they report into.
//!
//! Every validator is a pure `&str -> Result<(), FieldError>` function. Whole
//! configurations are checked by running every validator and collecting the
//! failures in a [`ValidationError`], so an operator sees all problems at once.

use std::fmt;
use std::sync::OnceLock;

use ipnetwork::IpNetwork;
use miette::Diagnostic;
use regex::Regex;

use crate::timezone::ZoneLookup;
use crate::types::{BridgeMode, ClosedSet, RaidLevel};

pub const HOSTNAME_MAX_LEN: usize = 63;
pub const PASSWORD_MIN_LEN: usize = 8;

/// Key algorithms accepted at the start of an SSH public key.
pub const SSH_KEY_PREFIXES: &[&str] = &[
    "ssh-rsa",
    "ssh-ed25519",
    "ssh-ecdsa",
    "ecdsa-sha2-nistp256",
    "ecdsa-sha2-nistp384",
    "ecdsa-sha2-nistp521",
];

/// Time zone names accepted without consulting a zone database.
pub const BUILTIN_ZONES: &[&str] = &["UTC", "Local"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Empty,
    TooLong,
    TooShort,
    TooFew,
    InvalidChars,
    InvalidPrefix,
    StartsWithHyphen,
    EndsWithHyphen,
    Invalid,
}

/// The configuration field a [`FieldError`] is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Hostname,
    Email,
    RootPassword,
    SshPublicKey,
    Timezone,
    BridgeMode,
    PrivateSubnet,
    RaidLevel,
    Disks,
    TailscaleAuthKey,
}

impl Field {
    /// Dotted path of the field in the persisted document or, for fields that
    /// are never persisted, in the in-memory model.
    pub fn key(self) -> &'static str {
        match self {
            Field::Hostname => "system.hostname",
            Field::Email => "system.email",
            Field::RootPassword => "system.root_password",
            Field::SshPublicKey => "system.ssh_public_key",
            Field::Timezone => "system.timezone",
            Field::BridgeMode => "network.bridge_mode",
            Field::PrivateSubnet => "network.private_subnet",
            Field::RaidLevel => "storage.zfs_raid",
            Field::Disks => "storage.disks",
            Field::TailscaleAuthKey => "tailscale.auth_key",
        }
    }

    pub fn is_sensitive(self) -> bool {
        matches!(
            self,
            Field::RootPassword | Field::SshPublicKey | Field::TailscaleAuthKey
        )
    }

    fn label(self) -> &'static str {
        match self {
            Field::Hostname => "hostname",
            Field::Email => "email",
            Field::RootPassword => "root password",
            Field::SshPublicKey => "SSH public key",
            Field::Timezone => "timezone",
            Field::BridgeMode => "bridge mode",
            Field::PrivateSubnet => "private subnet",
            Field::RaidLevel => "raid level",
            Field::Disks => "disk list",
            Field::TailscaleAuthKey => "tailscale auth key",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single failed field check.
///
/// Two errors compare equal when they are about the same field and have the
/// same kind; the offending value is context only.
#[derive(Debug, Clone)]
pub struct FieldError {
    pub field: Field,
    pub kind: ErrorKind,
    value: Option<String>,
}

impl FieldError {
    pub fn new(field: Field, kind: ErrorKind, value: impl Into<String>) -> Self {
        let value = if field.is_sensitive() {
            None
        } else {
            Some(value.into())
        };
        Self { field, kind, value }
    }

    /// The rejected input. Always `None` for sensitive fields.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn is(&self, field: Field, kind: ErrorKind) -> bool {
        self.field == field && self.kind == kind
    }
}

impl PartialEq for FieldError {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && self.kind == other.kind
    }
}

impl Eq for FieldError {}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = self.field;
        match self.kind {
            ErrorKind::Empty => write!(f, "{field} cannot be empty"),
            ErrorKind::TooLong => {
                write!(f, "{field} must be {HOSTNAME_MAX_LEN} characters or less")
            }
            ErrorKind::TooShort => {
                write!(f, "{field} must be at least {PASSWORD_MIN_LEN} characters")
            }
            ErrorKind::TooFew => write!(f, "{field} has too few entries"),
            ErrorKind::InvalidChars => write!(
                f,
                "{field} can only contain letters, numbers, and hyphens"
            ),
            ErrorKind::InvalidPrefix => write!(
                f,
                "{field} must start with one of {} followed by a space",
                SSH_KEY_PREFIXES.join(", ")
            ),
            ErrorKind::StartsWithHyphen => write!(f, "{field} cannot start with a hyphen"),
            ErrorKind::EndsWithHyphen => write!(f, "{field} cannot end with a hyphen"),
            ErrorKind::Invalid => match &self.value {
                Some(value) => write!(f, "invalid {field}: \"{value}\""),
                None => write!(f, "invalid {field}"),
            },
        }
    }
}

impl std::error::Error for FieldError {}

impl Diagnostic for FieldError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(format!("instconfig::{}", self.field.key())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let help: &str = match (self.field, self.kind) {
            (Field::Timezone, ErrorKind::Invalid) => {
                "use an IANA zone name such as \"Europe/Zurich\", or \"UTC\""
            }
            (Field::BridgeMode, ErrorKind::Invalid) => "allowed values: internal, external, both",
            (Field::RaidLevel, ErrorKind::Invalid) => "allowed values: single, raid0, raid1",
            (Field::PrivateSubnet, ErrorKind::Invalid) => {
                "use CIDR notation such as \"10.10.10.0/24\""
            }
            (Field::Disks, ErrorKind::TooFew) => {
                "raid0 and raid1 need at least two disks, single needs one"
            }
            _ => return None,
        };
        Some(Box::new(help))
    }
}

pub fn validate_hostname(hostname: &str) -> Result<(), FieldError> {
    let fail = |kind| Err(FieldError::new(Field::Hostname, kind, hostname));

    if hostname.is_empty() {
        return fail(ErrorKind::Empty);
    }
    if hostname.chars().count() > HOSTNAME_MAX_LEN {
        return fail(ErrorKind::TooLong);
    }
    if hostname.starts_with('-') {
        return fail(ErrorKind::StartsWithHyphen);
    }
    if hostname.ends_with('-') {
        return fail(ErrorKind::EndsWithHyphen);
    }
    if !hostname
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return fail(ErrorKind::InvalidChars);
    }
    Ok(())
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$")
            .expect("email pattern compiles")
    })
}

pub fn validate_email(email: &str) -> Result<(), FieldError> {
    if email.is_empty() {
        return Err(FieldError::new(Field::Email, ErrorKind::Empty, email));
    }
    if !email_pattern().is_match(email) {
        return Err(FieldError::new(Field::Email, ErrorKind::Invalid, email));
    }
    Ok(())
}

/// Length is counted in code points, so "pässwörd" is eight long.
pub fn validate_password(password: &str) -> Result<(), FieldError> {
    if password.is_empty() {
        return Err(FieldError::new(Field::RootPassword, ErrorKind::Empty, ""));
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(FieldError::new(Field::RootPassword, ErrorKind::TooShort, ""));
    }
    Ok(())
}

pub fn validate_ssh_key(key: &str) -> Result<(), FieldError> {
    if key.is_empty() {
        return Err(FieldError::new(Field::SshPublicKey, ErrorKind::Empty, ""));
    }
    let recognized = SSH_KEY_PREFIXES.iter().any(|prefix| {
        key.strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with(' '))
    });
    if !recognized {
        return Err(FieldError::new(
            Field::SshPublicKey,
            ErrorKind::InvalidPrefix,
            "",
        ));
    }
    Ok(())
}

pub fn validate_timezone(timezone: &str, zones: &dyn ZoneLookup) -> Result<(), FieldError> {
    if timezone.is_empty() {
        return Err(FieldError::new(Field::Timezone, ErrorKind::Empty, timezone));
    }
    if BUILTIN_ZONES.contains(&timezone) || zones.contains(timezone) {
        return Ok(());
    }
    Err(FieldError::new(Field::Timezone, ErrorKind::Invalid, timezone))
}

fn validate_choice<T: ClosedSet>(field: Field, value: &str) -> Result<(), FieldError> {
    if value.is_empty() {
        return Err(FieldError::new(field, ErrorKind::Empty, value));
    }
    if !T::is_valid(value) {
        return Err(FieldError::new(field, ErrorKind::Invalid, value));
    }
    Ok(())
}

pub fn validate_bridge_mode(value: &str) -> Result<(), FieldError> {
    validate_choice::<BridgeMode>(Field::BridgeMode, value)
}

pub fn validate_raid_level(value: &str) -> Result<(), FieldError> {
    validate_choice::<RaidLevel>(Field::RaidLevel, value)
}

/// Accepts IPv4 and IPv6 networks in CIDR notation.
pub fn validate_cidr(subnet: &str) -> Result<(), FieldError> {
    if subnet.is_empty() {
        return Err(FieldError::new(Field::PrivateSubnet, ErrorKind::Empty, subnet));
    }
    if !subnet.contains('/') || subnet.parse::<IpNetwork>().is_err() {
        return Err(FieldError::new(Field::PrivateSubnet, ErrorKind::Invalid, subnet));
    }
    Ok(())
}

/// Ordered collection of field errors reported as one error.
///
/// Entries are optional so that a list assembled by hand may contain holes;
/// holes are skipped when rendering but still count for [`has_errors`].
///
/// [`has_errors`]: ValidationError::has_errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    errors: Vec<Option<FieldError>>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<Option<FieldError>>) -> Self {
        Self { errors: entries }
    }

    /// Records the failure of a check. `Ok(())` is a no-op.
    pub fn add(&mut self, result: Result<(), FieldError>) {
        if let Err(err) = result {
            self.errors.push(Some(err));
        }
    }

    pub fn push(&mut self, err: FieldError) {
        self.errors.push(Some(err));
    }

    /// True when any entry was recorded, including empty ones.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.errors().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The first recorded error, if any.
    pub fn cause(&self) -> Option<&FieldError> {
        self.errors().next()
    }

    pub fn contains(&self, field: Field, kind: ErrorKind) -> bool {
        self.errors().any(|e| e.is(field, kind))
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        if self.has_errors() {
            Err(self)
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl Diagnostic for ValidationError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new("instconfig::invalid_config"))
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn Diagnostic> + 'a>> {
        Some(Box::new(self.errors().map(|e| e as &dyn Diagnostic)))
    }
}

impl FromIterator<FieldError> for ValidationError {
    fn from_iter<I: IntoIterator<Item = FieldError>>(iter: I) -> Self {
        Self {
            errors: iter.into_iter().map(Some).collect(),
        }
    }
}
