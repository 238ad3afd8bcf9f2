use xmlapi_core::{Version, xpath};

use crate::error::SyncError;

pub const DEFAULT_DEVICE: &str = "localhost.localdomain";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySelector<'a> {
    Container,
    Name(&'a str),
    Uuid(&'a str),
}

/// Turns collection coordinates into device path segments.
pub trait Location: Send + Sync {
    fn xpath(
        &self,
        version: Version,
        selector: EntrySelector<'_>,
    ) -> Result<Vec<String>, SyncError>;
}

pub(crate) fn container_xpath<L: Location + ?Sized>(
    location: &L,
    version: Version,
) -> Result<String, SyncError> {
    Ok(xpath::join(&location.xpath(version, EntrySelector::Container)?))
}

pub(crate) fn entry_xpath<L: Location + ?Sized>(
    location: &L,
    version: Version,
    name: &str,
) -> Result<String, SyncError> {
    Ok(xpath::join(
        &location.xpath(version, EntrySelector::Name(name))?,
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rulebase {
    Pre,
    Post,
}

impl Rulebase {
    fn segment(&self) -> &'static str {
        match self {
            Rulebase::Pre => "pre-rulebase",
            Rulebase::Post => "post-rulebase",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    Shared,
    Vsys {
        ngfw_device: String,
        vsys: String,
    },
    DeviceGroup {
        panorama_device: String,
        device_group: String,
    },
}

/// Describes where a type of object lives below its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectKind {
    pub name: &'static str,
    pub suffix: &'static [&'static str],
    pub in_rulebase: bool,
    pub min_version: Option<Version>,
}

impl ObjectKind {
    pub const ADDRESS: Self = Self::object("address", &["address"]);
    pub const ADDRESS_GROUP: Self = Self::object("address group", &["address-group"]);
    pub const SERVICE: Self = Self::object("service", &["service"]);
    pub const TAG: Self = Self::object("tag", &["tag"]);
    pub const SECURITY_RULE: Self = Self::rule("security rule", &["security", "rules"]);
    pub const NAT_RULE: Self = Self::rule("nat rule", &["nat", "rules"]);
    pub const AUTHENTICATION_RULE: Self = Self {
        min_version: Some(Version::new(10, 0, 0)),
        ..Self::rule("authentication rule", &["authentication", "rules"])
    };

    pub const fn object(name: &'static str, suffix: &'static [&'static str]) -> Self {
        Self {
            name,
            suffix,
            in_rulebase: false,
            min_version: None,
        }
    }

    pub const fn rule(name: &'static str, suffix: &'static [&'static str]) -> Self {
        Self {
            name,
            suffix,
            in_rulebase: true,
            min_version: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub scope: Scope,
    pub rulebase: Option<Rulebase>,
    pub kind: ObjectKind,
}

impl ObjectLocation {
    pub fn shared(kind: ObjectKind) -> Self {
        Self {
            scope: Scope::Shared,
            rulebase: None,
            kind,
        }
    }

    pub fn vsys(kind: ObjectKind, vsys: impl Into<String>) -> Self {
        Self {
            scope: Scope::Vsys {
                ngfw_device: DEFAULT_DEVICE.to_string(),
                vsys: vsys.into(),
            },
            rulebase: None,
            kind,
        }
    }

    pub fn device_group(kind: ObjectKind, device_group: impl Into<String>) -> Self {
        Self {
            scope: Scope::DeviceGroup {
                panorama_device: DEFAULT_DEVICE.to_string(),
                device_group: device_group.into(),
            },
            rulebase: None,
            kind,
        }
    }

    pub fn with_rulebase(mut self, rulebase: Rulebase) -> Self {
        self.rulebase = Some(rulebase);
        self
    }

    fn validate(&self, version: Version) -> Result<(), SyncError> {
        let invalid = |reason: String| Err(SyncError::InvalidLocation(reason));
        if let Some(min) = self.kind.min_version
            && version < min
        {
            return invalid(format!(
                "{} requires version {min} or later, device runs {version}",
                self.kind.name
            ));
        }
        match &self.scope {
            Scope::Shared => {}
            Scope::Vsys { ngfw_device, vsys } => {
                if ngfw_device.is_empty() || vsys.is_empty() {
                    return invalid("vsys location requires device and vsys names".into());
                }
                if self.rulebase.is_some() {
                    return invalid("vsys location has no pre/post rulebase".into());
                }
            }
            Scope::DeviceGroup {
                panorama_device,
                device_group,
            } => {
                if panorama_device.is_empty() || device_group.is_empty() {
                    return invalid("device group location requires device and group names".into());
                }
                if self.kind.in_rulebase && self.rulebase.is_none() {
                    return invalid(format!(
                        "{} in a device group requires a pre or post rulebase",
                        self.kind.name
                    ));
                }
            }
        }
        if !self.kind.in_rulebase && self.rulebase.is_some() {
            return invalid(format!("{} does not live in a rulebase", self.kind.name));
        }
        Ok(())
    }
}

impl Location for ObjectLocation {
    fn xpath(
        &self,
        version: Version,
        selector: EntrySelector<'_>,
    ) -> Result<Vec<String>, SyncError> {
        self.validate(version)?;

        let mut segments = vec!["config".to_string()];
        match &self.scope {
            Scope::Shared => {
                segments.push("shared".into());
                if let Some(rulebase) = self.rulebase {
                    segments.push(rulebase.segment().into());
                } else if self.kind.in_rulebase {
                    segments.push("rulebase".into());
                }
            }
            Scope::Vsys { ngfw_device, vsys } => {
                segments.push("devices".into());
                segments.push(xpath::entry(ngfw_device));
                segments.push("vsys".into());
                segments.push(xpath::entry(vsys));
                if self.kind.in_rulebase {
                    segments.push("rulebase".into());
                }
            }
            Scope::DeviceGroup {
                panorama_device,
                device_group,
            } => {
                segments.push("devices".into());
                segments.push(xpath::entry(panorama_device));
                segments.push("device-group".into());
                segments.push(xpath::entry(device_group));
                if let Some(rulebase) = self.rulebase {
                    segments.push(rulebase.segment().into());
                }
            }
        }
        segments.extend(self.kind.suffix.iter().map(|s| s.to_string()));

        match selector {
            EntrySelector::Container => {}
            EntrySelector::Name(name) => {
                if name.is_empty() {
                    return Err(SyncError::InvalidLocation("entry name is empty".into()));
                }
                segments.push(xpath::entry(name));
            }
            EntrySelector::Uuid(uuid) => {
                if !self.kind.in_rulebase {
                    return Err(SyncError::InvalidLocation(format!(
                        "{} entries are not addressable by uuid",
                        self.kind.name
                    )));
                }
                segments.push(xpath::entry_with_uuid(uuid));
            }
        }
        Ok(segments)
    }
}
