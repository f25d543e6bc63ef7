//! NAS share entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

/// Export protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "nas_protocol", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum NasProtocol {
    /// Network File System.
    #[default]
    Nfs,
    /// Server Message Block.
    Smb,
}

impl FromStr for NasProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NFS" => Ok(Self::Nfs),
            "SMB" | "CIFS" => Ok(Self::Smb),
            other => Err(format!("Unknown protocol: {other}")),
        }
    }
}

/// Export permission mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "nas_permission", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NasPermission {
    /// Clients may only read.
    ReadOnly,
    /// Clients may read and write.
    #[default]
    ReadWrite,
}

impl FromStr for NasPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "READ_ONLY" | "RO" => Ok(Self::ReadOnly),
            "READ_WRITE" | "RW" => Ok(Self::ReadWrite),
            other => Err(format!("Unknown permission: {other}")),
        }
    }
}

/// A directory exported over NFS or SMB.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct NasShare {
    /// Unique identifier.
    pub id: Uuid,
    /// Export name (unique).
    pub name: String,
    /// Absolute directory path, always inside the storage root.
    pub path: String,
    /// Protocol.
    pub protocol: NasProtocol,
    /// Permission mode.
    pub permission: NasPermission,
    /// Free-form description.
    pub description: Option<String>,
    /// Comma-separated client allow-list.
    pub allowed_ips: Option<String>,
    /// Whether the export is active.
    pub enabled: bool,
    /// Administrator who created it.
    pub created_by: Uuid,
    /// When it was created.
    pub created_at: DateTime<Utc>,
    /// When it was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to create a NAS share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNasShare {
    /// Export name.
    pub name: String,
    /// Absolute, already-validated path.
    pub path: String,
    /// Protocol.
    pub protocol: NasProtocol,
    /// Permission mode.
    pub permission: NasPermission,
    /// Description.
    pub description: Option<String>,
    /// Client allow-list.
    pub allowed_ips: Option<String>,
    /// Enabled flag.
    pub enabled: bool,
    /// Creating administrator.
    pub created_by: Uuid,
}

/// Partial update; `None` leaves a column unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNasShare {
    pub name: Option<String>,
    pub path: Option<String>,
    pub protocol: Option<NasProtocol>,
    pub permission: Option<NasPermission>,
    pub description: Option<String>,
    pub allowed_ips: Option<String>,
    pub enabled: Option<bool>,
}

impl UpdateNasShare {
    /// Whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.path.is_none()
            && self.protocol.is_none()
            && self.permission.is_none()
            && self.description.is_none()
            && self.allowed_ips.is_none()
            && self.enabled.is_none()
    }

    /// Apply the update onto an existing row.
    pub fn apply_to(&self, share: &mut NasShare) {
        if let Some(name) = &self.name {
            share.name = name.clone();
        }
        if let Some(path) = &self.path {
            share.path = path.clone();
        }
        if let Some(protocol) = self.protocol {
            share.protocol = protocol;
        }
        if let Some(permission) = self.permission {
            share.permission = permission;
        }
        if let Some(description) = &self.description {
            share.description = Some(description.clone());
        }
        if let Some(allowed_ips) = &self.allowed_ips {
            share.allowed_ips = Some(allowed_ips.clone());
        }
        if let Some(enabled) = self.enabled {
            share.enabled = enabled;
        }
        share.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_protocol_and_permission() {
        assert_eq!("smb".parse::<NasProtocol>().unwrap(), NasProtocol::Smb);
        assert_eq!("read-only".parse::<NasPermission>().unwrap(), NasPermission::ReadOnly);
        assert!("ftp".parse::<NasProtocol>().is_err());
    }

    #[test]
    fn test_apply_update() {
        let now = Utc::now();
        let mut share = NasShare {
            id: Uuid::new_v4(),
            name: "media".into(),
            path: "/data/storage/media".into(),
            protocol: NasProtocol::Nfs,
            permission: NasPermission::ReadWrite,
            description: None,
            allowed_ips: None,
            enabled: true,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
        };
        let update = UpdateNasShare {
            enabled: Some(false),
            permission: Some(NasPermission::ReadOnly),
            ..Default::default()
        };
        assert!(!update.is_empty());
        update.apply_to(&mut share);
        assert!(!share.enabled);
        assert_eq!(share.permission, NasPermission::ReadOnly);
        assert_eq!(share.name, "media");
    }
}
