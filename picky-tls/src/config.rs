//! Certificate type preferences

use crate::certificate_type::{CertificateType, CertificateTypeList};
use crate::negotiation::CertificateRole;
use serde::{Deserialize, Deserializer, Serialize};

/// Supported certificate types per role, most preferred first.
///
/// A missing or empty list means X.509 only, and nothing is sent on the wire for that role.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateTypeConfig {
    /// Types accepted for the client certificate
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_configured_list"
    )]
    pub client_certificate_types: Option<CertificateTypeList>,
    /// Types accepted for the server certificate
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_configured_list"
    )]
    pub server_certificate_types: Option<CertificateTypeList>,
}

impl CertificateTypeConfig {
    pub fn x509_only() -> Self {
        Self::default()
    }

    pub fn raw_public_key_only() -> Self {
        Self {
            client_certificate_types: Some(CertificateTypeList::raw_public_key_only()),
            server_certificate_types: Some(CertificateTypeList::raw_public_key_only()),
        }
    }

    pub fn prefer_raw_public_key() -> Self {
        Self {
            client_certificate_types: Some(CertificateTypeList::prefer_raw_public_key()),
            server_certificate_types: Some(CertificateTypeList::prefer_raw_public_key()),
        }
    }

    pub fn certificate_types(&self, role: CertificateRole) -> Option<&CertificateTypeList> {
        match role {
            CertificateRole::Client => self.client_certificate_types.as_ref(),
            CertificateRole::Server => self.server_certificate_types.as_ref(),
        }
    }
}

fn deserialize_configured_list<'de, D>(deserializer: D) -> Result<Option<CertificateTypeList>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Vec<CertificateType>>::deserialize(deserializer)? {
        Some(types) => CertificateTypeList::from_configured(types).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}
