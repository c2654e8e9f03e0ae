//! Algorithm identifier of a key info, read without touching the key bits

use crate::hash::HashAlgorithm;
use crate::key::KeyError;
use crate::oids;
use crate::signature::SignatureAlgorithm;

use const_oid::ObjectIdentifier;
use der::{Decode, Encode, Tag, Tagged};
use pkcs1::RsaPssParams;
use spki::SubjectPublicKeyInfoRef;

/// Outer `AlgorithmIdentifier` of a `SubjectPublicKeyInfo`: OID and DER encoded parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKeyAlgorithm {
    oid: ObjectIdentifier,
    parameters: Option<Vec<u8>>,
}

impl PublicKeyAlgorithm {
    pub fn new(oid: ObjectIdentifier, parameters: Option<Vec<u8>>) -> Self {
        Self { oid, parameters }
    }

    pub fn from_spki_der(der: &[u8]) -> Result<Self, KeyError> {
        let spki = SubjectPublicKeyInfoRef::from_der(der)?;

        let parameters = spki
            .algorithm
            .parameters
            .filter(|any| any.tag() != Tag::Null)
            .map(|any| any.to_der())
            .transpose()
            .map_err(|e| KeyError::Asn1Serialization {
                element: "algorithm parameters",
                source: e,
            })?;

        Ok(Self {
            oid: spki.algorithm.oid,
            parameters,
        })
    }

    pub fn oid(&self) -> &ObjectIdentifier {
        &self.oid
    }

    /// DER encoded parameters. An explicit NULL is reported as absent.
    pub fn parameters(&self) -> Option<&[u8]> {
        self.parameters.as_deref()
    }

    /// Hash algorithm bound by RSASSA-PSS-params.
    ///
    /// `Ok(None)` when the key is not restricted to a hash (no parameters). A missing hash field
    /// means SHA-1, as in RFC 4055.
    pub fn pss_hash(&self) -> Result<Option<HashAlgorithm>, KeyError> {
        let Some(parameters) = self.parameters.as_deref() else {
            return Ok(None);
        };

        let pss = RsaPssParams::from_der(parameters).map_err(|e| KeyError::Asn1Deserialization {
            element: "RSASSA-PSS parameters",
            source: e,
        })?;

        let hash = HashAlgorithm::from_oid(&pss.hash.oid).ok_or_else(|| KeyError::UnsupportedAlgorithm {
            algorithm: pss.hash.oid.to_string(),
        })?;

        Ok(Some(hash))
    }

    /// RSA parameter rule: which RSA signature algorithms the identifier allows.
    ///
    /// - rsaEncryption: `rsa` and `rsa_pss_rsae_*`
    /// - id-ea-rsa: `rsa`
    /// - id-RSASSA-PSS: `rsa_pss_pss_*` whose hash matches the parameters (any when unrestricted)
    ///
    /// Non RSA identifiers allow nothing.
    pub fn allows_rsa_signature(&self, algorithm: SignatureAlgorithm) -> bool {
        match self.oid {
            oids::RSA_ENCRYPTION => algorithm == SignatureAlgorithm::Rsa || algorithm.is_rsa_pss_rsae(),
            oids::ID_EA_RSA => algorithm == SignatureAlgorithm::Rsa,
            oids::RSASSA_PSS if algorithm.is_rsa_pss_pss() => match self.pss_hash() {
                Ok(None) => true,
                Ok(Some(hash)) => algorithm.pss_hash() == Some(hash),
                Err(e) => {
                    log::debug!("RSASSA-PSS key with unusable parameters: {e}");
                    false
                }
            },
            _ => false,
        }
    }
}
