//! Finite field keys: DSA (RFC 3279) and Diffie-Hellman (ANSI X9.42, PKCS #3)

use crate::key::KeyError;

use der::asn1::{AnyRef, BitStringRef, UintRef};
use der::{Decode, Sequence, Tag, Tagged};
use num_bigint_dig::BigUint;

/// `Dss-Parms ::= SEQUENCE { p INTEGER, q INTEGER, g INTEGER }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct DssParms<'a> {
    pub p: UintRef<'a>,
    pub q: UintRef<'a>,
    pub g: UintRef<'a>,
}

/// `ValidationParms ::= SEQUENCE { seed BIT STRING, pgenCounter INTEGER }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct ValidationParms<'a> {
    pub seed: BitStringRef<'a>,
    pub pgen_counter: UintRef<'a>,
}

/// X9.42 `DomainParameters ::= SEQUENCE { p, g, q, j OPTIONAL, validationParms OPTIONAL }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct DomainParameters<'a> {
    pub p: UintRef<'a>,
    pub g: UintRef<'a>,
    pub q: UintRef<'a>,
    pub j: Option<UintRef<'a>>,
    pub validation_parms: Option<ValidationParms<'a>>,
}

/// PKCS #3 `DHParameter ::= SEQUENCE { prime, base, privateValueLength INTEGER OPTIONAL }`
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub(crate) struct DhParameter<'a> {
    pub prime: UintRef<'a>,
    pub base: UintRef<'a>,
    pub private_value_length: Option<UintRef<'a>>,
}

/// DSA domain parameters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DsaParameters {
    pub p: BigUint,
    pub q: BigUint,
    pub g: BigUint,
}

/// DSA public key.
///
/// RFC 3279 allows the domain parameters to be omitted and inherited from the issuer. Raw keys have
/// no issuer, so such a key is accepted but can't verify signatures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DsaPublicKey {
    pub parameters: Option<DsaParameters>,
    pub y: BigUint,
}

/// Diffie-Hellman public key, from either an X9.42 or a PKCS #3 key info
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DhPublicKey {
    pub p: BigUint,
    pub g: BigUint,
    /// Subgroup order, only carried by X9.42 parameters
    pub q: Option<BigUint>,
    pub y: BigUint,
}

fn to_biguint(value: UintRef<'_>) -> BigUint {
    BigUint::from_bytes_be(value.as_bytes())
}

fn public_value(bits: &[u8], element: &'static str) -> Result<BigUint, KeyError> {
    let y = UintRef::from_der(bits).map_err(|e| KeyError::Asn1Deserialization { element, source: e })?;
    Ok(to_biguint(y))
}

fn present(parameters: Option<AnyRef<'_>>) -> Option<AnyRef<'_>> {
    parameters.filter(|any| any.tag() != Tag::Null)
}

pub(crate) fn parse_dsa(parameters: Option<AnyRef<'_>>, bits: &[u8]) -> Result<DsaPublicKey, KeyError> {
    let parameters = match present(parameters) {
        Some(any) => {
            let parms = any
                .decode_as::<DssParms<'_>>()
                .map_err(|e| KeyError::Asn1Deserialization {
                    element: "DSA parameters",
                    source: e,
                })?;

            Some(DsaParameters {
                p: to_biguint(parms.p),
                q: to_biguint(parms.q),
                g: to_biguint(parms.g),
            })
        }
        None => None,
    };

    let y = public_value(bits, "DSA public key")?;

    Ok(DsaPublicKey { parameters, y })
}

pub(crate) fn parse_x942_dh(parameters: Option<AnyRef<'_>>, bits: &[u8]) -> Result<DhPublicKey, KeyError> {
    let any = present(parameters).ok_or_else(|| KeyError::Dh {
        context: "X9.42 key info without domain parameters".to_owned(),
    })?;
    let parms = any
        .decode_as::<DomainParameters<'_>>()
        .map_err(|e| KeyError::Asn1Deserialization {
            element: "X9.42 domain parameters",
            source: e,
        })?;

    Ok(DhPublicKey {
        p: to_biguint(parms.p),
        g: to_biguint(parms.g),
        q: Some(to_biguint(parms.q)),
        y: public_value(bits, "DH public key")?,
    })
}

pub(crate) fn parse_pkcs3_dh(parameters: Option<AnyRef<'_>>, bits: &[u8]) -> Result<DhPublicKey, KeyError> {
    let any = present(parameters).ok_or_else(|| KeyError::Dh {
        context: "PKCS #3 key info without DH parameters".to_owned(),
    })?;
    let parms = any
        .decode_as::<DhParameter<'_>>()
        .map_err(|e| KeyError::Asn1Deserialization {
            element: "PKCS #3 DH parameters",
            source: e,
        })?;

    Ok(DhPublicKey {
        p: to_biguint(parms.prime),
        g: to_biguint(parms.base),
        q: None,
        y: public_value(bits, "DH public key")?,
    })
}
