//! Certificate type negotiation (RFC 7250 §4)
//!
//! Each handshake negotiates two independent roles: the type of the client certificate and the
//! type of the server certificate. For each role, the offering side sends its supported list and
//! the selecting side picks the first type of that list it also supports. A role resolves once.

use crate::alert::{AlertDescription, TlsFatalAlert};
use crate::certificate_type::{
    self, CertificateType, CertificateTypeList, CLIENT_CERTIFICATE_TYPE_EXTENSION, SERVER_CERTIFICATE_TYPE_EXTENSION,
};
use crate::config::CertificateTypeConfig;
use std::fmt;

/// Certificate whose type is being negotiated
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CertificateRole {
    Client,
    Server,
}

impl CertificateRole {
    pub fn extension_type(self) -> u16 {
        match self {
            Self::Client => CLIENT_CERTIFICATE_TYPE_EXTENSION,
            Self::Server => SERVER_CERTIFICATE_TYPE_EXTENSION,
        }
    }
}

impl fmt::Display for CertificateRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Client => write!(f, "client_certificate_type"),
            Self::Server => write!(f, "server_certificate_type"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NegotiationState {
    Unresolved,
    Resolved(CertificateType),
    Rejected,
}

/// Negotiation of a single role
#[derive(Debug, Clone)]
pub struct CertificateTypeNegotiation {
    role: CertificateRole,
    local: CertificateTypeList,
    peer_offer: Option<Vec<CertificateType>>,
    state: NegotiationState,
}

impl CertificateTypeNegotiation {
    /// `local` is the supported list for this role; `None` means X.509 only.
    pub fn new(role: CertificateRole, local: Option<CertificateTypeList>) -> Self {
        Self {
            role,
            local: local.unwrap_or_else(CertificateTypeList::x509_only),
            peer_offer: None,
            state: NegotiationState::Unresolved,
        }
    }

    pub fn role(&self) -> CertificateRole {
        self.role
    }

    pub fn local(&self) -> &CertificateTypeList {
        &self.local
    }

    /// Types offered by the peer, `None` if it didn't send the extension.
    pub fn peer_offer(&self) -> Option<&[CertificateType]> {
        self.peer_offer.as_deref()
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn resolved(&self) -> Option<CertificateType> {
        match self.state {
            NegotiationState::Resolved(certificate_type) => Some(certificate_type),
            _ => None,
        }
    }

    /// Offer to send for this role, if any.
    ///
    /// An X.509 only list is the implicit default and is never sent.
    pub fn offer_extension(&self) -> Option<Vec<u8>> {
        self.local.has_non_x509().then(|| self.local.encode_offer())
    }

    /// Selecting side: resolves the role from the peer's offer.
    ///
    /// No offer means X.509. Otherwise the first offered type in the peer's order that is also
    /// supported locally wins, and having none in common is fatal.
    pub fn select(&mut self, peer_offer: Option<&[CertificateType]>) -> Result<CertificateType, TlsFatalAlert> {
        self.ensure_unresolved()?;
        self.peer_offer = peer_offer.map(<[CertificateType]>::to_vec);

        let Some(offer) = peer_offer else {
            log::debug!("{}: peer sent no offer, using X.509", self.role);
            return Ok(self.resolve(CertificateType::X509));
        };

        match offer.iter().copied().find(|offered| self.local.contains(*offered)) {
            Some(selected) => {
                log::debug!("{}: selected {selected} from peer offer {offer:?}", self.role);
                Ok(self.resolve(selected))
            }
            None => Err(self.reject(format!(
                "no common type between peer offer {offer:?} and supported {:?}",
                self.local.as_slice()
            ))),
        }
    }

    /// [`Self::select`] from the raw extension data.
    pub fn select_from_extension(&mut self, data: Option<&[u8]>) -> Result<CertificateType, TlsFatalAlert> {
        let offer = data
            .map(certificate_type::decode_offer)
            .transpose()
            .map_err(|e| {
                log::warn!("{}: malformed offer: {e}", self.role);
                TlsFatalAlert::with_source(AlertDescription::DecodeError, e)
            })?;

        self.select(offer.as_deref())
    }

    /// Selection to echo back, only when the peer sent an offer.
    pub fn selection_extension(&self) -> Option<[u8; 1]> {
        match (&self.peer_offer, self.state) {
            (Some(_), NegotiationState::Resolved(selected)) => Some(certificate_type::encode_selection(selected)),
            _ => None,
        }
    }

    /// Offering side: resolves the role from the peer's echoed selection.
    ///
    /// A missing echo means X.509. The selected type must be one this side offered.
    pub fn process_selection(&mut self, echoed: Option<&[u8]>) -> Result<CertificateType, TlsFatalAlert> {
        self.ensure_unresolved()?;

        let selected = match echoed {
            Some(_) if !self.local.has_non_x509() => {
                self.state = NegotiationState::Rejected;
                log::warn!("{}: peer echoed a selection nothing was offered for", self.role);
                return Err(AlertDescription::UnsupportedExtension.into());
            }
            Some(data) => certificate_type::decode_selection(data).map_err(|e| {
                self.state = NegotiationState::Rejected;
                log::warn!("{}: invalid selection: {e}", self.role);
                let description = match e {
                    certificate_type::CertificateTypeError::UnknownCode { .. } => {
                        AlertDescription::UnsupportedCertificate
                    }
                    _ => AlertDescription::DecodeError,
                };
                TlsFatalAlert::with_source(description, e)
            })?,
            None => CertificateType::X509,
        };

        if !self.local.contains(selected) {
            return Err(self.reject(format!(
                "peer selected {selected}, supported {:?}",
                self.local.as_slice()
            )));
        }

        log::debug!("{}: peer selected {selected}", self.role);
        Ok(self.resolve(selected))
    }

    fn ensure_unresolved(&self) -> Result<(), TlsFatalAlert> {
        if self.state == NegotiationState::Unresolved {
            Ok(())
        } else {
            log::warn!("{}: already negotiated ({:?})", self.role, self.state);
            Err(AlertDescription::InternalError.into())
        }
    }

    fn resolve(&mut self, certificate_type: CertificateType) -> CertificateType {
        self.state = NegotiationState::Resolved(certificate_type);
        certificate_type
    }

    fn reject(&mut self, context: String) -> TlsFatalAlert {
        self.state = NegotiationState::Rejected;
        log::warn!("{}: {context}", self.role);
        AlertDescription::UnsupportedCertificate.into()
    }
}

/// Both roles of one handshake
#[derive(Debug, Clone)]
pub struct CertificateTypeNegotiator {
    client: CertificateTypeNegotiation,
    server: CertificateTypeNegotiation,
}

impl CertificateTypeNegotiator {
    pub fn new(config: &CertificateTypeConfig) -> Self {
        Self {
            client: CertificateTypeNegotiation::new(CertificateRole::Client, config.client_certificate_types.clone()),
            server: CertificateTypeNegotiation::new(CertificateRole::Server, config.server_certificate_types.clone()),
        }
    }

    pub fn role(&self, role: CertificateRole) -> &CertificateTypeNegotiation {
        match role {
            CertificateRole::Client => &self.client,
            CertificateRole::Server => &self.server,
        }
    }

    pub fn role_mut(&mut self, role: CertificateRole) -> &mut CertificateTypeNegotiation {
        match role {
            CertificateRole::Client => &mut self.client,
            CertificateRole::Server => &mut self.server,
        }
    }

    /// Offers to send, as `(extension type, data)` pairs.
    pub fn offer_extensions(&self) -> Vec<(u16, Vec<u8>)> {
        [&self.client, &self.server]
            .into_iter()
            .filter_map(|negotiation| {
                negotiation
                    .offer_extension()
                    .map(|data| (negotiation.role.extension_type(), data))
            })
            .collect()
    }

    /// Selections to echo, as `(extension type, data)` pairs.
    pub fn selection_extensions(&self) -> Vec<(u16, Vec<u8>)> {
        [&self.client, &self.server]
            .into_iter()
            .filter_map(|negotiation| {
                negotiation
                    .selection_extension()
                    .map(|data| (negotiation.role.extension_type(), data.to_vec()))
            })
            .collect()
    }
}

/// Outcome of picking the local client credential once the client certificate type is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClientCertificate<T> {
    /// A credential of the negotiated type
    Present(T),
    /// No credential of the negotiated type: the client authenticates anonymously
    Anonymous,
}

impl<T> ClientCertificate<T> {
    /// First candidate whose type is `negotiated`, or anonymous.
    pub fn choose<'a, I>(
        negotiated: CertificateType,
        candidates: I,
        certificate_type: impl Fn(&T) -> CertificateType,
    ) -> ClientCertificate<&'a T>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        candidates
            .into_iter()
            .find(|candidate| certificate_type(*candidate) == negotiated)
            .map_or(ClientCertificate::Anonymous, ClientCertificate::Present)
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }
}
