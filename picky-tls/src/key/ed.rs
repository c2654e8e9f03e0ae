use crate::key::KeyError;

pub(crate) const ED25519_KEY_SIZE: usize = ed25519_dalek::PUBLIC_KEY_LENGTH;
pub(crate) const ED448_KEY_SIZE: usize = 57;

/// Ed448 public key (RFC 8032 encoding).
///
/// Only its size is checked: no Ed448 arithmetic is available, so such keys can be selected
/// but not used to verify signatures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ed448PublicKey([u8; ED448_KEY_SIZE]);

impl Ed448PublicKey {
    pub fn as_bytes(&self) -> &[u8; ED448_KEY_SIZE] {
        &self.0
    }
}

pub(crate) fn ed25519_from_bytes(bytes: &[u8]) -> Result<ed25519_dalek::VerifyingKey, KeyError> {
    let bytes: &[u8; ED25519_KEY_SIZE] = bytes.try_into().map_err(|_| KeyError::ED {
        context: format!(
            "Ed25519 public key must be {ED25519_KEY_SIZE} bytes long, got {}",
            bytes.len()
        ),
    })?;

    ed25519_dalek::VerifyingKey::from_bytes(bytes).map_err(|e| KeyError::ED {
        context: format!("invalid Ed25519 public key: {e}"),
    })
}

pub(crate) fn ed448_from_bytes(bytes: &[u8]) -> Result<Ed448PublicKey, KeyError> {
    let bytes: [u8; ED448_KEY_SIZE] = bytes.try_into().map_err(|_| KeyError::ED {
        context: format!("Ed448 public key must be {ED448_KEY_SIZE} bytes long, got {}", bytes.len()),
    })?;

    Ok(Ed448PublicKey(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng as _;

    #[test]
    fn ed25519_key_size_is_checked() {
        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(1);
        let signing_key = ed25519_dalek::SigningKey::generate(&mut rng);
        let public = signing_key.verifying_key();

        let parsed = ed25519_from_bytes(public.as_bytes()).unwrap();
        assert_eq!(parsed, public);

        let err = ed25519_from_bytes(&public.as_bytes()[..31]).unwrap_err();
        assert_eq!(err.to_string(), "ED error: Ed25519 public key must be 32 bytes long, got 31");
    }

    #[test]
    fn ed448_key_size_is_checked() {
        let key = ed448_from_bytes(&[0x42; 57]).unwrap();
        assert_eq!(key.as_bytes(), &[0x42; 57]);
        assert!(ed448_from_bytes(&[0x42; 56]).is_err());
    }
}
