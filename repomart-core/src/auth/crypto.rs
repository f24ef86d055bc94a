use argon2::{
    Algorithm, Argon2, Params, ParamsBuilder, Version,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use password_hash::Error as PasswordHashError;
use rand::{TryRngCore, rngs::OsRng};
use sha2::Sha256;
use thiserror::Error;
use zeroize::Zeroizing;

/// Cryptographic helper for account credentials and session tokens.
///
/// - Argon2id for password hashing with a server-side pepper.
/// - HMAC-SHA-256 for hashing opaque session tokens before persistence, so a
///   database leak does not expose usable cookies.
#[derive(Debug)]
pub struct AuthCrypto {
    argon2: Argon2<'static>,
    password_pepper: Zeroizing<Vec<u8>>,
    token_hmac_key: Zeroizing<Vec<u8>>,
}

#[derive(Debug, Error)]
pub enum AuthCryptoError {
    #[error("password pepper must not be empty")]
    EmptyPasswordPepper,
    #[error("token HMAC key must not be empty")]
    EmptyTokenKey,
    #[error("invalid Argon2 parameters: {0}")]
    InvalidArgon2Params(String),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
    #[error("random source unavailable: {0}")]
    Random(String),
}

impl From<PasswordHashError> for AuthCryptoError {
    fn from(err: PasswordHashError) -> Self {
        AuthCryptoError::PasswordHash(err.to_string())
    }
}

impl AuthCrypto {
    const DEFAULT_MEMORY_KIB: u32 = 64 * 1024; // 64 MiB
    const DEFAULT_ITERATIONS: u32 = 3;
    const DEFAULT_PARALLELISM: u32 = 1;
    const SALT_LENGTH: usize = password_hash::Salt::RECOMMENDED_LENGTH;
    const SESSION_TOKEN_BYTES: usize = 32;

    /// Build a helper with default Argon2id parameters.
    pub fn new(
        password_pepper: impl AsRef<[u8]>,
        token_hmac_key: impl AsRef<[u8]>,
    ) -> Result<Self, AuthCryptoError> {
        Self::with_params(
            password_pepper,
            token_hmac_key,
            ParamsBuilder::new()
                .m_cost(Self::DEFAULT_MEMORY_KIB)
                .t_cost(Self::DEFAULT_ITERATIONS)
                .p_cost(Self::DEFAULT_PARALLELISM)
                .output_len(32)
                .build()
                .map_err(|err| {
                    AuthCryptoError::InvalidArgon2Params(err.to_string())
                })?,
        )
    }

    /// Minimal Argon2 cost for tests and the in-memory development backend.
    pub fn lightweight(
        password_pepper: impl AsRef<[u8]>,
        token_hmac_key: impl AsRef<[u8]>,
    ) -> Result<Self, AuthCryptoError> {
        let params = Params::new(Params::MIN_M_COST, 1, 1, Some(32))
            .map_err(|err| {
                AuthCryptoError::InvalidArgon2Params(err.to_string())
            })?;
        Self::with_params(password_pepper, token_hmac_key, params)
    }

    pub fn with_params(
        password_pepper: impl AsRef<[u8]>,
        token_hmac_key: impl AsRef<[u8]>,
        params: Params,
    ) -> Result<Self, AuthCryptoError> {
        let pepper = password_pepper.as_ref();
        if pepper.is_empty() {
            return Err(AuthCryptoError::EmptyPasswordPepper);
        }

        let key = token_hmac_key.as_ref();
        if key.is_empty() {
            return Err(AuthCryptoError::EmptyTokenKey);
        }

        let argon2 =
            Argon2::new(Algorithm::Argon2id, Version::default(), params);

        Ok(Self {
            argon2,
            password_pepper: Zeroizing::new(pepper.to_vec()),
            token_hmac_key: Zeroizing::new(key.to_vec()),
        })
    }

    /// Hash a password with a random salt and the shared pepper. The
    /// resulting PHC string is suitable for storage.
    pub fn hash_password(
        &self,
        password: &str,
    ) -> Result<String, AuthCryptoError> {
        let material = self.peppered(password);

        let mut salt_bytes = [0u8; Self::SALT_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|err| AuthCryptoError::Random(err.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(AuthCryptoError::from)?;
        let hash = self.argon2.hash_password(&material, &salt)?.to_string();
        Ok(hash)
    }

    pub fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthCryptoError> {
        let parsed = PasswordHash::new(password_hash)?;
        let material = self.peppered(password);
        Ok(self.argon2.verify_password(&material, &parsed).is_ok())
    }

    /// Fresh opaque session token (URL-safe base64, 256 bits).
    pub fn generate_session_token(&self) -> Result<String, AuthCryptoError> {
        let mut bytes = Zeroizing::new([0u8; Self::SESSION_TOKEN_BYTES]);
        OsRng
            .try_fill_bytes(&mut bytes[..])
            .map_err(|err| AuthCryptoError::Random(err.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(&bytes[..]))
    }

    /// HMAC-SHA-256 of a bearer token, hex encoded for storage.
    pub fn hash_token(&self, token: &str) -> String {
        type HmacSha256 = Hmac<Sha256>;

        let mut mac = HmacSha256::new_from_slice(&self.token_hmac_key)
            .expect("HMAC-SHA-256 accepts keys of any size");
        mac.update(token.as_bytes());

        hex::encode(mac.finalize().into_bytes())
    }

    fn peppered(&self, password: &str) -> Zeroizing<Vec<u8>> {
        let mut material = Zeroizing::new(Vec::with_capacity(
            password.len() + self.password_pepper.len(),
        ));
        material.extend_from_slice(password.as_bytes());
        material.extend_from_slice(&self.password_pepper);
        material
    }
}
