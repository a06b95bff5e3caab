// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::{CredentialError, SessionState};

/// Known users and the SHA-256 digest of each password.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    users: BTreeMap<String, [u8; 32]>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Granted,
    RedirectToLogin,
}

impl Credentials {
    /// Accepts lowercase or uppercase hex digests.
    pub fn from_hex<'a>(
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, CredentialError> {
        let mut users = BTreeMap::new();
        for (user, hex) in entries {
            let digest = decode_digest(hex).ok_or_else(|| CredentialError::InvalidDigest {
                user: user.to_owned(),
            })?;
            users.insert(user.to_owned(), digest);
        }
        Ok(Self { users })
    }

    pub fn with_password(mut self, user: &str, password: &str) -> Self {
        self.users.insert(user.to_owned(), digest(password));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Constant-time with respect to the password digest. Unknown users
    /// still hash and compare against a dummy digest.
    pub fn verify(&self, user: &str, password: &str) -> bool {
        let candidate = digest(password);
        let (expected, known) = match self.users.get(user) {
            Some(digest) => (*digest, true),
            None => ([0; 32], false),
        };
        let matches = constant_time_eq(&candidate, &expected);
        known && matches
    }

    /// Checks the password and flips the session's login flag.
    pub fn login(&self, session: &mut SessionState, user: &str, password: &str) -> bool {
        let ok = self.verify(user, password);
        if ok {
            tracing::info!(user, "login succeeded");
            session.logged_in = true;
            session.user = Some(user.to_owned());
        } else {
            tracing::warn!(user, "login failed");
            session.logged_in = false;
            session.user = None;
        }
        ok
    }
}

pub fn password_digest_hex(password: &str) -> String {
    let mut output = String::with_capacity(64);
    for byte in Sha256::digest(password) {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}

/// Every protected page runs only behind this check.
pub fn guard(session: &SessionState) -> Access {
    if session.logged_in {
        Access::Granted
    } else {
        Access::RedirectToLogin
    }
}

fn digest(password: &str) -> [u8; 32] {
    let mut output = [0_u8; 32];
    output.copy_from_slice(&Sha256::digest(password));
    output
}

fn constant_time_eq(left: &[u8; 32], right: &[u8; 32]) -> bool {
    left.iter()
        .zip(right)
        .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

fn decode_digest(hex: &str) -> Option<[u8; 32]> {
    let hex = hex.trim();
    if hex.len() != 64 || !hex.is_ascii() {
        return None;
    }
    let mut digest = [0_u8; 32];
    for (index, byte) in digest.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[index * 2..index * 2 + 2], 16).ok()?;
    }
    Some(digest)
}
