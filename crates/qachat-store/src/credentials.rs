use colored::Colorize;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use qachat_types::{validate_username, Account, AuthError};

use crate::error::{RegisterError, StoreError};
use crate::fs_utils::write_atomic;

const KEY_COLUMN: &str = "username";
const HEADER: [&str; 3] = ["username", "email", "password_hash"];

/// Hex-encoded SHA-256 digest of a password
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Username → account mapping backed by a CSV file
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    accounts: BTreeMap<String, Account>,
}

impl CredentialStore {
    /// Open the store at `path`, loading whatever is already there
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let accounts = Self::load(&path)?;
        Ok(Self { path, accounts })
    }

    /// Read every account from `path`.
    ///
    /// A missing file is an empty store. A file without a `username` column
    /// is reported on stderr and also treated as empty.
    pub fn load(path: &Path) -> Result<BTreeMap<String, Account>, StoreError> {
        match Self::read_accounts(path) {
            Err(err @ StoreError::MalformedStoreFile { .. }) => {
                eprintln!(
                    "{} {}. Starting with no accounts.",
                    "⚠️".yellow(),
                    err.to_string().yellow()
                );
                Ok(BTreeMap::new())
            }
            other => other,
        }
    }

    fn read_accounts(path: &Path) -> Result<BTreeMap<String, Account>, StoreError> {
        let mut accounts = BTreeMap::new();

        if !path.exists() {
            return Ok(accounts);
        }

        let bytes = fs::read(path).map_err(|e| StoreError::io(path, e))?;
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(accounts);
        }

        let mut reader = ReaderBuilder::new()
            .trim(Trim::Headers)
            .from_reader(bytes.as_slice());
        let headers = reader
            .headers()
            .map_err(|e| StoreError::csv(path, e))?
            .clone();
        if !headers.iter().any(|h| h == KEY_COLUMN) {
            return Err(StoreError::MalformedStoreFile {
                path: path.to_path_buf(),
                column: KEY_COLUMN,
            });
        }

        for record in reader.deserialize::<Account>() {
            let account = record.map_err(|e| StoreError::csv(path, e))?;
            accounts.insert(account.username.clone(), account);
        }

        Ok(accounts)
    }

    /// Rewrite the backing file with the full mapping
    pub fn save(&self) -> Result<(), StoreError> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());

        writer
            .write_record(HEADER)
            .map_err(|e| StoreError::csv(&self.path, e))?;
        for account in self.accounts.values() {
            writer
                .serialize(account)
                .map_err(|e| StoreError::csv(&self.path, e))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| StoreError::io(&self.path, e.into_error()))?;
        write_atomic(&self.path, &bytes)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, username: &str) -> bool {
        self.accounts.contains_key(username)
    }

    pub fn get(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username)
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// True when `username` exists and `password` hashes to its stored digest
    pub fn verify(&self, username: &str, password: &str) -> bool {
        self.authenticate(username, password).is_ok()
    }

    /// Look up `username` and check `password` against it
    pub fn authenticate(&self, username: &str, password: &str) -> Result<&Account, AuthError> {
        let account = self
            .accounts
            .get(username)
            .ok_or_else(|| AuthError::UnknownUsername(username.to_string()))?;

        let digest = hash_password(password);
        if digest.as_bytes() == account.password_hash.trim().to_ascii_lowercase().as_bytes() {
            Ok(account)
        } else {
            Err(AuthError::WrongPassword)
        }
    }

    /// Create an account and persist the whole store.
    ///
    /// On any error the store is left exactly as it was, in memory and on disk.
    pub fn register(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Account, RegisterError> {
        validate_username(username)?;
        if self.contains(username) {
            return Err(AuthError::DuplicateUsername(username.to_string()).into());
        }

        let account = Account {
            username: username.to_string(),
            email: email.trim().to_string(),
            password_hash: hash_password(password),
        };
        self.accounts.insert(username.to_string(), account.clone());

        if let Err(e) = self.save() {
            self.accounts.remove(username);
            return Err(e.into());
        }
        Ok(account)
    }
}
