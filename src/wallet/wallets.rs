use crate::error::{BlockchainError, Result};
use crate::wallet::Wallet;
use data_encoding::HEXLOWER;
use log::info;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const WALLET_EXTENSION: &str = "wallet";
pub const DEFAULT_WALLET_NAME: &str = "default";
#[cfg(unix)]
const KEY_FILE_MODE: u32 = 0o600;

/// Named wallet key files inside a data directory.
///
/// Each file holds the hex-encoded PKCS#8 private key; the public key and
/// address are derived again on load.
pub struct Wallets {
    dir: PathBuf,
}

impl Wallets {
    pub fn new(dir: impl AsRef<Path>) -> Wallets {
        Wallets {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn wallet_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{WALLET_EXTENSION}"))
    }

    /// `Ok(None)` when no key file exists under that name
    pub fn load(&self, name: &str) -> Result<Option<Wallet>> {
        let path = self.wallet_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)?;
        let pkcs8 = HEXLOWER.decode(contents.trim().as_bytes()).map_err(|e| {
            BlockchainError::Wallet(format!("Corrupt wallet file {}: {e}", path.display()))
        })?;
        Wallet::from_pkcs8(&pkcs8).map(Some)
    }

    pub fn create(&self, name: &str) -> Result<Wallet> {
        let wallet = Wallet::generate()?;
        self.save(name, &wallet)?;
        info!("Created wallet '{name}' with address {}", wallet.get_address());
        Ok(wallet)
    }

    pub fn load_or_create(&self, name: &str) -> Result<Wallet> {
        match self.load(name)? {
            Some(wallet) => {
                info!("Loaded wallet '{name}' from {}", self.wallet_path(name).display());
                Ok(wallet)
            }
            None => self.create(name),
        }
    }

    /// Key files are readable by the owner only on unix
    pub fn save(&self, name: &str, wallet: &Wallet) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let mut options = OpenOptions::new();
        options.create(true).truncate(true).write(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(KEY_FILE_MODE);
        }
        let file = options.open(self.wallet_path(name))?;
        let mut writer = BufWriter::new(file);
        writer.write_all(HEXLOWER.encode(wallet.get_pkcs8()).as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_wallet_loads_as_none() {
        let dir = tempdir().unwrap();
        let wallets = Wallets::new(dir.path());
        assert!(wallets.load("nobody").unwrap().is_none());
    }

    #[test]
    fn test_create_then_load() {
        let dir = tempdir().unwrap();
        let wallets = Wallets::new(dir.path());

        let created = wallets.create(DEFAULT_WALLET_NAME).unwrap();
        let loaded = wallets.load(DEFAULT_WALLET_NAME).unwrap().unwrap();
        assert_eq!(created.get_address(), loaded.get_address());
    }

    #[test]
    fn test_load_or_create_is_stable() {
        let dir = tempdir().unwrap();
        let wallets = Wallets::new(dir.path().join("nested"));

        let first = wallets.load_or_create("miner").unwrap();
        let second = wallets.load_or_create("miner").unwrap();
        assert_eq!(first.get_address(), second.get_address());
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let wallets = Wallets::new(dir.path());
        wallets.create("private").unwrap();

        let mode = fs::metadata(wallets.wallet_path("private"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, KEY_FILE_MODE);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempdir().unwrap();
        let wallets = Wallets::new(dir.path());
        fs::write(wallets.wallet_path("bad"), "zz-not-hex").unwrap();

        assert!(matches!(
            wallets.load("bad"),
            Err(BlockchainError::Wallet(_))
        ));
    }
}
