//! A `TxFetcher` backed by a block explorer, with a flat-file cache in
//! front of it.
//!
//! Checks a `cache_dir/<txid>` file before falling back to a live HTTP GET
//! against blockstream.info, and asserts the returned transaction actually
//! hashes to the txid it was fetched for.

use std::fs;
use std::path::{Path, PathBuf};

use satoshi_core::tx::{Tx, TxFetcher};
use satoshi_core::{Error, Net, Result};

/// Fetches previously-broadcast transactions over HTTP, caching each raw
/// hex body on disk under `cache_dir/<txid>` so repeat lookups (and repeat
/// runs) never re-fetch the same transaction.
pub struct CachingHttpFetcher {
    cache_dir: PathBuf,
    client: reqwest::blocking::Client,
}

impl CachingHttpFetcher {
    pub fn new(cache_dir: impl Into<PathBuf>) -> CachingHttpFetcher {
        CachingHttpFetcher { cache_dir: cache_dir.into(), client: reqwest::blocking::Client::new() }
    }

    fn cache_path(&self, txid: &str) -> PathBuf {
        self.cache_dir.join(txid)
    }

    fn api_url(txid: &str, net: Net) -> String {
        match net {
            Net::Main => format!("https://blockstream.info/api/tx/{txid}/hex"),
            Net::Test => format!("https://blockstream.info/testnet/api/tx/{txid}/hex"),
        }
    }

    fn read_cached(path: &Path) -> Option<String> {
        fs::read_to_string(path).ok().map(|s| s.trim().to_string())
    }

    fn fetch_live(&self, txid: &str, net: Net) -> Result<String> {
        let url = Self::api_url(txid, net);
        let response = self.client.get(&url).send().map_err(|e| Error::FetchError {
            txid: txid.to_string(),
            reason: format!("request to {url} failed: {e}"),
        })?;
        let status = response.status();
        let body = response.text().map_err(|e| Error::FetchError {
            txid: txid.to_string(),
            reason: format!("reading response body failed: {e}"),
        })?;
        if !status.is_success() {
            return Err(Error::FetchError {
                txid: txid.to_string(),
                reason: format!("{url} returned {status}: {body}"),
            });
        }
        Ok(body.trim().to_string())
    }
}

impl Default for CachingHttpFetcher {
    fn default() -> CachingHttpFetcher {
        CachingHttpFetcher::new("txdb")
    }
}

impl TxFetcher for CachingHttpFetcher {
    fn fetch(&self, txid: &str, net: Net) -> Result<Tx> {
        let path = self.cache_path(txid);
        let raw_hex = match Self::read_cached(&path) {
            Some(hex) => {
                log::debug!("cache hit for {txid}");
                hex
            }
            None => {
                log::debug!("cache miss for {txid}, fetching from block explorer");
                let hex = self.fetch_live(txid, net)?;
                if let Some(parent) = path.parent() {
                    let _ = fs::create_dir_all(parent);
                }
                if let Err(e) = fs::write(&path, &hex) {
                    log::warn!("failed to cache {txid}: {e}");
                }
                hex
            }
        };

        let bytes = hex::decode(raw_hex.trim()).map_err(|e| Error::FetchError {
            txid: txid.to_string(),
            reason: format!("cached body was not valid hex: {e}"),
        })?;
        let tx = Tx::decode(&bytes)?;

        let actual_id = tx.id(self, net)?;
        if actual_id != txid {
            return Err(Error::FetchError {
                txid: txid.to_string(),
                reason: format!("fetched transaction hashes to {actual_id}, not the requested txid"),
            });
        }
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satoshi_core::keys::{PublicKey, SecretKey};
    use satoshi_core::script::Script;
    use satoshi_core::tx::{TxIn, TxOut};
    use std::io::Write;

    // A minimal, self-contained legacy transaction: its single input's
    // script_sig is never substituted (encode() without a sig_index never
    // calls the fetcher), so it decodes and hashes to an id without needing
    // its own previous output to exist anywhere.
    fn sample_tx_hex_and_id() -> (String, String) {
        let sk = SecretKey::from_bytes(&[7u8; 32]).unwrap();
        let pk = PublicKey::from_secret_key(&sk);
        let tx_in = TxIn {
            prev_tx: [0x11; 32],
            prev_index: 0,
            script_sig: Script::default(),
            sequence: 0xffff_ffff,
            witness: None,
        };
        let tx_out = TxOut { amount: 1_000, script_pubkey: Script::p2pkh(pk.pkhash(true)) };
        let tx = Tx { version: 1, tx_ins: vec![tx_in], tx_outs: vec![tx_out], locktime: 0, segwit: false };
        let fetcher = CachingHttpFetcher::default();
        let raw_hex = hex::encode(tx.encode(&fetcher, Net::Main).unwrap());
        let txid = tx.id(&fetcher, Net::Main).unwrap();
        (raw_hex, txid)
    }

    #[test]
    fn fetch_reads_from_cache_without_hitting_the_network() {
        let dir = tempfile::tempdir().unwrap();
        let (raw_hex, txid) = sample_tx_hex_and_id();

        let mut file = fs::File::create(dir.path().join(&txid)).unwrap();
        file.write_all(raw_hex.as_bytes()).unwrap();

        let fetcher = CachingHttpFetcher::new(dir.path());
        let tx = fetcher.fetch(&txid, Net::Main).unwrap();
        assert_eq!(tx.tx_outs[0].amount, 1_000);
    }

    #[test]
    fn fetch_rejects_a_cached_body_under_the_wrong_txid() {
        let dir = tempfile::tempdir().unwrap();
        let (raw_hex, _txid) = sample_tx_hex_and_id();

        let wrong_txid = "00".repeat(32);
        let mut file = fs::File::create(dir.path().join(&wrong_txid)).unwrap();
        file.write_all(raw_hex.as_bytes()).unwrap();

        let fetcher = CachingHttpFetcher::new(dir.path());
        assert!(fetcher.fetch(&wrong_txid, Net::Main).is_err());
    }
}
