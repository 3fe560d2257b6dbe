//! Bitcoin transactions: legacy and segwit wire codec, sighash preimage
//! construction, fee/coinbase helpers, and P2PKH validation.
//!
//! Previous-output lookups go through `TxFetcher`, an explicit trait
//! object: every method that needs a previous output takes `&dyn
//! TxFetcher` rather than reaching for a hidden global cache.

use crate::hash::hash256;
use crate::script::{Script, SIGHASH_ALL};
use crate::varint;
use crate::{Error, Net, Result};

/// A single witness stack item: either pushed bytes, or the bare integer
/// `0` (an empty push encoded as a zero-length varint with no payload,
/// distinguished here from a zero-length byte string so the wire encoding
/// round-trips exactly).
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WitnessItem {
    Item(Vec<u8>),
    Zero,
}

/// A collaborator able to look up a previously-broadcast transaction by
/// id, standing in for the external block-explorer/node query every
/// previous-output-dependent operation below needs. See `satoshi-wallet`
/// for the HTTP-backed implementation used outside tests.
pub trait TxFetcher {
    fn fetch(&self, txid: &str, net: Net) -> Result<Tx>;
}

/// A trivial in-memory `TxFetcher` for tests and CLI use that never needs
/// live network access.
#[derive(Default, Clone)]
pub struct MapFetcher(pub std::collections::HashMap<String, Tx>);

impl TxFetcher for MapFetcher {
    fn fetch(&self, txid: &str, _net: Net) -> Result<Tx> {
        self.0.get(txid).cloned().ok_or_else(|| Error::FetchError {
            txid: txid.to_string(),
            reason: "not present in MapFetcher".to_string(),
        })
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxIn {
    /// Display order: matches what block explorers and `id()` print.
    pub prev_tx: [u8; 32],
    pub prev_index: u32,
    pub script_sig: Script,
    pub sequence: u32,
    pub witness: Option<Vec<WitnessItem>>,
}

impl TxIn {
    fn decode(r: &mut impl std::io::Read) -> Result<TxIn> {
        let mut prev_tx = [0u8; 32];
        prev_tx.copy_from_slice(&varint::read_reversed(r, 32)?);
        let prev_index = varint::read_u32_le(r)?;
        let script_sig = Script::decode(r)?;
        let sequence = varint::read_u32_le(r)?;
        Ok(TxIn { prev_tx, prev_index, script_sig, sequence, witness: None })
    }

    /// `None` = encode the real `script_sig`. `Some(true)` = substitute the
    /// referenced output's `script_pubkey` (the input being signed).
    /// `Some(false)` = substitute an empty script (every other input, while
    /// building the sighash preimage).
    fn encode(&self, script_override: Option<bool>, fetcher: &dyn TxFetcher, net: Net) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut prev_tx_wire = self.prev_tx;
        prev_tx_wire.reverse();
        out.extend_from_slice(&prev_tx_wire);
        out.extend_from_slice(&self.prev_index.to_le_bytes());

        let script_bytes = match script_override {
            None => self.script_sig.encode()?,
            Some(true) => {
                let prev = fetcher.fetch(&hex::encode(self.prev_tx), net)?;
                prev.tx_outs[self.prev_index as usize].script_pubkey.encode()?
            }
            Some(false) => Script::default().encode()?,
        };
        out.extend_from_slice(&script_bytes);
        out.extend_from_slice(&self.sequence.to_le_bytes());
        Ok(out)
    }

    pub fn value(&self, fetcher: &dyn TxFetcher, net: Net) -> Result<u64> {
        let prev = fetcher.fetch(&hex::encode(self.prev_tx), net)?;
        Ok(prev.tx_outs[self.prev_index as usize].amount)
    }

    pub fn script_pubkey(&self, fetcher: &dyn TxFetcher, net: Net) -> Result<Script> {
        let prev = fetcher.fetch(&hex::encode(self.prev_tx), net)?;
        Ok(prev.tx_outs[self.prev_index as usize].script_pubkey.clone())
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxOut {
    pub amount: u64,
    pub script_pubkey: Script,
}

impl TxOut {
    fn decode(r: &mut impl std::io::Read) -> Result<TxOut> {
        let amount = varint::read_u64_le(r)?;
        let script_pubkey = Script::decode(r)?;
        Ok(TxOut { amount, script_pubkey })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut out = self.amount.to_le_bytes().to_vec();
        out.extend_from_slice(&self.script_pubkey.encode()?);
        Ok(out)
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tx {
    pub version: i32,
    pub tx_ins: Vec<TxIn>,
    pub tx_outs: Vec<TxOut>,
    pub locktime: u32,
    pub segwit: bool,
}

impl Tx {
    /// Decodes a transaction, detecting the segwit marker/flag pair
    /// (`0x00 0x01` immediately after an input count of zero).
    pub fn decode(bytes: &[u8]) -> Result<Tx> {
        let mut r = varint::cursor(bytes);
        let version = varint::read_i32_le(&mut r)?;

        let mut num_inputs = varint::read(&mut r)?;
        let mut segwit = false;
        if num_inputs == 0 {
            let flag = varint::read_bytes(&mut r, 1)?;
            if flag != [0x01] {
                return Err(Error::MalformedEncoding("bad segwit flag byte".into()));
            }
            num_inputs = varint::read(&mut r)?;
            segwit = true;
        }

        let mut tx_ins = Vec::with_capacity(num_inputs as usize);
        for _ in 0..num_inputs {
            tx_ins.push(TxIn::decode(&mut r)?);
        }

        let num_outputs = varint::read(&mut r)?;
        let mut tx_outs = Vec::with_capacity(num_outputs as usize);
        for _ in 0..num_outputs {
            tx_outs.push(TxOut::decode(&mut r)?);
        }

        if segwit {
            for tx_in in tx_ins.iter_mut() {
                let num_items = varint::read(&mut r)?;
                let mut items = Vec::with_capacity(num_items as usize);
                for _ in 0..num_items {
                    let item_len = varint::read(&mut r)?;
                    if item_len == 0 {
                        items.push(WitnessItem::Zero);
                    } else {
                        items.push(WitnessItem::Item(varint::read_bytes(&mut r, item_len as usize)?));
                    }
                }
                tx_in.witness = Some(items);
            }
        }

        let locktime = varint::read_u32_le(&mut r)?;
        Ok(Tx { version, tx_ins, tx_outs, locktime, segwit })
    }

    /// Encodes this transaction. `sig_index = Some(i)` produces the
    /// sighash preimage for input `i`: the to-be-signed input's
    /// `script_sig` is replaced by its referenced output's
    /// `script_pubkey`, every other input's `script_sig` is emptied,
    /// witness data and the segwit marker/flag are dropped, and a
    /// trailing 4-byte little-endian `SIGHASH_ALL` is appended.
    fn encode_with(&self, sig_index: Option<usize>, fetcher: &dyn TxFetcher, net: Net) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());

        let force_legacy = sig_index.is_some();
        if self.segwit && !force_legacy {
            out.extend_from_slice(&[0x00, 0x01]);
        }

        out.extend_from_slice(&varint::write(self.tx_ins.len() as u64));
        for (i, tx_in) in self.tx_ins.iter().enumerate() {
            let override_for = sig_index.map(|idx| idx == i);
            out.extend_from_slice(&tx_in.encode(override_for, fetcher, net)?);
        }

        out.extend_from_slice(&varint::write(self.tx_outs.len() as u64));
        for tx_out in &self.tx_outs {
            out.extend_from_slice(&tx_out.encode()?);
        }

        if self.segwit && !force_legacy {
            for tx_in in &self.tx_ins {
                let items = tx_in.witness.as_deref().unwrap_or(&[]);
                out.extend_from_slice(&varint::write(items.len() as u64));
                for item in items {
                    match item {
                        WitnessItem::Zero => out.extend_from_slice(&varint::write(0)),
                        WitnessItem::Item(bytes) => {
                            out.extend_from_slice(&varint::write(bytes.len() as u64));
                            out.extend_from_slice(bytes);
                        }
                    }
                }
            }
        }

        out.extend_from_slice(&self.locktime.to_le_bytes());
        if let Some(_) = sig_index {
            out.extend_from_slice(&(SIGHASH_ALL as u32).to_le_bytes());
        }
        Ok(out)
    }

    /// Plain wire encoding (no sighash substitution).
    pub fn encode(&self, fetcher: &dyn TxFetcher, net: Net) -> Result<Vec<u8>> {
        self.encode_with(None, fetcher, net)
    }

    /// `hash256` of the force-legacy encoding, byte-reversed, hex.
    pub fn id(&self, fetcher: &dyn TxFetcher, net: Net) -> Result<String> {
        let legacy = self.encode_legacy_only()?;
        let _ = (fetcher, net); // id never needs a previous-output lookup
        let mut digest = hash256(&legacy);
        digest.reverse();
        Ok(hex::encode(digest))
    }

    /// The force-legacy encoding used by `id()`: it never substitutes any
    /// script, so it needs no `TxFetcher` at all.
    fn encode_legacy_only(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&varint::write(self.tx_ins.len() as u64));
        for tx_in in &self.tx_ins {
            let mut prev_tx_wire = tx_in.prev_tx;
            prev_tx_wire.reverse();
            out.extend_from_slice(&prev_tx_wire);
            out.extend_from_slice(&tx_in.prev_index.to_le_bytes());
            out.extend_from_slice(&tx_in.script_sig.encode()?);
            out.extend_from_slice(&tx_in.sequence.to_le_bytes());
        }
        out.extend_from_slice(&varint::write(self.tx_outs.len() as u64));
        for tx_out in &self.tx_outs {
            out.extend_from_slice(&tx_out.encode()?);
        }
        out.extend_from_slice(&self.locktime.to_le_bytes());
        Ok(out)
    }

    /// The preimage signed (after hashing with `hash256`) to authorize
    /// input `sig_index`.
    pub fn sighash_preimage(&self, sig_index: usize, fetcher: &dyn TxFetcher, net: Net) -> Result<Vec<u8>> {
        self.encode_with(Some(sig_index), fetcher, net)
    }

    /// `sum(input values) - sum(output amounts)`.
    pub fn fee(&self, fetcher: &dyn TxFetcher, net: Net) -> Result<i64> {
        let mut input_total: i64 = 0;
        for tx_in in &self.tx_ins {
            input_total += tx_in.value(fetcher, net)? as i64;
        }
        let output_total: i64 = self.tx_outs.iter().map(|o| o.amount as i64).sum();
        Ok(input_total - output_total)
    }

    /// `true` if the fee is non-negative and every input's combined
    /// `script_sig ++ script_pubkey` evaluates successfully against this
    /// transaction's sighash preimage. Segwit transactions are rejected
    /// outright (BIP-143 verification is out of scope).
    pub fn validate(&self, fetcher: &dyn TxFetcher, net: Net) -> Result<bool> {
        if self.segwit {
            log::debug!("rejecting segwit transaction: segwit validation is out of scope");
            return Ok(false);
        }
        if self.fee(fetcher, net)? < 0 {
            log::debug!("rejecting transaction with negative fee");
            return Ok(false);
        }
        for (i, tx_in) in self.tx_ins.iter().enumerate() {
            let preimage = self.sighash_preimage(i, fetcher, net)?;
            let script_pubkey = tx_in.script_pubkey(fetcher, net)?;
            let combined = tx_in.script_sig.clone().concat(script_pubkey);
            if !combined.evaluate(&preimage)? {
                log::debug!("rejecting transaction: input {i} failed script evaluation");
                return Ok(false);
            }
        }
        Ok(true)
    }

    pub fn is_coinbase(&self) -> bool {
        self.tx_ins.len() == 1
            && self.tx_ins[0].prev_tx == [0u8; 32]
            && self.tx_ins[0].prev_index == 0xffff_ffff
    }

    /// The block height committed to in a coinbase's `script_sig` per
    /// BIP-0034 (a little-endian integer pushed as the first command).
    pub fn coinbase_height(&self) -> Option<u32> {
        if !self.is_coinbase() {
            return None;
        }
        match self.tx_ins[0].script_sig.0.first() {
            Some(crate::script::Command::Element(bytes)) => {
                let mut padded = [0u8; 4];
                padded[..bytes.len().min(4)].copy_from_slice(&bytes[..bytes.len().min(4)]);
                Some(u32::from_le_bytes(padded))
            }
            _ => None,
        }
    }
}
