//! End-to-end coverage spanning keys, addresses, scripts, transactions and
//! block headers together, exercising the same cross-module paths a real
//! caller (a wallet deriving an address, then later validating a spend)
//! would.

use satoshi_core::block::BlockHeader;
use satoshi_core::ecdsa;
use satoshi_core::keys::{address_to_pkhash, PublicKey, SecretKey};
use satoshi_core::script::Script;
use satoshi_core::tx::{MapFetcher, Tx, TxIn, TxOut};
use satoshi_core::Net;

#[test]
fn secret_key_derives_the_address_its_own_pkhash_decodes_to() {
    let sk = SecretKey::from_bytes(&[0x01; 32]).unwrap();
    let pk = PublicKey::from_secret_key(&sk);

    let address = pk.address(Net::Main, true);
    let recovered = address_to_pkhash(Net::Main, &address).unwrap();
    assert_eq!(recovered, pk.pkhash(true));
}

#[test]
fn an_address_minted_for_one_network_is_rejected_on_the_other() {
    let sk = SecretKey::from_bytes(&[0x02; 32]).unwrap();
    let pk = PublicKey::from_secret_key(&sk);
    let testnet_address = pk.address(Net::Test, true);
    assert!(address_to_pkhash(Net::Main, &testnet_address).is_err());
}

#[test]
fn a_transaction_spending_its_own_correctly_signed_p2pkh_output_validates() {
    let sk = SecretKey::from_bytes(&[0x03; 32]).unwrap();
    let pk = PublicKey::from_secret_key(&sk);
    let pkhash = pk.pkhash(true);

    let prev_tx = Tx {
        version: 1,
        tx_ins: vec![],
        tx_outs: vec![TxOut { amount: 5_000, script_pubkey: Script::p2pkh(pkhash) }],
        locktime: 0,
        segwit: false,
    };
    let prev_txid = prev_tx.id(&MapFetcher::default(), Net::Main).unwrap();

    let mut fetcher = MapFetcher::default();
    fetcher.0.insert(prev_txid.clone(), prev_tx);

    let mut prev_tx_bytes = [0u8; 32];
    prev_tx_bytes.copy_from_slice(&hex::decode(&prev_txid).unwrap());

    let spend = Tx {
        version: 1,
        tx_ins: vec![TxIn {
            prev_tx: prev_tx_bytes,
            prev_index: 0,
            script_sig: Script::default(),
            sequence: 0xffff_ffff,
            witness: None,
        }],
        tx_outs: vec![TxOut { amount: 4_500, script_pubkey: Script::p2pkh([0x09; 20]) }],
        locktime: 0,
        segwit: false,
    };

    let preimage = spend.sighash_preimage(0, &fetcher, Net::Main).unwrap();
    let signature = ecdsa::sign(&sk, &preimage);
    let mut sig_bytes = signature.encode();
    sig_bytes.push(satoshi_core::script::SIGHASH_ALL);

    let mut signed = spend;
    signed.tx_ins[0].script_sig = Script::new(vec![
        satoshi_core::script::Command::Element(sig_bytes),
        satoshi_core::script::Command::Element(pk.encode(true)),
    ]);

    assert_eq!(signed.fee(&fetcher, Net::Main).unwrap(), 500);
    assert!(signed.validate(&fetcher, Net::Main).unwrap());
}

#[test]
fn spending_with_the_wrong_key_fails_validation() {
    let sk = SecretKey::from_bytes(&[0x04; 32]).unwrap();
    let pk = PublicKey::from_secret_key(&sk);
    let wrong_sk = SecretKey::from_bytes(&[0x05; 32]).unwrap();
    let pkhash = pk.pkhash(true);

    let prev_tx = Tx {
        version: 1,
        tx_ins: vec![],
        tx_outs: vec![TxOut { amount: 1_000, script_pubkey: Script::p2pkh(pkhash) }],
        locktime: 0,
        segwit: false,
    };
    let prev_txid = prev_tx.id(&MapFetcher::default(), Net::Main).unwrap();
    let mut fetcher = MapFetcher::default();
    fetcher.0.insert(prev_txid.clone(), prev_tx);

    let mut prev_tx_bytes = [0u8; 32];
    prev_tx_bytes.copy_from_slice(&hex::decode(&prev_txid).unwrap());

    let spend = Tx {
        version: 1,
        tx_ins: vec![TxIn {
            prev_tx: prev_tx_bytes,
            prev_index: 0,
            script_sig: Script::default(),
            sequence: 0xffff_ffff,
            witness: None,
        }],
        tx_outs: vec![TxOut { amount: 900, script_pubkey: Script::p2pkh([0x0a; 20]) }],
        locktime: 0,
        segwit: false,
    };

    let preimage = spend.sighash_preimage(0, &fetcher, Net::Main).unwrap();
    let wrong_pk = PublicKey::from_secret_key(&wrong_sk);
    let signature = ecdsa::sign(&wrong_sk, &preimage);
    let mut sig_bytes = signature.encode();
    sig_bytes.push(satoshi_core::script::SIGHASH_ALL);

    let mut signed = spend;
    signed.tx_ins[0].script_sig = Script::new(vec![
        satoshi_core::script::Command::Element(sig_bytes),
        satoshi_core::script::Command::Element(wrong_pk.encode(true)),
    ]);

    assert!(!signed.validate(&fetcher, Net::Main).unwrap());
}

#[test]
fn mainnet_genesis_block_decodes_and_passes_pow() {
    let header = BlockHeader::decode(&Net::Main.genesis_header()).unwrap();
    assert_eq!(header.id(), "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f");
    assert!(header.validate_pow());
    assert_eq!(header.target(), satoshi_core::block::bits_to_target(&header.bits));
}

#[test]
fn retarget_then_decode_round_trips_through_bits() {
    let prev_bits: [u8; 4] = hex::decode("54d80118").unwrap().try_into().unwrap();
    let next_bits = satoshi_core::block::calculate_new_bits(&prev_bits, 302_400);
    assert_eq!(hex::encode(next_bits), "00157617");

    let mut header = BlockHeader::decode(&Net::Main.genesis_header()).unwrap();
    header.bits = next_bits;
    let re_encoded = header.encode();
    let re_decoded = BlockHeader::decode(&re_encoded).unwrap();
    assert_eq!(re_decoded.bits, next_bits);
}
