//! Tests for multi-chain key derivation

use ton_wallet::crypto::keys::wif::{decode_wif, encode_wif};
use ton_wallet::crypto::keys::VersionBytes;
use ton_wallet::crypto::{derive_multi_chain, recover_from_input, KeyInput};
use ton_wallet::Error;

const KEY_ONE: &str = "0000000000000000000000000000000000000000000000000000000000000001";
const KEY_TWO: &str = "e8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35";

#[test]
fn test_raw_hex_input() {
    let keys = derive_multi_chain(Some(KEY_ONE)).unwrap();

    assert_eq!(keys.btc.address.as_deref(), Some("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"));
    assert_eq!(keys.btc.private_key, "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn");

    assert_eq!(keys.flo.address.as_deref(), Some("FGWP1xKhDP5RmV525TmUoEwX9mTZwp3sJn"));
    assert_eq!(keys.flo.private_key, "R7WnCJjdY4LQqMAD9MLZmNRPZpkL5DCVY1YFD3US2zr1uTVbv7Sr");

    assert_eq!(keys.ton.address.as_deref(), Some("UQAkxuybaeBflbgYW3vgQvcFgyAQVcLtXZwdrpeLNqzZ0xDZ"));
    assert_eq!(
        keys.ton.private_key,
        format!("{}4cb5abf6ad79fbf5abbccafcc269d85cd2651ed4b885b5869f241aedf0a5ba29", KEY_ONE)
    );
}

#[test]
fn test_second_vector() {
    let keys = derive_multi_chain(Some(KEY_TWO)).unwrap();

    assert_eq!(keys.btc.address.as_deref(), Some("bc1qx3ppj0smkuy3d6g525sh9n2w9k7fm7q3x30rtg"));
    assert_eq!(keys.btc.private_key, "L52XzL2cMkHxqxBXRyEpnPQZGUs3uKiL3R11XbAdHigRzDozKZeW");
    assert_eq!(keys.flo.address.as_deref(), Some("FAbRnPTjfBEN8jyvaZHYvKjj3E6JxMgkB4"));
    assert_eq!(keys.flo.private_key, "RFKbzye6V8Mmx4eQnd45eUibygtt7yCmjsoa7VHwUU4Lqojknunf");
    assert_eq!(keys.ton.address.as_deref(), Some("UQACVOqeA_zElJy0McYNsYPW515SbYo51MyRdGdCFxZRXJNU"));
}

#[test]
fn test_128_hex_uses_first_half() {
    let long = format!("{}{}", KEY_ONE, KEY_TWO);
    assert_eq!(KeyInput::classify(Some(&long)), KeyInput::RawHex(KEY_ONE));
    assert_eq!(derive_multi_chain(Some(&long)).unwrap(), derive_multi_chain(Some(KEY_ONE)).unwrap());
}

#[test]
fn test_input_classification() {
    assert_eq!(KeyInput::classify(None), KeyInput::Random);
    assert_eq!(KeyInput::classify(Some("")), KeyInput::Random);
    assert_eq!(KeyInput::classify(Some(KEY_ONE)), KeyInput::RawHex(KEY_ONE));
    // hex of any other length is not a raw key
    assert_eq!(KeyInput::classify(Some("abcd")), KeyInput::Wif("abcd"));
    let wif = "KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn";
    assert_eq!(KeyInput::classify(Some(wif)), KeyInput::Wif(wif));
}

#[test]
fn test_wif_input() {
    // Any WIF version recovers the same secret
    let from_btc = derive_multi_chain(Some("KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWn")).unwrap();
    let from_flo = derive_multi_chain(Some("R7WnCJjdY4LQqMAD9MLZmNRPZpkL5DCVY1YFD3US2zr1uTVbv7Sr")).unwrap();
    let from_hex = derive_multi_chain(Some(KEY_ONE)).unwrap();

    assert_eq!(from_btc, from_hex);
    assert_eq!(from_flo, from_hex);
}

#[test]
fn test_uncompressed_wif_input() {
    let keys = derive_multi_chain(Some("5HpHagT65TZzG1PH3CSu63k8DbpvD8s5ip4nEB3kEsreAnchuDf")).unwrap();

    assert_eq!(keys.flo.address.as_deref(), Some("FK7V2tq9AJFaYY7zBjoGjcaakQYiroFn5R"));
    assert_eq!(keys.btc.private_key, "5HpHagT65TZzG1PH3CSu63k8DbpvD8s5ip4nEB3kEsreAnchuDf");
    // segwit always uses the compressed key
    assert_eq!(keys.btc.address.as_deref(), Some("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"));
}

#[test]
fn test_wif_round_trip() {
    let secret: [u8; 32] = hex::decode(KEY_TWO).unwrap().try_into().unwrap();
    for compressed in [true, false] {
        let wif = encode_wif(&secret, VersionBytes::FLO.private_key, compressed);
        let decoded = decode_wif(&wif).unwrap();
        assert_eq!(decoded.secret, secret);
        assert_eq!(decoded.compressed, compressed);
    }
}

#[test]
fn test_btc_and_flo_addresses_differ() {
    let keys = derive_multi_chain(Some(KEY_TWO)).unwrap();
    assert_ne!(keys.btc.address, keys.flo.address);
    assert_ne!(keys.btc.private_key, keys.flo.private_key);

    // A later derivation is unaffected by earlier ones
    let again = derive_multi_chain(Some(KEY_ONE)).unwrap();
    assert_eq!(again.btc.address.as_deref(), Some("bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4"));
}

#[test]
fn test_random_key() {
    let keys = derive_multi_chain(None).unwrap();
    for chain in [&keys.btc, &keys.flo, &keys.ton] {
        assert!(chain.address.as_deref().is_some_and(|a| !a.is_empty()));
        assert!(!chain.private_key.is_empty());
    }
    assert_eq!(keys.ton.private_key.len(), 128);
    assert_ne!(keys, derive_multi_chain(Some("")).unwrap());
}

#[test]
fn test_malformed_wif() {
    let result = derive_multi_chain(Some("KwDiBf89QgGbjEhKnhXJuH7LrciVrZi3qYjgd9M7rFU73sVHnoWo"));
    assert!(matches!(result, Err(Error::InvalidWif(_))));

    let result = derive_multi_chain(Some("not a key"));
    assert!(matches!(result, Err(Error::InvalidWif(_))));
}

#[test]
fn test_recover_trims_input() {
    let padded = format!("  {}\n", KEY_ONE);
    assert_eq!(recover_from_input(&padded).unwrap(), derive_multi_chain(Some(KEY_ONE)).unwrap());
}

#[test]
fn test_serialized_shape() {
    let keys = derive_multi_chain(Some(KEY_ONE)).unwrap();
    let json = serde_json::to_value(&keys).unwrap();
    assert_eq!(json["BTC"]["address"], "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4");
    assert!(json["TON"]["privateKey"].is_string());
}
