use super::*;
use crate::cell::{CellBuilder, HashBytes};

fn sample_tree() -> Cell {
    let mut leaf = CellBuilder::new();
    leaf.store_u256(&HashBytes([0x55; 32])).unwrap();
    let leaf = leaf.build().unwrap();

    let mut middle = CellBuilder::new();
    middle.store_small_uint(0b101, 3).unwrap();
    middle.store_reference(leaf.clone()).unwrap();
    let middle = middle.build().unwrap();

    let mut root = CellBuilder::new();
    root.store_u64(0xdeadbeef).unwrap();
    root.store_reference(middle).unwrap();
    root.store_reference(leaf).unwrap();
    root.build().unwrap()
}

#[test]
fn encode_known_single_cell() {
    let mut builder = CellBuilder::new();
    builder.store_raw(&[0xbd, 0xb7, 0x80], 17).unwrap();
    let cell = builder.build().unwrap();

    assert_eq!(Boc::encode_base64(&cell), "te6ccgEBAQEABQAABb23wA==");
    assert_eq!(Boc::encode_hex(&cell), "b5ee9c72010101010005000005bdb7c0");
}

#[test]
fn boc_with_crc() {
    let cell = sample_tree();

    let boc_without_crc = Boc::encode(&cell);
    let mut boc_with_crc = Boc::encode_with_crc(&cell);
    assert_eq!(boc_without_crc.len() + 4, boc_with_crc.len());

    let decoded = Boc::decode(&boc_with_crc).unwrap();
    assert_eq!(decoded, cell);

    let last_byte = boc_with_crc.last_mut().unwrap();
    *last_byte = !*last_byte;

    assert!(matches!(
        Boc::decode(&boc_with_crc),
        Err(de::Error::InvalidChecksum)
    ));
}

#[test]
fn dedup_identical_cells() {
    let cell = sample_tree();

    let boc = Boc::encode(&cell);
    let header = de::BocHeader::decode(&boc, &de::Options::exact(1)).unwrap();
    // root, middle and a single shared leaf
    assert_eq!(header.cells().len(), 3);
    assert_eq!(header.roots(), &[0]);
}

#[test]
fn pair_round_trip() {
    let first = sample_tree();
    let second = CellBuilder::build_from(123u32).unwrap();

    let boc = Boc::encode_pair((&first, &second));
    let (decoded1, decoded2) = Boc::decode_pair(&boc).unwrap();
    assert_eq!(decoded1, first);
    assert_eq!(decoded2, second);

    assert!(matches!(
        Boc::decode(&boc),
        Err(de::Error::TooManyRootCells)
    ));
}

#[test]
fn malformed_input() {
    assert!(matches!(Boc::decode([]), Err(de::Error::UnexpectedEof)));
    assert!(matches!(
        Boc::decode([0xde, 0xad, 0xbe, 0xef, 0x01, 0x01]),
        Err(de::Error::UnknownBocTag)
    ));

    let boc = Boc::encode(sample_tree());
    for len in 0..boc.len() {
        assert!(Boc::decode(&boc[..len]).is_err());
    }
}

#[test]
fn exotic_cells_rejected() {
    // Library cell: d1 = 0x08 (exotic), 264 bits of data
    let mut boc = hex::decode("b5ee9c7201010101002300").unwrap();
    boc.extend_from_slice(&[0x08, 0x42, 0x02]);
    boc.extend_from_slice(&[0xaa; 32]);

    assert!(matches!(
        Boc::decode(&boc),
        Err(de::Error::ExoticCellsNotSupported)
    ));
}

#[derive(serde::Serialize, serde::Deserialize)]
struct SerdeWithHashBytes {
    some_hash: HashBytes,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct SerdeWithCellContainer {
    #[serde(with = "Boc")]
    some_cell: Cell,
}

#[test]
fn hex_bytes() {
    let hash = HashBytes(rand::random());

    let test = format!(r#"{{"some_hash":"{hash}"}}"#);
    let SerdeWithHashBytes { some_hash } = serde_json::from_str(&test).unwrap();
    assert_eq!(some_hash, hash);

    let serialized = serde_json::to_string(&SerdeWithHashBytes { some_hash }).unwrap();
    assert_eq!(serialized, test);
}

#[test]
fn struct_with_cell() {
    let cell = sample_tree();
    let boc = Boc::encode_base64(&cell);

    let test = format!(r#"{{"some_cell":"{boc}"}}"#);
    let SerdeWithCellContainer { some_cell } = serde_json::from_str(&test).unwrap();
    assert_eq!(some_cell, cell);

    let serialized = serde_json::to_string(&SerdeWithCellContainer { some_cell }).unwrap();
    assert_eq!(serialized, test);
}

#[test]
fn boc_repr_requires_full_consumption() {
    let boc = BocRepr::encode(0x1_0000_0002u64).unwrap();
    assert_eq!(BocRepr::decode::<u64, _>(&boc).unwrap(), 0x1_0000_0002);

    let err = BocRepr::decode::<u32, _>(&boc).unwrap_err();
    assert_eq!(err.kind, CodecErrorKind::TypeMismatch);
}
