//! HDF5 metadata checksum: Bob Jenkins' lookup3 `hashlittle`.
//!
//! Superblocks v2/v3 and v2 object headers carry this checksum over the
//! bytes that precede it.

use byteorder::{ByteOrder, LittleEndian};

/// Compute the lookup3 checksum of `data` with an initial value of 0,
/// matching `H5_checksum_lookup3(data, len, 0)`.
pub fn jenkins_lookup3(data: &[u8]) -> u32 {
    hashlittle(data, 0)
}

fn mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *a = a.wrapping_sub(*c); *a ^= c.rotate_left(4);  *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a); *b ^= a.rotate_left(6);  *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b); *c ^= b.rotate_left(8);  *b = b.wrapping_add(*a);
    *a = a.wrapping_sub(*c); *a ^= c.rotate_left(16); *c = c.wrapping_add(*b);
    *b = b.wrapping_sub(*a); *b ^= a.rotate_left(19); *a = a.wrapping_add(*c);
    *c = c.wrapping_sub(*b); *c ^= b.rotate_left(4);  *b = b.wrapping_add(*a);
}

fn final_mix(a: &mut u32, b: &mut u32, c: &mut u32) {
    *c ^= *b; *c = c.wrapping_sub(b.rotate_left(14));
    *a ^= *c; *a = a.wrapping_sub(c.rotate_left(11));
    *b ^= *a; *b = b.wrapping_sub(a.rotate_left(25));
    *c ^= *b; *c = c.wrapping_sub(b.rotate_left(16));
    *a ^= *c; *a = a.wrapping_sub(c.rotate_left(4));
    *b ^= *a; *b = b.wrapping_sub(a.rotate_left(14));
    *c ^= *b; *c = c.wrapping_sub(b.rotate_left(24));
}

fn hashlittle(data: &[u8], initval: u32) -> u32 {
    let seed = 0xdead_beefu32
        .wrapping_add(data.len() as u32)
        .wrapping_add(initval);
    let (mut a, mut b, mut c) = (seed, seed, seed);

    let mut rest = data;
    while rest.len() > 12 {
        a = a.wrapping_add(LittleEndian::read_u32(&rest[0..4]));
        b = b.wrapping_add(LittleEndian::read_u32(&rest[4..8]));
        c = c.wrapping_add(LittleEndian::read_u32(&rest[8..12]));
        mix(&mut a, &mut b, &mut c);
        rest = &rest[12..];
    }

    if rest.is_empty() {
        return c;
    }

    // The reference tail switch adds the trailing bytes little-endian into
    // a, b, c; zero padding to a full block is equivalent.
    let mut tail = [0u8; 12];
    tail[..rest.len()].copy_from_slice(rest);
    a = a.wrapping_add(LittleEndian::read_u32(&tail[0..4]));
    b = b.wrapping_add(LittleEndian::read_u32(&tail[4..8]));
    c = c.wrapping_add(LittleEndian::read_u32(&tail[8..12]));
    final_mix(&mut a, &mut b, &mut c);
    c
}
