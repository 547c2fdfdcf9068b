/// Zero the 16 bit word at word offset `location`, compute the internet
/// checksum over `data` and store it back into that word (big endian).
#[allow(clippy::double_parens)] // For stylistic reasons
pub fn set_checksum(data: &mut [u8], location: usize) {
    data[location*2    ] = 0;
    data[location*2 + 1] = 0;

    let sum = checksum(data);
    data[location*2    ] = ((sum & 0xFF00) >> 8) as u8;
    data[location*2 + 1] = ((sum & 0x00FF)     ) as u8;
}

/// One's complement of the one's complement sum of `data` (RFC 1071).
/// Running it over a packet that already carries a valid checksum gives 0.
pub fn checksum(data: &[u8]) -> u16 {
    let mut sum = sum_be_words(data);
    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xFFFF);
    }

    !sum as u16 // The checksum field should be the ones complement of the sum
}

/// Sum all words (16 bit chunks) in the given data. Each word is treated as
/// big endian; an odd trailing byte is padded with a zero octet.
fn sum_be_words(data: &[u8]) -> u32 {
    data.chunks(2)
        .map(|word| match *word {
            [w] => u16::from_be_bytes([w, 0]),
            [wh, wl] => u16::from_be_bytes([wh, wl]),
            _ => unreachable!(),
        })
        .fold(0, |sum, w| sum.wrapping_add(w as u32))
}
