/// Internet checksum (RFC 1071) over `buffer`.
///
/// Words are read big-endian and a trailing odd byte is padded with a zero byte, so the
/// result belongs in the packet in network byte order. Re-running the checksum over a
/// buffer that carries its correct checksum yields `0`.
pub fn checksum(buffer: &[u8]) -> u16 {
    let mut words = buffer.chunks_exact(2);
    let mut sum: u32 = words
        .by_ref()
        .map(|word| u32::from(u16::from_be_bytes([word[0], word[1]])))
        .fold(0, u32::wrapping_add);
    if let [last] = words.remainder() {
        sum = sum.wrapping_add(u32::from(*last) << 8);
    }
    while sum >> 16 != 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    #[allow(clippy::cast_possible_truncation)] // folded into 16 bits above
    let folded = sum as u16;
    !folded
}
