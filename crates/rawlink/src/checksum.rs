//! Internet checksum (RFC 1071).

/// Compute the one's-complement Internet checksum of `data`.
///
/// Words are read big-endian. An odd trailing byte is treated as if padded
/// with a zero byte.
pub fn checksum(data: &[u8]) -> u16 {
    let mut chunks = data.chunks_exact(2);
    let mut sum: u64 = chunks
        .by_ref()
        .map(|word| u64::from(u16::from_be_bytes([word[0], word[1]])))
        .sum();

    if let [last] = chunks.remainder() {
        sum += u64::from(*last) << 8;
    }

    while sum > 0xffff {
        sum = (sum >> 16) + (sum & 0xffff);
    }

    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroes() {
        assert_eq!(checksum(&[]), 0xffff);
        assert_eq!(checksum(&[0u8; 20]), 0xffff);
    }

    #[test]
    fn test_odd_length_is_zero_padded() {
        let odd = [0x12, 0x34, 0x56];
        let padded = [0x12, 0x34, 0x56, 0x00];
        assert_eq!(checksum(&odd), checksum(&padded));
        assert_ne!(checksum(&odd), 0);
    }

    #[test]
    fn test_rfc1071_example() {
        // Words 0001 f203 f4f5 f6f7 sum to 2ddf0, folded ddf2.
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(checksum(&data), !0xddf2);
    }

    #[test]
    fn test_carry_folds_repeatedly() {
        // 0xffff * 2 = 0x1fffe -> 0xffff after folding.
        assert_eq!(checksum(&[0xff, 0xff, 0xff, 0xff]), 0x0000);
    }

    #[test]
    fn test_known_ipv4_header() {
        // Classic example header from RFC 1071 discussions; checksum b861.
        let mut header = [
            0x45, 0x00, 0x00, 0x73, 0x00, 0x00, 0x40, 0x00, 0x40, 0x11, 0x00, 0x00, 0xc0, 0xa8,
            0x00, 0x01, 0xc0, 0xa8, 0x00, 0xc7,
        ];
        assert_eq!(checksum(&header), 0xb861);

        header[10..12].copy_from_slice(&0xb861u16.to_be_bytes());
        assert_eq!(checksum(&header), 0);
    }
}
