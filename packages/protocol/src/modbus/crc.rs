use bytes::BufMut;

/// Reflected form of the Modbus polynomial 0x8005.
const POLY_REFLECTED: u16 = 0xA001;

const fn crc_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut index = 0;
    while index < 256 {
        let mut crc = index as u16;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLY_REFLECTED
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[index] = crc;
        index += 1;
    }
    table
}

static CRC_TABLE: [u16; 256] = crc_table();

/// CRC-16/MODBUS: init 0xFFFF, reflected in and out, no final xor.
pub fn crc16_modbus(data: &[u8]) -> u16 {
    data.iter().fold(0xFFFF, |crc, &byte| {
        (crc >> 8) ^ CRC_TABLE[((crc ^ byte as u16) & 0xFF) as usize]
    })
}

/// Recompute the checksum of `body` and compare it with the received one.
pub fn verify_crc(body: &[u8], received: u16) -> bool {
    crc16_modbus(body) == received
}

/// Append the checksum of everything already in `buf`, low byte first.
pub fn append_crc<B: BufMut + AsRef<[u8]>>(buf: &mut B) {
    let crc = crc16_modbus(buf.as_ref());
    buf.put_u16_le(crc);
}
