use heapless::String;

use uuid::Uuid;

/// AD types listing 128-bit service UUIDs (incomplete / complete).
const AD_INCOMPLETE_128: u8 = 0x06;
const AD_COMPLETE_128: u8 = 0x07;

/// Check if raw advertisement data lists `service` among its 128-bit UUIDs.
pub fn advertises_service(data: &[u8], service: &Uuid) -> bool {
    // 128-bit UUIDs go over the air least significant byte first.
    let wanted = service.as_u128().to_le_bytes();

    let mut i = 0;
    while i < data.len() {
        let len = data[i] as usize;
        if len == 0 || i + len >= data.len() {
            break;
        }
        let ad_type = data[i + 1];
        if ad_type == AD_INCOMPLETE_128 || ad_type == AD_COMPLETE_128 {
            let uuid_data = &data[i + 2..i + 1 + len];
            if uuid_data.chunks_exact(16).any(|chunk| chunk == wanted) {
                return true;
            }
        }
        i += len + 1;
    }
    false
}

/// Extract complete/shortened local name from advertisement data.
pub fn extract_device_name(data: &[u8]) -> String<32> {
    let mut i = 0;
    while i < data.len() {
        let len = data[i] as usize;
        if len == 0 || i + len >= data.len() {
            break;
        }
        let ad_type = data[i + 1];
        if ad_type == 0x08 || ad_type == 0x09 {
            let name_bytes = &data[i + 2..i + 1 + len];
            let mut name = String::new();
            for &b in name_bytes {
                if name.push(b as char).is_err() {
                    break;
                }
            }
            return name;
        }
        i += len + 1;
    }

    let mut s = String::new();
    let _ = s.push_str("Unknown");
    s
}
