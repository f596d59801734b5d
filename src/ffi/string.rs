use libduckdb_sys::duckdb_string_t;

/// Decode a DuckDB string value into an owned `String`, replacing invalid
/// UTF-8 sequences.
///
/// # Safety
///
/// `s` must be a non-NULL row of a `VARCHAR` vector that DuckDB keeps alive
/// for the current invocation. Check row validity before calling.
pub unsafe fn decode_duckdb_string(s: &duckdb_string_t) -> String {
    // SAFETY: every representation starts with the length field.
    let len = unsafe { s.value.inlined.length } as usize;
    if len == 0 {
        return String::new();
    }

    let bytes = if len <= 12 {
        // SAFETY: strings up to 12 bytes are stored inline.
        let inlined = unsafe { &s.value.inlined.inlined };
        // SAFETY: the first `len` inline bytes are initialized.
        unsafe { std::slice::from_raw_parts(inlined.as_ptr() as *const u8, len) }
    } else {
        // SAFETY: longer strings point at `len` bytes owned by the vector.
        unsafe { std::slice::from_raw_parts(s.value.pointer.ptr as *const u8, len) }
    };
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use libduckdb_sys::{
        duckdb_string_t__bindgen_ty_1, duckdb_string_t__bindgen_ty_1__bindgen_ty_1,
        duckdb_string_t__bindgen_ty_1__bindgen_ty_2,
    };
    use std::os::raw::c_char;

    fn inlined(bytes: &[u8]) -> duckdb_string_t {
        let mut inlined = [0 as c_char; 12];
        for (dst, src) in inlined.iter_mut().zip(bytes.iter().copied()) {
            *dst = src as c_char;
        }
        duckdb_string_t {
            value: duckdb_string_t__bindgen_ty_1 {
                inlined: duckdb_string_t__bindgen_ty_1__bindgen_ty_2 {
                    length: bytes.len() as u32,
                    inlined,
                },
            },
        }
    }

    fn pointer(bytes: &mut [u8]) -> duckdb_string_t {
        let mut prefix = [0 as c_char; 4];
        for (dst, src) in prefix.iter_mut().zip(bytes.iter().copied()) {
            *dst = src as c_char;
        }
        duckdb_string_t {
            value: duckdb_string_t__bindgen_ty_1 {
                pointer: duckdb_string_t__bindgen_ty_1__bindgen_ty_1 {
                    length: bytes.len() as u32,
                    prefix,
                    ptr: bytes.as_mut_ptr() as *mut c_char,
                },
            },
        }
    }

    #[test]
    fn test_decode_inlined_fen_fragment() {
        let input = inlined(b"8/8/8/8");
        // SAFETY: fixture is a valid inlined string.
        assert_eq!(unsafe { decode_duckdb_string(&input) }, "8/8/8/8");
    }

    #[test]
    fn test_decode_empty() {
        let input = inlined(b"");
        // SAFETY: fixture is a valid inlined string.
        assert_eq!(unsafe { decode_duckdb_string(&input) }, "");
    }

    #[test]
    fn test_decode_pointer_video_url() {
        let mut backing = b"https://youtu.be/abcdefghijk".to_vec();
        let input = pointer(backing.as_mut_slice());
        // SAFETY: backing outlives the decode.
        assert_eq!(
            unsafe { decode_duckdb_string(&input) },
            "https://youtu.be/abcdefghijk"
        );
    }

    #[test]
    fn test_decode_pointer_invalid_utf8_is_lossy() {
        let mut backing = b"rnbqkbnr/pppppppp".to_vec();
        backing[2] = 0xff;
        let expected = String::from_utf8_lossy(&backing).into_owned();
        let input = pointer(backing.as_mut_slice());
        // SAFETY: backing outlives the decode.
        assert_eq!(unsafe { decode_duckdb_string(&input) }, expected);
    }
}
