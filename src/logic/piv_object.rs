//! Layout of the PIV certificate data object
//!
//! A stored certificate object is `70 L <DER cert> 71 01 <compression> FE 00`.
//! Objects written by other tools may hold the bare DER certificate.

use crate::error::{CryptoError, YkpivError, YkpivResult};

const TAG_CERT: u8 = 0x70;

/// Extract the DER certificate from a fetched certificate object
///
/// Returns `None` for an empty object, which is what deleting a certificate
/// leaves behind.
pub fn certificate_der(object: &[u8]) -> YkpivResult<Option<&[u8]>> {
    let Some((&tag, rest)) = object.split_first() else {
        return Ok(None);
    };
    if tag != TAG_CERT {
        return Ok(Some(object));
    }

    let (len, rest) = ber_length(rest)?;
    if len == 0 {
        return Ok(None);
    }
    rest.get(..len).map(Some).ok_or_else(|| {
        malformed(format!(
            "certificate length {} exceeds object of {} bytes",
            len,
            object.len()
        ))
    })
}

fn ber_length(bytes: &[u8]) -> YkpivResult<(usize, &[u8])> {
    match bytes {
        [short, rest @ ..] if *short < 0x80 => Ok((*short as usize, rest)),
        [0x81, len, rest @ ..] => Ok((*len as usize, rest)),
        [0x82, hi, lo, rest @ ..] => Ok((((*hi as usize) << 8) | *lo as usize, rest)),
        _ => Err(malformed("bad certificate length encoding".to_string())),
    }
}

fn malformed(reason: String) -> YkpivError {
    YkpivError::Crypto(CryptoError::CertificateFailed { reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(der: &[u8]) -> Vec<u8> {
        let mut object = vec![TAG_CERT];
        match der.len() {
            len @ 0..=0x7f => object.push(len as u8),
            len @ 0x80..=0xff => object.extend_from_slice(&[0x81, len as u8]),
            len => object.extend_from_slice(&[0x82, (len >> 8) as u8, len as u8]),
        }
        object.extend_from_slice(der);
        object.extend_from_slice(&[0x71, 0x01, 0x00, 0xfe, 0x00]);
        object
    }

    #[test]
    fn test_empty_object_has_no_certificate() {
        assert_eq!(certificate_der(&[]).unwrap(), None);
        assert_eq!(certificate_der(&[TAG_CERT, 0x00]).unwrap(), None);
    }

    #[test]
    fn test_unwraps_tagged_certificate() {
        for len in [10, 200, 900] {
            let der: Vec<u8> = (0..len).map(|i| (i % 251) as u8 | 0x01).collect();
            let object = wrap(&der);
            assert_eq!(certificate_der(&object).unwrap(), Some(der.as_slice()));
        }
    }

    #[test]
    fn test_bare_der_passes_through() {
        let der = [0x30, 0x03, 0x02, 0x01, 0x00];
        assert_eq!(certificate_der(&der).unwrap(), Some(der.as_slice()));
    }

    #[test]
    fn test_truncated_object_is_an_error() {
        let mut object = wrap(&[0x30; 300]);
        object.truncate(100);
        assert!(matches!(
            certificate_der(&object).unwrap_err(),
            YkpivError::Crypto(CryptoError::CertificateFailed { .. })
        ));
        assert!(certificate_der(&[TAG_CERT, 0x83, 0x00]).is_err());
    }
}
