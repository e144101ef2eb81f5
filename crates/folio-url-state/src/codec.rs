//! Value <-> query-parameter text codecs.
//!
//! A codec's two functions must be exact inverses for every value a store
//! holds: `deserialize(serialize(v)) == v`.

use std::marker::PhantomData;
use std::rc::Rc;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CodecError;

pub trait UrlCodec<T> {
    fn serialize(&self, value: &T) -> Result<String, CodecError>;
    fn deserialize(&self, raw: &str) -> Result<T, CodecError>;

    /// Values for which the parameter is dropped rather than written.
    fn is_absent(&self, _value: &T) -> bool {
        false
    }
}

/// Structured values as JSON text. `null` values are treated as absent.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonCodec;

impl<T> UrlCodec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn serialize(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }

    fn deserialize(&self, raw: &str) -> Result<T, CodecError> {
        Ok(serde_json::from_str(raw)?)
    }

    fn is_absent(&self, value: &T) -> bool {
        serde_json::to_value(value).is_ok_and(|v| v.is_null())
    }
}

/// `encodeURIComponent` leaves these unescaped.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Free text, percent-encoded as a URI component.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextCodec;

impl UrlCodec<String> for TextCodec {
    fn serialize(&self, value: &String) -> Result<String, CodecError> {
        Ok(utf8_percent_encode(value, URI_COMPONENT).to_string())
    }

    /// Strict like `decodeURIComponent`: a `%` not followed by two hex
    /// digits is an error rather than literal text.
    fn deserialize(&self, raw: &str) -> Result<String, CodecError> {
        check_escapes(raw)?;
        Ok(percent_decode_str(raw).decode_utf8()?.into_owned())
    }
}

fn check_escapes(raw: &str) -> Result<(), CodecError> {
    let bytes = raw.as_bytes();
    let mut from = 0;
    while let Some(offset) = bytes[from..].iter().position(|&b| b == b'%') {
        let at = from + offset;
        let hex = bytes
            .get(at + 1..at + 3)
            .is_some_and(|h| h.iter().all(u8::is_ascii_hexdigit));
        if !hex {
            return Err(CodecError::MalformedEscape(at));
        }
        from = at + 3;
    }
    Ok(())
}

type SerializeFn<T> = Rc<dyn Fn(&T) -> Result<String, CodecError>>;
type DeserializeFn<T> = Rc<dyn Fn(&str) -> Result<T, CodecError>>;

/// Codec built from a pair of closures.
pub struct FnCodec<T> {
    serialize: SerializeFn<T>,
    deserialize: DeserializeFn<T>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FnCodec<T> {
    pub fn new(
        serialize: impl Fn(&T) -> Result<String, CodecError> + 'static,
        deserialize: impl Fn(&str) -> Result<T, CodecError> + 'static,
    ) -> Self {
        Self {
            serialize: Rc::new(serialize),
            deserialize: Rc::new(deserialize),
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for FnCodec<T> {
    fn clone(&self) -> Self {
        Self {
            serialize: self.serialize.clone(),
            deserialize: self.deserialize.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> UrlCodec<T> for FnCodec<T> {
    fn serialize(&self, value: &T) -> Result<String, CodecError> {
        (self.serialize)(value)
    }

    fn deserialize(&self, raw: &str) -> Result<T, CodecError> {
        (self.deserialize)(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn json_round_trip() {
        let mut v = BTreeMap::new();
        v.insert("sort".to_string(), vec![1u32, 2, 3]);
        let text = JsonCodec.serialize(&v).unwrap();
        let back: BTreeMap<String, Vec<u32>> = JsonCodec.deserialize(&text).unwrap();
        assert_eq!(back, v);
    }

    #[test]
    fn json_null_is_absent() {
        assert!(UrlCodec::<Option<u32>>::is_absent(&JsonCodec, &None));
        assert!(!UrlCodec::<Option<u32>>::is_absent(&JsonCodec, &Some(0)));
    }

    #[test]
    fn json_rejects_garbage() {
        let r: Result<Vec<u32>, _> = JsonCodec.deserialize("[1,");
        assert!(matches!(r, Err(CodecError::Json(_))));
    }

    #[test]
    fn text_matches_uri_component_encoding() {
        let encoded = TextCodec.serialize(&"rust & wasm (2024)!".to_string()).unwrap();
        assert_eq!(encoded, "rust%20%26%20wasm%20(2024)!");
        assert_eq!(TextCodec.deserialize(&encoded).unwrap(), "rust & wasm (2024)!");
    }

    #[test]
    fn text_rejects_invalid_utf8() {
        assert!(matches!(
            TextCodec.deserialize("%FF%FE"),
            Err(CodecError::Utf8(_))
        ));
    }

    #[test]
    fn text_rejects_stray_percent() {
        assert!(matches!(
            TextCodec.deserialize("100%"),
            Err(CodecError::MalformedEscape(3))
        ));
        assert!(matches!(
            TextCodec.deserialize("50%off"),
            Err(CodecError::MalformedEscape(2))
        ));
        assert_eq!(TextCodec.deserialize("100%25").unwrap(), "100%");
    }

    #[test]
    fn fn_codec_delegates() {
        let codec = FnCodec::new(
            |v: &u8| Ok(format!("{v:02x}")),
            |s: &str| u8::from_str_radix(s, 16).map_err(|e| CodecError::Custom(e.to_string())),
        );
        assert_eq!(codec.serialize(&255).unwrap(), "ff");
        assert_eq!(codec.deserialize("0a").unwrap(), 10);
        assert!(codec.deserialize("zz").is_err());
    }
}
