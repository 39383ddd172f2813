//! Decoding the resolved store into the caller's type
//!
//! The store holds lower-cased keys and, for environment overrides, raw
//! strings. [`Lenient`] maps keys back onto the target's declared serde field
//! and variant names (using the name lists serde hands to `deserialize_struct`
//! and `deserialize_enum`) and coerces strings into numbers, booleans and
//! comma-separated lists when the target asks for those types.
//!
//! A prior value (the target's serialized current state) can sit underneath
//! the store. Structs and maps merge with it entry by entry, keeping the
//! prior's key spelling; anything else the store sets replaces it whole.

use serde::de::value::{MapDeserializer, SeqDeserializer, StringDeserializer};
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, EnumAccess, Error as _, IntoDeserializer, Unexpected,
    VariantAccess, Visitor,
};
use serde::forward_to_deserialize_any;
use serde_json::{Error, Map, Value};

/// Deserialize `value` into `T` with case-insensitive name matching and string coercion.
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    T::deserialize(Lenient::new(value))
}

/// Like [`decode`], with `prior` filling in whatever `value` leaves unset.
pub fn decode_over<T: DeserializeOwned>(value: Value, prior: Value) -> Result<T, Error> {
    T::deserialize(Lenient::layered(value, prior))
}

/// Whether `T` deserializes as a struct or map, determined without any input.
pub fn is_struct_like<T: DeserializeOwned>() -> bool {
    matches!(T::deserialize(ShapeCheck), Err(ShapeError::StructLike))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn split_list(raw: &str) -> Vec<Lenient> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    raw.split(',').map(|item| Lenient::new(Value::String(item.trim().to_string()))).collect()
}

/// The declared name `key` matches, exactly or case-insensitively, else `key` itself.
fn match_name(key: String, names: &[&str]) -> String {
    if names.contains(&key.as_str()) {
        return key;
    }
    let folded = key.to_lowercase();
    names.iter().find(|name| name.to_lowercase() == folded).map_or(key, |name| name.to_string())
}

/// Pair each store entry with the prior entry of the same (case-insensitive) key.
fn layer_entries(store: Map<String, Value>, prior: Option<Value>, names: &[&str]) -> Vec<(StrValue, Lenient)> {
    let mut prior = match prior {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let mut entries = Vec::with_capacity(store.len() + prior.len());

    for (key, value) in store {
        let key = match_name(key, names);
        let prior_key = if prior.contains_key(&key) {
            Some(key.clone())
        } else {
            let folded = key.to_lowercase();
            prior.keys().find(|k| k.to_lowercase() == folded).cloned()
        };
        match prior_key.and_then(|k| prior.remove(&k).map(|v| (k, v))) {
            Some((prior_key, prior_value)) => {
                entries.push((StrValue(prior_key), Lenient::layered(value, prior_value)))
            }
            None => entries.push((StrValue(key), Lenient::new(value))),
        }
    }

    entries.extend(prior.into_iter().map(|(k, v)| (StrValue(k), Lenient::new(v))));
    entries
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(n) => match (n.as_u64(), n.as_i64(), n.as_f64()) {
            (Some(u), _, _) => Unexpected::Unsigned(u),
            (_, Some(i), _) => Unexpected::Signed(i),
            (_, _, Some(f)) => Unexpected::Float(f),
            _ => Unexpected::Other("number"),
        },
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}

/// A string that parses itself into whatever scalar the target asks for.
///
/// Used for map keys and for string values in the store.
struct StrValue(String);

impl<'de> IntoDeserializer<'de, Error> for StrValue {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! deserialize_from_str {
    ($($method:ident => $visit:ident($ty:ty)),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                match self.0.trim().parse::<$ty>() {
                    Ok(parsed) => visitor.$visit(parsed),
                    Err(_) => Err(Error::invalid_value(Unexpected::Str(&self.0), &visitor)),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for StrValue {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_string(self.0)
    }

    deserialize_from_str! {
        deserialize_i8 => visit_i8(i8),
        deserialize_i16 => visit_i16(i16),
        deserialize_i32 => visit_i32(i32),
        deserialize_i64 => visit_i64(i64),
        deserialize_i128 => visit_i128(i128),
        deserialize_u8 => visit_u8(u8),
        deserialize_u16 => visit_u16(u16),
        deserialize_u32 => visit_u32(u32),
        deserialize_u64 => visit_u64(u64),
        deserialize_u128 => visit_u128(u128),
        deserialize_f32 => visit_f32(f32),
        deserialize_f64 => visit_f64(f64),
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match parse_bool(&self.0) {
            Some(b) => visitor.visit_bool(b),
            None => Err(Error::invalid_value(Unexpected::Str(&self.0), &visitor)),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        let tag: StringDeserializer<Error> = match_name(self.0, variants).into_deserializer();
        visitor.visit_enum(tag)
    }

    forward_to_deserialize_any! {
        char str string bytes byte_buf unit unit_struct seq tuple tuple_struct map struct identifier ignored_any
    }
}

/// A store value, optionally layered over the target's prior value.
struct Lenient {
    value: Value,
    prior: Option<Value>,
}

impl Lenient {
    fn new(value: Value) -> Self {
        Self { value, prior: None }
    }

    fn layered(value: Value, prior: Value) -> Self {
        Self { value, prior: Some(prior) }
    }
}

impl<'de> IntoDeserializer<'de, Error> for Lenient {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! deserialize_scalar {
    ($($method:ident),* $(,)?) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                match self.value {
                    Value::String(s) => StrValue(s).$method(visitor),
                    other => Lenient::new(other).deserialize_any(visitor),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for Lenient {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Null => visitor.visit_unit(),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Number(n) => n.deserialize_any(visitor),
            Value::String(s) => visitor.visit_string(s),
            Value::Array(items) => SeqDeserializer::new(items.into_iter().map(Lenient::new)).deserialize_any(visitor),
            Value::Object(map) => {
                MapDeserializer::new(layer_entries(map, self.prior, &[]).into_iter()).deserialize_any(visitor)
            }
        }
    }

    deserialize_scalar! {
        deserialize_bool,
        deserialize_i8,
        deserialize_i16,
        deserialize_i32,
        deserialize_i64,
        deserialize_i128,
        deserialize_u8,
        deserialize_u16,
        deserialize_u32,
        deserialize_u64,
        deserialize_u128,
        deserialize_f32,
        deserialize_f64,
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Number(n) => visitor.visit_string(n.to_string()),
            Value::Bool(b) => visitor.visit_string(b.to_string()),
            other => Lenient::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::String(s) => SeqDeserializer::new(split_list(&s).into_iter()).deserialize_any(visitor),
            other => Lenient::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Null => visitor.visit_none(),
            value => visitor.visit_some(Lenient { value, prior: self.prior }),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(self, _name: &'static str, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.value {
            Value::Object(map) => {
                MapDeserializer::new(layer_entries(map, self.prior, fields).into_iter()).deserialize_any(visitor)
            }
            other => Lenient::new(other).deserialize_any(visitor),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        let (tag, content) = match self.value {
            Value::String(tag) => (tag, None),
            Value::Object(map) => {
                let mut entries = map.into_iter();
                match (entries.next(), entries.next()) {
                    (Some((tag, content)), None) => (tag, Some(content)),
                    _ => return Err(Error::invalid_value(Unexpected::Map, &"a map with a single variant key")),
                }
            }
            other => return Err(Error::invalid_type(unexpected(&other), &"a variant name or single-key map")),
        };
        visitor.visit_enum(EnumValue { tag: match_name(tag, variants), content })
    }

    forward_to_deserialize_any! {
        char bytes byte_buf unit unit_struct map identifier ignored_any
    }
}

/// Externally tagged enum: `"Variant"` or `{"Variant": content}`.
struct EnumValue {
    tag: String,
    content: Option<Value>,
}

impl<'de> EnumAccess<'de> for EnumValue {
    type Error = Error;
    type Variant = VariantValue;

    fn variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<(S::Value, VariantValue), Error> {
        let tag: StringDeserializer<Error> = self.tag.into_deserializer();
        Ok((seed.deserialize(tag)?, VariantValue(self.content)))
    }
}

struct VariantValue(Option<Value>);

impl<'de> VariantAccess<'de> for VariantValue {
    type Error = Error;

    fn unit_variant(self) -> Result<(), Error> {
        match self.0 {
            None | Some(Value::Null) => Ok(()),
            Some(other) => Err(Error::invalid_type(unexpected(&other), &"unit variant")),
        }
    }

    fn newtype_variant_seed<S: DeserializeSeed<'de>>(self, seed: S) -> Result<S::Value, Error> {
        match self.0 {
            Some(content) => seed.deserialize(Lenient::new(content)),
            None => Err(Error::invalid_type(Unexpected::UnitVariant, &"newtype variant")),
        }
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        match self.0 {
            Some(content) => Lenient::new(content).deserialize_seq(visitor),
            None => Err(Error::invalid_type(Unexpected::UnitVariant, &"tuple variant")),
        }
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self.0 {
            Some(content) => Lenient::new(content).deserialize_struct("", fields, visitor),
            None => Err(Error::invalid_type(Unexpected::UnitVariant, &"struct variant")),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum ShapeError {
    #[error("struct-like target")]
    StructLike,
    #[error("{0}")]
    Other(String),
}

impl de::Error for ShapeError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        ShapeError::Other(msg.to_string())
    }
}

/// Records which shape a type asks for, then stops.
struct ShapeCheck;

impl<'de> Deserializer<'de> for ShapeCheck {
    type Error = ShapeError;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, ShapeError> {
        Err(ShapeError::Other("not a struct".to_string()))
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, ShapeError> {
        Err(ShapeError::StructLike)
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, ShapeError> {
        Err(ShapeError::StructLike)
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct enum identifier ignored_any
    }
}
